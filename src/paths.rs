use std::env;
use std::fs;
use std::io::{Error, ErrorKind};
use std::path::PathBuf;

const APP_DIR: &str = "trip_timeline";
const CONFIG_FILE: &str = "config.toml";

pub const CATALOG_ENV: &str = "TRIP_TIMELINE_CATALOG";
pub const CONFIG_ENV: &str = "TRIP_TIMELINE_CONFIG";

pub fn resolve_catalog_paths(cli_paths: Vec<PathBuf>) -> Result<Vec<PathBuf>, Error> {
	if !cli_paths.is_empty() {
		return Ok(cli_paths.into_iter().map(absolutize).collect());
	}

	if let Some(raw) = env::var_os(CATALOG_ENV) {
		let paths = env::split_paths(&raw)
			.filter(|path| !path.as_os_str().is_empty())
			.map(absolutize)
			.collect::<Vec<_>>();
		if !paths.is_empty() {
			return Ok(paths);
		}
	}

	Err(Error::new(
		ErrorKind::NotFound,
		format!("no catalog selected: pass --catalog <path> or set {CATALOG_ENV}"),
	))
}

/// Settings file to load, if any. An explicit path is returned even when it
/// does not exist so the caller reports it; the default location is only
/// used when present.
pub fn resolve_settings_path(cli_path: Option<PathBuf>) -> Option<PathBuf> {
	if let Some(path) = cli_path {
		return Some(absolutize(path));
	}

	if let Some(path) = env::var_os(CONFIG_ENV) {
		let path = PathBuf::from(path);
		if !path.as_os_str().is_empty() {
			return Some(absolutize(path));
		}
	}

	let default_path = config_dir()?.join(CONFIG_FILE);
	default_path.is_file().then_some(default_path)
}

fn config_dir() -> Option<PathBuf> {
	#[cfg(target_os = "windows")]
	{
		if let Some(path) = env::var_os("APPDATA") {
			return Some(PathBuf::from(path).join(APP_DIR));
		}
	}

	if let Some(path) = env::var_os("XDG_CONFIG_HOME") {
		return Some(PathBuf::from(path).join(APP_DIR));
	}

	env::var_os("HOME").map(|path| PathBuf::from(path).join(".config").join(APP_DIR))
}

/// Anchors relative paths to the working directory and canonicalizes the
/// ones that exist, so feed and settings errors name the real file.
fn absolutize(path: PathBuf) -> PathBuf {
	let path = if path.is_absolute() {
		path
	} else if let Ok(cwd) = env::current_dir() {
		cwd.join(path)
	} else {
		path
	};

	if path.exists() {
		fs::canonicalize(&path).unwrap_or(path)
	} else {
		path
	}
}
