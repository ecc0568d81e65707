use std::error::Error;
use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tracing::warn;
use tracing_subscriber::EnvFilter;

use trip_timeline::clock::{format_duration, format_time, parse_date, parse_time};
use trip_timeline::feed::ingest_feeds;
use trip_timeline::paths::resolve_catalog_paths;
use trip_timeline::script::{ScriptRunner, load_script};
use trip_timeline::settings::load_settings;
use trip_timeline::{Catalog, TimelineStore, Totals};

#[derive(Debug, Parser)]
#[command(name = "trip-timeline", about = "Plan trip activities into a conflict-free timeline")]
struct Cli {
	/// Catalog feed (JSON); repeat to merge several, later files win.
	#[arg(long = "catalog")]
	catalogs: Vec<PathBuf>,
	#[arg(long)]
	config: Option<PathBuf>,
	/// Plan script (JSON lines) applied before the command runs.
	#[arg(long)]
	script: Option<PathBuf>,
	#[command(subcommand)]
	command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
	Catalog,
	Timeline {
		#[arg(long)]
		json: bool,
	},
	Summary {
		#[arg(long)]
		day: Option<String>,
	},
	Suggest {
		#[arg(long)]
		date: String,
	},
	Check {
		#[arg(long)]
		activity: String,
		#[arg(long)]
		date: String,
		#[arg(long)]
		time: String,
	},
}

fn main() {
	init_tracing();
	if let Err(err) = run() {
		eprintln!("error: {err}");
		std::process::exit(1);
	}
}

fn init_tracing() {
	tracing_subscriber::fmt()
		.with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
		.with_writer(std::io::stderr)
		.init();
}

fn run() -> Result<(), Box<dyn Error>> {
	let cli = Cli::parse();

	let settings = load_settings(cli.config)?;
	let catalog_paths = resolve_catalog_paths(cli.catalogs)?;
	let mut store = TimelineStore::with_settings(Catalog::new(), settings);
	ingest_feeds(&mut store, &catalog_paths)?;

	if let Some(script_path) = &cli.script {
		let steps = load_script(script_path)?;
		let outcomes = ScriptRunner::new().run(&mut store, &steps);
		for outcome in &outcomes {
			if let Err(err) = &outcome.result {
				warn!(line = outcome.line, %err, "plan script step rejected");
				println!("line {}: rejected: {err}", outcome.line);
			}
		}
	}

	match cli.command.unwrap_or(Command::Timeline { json: false }) {
		Command::Catalog => {
			print_catalog(store.catalog());
		}
		Command::Timeline { json } => {
			if json {
				println!("{}", serde_json::to_string_pretty(store.entries())?);
			} else {
				print_timeline(&store);
			}
		}
		Command::Summary { day } => {
			print_summary(&store, day.as_deref())?;
		}
		Command::Suggest { date } => {
			let date = parse_date(&date)?;
			match store.suggest_next_slot(date) {
				Some(start) => println!("next free slot on {date}: {}", format_time(start)),
				None => println!("{date} is full, no slot left before midnight"),
			}
		}
		Command::Check { activity, date, time } => {
			let entry = store.preview_insert(&activity, parse_date(&date)?, parse_time(&time)?)?;
			println!(
				"{} fits on {} at {}",
				entry.title,
				entry.scheduled_date,
				entry.span()
			);
		}
	}

	Ok(())
}

fn print_catalog(catalog: &Catalog) {
	if catalog.is_empty() {
		println!("catalog is empty");
		return;
	}

	for activity in catalog.activities() {
		println!(
			"{} | {} | {} | {} | {:.2} {}",
			activity.id,
			activity.title,
			activity.activity_type,
			format_duration(activity.duration_minutes),
			activity.cost,
			activity.currency
		);
	}
}

fn print_timeline(store: &TimelineStore) {
	if store.is_empty() {
		println!("nothing scheduled yet");
		return;
	}

	let mut current_day: Option<NaiveDate> = None;
	for entry in store.entries() {
		if current_day != Some(entry.scheduled_date) {
			println!("{}", entry.scheduled_date.format("%Y-%m-%d %A"));
			current_day = Some(entry.scheduled_date);
		}
		println!(
			"  {} | {} ({}) | {:.2} {} | {}",
			entry.span(),
			entry.title,
			entry.activity_type,
			entry.cost,
			entry.currency,
			entry.id
		);
	}
}

fn print_summary(store: &TimelineStore, day: Option<&str>) -> Result<(), Box<dyn Error>> {
	if let Some(raw) = day {
		let day = parse_date(raw)?;
		println!("summary for {}", day.format("%Y-%m-%d"));
		print_totals(&store.totals_for_date(day));
		return Ok(());
	}

	println!("summary for whole trip");
	print_totals(&store.totals());

	let by_day = store.daily_totals();
	if by_day.is_empty() {
		return Ok(());
	}

	println!("\nby day:");
	for (date, totals) in &by_day {
		println!(
			"{} | {} activities | {} | {:.2}{}",
			date.format("%Y-%m-%d"),
			totals.count,
			format_duration(saturating_minutes(totals.total_duration_minutes)),
			totals.total_cost,
			currency_label(totals)
		);
	}

	Ok(())
}

fn print_totals(totals: &Totals) {
	if totals.count == 0 {
		println!("no scheduled activities");
		return;
	}

	println!("activities: {}", totals.count);
	println!(
		"time: {}",
		format_duration(saturating_minutes(totals.total_duration_minutes))
	);
	println!("cost: {:.2}{}", totals.total_cost, currency_label(totals));
	if totals.is_mixed_currency() {
		println!("note: amounts in different currencies were added without conversion");
	}
}

fn currency_label(totals: &Totals) -> String {
	let codes = totals
		.currencies
		.iter()
		.map(String::as_str)
		.collect::<Vec<_>>();
	if codes.is_empty() {
		String::new()
	} else {
		format!(" {}", codes.join("+"))
	}
}

fn saturating_minutes(minutes: u64) -> u32 {
	u32::try_from(minutes).unwrap_or(u32::MAX)
}
