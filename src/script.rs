use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::catalog::CatalogActivity;
use crate::error::PlanResult;
use crate::timeline::{EntryPatch, TimelineStore};

/// One line of a plan script.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ScriptOp {
    Insert {
        activity: String,
        date: String,
        time: String,
        label: Option<String>,
    },
    Remove {
        entry: String,
    },
    Update {
        entry: String,
        date: Option<String>,
        time: Option<String>,
        duration_minutes: Option<u32>,
        cost: Option<f64>,
        currency: Option<String>,
        title: Option<String>,
        #[serde(rename = "type")]
        activity_type: Option<String>,
        description: Option<String>,
    },
    Reorder {
        from: usize,
        to: usize,
    },
    Ingest {
        activities: Vec<CatalogActivity>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScriptStep {
    pub line: usize,
    pub op: ScriptOp,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StepOutcome {
    pub line: usize,
    pub result: PlanResult<String>,
}

#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("failed to read plan script {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse plan script {} line {line}: {source}", path.display())]
    Decode {
        path: PathBuf,
        line: usize,
        source: serde_json::Error,
    },
}

pub fn load_script(path: &Path) -> Result<Vec<ScriptStep>, ScriptError> {
    let raw = fs::read_to_string(path).map_err(|source| ScriptError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_script(&raw, path)
}

/// Parses JSON lines; blank lines and `#` comments are skipped. `origin`
/// only labels errors.
pub fn parse_script(raw: &str, origin: &Path) -> Result<Vec<ScriptStep>, ScriptError> {
    let mut steps = Vec::new();
    for (index, line) in raw.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let op = serde_json::from_str(trimmed).map_err(|source| ScriptError::Decode {
            path: origin.to_path_buf(),
            line: index + 1,
            source,
        })?;
        steps.push(ScriptStep {
            line: index + 1,
            op,
        });
    }
    Ok(steps)
}

/// Applies script steps to a store. Entry references resolve labels set by
/// earlier inserts first, then raw entry ids.
#[derive(Debug, Default)]
pub struct ScriptRunner {
    labels: HashMap<String, String>,
}

impl ScriptRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs every step; a rejected step is reported and the run continues.
    pub fn run(&mut self, store: &mut TimelineStore, steps: &[ScriptStep]) -> Vec<StepOutcome> {
        steps
            .iter()
            .map(|step| StepOutcome {
                line: step.line,
                result: self.apply(store, &step.op),
            })
            .collect()
    }

    pub fn apply(&mut self, store: &mut TimelineStore, op: &ScriptOp) -> PlanResult<String> {
        match op {
            ScriptOp::Insert {
                activity,
                date,
                time,
                label,
            } => {
                let entry = store.insert(activity, date, time)?;
                if let Some(label) = label {
                    self.labels.insert(label.clone(), entry.id.clone());
                }
                Ok(format!(
                    "scheduled {} on {} {} as {}",
                    entry.title,
                    entry.scheduled_date,
                    entry.span(),
                    entry.id
                ))
            }
            ScriptOp::Remove { entry } => {
                let entry_id = self.resolve(entry);
                match store.remove(&entry_id) {
                    Some(removed) => {
                        self.labels.retain(|_, id| *id != removed.id);
                        Ok(format!("removed {} ({})", removed.title, removed.id))
                    }
                    None => Ok(format!("nothing to remove for {entry}")),
                }
            }
            ScriptOp::Update {
                entry,
                date,
                time,
                duration_minutes,
                cost,
                currency,
                title,
                activity_type,
                description,
            } => {
                let mut patch = EntryPatch::from_text(date.as_deref(), time.as_deref())?;
                patch.duration_minutes = *duration_minutes;
                patch.cost = *cost;
                patch.currency = currency.clone();
                patch.title = title.clone();
                patch.activity_type = activity_type.clone();
                patch.description = description.clone();

                let updated = store.update(&self.resolve(entry), patch)?;
                Ok(format!(
                    "updated {} to {} {}",
                    updated.id,
                    updated.scheduled_date,
                    updated.span()
                ))
            }
            ScriptOp::Reorder { from, to } => {
                store.reorder(*from, *to)?;
                Ok(format!("moved position {from} to {to}"))
            }
            ScriptOp::Ingest { activities } => {
                let report = store.ingest(activities.iter().cloned())?;
                Ok(format!(
                    "catalog: {} added, {} replaced",
                    report.added, report.replaced
                ))
            }
        }
    }

    fn resolve(&self, reference: &str) -> String {
        self.labels
            .get(reference)
            .cloned()
            .unwrap_or_else(|| reference.to_string())
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::{Path, PathBuf};

    use crate::catalog::{Catalog, CatalogActivity};
    use crate::error::PlanError;
    use crate::timeline::TimelineStore;

    use super::{ScriptError, ScriptOp, ScriptRunner, load_script, parse_script};

    fn store() -> TimelineStore {
        let catalog: Catalog = vec![
            CatalogActivity::new("A", "Walk", "sightseeing", 120, 0.0, "EUR"),
            CatalogActivity::new("B", "Museum", "culture", 60, 12.0, "EUR"),
        ]
        .into_iter()
        .collect();
        TimelineStore::new(catalog)
    }

    #[test]
    fn parses_ops_and_skips_comments() {
        let raw = r#"
# day one
{"op":"insert","activity":"A","date":"2025-06-01","time":"09:00","label":"walk"}

{"op":"update","entry":"walk","time":"10:00","durationMinutes":90,"type":"outdoors"}
{"op":"reorder","from":0,"to":0}
"#;
        let steps = parse_script(raw, Path::new("inline.jsonl")).expect("script should parse");

        assert_eq!(steps.len(), 3);
        assert_eq!(steps[0].line, 3);
        assert_eq!(steps[1].line, 5);
        match &steps[1].op {
            ScriptOp::Update {
                entry,
                time,
                duration_minutes,
                activity_type,
                date,
                ..
            } => {
                assert_eq!(entry, "walk");
                assert_eq!(time.as_deref(), Some("10:00"));
                assert_eq!(*duration_minutes, Some(90));
                assert_eq!(activity_type.as_deref(), Some("outdoors"));
                assert!(date.is_none());
            }
            other => panic!("expected update, got {other:?}"),
        }
    }

    #[test]
    fn reports_line_of_bad_json() {
        let raw = "{\"op\":\"remove\",\"entry\":\"x\"}\n{\"op\":\"teleport\"}\n";
        let err = parse_script(raw, Path::new("inline.jsonl")).expect_err("unknown op");
        match err {
            ScriptError::Decode { line, .. } => assert_eq!(line, 2),
            other => panic!("expected decode error, got {other:?}"),
        }
    }

    #[test]
    fn runs_steps_past_rejections() {
        let path = temp_file("trip_timeline_script.jsonl");
        fs::write(
            &path,
            concat!(
                "{\"op\":\"insert\",\"activity\":\"A\",\"date\":\"2025-06-01\",\"time\":\"09:00\",\"label\":\"walk\"}\n",
                "{\"op\":\"insert\",\"activity\":\"B\",\"date\":\"2025-06-01\",\"time\":\"10:00\"}\n",
                "{\"op\":\"insert\",\"activity\":\"B\",\"date\":\"2025-06-01\",\"time\":\"11:00\",\"label\":\"museum\"}\n",
                "{\"op\":\"update\",\"entry\":\"walk\",\"date\":\"2025-06-02\"}\n",
                "{\"op\":\"remove\",\"entry\":\"museum\"}\n",
                "{\"op\":\"remove\",\"entry\":\"museum\"}\n",
                "{\"op\":\"update\",\"entry\":\"ghost\",\"time\":\"12:00\"}\n",
            ),
        )
        .expect("script should be written");

        let steps = load_script(&path).expect("script should load");
        let mut store = store();
        let outcomes = ScriptRunner::new().run(&mut store, &steps);

        assert_eq!(outcomes.len(), 7);
        assert!(outcomes[0].result.is_ok());
        assert!(
            outcomes[1]
                .result
                .as_ref()
                .is_err_and(PlanError::is_conflict)
        );
        assert!(outcomes[2].result.is_ok());
        assert!(outcomes[3].result.is_ok());
        assert!(outcomes[4].result.is_ok());
        assert!(
            outcomes[5]
                .result
                .as_ref()
                .is_ok_and(|message| message.starts_with("nothing to remove"))
        );
        assert_eq!(
            outcomes[6].result,
            Err(PlanError::NotFound("ghost".to_string()))
        );

        assert_eq!(store.len(), 1);
        assert_eq!(store.entries()[0].title, "Walk");
        assert_eq!(store.entries()[0].scheduled_date.to_string(), "2025-06-02");
        let _ = fs::remove_file(path);
    }

    #[test]
    fn ingest_step_overwrites_catalog_only() {
        let raw = concat!(
            "{\"op\":\"insert\",\"activity\":\"B\",\"date\":\"2025-06-01\",\"time\":\"09:00\"}\n",
            "{\"op\":\"ingest\",\"activities\":[{\"id\":\"B\",\"title\":\"Museum night\",\"type\":\"culture\",\"durationMinutes\":60,\"cost\":20,\"currency\":\"EUR\"}]}\n",
        );
        let steps = parse_script(raw, Path::new("inline.jsonl")).expect("script should parse");
        let mut store = store();
        let outcomes = ScriptRunner::new().run(&mut store, &steps);

        assert_eq!(
            outcomes[1].result.as_deref(),
            Ok("catalog: 0 added, 1 replaced")
        );
        assert_eq!(store.entries()[0].title, "Museum");
        assert_eq!(
            store.catalog().get("B").map(|activity| activity.title.as_str()),
            Some("Museum night")
        );
    }

    fn temp_file(name: &str) -> PathBuf {
        let mut path = std::env::temp_dir();
        path.push(format!("{}_{}", name, std::process::id()));
        path
    }
}
