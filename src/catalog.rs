use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::error::{PlanError, PlanResult};

/// A schedulable activity as delivered by search or recommendation feeds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogActivity {
    pub id: String,
    pub title: String,
    #[serde(rename = "type")]
    pub activity_type: String,
    pub duration_minutes: u32,
    pub cost: f64,
    pub currency: String,
    #[serde(default)]
    pub description: String,
}

impl CatalogActivity {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        activity_type: impl Into<String>,
        duration_minutes: u32,
        cost: f64,
        currency: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            activity_type: activity_type.into(),
            duration_minutes,
            cost,
            currency: currency.into(),
            description: String::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    fn validate(&self) -> PlanResult<()> {
        if self.id.trim().is_empty() {
            return Err(PlanError::validation("catalog activity id must not be empty"));
        }
        require_text(&self.title, "title")
            .and_then(|_| require_text(&self.currency, "currency"))
            .and_then(|_| validate_cost(self.cost))
            .map_err(|message| PlanError::validation(format!("activity {}: {message}", self.id)))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestReport {
    pub added: usize,
    pub replaced: usize,
}

#[derive(Debug, Clone, Default)]
pub struct Catalog {
    activities: HashMap<String, CatalogActivity>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.activities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.activities.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&CatalogActivity> {
        self.activities.get(id)
    }

    pub fn resolve(&self, id: &str) -> PlanResult<&CatalogActivity> {
        self.get(id)
            .ok_or_else(|| PlanError::validation(format!("unknown activity: {id}")))
    }

    /// Activities ordered by id.
    pub fn activities(&self) -> Vec<&CatalogActivity> {
        let mut rows = self.activities.values().collect::<Vec<_>>();
        rows.sort_by(|left, right| left.id.cmp(&right.id));
        rows
    }

    /// Merges a batch by id. An incoming activity fully replaces any previous
    /// definition sharing its id. The batch is validated up front and
    /// rejected as a whole when any item is malformed.
    pub fn ingest(
        &mut self,
        batch: impl IntoIterator<Item = CatalogActivity>,
    ) -> PlanResult<IngestReport> {
        let mut incoming: BTreeMap<String, CatalogActivity> = BTreeMap::new();
        for activity in batch {
            activity.validate()?;
            incoming.insert(activity.id.clone(), activity);
        }

        let mut report = IngestReport::default();
        for (id, activity) in incoming {
            if self.activities.insert(id, activity).is_some() {
                report.replaced += 1;
            } else {
                report.added += 1;
            }
        }

        Ok(report)
    }
}

impl FromIterator<CatalogActivity> for Catalog {
    /// Builds a catalog without validation; later items win on repeated ids.
    fn from_iter<T: IntoIterator<Item = CatalogActivity>>(iter: T) -> Self {
        let activities = iter
            .into_iter()
            .map(|activity| (activity.id.clone(), activity))
            .collect();
        Self { activities }
    }
}

pub(crate) fn require_text(value: &str, field_name: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        return Err(format!("{field_name} must not be empty"));
    }
    Ok(())
}

pub(crate) fn validate_cost(cost: f64) -> Result<(), String> {
    if !cost.is_finite() || cost < 0.0 {
        return Err(format!("cost must be a non-negative amount, got {cost}"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{Catalog, CatalogActivity, IngestReport};
    use crate::error::PlanError;

    #[test]
    fn ingest_overwrites_by_id() {
        let mut catalog = Catalog::new();
        catalog
            .ingest(vec![
                CatalogActivity::new("louvre", "Louvre", "culture", 180, 22.0, "EUR"),
                CatalogActivity::new("seine", "Seine cruise", "sightseeing", 60, 15.0, "EUR"),
            ])
            .expect("seed batch should ingest");

        let report = catalog
            .ingest(vec![
                CatalogActivity::new("louvre", "Louvre Museum", "culture", 240, 22.0, "EUR")
                    .with_description("Late opening"),
                CatalogActivity::new("orsay", "Musee d'Orsay", "culture", 120, 16.0, "EUR"),
            ])
            .expect("attraction batch should ingest");

        assert_eq!(report, IngestReport { added: 1, replaced: 1 });
        assert_eq!(catalog.len(), 3);
        let louvre = catalog.get("louvre").expect("louvre present");
        assert_eq!(louvre.title, "Louvre Museum");
        assert_eq!(louvre.duration_minutes, 240);
        assert_eq!(louvre.description, "Late opening");
    }

    #[test]
    fn later_item_in_batch_wins() {
        let mut catalog = Catalog::new();
        let report = catalog
            .ingest(vec![
                CatalogActivity::new("a", "First", "culture", 60, 1.0, "EUR"),
                CatalogActivity::new("a", "Second", "culture", 60, 1.0, "EUR"),
            ])
            .expect("batch should ingest");

        assert_eq!(report, IngestReport { added: 1, replaced: 0 });
        assert_eq!(catalog.get("a").map(|a| a.title.as_str()), Some("Second"));
    }

    #[test]
    fn invalid_batch_leaves_catalog_untouched() {
        let mut catalog: Catalog =
            vec![CatalogActivity::new("a", "Walk", "sightseeing", 60, 0.0, "EUR")]
                .into_iter()
                .collect();

        let err = catalog
            .ingest(vec![
                CatalogActivity::new("a", "Renamed", "sightseeing", 60, 0.0, "EUR"),
                CatalogActivity::new("b", "Broken", "culture", 60, -5.0, "EUR"),
            ])
            .expect_err("negative cost should be rejected");

        assert!(matches!(err, PlanError::Validation(_)));
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.get("a").map(|a| a.title.as_str()), Some("Walk"));
    }

    #[test]
    fn resolve_reports_unknown_ids() {
        let catalog = Catalog::new();
        let err = catalog.resolve("ghost").expect_err("missing id");
        assert_eq!(err, PlanError::Validation("unknown activity: ghost".to_string()));
    }

    #[test]
    fn decodes_feed_field_names() {
        let raw = r#"{"id":"eiffel","title":"Eiffel Tower","type":"sightseeing","durationMinutes":90,"cost":28.3,"currency":"EUR"}"#;
        let activity: CatalogActivity = serde_json::from_str(raw).expect("activity should decode");
        assert_eq!(activity.activity_type, "sightseeing");
        assert_eq!(activity.duration_minutes, 90);
        assert_eq!(activity.description, "");
    }
}
