use std::collections::{BTreeMap, BTreeSet};
use std::fmt::{self, Debug, Formatter};
use std::mem;

use chrono::{NaiveDate, NaiveTime, Utc};
use rand::{Rng, distributions::Alphanumeric, thread_rng};
use serde::Serialize;
use tracing::debug;

use crate::catalog::{Catalog, CatalogActivity, IngestReport, require_text, validate_cost};
use crate::clock::{format_clock, minute_of_day, parse_date, parse_time, time_from_minutes};
use crate::error::{PlanError, PlanResult};
use crate::settings::PlannerSettings;
use crate::totals::{self, Totals};

const ID_SUFFIX_LEN: usize = 6;

/// One scheduled occurrence of a catalog activity.
///
/// The descriptive fields are a snapshot of the catalog at insertion time;
/// re-ingesting the catalog never touches entries that already exist.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineEntry {
    pub id: String,
    pub activity_id: String,
    pub scheduled_date: NaiveDate,
    pub start_time: NaiveTime,
    pub duration_minutes: u32,
    pub cost: f64,
    pub currency: String,
    pub title: String,
    #[serde(rename = "type")]
    pub activity_type: String,
    pub description: String,
}

impl TimelineEntry {
    fn from_activity(
        id: String,
        activity: &CatalogActivity,
        scheduled_date: NaiveDate,
        start_time: NaiveTime,
    ) -> Self {
        Self {
            id,
            activity_id: activity.id.clone(),
            scheduled_date,
            start_time,
            duration_minutes: activity.duration_minutes,
            cost: activity.cost,
            currency: activity.currency.clone(),
            title: activity.title.clone(),
            activity_type: activity.activity_type.clone(),
            description: activity.description.clone(),
        }
    }

    pub fn start_minute(&self) -> u32 {
        minute_of_day(self.start_time)
    }

    /// Exclusive end, in minutes from midnight of `scheduled_date`. May run
    /// past 24:00.
    pub fn end_minute(&self) -> u32 {
        self.start_minute().saturating_add(self.duration_minutes)
    }

    /// Half-open overlap on the same date; touching endpoints do not overlap.
    pub fn overlaps(&self, other: &TimelineEntry) -> bool {
        self.scheduled_date == other.scheduled_date
            && self.start_minute() < other.end_minute()
            && other.start_minute() < self.end_minute()
    }

    pub fn span(&self) -> String {
        format!(
            "{}-{}",
            format_clock(self.start_minute()),
            format_clock(self.end_minute())
        )
    }

    fn sort_key(&self) -> (NaiveDate, NaiveTime) {
        (self.scheduled_date, self.start_time)
    }
}

/// Fields of a [`TimelineEntry`] that an update may change. Absent fields
/// keep their current value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntryPatch {
    pub scheduled_date: Option<NaiveDate>,
    pub start_time: Option<NaiveTime>,
    pub duration_minutes: Option<u32>,
    pub cost: Option<f64>,
    pub currency: Option<String>,
    pub title: Option<String>,
    pub activity_type: Option<String>,
    pub description: Option<String>,
}

impl EntryPatch {
    pub fn reschedule(scheduled_date: NaiveDate, start_time: NaiveTime) -> Self {
        Self {
            scheduled_date: Some(scheduled_date),
            start_time: Some(start_time),
            ..Self::default()
        }
    }

    /// Parses textual `YYYY-MM-DD` / `HH:MM` values into a patch.
    pub fn from_text(scheduled_date: Option<&str>, start_time: Option<&str>) -> PlanResult<Self> {
        Ok(Self {
            scheduled_date: scheduled_date.map(parse_date).transpose()?,
            start_time: start_time.map(parse_time).transpose()?,
            ..Self::default()
        })
    }

    fn validate(&self) -> PlanResult<()> {
        if let Some(title) = &self.title {
            require_text(title, "title").map_err(PlanError::Validation)?;
        }
        if let Some(currency) = &self.currency {
            require_text(currency, "currency").map_err(PlanError::Validation)?;
        }
        if let Some(cost) = self.cost {
            validate_cost(cost).map_err(PlanError::Validation)?;
        }
        Ok(())
    }

    fn apply_to(&self, entry: &mut TimelineEntry) {
        if let Some(scheduled_date) = self.scheduled_date {
            entry.scheduled_date = scheduled_date;
        }
        if let Some(start_time) = self.start_time {
            entry.start_time = start_time;
        }
        if let Some(duration_minutes) = self.duration_minutes {
            entry.duration_minutes = duration_minutes;
        }
        if let Some(cost) = self.cost {
            entry.cost = cost;
        }
        if let Some(currency) = &self.currency {
            entry.currency = currency.clone();
        }
        if let Some(title) = &self.title {
            entry.title = title.clone();
        }
        if let Some(activity_type) = &self.activity_type {
            entry.activity_type = activity_type.clone();
        }
        if let Some(description) = &self.description {
            entry.description = description.clone();
        }
    }
}

/// Committed change to a [`TimelineStore`], delivered to subscribers.
#[derive(Debug, Clone, PartialEq)]
pub enum TimelineEvent {
    Inserted(TimelineEntry),
    Updated {
        before: TimelineEntry,
        after: TimelineEntry,
    },
    Removed(TimelineEntry),
    Reordered {
        from: usize,
        to: usize,
    },
    CatalogIngested(IngestReport),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Observer = Box<dyn FnMut(&TimelineEvent)>;

/// Ordered collection of scheduled activities plus the catalog they are
/// drawn from.
///
/// Every mutation validates completely before it commits, so a rejected call
/// leaves the store exactly as it was. Entries on the same date never
/// overlap, and the sequence is sorted by `(date, start)` after every insert
/// or update. [`TimelineStore::reorder`] is the one exception to the sort: it
/// moves an entry by position and the manual order holds until the next
/// insert or update re-sorts.
pub struct TimelineStore {
    catalog: Catalog,
    settings: PlannerSettings,
    entries: Vec<TimelineEntry>,
    observers: Vec<(SubscriptionId, Observer)>,
    next_subscription: u64,
}

impl TimelineStore {
    pub fn new(catalog: Catalog) -> Self {
        Self::with_settings(catalog, PlannerSettings::default())
    }

    pub fn with_settings(catalog: Catalog, settings: PlannerSettings) -> Self {
        Self {
            catalog,
            settings,
            entries: Vec::new(),
            observers: Vec::new(),
            next_subscription: 0,
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn settings(&self) -> &PlannerSettings {
        &self.settings
    }

    pub fn ingest(
        &mut self,
        batch: impl IntoIterator<Item = CatalogActivity>,
    ) -> PlanResult<IngestReport> {
        let report = self.catalog.ingest(batch)?;
        debug!(
            added = report.added,
            replaced = report.replaced,
            "catalog batch ingested"
        );
        self.notify(TimelineEvent::CatalogIngested(report));
        Ok(report)
    }

    pub fn entries(&self) -> &[TimelineEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entry(&self, id: &str) -> Option<&TimelineEntry> {
        self.entries.iter().find(|entry| entry.id == id)
    }

    pub fn entries_on(&self, date: NaiveDate) -> impl Iterator<Item = &TimelineEntry> + '_ {
        self.entries
            .iter()
            .filter(move |entry| entry.scheduled_date == date)
    }

    pub fn scheduled_dates(&self) -> Vec<NaiveDate> {
        self.entries
            .iter()
            .map(|entry| entry.scheduled_date)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn insert(
        &mut self,
        activity_id: &str,
        scheduled_date: &str,
        start_time: &str,
    ) -> PlanResult<TimelineEntry> {
        let scheduled_date = parse_date(scheduled_date)?;
        let start_time = parse_time(start_time)?;
        self.insert_at(activity_id, scheduled_date, start_time)
    }

    pub fn insert_at(
        &mut self,
        activity_id: &str,
        scheduled_date: NaiveDate,
        start_time: NaiveTime,
    ) -> PlanResult<TimelineEntry> {
        let entry = self.preview_insert(activity_id, scheduled_date, start_time)?;
        self.entries.push(entry.clone());
        self.sort_entries();
        debug!(
            entry_id = %entry.id,
            activity_id,
            date = %entry.scheduled_date,
            span = %entry.span(),
            "timeline entry inserted"
        );
        self.notify(TimelineEvent::Inserted(entry.clone()));
        Ok(entry)
    }

    /// Builds and validates the entry `insert_at` would create without
    /// committing it.
    pub fn preview_insert(
        &self,
        activity_id: &str,
        scheduled_date: NaiveDate,
        start_time: NaiveTime,
    ) -> PlanResult<TimelineEntry> {
        let activity = self.catalog.resolve(activity_id)?;
        let id = self.next_entry_id(activity_id);
        let candidate = TimelineEntry::from_activity(id, activity, scheduled_date, start_time);
        self.ensure_free(&candidate, None)?;
        Ok(candidate)
    }

    /// Removing an unknown id is a no-op and returns `None`.
    pub fn remove(&mut self, entry_id: &str) -> Option<TimelineEntry> {
        let index = self.position(entry_id)?;
        let removed = self.entries.remove(index);
        debug!(entry_id, "timeline entry removed");
        self.notify(TimelineEvent::Removed(removed.clone()));
        Some(removed)
    }

    pub fn update(&mut self, entry_id: &str, patch: EntryPatch) -> PlanResult<TimelineEntry> {
        let index = self
            .position(entry_id)
            .ok_or_else(|| PlanError::NotFound(entry_id.to_string()))?;
        patch.validate()?;

        let mut candidate = self.entries[index].clone();
        patch.apply_to(&mut candidate);
        self.ensure_free(&candidate, Some(entry_id))?;

        let before = mem::replace(&mut self.entries[index], candidate.clone());
        self.sort_entries();
        debug!(
            entry_id,
            date = %candidate.scheduled_date,
            span = %candidate.span(),
            "timeline entry updated"
        );
        self.notify(TimelineEvent::Updated {
            before,
            after: candidate.clone(),
        });
        Ok(candidate)
    }

    /// Moves the entry at `source` to `destination` without re-sorting.
    pub fn reorder(&mut self, source: usize, destination: usize) -> PlanResult<()> {
        let len = self.entries.len();
        if source >= len || destination >= len {
            return Err(PlanError::validation(format!(
                "reorder indices {source} -> {destination} out of range for {len} entries"
            )));
        }

        let entry = self.entries.remove(source);
        self.entries.insert(destination, entry);
        debug!(source, destination, "timeline entries reordered");
        self.notify(TimelineEvent::Reordered {
            from: source,
            to: destination,
        });
        Ok(())
    }

    /// Start of day when `date` is empty, otherwise the latest end on that
    /// date plus the slot buffer. `None` once the suggestion would reach
    /// midnight. Nothing is reserved.
    pub fn suggest_next_slot(&self, date: NaiveDate) -> Option<NaiveTime> {
        match self.entries_on(date).map(TimelineEntry::end_minute).max() {
            None => Some(self.settings.day_start),
            Some(latest_end) => {
                time_from_minutes(latest_end.saturating_add(self.settings.slot_buffer_minutes))
            }
        }
    }

    pub fn totals(&self) -> Totals {
        totals::totals(&self.entries)
    }

    pub fn totals_for_date(&self, date: NaiveDate) -> Totals {
        totals::totals_for_date(&self.entries, date)
    }

    pub fn daily_totals(&self) -> BTreeMap<NaiveDate, Totals> {
        totals::daily_totals(&self.entries)
    }

    pub fn subscribe(&mut self, observer: impl FnMut(&TimelineEvent) + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.observers.push((id, Box::new(observer)));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(subscription, _)| *subscription != id);
        self.observers.len() != before
    }

    fn notify(&mut self, event: TimelineEvent) {
        for (_, observer) in &mut self.observers {
            observer(&event);
        }
    }

    fn position(&self, entry_id: &str) -> Option<usize> {
        self.entries.iter().position(|entry| entry.id == entry_id)
    }

    fn sort_entries(&mut self) {
        self.entries.sort_by_key(TimelineEntry::sort_key);
    }

    fn ensure_free(&self, candidate: &TimelineEntry, ignore_id: Option<&str>) -> PlanResult<()> {
        let occupied = self
            .entries
            .iter()
            .filter(|entry| Some(entry.id.as_str()) != ignore_id)
            .find(|entry| entry.overlaps(candidate));

        match occupied {
            Some(existing) => Err(PlanError::Conflict {
                date: candidate.scheduled_date,
                start: format_clock(candidate.start_minute()),
                end: format_clock(candidate.end_minute()),
                entry_id: existing.id.clone(),
                occupied_by: existing.title.clone(),
                occupied_start: format_clock(existing.start_minute()),
                occupied_end: format_clock(existing.end_minute()),
            }),
            None => Ok(()),
        }
    }

    fn next_entry_id(&self, activity_id: &str) -> String {
        let base = format!("{activity_id}-{}", Utc::now().timestamp_millis());
        let mut id = base.clone();
        while self.entry(&id).is_some() {
            id = format!("{base}-{}", random_suffix());
        }
        id
    }
}

impl Debug for TimelineStore {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimelineStore")
            .field("catalog", &self.catalog)
            .field("settings", &self.settings)
            .field("entries", &self.entries)
            .field("observers", &self.observers.len())
            .finish()
    }
}

fn random_suffix() -> String {
    thread_rng()
        .sample_iter(&Alphanumeric)
        .take(ID_SUFFIX_LEN)
        .map(char::from)
        .collect()
}
