use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use serde::Serialize;

use crate::timeline::TimelineEntry;

/// Count, time and budget summary over a set of timeline entries.
///
/// `total_cost` is a raw sum of the entries' amounts. No currency conversion
/// happens; `currencies` lists every code that went into the sum so callers
/// can spot mixed totals.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Totals {
    pub count: usize,
    pub total_duration_minutes: u64,
    pub total_cost: f64,
    pub currencies: BTreeSet<String>,
}

impl Totals {
    pub fn is_mixed_currency(&self) -> bool {
        self.currencies.len() > 1
    }

    fn add(&mut self, entry: &TimelineEntry) {
        self.count += 1;
        self.total_duration_minutes += u64::from(entry.duration_minutes);
        self.total_cost += entry.cost;
        self.currencies.insert(entry.currency.clone());
    }
}

impl<'a> FromIterator<&'a TimelineEntry> for Totals {
    fn from_iter<T: IntoIterator<Item = &'a TimelineEntry>>(iter: T) -> Self {
        let mut totals = Totals::default();
        for entry in iter {
            totals.add(entry);
        }
        totals
    }
}

pub fn totals(entries: &[TimelineEntry]) -> Totals {
    entries.iter().collect()
}

pub fn totals_for_date(entries: &[TimelineEntry], date: NaiveDate) -> Totals {
    entries
        .iter()
        .filter(|entry| entry.scheduled_date == date)
        .collect()
}

pub fn daily_totals(entries: &[TimelineEntry]) -> BTreeMap<NaiveDate, Totals> {
    let mut by_day: BTreeMap<NaiveDate, Totals> = BTreeMap::new();
    for entry in entries {
        by_day.entry(entry.scheduled_date).or_default().add(entry);
    }
    by_day
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, NaiveTime};

    use super::{daily_totals, totals, totals_for_date};
    use crate::timeline::TimelineEntry;

    fn entry(id: &str, date: &str, duration_minutes: u32, cost: f64, currency: &str) -> TimelineEntry {
        TimelineEntry {
            id: id.to_string(),
            activity_id: id.to_string(),
            scheduled_date: NaiveDate::parse_from_str(date, "%Y-%m-%d").expect("test date"),
            start_time: NaiveTime::from_hms_opt(9, 0, 0).expect("test time"),
            duration_minutes,
            cost,
            currency: currency.to_string(),
            title: id.to_string(),
            activity_type: "sightseeing".to_string(),
            description: String::new(),
        }
    }

    #[test]
    fn sums_all_entries() {
        let entries = vec![
            entry("a", "2025-06-01", 120, 20.0, "EUR"),
            entry("b", "2025-06-01", 60, 15.5, "EUR"),
            entry("c", "2025-06-02", 90, 0.0, "EUR"),
        ];

        let all = totals(&entries);
        assert_eq!(all.count, 3);
        assert_eq!(
            all.total_duration_minutes,
            entries
                .iter()
                .map(|entry| u64::from(entry.duration_minutes))
                .sum::<u64>()
        );
        assert_eq!(all.total_cost, 35.5);
        assert!(!all.is_mixed_currency());
    }

    #[test]
    fn filters_by_date() {
        let entries = vec![
            entry("a", "2025-06-01", 120, 20.0, "EUR"),
            entry("b", "2025-06-02", 60, 15.0, "EUR"),
            entry("c", "2025-06-01", 30, 5.0, "EUR"),
        ];
        let date = NaiveDate::from_ymd_opt(2025, 6, 1).expect("test date");

        let day = totals_for_date(&entries, date);
        assert_eq!(day.count, 2);
        assert_eq!(day.total_duration_minutes, 150);
        assert_eq!(day.total_cost, 25.0);

        let empty = totals_for_date(&entries, NaiveDate::from_ymd_opt(2025, 7, 1).expect("test date"));
        assert_eq!(empty.count, 0);
        assert!(empty.currencies.is_empty());
    }

    #[test]
    fn daily_breakdown_matches_per_date_totals() {
        let entries = vec![
            entry("a", "2025-06-02", 120, 20.0, "EUR"),
            entry("b", "2025-06-01", 60, 15.0, "EUR"),
            entry("c", "2025-06-02", 30, 5.0, "EUR"),
        ];

        let by_day = daily_totals(&entries);
        assert_eq!(by_day.len(), 2);
        for (date, day) in &by_day {
            assert_eq!(*day, totals_for_date(&entries, *date));
        }
        let first = by_day.keys().next().copied();
        assert_eq!(first, NaiveDate::from_ymd_opt(2025, 6, 1));
    }

    // Amounts in different currencies are added as plain numbers.
    #[test]
    fn mixed_currencies_are_summed_raw() {
        let entries = vec![
            entry("a", "2025-06-01", 60, 100.0, "EUR"),
            entry("b", "2025-06-01", 60, 100.0, "JPY"),
        ];

        let all = totals(&entries);
        assert_eq!(all.total_cost, 200.0);
        assert!(all.is_mixed_currency());
        assert_eq!(
            all.currencies.iter().map(String::as_str).collect::<Vec<_>>(),
            vec!["EUR", "JPY"]
        );
    }
}
