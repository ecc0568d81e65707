use chrono::{NaiveDate, NaiveTime, Timelike};

use crate::error::{PlanError, PlanResult};

pub const MINUTES_PER_DAY: u32 = 24 * 60;

pub fn parse_date(input: &str) -> PlanResult<NaiveDate> {
    let invalid = || PlanError::validation(format!("invalid date '{input}', expected YYYY-MM-DD"));
    if !matches_shape(input, "dddd-dd-dd") {
        return Err(invalid());
    }
    NaiveDate::parse_from_str(input, "%Y-%m-%d").map_err(|_| invalid())
}

pub fn parse_time(input: &str) -> PlanResult<NaiveTime> {
    let invalid = || PlanError::validation(format!("invalid time '{input}', expected HH:MM"));
    if !matches_shape(input, "dd:dd") {
        return Err(invalid());
    }
    NaiveTime::parse_from_str(input, "%H:%M").map_err(|_| invalid())
}

/// Checks `input` byte for byte against `shape`, where `d` stands for an
/// ASCII digit and every other byte must match literally. chrono alone
/// accepts single digits, signs and padding.
fn matches_shape(input: &str, shape: &str) -> bool {
    input.len() == shape.len()
        && input
            .bytes()
            .zip(shape.bytes())
            .all(|(byte, expected)| match expected {
                b'd' => byte.is_ascii_digit(),
                literal => byte == literal,
            })
}

/// Minutes elapsed since midnight, ignoring seconds.
pub fn minute_of_day(time: NaiveTime) -> u32 {
    time.hour() * 60 + time.minute()
}

/// Inverse of [`minute_of_day`]; `None` once the value reaches midnight.
pub fn time_from_minutes(minutes: u32) -> Option<NaiveTime> {
    if minutes >= MINUTES_PER_DAY {
        return None;
    }
    NaiveTime::from_hms_opt(minutes / 60, minutes % 60, 0)
}

/// Formats a minute offset as `HH:MM`. Offsets past midnight keep counting
/// hours (`25:30`) so spans that spill over the day stay readable.
pub fn format_clock(minutes: u32) -> String {
    format!("{:02}:{:02}", minutes / 60, minutes % 60)
}

pub fn format_time(time: NaiveTime) -> String {
    format_clock(minute_of_day(time))
}

pub fn format_duration(minutes: u32) -> String {
    let hours = minutes / 60;
    let minutes = minutes % 60;
    match (hours, minutes) {
        (0, minutes) => format!("{minutes}m"),
        (hours, 0) => format!("{hours}h"),
        (hours, minutes) => format!("{hours}h {minutes:02}m"),
    }
}
