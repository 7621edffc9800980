// src/core/time.rs
use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, Utc};

/// Map info-block dates, tried in order. Both are UTC wall time.
const INFO_DATE_FORMATS: &[&str] = &["%d/%m/%Y %H:%M UTC", "%d/%m/%Y %H:%M"];

/// Result-grid timestamps.
const GRID_FORMAT: &str = "%d/%m/%Y %H:%M:%S";

pub const QUERY_DATE_FORMAT: &str = "%d/%m/%Y";

/// Parse a map info-block date (`01/05/2025 10:00 UTC` or without the suffix).
pub fn parse_info_date(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    INFO_DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(|naive| naive.and_utc())
}

/// Parse a grid timestamp. Failure sorts first: callers use `NaiveDateTime::MIN`.
pub fn parse_grid_timestamp(s: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s.trim(), GRID_FORMAT).ok()
}

pub fn grid_sort_key(s: &str) -> NaiveDateTime {
    parse_grid_timestamp(s).unwrap_or(NaiveDateTime::MIN)
}

/// `dd/mm/YYYY` as the query form expects it.
pub fn query_date(d: NaiveDate) -> String {
    d.format(QUERY_DATE_FORMAT).to_string()
}

pub fn parse_query_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), QUERY_DATE_FORMAT).ok()
}

/// First and last day of a month. `None` for an invalid month.
pub fn month_range(year: i32, month: u32) -> Option<(NaiveDate, NaiveDate)> {
    let start = NaiveDate::from_ymd_opt(year, month, 1)?;
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    };
    Some((start, next - Duration::days(1)))
}

/// Every day of a month, in order.
pub fn month_days(year: i32, month: u32) -> Vec<NaiveDate> {
    let Some((start, end)) = month_range(year, month) else { return Vec::new() };
    start.iter_days().take_while(|d| *d <= end).collect()
}

pub fn days_in_month(year: i32, month: u32) -> u32 {
    month_range(year, month).map(|(_, end)| end.day()).unwrap_or(0)
}
