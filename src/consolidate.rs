// src/consolidate.rs
use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::core::sanitize::first_decimal;
use crate::core::time::parse_info_date;
use crate::data::StationRecord;

fn timestamp(rec: &StationRecord) -> Option<DateTime<Utc>> {
    rec.date.as_deref().and_then(parse_info_date)
}

/// Should `new` supersede `stored`? Only a strictly newer parsed timestamp does;
/// a dated record also supersedes an undated one.
fn supersedes(new: Option<DateTime<Utc>>, stored: Option<DateTime<Utc>>) -> bool {
    match (new, stored) {
        (Some(n), Some(s)) => n > s,
        (Some(_), None) => true,
        (None, _) => false,
    }
}

/// One record per station code, first-seen order. Records without a code are
/// dropped. Survivors get `rain_mm` and `date_iso` filled in.
///
/// Running the output through again changes nothing.
pub fn consolidate<I>(records: I) -> Vec<StationRecord>
where
    I: IntoIterator<Item = StationRecord>,
{
    let mut out: Vec<StationRecord> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut dropped = 0usize;

    for mut rec in records {
        let code = rec.station_code.trim().to_string();
        if code.is_empty() {
            dropped += 1;
            continue;
        }
        rec.station_code = code;
        let ts = timestamp(&rec);

        if let Some(&i) = index.get(&rec.station_code) {
            if !supersedes(ts, timestamp(&out[i])) {
                continue;
            }
            out[i] = normalize(rec, ts);
        } else {
            index.insert(rec.station_code.clone(), out.len());
            out.push(normalize(rec, ts));
        }
    }

    if dropped > 0 {
        debug!(dropped, kept = out.len(), "records without a station code dropped");
    }
    out
}

fn normalize(mut rec: StationRecord, ts: Option<DateTime<Utc>>) -> StationRecord {
    rec.rain_mm = rec.rain.as_deref().and_then(first_decimal);
    rec.date_iso = ts.map(|t| t.to_rfc3339());
    rec
}
