// src/specs/map.rs
//! Map snapshot page: one [`StationRecord`] per `SetMap(...)` call.
//!
//! Records are built in explicit stages, each owning its fields:
//! 1. positional arguments -> [`MapEntry`]
//! 2. icon file name -> `status_from_icon`
//! 3. info block -> readings, raw date, status label (code only if the block has one)
//! 4. [`status::reconcile`] -> `status`
//!
//! Numeric normalization (`rain_mm`, `date_iso`) is left to `consolidate`.

use std::collections::HashMap;
use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use tracing::debug;

use super::info::parse_info;
use super::setmap::{ParsedValue, parse_calls};
use crate::config::options::StatusPolicy;
use crate::core::time::parse_info_date;
use crate::data::StationRecord;
use crate::status::{self, ICON_KEYWORDS, Signals, Status};

/// Rain-intensity markers (`raingauge_3.png`) say nothing about connectivity.
static RAIN_LEVEL_ICON: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)raingauge[_-]\d+(?:\.png)?").expect("rain icon regex"));

/// Positional layout of one `SetMap` call.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MapEntry {
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub icon_config: Option<ParsedValue>,
    pub marker_type: Option<ParsedValue>,
    pub image_path: Option<String>,
    pub name: Option<String>,
    pub info_html: Option<String>,
    pub icon_filename: Option<String>,
    pub code: Option<String>,
    pub radar: Radar,
}

/// Trailing radar-overlay arguments; carried but unused downstream.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Radar {
    pub radius: Option<f64>,
    pub label_lat: Option<f64>,
    pub label_lon: Option<f64>,
    pub kind: Option<String>,
    pub name: Option<String>,
    pub address: Option<String>,
}

impl MapEntry {
    pub fn from_args(args: &[ParsedValue]) -> Self {
        let at = |i: usize| args.get(i);
        let num = |i: usize| at(i).and_then(ParsedValue::as_f64);
        let text = |i: usize| at(i).and_then(ParsedValue::as_text);
        Self {
            lat: num(0),
            lon: num(1),
            icon_config: at(2).cloned(),
            marker_type: at(3).cloned(),
            image_path: text(4),
            name: text(5),
            info_html: text(6),
            icon_filename: text(7),
            code: text(8),
            radar: Radar {
                radius: num(9),
                label_lat: num(10),
                label_lon: num(11),
                kind: text(12),
                name: text(13),
                address: text(14),
            },
        }
    }
}

/// The declaration `SetMap(lat, lon, ...)` shows up as the first call.
fn is_header_call(args: &[ParsedValue]) -> bool {
    matches!(args.first(), Some(ParsedValue::Text(t)) if t.eq_ignore_ascii_case("lat"))
}

/// Every data call on the page, header pseudo-call removed.
pub fn map_entries(doc: &str) -> Vec<MapEntry> {
    let mut calls = parse_calls(doc);
    if calls.first().is_some_and(|a| is_header_call(a)) {
        calls.remove(0);
    }
    calls.iter().map(|a| MapEntry::from_args(a)).collect()
}

/// Icon file name -> status. Rain-level icons are always UNKNOWN.
pub fn status_from_icon(icon: Option<&str>) -> Status {
    match icon {
        Some(i) if !i.trim().is_empty() && !RAIN_LEVEL_ICON.is_match(i) => status::classify(&ICON_KEYWORDS, i),
        _ => Status::Unknown,
    }
}

/// Stages 1-3: positional fields, icon status, info block.
pub fn base_record(entry: &MapEntry) -> StationRecord {
    let info = entry.info_html.as_deref().map(parse_info).unwrap_or_default();

    // the info block names the station more reliably than the trailing argument
    let code = info.code.or_else(|| entry.code.clone()).unwrap_or_default();
    let mut rec = StationRecord::new(code);
    rec.name = entry.name.clone();
    rec.lat = entry.lat;
    rec.lon = entry.lon;
    rec.image_path = entry.image_path.clone();
    rec.icon_filename = entry.icon_filename.clone();

    rec.status_from_icon = status_from_icon(entry.icon_filename.as_deref());

    rec.rain = info.rain;
    rec.date = info.date;
    rec.temperature_c = info.temperature_c;
    rec.humidity_pct = info.humidity_pct;
    rec.battery_v = info.battery_v;
    rec.solar_v = info.solar_v;
    rec.status_text = info.status_text;
    rec
}

/// External per-station signals gathered before parsing the map.
#[derive(Clone, Debug, Default)]
pub struct ExternalSignals {
    /// All-stations list, by code.
    pub list: HashMap<String, Status>,
}

/// Stage 4.
pub fn resolve_status(rec: &mut StationRecord, ext: &ExternalSignals, now: DateTime<Utc>, policy: &StatusPolicy) {
    let sig = Signals {
        list: ext.list.get(&rec.station_code).copied(),
        label: rec.status_text.as_deref(),
        icon: Some(rec.status_from_icon),
        timestamp: rec.date.as_deref().and_then(parse_info_date),
    };
    rec.status = status::reconcile(&sig, now, policy);
}

/// Parse the map page into status-resolved records, in page order.
/// Records may still lack a code; the consolidator drops those.
pub fn parse_map(doc: &str, ext: &ExternalSignals, now: DateTime<Utc>, policy: &StatusPolicy) -> Vec<StationRecord> {
    let entries = map_entries(doc);
    debug!(calls = entries.len(), "map calls parsed");
    entries
        .iter()
        .map(|e| {
            let mut rec = base_record(e);
            resolve_status(&mut rec, ext, now, policy);
            rec
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn now() -> DateTime<Utc> {
        NaiveDate::from_ymd_opt(2025, 5, 1).unwrap().and_hms_opt(12, 0, 0).unwrap().and_utc()
    }

    const PAGE: &str = r#"
        <script>
        function SetMap(lat, lon, icon, mtype, img, name, info, iconfile, code) { }
        SetMap(13.5, 101.2, {w: 32, h: 32}, 1, 'images/st.png', 'Rayong', 'Code: G1001<br>Rain: 2.5 mm<br>Date: 01/05/2025 10:00 UTC', 'raingauge_online_1.png', 'G1001', 0, 13.6, 101.3, '', '', '');
        SetMap(14.0, 100.0, '', 1, '', 'Nowhere', 'Rain: 0 mm', 'raingauge_3.png', 'G2002');
        </script>"#;

    #[test]
    fn header_call_is_skipped() {
        let entries = map_entries(PAGE);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].code.as_deref(), Some("G1001"));
        assert_eq!(entries[0].lat, Some(13.5));
        assert_eq!(entries[0].radar.label_lon, Some(101.3));
        assert_eq!(entries[0].icon_config.as_ref().and_then(|c| c.get("w")), Some(&ParsedValue::Int(32)));
    }

    #[test]
    fn icon_classification() {
        assert_eq!(status_from_icon(Some("raingauge_online_1.png")), Status::Online);
        assert_eq!(status_from_icon(Some("RainGauge-3.png")), Status::Unknown);
        assert_eq!(status_from_icon(Some("marker_red.png")), Status::Offline);
        assert_eq!(status_from_icon(None), Status::Unknown);
    }

    #[test]
    fn staged_records_resolve_status() {
        let recs = parse_map(PAGE, &ExternalSignals::default(), now(), &StatusPolicy::default());
        assert_eq!(recs.len(), 2);

        let g1 = &recs[0];
        assert_eq!(g1.station_code, "G1001");
        assert_eq!(g1.name.as_deref(), Some("Rayong"));
        assert_eq!(g1.status_from_icon, Status::Online);
        assert_eq!(g1.status, Status::Online);
        assert_eq!(g1.rain.as_deref(), Some("2.5 mm"));

        // rain-level icon, no date: falls through to recency
        let g2 = &recs[1];
        assert_eq!(g2.station_code, "G2002");
        assert_eq!(g2.status_from_icon, Status::Unknown);
        assert_eq!(g2.status, Status::Disconnect);
    }

    #[test]
    fn list_signal_outranks_icon() {
        let mut ext = ExternalSignals::default();
        ext.list.insert(s!("G1001"), Status::Offline);
        let recs = parse_map(PAGE, &ext, now(), &StatusPolicy::default());
        assert_eq!(recs[0].status, Status::Offline);
    }

    #[test]
    fn info_code_wins_over_argument() {
        let args = vec![
            ParsedValue::Float(1.0),
            ParsedValue::Float(2.0),
            ParsedValue::Text(s!()),
            ParsedValue::Int(1),
            ParsedValue::Text(s!()),
            ParsedValue::Text(s!("X")),
            ParsedValue::Text(s!("Code: G7")),
            ParsedValue::Text(s!("pin.png")),
            ParsedValue::Text(s!("G7-old")),
        ];
        let rec = base_record(&MapEntry::from_args(&args));
        assert_eq!(rec.station_code, "G7");

        let rec = base_record(&MapEntry::from_args(&args[..6]));
        assert_eq!(rec.station_code, "");
    }
}
