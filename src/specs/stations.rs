// src/specs/stations.rs
//! Station directory: the station `<select>` on the historical data page.
//!
//! Options look like `<option value="G1001">G1001 - Rayong</option>`. Placeholder
//! options (empty value or `--...`) are skipped.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::consts::{DATA_PATH, STATION_DROPDOWN, STATION_DROPDOWN_ID};
use crate::core::html::{self, attr, open_tag_of, text_of};
use crate::data::StationRef;
use crate::error::{Result, ScrapeError};
use crate::session::Session;

fn station_select(doc: &str) -> Option<&str> {
    html::find_by_id(doc, "select", STATION_DROPDOWN_ID).or_else(|| {
        html::all_blocks(doc, "select")
            .into_iter()
            .find(|b| attr(open_tag_of(b), "name").as_deref() == Some(STATION_DROPDOWN))
    })
}

/// Stations in dropdown order. No dropdown means an empty list.
pub fn parse_station_select(doc: &str) -> Vec<StationRef> {
    let Some(select) = station_select(doc) else {
        debug!("station dropdown not found");
        return Vec::new();
    };
    html::all_blocks(select, "option")
        .into_iter()
        .filter_map(|opt| {
            let code = attr(open_tag_of(opt), "value")?.trim().to_string();
            if code.is_empty() || code.starts_with("--") {
                return None;
            }
            let text = text_of(opt);
            let name = match text.split_once(" - ") {
                Some((_, n)) => n.trim().to_string(),
                None => text,
            };
            Some(StationRef { code, name })
        })
        .collect()
}

/// Keep stations whose code contains any comma-separated term (case-insensitive).
/// A blank filter keeps everything.
pub fn filter_stations(stations: Vec<StationRef>, filter: &str) -> Vec<StationRef> {
    let terms: Vec<String> = filter
        .split(',')
        .map(|t| t.trim().to_uppercase())
        .filter(|t| !t.is_empty())
        .collect();
    if terms.is_empty() {
        return stations;
    }
    stations
        .into_iter()
        .filter(|st| {
            let code = st.code.to_uppercase();
            terms.iter().any(|t| code.contains(t.as_str()))
        })
        .collect()
}

pub fn fetch(session: &Session) -> Result<Vec<StationRef>> {
    let page = session.exec().get(&session.url(DATA_PATH), &[])?.error_for_status()?;
    let stations = parse_station_select(&page.body);
    debug!(stations = stations.len(), "station directory parsed");
    Ok(stations)
}

#[derive(Debug, Deserialize)]
struct NameEntry {
    name_th: Option<String>,
    name: Option<String>,
}

/// Display-name overrides from a JSON file keyed by station code:
/// `{"G1001": {"name_th": "..."}}`. `name_th` wins over `name`.
pub fn load_name_overrides(path: &Path) -> Result<HashMap<String, String>> {
    let text = std::fs::read_to_string(path)?;
    let raw: HashMap<String, NameEntry> = serde_json::from_str(&text)
        .map_err(|e| ScrapeError::Config(format!("{}: {e}", path.display())))?;
    Ok(raw
        .into_iter()
        .filter_map(|(code, e)| e.name_th.or(e.name).filter(|n| !n.trim().is_empty()).map(|n| (code, n)))
        .collect())
}

/// Replace names that have an override; unknown codes keep their dropdown name.
pub fn apply_name_overrides(stations: &mut [StationRef], names: &HashMap<String, String>) {
    for st in stations.iter_mut() {
        if let Some(n) = names.get(&st.code) {
            st.name = n.clone();
        }
    }
    if !names.is_empty() {
        let hits = stations.iter().filter(|s| names.contains_key(&s.code)).count();
        if hits == 0 {
            warn!(overrides = names.len(), "no station matched the name overrides");
        }
    }
}
