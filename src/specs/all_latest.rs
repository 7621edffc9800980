// src/specs/all_latest.rs
//! All-stations latest status list (`Raingauge_All_Lastest.aspx`).
//!
//! The table lives in the first `div.panel-body`. Row 0 is the header. A row's key
//! is the first of its first three cells that looks like a station code; its
//! status comes from the `<img>` whose id contains `Img_Status`.
//!
//! This is the most trusted status signal; a failed fetch simply means the
//! signal is absent for this run.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, warn};

use crate::config::consts::ALL_LATEST_PATH;
use crate::core::html::{self, attr, has_class_marker, open_tag_of, open_tags, text_of};
use crate::session::Session;
use crate::status::{self, IMAGE_KEYWORDS, Status};

static STATION_CODE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[A-Za-z]\d+$").expect("code regex"));
static STATUS_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)status[_-](\w+)").expect("status name regex"));

/// One row of the list.
#[derive(Clone, Debug, PartialEq)]
pub struct ListedStatus {
    pub status: Status,
    pub src: Option<String>,
    pub alt: Option<String>,
    /// First cells of the row, as text.
    pub cells: Vec<String>,
}

/// `src` + `alt` of a status image: keyword groups, then a `status_<name>` file name.
pub fn status_from_image(src: Option<&str>, alt: Option<&str>) -> Status {
    let (src, alt) = (src.unwrap_or(""), alt.unwrap_or(""));
    if src.is_empty() && alt.is_empty() {
        return Status::Unknown;
    }
    let combined = format!("{src} {alt}");
    status::classify(&IMAGE_KEYWORDS, &combined)
        .known()
        .or_else(|| {
            let caps = STATUS_NAME.captures(&combined)?;
            Status::from_name(&caps[1]).and_then(Status::known)
        })
        .unwrap_or(Status::Unknown)
}

fn panel_table(doc: &str) -> Option<&str> {
    let panel = html::all_blocks(doc, "div")
        .into_iter()
        .find(|d| has_class_marker(open_tag_of(d), &["panel-body"]))?;
    html::all_blocks(panel, "table").into_iter().next()
}

/// Parse the list page. Later rows for the same code overwrite earlier ones.
pub fn parse_all_latest(doc: &str) -> HashMap<String, ListedStatus> {
    let mut out = HashMap::new();
    let Some(table) = panel_table(doc) else {
        debug!("status list table not found");
        return out;
    };

    for tr in html::all_blocks(table, "tr").into_iter().skip(1) {
        let cells: Vec<String> = html::all_blocks(tr, "td").into_iter().map(text_of).collect();
        if cells.len() < 2 {
            continue;
        }
        let Some(code) = cells.iter().take(3).find(|c| STATION_CODE.is_match(c)).cloned() else {
            continue;
        };
        let img = open_tags(tr, "img")
            .into_iter()
            .find(|t| attr(t, "id").is_some_and(|id| id.contains("Img_Status")));
        let src = img.and_then(|t| attr(t, "src"));
        let alt = img.and_then(|t| attr(t, "alt"));
        let status = status_from_image(src.as_deref(), alt.as_deref());
        out.insert(code, ListedStatus { status, src, alt, cells: cells.into_iter().take(10).collect() });
    }
    out
}

/// Fetch and parse. Any failure yields an empty list.
pub fn fetch(session: &Session) -> HashMap<String, ListedStatus> {
    let url = session.url(ALL_LATEST_PATH);
    match session.exec().get(&url, &[]).and_then(|r| r.error_for_status()) {
        Ok(resp) => {
            let list = parse_all_latest(&resp.body);
            debug!(stations = list.len(), "status list parsed");
            list
        }
        Err(e) => {
            warn!(error = %e, url, "status list unavailable");
            HashMap::new()
        }
    }
}

/// Code -> status, for reconciliation.
pub fn statuses(list: &HashMap<String, ListedStatus>) -> HashMap<String, Status> {
    list.iter().map(|(k, v)| (k.clone(), v.status)).collect()
}
