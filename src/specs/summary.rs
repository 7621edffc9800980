// src/specs/summary.rs
//! Per-station summary page probe (`Raingauge_Summary_Station.aspx?id=..&d=..&t=..`).
//!
//! Classification order: a JSON `status` field, then the ordered keyword groups
//! over the body, then the long-body policy, else UNKNOWN.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::consts::SUMMARY_PATH;
use crate::config::options::StatusPolicy;
use crate::session::Session;
use crate::status::{self, API_KEYWORDS, Status};

pub fn summary_url(base: &str, code: &str, now: DateTime<Utc>) -> String {
    format!(
        "{base}{SUMMARY_PATH}?id={code}&d={}&t={}",
        now.format("%d/%m/%Y"),
        now.format("%H:%M")
    )
}

fn from_json(body: &str) -> Option<Status> {
    let v: Value = serde_json::from_str(body.trim()).ok()?;
    let raw = v.get("status")?.as_str()?;
    Some(Status::from_name(raw).unwrap_or_else(|| status::classify(&API_KEYWORDS, raw)))
}

pub fn classify_body(body: &str, policy: &StatusPolicy) -> Status {
    if let Some(st) = from_json(body) {
        return st;
    }
    let st = status::classify(&API_KEYWORDS, body);
    if st.is_known() {
        return st;
    }
    if policy.assume_online_on_long_body && body.chars().count() > policy.long_body_chars {
        return Status::Online;
    }
    Status::Unknown
}

/// Probe one station. Request failures are logged and yield `None`.
pub fn probe(session: &Session, code: &str, now: DateTime<Utc>, policy: &StatusPolicy) -> Option<Status> {
    let url = summary_url(session.base(), code, now);
    match session.exec().get(&url, &[]).and_then(|r| r.error_for_status()) {
        Ok(resp) => {
            let st = classify_body(&resp.body, policy);
            debug!(station = code, status = %st, bytes = resp.body.len(), "summary probed");
            Some(st)
        }
        Err(e) => {
            warn!(station = code, error = %e, "summary probe failed");
            None
        }
    }
}

/// Probe each code in turn; failed probes are left out.
pub fn probe_many<'a, I>(session: &Session, codes: I, now: DateTime<Utc>, policy: &StatusPolicy) -> HashMap<String, Status>
where
    I: IntoIterator<Item = &'a str>,
{
    codes
        .into_iter()
        .filter_map(|c| probe(session, c, now, policy).map(|st| (s!(c), st)))
        .collect()
}
