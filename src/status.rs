// src/status.rs
//! Station status: the classification vocabulary and the reconciliation of
//! several independently derived signals into one authoritative value.
//!
//! All keyword-based classifiers share [`classify`] over static, ordered
//! [`KeywordTable`]s. First group with a hit wins, so table order *is* precedence.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::options::StatusPolicy;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Status {
    Online,
    Offline,
    Timeout,
    Disconnect,
    Repair,
    Unknown,
}

impl Status {
    pub const ALL: [Status; 6] = [
        Status::Online,
        Status::Offline,
        Status::Timeout,
        Status::Disconnect,
        Status::Repair,
        Status::Unknown,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Status::Online => "ONLINE",
            Status::Offline => "OFFLINE",
            Status::Timeout => "TIMEOUT",
            Status::Disconnect => "DISCONNECT",
            Status::Repair => "REPAIR",
            Status::Unknown => "UNKNOWN",
        }
    }

    /// Exact (case-insensitive) status name. Anything else is `None`.
    pub fn from_name(s: &str) -> Option<Status> {
        Status::ALL.into_iter().find(|st| st.as_str().eq_ignore_ascii_case(s.trim()))
    }

    pub fn is_known(self) -> bool {
        self != Status::Unknown
    }

    /// `Some(self)` unless UNKNOWN.
    pub fn known(self) -> Option<Status> {
        self.is_known().then_some(self)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered (keywords, status) groups. Keywords are lowercase substrings.
pub struct KeywordTable(pub &'static [(&'static [&'static str], Status)]);

/// Map marker icon file names.
pub static ICON_KEYWORDS: KeywordTable = KeywordTable(&[
    (&["online", "green", "_1"], Status::Online),
    (&["offline", "red", "_0"], Status::Offline),
    (&["timeout", "yellow", "orange"], Status::Timeout),
    (&["disconnect", "grey", "gray"], Status::Disconnect),
    (&["repair", "maintenance"], Status::Repair),
]);

/// Status images on the all-stations list (`src` + `alt`).
pub static IMAGE_KEYWORDS: KeywordTable = KeywordTable(&[
    (&["online", "green", "normal"], Status::Online),
    (&["offline", "red"], Status::Offline),
    (&["timeout", "yellow", "warning"], Status::Timeout),
    (&["disconnect", "grey", "gray"], Status::Disconnect),
    (&["repair", "maintenance"], Status::Repair),
]);

/// Free-text status labels from the map info block.
pub static LABEL_KEYWORDS: KeywordTable = KeywordTable(&[
    (&["online", "normal", "active"], Status::Online),
    (&["offline"], Status::Offline),
    (&["timeout"], Status::Timeout),
    (&["disconnect"], Status::Disconnect),
]);

/// Summary page body text. "disconnected" hits the ONLINE group via "connected".
pub static API_KEYWORDS: KeywordTable = KeywordTable(&[
    (&["online", "connected", "normal", "active"], Status::Online),
    (&["offline", "disconnected"], Status::Offline),
    (&["timeout", "warning", "delayed"], Status::Timeout),
    (&["disconnect"], Status::Disconnect),
    (&["repair", "maintenance"], Status::Repair),
]);

pub fn classify(table: &KeywordTable, text: &str) -> Status {
    let lc = text.to_lowercase();
    table
        .0
        .iter()
        .find(|(keywords, _)| keywords.iter().any(|kw| lc.contains(kw)))
        .map(|(_, st)| *st)
        .unwrap_or(Status::Unknown)
}

/// The independent signals for one station. `None` means "source not consulted".
#[derive(Clone, Debug, Default)]
pub struct Signals<'a> {
    /// All-stations status list.
    pub list: Option<Status>,
    /// Info-block `Status:` text.
    pub label: Option<&'a str>,
    /// Marker icon file name classification.
    pub icon: Option<Status>,
    /// Info-block reading time.
    pub timestamp: Option<DateTime<Utc>>,
}

/// Resolve one status. Precedence: list, label, icon, then recency.
/// UNKNOWN at any tier falls through to the next.
pub fn reconcile(sig: &Signals<'_>, now: DateTime<Utc>, policy: &StatusPolicy) -> Status {
    sig.list
        .and_then(Status::known)
        .or_else(|| sig.label.and_then(|l| classify(&LABEL_KEYWORDS, l).known()))
        .or_else(|| sig.icon.and_then(Status::known))
        .unwrap_or_else(|| from_recency(sig.timestamp, now, policy))
}

/// How stale the last reading is. No timestamp at all counts as disconnected.
pub fn from_recency(ts: Option<DateTime<Utc>>, now: DateTime<Utc>, policy: &StatusPolicy) -> Status {
    let Some(ts) = ts else { return Status::Disconnect };
    let delay = now - ts;
    if delay <= policy.online_within {
        Status::Online
    } else if delay <= policy.timeout_within {
        Status::Timeout
    } else {
        Status::Disconnect
    }
}

/// Per-status counts, in `Status::ALL` order, zeros omitted.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StatusSummary {
    pub total: usize,
    pub counts: Vec<(Status, usize)>,
}

impl StatusSummary {
    pub fn from_statuses<I: IntoIterator<Item = Status>>(it: I) -> Self {
        let mut counts = [0usize; 6];
        let mut total = 0;
        for st in it {
            counts[Status::ALL.iter().position(|s| *s == st).unwrap_or(5)] += 1;
            total += 1;
        }
        Self {
            total,
            counts: Status::ALL.into_iter().zip(counts).filter(|(_, n)| *n > 0).collect(),
        }
    }

    pub fn percent(&self, n: usize) -> f64 {
        if self.total == 0 { 0.0 } else { n as f64 * 100.0 / self.total as f64 }
    }
}
