// src/postback/diag.rs
use std::fmt;

use tracing::info;

use super::delta;
use super::engine::{DayQuery, PostbackEngine, Stage};
use super::form::{HiddenFormState, has_script_manager_input};
use super::table::{find_result_table, styled_row_count};
use crate::config::consts::*;
use crate::config::options::PostbackOptions;
use crate::error::Result;
use crate::session::Session;

const HEAD_CHARS: usize = 500;

/// What one AJAX search round trip looked like on the wire.
#[derive(Clone, Debug, Default)]
pub struct Diagnosis {
    pub hidden_present: Vec<(&'static str, bool)>,
    pub script_manager_input: bool,
    /// Search payload with view-state values replaced by their sizes.
    pub masked_payload: Vec<(String, String)>,
    pub status: u16,
    pub fragments: usize,
    /// First characters of the effective html, newlines flattened.
    pub head: String,
    pub table: Option<String>,
    pub styled_rows: usize,
}

/// Hide the bulky opaque fields, keep everything else verbatim.
pub fn mask_payload(fields: &[(String, String)]) -> Vec<(String, String)> {
    fields
        .iter()
        .map(|(k, v)| {
            if k == VIEWSTATE || k == EVENT_VALIDATION {
                (k.clone(), format!("<{k}:{} bytes>", v.len()))
            } else {
                (k.clone(), v.clone())
            }
        })
        .collect()
}

fn head(s: &str, n: usize) -> String {
    s.chars().take(n).map(|c| if c == '\n' || c == '\r' { ' ' } else { c }).collect()
}

/// Run a single AJAX search and report what came back.
pub fn diagnose(session: &Session, q: &DayQuery<'_>) -> Result<Diagnosis> {
    let engine = PostbackEngine::new(session, PostbackOptions::default());

    let page = session.exec().get(&session.url(DATA_PATH), &[])?.error_for_status()?;
    let state = HiddenFormState::harvest(&page.body)?;
    let mut out = Diagnosis {
        hidden_present: state.presence().to_vec(),
        script_manager_input: has_script_manager_input(&page.body),
        ..Default::default()
    };

    let fields = PostbackEngine::payload(state, &Stage::AjaxSearch, q);
    out.masked_payload = mask_payload(&fields);

    let resp = engine.post(&fields, true)?;
    out.status = resp.status;
    out.fragments = delta::decode(&resp.body).len();
    let html = delta::effective_html(&resp.body);
    out.head = head(&html, HEAD_CHARS);
    out.table = find_result_table(&html, true).map(|t| t.label());
    out.styled_rows = styled_row_count(&html);

    info!(station = q.station, date = q.date, status = out.status, table = ?out.table, styled_rows = out.styled_rows, "diagnosis done");
    Ok(out)
}

impl fmt::Display for Diagnosis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "hidden fields:")?;
        for (name, present) in &self.hidden_present {
            writeln!(f, "  {name}: {}", if *present { "present" } else { "MISSING" })?;
        }
        writeln!(f, "script manager input: {}", self.script_manager_input)?;
        writeln!(f, "payload:")?;
        for (k, v) in &self.masked_payload {
            writeln!(f, "  {k} = {v}")?;
        }
        writeln!(f, "status: {}  fragments: {}", self.status, self.fragments)?;
        writeln!(f, "table: {}", self.table.as_deref().unwrap_or("none"))?;
        writeln!(f, "styled rows: {}", self.styled_rows)?;
        write!(f, "head: {}", self.head)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn masks_only_opaque_state() {
        let fields = fields![
            (VIEWSTATE, "abcdef"),
            (VIEWSTATE_GENERATOR, "CA0B"),
            (EVENT_VALIDATION, "xyz"),
            (DATE_BOX, "05/11/2025"),
        ];
        let m = mask_payload(&fields);
        assert_eq!(m[0].1, "<__VIEWSTATE:6 bytes>");
        assert_eq!(m[1].1, "CA0B");
        assert_eq!(m[2].1, "<__EVENTVALIDATION:3 bytes>");
        assert_eq!(m[3].1, "05/11/2025");
    }

    #[test]
    fn head_flattens_newlines() {
        assert_eq!(head("a\nb\r\nc", 4), "a b ");
    }
}
