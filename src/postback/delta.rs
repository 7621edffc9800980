// src/postback/delta.rs
//! Partial-postback (delta) response decoding.
//!
//! The body is a flat `|`-separated token list. An `updatePanel` token is always
//! followed by exactly three more: panel id, declared length, html payload. Any
//! other token is skipped one at a time so the cursor never drifts. The declared
//! length is not trusted.

const PANEL_MARKER: &str = "updatePanel";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UpdatePanelFragment {
    pub panel_id: String,
    pub html: String,
}

pub fn decode(body: &str) -> Vec<UpdatePanelFragment> {
    if !body.contains('|') {
        return Vec::new();
    }
    let parts: Vec<&str> = body.split('|').collect();
    let mut out = Vec::new();
    let mut i = 0usize;
    while i + 3 < parts.len() {
        if parts[i] == PANEL_MARKER {
            out.push(UpdatePanelFragment {
                panel_id: s!(parts[i + 1]),
                html: s!(parts[i + 3]),
            });
            i += 4;
        } else {
            i += 1;
        }
    }
    out
}

/// The HTML to search for the results table: every decoded panel joined, or the
/// raw body when nothing decodes (a full page, or an error page).
pub fn effective_html(body: &str) -> String {
    let frags = decode(body);
    if frags.is_empty() {
        s!(body)
    } else {
        frags.iter().map(|f| f.html.as_str()).collect::<Vec<_>>().join("\n")
    }
}
