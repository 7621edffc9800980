// src/postback/form.rs
use tracing::warn;

use crate::config::consts::*;
use crate::core::html::{self, attr, open_tags};
use crate::error::{Result, ScrapeError};

/// Every `<input name=..>` in document order with its value (empty when absent).
pub fn named_inputs(doc: &str) -> Vec<(String, String)> {
    open_tags(doc, "input")
        .into_iter()
        .filter_map(|t| {
            let name = attr(t, "name").filter(|n| !n.is_empty())?;
            Some((name, attr(t, "value").unwrap_or_default()))
        })
        .collect()
}

/// The postback form: `form#form1`, else the first form on the page.
pub fn pick_form(doc: &str) -> Option<&str> {
    html::find_by_id(doc, "form", "form1").or_else(|| html::top_blocks(doc, "form").into_iter().next())
}

/// Server view state harvested from one page response.
///
/// Must be re-harvested before every postback: the server silently answers a
/// stale state with unrelated content rather than an error.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HiddenFormState {
    pub viewstate: Option<String>,
    pub viewstate_generator: Option<String>,
    pub event_validation: Option<String>,
    pub event_target: String,
    pub event_argument: String,
}

impl HiddenFormState {
    pub fn harvest(doc: &str) -> Result<Self> {
        let form = pick_form(doc).ok_or_else(|| ScrapeError::ProtocolState(s!("form not found")))?;
        let inputs = named_inputs(form);
        let get = |name: &str| inputs.iter().find(|(k, _)| k == name).map(|(_, v)| v.clone());

        let state = Self {
            viewstate: get(VIEWSTATE),
            viewstate_generator: get(VIEWSTATE_GENERATOR),
            event_validation: get(EVENT_VALIDATION),
            event_target: s!(),
            event_argument: s!(),
        };
        if state.viewstate.is_none() {
            warn!("form has no {VIEWSTATE}; postback will likely be ignored");
        }
        Ok(state)
    }

    pub fn with_target(mut self, target: &str) -> Self {
        self.event_target = s!(target);
        self.event_argument = s!();
        self
    }

    /// Which of the three server-issued fields are present and non-empty.
    pub fn presence(&self) -> [(&'static str, bool); 3] {
        let p = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.is_empty());
        [
            (VIEWSTATE, p(&self.viewstate)),
            (VIEWSTATE_GENERATOR, p(&self.viewstate_generator)),
            (EVENT_VALIDATION, p(&self.event_validation)),
        ]
    }

    /// Payload fields, server-issued first, then target/argument.
    pub fn to_fields(&self) -> Vec<(String, String)> {
        let mut out = Vec::with_capacity(5);
        for (k, v) in [
            (VIEWSTATE, &self.viewstate),
            (VIEWSTATE_GENERATOR, &self.viewstate_generator),
            (EVENT_VALIDATION, &self.event_validation),
        ] {
            if let Some(v) = v {
                out.push((s!(k), v.clone()));
            }
        }
        out.push((s!(EVENT_TARGET), self.event_target.clone()));
        out.push((s!(EVENT_ARGUMENT), self.event_argument.clone()));
        out
    }
}

/// Is the script manager rendered as a form input? (Diagnostics only.)
pub fn has_script_manager_input(doc: &str) -> bool {
    open_tags(doc, "input")
        .into_iter()
        .any(|t| attr(t, "name").as_deref() == Some(SCRIPT_MANAGER))
}
