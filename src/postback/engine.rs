// src/postback/engine.rs
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, info, warn};

use super::delta;
use super::form::HiddenFormState;
use super::table::{self, TableRow};
use crate::config::consts::*;
use crate::config::options::PostbackOptions;
use crate::core::HttpResponse;
use crate::core::sanitize::{filename_safe, normalize_entities};
use crate::data::DailyReading;
use crate::error::{Result, ScrapeError};
use crate::session::Session;

static SHOW_ALL_CONTROL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?i)<(?:button|a)[^>]+onclick="__doPostBack\('([^']+)',''\)"[^>]*>\s*Show\s+All\s+Records\s*</(?:button|a)>"#,
    )
    .expect("show-all regex")
});

static ANY_POSTBACK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)__doPostBack\('([^']+)',''\)").expect("postback regex"));

/// Postback target of the control that switches the grid to "all rows".
///
/// Prefers a button/link literally labelled "Show All Records"; otherwise any
/// argument-less `__doPostBack` target, favoring ones that name the grid.
pub fn find_show_all_target(doc: &str) -> Option<String> {
    let scan = |h: &str| -> Option<String> {
        if let Some(c) = SHOW_ALL_CONTROL.captures(h) {
            return Some(s!(&c[1]));
        }
        let targets: Vec<&str> = ANY_POSTBACK.captures_iter(h).filter_map(|c| c.get(1)).map(|m| m.as_str()).collect();
        targets
            .iter()
            .find(|t| t.contains(GRID_TARGET_HINT))
            .or(targets.first())
            .map(|t| s!(*t))
    };
    // onclick attributes sometimes arrive entity-encoded
    scan(doc).or_else(|| if doc.contains("&#39;") { scan(&normalize_entities(doc)) } else { None })
}

/// One station/date/time query against the historical data page.
#[derive(Clone, Copy, Debug)]
pub struct DayQuery<'a> {
    pub station: &'a str,
    /// dd/mm/YYYY
    pub date: &'a str,
    /// HH:MM
    pub time: &'a str,
}

/// The four ways of asking for the grid, tried in this order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Stage {
    AjaxSearch,
    AjaxShowAll { target: String },
    FullSearch,
    /// Hidden state comes from the full-search page itself, not a fresh GET.
    FullShowAll { target: String, page: String },
}

impl Stage {
    pub fn tag(&self) -> &'static str {
        match self {
            Stage::AjaxSearch => "B",
            Stage::AjaxShowAll { .. } => "C_ajax",
            Stage::FullSearch => "N_search",
            Stage::FullShowAll { .. } => "N_showall",
        }
    }

    pub fn is_ajax(&self) -> bool {
        matches!(self, Stage::AjaxSearch | Stage::AjaxShowAll { .. })
    }

    /// Where to go after this stage produced `rows` rows from `html`.
    /// `None` ends the cascade.
    pub fn next(&self, rows: usize, html: &str, full_table_rows: usize) -> Option<Stage> {
        if rows >= full_table_rows {
            return None;
        }
        match self {
            Stage::AjaxSearch => Some(match find_show_all_target(html) {
                Some(target) => Stage::AjaxShowAll { target },
                None => Stage::FullSearch,
            }),
            Stage::AjaxShowAll { .. } => Some(Stage::FullSearch),
            Stage::FullSearch => find_show_all_target(html)
                .map(|target| Stage::FullShowAll { target, page: s!(html) }),
            Stage::FullShowAll { .. } => None,
        }
    }
}

/// What one stage saw.
#[derive(Clone, Debug)]
pub struct StageReport {
    pub stage: &'static str,
    pub table: Option<String>,
    pub rows: usize,
    pub error: Option<String>,
}

/// Result of running the cascade for one day: unfiltered grid rows plus a trace.
#[derive(Clone, Debug, Default)]
pub struct Cascade {
    pub rows: Vec<TableRow>,
    pub trace: Vec<StageReport>,
}

/// Drives the data page's partial-postback state machine over one session.
/// Strictly sequential: each stage harvests view state right before posting.
pub struct PostbackEngine<'s> {
    session: &'s Session,
    opts: PostbackOptions,
}

impl<'s> PostbackEngine<'s> {
    pub fn new(session: &'s Session, opts: PostbackOptions) -> Self {
        Self { session, opts }
    }

    fn data_url(&self) -> String {
        self.session.url(DATA_PATH)
    }

    fn ajax_headers(&self) -> (String, String) {
        (s!(self.session.base()), self.data_url())
    }

    pub(crate) fn post(&self, fields: &[(String, String)], ajax: bool) -> Result<HttpResponse> {
        let url = self.data_url();
        if ajax {
            let (origin, referer) = self.ajax_headers();
            let headers = [
                ("X-MicrosoftAjax", "Delta=true"),
                ("X-Requested-With", "XMLHttpRequest"),
                ("Content-Type", "application/x-www-form-urlencoded; charset=UTF-8"),
                ("Accept", "*/*"),
                ("Origin", origin.as_str()),
                ("Referer", referer.as_str()),
            ];
            self.session.exec().post_form(&url, fields, &headers)
        } else {
            self.session.exec().post_form(&url, fields, &[])
        }
    }

    /// GET the data page and harvest fresh view state.
    pub fn fresh_state(&self) -> Result<HiddenFormState> {
        let referer = join!(self.session.base(), "/");
        let page = self.session.exec().get(&self.data_url(), &[("Referer", referer.as_str())])?.error_for_status()?;
        HiddenFormState::harvest(&page.body)
    }

    /// Prime server-side state with the station before a run of day queries.
    pub fn select_station(&self, station: &str) -> Result<()> {
        let state = self.fresh_state()?.with_target(STATION_DROPDOWN);
        let mut fields = state.to_fields();
        fields.extend(fields![
            (STATION_DROPDOWN, station),
            (DATE_BOX, ""),
            (TIME_BOX, ""),
            (SCRIPT_MANAGER, join!(UPDATE_PANEL, "|", STATION_DROPDOWN)),
            (ASYNC_POST, "true"),
        ]);
        let resp = self.post(&fields, true)?;
        debug!(station, status = resp.status, "station selected");
        Ok(())
    }

    /// Build the payload for `stage` on top of harvested state.
    pub fn payload(state: HiddenFormState, stage: &Stage, q: &DayQuery<'_>) -> Vec<(String, String)> {
        let target = match stage {
            Stage::AjaxShowAll { target } | Stage::FullShowAll { target, .. } => Some(target.as_str()),
            _ => None,
        };
        let state = match target {
            Some(t) => state.with_target(t),
            None => state,
        };
        let mut fields = state.to_fields();
        fields.extend(fields![
            (STATION_DROPDOWN, q.station),
            (DATE_BOX, q.date),
            (TIME_BOX, q.time),
        ]);
        if target.is_none() {
            fields.extend(fields![(SEARCH_BUTTON, SEARCH_VALUE)]);
        }
        if stage.is_ajax() {
            let origin = target.unwrap_or(SEARCH_BUTTON);
            fields.extend(fields![
                (SCRIPT_MANAGER, join!(UPDATE_PANEL, "|", origin)),
                (ASYNC_POST, "true"),
            ]);
        }
        fields
    }

    /// Execute one stage. Returns the raw body and the html to search.
    fn run_stage(&self, stage: &Stage, q: &DayQuery<'_>) -> Result<(String, String)> {
        let state = match stage {
            Stage::FullShowAll { page, .. } => HiddenFormState::harvest(page)?,
            _ => self.fresh_state()?,
        };
        let fields = Self::payload(state, stage, q);
        let resp = self.post(&fields, stage.is_ajax())?.error_for_status()?;
        let html = if stage.is_ajax() { delta::effective_html(&resp.body) } else { resp.body.clone() };
        Ok((resp.body, html))
    }

    /// Run the cascade until a stage yields a full table or the stages run out.
    pub fn run_cascade(&self, q: &DayQuery<'_>) -> Result<Cascade> {
        let mut out = Cascade::default();
        let mut stage = Some(Stage::AjaxSearch);
        let mut last_err: Option<ScrapeError> = None;
        let mut any_response = false;

        while let Some(current) = stage {
            let (html, report) = match self.run_stage(&current, q) {
                Ok((raw, html)) => {
                    any_response = true;
                    self.snapshot(q, &current, &raw, &html);
                    let found = table::find_result_table(&html, true);
                    let label = found.as_ref().map(|t| t.label());
                    // a stage that finds no table never discards earlier rows
                    if let Some(t) = found {
                        out.rows = table::parse_table(t.block).rows;
                    }
                    let report = StageReport { stage: current.tag(), table: label, rows: out.rows.len(), error: None };
                    (html, report)
                }
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    warn!(station = q.station, date = q.date, stage = current.tag(), error = %e, "stage failed");
                    let report = StageReport { stage: current.tag(), table: None, rows: out.rows.len(), error: Some(e.to_string()) };
                    last_err = Some(e);
                    (s!(), report)
                }
            };
            debug!(station = q.station, date = q.date, stage = report.stage, table = ?report.table, rows = report.rows, "stage done");
            out.trace.push(report);
            stage = current.next(out.rows.len(), &html, self.opts.full_table_rows);
        }

        match (any_response, last_err) {
            (false, Some(e)) => Err(e),
            _ => Ok(out),
        }
    }

    /// Every grid row for the station on that day.
    pub fn fetch_daily_rows(&self, q: &DayQuery<'_>) -> Result<Vec<TableRow>> {
        let cascade = self.run_cascade(q)?;
        let total = cascade.rows.len();
        let rows = table::filter_rows(cascade.rows, q.station, q.date);
        if rows.is_empty() {
            info!(station = q.station, date = q.date, grid_rows = total, "no rows for day");
        }
        Ok(rows)
    }

    /// The day's latest reading, if any.
    pub fn fetch_daily(&self, q: &DayQuery<'_>, station_name: &str) -> Result<Option<DailyReading>> {
        let rows = self.fetch_daily_rows(q)?;
        Ok(table::latest(rows).map(|r| table::to_reading(&r, q.station, station_name, q.date)))
    }

    /// Every reading for the day, oldest first.
    pub fn fetch_daily_all(&self, q: &DayQuery<'_>, station_name: &str) -> Result<Vec<DailyReading>> {
        let mut rows = self.fetch_daily_rows(q)?;
        table::sort_by_time(&mut rows);
        Ok(rows.iter().map(|r| table::to_reading(r, q.station, station_name, q.date)).collect())
    }

    fn snapshot(&self, q: &DayQuery<'_>, stage: &Stage, raw: &str, html: &str) {
        let Some(dir) = self.opts.snapshot_dir.as_deref() else { return };
        let stem = format!("{}_{}_{}", filename_safe(q.station), filename_safe(q.date), stage.tag());
        if let Err(e) = write_snapshot(dir, &stem, raw, html, stage.is_ajax()) {
            warn!(error = %e, stem, "could not save html snapshot");
        }
    }
}

fn write_snapshot(dir: &Path, stem: &str, raw: &str, html: &str, with_raw: bool) -> Result<()> {
    if with_raw {
        crate::file::write_text(&dir.join(join!(stem, "_raw.txt")), raw)?;
    }
    crate::file::write_text(&dir.join(join!(stem, ".html")), html)?;
    Ok(())
}
