// src/scrape/snapshot.rs
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::config::consts::MAP_PATH;
use crate::config::options::{SnapshotOptions, StatusPolicy};
use crate::consolidate::consolidate;
use crate::data::StationRecord;
use crate::error::Result;
use crate::file;
use crate::progress::Progress;
use crate::session::Session;
use crate::specs::{all_latest, map, summary};
use crate::status::StatusSummary;

/// What a snapshot run produced.
#[derive(Debug, Default)]
pub struct SnapshotReport {
    pub records: Vec<StationRecord>,
    pub summary: StatusSummary,
    /// Stations present in the all-stations list.
    pub listed: usize,
    /// Stations that answered the summary probe.
    pub probed: usize,
    pub files_written: Vec<PathBuf>,
}

/// Current state of every station on the map, status-resolved and deduplicated.
pub fn run_snapshot(
    session: &Session,
    opts: &SnapshotOptions,
    policy: &StatusPolicy,
    progress: Option<&mut dyn Progress>,
) -> Result<SnapshotReport> {
    run_snapshot_at(session, opts, policy, Utc::now(), progress)
}

/// [`run_snapshot`] with an explicit clock for the recency fallback and the probe.
pub fn run_snapshot_at(
    session: &Session,
    opts: &SnapshotOptions,
    policy: &StatusPolicy,
    now: DateTime<Utc>,
    mut progress: Option<&mut dyn Progress>,
) -> Result<SnapshotReport> {
    if let Some(p) = progress.as_deref_mut() {
        p.log("Fetching status list…");
    }
    let list = all_latest::fetch(session);
    let ext = map::ExternalSignals { list: all_latest::statuses(&list), ..Default::default() };

    if let Some(p) = progress.as_deref_mut() {
        p.log("Fetching map…");
    }
    let page = session.exec().get(&session.url(MAP_PATH), &[])?.error_for_status()?;
    let mut records = map::parse_map(&page.body, &ext, now, policy);
    if records.is_empty() {
        warn!("map page has no station calls");
    }

    let mut probed = 0;
    if opts.api_probe > 0 {
        let codes: Vec<&str> = records
            .iter()
            .map(|r| r.station_code.as_str())
            .filter(|c| !c.is_empty())
            .take(opts.api_probe)
            .collect();
        if let Some(p) = progress.as_deref_mut() {
            p.begin(codes.len());
        }
        let answers = summary::probe_many(session, codes, now, policy);
        probed = answers.len();
        for rec in records.iter_mut() {
            let Some(st) = answers.get(&rec.station_code) else { continue };
            rec.status_from_api = Some(*st);
            if let Some(p) = progress.as_deref_mut() {
                p.item_done(&rec.station_code, 1);
            }
        }
    }

    let records = consolidate(records);
    let summary = StatusSummary::from_statuses(records.iter().map(|r| r.status));

    let mut files_written = Vec::new();
    if opts.write_csv {
        let rows: Vec<Vec<String>> = records.iter().map(StationRecord::to_csv_row).collect();
        files_written.push(file::write_csv(
            &file::stations_csv_path(&opts.out_dir),
            &StationRecord::CSV_HEADERS,
            &rows,
            false,
        )?);
    }
    if opts.write_json {
        files_written.push(file::write_json(&file::stations_json_path(&opts.out_dir), &records)?);
    }

    info!(stations = records.len(), listed = list.len(), probed, "snapshot done");
    if let Some(p) = progress.as_deref_mut() {
        p.finish();
    }

    Ok(SnapshotReport { records, summary, listed: list.len(), probed, files_written })
}
