// src/scrape/monthly.rs
use std::{
    path::PathBuf, thread, time::Duration,
    sync::{ mpsc, Arc, atomic::{ AtomicBool, AtomicUsize, Ordering }}
};

use rand::Rng;
use tracing::{info, warn};

use crate::{
    config::options::{ MonthOptions, RowSelection },
    core::time::{ grid_sort_key, month_days, parse_query_date, query_date },
    data::{ DailyReading, StationRef },
    error::{ Result, ScrapeError },
    file,
    postback::{ DayQuery, PostbackEngine },
    progress::Progress,
    session::Session,
    specs::stations,
};

/// One station's month of readings.
#[derive(Clone, Debug)]
pub struct StationMonth {
    pub station: StationRef,
    pub readings: Vec<DailyReading>,
    /// Days whose fetch failed outright (as opposed to returning no rows).
    pub days_failed: usize,
}

#[derive(Debug, Default)]
pub struct MonthReport {
    /// In station-directory order.
    pub stations: Vec<StationMonth>,
    pub failed: Vec<(String, String)>,
    pub files_written: Vec<PathBuf>,
}

impl MonthReport {
    pub fn total_rows(&self) -> usize {
        self.stations.iter().map(|s| s.readings.len()).sum()
    }
}

/// Oldest first: query date, then grid timestamp (unparseable first).
pub fn sort_readings(rows: &mut [DailyReading]) {
    rows.sort_by_key(|r| (parse_query_date(&r.date), grid_sort_key(&r.time_utc)));
}

/// One station/day over an existing session.
pub fn fetch_day(
    engine: &PostbackEngine<'_>,
    station: &StationRef,
    date: &str,
    time: &str,
    rows: &RowSelection,
) -> Result<Vec<DailyReading>> {
    let q = DayQuery { station: &station.code, date, time };
    match rows {
        RowSelection::Latest => Ok(engine.fetch_daily(&q, &station.name)?.into_iter().collect()),
        RowSelection::All => engine.fetch_daily_all(&q, &station.name),
    }
}

/// Every day of the month for one station. Day-level failures are logged and
/// skipped; only fatal errors end the station early.
pub fn fetch_station_month(session: &Session, station: &StationRef, opts: &MonthOptions) -> Result<StationMonth> {
    let engine = PostbackEngine::new(session, opts.postback());
    if let Err(e) = engine.select_station(&station.code) {
        if e.is_fatal() {
            return Err(e);
        }
        warn!(station = %station.code, error = %e, "station priming failed");
    }

    let mut readings = Vec::new();
    let mut days_failed = 0;
    for day in month_days(opts.year, opts.month) {
        let date = query_date(day);
        match fetch_day(&engine, station, &date, &opts.query_time, &opts.rows) {
            Ok(rows) => {
                info!(station = %station.code, date = %date, rows = rows.len(), "day fetched");
                readings.extend(rows);
            }
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                warn!(station = %station.code, date = %date, error = %e, "day failed");
                days_failed += 1;
            }
        }
    }
    sort_readings(&mut readings);
    Ok(StationMonth { station: station.clone(), readings, days_failed })
}

enum Msg {
    Done(usize, StationMonth),
    Failed(String, String),
    Fatal(ScrapeError),
}

/// Log in, list and filter stations, fetch each station's month, write outputs.
///
/// `connect` opens one authenticated session; it is called once up front (that
/// session lists stations and then serves the first worker) and once per extra
/// worker. Workers pull stations from a shared cursor, so each station is
/// fetched by exactly one session.
pub fn run_month<F>(connect: F, opts: &MonthOptions, mut progress: Option<&mut dyn Progress>) -> Result<MonthReport>
where
    F: Fn() -> Result<Session> + Sync,
{
    opts.validate()?;

    let first = connect()?;
    let mut listed = stations::fetch(&first)?;
    if listed.is_empty() {
        return Err(ScrapeError::ProtocolState(s!("no stations listed")));
    }
    if let Some(path) = &opts.names_file {
        let names = stations::load_name_overrides(path)?;
        stations::apply_name_overrides(&mut listed, &names);
    }
    let selected = stations::filter_stations(listed, &opts.filter);
    info!(stations = selected.len(), year = opts.year, month = opts.month, "month run");

    if let Some(p) = progress.as_deref_mut() {
        p.begin(selected.len());
    }
    if selected.is_empty() {
        if let Some(p) = progress.as_deref_mut() {
            p.log("No stations match the filter.");
            p.finish();
        }
        return Ok(MonthReport::default());
    }

    let counter = Arc::new(AtomicUsize::new(0));
    let stop = Arc::new(AtomicBool::new(false));
    let (res_tx, res_rx) = mpsc::channel::<Msg>();
    let workers = opts.workers.min(selected.len()).max(1);

    let mut done: Vec<(usize, StationMonth)> = Vec::new();
    let mut report = MonthReport::default();
    let mut fatal: Option<ScrapeError> = None;

    thread::scope(|scope| {
        let mut first = Some(first);
        for _ in 0..workers {
            let own = first.take();
            let idx = Arc::clone(&counter);
            let stop = Arc::clone(&stop);
            let tx = res_tx.clone();
            let selected = &selected;
            let connect = &connect;

            scope.spawn(move || {
                let session = match own.map(Ok).unwrap_or_else(connect) {
                    Ok(s) => s,
                    Err(e) => {
                        stop.store(true, Ordering::Relaxed);
                        let _ = tx.send(Msg::Fatal(e));
                        return;
                    }
                };
                let mut rng = rand::thread_rng();
                loop {
                    if stop.load(Ordering::Relaxed) {
                        break;
                    }
                    let i = idx.fetch_add(1, Ordering::Relaxed);
                    if i >= selected.len() {
                        break;
                    }
                    let st = &selected[i];
                    let msg = match fetch_station_month(&session, st, opts) {
                        Ok(month) => Msg::Done(i, month),
                        Err(e) if e.is_fatal() => {
                            stop.store(true, Ordering::Relaxed);
                            Msg::Fatal(e)
                        }
                        Err(e) => Msg::Failed(st.code.clone(), e.to_string()),
                    };
                    let _ = tx.send(msg);
                    let jitter_ms = opts.jitter.as_millis() as u64;
                    let jitter = Duration::from_millis(if jitter_ms == 0 { 0 } else { rng.gen_range(0..jitter_ms) });
                    let pause = opts.station_pause + jitter;
                    if !pause.is_zero() {
                        thread::sleep(pause); // be polite
                    }
                }
            });
        }
        drop(res_tx); // main thread is sole receiver now

        // Aggregate results
        for msg in res_rx {
            match msg {
                Msg::Done(i, month) => {
                    if let Some(p) = progress.as_deref_mut() {
                        p.item_done(&month.station.code, month.readings.len());
                    }
                    done.push((i, month));
                }
                Msg::Failed(code, err) => {
                    warn!(station = %code, error = %err, "station failed");
                    if let Some(p) = progress.as_deref_mut() {
                        p.item_failed(&code, &err);
                    }
                    report.failed.push((code, err));
                }
                Msg::Fatal(e) => {
                    fatal.get_or_insert(e);
                }
            }
        }
    });

    if let Some(p) = progress.as_deref_mut() {
        p.finish();
    }
    if let Some(e) = fatal {
        return Err(e);
    }

    done.sort_by_key(|(i, _)| *i);
    report.stations = done.into_iter().map(|(_, m)| m).collect();
    report.files_written = write_month(&report.stations, opts)?;
    info!(stations = report.stations.len(), rows = report.total_rows(), failed = report.failed.len(), "month run done");
    Ok(report)
}

/// Per-station files (always, even when empty) and the combined file (non-empty stations only).
pub fn write_month(months: &[StationMonth], opts: &MonthOptions) -> Result<Vec<PathBuf>> {
    let mut written = Vec::new();
    if opts.per_station_csv {
        for m in months {
            let rows: Vec<Vec<String>> = m.readings.iter().map(DailyReading::to_csv_row).collect();
            let path = file::station_month_path(&opts.out_dir, &m.station.code, opts.year, opts.month);
            written.push(file::write_csv(&path, &DailyReading::CSV_HEADERS, &rows, true)?);
        }
    }
    if opts.combined_csv {
        let mut headers: Vec<&str> = DailyReading::CSV_HEADERS.to_vec();
        headers.extend(["year", "month"]);
        let (y, mo) = (opts.year.to_string(), opts.month.to_string());
        let rows: Vec<Vec<String>> = months
            .iter()
            .flat_map(|m| m.readings.iter())
            .map(|r| {
                let mut row = r.to_csv_row();
                row.push(y.clone());
                row.push(mo.clone());
                row
            })
            .collect();
        let path = file::combined_month_path(&opts.out_dir, opts.year, opts.month);
        written.push(file::write_csv(&path, &headers, &rows, true)?);
    }
    Ok(written)
}
