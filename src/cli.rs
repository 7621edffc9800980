// src/cli.rs
use std::path::PathBuf;

use chrono::{Datelike, Utc};
use clap::{Args, Parser, Subcommand};
use color_eyre::eyre::{eyre, WrapErr};

use crate::config::consts::{DEFAULT_OUT_DIR, DEFAULT_QUERY_TIME, ENV_PASSWORD, ENV_USER, LOG_DIR, REQUEST_PAUSE_MS, WORKERS};
use crate::config::options::{
    Credentials, LogOptions, MonthOptions, PostbackOptions, RetryPolicy, RowSelection, SnapshotOptions,
    StatusPolicy,
};
use crate::core::time::{parse_query_date, query_date};
use crate::data::{DailyReading, StationRef};
use crate::postback::{diag, DayQuery, PostbackEngine};
use crate::progress::Progress;
use crate::session::Session;
use crate::{scrape, specs};

#[derive(Parser)]
#[command(name = "raingauge")]
#[command(about = "Rain-gauge portal scraper: live map snapshot and historical daily readings")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Portal user name
    #[arg(long, env = ENV_USER, global = true)]
    user: Option<String>,

    /// Portal password
    #[arg(long, env = ENV_PASSWORD, hide_env_values = true, global = true)]
    password: Option<String>,

    /// More logging (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Directory for JSON log files
    #[arg(long, default_value = LOG_DIR, global = true)]
    log_dir: PathBuf,

    /// Do not write log files
    #[arg(long, global = true)]
    no_log_file: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Current state of every station on the map
    Snapshot {
        #[arg(short, long, default_value = DEFAULT_OUT_DIR)]
        out_dir: PathBuf,

        /// Skip stations.csv
        #[arg(long)]
        no_csv: bool,

        /// Skip stations.json
        #[arg(long)]
        no_json: bool,

        /// Probe the summary page for the first N stations
        #[arg(long, default_value_t = 0)]
        api_probe: usize,

        /// Never read a long, keyword-free summary page as ONLINE
        #[arg(long)]
        no_long_body_online: bool,
    },

    /// List stations from the data page dropdown
    Stations {
        /// Comma-separated code substrings
        #[arg(short, long, default_value = "")]
        filter: String,
    },

    /// Daily readings for every station over one month
    Month {
        #[arg(long)]
        year: Option<i32>,

        #[arg(long)]
        month: Option<u32>,

        /// Comma-separated code substrings
        #[arg(short, long, default_value = "")]
        filter: String,

        /// Parallel sessions
        #[arg(short, long, default_value_t = WORKERS)]
        workers: usize,

        #[arg(short, long, default_value = DEFAULT_OUT_DIR)]
        out_dir: PathBuf,

        /// Skip the per-station CSV files
        #[arg(long)]
        no_station_csv: bool,

        /// Also write one combined CSV
        #[arg(long)]
        combined_csv: bool,

        #[command(flatten)]
        query: QueryArgs,

        /// JSON file of station display names keyed by code
        #[arg(long)]
        names: Option<PathBuf>,

        /// Pause between stations, per worker
        #[arg(long, default_value_t = REQUEST_PAUSE_MS)]
        pause_ms: u64,
    },

    /// Readings for one station on one day
    Daily {
        #[arg(short, long)]
        station: String,

        /// dd/mm/YYYY
        #[arg(short, long)]
        date: String,

        #[command(flatten)]
        query: QueryArgs,

        #[arg(short, long, default_value = DEFAULT_OUT_DIR)]
        out_dir: PathBuf,
    },

    /// One AJAX search round trip, reported field by field
    Diag {
        #[arg(short, long)]
        station: String,

        /// dd/mm/YYYY (default: today, UTC)
        #[arg(short, long)]
        date: Option<String>,

        #[arg(short, long, default_value = DEFAULT_QUERY_TIME)]
        time: String,
    },
}

#[derive(Args)]
struct QueryArgs {
    /// Query time, HH:MM
    #[arg(short, long, default_value = DEFAULT_QUERY_TIME)]
    time: String,

    /// Keep every row of the day instead of the latest one
    #[arg(long)]
    all_rows: bool,

    /// Save each stage's response under <out-dir>/_html
    #[arg(long)]
    save_html: bool,
}

impl QueryArgs {
    fn rows(&self) -> RowSelection {
        if self.all_rows { RowSelection::All } else { RowSelection::Latest }
    }
}

/// Progress lines on stderr.
struct StderrProgress {
    total: usize,
    seen: usize,
}

impl Progress for StderrProgress {
    fn begin(&mut self, total: usize) {
        self.total = total;
        self.seen = 0;
    }

    fn log(&mut self, msg: &str) {
        eprintln!("{msg}");
    }

    fn item_done(&mut self, code: &str, rows: usize) {
        self.seen += 1;
        eprintln!("[{}/{}] {code}: {rows} rows", self.seen, self.total);
    }

    fn item_failed(&mut self, code: &str, error: &str) {
        self.seen += 1;
        eprintln!("[{}/{}] {code}: FAILED ({error})", self.seen, self.total);
    }
}

impl Cli {
    fn credentials(&self) -> color_eyre::Result<Credentials> {
        match (&self.user, &self.password) {
            (Some(u), Some(p)) => Ok(Credentials::new(u, p)),
            _ => Err(eyre!("credentials missing: pass --user/--password or set {ENV_USER}/{ENV_PASSWORD}")),
        }
    }

    fn log_options(&self) -> LogOptions {
        let level = match self.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        };
        LogOptions {
            level: s!(level),
            dir: (!self.no_log_file).then(|| self.log_dir.clone()),
            ..LogOptions::default()
        }
    }
}

fn connect(creds: &Credentials) -> color_eyre::Result<Session> {
    Session::connect(creds, RetryPolicy::default()).wrap_err("login failed")
}

fn print_readings(rows: &[DailyReading]) {
    println!("{}", DailyReading::CSV_HEADERS.join(","));
    for r in rows {
        println!("{}", r.to_csv_row().join(","));
    }
}

/// Parse arguments and run one command. `.env` should already be loaded.
pub fn run() -> color_eyre::Result<()> {
    let cli = Cli::parse();
    let _guard = crate::log::init(&cli.log_options())?;
    let creds = cli.credentials()?;
    let mut progress = StderrProgress { total: 0, seen: 0 };

    match &cli.command {
        Commands::Snapshot { out_dir, no_csv, no_json, api_probe, no_long_body_online } => {
            let session = connect(&creds)?;
            let opts = SnapshotOptions {
                out_dir: out_dir.clone(),
                write_csv: !no_csv,
                write_json: !no_json,
                api_probe: *api_probe,
            };
            let policy = StatusPolicy { assume_online_on_long_body: !no_long_body_online, ..StatusPolicy::default() };
            let report = scrape::run_snapshot(&session, &opts, &policy, Some(&mut progress))?;

            println!("stations: {} (listed {}, probed {})", report.records.len(), report.listed, report.probed);
            for (status, n) in &report.summary.counts {
                println!("  {:<10} {n:>5}  {:5.1}%", status.as_str(), report.summary.percent(*n));
            }
            for path in &report.files_written {
                println!("wrote {}", path.display());
            }
        }

        Commands::Stations { filter } => {
            let session = connect(&creds)?;
            let stations = specs::stations::filter_stations(specs::stations::fetch(&session)?, filter);
            for StationRef { code, name } in stations {
                println!("{code},{name}");
            }
        }

        Commands::Month { year, month, filter, workers, out_dir, no_station_csv, combined_csv, query, names, pause_ms } => {
            let today = Utc::now().date_naive();
            let mut opts = MonthOptions::new(year.unwrap_or(today.year()), month.unwrap_or(today.month()));
            opts.filter = filter.clone();
            opts.workers = *workers;
            opts.out_dir = out_dir.clone();
            opts.per_station_csv = !no_station_csv;
            opts.combined_csv = *combined_csv;
            opts.query_time = query.time.clone();
            opts.rows = query.rows();
            opts.save_html = query.save_html;
            opts.names_file = names.clone();
            opts.station_pause = std::time::Duration::from_millis(*pause_ms);

            let report = scrape::run_month(|| Session::connect(&creds, RetryPolicy::default()), &opts, Some(&mut progress))?;
            println!(
                "stations: {}  rows: {}  failed: {}",
                report.stations.len(),
                report.total_rows(),
                report.failed.len()
            );
            for path in &report.files_written {
                println!("wrote {}", path.display());
            }
        }

        Commands::Daily { station, date, query, out_dir } => {
            parse_query_date(date).ok_or_else(|| eyre!("date must be dd/mm/YYYY, got {date}"))?;
            let session = connect(&creds)?;
            let mut opts = PostbackOptions::default();
            if query.save_html {
                opts.snapshot_dir = Some(out_dir.join(crate::config::consts::SNAPSHOT_SUBDIR));
            }
            let engine = PostbackEngine::new(&session, opts);
            if let Err(e) = engine.select_station(station) {
                tracing::warn!(station = %station, error = %e, "station priming failed");
            }
            let st = StationRef { code: station.clone(), name: s!() };
            let rows = scrape::fetch_day(&engine, &st, date, &query.time, &query.rows())?;
            print_readings(&rows);
        }

        Commands::Diag { station, date, time } => {
            let date = date.clone().unwrap_or_else(|| query_date(Utc::now().date_naive()));
            let session = connect(&creds)?;
            let q = DayQuery { station, date: &date, time };
            let report = diag::diagnose(&session, &q)?;
            println!("{report}");
        }
    }
    Ok(())
}
