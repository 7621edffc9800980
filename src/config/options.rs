// src/config/options.rs
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use chrono::Duration as Span;

use super::consts::*;
use crate::error::{Result, ScrapeError};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogOptions {
    pub level: String,
    pub dir: Option<PathBuf>,
    pub ansi: bool,
}

impl Default for LogOptions {
    fn default() -> Self {
        Self {
            level: s!("info"),
            dir: Some(PathBuf::from(LOG_DIR)),
            ansi: true,
        }
    }
}

/// Bounded exponential backoff for idempotent requests.
#[derive(Clone, Debug, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_secs: f64,
    pub retry_statuses: Vec<u16>,
    pub get_timeout: Duration,
    pub post_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: MAX_ATTEMPTS,
            base_secs: BACKOFF_BASE_SECS,
            retry_statuses: RETRY_STATUSES.to_vec(),
            get_timeout: Duration::from_secs(GET_TIMEOUT_SECS),
            post_timeout: Duration::from_secs(POST_TIMEOUT_SECS),
        }
    }
}

impl RetryPolicy {
    /// Wait before the retry that follows failed attempt `attempt` (1-based):
    /// `base * 2^(attempt-1) + jitter`, jitter drawn from `[0, base)` by the caller.
    pub fn backoff(&self, attempt: u32, jitter_unit: f64) -> Duration {
        let exp = 2f64.powi(attempt.saturating_sub(1) as i32);
        let secs = self.base_secs * exp + jitter_unit.clamp(0.0, 1.0) * self.base_secs;
        Duration::from_secs_f64(secs)
    }

    pub fn is_retry_status(&self, status: u16) -> bool {
        self.retry_statuses.contains(&status)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PostbackOptions {
    /// A table with at least this many rows ends the fallback chain.
    pub full_table_rows: usize,
    /// Write every stage's raw and effective body here when set.
    pub snapshot_dir: Option<PathBuf>,
}

impl Default for PostbackOptions {
    fn default() -> Self {
        Self { full_table_rows: FULL_TABLE_ROWS, snapshot_dir: None }
    }
}

/// Knobs for the parts of status resolution that are guesses about server behavior.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StatusPolicy {
    /// Treat an API body with no recognizable keyword as ONLINE when it is long enough.
    pub assume_online_on_long_body: bool,
    pub long_body_chars: usize,
    pub online_within: Span,
    pub timeout_within: Span,
}

impl Default for StatusPolicy {
    fn default() -> Self {
        Self {
            assume_online_on_long_body: true,
            long_body_chars: LONG_BODY_ONLINE_CHARS,
            online_within: Span::minutes(RECENT_ONLINE_MINUTES),
            timeout_within: Span::hours(RECENT_TIMEOUT_HOURS),
        }
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub user: String,
    pub password: String,
}

impl Credentials {
    pub fn new(user: impl Into<String>, password: impl Into<String>) -> Self {
        Self { user: user.into(), password: password.into() }
    }

    /// Read `RAINGAUGE_USER` / `RAINGAUGE_PASSWORD`, after loading `.env` if present.
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv();
        let user = std::env::var(ENV_USER)
            .map_err(|_| ScrapeError::Config(format!("{ENV_USER} not set")))?;
        let password = std::env::var(ENV_PASSWORD)
            .map_err(|_| ScrapeError::Config(format!("{ENV_PASSWORD} not set")))?;
        Ok(Self { user, password })
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("user", &self.user)
            .field("password", &"***")
            .finish()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SnapshotOptions {
    pub out_dir: PathBuf,
    pub write_csv: bool,
    pub write_json: bool,
    /// Probe the summary API for the first N stations (0 = off).
    pub api_probe: usize,
}

impl Default for SnapshotOptions {
    fn default() -> Self {
        Self {
            out_dir: PathBuf::from(DEFAULT_OUT_DIR),
            write_csv: true,
            write_json: true,
            api_probe: 0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RowSelection {
    /// Keep only the latest reading per day.
    Latest,
    /// Keep every row matching the station and day.
    All,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MonthOptions {
    pub year: i32,
    pub month: u32,
    /// Comma-separated substrings matched against station codes. Empty keeps all.
    pub filter: String,
    pub workers: usize,
    pub query_time: String,
    pub rows: RowSelection,
    pub out_dir: PathBuf,
    pub per_station_csv: bool,
    pub combined_csv: bool,
    pub save_html: bool,
    /// JSON file of display-name overrides keyed by station code.
    pub names_file: Option<PathBuf>,
    /// Pause after each station, plus up to `jitter` more.
    pub station_pause: Duration,
    pub jitter: Duration,
}

impl MonthOptions {
    pub fn new(year: i32, month: u32) -> Self {
        Self {
            year,
            month,
            filter: s!(),
            workers: WORKERS,
            query_time: s!(DEFAULT_QUERY_TIME),
            rows: RowSelection::Latest,
            out_dir: PathBuf::from(DEFAULT_OUT_DIR),
            per_station_csv: true,
            combined_csv: false,
            save_html: false,
            names_file: None,
            station_pause: Duration::from_millis(REQUEST_PAUSE_MS),
            jitter: Duration::from_millis(JITTER_MS),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !(1..=12).contains(&self.month) {
            return Err(ScrapeError::Config(format!("month out of range: {}", self.month)));
        }
        if self.workers == 0 || self.workers > MAX_WORKERS {
            return Err(ScrapeError::Config(format!(
                "workers must be 1..={MAX_WORKERS}, got {}",
                self.workers
            )));
        }
        Ok(())
    }

    pub fn postback(&self) -> PostbackOptions {
        PostbackOptions {
            snapshot_dir: self.save_html.then(|| self.out_dir.join(SNAPSHOT_SUBDIR)),
            ..PostbackOptions::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_with_bounded_jitter() {
        let p = RetryPolicy::default();
        assert_eq!(p.backoff(1, 0.0), Duration::from_secs_f64(0.8));
        assert_eq!(p.backoff(2, 0.0), Duration::from_secs_f64(1.6));
        assert_eq!(p.backoff(3, 0.0), Duration::from_secs_f64(3.2));
        let max = p.backoff(1, 5.0);
        assert_eq!(max, Duration::from_secs_f64(1.6));
    }

    #[test]
    fn month_validation() {
        assert!(MonthOptions::new(2025, 5).validate().is_ok());
        assert!(MonthOptions::new(2025, 0).validate().is_err());
        assert!(MonthOptions::new(2025, 13).validate().is_err());
        let mut o = MonthOptions::new(2025, 5);
        o.workers = 0;
        assert!(o.validate().is_err());
    }

    #[test]
    fn month_pause_defaults_and_zeroes() {
        let mut o = MonthOptions::new(2025, 5);
        assert_eq!(o.station_pause, Duration::from_millis(REQUEST_PAUSE_MS));
        assert_eq!(o.jitter, Duration::from_millis(JITTER_MS));
        o.station_pause = Duration::ZERO;
        o.jitter = Duration::ZERO;
        assert!(o.validate().is_ok());
    }

    #[test]
    fn credentials_debug_hides_password() {
        let c = Credentials::new("User", "secret");
        let dbg = format!("{c:?}");
        assert!(dbg.contains("User"));
        assert!(!dbg.contains("secret"));
    }

    #[test]
    fn save_html_sets_snapshot_dir() {
        let mut o = MonthOptions::new(2025, 5);
        assert!(o.postback().snapshot_dir.is_none());
        o.save_html = true;
        let dir = o.postback().snapshot_dir.unwrap();
        assert!(dir.ends_with(SNAPSHOT_SUBDIR));
    }
}
