// src/scrape/mod.rs
mod monthly;
mod snapshot;

pub use monthly::{fetch_day, fetch_station_month, run_month, sort_readings, write_month, MonthReport, StationMonth};
pub use snapshot::{run_snapshot, run_snapshot_at, SnapshotReport};
