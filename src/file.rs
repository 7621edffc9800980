// src/file.rs

use std::{
    fs::{self, File},
    io::{self, BufWriter, Write},
    path::{Path, PathBuf},
};

use serde::Serialize;

use crate::config::consts::{STATIONS_CSV, STATIONS_JSON};
use crate::csv::write_row;
use crate::error::{Result, ScrapeError};

/// Spreadsheet apps need this to read Thai station names as UTF-8.
const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

pub fn ensure_directory(dir: &Path) -> Result<()> {
    if dir.exists() && !dir.is_dir() {
        return Err(ScrapeError::Io(io::Error::other(format!(
            "Path exists but is not a directory: {}",
            dir.display()
        ))));
    }
    if !dir.exists() { fs::create_dir_all(dir)?; }
    Ok(())
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            ensure_directory(parent)?;
        }
    }
    Ok(())
}

pub fn write_text(path: &Path, text: &str) -> Result<()> {
    ensure_parent(path)?;
    fs::write(path, text)?;
    Ok(())
}

/// Create/truncate `path` and write a header plus rows (comma-separated).
pub fn write_csv(path: &Path, headers: &[&str], rows: &[Vec<String>], bom: bool) -> Result<PathBuf> {
    ensure_parent(path)?;
    let file = File::create(path)?;
    let mut out = BufWriter::new(file);
    if bom {
        out.write_all(UTF8_BOM)?;
    }
    let h: Vec<String> = headers.iter().map(|s| s.to_string()).collect();
    write_row(&mut out, &h, ',')?;
    for row in rows {
        write_row(&mut out, row, ',')?;
    }
    out.flush()?;
    Ok(path.to_path_buf())
}

/// Pretty-printed JSON, non-ASCII kept as is.
pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<PathBuf> {
    let text = serde_json::to_string_pretty(value)?;
    write_text(path, &text)?;
    Ok(path.to_path_buf())
}

pub fn stations_csv_path(dir: &Path) -> PathBuf {
    dir.join(STATIONS_CSV)
}

pub fn stations_json_path(dir: &Path) -> PathBuf {
    dir.join(STATIONS_JSON)
}

/// `weather_<code>_<YYYY>_<MM>.csv`
pub fn station_month_path(dir: &Path, code: &str, year: i32, month: u32) -> PathBuf {
    let code = crate::core::sanitize::filename_safe(code);
    dir.join(format!("weather_{code}_{year}_{month:02}.csv"))
}

/// `weather_combined_<YYYY>_<MM>.csv`
pub fn combined_month_path(dir: &Path, year: i32, month: u32) -> PathBuf {
    dir.join(format!("weather_combined_{year}_{month:02}.csv"))
}
