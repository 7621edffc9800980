// src/data.rs
//
// Canonical records handed to the output layer.
//
// - StationRecord: one station in a map snapshot. Built in stages by specs::map
//                  (positional fields, icon status, info block), then given its
//                  final status by status::reconcile, then normalized by consolidate.
//                  The summary probe answer rides along in status_from_api.
// - DailyReading:  one station/day row from the historical grid.
// - StationRef:    a station as listed in the query page's dropdown.

use serde::{Deserialize, Serialize};

use crate::status::Status;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StationRecord {
    pub station_code: String,
    pub name: Option<String>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    /// Raw rain text from the info block ("2.5 mm").
    pub rain: Option<String>,
    pub rain_mm: Option<f64>,
    /// Raw reading time ("01/05/2025 10:00 UTC").
    pub date: Option<String>,
    pub date_iso: Option<String>,
    pub temperature_c: Option<f64>,
    pub humidity_pct: Option<f64>,
    pub battery_v: Option<f64>,
    pub solar_v: Option<f64>,
    pub status_text: Option<String>,
    pub icon_filename: Option<String>,
    pub image_path: Option<String>,
    pub status_from_icon: Status,
    /// Summary probe answer. Recorded only, never reconciled.
    pub status_from_api: Option<Status>,
    pub status: Status,
}

impl StationRecord {
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            station_code: code.into(),
            name: None,
            lat: None,
            lon: None,
            rain: None,
            rain_mm: None,
            date: None,
            date_iso: None,
            temperature_c: None,
            humidity_pct: None,
            battery_v: None,
            solar_v: None,
            status_text: None,
            icon_filename: None,
            image_path: None,
            status_from_icon: Status::Unknown,
            status_from_api: None,
            status: Status::Unknown,
        }
    }

    pub const CSV_HEADERS: [&'static str; 16] = [
        "station_code", "name", "lat", "lon", "status", "rain", "rain_mm", "date", "date_iso",
        "temperature_c", "humidity_pct", "battery_v", "solar_v", "icon_filename", "image_path",
        "status_from_api",
    ];

    pub fn to_csv_row(&self) -> Vec<String> {
        vec![
            self.station_code.clone(),
            opt(&self.name),
            num(self.lat),
            num(self.lon),
            s!(self.status.as_str()),
            opt(&self.rain),
            num(self.rain_mm),
            opt(&self.date),
            opt(&self.date_iso),
            num(self.temperature_c),
            num(self.humidity_pct),
            num(self.battery_v),
            num(self.solar_v),
            opt(&self.icon_filename),
            opt(&self.image_path),
            self.status_from_api.map(|st| s!(st.as_str())).unwrap_or_default(),
        ]
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DailyReading {
    pub station_code: String,
    pub station_name: String,
    /// Query date, dd/mm/YYYY.
    pub date: String,
    /// Grid timestamp as shown ("05/11/2025 23:50:00").
    pub time_utc: String,
    pub rain_mm: Option<f64>,
    pub temp_c: Option<f64>,
    pub humidity: Option<f64>,
    pub battery_v: Option<f64>,
    pub solar_v: Option<f64>,
}

impl DailyReading {
    pub const CSV_HEADERS: [&'static str; 9] = [
        "station_code", "station_name", "date", "time_utc", "rain_mm", "temp_c", "humidity",
        "battery_v", "solar_v",
    ];

    pub fn to_csv_row(&self) -> Vec<String> {
        vec![
            self.station_code.clone(),
            self.station_name.clone(),
            self.date.clone(),
            self.time_utc.clone(),
            num(self.rain_mm),
            num(self.temp_c),
            num(self.humidity),
            num(self.battery_v),
            num(self.solar_v),
        ]
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StationRef {
    pub code: String,
    pub name: String,
}

fn opt(v: &Option<String>) -> String {
    v.clone().unwrap_or_default()
}

fn num(v: Option<f64>) -> String {
    v.map(|n| n.to_string()).unwrap_or_default()
}
