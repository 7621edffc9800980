// src/specs/info.rs
//! The free-text info block carried in each map call (the marker popup).
//!
//! Shape after unescaping: `Code: G1001<br>Rain: 2.5 mm<br>Date: 01/05/2025 10:00 UTC ...`.
//! Lines are scanned for `keyword: value`; the first line that matches wins.

use std::sync::LazyLock;

use regex::Regex;

use crate::core::html::strip_tags;
use crate::core::sanitize::{first_decimal, normalize_entities};

static BR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)<br\s*/?>").expect("br regex"));

const KEYWORDS: [&str; 10] = [
    "Code", "Rain", "Date", "Temperature", "Temp", "Humidity", "Battery", "Solar Panels Voltages", "Solar", "Status",
];

/// `keyword: value` pattern per entry of `KEYWORDS`, same order.
static KEYWORD_RES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    KEYWORDS
        .iter()
        .map(|kw| Regex::new(&format!(r"(?i){}\s*:\s*(.+)", regex::escape(kw))).expect("info keyword regex"))
        .collect()
});

#[derive(Clone, Debug, Default, PartialEq)]
pub struct InfoBlock {
    pub code: Option<String>,
    pub rain: Option<String>,
    pub date: Option<String>,
    pub temperature_c: Option<f64>,
    pub humidity_pct: Option<f64>,
    pub battery_v: Option<f64>,
    pub solar_v: Option<f64>,
    pub status_text: Option<String>,
}

/// Non-empty trimmed text lines of an info block.
pub fn info_lines(info_html: &str) -> Vec<String> {
    let decoded = normalize_entities(info_html);
    let broken = BR.replace_all(&decoded, "\n");
    strip_tags(&*broken)
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(String::from)
        .collect()
}

/// Value after the first `keyword:` found, trying keywords in order.
fn find_value(lines: &[String], keywords: &[&str]) -> Option<String> {
    keywords.iter().find_map(|kw| {
        let re = &KEYWORD_RES[KEYWORDS.iter().position(|k| k == kw)?];
        lines
            .iter()
            .find_map(|l| re.captures(l).map(|c| s!(c[1].trim())))
            .filter(|v| !v.is_empty())
    })
}

pub fn parse_info(info_html: &str) -> InfoBlock {
    if info_html.trim().is_empty() {
        return InfoBlock::default();
    }
    let lines = info_lines(info_html);
    let num = |kws: &[&str]| find_value(&lines, kws).as_deref().and_then(first_decimal);

    InfoBlock {
        code: find_value(&lines, &["Code"]),
        rain: find_value(&lines, &["Rain"]),
        date: find_value(&lines, &["Date"]),
        temperature_c: num(&["Temperature", "Temp"]),
        humidity_pct: num(&["Humidity"]),
        battery_v: num(&["Battery"]),
        solar_v: num(&["Solar Panels Voltages", "Solar"]),
        status_text: find_value(&lines, &["Status"]),
    }
}
