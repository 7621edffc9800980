// src/postback/table.rs
//! Result grid discovery, row parsing and day filtering.

use tracing::debug;

use crate::config::consts::{KNOWN_TABLE_IDS, ROW_STYLE_MARKERS};
use crate::core::html::{self, all_blocks, attr, has_class_marker, inner_after_open_tag, open_tag_of, open_tags, text_of, top_blocks, without_nested};
use crate::core::sanitize::first_decimal;
use crate::core::time::grid_sort_key;
use crate::data::DailyReading;

/// How the table was found, most to least trustworthy.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Discovery {
    KnownId(&'static str),
    RowStyle,
    LargestTable,
}

#[derive(Clone, Debug)]
pub struct FoundTable<'a> {
    pub block: &'a str,
    pub how: Discovery,
}

impl FoundTable<'_> {
    /// The table's id, or `(no-id)`.
    pub fn label(&self) -> String {
        attr(open_tag_of(self.block), "id").unwrap_or_else(|| s!("(no-id)"))
    }
}

/// Find the results grid: known ids first, then alternating-row styling, then
/// (unless `allow_largest` is off) the table with the highest `th*3 + td` score.
pub fn find_result_table(doc: &str, allow_largest: bool) -> Option<FoundTable<'_>> {
    for id in KNOWN_TABLE_IDS {
        if let Some(block) = html::find_by_id(doc, "table", id) {
            return Some(FoundTable { block, how: Discovery::KnownId(*id) });
        }
    }

    let tables = all_blocks(doc, "table");

    let styled = tables.iter().copied().find(|t| {
        has_class_marker(open_tag_of(t), ROW_STYLE_MARKERS)
            || open_tags(&own_rows_html(t), "tr")
                .into_iter()
                .any(|tr| has_class_marker(tr, ROW_STYLE_MARKERS))
    });
    if let Some(block) = styled {
        return Some(FoundTable { block, how: Discovery::RowStyle });
    }

    if !allow_largest {
        return None;
    }
    let mut best: Option<(&str, usize)> = None;
    for t in tables {
        let score = open_tags(t, "th").len() * 3 + open_tags(t, "td").len();
        if best.is_none_or(|(_, s)| score > s) {
            best = Some((t, score));
        }
    }
    best.map(|(block, _)| FoundTable { block, how: Discovery::LargestTable })
}

/// Number of rows carrying the alternating-row style markers (diagnostics).
pub fn styled_row_count(doc: &str) -> usize {
    open_tags(doc, "tr").into_iter().filter(|tr| has_class_marker(tr, ROW_STYLE_MARKERS)).count()
}

fn own_rows_html(table: &str) -> String {
    without_nested(inner_after_open_tag(table), "table").into_owned()
}

/// One grid row: header/value pairs in column order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TableRow {
    pub cells: Vec<(String, String)>,
}

impl TableRow {
    /// Exact header lookup. A repeated header resolves to its last column.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.cells.iter().rev().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }

    /// First column (in order) whose lowercased header contains any keyword.
    pub fn pick(&self, keywords: &[&str]) -> Option<&str> {
        self.cells
            .iter()
            .find(|(k, _)| {
                let lk = k.to_lowercase();
                keywords.iter().any(|kw| lk.contains(kw))
            })
            .map(|(_, v)| v.as_str())
    }

    /// Exact header first, else keyword search.
    pub fn field(&self, exact: &str, keywords: &[&str]) -> Option<&str> {
        self.get(exact).or_else(|| self.pick(keywords))
    }

    pub fn code(&self) -> Option<&str> {
        self.get("CODE").or_else(|| self.get("Code")).or_else(|| self.get("code"))
    }

    pub fn timestamp(&self) -> Option<&str> {
        self.field("LATEST DATA (UTC)", &["time", "latest"])
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ParsedTable {
    pub headers: Vec<String>,
    pub rows: Vec<TableRow>,
}

/// Split a `<tr>` into its cells, in order, flagging header cells.
fn row_cells(tr: &str) -> Vec<(bool, String)> {
    let base = tr.as_ptr() as usize;
    let mut cells: Vec<(usize, bool, String)> = top_blocks(tr, "th")
        .into_iter()
        .map(|c| (c.as_ptr() as usize - base, true, text_of(c)))
        .chain(top_blocks(tr, "td").into_iter().map(|c| (c.as_ptr() as usize - base, false, text_of(c))))
        .collect();
    cells.sort_by_key(|(at, _, _)| *at);
    cells.into_iter().map(|(_, th, text)| (th, text)).collect()
}

/// Headers from `<thead>`, else the first row's cells. A first row made of
/// `<th>` is consumed as the header row. Remaining rows are zipped against the
/// headers; columns past the header list are named `col<N>`. Rows with fewer
/// than two data cells (pagers, "no data" rows) are skipped.
pub fn parse_table(table: &str) -> ParsedTable {
    let inner = own_rows_html(table);

    let mut headers: Vec<String> = top_blocks(&inner, "thead")
        .first()
        .map(|thead| top_blocks(thead, "th").into_iter().map(text_of).collect())
        .unwrap_or_default();

    let trs = top_blocks(&inner, "tr");
    let first_cells = trs.first().map(|tr| row_cells(tr)).unwrap_or_default();
    if headers.is_empty() {
        headers = first_cells.iter().map(|(_, t)| t.clone()).collect();
    }
    let skip_first = first_cells.iter().any(|(th, _)| *th);

    let rows = trs
        .iter()
        .skip(usize::from(skip_first))
        .filter_map(|tr| {
            let cells: Vec<String> = row_cells(tr).into_iter().filter(|(th, _)| !th).map(|(_, t)| t).collect();
            if cells.len() < 2 {
                return None;
            }
            let cells = cells
                .into_iter()
                .enumerate()
                .map(|(i, v)| {
                    let key = headers.get(i).map(|h| s!(h.trim())).unwrap_or_else(|| format!("col{}", i + 1));
                    (key, v)
                })
                .collect();
            Some(TableRow { cells })
        })
        .collect();

    ParsedTable { headers, rows }
}

/// Keep rows for `station` on `date` (dd/mm/YYYY). Rows without a code column or
/// without a timestamp are kept; the grid omits them for single-station views.
pub fn filter_rows(rows: Vec<TableRow>, station: &str, date: &str) -> Vec<TableRow> {
    rows.into_iter()
        .filter(|r| match r.code() {
            Some(code) if !code.is_empty() => code.eq_ignore_ascii_case(station),
            _ => true,
        })
        .filter(|r| match r.timestamp().and_then(|ts| ts.get(..10)) {
            Some(day) => day == date,
            None => true,
        })
        .collect()
}

/// The row with the greatest timestamp. Unparseable timestamps sort first, so
/// they only win when nothing parses; ties keep the earliest row.
pub fn latest(rows: Vec<TableRow>) -> Option<TableRow> {
    let mut best: Option<TableRow> = None;
    for r in rows {
        let better = match &best {
            None => true,
            Some(b) => grid_sort_key(r.timestamp().unwrap_or("")) > grid_sort_key(b.timestamp().unwrap_or("")),
        };
        if better {
            best = Some(r);
        }
    }
    best
}

/// Sort rows by timestamp, unparseable first, stable.
pub fn sort_by_time(rows: &mut [TableRow]) {
    rows.sort_by_key(|r| grid_sort_key(r.timestamp().unwrap_or("")));
}

/// Recover the known measurement columns from a grid row.
pub fn to_reading(row: &TableRow, station_code: &str, station_name: &str, date: &str) -> DailyReading {
    let numeric = |v: Option<&str>| v.and_then(first_decimal);
    let reading = DailyReading {
        station_code: s!(station_code),
        station_name: s!(station_name),
        date: s!(date),
        time_utc: s!(row.timestamp().unwrap_or("")),
        rain_mm: numeric(row.field("24HR (mm)", &["24hr", "rain"])),
        temp_c: numeric(row.pick(&["temp"])),
        humidity: numeric(row.pick(&["humidity", "hum"])),
        battery_v: numeric(row.pick(&["batt"])),
        solar_v: numeric(row.pick(&["solar"])),
    };
    debug!(station = station_code, date, time = %reading.time_utc, "row normalized");
    reading
}
