// src/specs/mod.rs
//! # Page “specs”
//!
//! Each spec covers a single portal page and encodes *where the ground truth lives
//! in the HTML* and *how to extract it robustly*.
//!
//! ## What lives here
//! - **Pure parsing** of page bodies into small typed shapes (`StationRecord`,
//!   `StationRef`, status maps). Every parser takes `&str` and is testable offline.
//! - Thin `fetch`/`probe` wrappers that GET one page over a [`crate::session::Session`]
//!   and hand the body to the parser.
//!
//! ## What does **not** live here
//! - The stateful postback dance on the data page (see `postback`).
//! - Merging across scrapes (`consolidate`) and writing files (`file`).
//!
//! ## Current specs
//! - `setmap`     – tokenizer for the map page's embedded `SetMap(...)` calls
//! - `info`       – the `key: value` info block inside each call
//! - `map`        – staged construction of `StationRecord`s from the map page
//! - `all_latest` – the all-stations status list (most trusted status signal)
//! - `summary`    – per-station summary probe
//! - `stations`   – the station dropdown on the data page
//!
//! ## Conventions
//! - Parse failures are never errors: a field that cannot be read is `None`, a
//!   status that cannot be read is `UNKNOWN`.
//! - Keyword tables live in `status`; specs only choose which table applies.

pub mod all_latest;
pub mod info;
pub mod map;
pub mod setmap;
pub mod stations;
pub mod summary;
