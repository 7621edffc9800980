// src/postback/mod.rs
//! The historical-data page speaks ASP.NET WebForms partial postbacks.
//!
//! - [`form`]:   hidden view-state harvesting
//! - [`delta`]:  UpdatePanel delta response decoding
//! - [`table`]:  result grid discovery and row extraction
//! - [`engine`]: the staged search/show-all cascade
//! - [`diag`]:   one-shot protocol diagnostics

pub mod delta;
pub mod diag;
pub mod engine;
pub mod form;
pub mod table;

pub use engine::{DayQuery, PostbackEngine, Stage};
