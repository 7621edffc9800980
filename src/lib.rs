// src/lib.rs

#[macro_use]
pub mod macros;

#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod postback;
pub mod specs;

pub mod consolidate;
pub mod csv;
pub mod data;
pub mod file;
pub mod log;
pub mod progress;
pub mod scrape;
pub mod session;
pub mod status;

pub use error::{Result, ScrapeError};
pub use session::Session;
