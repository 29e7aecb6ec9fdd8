//! `TurtlFind` - Ad-hoc full-text search over a directory tree.
//!
//! A [`SearchEngine`](search::SearchEngine) walks its root depth-first for
//! every query, reporting base names and lines that contain the query
//! case-insensitively, capped at a configurable number of results.

#![deny(
    warnings,
    missing_debug_implementations,
    missing_docs,
    clippy::all,
    clippy::pedantic,
    clippy::nursery
)]

pub mod config;
pub mod crawler;
pub mod error;
pub mod search;
pub mod text;
pub mod types;

pub use config::SearchConfig;
pub use error::{Error, Result};
pub use search::{CancelToken, SearchEngine};
pub use types::{SearchReport, SearchResult};
