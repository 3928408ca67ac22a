//! Tracing initialization for ETL pipelines.
//!
//! Development environments log pretty-printed events to the terminal, production-like
//! environments log JSON to daily rotating files.

mod tracing;

pub use crate::tracing::*;
