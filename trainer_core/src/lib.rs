#![forbid(unsafe_code)]

//! Core domain model and analysis logic for the ICD-11 transition trainer.
//!
//! This crate provides:
//! - Domain types (sessions, modules, learning styles, patterns)
//! - The default training catalog and prerequisite gating
//! - Pattern analysis and module recommendation
//! - Persistence (WAL, CSV, progress state)
//! - Progress recording

pub mod types;
pub mod error;
pub mod catalog;
pub mod config;
pub mod logging;
pub mod access;
pub mod analysis;
pub mod recommend;
pub mod wal;
pub mod csv_rollup;
pub mod state;
pub mod history;
pub mod progress;

// Re-export commonly used types
pub use error::{Error, Result};
pub use types::*;
pub use catalog::{build_default_catalog, get_default_catalog};
pub use config::{CategorySource, Config};
pub use access::{is_accessible, missing_prerequisites};
pub use analysis::{analyze, analyze_in, analyze_with_catalog, analyze_with_source};
pub use recommend::{next_recommended, recommend, recommend_from_catalog, score_module};
pub use wal::{JsonlSink, SessionSink};
pub use state::{ProgressState, StateLock};
pub use history::{load_history, weekly_progress};
pub use progress::record_progress;
