//! Report module - console summaries and the JSON run report

pub mod run_report;
pub mod summary;

pub use run_report::*;
pub use summary::*;
