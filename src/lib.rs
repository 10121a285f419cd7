//! loadreport: interactive report viewer for performance-test runs.
//!
//! The core is an in-memory table engine: dynamic percentile column
//! discovery, composite filtering, type-aware stable sorting, row expansion
//! with a fail-safe state machine, and a chart-instance lifecycle behind a
//! backend-agnostic seam. The CLI wraps it with a run.json loader and a
//! self-contained HTML report.

pub mod chart;
pub mod diagnostics;
pub mod render;
pub mod run;
pub mod table;

pub type Result<T> = anyhow::Result<T>;
