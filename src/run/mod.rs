//! Run layer: run.json schema + validated in-memory records.
//!
//! This module is intentionally separate from the table engine and rendering.
//! It owns:
//! - RequestRecord (validated per-endpoint measurement row)
//! - Run spec (raw JSON shape) and its validation

pub mod load;
pub mod record;

pub use load::{RunSpec, ValidatedRun, load_run_file};
pub use record::{RecordId, RequestRecord, RequirementCheck, Requirements, ResponseTimes};
