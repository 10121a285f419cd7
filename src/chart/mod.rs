//! Chart layer: static option derivation from record data, plus the
//! acquire/resize/release lifecycle over a backend-agnostic chart seam.
//!
//! The drawing library is a collaborator behind the `ChartBackend` trait;
//! this module owns when instances exist, never how they draw.

pub mod manager;
pub mod options;

pub use manager::{ChartBackend, ChartHandle, ChartInstance, ChartSlots, RecordCharts};
pub use options::{
    ChartDataError, ChartKind, ChartOptions, SeriesPoint, build_options, chart_fallbacks,
    container_id,
};
