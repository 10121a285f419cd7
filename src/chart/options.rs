//! Static chart option sets derived purely from one record's data.
//!
//! Builders return a typed "unavailable" error instead of letting a chart
//! backend choke on bad data; the presentation layer turns that into a
//! fallback message.

use crate::run::{RecordId, RequestRecord};

use serde::Serialize;
use std::cmp::Ordering;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ChartKind {
    PassFailDonut,
    PercentileSeries,
    RequirementSummary,
}

impl ChartKind {
    pub const ALL: [ChartKind; 3] = [
        ChartKind::PassFailDonut,
        ChartKind::PercentileSeries,
        ChartKind::RequirementSummary,
    ];

    pub fn slug(&self) -> &'static str {
        match self {
            ChartKind::PassFailDonut => "pass-fail",
            ChartKind::PercentileSeries => "percentiles",
            ChartKind::RequirementSummary => "requirements",
        }
    }
}

/// Option set handed to the chart backend. Everything is pre-computed; the
/// backend performs no lookups of its own.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ChartOptions {
    PassFailDonut { pass: u64, fail: u64 },
    PercentileSeries { points: Vec<SeriesPoint> },
    RequirementSummary { passed: u64, failed: u64 },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesPoint {
    pub percentile: f64,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ChartDataError {
    #[error("record has no pass/fail counts")]
    NoPassFailData,
    #[error("record has no requirement results")]
    NoRequirementData,
    #[error("percentile map is empty")]
    EmptyPercentiles,
    #[error("percentile {key:?} has a non-numeric value")]
    NonNumericPercentile { key: String },
}

pub fn build_options(
    record: &RequestRecord,
    kind: ChartKind,
) -> Result<ChartOptions, ChartDataError> {
    match kind {
        ChartKind::PassFailDonut => pass_fail_donut(record),
        ChartKind::PercentileSeries => percentile_series(record),
        ChartKind::RequirementSummary => requirement_summary(record),
    }
}

/// Chart kinds this record cannot render, with the reason. The presentation
/// layer shows these as fallback messages inside the detail panel.
pub fn chart_fallbacks(record: &RequestRecord) -> Vec<(ChartKind, ChartDataError)> {
    ChartKind::ALL
        .iter()
        .filter_map(|&kind| build_options(record, kind).err().map(|e| (kind, e)))
        .collect()
}

/// Container element id owning the chart for (record, kind). One container
/// owns one instance at a time.
pub fn container_id(identity: RecordId, kind: ChartKind) -> String {
    format!("record-{}-{}", identity, kind.slug())
}

fn pass_fail_donut(record: &RequestRecord) -> Result<ChartOptions, ChartDataError> {
    if record.pass_count == 0 && record.fail_count == 0 {
        return Err(ChartDataError::NoPassFailData);
    }
    Ok(ChartOptions::PassFailDonut {
        pass: record.pass_count,
        fail: record.fail_count,
    })
}

fn percentile_series(record: &RequestRecord) -> Result<ChartOptions, ChartDataError> {
    let percentiles = &record.response_times.percentiles;
    if percentiles.is_empty() {
        return Err(ChartDataError::EmptyPercentiles);
    }

    let mut points: Vec<SeriesPoint> = Vec::with_capacity(percentiles.len());
    for (key, value) in percentiles {
        if !value.is_finite() {
            return Err(ChartDataError::NonNumericPercentile { key: key.clone() });
        }
        let percentile = match key.parse::<f64>() {
            Ok(p) => p,
            // Loader-validated keys always parse; tolerate strays quietly.
            Err(_) => continue,
        };
        points.push(SeriesPoint {
            percentile,
            value: *value,
        });
    }

    points.sort_by(|a, b| {
        a.percentile
            .partial_cmp(&b.percentile)
            .unwrap_or(Ordering::Equal)
    });

    Ok(ChartOptions::PercentileSeries { points })
}

fn requirement_summary(record: &RequestRecord) -> Result<ChartOptions, ChartDataError> {
    match &record.requirements {
        Some(r) if r.passed > 0 || r.failed > 0 => Ok(ChartOptions::RequirementSummary {
            passed: r.passed,
            failed: r.failed,
        }),
        _ => Err(ChartDataError::NoRequirementData),
    }
}
