//! Validated per-endpoint measurement record.
//!
//! Percentile keys are decimal strings as they appear in the run file
//! ("50.0", "99.9"). We keep them as strings because they double as column
//! keys in the table; numeric interpretation happens where ordering matters.

use std::collections::BTreeMap;

/// Identity used by the expansion set.
pub type RecordId = u64;

/// Response-time distribution of one request.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ResponseTimes {
    pub min: f64,
    pub max: f64,
    /// Keyed by decimal percentile string. Values coerced at load time;
    /// a value that could not be coerced is NaN (charts reject it).
    pub percentiles: BTreeMap<String, f64>,
}

/// One pass/fail assertion tied to a percentile threshold.
#[derive(Debug, Clone, PartialEq)]
pub struct RequirementCheck {
    pub percentile: f64,
    pub value: f64,
    pub status: String,
    pub difference: Option<f64>,
    pub percentage_difference: Option<f64>,
}

/// Requirement results attached to a record.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Requirements {
    pub passed: u64,
    pub failed: u64,
    pub percentiles: Vec<RequirementCheck>,
}

/// One row of the requests table.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestRecord {
    /// Explicit stable identity; when absent the positional index in the
    /// source collection is used instead (unstable across reordering,
    /// see DESIGN.md).
    pub id: Option<RecordId>,
    pub name: String,
    pub status: Option<String>,
    pub severity: Option<String>,
    pub response_times: ResponseTimes,
    pub total_count: u64,
    pub pass_count: u64,
    pub fail_count: u64,
    pub error_percentage: f64,
    pub requirements: Option<Requirements>,
}

impl RequestRecord {
    pub fn identity(&self, index: usize) -> RecordId {
        self.id.unwrap_or(index as RecordId)
    }

    /// Label for display; an empty name renders as a placeholder.
    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            "(unnamed request)"
        } else {
            &self.name
        }
    }

    /// Percentage of passed requests over total. NaN when the record saw no
    /// requests at all; the renderer shows that as unavailable.
    pub fn success_rate(&self) -> f64 {
        self.pass_count as f64 / self.total_count as f64 * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn bare_record() -> RequestRecord {
        RequestRecord {
            id: None,
            name: "GET /status".to_string(),
            status: None,
            severity: None,
            response_times: ResponseTimes::default(),
            total_count: 0,
            pass_count: 0,
            fail_count: 0,
            error_percentage: 0.0,
            requirements: None,
        }
    }

    #[test]
    fn identity_prefers_explicit_id() {
        let mut record = bare_record();
        record.id = Some(42);
        assert_eq!(record.identity(7), 42);
    }

    #[test]
    fn identity_falls_back_to_index() {
        let record = bare_record();
        assert_eq!(record.identity(7), 7);
    }

    #[test]
    fn empty_name_renders_placeholder() {
        let mut record = bare_record();
        record.name = String::new();
        assert_eq!(record.display_name(), "(unnamed request)");
    }

    #[test]
    fn success_rate_over_zero_total_is_nan() {
        let record = bare_record();
        assert!(record.success_rate().is_nan());
    }

    #[test]
    fn success_rate_is_a_percentage() {
        let mut record = bare_record();
        record.total_count = 200;
        record.pass_count = 150;
        assert_eq!(record.success_rate(), 75.0);
    }
}
