//! Composite row filter: status membership AND severity membership AND an
//! optional numeric threshold. Predicates only ever compose conjunctively.

use crate::run::RequestRecord;
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NumericOperator {
    #[default]
    GreaterThan,
    LessThan,
}

/// Filter state as the dropdowns and inputs hold it. `numeric_value` stays a
/// string on purpose: a half-typed or garbage value simply deactivates the
/// numeric predicate instead of erroring.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FilterCriteria {
    pub selected_statuses: BTreeSet<String>,
    pub selected_severities: BTreeSet<String>,
    /// Field key for the numeric filter; empty means none selected.
    pub numeric_field: String,
    pub numeric_operator: NumericOperator,
    /// Raw input text; empty or unparsable means the filter is inactive.
    pub numeric_value: String,
}

impl FilterCriteria {
    /// The numeric filter is active only when both a field and a parsable
    /// value are present.
    pub fn numeric_filter(&self) -> Option<(&str, NumericOperator, f64)> {
        if self.numeric_field.is_empty() || self.numeric_value.is_empty() {
            return None;
        }
        let threshold: f64 = self.numeric_value.trim().parse().ok()?;
        Some((&self.numeric_field, self.numeric_operator, threshold))
    }

    pub fn matches(&self, record: &RequestRecord) -> bool {
        self.matches_status(record) && self.matches_severity(record) && self.matches_numeric(record)
    }

    fn matches_status(&self, record: &RequestRecord) -> bool {
        self.selected_statuses.is_empty()
            || record
                .status
                .as_ref()
                .is_some_and(|s| self.selected_statuses.contains(s))
    }

    fn matches_severity(&self, record: &RequestRecord) -> bool {
        self.selected_severities.is_empty()
            || record
                .severity
                .as_ref()
                .is_some_and(|s| self.selected_severities.contains(s))
    }

    fn matches_numeric(&self, record: &RequestRecord) -> bool {
        match self.numeric_filter() {
            None => true,
            Some((field, op, threshold)) => {
                let value = numeric_field_value(record, field);
                match op {
                    NumericOperator::GreaterThan => value > threshold,
                    NumericOperator::LessThan => value < threshold,
                }
            }
        }
    }
}

/// Numeric projection of a record field, shared by the numeric filter and the
/// sort comparator. Any key that is not a fixed field is a percentile lookup,
/// defaulting to 0 when the record lacks it.
pub(crate) fn numeric_field_value(record: &RequestRecord, key: &str) -> f64 {
    match key {
        "min" => record.response_times.min,
        "max" => record.response_times.max,
        "totalCount" => record.total_count as f64,
        "errorPercentage" => record.error_percentage,
        percentile => record
            .response_times
            .percentiles
            .get(percentile)
            .copied()
            .unwrap_or(0.0),
    }
}

/// Evaluate the criteria against every record, keeping original relative
/// order. Returns indices into `records` so the caller retains positional
/// identity for id-less records.
pub fn apply(records: &[RequestRecord], criteria: &FilterCriteria) -> Vec<usize> {
    records
        .iter()
        .enumerate()
        .filter(|(_, record)| criteria.matches(record))
        .map(|(index, _)| index)
        .collect()
}
