//! Dynamic percentile column discovery.
//!
//! The column set is derived from the FIRST valid record only: all records
//! are assumed to share one percentile key set. Records that diverge render
//! their missing percentiles as 0; no reconciliation is attempted (see
//! DESIGN.md).

use crate::run::RequestRecord;
use std::cmp::Ordering;

/// Ordered percentile column keys to render, ascending by numeric value.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ColumnSchema {
    pub percentile_columns: Vec<String>,
}

/// One entry of the numeric-filter field selector.
#[derive(Debug, Clone, PartialEq)]
pub struct NumericField {
    pub key: String,
    pub label: String,
}

/// Derive the percentile column schema from the record collection.
///
/// Keys are read off the first record, parsed as floats, sorted ascending,
/// and any key numerically equal to 100 is dropped: the "max" column already
/// conveys the saturating percentile.
pub fn resolve_columns(records: &[RequestRecord]) -> ColumnSchema {
    let first = match records.first() {
        Some(r) => r,
        None => return ColumnSchema::default(),
    };

    let mut keyed: Vec<(f64, &String)> = first
        .response_times
        .percentiles
        .keys()
        .filter_map(|key| key.parse::<f64>().ok().map(|v| (v, key)))
        .filter(|(v, _)| *v != 100.0)
        .collect();

    keyed.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(Ordering::Equal));

    ColumnSchema {
        percentile_columns: keyed.into_iter().map(|(_, key)| key.clone()).collect(),
    }
}

/// Fixed numeric fields followed by the dynamic percentile columns, for
/// populating the numeric-filter selector.
pub fn numeric_fields(schema: &ColumnSchema) -> Vec<NumericField> {
    let mut fields: Vec<NumericField> = [
        ("min", "Min"),
        ("max", "Max"),
        ("totalCount", "Total Count"),
        ("errorPercentage", "Error %"),
    ]
    .iter()
    .map(|(key, label)| NumericField {
        key: key.to_string(),
        label: label.to_string(),
    })
    .collect();

    for key in &schema.percentile_columns {
        fields.push(NumericField {
            key: key.clone(),
            label: percentile_label(key),
        });
    }

    fields
}

/// "50.0" -> "P50", "99.9" -> "P99.9".
pub fn percentile_label(key: &str) -> String {
    format!("P{}", key.strip_suffix(".0").unwrap_or(key))
}
