//! Type-aware stable sorting over the filtered row set.

use crate::run::RequestRecord;
use crate::table::filter::numeric_field_value;
use std::cmp::Ordering;

/// A sortable column: a fixed key or a dynamically discovered percentile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SortColumn {
    Name,
    Status,
    Severity,
    Min,
    Max,
    TotalCount,
    ErrorPercentage,
    Percentile(String),
}

impl SortColumn {
    pub fn from_key(key: &str) -> SortColumn {
        match key {
            "name" => SortColumn::Name,
            "status" => SortColumn::Status,
            "severity" => SortColumn::Severity,
            "min" => SortColumn::Min,
            "max" => SortColumn::Max,
            "totalCount" => SortColumn::TotalCount,
            "errorPercentage" => SortColumn::ErrorPercentage,
            percentile => SortColumn::Percentile(percentile.to_string()),
        }
    }

    pub fn key(&self) -> &str {
        match self {
            SortColumn::Name => "name",
            SortColumn::Status => "status",
            SortColumn::Severity => "severity",
            SortColumn::Min => "min",
            SortColumn::Max => "max",
            SortColumn::TotalCount => "totalCount",
            SortColumn::ErrorPercentage => "errorPercentage",
            SortColumn::Percentile(key) => key,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn toggled(self) -> SortDirection {
        match self {
            SortDirection::Ascending => SortDirection::Descending,
            SortDirection::Descending => SortDirection::Ascending,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SortSpec {
    pub column: SortColumn,
    pub direction: SortDirection,
}

impl Default for SortSpec {
    fn default() -> Self {
        SortSpec {
            column: SortColumn::Name,
            direction: SortDirection::Ascending,
        }
    }
}

impl SortSpec {
    /// Header-click transition: clicking the current column toggles the
    /// direction, clicking a new column starts ascending.
    pub fn clicked(&self, column: SortColumn) -> SortSpec {
        if self.column == column {
            SortSpec {
                column,
                direction: self.direction.toggled(),
            }
        } else {
            SortSpec {
                column,
                direction: SortDirection::Ascending,
            }
        }
    }
}

/// Extracted cell value for comparison. Two strings compare lexicographically;
/// any other pairing coerces both sides to numbers.
enum SortKey<'a> {
    Text(&'a str),
    Number(f64),
}

impl SortKey<'_> {
    fn as_number(&self) -> f64 {
        match self {
            SortKey::Number(n) => *n,
            SortKey::Text(s) => s.trim().parse().unwrap_or(f64::NAN),
        }
    }
}

fn sort_key<'a>(record: &'a RequestRecord, column: &SortColumn) -> SortKey<'a> {
    match column {
        SortColumn::Name => SortKey::Text(&record.name),
        SortColumn::Status => SortKey::Text(record.status.as_deref().unwrap_or("")),
        SortColumn::Severity => SortKey::Text(record.severity.as_deref().unwrap_or("")),
        other => SortKey::Number(numeric_field_value(record, other.key())),
    }
}

fn compare(a: &SortKey, b: &SortKey) -> Ordering {
    match (a, b) {
        (SortKey::Text(x), SortKey::Text(y)) => x.cmp(y),
        _ => a
            .as_number()
            .partial_cmp(&b.as_number())
            .unwrap_or(Ordering::Equal),
    }
}

/// Order the filtered row indices by the spec. The sort is stable: ties keep
/// the relative order the filter produced.
pub fn apply(records: &[RequestRecord], rows: &[usize], spec: &SortSpec) -> Vec<usize> {
    let mut sorted = rows.to_vec();
    sorted.sort_by(|&a, &b| {
        let ord = compare(
            &sort_key(&records[a], &spec.column),
            &sort_key(&records[b], &spec.column),
        );
        match spec.direction {
            SortDirection::Ascending => ord,
            SortDirection::Descending => ord.reverse(),
        }
    });
    sorted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::run::ResponseTimes;
    use pretty_assertions::assert_eq;

    fn record(name: &str, min: f64, error_percentage: f64) -> RequestRecord {
        RequestRecord {
            id: None,
            name: name.to_string(),
            status: None,
            severity: None,
            response_times: ResponseTimes {
                min,
                max: min * 10.0,
                percentiles: [("95.0".to_string(), min * 2.0)].into_iter().collect(),
            },
            total_count: 0,
            pass_count: 0,
            fail_count: 0,
            error_percentage,
            requirements: None,
        }
    }

    fn spec(key: &str, direction: SortDirection) -> SortSpec {
        SortSpec {
            column: SortColumn::from_key(key),
            direction,
        }
    }

    #[test]
    fn sorts_numbers_numerically_not_lexicographically() {
        // errorPercentage values that would order [10, 3] as strings.
        let records = [record("a", 0.0, 3.0), record("b", 0.0, 10.0)];
        let rows = [0, 1];
        let asc = apply(&records, &rows, &spec("errorPercentage", SortDirection::Ascending));
        assert_eq!(asc, vec![0, 1]);
        let desc = apply(&records, &rows, &spec("errorPercentage", SortDirection::Descending));
        assert_eq!(desc, vec![1, 0]);
    }

    #[test]
    fn sorts_names_lexicographically() {
        let records = [record("b", 0.0, 0.0), record("a", 0.0, 0.0), record("c", 0.0, 0.0)];
        let rows = [0, 1, 2];
        let sorted = apply(&records, &rows, &spec("name", SortDirection::Ascending));
        assert_eq!(sorted, vec![1, 0, 2]);
    }

    #[test]
    fn sorts_by_dynamic_percentile_column() {
        let records = [record("a", 50.0, 0.0), record("b", 10.0, 0.0)];
        let rows = [0, 1];
        let sorted = apply(&records, &rows, &spec("95.0", SortDirection::Ascending));
        assert_eq!(sorted, vec![1, 0]);
    }

    #[test]
    fn ties_keep_filter_order() {
        let records = [
            record("first", 5.0, 0.0),
            record("second", 5.0, 0.0),
            record("third", 5.0, 0.0),
        ];
        let rows = [0, 1, 2];
        let sorted = apply(&records, &rows, &spec("min", SortDirection::Ascending));
        assert_eq!(sorted, vec![0, 1, 2]);
    }

    #[test]
    fn round_trip_preserves_relative_order_among_equal_keys() {
        // Two groups with equal min; re-sorting desc and back asc must
        // reproduce the original relative order inside each group.
        let records = [
            record("a", 5.0, 0.0),
            record("b", 9.0, 0.0),
            record("c", 5.0, 0.0),
            record("d", 9.0, 0.0),
        ];
        let rows = [0, 1, 2, 3];
        let asc = apply(&records, &rows, &spec("min", SortDirection::Ascending));
        assert_eq!(asc, vec![0, 2, 1, 3]);
        let desc = apply(&records, &asc, &spec("min", SortDirection::Descending));
        assert_eq!(desc, vec![1, 3, 0, 2]);
        let asc_again = apply(&records, &desc, &spec("min", SortDirection::Ascending));
        assert_eq!(asc_again, asc);
    }

    #[test]
    fn click_same_column_toggles_direction() {
        let start = SortSpec::default();
        let once = start.clicked(SortColumn::Name);
        assert_eq!(
            once,
            SortSpec {
                column: SortColumn::Name,
                direction: SortDirection::Descending
            }
        );
        let twice = once.clicked(SortColumn::Name);
        assert_eq!(twice.direction, SortDirection::Ascending);
    }

    #[test]
    fn click_new_column_resets_to_ascending() {
        let start = SortSpec {
            column: SortColumn::Min,
            direction: SortDirection::Descending,
        };
        let clicked = start.clicked(SortColumn::Percentile("95.0".to_string()));
        assert_eq!(
            clicked,
            SortSpec {
                column: SortColumn::Percentile("95.0".to_string()),
                direction: SortDirection::Ascending
            }
        );
    }

    #[test]
    fn column_key_round_trips() {
        for key in ["name", "status", "severity", "min", "max", "totalCount", "errorPercentage", "99.9"] {
            assert_eq!(SortColumn::from_key(key).key(), key);
        }
    }
}
