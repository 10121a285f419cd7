//! Run file (run.json) parsing and validation.
//!
//! JSON shape:
//! {
//!   "meta": { "testName": "checkout soak" },      // optional
//!   "requests": [
//!     {
//!       "id": 3,                                   // optional stable identity
//!       "name": "GET /cart",
//!       "status": "PASS",                          // optional
//!       "severity": "critical",                    // optional
//!       "responseTimes": {
//!         "min": 12.0,
//!         "max": 840.0,
//!         "percentiles": { "50.0": 40, "99.9": 700, "100.0": 840 }
//!       },
//!       "totalCount": 1200,
//!       "passCount": 1190,
//!       "failCount": 10,
//!       "errorPercentage": "0.83",                 // number or numeric string
//!       "requirements": {
//!         "passed": 2,
//!         "failed": 1,
//!         "percentiles": [
//!           { "percentile": 99.0, "value": 512.0, "status": "FAIL",
//!             "difference": 12.0, "percentageDifference": 2.4 }
//!         ]
//!       }
//!     },
//!     ...
//!   ]
//! }
//!
//! A request missing `name` or `responseTimes` is invalid: it is skipped with
//! a stderr warning, never fatal. Duplicate explicit ids are fatal because
//! they would corrupt expansion identity.

use crate::Result;
use crate::diagnostics;
use crate::run::record::{
    RequestRecord, RequirementCheck, Requirements, ResponseTimes,
};

use anyhow::{Context, bail};
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;

#[derive(Debug, Clone, Deserialize)]
pub struct RunSpec {
    #[serde(default)]
    pub requests: Vec<RawRequest>,

    #[serde(default)]
    pub meta: Option<RunMeta>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunMeta {
    #[serde(default)]
    pub test_name: Option<String>,
}

/// Raw request shape as it appears in run.json. Every field is optional at
/// this layer; validation decides what is fatal, skippable, or coercible.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawRequest {
    #[serde(default)]
    pub id: Option<u64>,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub status: Option<String>,

    #[serde(default)]
    pub severity: Option<String>,

    #[serde(default)]
    pub response_times: Option<RawResponseTimes>,

    #[serde(default)]
    pub total_count: u64,

    #[serde(default)]
    pub pass_count: u64,

    #[serde(default)]
    pub fail_count: u64,

    /// Number or numeric string in the wild; coerced during validation.
    #[serde(default)]
    pub error_percentage: Option<Value>,

    #[serde(default)]
    pub requirements: Option<RawRequirements>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawResponseTimes {
    #[serde(default)]
    pub min: f64,

    #[serde(default)]
    pub max: f64,

    /// Values kept raw here: some producers emit numeric strings.
    #[serde(default)]
    pub percentiles: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawRequirements {
    #[serde(default)]
    pub passed: u64,

    #[serde(default)]
    pub failed: u64,

    #[serde(default)]
    pub percentiles: Vec<RawRequirementCheck>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawRequirementCheck {
    pub percentile: f64,
    pub value: f64,

    #[serde(default)]
    pub status: String,

    #[serde(default)]
    pub difference: Option<f64>,

    #[serde(default)]
    pub percentage_difference: Option<f64>,
}

/// Validated collection ready for the table engine.
#[derive(Debug, Clone)]
pub struct ValidatedRun {
    pub records: Vec<RequestRecord>,
    /// True iff any record carries severity or requirement metadata; the
    /// presentation layer hides the status/severity columns otherwise.
    pub show_assertion_columns: bool,
    pub test_name: Option<String>,
}

/// Percentile keys are decimal strings ("50.0", "99.9"). Anything else is
/// dropped from that record with a warning.
const PERCENTILE_KEY_RE: &str = r"^[0-9]+(\.[0-9]+)?$";

impl RunSpec {
    /// Validate raw requests and build the record collection.
    ///
    /// Phases:
    /// 1) Skip invalid requests (missing name or responseTimes) with warnings.
    /// 2) Enforce unique explicit ids (fatal).
    /// 3) Normalize percentile maps and coerce numeric-like fields.
    pub fn validate_and_build(&self) -> Result<ValidatedRun> {
        let key_re = Regex::new(PERCENTILE_KEY_RE)?;

        let mut records: Vec<RequestRecord> = Vec::new();
        let mut seen_ids: BTreeSet<u64> = BTreeSet::new();

        for (index, raw) in self.requests.iter().enumerate() {
            let name = match &raw.name {
                Some(n) => n.clone(),
                None => {
                    diagnostics::warn(format!(
                        "request #{} has no name; skipping record",
                        index
                    ));
                    continue;
                }
            };

            let raw_times = match &raw.response_times {
                Some(rt) => rt,
                None => {
                    diagnostics::warn(format!(
                        "request '{}' (#{}) has no responseTimes; skipping record",
                        name, index
                    ));
                    continue;
                }
            };

            if let Some(id) = raw.id {
                if !seen_ids.insert(id) {
                    bail!(
                        "{}",
                        diagnostics::error_message(format!(
                            "duplicate request id {} (second occurrence at request '{}')",
                            id, name
                        ))
                    );
                }
            }

            let mut percentiles: BTreeMap<String, f64> = BTreeMap::new();
            for (key, value) in &raw_times.percentiles {
                if !key_re.is_match(key) {
                    diagnostics::warn(format!(
                        "request '{}': percentile key {:?} is not a decimal; dropping it",
                        name, key
                    ));
                    continue;
                }
                let coerced = match coerce_number(value) {
                    Some(v) => v,
                    None => {
                        diagnostics::warn(format!(
                            "request '{}': percentile {:?} has a non-numeric value",
                            name, key
                        ));
                        f64::NAN
                    }
                };
                percentiles.insert(key.clone(), coerced);
            }

            let error_percentage = match &raw.error_percentage {
                None => 0.0,
                Some(value) => coerce_number(value).unwrap_or_else(|| {
                    diagnostics::warn(format!(
                        "request '{}': errorPercentage {:?} is not numeric; using 0",
                        name, value
                    ));
                    0.0
                }),
            };

            records.push(RequestRecord {
                id: raw.id,
                name,
                status: raw.status.clone(),
                severity: raw.severity.clone(),
                response_times: ResponseTimes {
                    min: raw_times.min,
                    max: raw_times.max,
                    percentiles,
                },
                total_count: raw.total_count,
                pass_count: raw.pass_count,
                fail_count: raw.fail_count,
                error_percentage,
                requirements: raw.requirements.as_ref().map(build_requirements),
            });
        }

        let show_assertion_columns = records
            .iter()
            .any(|r| r.severity.is_some() || r.requirements.is_some());

        Ok(ValidatedRun {
            records,
            show_assertion_columns,
            test_name: self.meta.as_ref().and_then(|m| m.test_name.clone()),
        })
    }
}

fn build_requirements(raw: &RawRequirements) -> Requirements {
    Requirements {
        passed: raw.passed,
        failed: raw.failed,
        percentiles: raw
            .percentiles
            .iter()
            .map(|c| RequirementCheck {
                percentile: c.percentile,
                value: c.value,
                status: c.status.clone(),
                difference: c.difference,
                percentage_difference: c.percentage_difference,
            })
            .collect(),
    }
}

/// Coerce a JSON value to f64: numbers pass through, numeric strings parse.
fn coerce_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Read and validate a run file.
pub fn load_run_file(path: &str) -> Result<ValidatedRun> {
    let text = fs::read_to_string(path)
        .with_context(|| diagnostics::error_message(format!("read run file {}", path)))?;
    let spec: RunSpec = serde_json::from_str(&text)
        .with_context(|| diagnostics::error_message(format!("parse run file {}", path)))?;
    spec.validate_and_build()
}
