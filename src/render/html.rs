use crate::Result;
use crate::chart::{self, ChartKind, ChartOptions};
use crate::table::columns::{self, percentile_label};
use crate::table::{self, RequestsTable, expand};

use serde::Serialize;
use std::collections::BTreeMap;

/// Everything the report page needs, embedded as one JSON object. The page's
/// own script mirrors the engine's filter/sort/expansion semantics so the
/// table stays interactive without a server.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct ReportData {
    test_name: Option<String>,
    show_assertion_columns: bool,
    percentile_columns: Vec<String>,
    percentile_labels: BTreeMap<String, String>,
    numeric_fields: Vec<FieldView>,
    statuses: Vec<String>,
    severities: Vec<String>,
    rows: Vec<RowView>,
}

#[derive(Debug, Clone, Serialize)]
struct FieldView {
    key: String,
    label: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct RowView {
    identity: u64,
    name: String,
    status: Option<String>,
    severity: Option<String>,
    min: f64,
    max: f64,
    percentiles: BTreeMap<String, f64>,
    total_count: u64,
    pass_count: u64,
    fail_count: u64,
    error_percentage: f64,
    /// None when the record saw no requests (0/0); rendered as unavailable.
    success_rate: Option<f64>,
    /// Per-row-detail expandability (the toggle is shown for these).
    expandable: bool,
    /// Bulk expandability (expand-all only touches these).
    bulk_expandable: bool,
    charts: Vec<ChartOptions>,
    chart_fallbacks: Vec<String>,
    requirements: Option<RequirementsView>,
}

#[derive(Debug, Clone, Serialize)]
struct RequirementsView {
    passed: u64,
    failed: u64,
    checks: Vec<CheckView>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct CheckView {
    percentile: f64,
    value: f64,
    status: String,
    difference: Option<f64>,
    percentage_difference: Option<f64>,
}

fn build_report_data(table: &mut RequestsTable) -> ReportData {
    let schema = table.schema().clone();
    let numeric_fields = columns::numeric_fields(&schema)
        .into_iter()
        .map(|f| FieldView {
            key: f.key,
            label: f.label,
        })
        .collect();
    let percentile_labels = schema
        .percentile_columns
        .iter()
        .map(|key| (key.clone(), percentile_label(key)))
        .collect();
    let statuses = table::available_statuses(table.records());
    let severities = table::available_severities(table.records());

    let rows = table
        .filtered_sorted()
        .iter()
        .map(|row| {
            let record = row.record;
            let success_rate = record.success_rate();
            RowView {
                identity: row.identity,
                name: record.display_name().to_string(),
                status: record.status.clone(),
                severity: record.severity.clone(),
                min: record.response_times.min,
                max: record.response_times.max,
                percentiles: record.response_times.percentiles.clone(),
                total_count: record.total_count,
                pass_count: record.pass_count,
                fail_count: record.fail_count,
                error_percentage: record.error_percentage,
                success_rate: success_rate.is_finite().then_some(success_rate),
                expandable: expand::has_detail_content(record),
                bulk_expandable: expand::is_expandable(record),
                charts: ChartKind::ALL
                    .iter()
                    .filter_map(|&kind| chart::build_options(record, kind).ok())
                    .collect(),
                chart_fallbacks: chart::chart_fallbacks(record)
                    .into_iter()
                    .map(|(kind, err)| format!("{}: {}", kind.slug(), err))
                    .collect(),
                requirements: record.requirements.as_ref().map(|r| RequirementsView {
                    passed: r.passed,
                    failed: r.failed,
                    checks: r
                        .percentiles
                        .iter()
                        .map(|c| CheckView {
                            percentile: c.percentile,
                            value: c.value,
                            status: c.status.clone(),
                            difference: c.difference,
                            percentage_difference: c.percentage_difference,
                        })
                        .collect(),
                }),
            }
        })
        .collect();

    ReportData {
        test_name: table.test_name().map(str::to_string),
        show_assertion_columns: table.show_assertion_columns(),
        percentile_columns: schema.percentile_columns,
        percentile_labels,
        numeric_fields,
        statuses,
        severities,
        rows,
    }
}

/// Render a self-contained HTML report (data embedded as JSON).
///
/// Important: we avoid `format!()` because the HTML contains many `{}` from JS
/// template literals (e.g., `${x}`), which would conflict with Rust formatting.
pub fn render_html_report(table: &mut RequestsTable) -> Result<String> {
    let json = serde_json::to_string(&build_report_data(table))?;

    const TEMPLATE: &str = r#"<!doctype html>
<html>
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>Load Test Report</title>
<style>
  body { font-family: system-ui, -apple-system, Segoe UI, Roboto, Arial, sans-serif; margin: 0; }
  header { padding: 12px 16px; border-bottom: 1px solid #ddd; display: flex; gap: 16px; align-items: baseline; }
  header h1 { font-size: 18px; margin: 0; }
  .muted { color: #777; font-size: 12px; }
  .controls { display: flex; gap: 16px; flex-wrap: wrap; padding: 12px 16px; border-bottom: 1px solid #eee; align-items: flex-start; }
  .control { font-size: 13px; }
  .control b { display: block; margin-bottom: 4px; }
  .checks label { display: block; white-space: nowrap; }
  select, input[type=text] { padding: 4px 6px; border: 1px solid #ddd; border-radius: 6px; }
  button { padding: 6px 10px; }

  table { border-collapse: collapse; width: 100%; }
  th, td { border-bottom: 1px solid #eee; padding: 6px 8px; text-align: left; font-size: 14px; }
  th { position: sticky; top: 0; background: white; border-bottom: 1px solid #ddd; cursor: pointer; user-select: none; }
  .num { text-align: right; font-variant-numeric: tabular-nums; }
  .toggle { cursor: pointer; user-select: none; display: inline-block; width: 16px; color: #666; }
  .detail { background: #fafafa; }
  .detail td { padding: 12px 24px; }
  .panel { display: flex; gap: 24px; flex-wrap: wrap; }
  .chart { min-width: 220px; }
  .chart h4 { margin: 0 0 6px 0; font-size: 13px; }
  .bar-row { display: flex; align-items: center; gap: 6px; font-size: 12px; margin: 2px 0; }
  .bar { height: 10px; background: #5b8def; border-radius: 2px; }
  .bar.fail { background: #e05d5d; }
  .fallback { color: #999; font-size: 12px; font-style: italic; }
  .pill { padding: 2px 6px; border: 1px solid #ddd; border-radius: 999px; background: #fafafa; font-size: 12px; }
</style>
</head>
<body>
<header>
  <h1 id="title">Load Test Report</h1>
  <span class="muted" id="rowCount"></span>
</header>

<div class="controls">
  <div class="control" id="statusFilter">
    <b>Status</b>
    <div class="checks" id="statusChecks"></div>
  </div>
  <div class="control" id="severityFilter">
    <b>Severity</b>
    <div class="checks" id="severityChecks"></div>
  </div>
  <div class="control">
    <b>Numeric filter</b>
    <select id="numField"><option value="">(none)</option></select>
    <select id="numOp">
      <option value="gt">&gt;</option>
      <option value="lt">&lt;</option>
    </select>
    <input type="text" id="numValue" placeholder="value" size="8">
  </div>
  <div class="control">
    <b>Rows</b>
    <button id="expandAll">Expand all</button>
    <button id="collapseAll">Collapse all</button>
    <span class="pill" id="allExpanded" style="display:none;">all expanded</span>
  </div>
</div>

<table>
  <thead><tr id="headRow"></tr></thead>
  <tbody id="body"></tbody>
</table>

<script>
// Embedded report data (JSON object literal)
const DATA = __DATA__;

const state = {
  statuses: new Set(),
  severities: new Set(),
  numericField: "",
  numericOp: "gt",
  numericValue: "",
  sortColumn: "name",
  sortDir: "asc",
  expanded: new Set(),
};

function escapeHtml(s) {
  return String(s)
    .replaceAll("&", "&amp;")
    .replaceAll("<", "&lt;")
    .replaceAll(">", "&gt;")
    .replaceAll('"', "&quot;")
    .replaceAll("'", "&#39;");
}

function fmt(x) {
  if (x === null || x === undefined || Number.isNaN(x)) return "n/a";
  return (Math.round(x * 100) / 100).toString();
}

function numericValueOf(row, key) {
  switch (key) {
    case "min": return row.min;
    case "max": return row.max;
    case "totalCount": return row.totalCount;
    case "errorPercentage": return row.errorPercentage;
    default: return (row.percentiles[key] !== undefined && row.percentiles[key] !== null) ? row.percentiles[key] : 0;
  }
}

function cellValue(row, key) {
  if (key === "name") return row.name;
  if (key === "status") return row.status || "";
  if (key === "severity") return row.severity || "";
  return numericValueOf(row, key);
}

function numericThreshold() {
  if (!state.numericField || !state.numericValue) return null;
  const v = parseFloat(state.numericValue);
  return Number.isNaN(v) ? null : v;
}

function passesFilters(row) {
  if (state.statuses.size && !(row.status && state.statuses.has(row.status))) return false;
  if (state.severities.size && !(row.severity && state.severities.has(row.severity))) return false;
  const threshold = numericThreshold();
  if (threshold !== null) {
    const value = numericValueOf(row, state.numericField);
    const pass = state.numericOp === "gt" ? value > threshold : value < threshold;
    if (!pass) return false;
  }
  return true;
}

function visibleRows() {
  const rows = DATA.rows.filter(passesFilters);
  const col = state.sortColumn;
  const dir = state.sortDir === "asc" ? 1 : -1;
  rows.sort((a, b) => {
    const x = cellValue(a, col);
    const y = cellValue(b, col);
    if (typeof x === "string" && typeof y === "string") return dir * x.localeCompare(y);
    return dir * (Number(x) - Number(y));
  });
  return rows;
}

function clickColumn(key) {
  if (state.sortColumn === key) {
    state.sortDir = state.sortDir === "asc" ? "desc" : "asc";
  } else {
    state.sortColumn = key;
    state.sortDir = "asc";
  }
  render();
}

function columnList() {
  const cols = [["name", "Name"]];
  if (DATA.showAssertionColumns) {
    cols.push(["status", "Status"], ["severity", "Severity"]);
  }
  cols.push(["min", "Min"]);
  for (const key of DATA.percentileColumns) cols.push([key, DATA.percentileLabels[key] || key]);
  cols.push(["max", "Max"], ["totalCount", "Total"], ["errorPercentage", "Error %"]);
  return cols;
}

function renderHead() {
  const tr = document.getElementById("headRow");
  tr.innerHTML = "<th></th>";
  for (const [key, label] of columnList()) {
    const th = document.createElement("th");
    const marker = state.sortColumn === key ? (state.sortDir === "asc" ? " ▴" : " ▾") : "";
    th.textContent = label + marker;
    th.onclick = () => clickColumn(key);
    tr.appendChild(th);
  }
}

function chartHtml(options) {
  if (options.type === "passFailDonut") {
    const total = options.pass + options.fail;
    return '<div class="chart"><h4>Pass / fail</h4>' +
      barRow("pass", options.pass, total, false) +
      barRow("fail", options.fail, total, true) + "</div>";
  }
  if (options.type === "percentileSeries") {
    const max = Math.max(...options.points.map(p => p.value), 1);
    let html = '<div class="chart"><h4>Percentiles</h4>';
    for (const p of options.points) html += barRow("P" + p.percentile, p.value, max, false);
    return html + "</div>";
  }
  if (options.type === "requirementSummary") {
    const total = options.passed + options.failed;
    return '<div class="chart"><h4>Requirements</h4>' +
      barRow("passed", options.passed, total, false) +
      barRow("failed", options.failed, total, true) + "</div>";
  }
  return "";
}

function barRow(label, value, total, isFail) {
  const width = total > 0 ? Math.max(2, Math.round(140 * value / total)) : 2;
  return '<div class="bar-row"><span style="width:64px;">' + escapeHtml(label) + "</span>" +
    '<span class="bar' + (isFail ? " fail" : "") + '" style="width:' + width + 'px;"></span>' +
    "<span>" + fmt(value) + "</span></div>";
}

function detailHtml(row) {
  let html = '<div class="panel">';
  for (const options of row.charts) html += chartHtml(options);
  for (const fallback of row.chartFallbacks) {
    html += '<div class="chart"><div class="fallback">chart unavailable (' + escapeHtml(fallback) + ")</div></div>";
  }
  html += '<div class="chart"><h4>Counts</h4><div class="bar-row">total: ' + row.totalCount +
    ", pass: " + row.passCount + ", fail: " + row.failCount +
    ", success rate: " + fmt(row.successRate) + "%</div></div>";
  if (row.requirements && row.requirements.checks.length) {
    html += '<div class="chart"><h4>Requirement checks</h4>';
    for (const c of row.requirements.checks) {
      html += '<div class="bar-row">P' + c.percentile + ": " + fmt(c.value) +
        " [" + escapeHtml(c.status) + "]" +
        (c.difference !== null && c.difference !== undefined ? " Δ " + fmt(c.difference) : "") +
        "</div>";
    }
    html += "</div>";
  }
  return html + "</div>";
}

function renderBody() {
  const body = document.getElementById("body");
  body.innerHTML = "";
  const rows = visibleRows();
  const cols = columnList();

  for (const row of rows) {
    const tr = document.createElement("tr");

    const toggleTd = document.createElement("td");
    if (row.expandable) {
      const isExpanded = state.expanded.has(row.identity);
      const span = document.createElement("span");
      span.className = "toggle";
      span.textContent = isExpanded ? "▾" : "▸";
      span.onclick = () => {
        if (state.expanded.has(row.identity)) state.expanded.delete(row.identity);
        else state.expanded.add(row.identity);
        render();
      };
      toggleTd.appendChild(span);
    }
    tr.appendChild(toggleTd);

    for (const [key] of cols) {
      const td = document.createElement("td");
      const value = cellValue(row, key);
      if (typeof value === "string") {
        td.textContent = value;
      } else {
        td.className = "num";
        td.textContent = fmt(value);
      }
      tr.appendChild(td);
    }
    body.appendChild(tr);

    if (row.expandable && state.expanded.has(row.identity)) {
      const detailTr = document.createElement("tr");
      detailTr.className = "detail";
      const td = document.createElement("td");
      td.colSpan = cols.length + 1;
      td.innerHTML = detailHtml(row);
      detailTr.appendChild(td);
      body.appendChild(detailTr);
    }
  }

  document.getElementById("rowCount").textContent =
    rows.length + " of " + DATA.rows.length + " requests";

  const expandable = rows.filter(r => r.bulkExpandable);
  const allExpanded = expandable.length > 0 && expandable.every(r => state.expanded.has(r.identity));
  document.getElementById("allExpanded").style.display = allExpanded ? "" : "none";
}

function render() {
  renderHead();
  renderBody();
}

function renderChecks(containerId, values, selected) {
  const container = document.getElementById(containerId);
  container.innerHTML = "";
  if (!values.length) container.innerHTML = '<span class="muted">(none)</span>';
  for (const value of values) {
    const label = document.createElement("label");
    const box = document.createElement("input");
    box.type = "checkbox";
    box.onchange = () => {
      if (box.checked) selected.add(value);
      else selected.delete(value);
      render();
    };
    label.appendChild(box);
    label.appendChild(document.createTextNode(" " + value));
    container.appendChild(label);
  }
}

function expandAllRows() {
  const expandable = visibleRows().filter(r => r.bulkExpandable);
  state.expanded = new Set(expandable.map(r => r.identity));
  render();
}

function collapseAllRows() {
  state.expanded.clear();
  render();
}

if (DATA.testName) {
  document.getElementById("title").textContent = "Load Test Report - " + DATA.testName;
}
if (!DATA.showAssertionColumns) {
  document.getElementById("statusFilter").style.display = "none";
  document.getElementById("severityFilter").style.display = "none";
}

renderChecks("statusChecks", DATA.statuses, state.statuses);
renderChecks("severityChecks", DATA.severities, state.severities);

const numField = document.getElementById("numField");
for (const field of DATA.numericFields) {
  const option = document.createElement("option");
  option.value = field.key;
  option.textContent = field.label;
  numField.appendChild(option);
}
numField.onchange = () => { state.numericField = numField.value; render(); };
document.getElementById("numOp").onchange = (e) => { state.numericOp = e.target.value; render(); };
document.getElementById("numValue").addEventListener("input", (e) => {
  state.numericValue = e.target.value || "";
  render();
});

document.getElementById("expandAll").onclick = expandAllRows;
document.getElementById("collapseAll").onclick = collapseAllRows;

render();
</script>
</body>
</html>
"#;

    Ok(TEMPLATE.replace("__DATA__", &json))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::run::{RequestRecord, ResponseTimes, ValidatedRun};
    use pretty_assertions::assert_eq;

    fn table() -> RequestsTable {
        RequestsTable::new(ValidatedRun {
            records: vec![RequestRecord {
                id: Some(1),
                name: "GET /cart".to_string(),
                status: Some("PASS".to_string()),
                severity: None,
                response_times: ResponseTimes {
                    min: 10.0,
                    max: 90.0,
                    percentiles: [("50.0".to_string(), 40.0), ("100.0".to_string(), 90.0)]
                        .into_iter()
                        .collect(),
                },
                total_count: 10,
                pass_count: 10,
                fail_count: 0,
                error_percentage: 0.0,
                requirements: None,
            }],
            show_assertion_columns: false,
            test_name: Some("soak".to_string()),
        })
    }

    #[test]
    fn report_embeds_the_data_and_no_placeholder_remains() {
        let html = render_html_report(&mut table()).unwrap();
        assert!(html.contains("\"testName\":\"soak\""));
        assert!(html.contains("GET /cart"));
        assert!(!html.contains("__DATA__"));
    }

    #[test]
    fn report_data_drops_the_100th_percentile_column() {
        let mut t = table();
        let data = build_report_data(&mut t);
        assert_eq!(data.percentile_columns, vec!["50.0"]);
        // The raw value is still on the row itself (max conveys it).
        assert!(data.rows[0].percentiles.contains_key("100.0"));
    }

    #[test]
    fn zero_total_renders_null_success_rate() {
        let mut t = table();
        let data = build_report_data(&mut t);
        assert_eq!(data.rows[0].success_rate, Some(100.0));

        let mut zero = RequestsTable::new(ValidatedRun {
            records: vec![RequestRecord {
                total_count: 0,
                pass_count: 0,
                ..t.records()[0].clone()
            }],
            show_assertion_columns: false,
            test_name: None,
        });
        let data = build_report_data(&mut zero);
        assert_eq!(data.rows[0].success_rate, None);
    }
}
