//! The composed table session: records + filter criteria + sort spec +
//! expansion state, with the derived filtered/sorted view behind an explicit
//! cache keyed by (records version, criteria, sort spec).

use crate::chart::{ChartBackend, RecordCharts};
use crate::diagnostics;
use crate::run::{RecordId, RequestRecord, ValidatedRun};
use crate::table::columns::{self, ColumnSchema};
use crate::table::expand::{self, ExpansionState};
use crate::table::filter::{self, FilterCriteria};
use crate::table::sort::{self, SortColumn, SortSpec};

use std::collections::BTreeSet;

/// One visible row: the record plus the identity the expansion set uses.
pub struct Row<'a> {
    pub identity: RecordId,
    pub record: &'a RequestRecord,
}

/// Cache key for the derived view. The view is rebuilt exactly when this
/// tuple changes; there is no implicit memoization anywhere else.
#[derive(Debug, Clone, PartialEq)]
struct ViewKey {
    records_version: u64,
    criteria: FilterCriteria,
    sort: SortSpec,
}

#[derive(Debug)]
struct ViewCache {
    key: ViewKey,
    /// Indices into the source record collection, filtered then sorted.
    rows: Vec<usize>,
}

/// Stateless composition of the filter and sort engines: evaluate the
/// criteria, then order the survivors. Returns source indices.
pub fn filtered_sorted_records(
    records: &[RequestRecord],
    criteria: &FilterCriteria,
    spec: &SortSpec,
) -> Vec<usize> {
    let filtered = filter::apply(records, criteria);
    sort::apply(records, &filtered, spec)
}

/// Distinct non-empty status values, sorted.
pub fn available_statuses(records: &[RequestRecord]) -> Vec<String> {
    distinct_values(records.iter().map(|r| r.status.as_deref()))
}

/// Distinct non-empty severity values, sorted.
pub fn available_severities(records: &[RequestRecord]) -> Vec<String> {
    distinct_values(records.iter().map(|r| r.severity.as_deref()))
}

fn distinct_values<'a>(values: impl Iterator<Item = Option<&'a str>>) -> Vec<String> {
    let set: BTreeSet<&str> = values.flatten().filter(|s| !s.is_empty()).collect();
    set.into_iter().map(str::to_string).collect()
}

/// The table session. Criteria, sort spec, and expansion set live here and
/// reset whenever the record collection is replaced.
pub struct RequestsTable {
    records: Vec<RequestRecord>,
    records_version: u64,
    schema: ColumnSchema,
    show_assertion_columns: bool,
    test_name: Option<String>,
    criteria: FilterCriteria,
    sort: SortSpec,
    expansion: ExpansionState,
    charts: Option<RecordCharts>,
    cache: Option<ViewCache>,
    rebuilds: u64,
}

impl RequestsTable {
    pub fn new(run: ValidatedRun) -> Self {
        let schema = columns::resolve_columns(&run.records);
        Self {
            records: run.records,
            records_version: 0,
            schema,
            show_assertion_columns: run.show_assertion_columns,
            test_name: run.test_name,
            criteria: FilterCriteria::default(),
            sort: SortSpec::default(),
            expansion: ExpansionState::new(),
            charts: None,
            cache: None,
            rebuilds: 0,
        }
    }

    /// Swap in a new test run. Filter, sort, and expansion state reset to
    /// defaults and every chart instance is released.
    pub fn replace_run(&mut self, run: ValidatedRun) {
        self.records = run.records;
        self.show_assertion_columns = run.show_assertion_columns;
        self.test_name = run.test_name;
        self.records_version += 1;
        self.schema = columns::resolve_columns(&self.records);
        self.criteria = FilterCriteria::default();
        self.sort = SortSpec::default();
        self.expansion = ExpansionState::new();
        if let Some(charts) = self.charts.as_mut() {
            charts.release_all();
        }
        self.cache = None;
    }

    pub fn records(&self) -> &[RequestRecord] {
        &self.records
    }

    pub fn schema(&self) -> &ColumnSchema {
        &self.schema
    }

    pub fn show_assertion_columns(&self) -> bool {
        self.show_assertion_columns
    }

    pub fn test_name(&self) -> Option<&str> {
        self.test_name.as_deref()
    }

    pub fn criteria(&self) -> &FilterCriteria {
        &self.criteria
    }

    pub fn set_criteria(&mut self, criteria: FilterCriteria) {
        self.criteria = criteria;
    }

    pub fn sort_spec(&self) -> &SortSpec {
        &self.sort
    }

    /// Column-header click: same column toggles direction, a new column
    /// starts ascending.
    pub fn click_column(&mut self, column: SortColumn) {
        self.sort = self.sort.clicked(column);
    }

    /// The derived view. Rebuilt only when records, criteria, or sort spec
    /// changed since the last call.
    pub fn filtered_sorted(&mut self) -> Vec<Row<'_>> {
        self.ensure_view();
        let rows = self
            .cache
            .as_ref()
            .map(|c| c.rows.as_slice())
            .unwrap_or(&[]);
        rows.iter()
            .map(|&i| Row {
                identity: self.records[i].identity(i),
                record: &self.records[i],
            })
            .collect()
    }

    /// Identities of expandable records in the current view (bulk variant of
    /// expandability).
    pub fn expandable_in_view(&mut self) -> Vec<RecordId> {
        self.ensure_view();
        let rows = self
            .cache
            .as_ref()
            .map(|c| c.rows.as_slice())
            .unwrap_or(&[]);
        rows.iter()
            .filter(|&&i| expand::is_expandable(&self.records[i]))
            .map(|&i| self.records[i].identity(i))
            .collect()
    }

    pub fn toggle(&mut self, id: RecordId) {
        self.ensure_view();
        let expanding = !self.expansion.is_expanded(id);
        self.expansion.toggle(id);
        if expanding {
            self.sync_charts_with_view();
        } else if let Some(charts) = self.charts.as_mut() {
            charts.release_for(id);
        }
    }

    /// Expand every expandable record in the current view.
    pub fn expand_all(&mut self) {
        let expandable = self.expandable_in_view();
        self.expansion.expand_all(&expandable);
        self.sync_charts_with_view();
    }

    pub fn collapse_all(&mut self) {
        self.expansion.collapse_all();
        if let Some(charts) = self.charts.as_mut() {
            charts.release_all();
        }
    }

    pub fn is_expanded(&self, id: RecordId) -> bool {
        self.expansion.is_expanded(id)
    }

    /// Recomputed against the live filtered view: filtering changes which
    /// records are expandable-and-visible.
    pub fn is_all_expanded(&mut self) -> bool {
        let expandable = self.expandable_in_view();
        self.expansion.is_all_expanded(&expandable)
    }

    /// Attach the chart backend the presentation layer uses. Charts for
    /// already-expanded visible rows are acquired immediately.
    pub fn attach_chart_backend(&mut self, backend: Box<dyn ChartBackend>) {
        self.charts = Some(RecordCharts::new(backend));
        self.ensure_view();
        self.sync_charts_with_view();
    }

    pub fn charts(&self) -> Option<&RecordCharts> {
        self.charts.as_ref()
    }

    /// Container-resize notification from the presentation layer.
    pub fn notify_container_resized(&mut self, container: &str) {
        if let Some(charts) = self.charts.as_mut() {
            charts.notify_resized(container);
        }
    }

    fn ensure_view(&mut self) {
        let key = ViewKey {
            records_version: self.records_version,
            criteria: self.criteria.clone(),
            sort: self.sort.clone(),
        };
        if self.cache.as_ref().is_some_and(|c| c.key == key) {
            return;
        }

        let rows = filtered_sorted_records(&self.records, &self.criteria, &self.sort);
        self.cache = Some(ViewCache { key, rows });
        self.rebuilds += 1;
        self.sync_charts_with_view();
    }

    /// Reconcile chart instances with the visible expanded rows: release
    /// charts for rows the filter removed, acquire for expanded rows that
    /// became visible without charts. A backend failure collapses everything
    /// rather than leaving expansion state half-true.
    fn sync_charts_with_view(&mut self) {
        let Some(charts) = self.charts.as_mut() else {
            return;
        };
        let rows = self
            .cache
            .as_ref()
            .map(|c| c.rows.as_slice())
            .unwrap_or(&[]);

        let visible: BTreeSet<RecordId> =
            rows.iter().map(|&i| self.records[i].identity(i)).collect();
        charts.retain_visible(&visible);

        for &i in rows {
            let id = self.records[i].identity(i);
            if !self.expansion.is_expanded(id) || charts.has_charts(id) {
                continue;
            }
            if let Err(err) = charts.acquire_for(id, &self.records[i]) {
                diagnostics::warn(format!(
                    "chart acquisition failed, collapsing all rows: {}",
                    err
                ));
                self.expansion.collapse_all();
                charts.release_all();
                return;
            }
        }
    }

    #[cfg(test)]
    fn view_rebuilds(&self) -> u64 {
        self.rebuilds
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::{ChartInstance, ChartOptions};
    use crate::run::ResponseTimes;
    use crate::table::filter::NumericOperator;
    use pretty_assertions::assert_eq;
    use std::cell::Cell;
    use std::rc::Rc;

    fn record(id: Option<u64>, name: &str, status: Option<&str>, pass: u64) -> RequestRecord {
        RequestRecord {
            id,
            name: name.to_string(),
            status: status.map(str::to_string),
            severity: None,
            response_times: ResponseTimes {
                min: 10.0,
                max: 100.0,
                percentiles: [("95.0".to_string(), 50.0)].into_iter().collect(),
            },
            total_count: pass,
            pass_count: pass,
            fail_count: 0,
            error_percentage: 0.0,
            requirements: None,
        }
    }

    fn run(records: Vec<RequestRecord>) -> ValidatedRun {
        ValidatedRun {
            records,
            show_assertion_columns: true,
            test_name: None,
        }
    }

    fn fail_filter() -> FilterCriteria {
        FilterCriteria {
            selected_statuses: ["FAIL".to_string()].into_iter().collect(),
            ..Default::default()
        }
    }

    #[test]
    fn view_is_a_filtered_subset_in_sorted_order() {
        let mut table = RequestsTable::new(run(vec![
            record(Some(1), "b", Some("PASS"), 10),
            record(Some(2), "a", Some("FAIL"), 10),
            record(Some(3), "c", Some("FAIL"), 10),
        ]));
        table.set_criteria(fail_filter());

        let names: Vec<String> = table
            .filtered_sorted()
            .iter()
            .map(|row| row.record.name.clone())
            .collect();
        // Default sort: name ascending.
        assert_eq!(names, vec!["a", "c"]);
    }

    #[test]
    fn status_filter_example_selects_exactly_the_fail_record() {
        let mut table = RequestsTable::new(run(vec![
            record(Some(1), "one", Some("PASS"), 0),
            record(Some(2), "two", Some("FAIL"), 0),
        ]));
        table.set_criteria(fail_filter());

        let identities: Vec<RecordId> =
            table.filtered_sorted().iter().map(|r| r.identity).collect();
        assert_eq!(identities, vec![2]);
    }

    #[test]
    fn view_rebuilds_only_when_the_key_changes() {
        let mut table = RequestsTable::new(run(vec![
            record(Some(1), "a", Some("PASS"), 0),
            record(Some(2), "b", Some("FAIL"), 0),
        ]));

        table.filtered_sorted();
        table.filtered_sorted();
        assert_eq!(table.view_rebuilds(), 1);

        // Setting an equal criteria value keeps the cache.
        table.set_criteria(FilterCriteria::default());
        table.filtered_sorted();
        assert_eq!(table.view_rebuilds(), 1);

        table.set_criteria(fail_filter());
        table.filtered_sorted();
        assert_eq!(table.view_rebuilds(), 2);

        table.click_column(SortColumn::Min);
        table.filtered_sorted();
        assert_eq!(table.view_rebuilds(), 3);
    }

    #[test]
    fn expand_all_expands_only_expandable_records() {
        let mut table = RequestsTable::new(run(vec![
            record(Some(1), "a", None, 0),
            record(Some(2), "b", None, 5),
            record(Some(3), "c", None, 0),
        ]));
        table.expand_all();

        assert!(table.is_expanded(2));
        assert!(!table.is_expanded(1));
        assert!(!table.is_expanded(3));
        assert!(table.is_all_expanded());
    }

    #[test]
    fn all_expanded_follows_the_live_filtered_view() {
        let mut table = RequestsTable::new(run(vec![
            record(Some(1), "a", Some("FAIL"), 5),
            record(Some(2), "b", Some("PASS"), 5),
        ]));
        table.set_criteria(fail_filter());
        table.expand_all();
        assert!(table.is_all_expanded());

        // Widening the filter brings in an unexpanded expandable record.
        table.set_criteria(FilterCriteria::default());
        assert!(!table.is_all_expanded());
    }

    #[test]
    fn toggle_round_trip_restores_state() {
        let mut table = RequestsTable::new(run(vec![record(Some(1), "a", None, 5)]));
        table.toggle(1);
        assert!(table.is_expanded(1));
        table.toggle(1);
        assert!(!table.is_expanded(1));
    }

    #[test]
    fn identity_falls_back_to_source_index() {
        let mut table = RequestsTable::new(run(vec![
            record(None, "b", None, 0),
            record(None, "a", None, 0),
        ]));
        // Sorted by name ascending: "a" (source index 1) comes first but
        // keeps its source-positional identity.
        let identities: Vec<RecordId> =
            table.filtered_sorted().iter().map(|r| r.identity).collect();
        assert_eq!(identities, vec![1, 0]);
    }

    #[test]
    fn replace_run_resets_session_state() {
        let mut table = RequestsTable::new(run(vec![record(Some(1), "a", Some("FAIL"), 5)]));
        table.set_criteria(fail_filter());
        table.click_column(SortColumn::Min);
        table.toggle(1);

        table.replace_run(run(vec![record(Some(9), "z", Some("PASS"), 5)]));

        assert_eq!(table.criteria(), &FilterCriteria::default());
        assert_eq!(table.sort_spec(), &SortSpec::default());
        assert!(!table.is_expanded(1));
        let names: Vec<String> = table
            .filtered_sorted()
            .iter()
            .map(|r| r.record.name.clone())
            .collect();
        assert_eq!(names, vec!["z"]);
    }

    #[test]
    fn numeric_filter_composes_with_the_view() {
        let mut table = RequestsTable::new(run(vec![
            record(Some(1), "a", None, 0),
            record(Some(2), "b", None, 0),
        ]));
        let mut criteria = FilterCriteria::default();
        criteria.numeric_field = "min".to_string();
        criteria.numeric_operator = NumericOperator::GreaterThan;
        criteria.numeric_value = "5".to_string();
        table.set_criteria(criteria);
        assert_eq!(table.filtered_sorted().len(), 2);
    }

    #[test]
    fn distinct_statuses_and_severities_are_sorted_and_non_empty() {
        let mut records = vec![
            record(Some(1), "a", Some("PASS"), 0),
            record(Some(2), "b", Some("FAIL"), 0),
            record(Some(3), "c", Some("PASS"), 0),
            record(Some(4), "d", Some(""), 0),
            record(Some(5), "e", None, 0),
        ];
        records[0].severity = Some("minor".to_string());
        records[1].severity = Some("blocker".to_string());

        assert_eq!(available_statuses(&records), vec!["FAIL", "PASS"]);
        assert_eq!(available_severities(&records), vec!["blocker", "minor"]);
    }

    // Chart lifecycle wiring. A counting backend is enough here; ordering is
    // covered by the manager's own tests.
    struct CountingBackend {
        creates: Rc<Cell<u64>>,
        disposes: Rc<Cell<u64>>,
    }

    struct CountingInstance {
        disposes: Rc<Cell<u64>>,
    }

    impl ChartBackend for CountingBackend {
        fn create(
            &mut self,
            _container: &str,
            _options: &ChartOptions,
        ) -> crate::Result<Box<dyn ChartInstance>> {
            self.creates.set(self.creates.get() + 1);
            Ok(Box::new(CountingInstance {
                disposes: Rc::clone(&self.disposes),
            }))
        }
    }

    impl ChartInstance for CountingInstance {
        fn resize(&mut self) {}
        fn dispose(&mut self) {
            self.disposes.set(self.disposes.get() + 1);
        }
    }

    fn counting_table() -> (RequestsTable, Rc<Cell<u64>>, Rc<Cell<u64>>) {
        let creates = Rc::new(Cell::new(0));
        let disposes = Rc::new(Cell::new(0));
        let mut table = RequestsTable::new(run(vec![
            record(Some(1), "a", Some("PASS"), 5),
            record(Some(2), "b", Some("FAIL"), 5),
        ]));
        table.attach_chart_backend(Box::new(CountingBackend {
            creates: Rc::clone(&creates),
            disposes: Rc::clone(&disposes),
        }));
        (table, creates, disposes)
    }

    #[test]
    fn toggle_acquires_and_releases_charts() {
        let (mut table, creates, disposes) = counting_table();

        table.toggle(1);
        // Pass/fail donut + percentile series for this record.
        assert_eq!(creates.get(), 2);
        assert_eq!(disposes.get(), 0);

        table.toggle(1);
        assert_eq!(disposes.get(), 2);
    }

    #[test]
    fn filtering_out_an_expanded_record_releases_its_charts() {
        let (mut table, creates, disposes) = counting_table();

        table.toggle(1);
        assert_eq!(creates.get(), 2);

        table.set_criteria(fail_filter());
        table.filtered_sorted();
        assert_eq!(disposes.get(), 2);

        // Filtering back in re-acquires: the detail region is visible again.
        table.set_criteria(FilterCriteria::default());
        table.filtered_sorted();
        assert_eq!(creates.get(), 4);
    }

    #[test]
    fn collapse_all_and_replace_run_release_everything() {
        let (mut table, creates, disposes) = counting_table();

        table.expand_all();
        let opened = creates.get();
        assert!(opened > 0);

        table.collapse_all();
        assert_eq!(disposes.get(), opened);

        table.expand_all();
        table.replace_run(run(vec![record(Some(7), "n", None, 1)]));
        assert_eq!(creates.get(), disposes.get());
    }
}
