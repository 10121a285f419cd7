//! Row expansion state: which records currently show their detail panel.

use crate::Result;
use crate::diagnostics;
use crate::run::{RecordId, RequestRecord};

use anyhow::bail;
use std::collections::BTreeSet;

/// Bulk-expansion variant of expandability: the record has pass/fail counts
/// or requirement results worth a detail panel.
pub fn is_expandable(record: &RequestRecord) -> bool {
    record.pass_count > 0
        || record.fail_count > 0
        || record
            .requirements
            .as_ref()
            .is_some_and(|r| r.passed > 0 || r.failed > 0)
}

/// Per-row-detail variant: additionally admits a record whose only detail
/// content is its percentile distribution.
pub fn has_detail_content(record: &RequestRecord) -> bool {
    is_expandable(record) || !record.response_times.percentiles.is_empty()
}

/// The expansion set. Mutations never corrupt it: an error inside a bulk
/// operation resets the set to empty (fail-safe collapse) and warns.
#[derive(Debug, Clone, Default)]
pub struct ExpansionState {
    expanded: BTreeSet<RecordId>,
}

impl ExpansionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flip membership of `id`. Toggling twice restores the original set.
    pub fn toggle(&mut self, id: RecordId) {
        if !self.expanded.remove(&id) {
            self.expanded.insert(id);
        }
    }

    /// Replace the set with exactly `expandable`. An empty input leaves the
    /// set empty (reported, not an error). A duplicate identity in the input
    /// means index-fallback identities collided with explicit ids; the set is
    /// reset instead of being left half-applied.
    pub fn expand_all(&mut self, expandable: &[RecordId]) {
        if let Err(err) = self.try_expand_all(expandable) {
            diagnostics::warn(format!("expansion state reset after error: {}", err));
            self.expanded.clear();
        }
    }

    fn try_expand_all(&mut self, expandable: &[RecordId]) -> Result<()> {
        if expandable.is_empty() {
            diagnostics::warn("expand-all requested but no record is expandable");
            self.expanded.clear();
            return Ok(());
        }

        let unique: BTreeSet<RecordId> = expandable.iter().copied().collect();
        if unique.len() != expandable.len() {
            bail!("duplicate record identity among expandable rows");
        }

        self.expanded = unique;
        Ok(())
    }

    pub fn collapse_all(&mut self) {
        self.expanded.clear();
    }

    pub fn is_expanded(&self, id: RecordId) -> bool {
        self.expanded.contains(&id)
    }

    /// True iff every expandable identity in the LIVE view is expanded and
    /// there is at least one. The caller passes the current filtered view's
    /// expandable identities each time; filtering changes which records count.
    pub fn is_all_expanded(&self, expandable: &[RecordId]) -> bool {
        !expandable.is_empty() && expandable.iter().all(|id| self.expanded.contains(id))
    }

    pub fn expanded_count(&self) -> usize {
        self.expanded.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::run::{Requirements, ResponseTimes};
    use pretty_assertions::assert_eq;

    fn record(pass: u64, fail: u64) -> RequestRecord {
        RequestRecord {
            id: None,
            name: "r".to_string(),
            status: None,
            severity: None,
            response_times: ResponseTimes::default(),
            total_count: pass + fail,
            pass_count: pass,
            fail_count: fail,
            error_percentage: 0.0,
            requirements: None,
        }
    }

    #[test]
    fn expandability_tracks_counts_and_requirements() {
        assert!(!is_expandable(&record(0, 0)));
        assert!(is_expandable(&record(1, 0)));
        assert!(is_expandable(&record(0, 1)));

        let mut with_requirements = record(0, 0);
        with_requirements.requirements = Some(Requirements {
            passed: 0,
            failed: 2,
            percentiles: vec![],
        });
        assert!(is_expandable(&with_requirements));

        let mut empty_requirements = record(0, 0);
        empty_requirements.requirements = Some(Requirements::default());
        assert!(!is_expandable(&empty_requirements));
    }

    #[test]
    fn detail_variant_admits_percentile_only_records() {
        let mut percentiles_only = record(0, 0);
        percentiles_only
            .response_times
            .percentiles
            .insert("50.0".to_string(), 10.0);
        assert!(!is_expandable(&percentiles_only));
        assert!(has_detail_content(&percentiles_only));
    }

    #[test]
    fn toggle_is_its_own_inverse() {
        let mut state = ExpansionState::new();
        state.toggle(3);
        assert!(state.is_expanded(3));
        state.toggle(3);
        assert!(!state.is_expanded(3));
        assert_eq!(state.expanded_count(), 0);
    }

    #[test]
    fn expand_all_sets_exactly_the_given_identities() {
        let mut state = ExpansionState::new();
        state.toggle(99);
        state.expand_all(&[1, 2, 3]);
        for id in [1, 2, 3] {
            assert!(state.is_expanded(id));
        }
        assert!(!state.is_expanded(99));
    }

    #[test]
    fn expand_all_with_nothing_expandable_leaves_the_set_empty() {
        let mut state = ExpansionState::new();
        state.toggle(7);
        state.expand_all(&[]);
        assert_eq!(state.expanded_count(), 0);
    }

    #[test]
    fn expand_then_collapse_always_yields_empty() {
        let mut state = ExpansionState::new();
        state.expand_all(&[1, 2]);
        state.collapse_all();
        assert_eq!(state.expanded_count(), 0);

        // Empty collection round-trip.
        state.expand_all(&[]);
        state.collapse_all();
        assert_eq!(state.expanded_count(), 0);
    }

    #[test]
    fn identity_collision_triggers_fail_safe_collapse() {
        let mut state = ExpansionState::new();
        state.toggle(5);
        state.expand_all(&[1, 2, 1]);
        assert_eq!(state.expanded_count(), 0);
    }

    #[test]
    fn all_expanded_requires_at_least_one_expandable() {
        let state = ExpansionState::new();
        assert!(!state.is_all_expanded(&[]));
    }

    #[test]
    fn all_expanded_recomputes_against_the_live_view() {
        let mut state = ExpansionState::new();
        state.expand_all(&[1, 2]);
        assert!(state.is_all_expanded(&[1, 2]));
        // The filter narrowed the view to one row: still all-expanded.
        assert!(state.is_all_expanded(&[2]));
        // The filter widened the view: no longer all-expanded.
        assert!(!state.is_all_expanded(&[1, 2, 3]));
    }
}
