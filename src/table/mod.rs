//! The requests-table engine: dynamic column discovery, filtering, sorting,
//! row expansion, and the composed derived view.
//!
//! Everything in here is synchronous and single-threaded: each operation is a
//! pure transformation over the in-memory record collection, triggered by a
//! discrete user action. Rendering is someone else's job.

pub mod columns;
pub mod expand;
pub mod filter;
pub mod sort;
pub mod view;

pub use columns::{ColumnSchema, NumericField, numeric_fields, resolve_columns};
pub use expand::{ExpansionState, has_detail_content, is_expandable};
pub use filter::{FilterCriteria, NumericOperator};
pub use sort::{SortColumn, SortDirection, SortSpec};
pub use view::{RequestsTable, Row, available_severities, available_statuses};
