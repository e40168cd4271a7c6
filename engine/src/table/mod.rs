//! Table aspect states and the row selection engine.
//!
//! Each independently-mutable facet of the table configuration (filters,
//! sort, group-by, sums, timeline visibility, columns, pagination,
//! selection) lives in its own reactive cell with "current value" and
//! "has this aspect materially changed" semantics.

pub mod aspect;
pub mod aspects;
pub mod pagination;
pub mod selection;

pub use aspect::{AspectValue, TableAspect};
pub use aspects::{
    ColumnSet, DisplaySums, FilterSet, GroupByAspect, SortOrder, TimelineVisibility,
};
pub use pagination::TablePagination;
pub use selection::{RowSelection, TableRow, TableSelection};
