//! Row selection engine.
//!
//! Maintains the set of selected row identifiers plus an anchor index for
//! contiguous (shift-click style) range selection over the ordered row
//! projection.

use std::sync::Arc;

use indexmap::IndexMap;
use shared::WorkItem;

use crate::dataflow::State;
use crate::states::States;

/// Table row selection state. Absent keys are implicitly unselected.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct RowSelection {
    pub selected: IndexMap<String, bool>,
    /// Anchor from which a contiguous range selection is measured.
    pub active_row_index: Option<usize>,
}

impl RowSelection {
    /// Number of rows actually selected; `false` entries do not count.
    pub fn count(&self) -> usize {
        self.selected.values().filter(|selected| **selected).count()
    }

    pub fn is_selected(&self, work_item_id: &str) -> bool {
        self.selected.get(work_item_id).copied().unwrap_or(false)
    }

    pub fn selected_ids(&self) -> Vec<String> {
        self.selected
            .iter()
            .filter(|(_, selected)| **selected)
            .map(|(id, _)| id.clone())
            .collect()
    }
}

/// One row of the current ordered projection.
#[derive(Clone, Debug, PartialEq)]
pub struct TableRow {
    pub work_item_id: String,
    pub position: usize,
}

#[derive(Clone)]
pub struct TableSelection {
    states: Arc<States>,
}

impl TableSelection {
    pub fn new(states: Arc<States>) -> Self {
        if states.table.selection.is_pristine() {
            states.table.selection.put(RowSelection::default());
        }
        Self { states }
    }

    fn state(&self) -> &State<RowSelection> {
        &self.states.table.selection
    }

    fn current(&self) -> RowSelection {
        self.state().get().unwrap_or_default()
    }

    pub fn is_selected(&self, work_item_id: &str) -> bool {
        self.current().is_selected(work_item_id)
    }

    pub fn selection_count(&self) -> usize {
        self.current().count()
    }

    pub fn selected_ids(&self) -> Vec<String> {
        self.current().selected_ids()
    }

    /// Resolve the selected ids through the entity cache.
    pub fn selected_work_items(&self) -> Vec<WorkItem> {
        self.selected_ids()
            .iter()
            .filter_map(|id| self.states.work_items.state(id).get())
            .collect()
    }

    /// Select every given row, leaving the anchor unset. Idempotent.
    pub fn select_all(&self, rows: &[String]) {
        let mut selection = RowSelection::default();
        for work_item_id in rows {
            selection.selected.insert(work_item_id.clone(), true);
        }
        self.state().put(selection);
    }

    /// Reset to an empty selection.
    pub fn reset(&self) {
        self.state().put(RowSelection::default());
    }

    /// Flip a single row, preserving all others and the anchor.
    pub fn toggle_row(&self, work_item_id: &str) {
        let selected = self.is_selected(work_item_id);
        self.set_row_state(work_item_id, !selected);
    }

    /// Force one row's flag. Does not modify other rows.
    pub fn set_row_state(&self, work_item_id: &str, selected: bool) {
        let mut selection = self.current();
        selection.selected.insert(work_item_id.to_string(), selected);
        self.state().put(selection);
    }

    /// Override the selection with the given row (plain click) and anchor
    /// the range selection at its position.
    pub fn set_selection(&self, row: &TableRow) {
        let mut selection = RowSelection {
            selected: IndexMap::new(),
            active_row_index: Some(row.position),
        };
        selection.selected.insert(row.work_item_id.clone(), true);
        self.state().put(selection);
    }

    /// Contiguous range selection from the anchor to `target` (shift-click
    /// expansion). Recomputed from the full row order on every call since
    /// the anchor may be above or below the new target.
    pub fn set_multi_selection_from(&self, rows: &[String], target: &TableRow) {
        let mut selection = self.current();

        if selection.count() == 0 {
            selection
                .selected
                .insert(target.work_item_id.clone(), true);
            selection.active_row_index = Some(target.position);
        } else if let Some(anchor) = selection.active_row_index {
            let start = target.position.min(anchor);
            let end = target.position.max(anchor);

            for (position, work_item_id) in rows.iter().enumerate() {
                selection
                    .selected
                    .insert(work_item_id.clone(), position >= start && position <= end);
            }
        }

        self.state().put(selection);
    }

    /// Switch the focused work item to the given id, setting both the
    /// selection and the process-wide focus on it.
    pub fn focus_on(&self, work_item_id: &str) {
        let mut selection = RowSelection::default();
        selection.selected.insert(work_item_id.to_string(), true);
        self.state().put(selection);
        self.states.focused_work_item.put(work_item_id.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows() -> Vec<String> {
        (0..10).map(|n| format!("r{n}")).collect()
    }

    fn row(position: usize) -> TableRow {
        TableRow {
            work_item_id: format!("r{position}"),
            position,
        }
    }

    fn selection() -> TableSelection {
        TableSelection::new(States::new())
    }

    #[tokio::test]
    async fn construction_resets_a_pristine_cell() {
        let states = States::new();
        assert!(states.table.selection.is_pristine());

        let _selection = TableSelection::new(states.clone());
        assert_eq!(states.table.selection.get(), Some(RowSelection::default()));
    }

    #[tokio::test]
    async fn range_selection_walks_the_anchor() {
        let selection = selection();
        let rows = rows();

        selection.set_selection(&row(3));
        selection.set_multi_selection_from(&rows, &row(6));
        assert_eq!(selection.selected_ids(), vec!["r3", "r4", "r5", "r6"]);

        // Anchor stays at r3; a target above it selects upwards.
        selection.set_multi_selection_from(&rows, &row(1));
        assert_eq!(selection.selection_count(), 3);
        for id in ["r1", "r2", "r3"] {
            assert!(selection.is_selected(id));
        }
        for id in ["r0", "r4", "r5", "r6"] {
            assert!(!selection.is_selected(id));
        }
    }

    #[tokio::test]
    async fn range_selection_without_prior_selection_establishes_the_anchor() {
        let selection = selection();
        selection.set_multi_selection_from(&rows(), &row(4));

        assert_eq!(selection.selected_ids(), vec!["r4"]);
        assert_eq!(
            selection.current().active_row_index,
            Some(4)
        );
    }

    #[tokio::test]
    async fn toggle_preserves_other_rows_and_the_anchor() {
        let selection = selection();
        selection.set_selection(&row(2));
        selection.toggle_row("r5");

        assert!(selection.is_selected("r2"));
        assert!(selection.is_selected("r5"));
        assert_eq!(selection.current().active_row_index, Some(2));

        selection.toggle_row("r5");
        assert!(!selection.is_selected("r5"));
        // A false entry is not a selected row.
        assert_eq!(selection.selection_count(), 1);
    }

    #[tokio::test]
    async fn select_all_marks_every_row_and_drops_the_anchor() {
        let selection = selection();
        selection.set_selection(&row(1));

        selection.select_all(&rows());
        assert_eq!(selection.selection_count(), 10);
        assert_eq!(selection.current().active_row_index, None);

        // Terminal and idempotent.
        selection.select_all(&rows());
        assert_eq!(selection.selection_count(), 10);
    }

    #[tokio::test]
    async fn focus_publishes_the_process_wide_focused_id() {
        let states = States::new();
        let selection = TableSelection::new(states.clone());

        selection.focus_on("r7");
        assert_eq!(selection.selected_ids(), vec!["r7"]);
        assert_eq!(states.focused_work_item.get(), Some("r7".to_string()));
    }

    #[tokio::test]
    async fn selected_work_items_resolve_through_the_cache() {
        let states = States::new();
        let selection = TableSelection::new(states.clone());

        states.work_items.state("r1").put(shared::WorkItem {
            id: "r1".to_string(),
            subject: "First".to_string(),
            fields: Default::default(),
            dirty: false,
            schema_href: "/schemas/1".to_string(),
            schema: None,
        });

        selection.set_row_state("r1", true);
        selection.set_row_state("r2", true);

        let resolved = selection.selected_work_items();
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].subject, "First");
    }
}
