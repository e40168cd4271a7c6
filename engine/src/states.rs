//! Process-wide state context.
//!
//! Every reactive cell lives in one shared [`States`] context handed to the
//! services that read and write it. Collaborators never hold private copies
//! of table state; they hold the context and address cells by name.

use std::sync::{Arc, Mutex, MutexGuard};

use futures::channel::mpsc::UnboundedReceiver;
use shared::{CollectionMeta, EditForm, Pagination, QueryDescriptor, Schema, WorkItem};

use crate::dataflow::{MultiState, Relay, State, relay, shared_relay};
use crate::table::aspects::{
    ColumnSet, DisplaySums, FilterSet, GroupByAspect, SortOrder, TimelineVisibility,
};
use crate::table::{RowSelection, TableAspect};

/// All cells backing one table view.
#[derive(Clone)]
pub struct TableStates {
    /// Authoritative query descriptor the aspects diff against.
    pub query: State<QueryDescriptor>,
    /// Ordered projection of work item ids for the current page.
    pub rows: State<Vec<String>>,
    /// Collection metadata of the last fetched page.
    pub meta: State<CollectionMeta>,

    pub filters: TableAspect<FilterSet>,
    pub sort_by: TableAspect<SortOrder>,
    pub group_by: TableAspect<GroupByAspect>,
    pub sums: TableAspect<DisplaySums>,
    pub timeline_visible: TableAspect<TimelineVisibility>,
    pub columns: TableAspect<ColumnSet>,

    pub pagination: State<Pagination>,
    pub selection: State<RowSelection>,

    /// Set once the table knows enough to render (query plus first page).
    pub info_loaded: State<bool>,
    pub title: State<String>,
}

impl TableStates {
    fn new() -> Self {
        Self {
            query: State::new(),
            rows: State::new(),
            meta: State::new(),
            filters: TableAspect::new(),
            sort_by: TableAspect::new(),
            group_by: TableAspect::new(),
            sums: TableAspect::new(),
            timeline_visible: TableAspect::new(),
            columns: TableAspect::new(),
            pagination: State::new(),
            selection: State::new(),
            info_loaded: State::new(),
            title: State::new(),
        }
    }

    /// True while any cell an aspect observer depends on is still pristine.
    /// Observers stand down until the initial load has seeded all of them,
    /// otherwise a half-initialized table would trigger phantom reloads.
    pub fn any_dependent_state_clear(&self) -> bool {
        self.pagination.is_pristine()
            || self.filters.is_pristine()
            || self.columns.is_pristine()
            || self.sort_by.is_pristine()
            || self.group_by.is_pristine()
            || self.timeline_visible.is_pristine()
            || self.sums.is_pristine()
    }
}

/// The shared context: entity caches, table cells, and cross-service relays.
pub struct States {
    /// Multi-value work item cache, keyed by cache id.
    pub work_items: MultiState<WorkItem>,
    /// Loaded attribute schemas, keyed by schema href.
    pub schemas: MultiState<Schema>,
    /// Per-item edit forms, keyed by cache id.
    pub editing: MultiState<EditForm>,

    pub table: TableStates,

    /// Id of the work item currently holding focus, if any.
    pub focused_work_item: State<String>,

    /// A collaborator demands a user-visible reload of the result set.
    pub refresh_required_relay: Relay<()>,
    /// A collaborator requests a silent background refresh.
    pub refresh_in_background_relay: Relay<()>,
    /// A new work item finished creation and entered the cache.
    pub work_item_created_relay: Relay<WorkItem>,

    refresh_required_rx: Mutex<Option<UnboundedReceiver<()>>>,
    refresh_in_background_rx: Mutex<Option<UnboundedReceiver<()>>>,
    work_item_created_rx: Mutex<Option<UnboundedReceiver<WorkItem>>>,
}

impl States {
    pub fn new() -> Arc<Self> {
        // The refresh relays are raisable by any collaborator; the created
        // relay has exactly one emitter (the cache).
        let (refresh_required_relay, refresh_required_rx) = shared_relay();
        let (refresh_in_background_relay, refresh_in_background_rx) = shared_relay();
        let (work_item_created_relay, work_item_created_rx) = relay();

        Arc::new(Self {
            work_items: MultiState::new(),
            schemas: MultiState::new(),
            editing: MultiState::new(),
            table: TableStates::new(),
            focused_work_item: State::new(),
            refresh_required_relay,
            refresh_in_background_relay,
            work_item_created_relay,
            refresh_required_rx: Mutex::new(Some(refresh_required_rx)),
            refresh_in_background_rx: Mutex::new(Some(refresh_in_background_rx)),
            work_item_created_rx: Mutex::new(Some(work_item_created_rx)),
        })
    }

    /// Hand the refresh event streams to the one observer that owns them.
    /// Returns `None` on every call after the first.
    pub fn take_refresh_streams(
        &self,
    ) -> Option<(UnboundedReceiver<()>, UnboundedReceiver<()>)> {
        let required = lock(&self.refresh_required_rx).take()?;
        let background = lock(&self.refresh_in_background_rx).take()?;
        Some((required, background))
    }

    /// Hand over the created-item event stream. `None` after the first call.
    pub fn take_work_item_created_stream(&self) -> Option<UnboundedReceiver<WorkItem>> {
        lock(&self.work_item_created_rx).take()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    #[tokio::test]
    async fn fresh_context_has_every_cell_pristine() {
        let states = States::new();

        assert!(states.table.query.is_pristine());
        assert!(states.table.any_dependent_state_clear());
        assert!(states.focused_work_item.is_pristine());
        assert_eq!(states.work_items.len(), 0);
    }

    #[tokio::test]
    async fn dependent_state_guard_lifts_only_when_all_cells_are_seeded() {
        let states = States::new();
        let query = QueryDescriptor::default();

        states.table.pagination.put(Pagination::first_page(20));
        states.table.filters.initialize(&query);
        states.table.columns.initialize(&query);
        states.table.sort_by.initialize(&query);
        states.table.group_by.initialize(&query);
        states.table.timeline_visible.initialize(&query);
        assert!(states.table.any_dependent_state_clear());

        states.table.sums.initialize(&query);
        assert!(!states.table.any_dependent_state_clear());
    }

    #[tokio::test]
    async fn refresh_streams_can_only_be_taken_once() {
        let states = States::new();

        let (_required, mut background) = states
            .take_refresh_streams()
            .unwrap();
        assert!(states.take_refresh_streams().is_none());

        states.refresh_in_background_relay.send(());
        assert_eq!(background.next().await, Some(()));
    }
}
