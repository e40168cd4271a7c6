//! Orchestrating table controller.
//!
//! Subscribes to the query descriptor, the pagination cell, and every table
//! aspect, and serializes their emissions into the minimum number of
//! round-trips: the checksum gate swallows echoes of server-confirmed
//! reloads, the phase guard swallows emissions caused by initialization.

use std::sync::{Arc, Mutex, MutexGuard};

use futures::StreamExt;
use futures::channel::mpsc::UnboundedReceiver;
use shared::{Pagination, QueryDescriptor, WorkItemPage};
use tracing::{debug, info};

use crate::checksum::QueryChecksum;
use crate::dataflow::{State, Task, TaskHandle};
use crate::error::EngineError;
use crate::loading::LoadingIndicator;
use crate::notifications::{Notification, Notifications};
use crate::resources::WorkItemApi;
use crate::states::States;
use crate::table::aspect::{AspectValue, TableAspect};
use crate::table::{RowSelection, TablePagination};
use crate::work_items::WorkItemCache;

pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// Title shown for an unsaved (ad-hoc) query.
const DEFAULT_TITLE: &str = "Work items";

/// Lifecycle phase gating the observers.
///
/// Aspect emissions during `Idle` and `LoadingQuery` are initialization
/// echoes, not user intent, and must not trigger reloads.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ControllerPhase {
    Idle,
    LoadingQuery,
    Observing,
    ReloadingVisibly,
}

/// Route-level addressing of the table: which project scope, which
/// persisted query, and the opaque fingerprint string round-tripped
/// through the URL.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct RouteParams {
    pub project: Option<String>,
    pub query_id: Option<u64>,
    pub checksum_props: Option<String>,
}

pub struct TableController {
    states: Arc<States>,
    api: Arc<dyn WorkItemApi>,
    cache: WorkItemCache,
    checksum: Arc<QueryChecksum>,
    loading: LoadingIndicator,
    notifications: Notifications,
    pagination: TablePagination,
    phase: State<ControllerPhase>,
    route: Mutex<RouteParams>,
    tasks: Mutex<Vec<TaskHandle>>,
}

impl TableController {
    pub fn new(states: Arc<States>, api: Arc<dyn WorkItemApi>) -> Arc<Self> {
        let notifications = Notifications::new();
        let cache = WorkItemCache::new(states.clone(), api.clone(), notifications.clone());
        let pagination = TablePagination::new(states.table.pagination.clone());
        let phase = State::new();
        phase.put(ControllerPhase::Idle);

        Arc::new(Self {
            states,
            api,
            cache,
            checksum: Arc::new(QueryChecksum::new()),
            loading: LoadingIndicator::new(),
            notifications,
            pagination,
            phase,
            route: Mutex::new(RouteParams::default()),
            tasks: Mutex::new(Vec::new()),
        })
    }

    pub fn states(&self) -> &Arc<States> {
        &self.states
    }

    pub fn cache(&self) -> &WorkItemCache {
        &self.cache
    }

    pub fn checksum(&self) -> &Arc<QueryChecksum> {
        &self.checksum
    }

    pub fn loading(&self) -> &LoadingIndicator {
        &self.loading
    }

    pub fn notifications(&self) -> &Notifications {
        &self.notifications
    }

    pub fn pagination(&self) -> &TablePagination {
        &self.pagination
    }

    pub fn phase(&self) -> Option<ControllerPhase> {
        self.phase.get()
    }

    pub fn current_route(&self) -> RouteParams {
        self.lock_route().clone()
    }

    /// Query id and opaque fingerprint string for the host to write back
    /// into the URL. Only equality of the string ever matters.
    pub fn current_route_props(&self) -> (Option<u64>, Option<String>) {
        match self.checksum.current() {
            Some(record) => (record.query_id, Some(record.props)),
            None => (None, None),
        }
    }

    /// Enter the table: remember the route, wire up all observers, and run
    /// the initial query load.
    pub async fn start(self: &Arc<Self>, route: RouteParams) {
        *self.lock_route() = route;
        self.register_observers();
        self.load_query().await;
    }

    /// React to a navigation event. Reloads only when the route addresses a
    /// different query or carries a fingerprint the gate does not recognize;
    /// navigation echoing our own state is a no-op.
    pub async fn handle_route_change(self: &Arc<Self>, route: RouteParams) {
        let query_id = route.query_id;
        let props = route.checksum_props.clone();
        *self.lock_route() = route;

        let controller = self.clone();
        let reloaded = self
            .checksum
            .execute_if_outdated(query_id, props.as_deref(), move || async move {
                controller.load_query().await;
            })
            .await;
        if !reloaded {
            debug!(?query_id, "route matches the recorded fingerprint");
        }
    }

    /// Fetch the routed query and its first page, then seed every cell.
    async fn load_query(self: &Arc<Self>) {
        self.phase.put(ControllerPhase::LoadingQuery);
        self.checksum.clear();

        let route = self.current_route();
        let api = self.api.clone();
        let result = self
            .loading
            .track(async move {
                let query = api
                    .fetch_query(route.project.as_deref(), route.query_id)
                    .await?;
                let page = api
                    .fetch_results(&query, &Pagination::first_page(DEFAULT_PAGE_SIZE))
                    .await?;
                Ok::<_, EngineError>((query, page))
            })
            .await;

        match result {
            Ok((query, page)) => {
                info!(query_id = ?query.id, "query loaded");
                self.apply_loaded_query(query, page);
                self.phase.put(ControllerPhase::Observing);
            }
            Err(error) => {
                self.notifications
                    .push(Notification::fetch_failed("query", &error));
                self.phase.put(ControllerPhase::Idle);
            }
        }
    }

    fn apply_loaded_query(&self, query: QueryDescriptor, page: WorkItemPage) {
        self.states.table.query.put(query.clone());

        self.states.table.filters.initialize(&query);
        self.states.table.sort_by.initialize(&query);
        self.states.table.group_by.initialize(&query);
        self.states.table.sums.initialize(&query);
        self.states.table.timeline_visible.initialize(&query);
        self.states.table.columns.initialize(&query);

        // Selection survives reloads of the same table; only a first load
        // seeds it.
        if self.states.table.selection.is_pristine() {
            self.states.table.selection.put(RowSelection::default());
        }

        self.update_title(&query);
        self.publish_results(&query, page);
        self.states.table.info_loaded.put(true);
    }

    /// Push one fetched page into the cells. The fingerprint is recorded
    /// *before* the pagination cell publishes so the pagination observer
    /// sees the server-confirmed state as already up to date.
    fn publish_results(&self, query: &QueryDescriptor, page: WorkItemPage) {
        let WorkItemPage { work_items, meta } = page;

        let rows: Vec<String> = work_items.iter().map(|item| item.cache_id()).collect();
        self.states.table.rows.put(rows);
        self.cache.update_list(work_items);

        let confirmed = Pagination {
            page: meta.page,
            page_size: meta.page_size,
            total: Some(meta.total),
        };
        self.checksum.update_if_different(query, &confirmed);
        self.pagination.update_from_meta(&meta);
        self.states.table.meta.put(meta);
    }

    /// Silent refresh of the current page. No indicator, no phase change.
    async fn update_results(&self) {
        let Some(query) = self.states.table.query.get() else {
            return;
        };
        let pagination = self
            .states
            .table
            .pagination
            .get()
            .unwrap_or_else(|| Pagination::first_page(DEFAULT_PAGE_SIZE));

        match self.api.fetch_results(&query, &pagination).await {
            Ok(page) => self.publish_results(&query, page),
            Err(error) => self
                .notifications
                .push(Notification::fetch_failed("result set", &error)),
        }
    }

    /// User-visible refresh, optionally restarting at the first page.
    async fn update_results_visibly(&self, first_page: bool) {
        if first_page {
            self.pagination.set_page(1);
        }
        let Some(query) = self.states.table.query.get() else {
            return;
        };
        let pagination = self
            .states
            .table
            .pagination
            .get()
            .unwrap_or_else(|| Pagination::first_page(DEFAULT_PAGE_SIZE));

        let result = self
            .loading
            .track(self.api.fetch_results(&query, &pagination))
            .await;
        match result {
            Ok(page) => self.publish_results(&query, page),
            Err(error) => self
                .notifications
                .push(Notification::fetch_failed("result set", &error)),
        }
    }

    async fn reload_visibly(&self, first_page: bool) {
        self.phase.put(ControllerPhase::ReloadingVisibly);
        self.update_results_visibly(first_page).await;
        self.phase.put(ControllerPhase::Observing);
    }

    fn update_title(&self, query: &QueryDescriptor) {
        let title = if query.id.is_some() && !query.name.is_empty() {
            query.name.clone()
        } else {
            DEFAULT_TITLE.to_string()
        };
        self.states.table.title.put(title);
    }

    fn register_observers(self: &Arc<Self>) {
        let mut tasks = self.lock_tasks();
        if !tasks.is_empty() {
            return;
        }

        tasks.push(self.observe_query());
        tasks.push(self.observe_pagination());

        tasks.push(self.observe_aspect(self.states.table.filters.clone()));
        tasks.push(self.observe_aspect(self.states.table.sort_by.clone()));
        tasks.push(self.observe_aspect(self.states.table.group_by.clone()));
        tasks.push(self.observe_aspect(self.states.table.sums.clone()));
        tasks.push(self.observe_aspect(self.states.table.timeline_visible.clone()));
        tasks.push(self.observe_aspect(self.states.table.columns.clone()));

        if let Some((required, background)) = self.states.take_refresh_streams() {
            tasks.push(self.observe_refresh(required, true));
            tasks.push(self.observe_refresh(background, false));
        }
    }

    /// Every query emission re-records the fingerprint against the latest
    /// known pagination and keeps the title in sync.
    fn observe_query(self: &Arc<Self>) -> TaskHandle {
        let weak = Arc::downgrade(self);
        let mut stream = self.states.table.query.stream();
        Task::start_droppable(async move {
            while let Some(emission) = stream.next().await {
                let Some(query) = emission else { continue };
                let Some(controller) = weak.upgrade() else { break };

                if let Some(pagination) = controller.states.table.pagination.get()
                    && controller.checksum.update_if_different(&query, &pagination)
                {
                    debug!(query_id = ?query.id, "query fingerprint recorded");
                }
                controller.update_title(&query);
            }
        })
    }

    /// Pagination emissions trigger a silent refetch unless the fingerprint
    /// already covers them (server-confirmed pages were recorded before
    /// their cells published).
    fn observe_pagination(self: &Arc<Self>) -> TaskHandle {
        let weak = Arc::downgrade(self);
        let mut stream = self.states.table.pagination.stream();
        Task::start_droppable(async move {
            while let Some(emission) = stream.next().await {
                let Some(pagination) = emission else { continue };
                let Some(controller) = weak.upgrade() else { break };

                if controller.phase.get() != Some(ControllerPhase::Observing) {
                    continue;
                }
                let Some(query) = controller.states.table.query.get() else {
                    continue;
                };
                if !controller.checksum.is_outdated(&query, &pagination) {
                    continue;
                }

                debug!(page = pagination.page, "pagination diverged, refetching");
                controller.checksum.update(&query, &pagination);
                controller.update_results().await;
            }
        })
    }

    fn observe_aspect<V>(self: &Arc<Self>, aspect: TableAspect<V>) -> TaskHandle
    where
        V: AspectValue,
    {
        let weak = Arc::downgrade(self);
        let mut stream = aspect.state().stream();
        Task::start_droppable(async move {
            while let Some(emission) = stream.next().await {
                let Some(value) = emission else { continue };
                let Some(controller) = weak.upgrade() else { break };
                controller.apply_aspect_change(value).await;
            }
        })
    }

    /// Fold one aspect emission back into the authoritative query. Stands
    /// down while loading (initialization echoes) and while any dependent
    /// cell is still pristine (half-initialized table).
    async fn apply_aspect_change<V>(&self, value: V)
    where
        V: AspectValue,
    {
        if matches!(
            self.phase.get(),
            None | Some(ControllerPhase::Idle) | Some(ControllerPhase::LoadingQuery)
        ) {
            return;
        }
        if self.states.table.any_dependent_state_clear() {
            return;
        }
        let Some(mut query) = self.states.table.query.get() else {
            return;
        };
        if !value.is_changed(&query) {
            return;
        }

        debug!(aspect = V::NAME, "aspect diverged from the query");
        value.apply_to(&mut query);
        self.states.table.query.put(query);

        if V::TRIGGERS_RELOAD {
            self.reload_visibly(true).await;
        }
    }

    fn observe_refresh(
        self: &Arc<Self>,
        mut stream: UnboundedReceiver<()>,
        visible: bool,
    ) -> TaskHandle {
        let weak = Arc::downgrade(self);
        Task::start_droppable(async move {
            while stream.next().await.is_some() {
                let Some(controller) = weak.upgrade() else { break };
                if visible {
                    controller.reload_visibly(false).await;
                } else {
                    controller.update_results().await;
                }
            }
        })
    }

    fn lock_route(&self) -> MutexGuard<'_, RouteParams> {
        self.route.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn lock_tasks(&self) -> MutexGuard<'_, Vec<TaskHandle>> {
        self.tasks.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
