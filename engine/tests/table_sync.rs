//! End-to-end synchronization scenarios against a recording in-memory API.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use engine::controller::{ControllerPhase, RouteParams, TableController};
use engine::error::EngineError;
use engine::resources::{ApiResult, WorkItemApi};
use engine::states::States;
use shared::{
    CollectionMeta, Filter, Pagination, QueryDescriptor, Schema, WorkItem, WorkItemPage,
};

fn schema() -> Schema {
    Schema {
        href: "/schemas/1".to_string(),
        attributes: Default::default(),
    }
}

fn server_item(id: u32) -> WorkItem {
    WorkItem {
        id: id.to_string(),
        subject: format!("Item {id}"),
        fields: Default::default(),
        dirty: false,
        schema_href: "/schemas/1".to_string(),
        schema: Some(schema()),
    }
}

fn status_filter(value: &str) -> Filter {
    Filter {
        name: "status".to_string(),
        operator: "=".to_string(),
        values: vec![value.to_string()],
    }
}

/// Serves three fixed work items and records every result-set request.
#[derive(Default)]
struct RecordingApi {
    query_fetches: AtomicUsize,
    result_requests: Mutex<Vec<(QueryDescriptor, Pagination)>>,
}

impl RecordingApi {
    fn results_fetched(&self) -> usize {
        self.result_requests.lock().unwrap().len()
    }

    fn last_request(&self) -> (QueryDescriptor, Pagination) {
        self.result_requests
            .lock()
            .unwrap()
            .last()
            .cloned()
            .expect("no result request was recorded")
    }
}

#[async_trait]
impl WorkItemApi for RecordingApi {
    async fn fetch_query(
        &self,
        _project: Option<&str>,
        id: Option<u64>,
    ) -> ApiResult<QueryDescriptor> {
        self.query_fetches.fetch_add(1, Ordering::SeqCst);
        Ok(QueryDescriptor {
            id,
            name: "Open items".to_string(),
            columns: vec!["id".to_string(), "subject".to_string()],
            ..QueryDescriptor::default()
        })
    }

    async fn fetch_results(
        &self,
        query: &QueryDescriptor,
        pagination: &Pagination,
    ) -> ApiResult<WorkItemPage> {
        self.result_requests
            .lock()
            .unwrap()
            .push((query.clone(), pagination.clone()));
        Ok(WorkItemPage {
            work_items: (1..=3).map(server_item).collect(),
            meta: CollectionMeta {
                total: 3,
                page: pagination.page,
                page_size: pagination.page_size,
                group_counts: Default::default(),
            },
        })
    }

    async fn fetch_work_item(&self, id: &str, _force_refresh: bool) -> ApiResult<WorkItem> {
        Ok(server_item(id.parse().map_err(|_| {
            EngineError::fetch("work item", "unknown id")
        })?))
    }

    async fn save_work_item(&self, item: &WorkItem) -> ApiResult<WorkItem> {
        let mut saved = item.clone();
        saved.dirty = false;
        Ok(saved)
    }

    async fn load_schema(&self, _href: &str) -> ApiResult<Schema> {
        Ok(schema())
    }
}

async fn started_controller() -> (Arc<TableController>, Arc<RecordingApi>, Arc<States>) {
    let api = Arc::new(RecordingApi::default());
    let states = States::new();
    let controller = TableController::new(states.clone(), api.clone());
    controller
        .start(RouteParams {
            query_id: Some(42),
            ..RouteParams::default()
        })
        .await;
    (controller, api, states)
}

async fn settle() {
    tokio::time::sleep(Duration::from_millis(50)).await;
}

#[tokio::test]
async fn initial_load_publishes_rows_and_records_the_fingerprint() {
    let (controller, api, states) = started_controller().await;

    assert_eq!(api.query_fetches.load(Ordering::SeqCst), 1);
    assert_eq!(api.results_fetched(), 1);
    assert_eq!(
        states.table.rows.get(),
        Some(vec!["1".to_string(), "2".to_string(), "3".to_string()])
    );
    assert_eq!(states.work_items.len(), 3);
    assert_eq!(controller.phase(), Some(ControllerPhase::Observing));
    assert!(controller.checksum().current().is_some());

    settle().await;
    // The observers saw only server-confirmed state and stayed quiet.
    assert_eq!(api.results_fetched(), 1);
}

#[tokio::test]
async fn a_filter_change_reloads_exactly_once_at_the_first_page() {
    let (controller, api, states) = started_controller().await;

    controller.pagination().set_page(3);
    settle().await;
    assert_eq!(api.results_fetched(), 2);

    states.table.filters.replace(vec![status_filter("open")]);
    settle().await;

    assert_eq!(api.results_fetched(), 3);
    let (query, pagination) = api.last_request();
    assert_eq!(query.filters, vec![status_filter("open")]);
    assert_eq!(pagination.page, 1);

    // The reload's own emissions must not echo into a fourth fetch.
    settle().await;
    assert_eq!(api.results_fetched(), 3);
    assert_eq!(controller.phase(), Some(ControllerPhase::Observing));
}

#[tokio::test]
async fn page_changes_refetch_silently_without_a_loading_indicator() {
    let (controller, api, _states) = started_controller().await;

    controller.pagination().set_page(2);
    settle().await;

    assert_eq!(api.results_fetched(), 2);
    let (_, pagination) = api.last_request();
    assert_eq!(pagination.page, 2);
    assert_eq!(controller.phase(), Some(ControllerPhase::Observing));
    assert!(!controller.loading().is_loading());
}

#[tokio::test]
async fn render_only_aspects_update_the_query_without_refetching() {
    let (_controller, api, states) = started_controller().await;

    states.table.timeline_visible.toggle();
    settle().await;

    assert_eq!(api.results_fetched(), 1);
    assert!(states.table.query.get().unwrap().timeline_visible);
}

#[tokio::test]
async fn aspect_values_set_before_start_never_reach_the_network() {
    let api = Arc::new(RecordingApi::default());
    let states = States::new();
    let controller = TableController::new(states.clone(), api.clone());

    states.table.filters.replace(vec![status_filter("closed")]);

    controller.start(RouteParams::default()).await;
    settle().await;

    // The load overrode the premature value with the authoritative one.
    assert_eq!(api.results_fetched(), 1);
    assert!(states.table.filters.current().unwrap().filters.is_empty());
}

#[tokio::test]
async fn saving_a_dirty_item_wins_over_stale_data_and_refreshes_in_the_background() {
    let (controller, api, states) = started_controller().await;
    let cache = controller.cache();

    let mut edited = cache.state("1").get().unwrap();
    edited.subject = "Edited locally".to_string();
    edited.dirty = true;
    cache.state("1").put(edited.clone());

    // A concurrent page merge must not clobber the unsaved edit.
    cache.update_list(vec![server_item(1)]);
    assert_eq!(cache.state("1").get().unwrap().subject, "Edited locally");

    let saved = cache.save_if_changed(&edited).await.unwrap();
    assert!(!saved.dirty);
    settle().await;

    // The background refresh ran once and republished server state.
    assert_eq!(api.results_fetched(), 2);
    let current = cache.state("1").get().unwrap();
    assert!(!current.dirty);
    assert_eq!(current.subject, "Item 1");
    assert!(
        controller
            .notifications()
            .current()
            .iter()
            .any(|toast| toast.id == "save_success_1")
    );
    assert_eq!(states.table.rows.get().map(|rows| rows.len()), Some(3));
}

#[tokio::test]
async fn a_demanded_refresh_reloads_visibly_at_the_current_page() {
    let (controller, api, states) = started_controller().await;

    controller.pagination().set_page(2);
    settle().await;
    assert_eq!(api.results_fetched(), 2);

    states.refresh_required_relay.send(());
    settle().await;

    assert_eq!(api.results_fetched(), 3);
    let (_, pagination) = api.last_request();
    assert_eq!(pagination.page, 2);
    assert_eq!(controller.phase(), Some(ControllerPhase::Observing));
}

#[tokio::test]
async fn route_changes_reload_only_on_a_foreign_fingerprint() {
    let (controller, api, _states) = started_controller().await;

    let echo = RouteParams {
        query_id: Some(42),
        checksum_props: controller.checksum().current_props(),
        ..RouteParams::default()
    };
    controller.handle_route_change(echo).await;
    assert_eq!(api.query_fetches.load(Ordering::SeqCst), 1);

    controller
        .handle_route_change(RouteParams {
            query_id: Some(7),
            ..RouteParams::default()
        })
        .await;
    settle().await;
    assert_eq!(api.query_fetches.load(Ordering::SeqCst), 2);
    assert_eq!(controller.phase(), Some(ControllerPhase::Observing));
}
