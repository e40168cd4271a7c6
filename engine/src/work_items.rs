//! Work item entity cache.
//!
//! Sits between the resource layer and the reactive cells in
//! [`States::work_items`](crate::states::States): deduplicates loads,
//! attaches lazily loaded schemas, and enforces the dirty-beats-fresh rule
//! so locally edited items are never clobbered by refetched pages.

use std::sync::Arc;

use shared::{EditForm, NEW_WORK_ITEM_ID, Schema, WorkItem, work_item_cache_id};
use tracing::debug;

use crate::dataflow::{State, Task};
use crate::error::EngineError;
use crate::notifications::{Notification, Notifications};
use crate::resources::{ApiResult, WorkItemApi};
use crate::states::States;

#[derive(Clone)]
pub struct WorkItemCache {
    states: Arc<States>,
    api: Arc<dyn WorkItemApi>,
    notifications: Notifications,
}

impl WorkItemCache {
    pub fn new(states: Arc<States>, api: Arc<dyn WorkItemApi>, notifications: Notifications) -> Self {
        Self {
            states,
            api,
            notifications,
        }
    }

    /// The reactive cell for one work item, pristine until first load.
    pub fn state(&self, id: &str) -> State<WorkItem> {
        self.states.work_items.state(&work_item_cache_id(id))
    }

    /// Merge one freshly fetched item into the cache. Items carrying
    /// unsaved local edits win over fresh server data, but the merge still
    /// publishes the winning value: subscribers get one notification per
    /// merge regardless of which side won.
    pub fn update(&self, item: WorkItem) {
        let cell = self.state(&item.id);
        if let Some(cached) = cell.get().filter(|cached| cached.dirty) {
            debug!(id = %item.cache_id(), "dirty item wins over fresh value");
            self.publish(cached);
            return;
        }
        self.publish(item);
    }

    /// Merge a fetched page into the cache, item by item.
    pub fn update_list(&self, items: Vec<WorkItem>) {
        for item in items {
            self.update(item);
        }
    }

    /// Load one item through the cache. Concurrent callers for the same id
    /// rendezvous on a single fetch; `force_refresh` discards the cached
    /// value first. The unsaved-item sentinel never touches the network.
    pub async fn load(&self, id: &str, force_refresh: bool) -> ApiResult<WorkItem> {
        let cache_id = work_item_cache_id(id);
        let cell = self.states.work_items.state(&cache_id);

        if cache_id == NEW_WORK_ITEM_ID {
            return cell
                .get()
                .ok_or_else(|| EngineError::fetch("work item", "no unsaved work item exists"));
        }

        if force_refresh {
            cell.clear();
        }

        let api = self.api.clone();
        let schemas = self.states.schemas.clone();
        let id = cache_id.clone();
        let result = cell
            .populate_if_pristine(move || async move {
                let mut item = api.fetch_work_item(&id, force_refresh).await?;
                item.schema = Some(load_schema(&api, &schemas, &item.schema_href).await?);
                Ok(item)
            })
            .await;

        if let Err(error) = &result {
            self.notifications
                .push(Notification::fetch_failed("work item", error));
        }
        result
    }

    /// Subscription-style access: return the cell immediately and kick off
    /// a load in the background if one is needed. Load failures surface
    /// through notifications, not through the returned cell.
    pub fn require(&self, id: &str, force_refresh: bool) -> State<WorkItem> {
        let cell = self.state(id);
        if work_item_cache_id(id) == NEW_WORK_ITEM_ID {
            return cell;
        }

        let this = self.clone();
        let id = id.to_string();
        Task::start(async move {
            let _ = this.load(&id, force_refresh).await;
        });
        cell
    }

    /// Persist an item if it carries unsaved edits. Clean, already-persisted
    /// items resolve immediately without touching the resource layer.
    ///
    /// On success the server-confirmed representation replaces the cached
    /// one unconditionally (it supersedes the dirty value it was saved from)
    /// and a silent background refresh of the table is requested.
    pub async fn save_if_changed(&self, item: &WorkItem) -> ApiResult<WorkItem> {
        if !item.dirty && !item.is_new() {
            return Ok(item.clone());
        }

        match self.api.save_work_item(item).await {
            Ok(mut saved) => {
                saved.dirty = false;
                self.notifications.push(Notification::save_succeeded(&saved));
                self.finish_editing(&item.id);
                if item.is_new() {
                    self.work_item_created(saved.clone());
                } else {
                    self.publish(saved.clone());
                }
                self.states.refresh_in_background_relay.send(());
                Ok(saved)
            }
            Err(error) => {
                self.notifications
                    .push(Notification::save_failed(item, &error));
                Err(error)
            }
        }
    }

    /// Register a just-created item: it moves from the unsaved sentinel to
    /// its own cell and interested observers hear about it once.
    pub fn work_item_created(&self, item: WorkItem) {
        self.states.work_items.remove(NEW_WORK_ITEM_ID);
        self.publish(item.clone());
        self.states.work_item_created_relay.send(item);
    }

    /// The edit form cell for one item, seeded empty on first access.
    pub fn edit_form(&self, id: &str) -> State<EditForm> {
        let cache_id = work_item_cache_id(id);
        let cell = self.states.editing.state(&cache_id);
        if cell.is_pristine() {
            cell.put(EditForm {
                work_item_id: cache_id,
                touched: Default::default(),
            });
        }
        cell
    }

    pub fn finish_editing(&self, id: &str) {
        self.states.editing.remove(&work_item_cache_id(id));
    }

    /// Unconditional cache write. Items without a loaded schema get theirs
    /// attached asynchronously before the cell publishes, so subscribers
    /// only ever observe schema-complete items.
    fn publish(&self, item: WorkItem) {
        if let Some(schema) = &item.schema {
            self.states.schemas.state(&schema.href).put(schema.clone());
        }

        let cell = self.state(&item.id);
        if item.schema_is_loaded() {
            cell.put(item);
            return;
        }

        let api = self.api.clone();
        let schemas = self.states.schemas.clone();
        let notifications = self.notifications.clone();
        let _population = cell.clear_and_populate(async move {
            match load_schema(&api, &schemas, &item.schema_href).await {
                Ok(schema) => Ok(WorkItem {
                    schema: Some(schema),
                    ..item
                }),
                Err(error) => {
                    notifications
                        .push(Notification::schema_load_failed(&item.schema_href, &error));
                    Err(error)
                }
            }
        });
    }
}

/// Schema lookup through the schema cache: one fetch per href, shared by
/// every item referencing it.
async fn load_schema(
    api: &Arc<dyn WorkItemApi>,
    schemas: &crate::dataflow::MultiState<Schema>,
    href: &str,
) -> ApiResult<Schema> {
    let api = api.clone();
    let href_owned = href.to_string();
    schemas
        .state(href)
        .populate_if_pristine(move || async move { api.load_schema(&href_owned).await })
        .await
}
