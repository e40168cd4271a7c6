//! Boundary to the HTTP/resource layer.
//!
//! The engine decides *when* and *what* to (re)fetch; an implementation of
//! [`WorkItemApi`] owns the transport. Resource calls are the only
//! suspension points in the engine - everything else is synchronous.

use async_trait::async_trait;
use shared::{Pagination, QueryDescriptor, Schema, WorkItem, WorkItemPage};

use crate::error::EngineError;

pub type ApiResult<T> = Result<T, EngineError>;

#[async_trait]
pub trait WorkItemApi: Send + Sync + 'static {
    /// Resolve a query descriptor: a persisted one by id, or the default
    /// query of the given project scope when `id` is `None`.
    async fn fetch_query(
        &self,
        project: Option<&str>,
        id: Option<u64>,
    ) -> ApiResult<QueryDescriptor>;

    /// Fetch one page of work items matching the descriptor.
    async fn fetch_results(
        &self,
        query: &QueryDescriptor,
        pagination: &Pagination,
    ) -> ApiResult<WorkItemPage>;

    async fn fetch_work_item(&self, id: &str, force_refresh: bool) -> ApiResult<WorkItem>;

    /// Persist the item. May fail with a structured validation payload
    /// (`EngineError::Save`); the returned item is the server-confirmed
    /// representation with the dirty flag cleared.
    async fn save_work_item(&self, item: &WorkItem) -> ApiResult<WorkItem>;

    async fn load_schema(&self, href: &str) -> ApiResult<Schema>;
}
