use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ===== WORK ITEMS =====

/// Cache identity used for a work item that has not been persisted yet.
pub const NEW_WORK_ITEM_ID: &str = "__new__";

/// Map a raw id to the identity key used by the client-side caches.
/// Empty ids belong to the single unsaved work item.
pub fn work_item_cache_id(id: &str) -> String {
    if id.is_empty() {
        NEW_WORK_ITEM_ID.to_string()
    } else {
        id.to_string()
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct WorkItem {
    pub id: String,
    pub subject: String,
    /// Arbitrary typed attributes keyed by attribute name.
    #[serde(default)]
    pub fields: IndexMap<String, Value>,
    /// True while the item carries unsaved local edits.
    #[serde(default)]
    pub dirty: bool,
    pub schema_href: String,
    /// Lazily loaded; `None` until the schema round-trip completed.
    #[serde(default)]
    pub schema: Option<Schema>,
}

impl WorkItem {
    pub fn is_new(&self) -> bool {
        self.id.is_empty() || self.id == NEW_WORK_ITEM_ID
    }

    pub fn schema_is_loaded(&self) -> bool {
        self.schema.is_some()
    }

    pub fn cache_id(&self) -> String {
        work_item_cache_id(&self.id)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Schema {
    pub href: String,
    #[serde(default)]
    pub attributes: IndexMap<String, AttributeSchema>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct AttributeSchema {
    pub name: String,
    pub data_type: String,
    pub writable: bool,
}

/// An open editing form for one work item: the touched attribute values
/// that have not been submitted yet.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct EditForm {
    pub work_item_id: String,
    #[serde(default)]
    pub touched: IndexMap<String, Value>,
}

// ===== QUERIES =====

/// Server-described table query. Exactly one persisted copy is authoritative
/// at a time: the one last fetched from or saved to the server.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct QueryDescriptor {
    pub id: Option<u64>,
    pub name: String,
    #[serde(default)]
    pub filters: Vec<Filter>,
    #[serde(default)]
    pub sort_by: Vec<SortCriterion>,
    #[serde(default)]
    pub group_by: Option<String>,
    #[serde(default)]
    pub columns: Vec<String>,
    #[serde(default)]
    pub display_sums: bool,
    #[serde(default)]
    pub timeline_visible: bool,
}

/// One filter clause. Order matters: filters apply as an ordered list.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Filter {
    pub name: String,
    pub operator: String,
    #[serde(default)]
    pub values: Vec<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SortCriterion {
    pub attribute: String,
    pub direction: SortDirection,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

// ===== PAGINATION & RESULTS =====

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Pagination {
    pub page: u32,
    pub page_size: u32,
    /// Server-supplied result size. An output, never an input: excluded
    /// from change detection and checksums.
    #[serde(default)]
    pub total: Option<u64>,
}

impl Pagination {
    pub fn first_page(page_size: u32) -> Self {
        Self {
            page: 1,
            page_size,
            total: None,
        }
    }

    /// Page-relevant equality; `total` is ignored.
    pub fn same_page(&self, other: &Pagination) -> bool {
        self.page == other.page && self.page_size == other.page_size
    }
}

/// Result metadata accompanying one fetched page.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct CollectionMeta {
    pub total: u64,
    pub page: u32,
    pub page_size: u32,
    /// Row counts per group value when the query groups.
    #[serde(default)]
    pub group_counts: IndexMap<String, u64>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct WorkItemPage {
    pub work_items: Vec<WorkItem>,
    pub meta: CollectionMeta,
}

// ===== ERROR PAYLOADS =====

/// Structured validation failure returned by a rejected save.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct ValidationErrors {
    #[serde(default)]
    pub messages: Vec<String>,
    /// Per-attribute messages so the UI can react field by field.
    #[serde(default)]
    pub fields: IndexMap<String, String>,
}
