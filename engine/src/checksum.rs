//! Outdated-query detection via stable fingerprints.
//!
//! Deciding whether the locally-held table state has diverged from the
//! authoritative server-described query must be cheap enough to run on
//! every observed tick, so instead of deep-comparing descriptors we compare
//! a structural fingerprint of `(query identity, query inputs, pagination)`.

use std::sync::{Mutex, MutexGuard};

use serde::Serialize;
use shared::{Filter, Pagination, QueryDescriptor, SortCriterion};

/// Fingerprint of one `(query, pagination)` combination.
///
/// `props` is an opaque string: it is round-tripped through the host
/// application's route parameters and only equality ever matters.
#[derive(Debug, Clone, PartialEq)]
pub struct ChecksumRecord {
    pub query_id: Option<u64>,
    pub props: String,
}

/// Stable, order-preserving encoding of the reload-relevant query inputs.
/// Filters and sort criteria compare as ordered lists (their order affects
/// applied semantics); pagination contributes page and page size only -
/// the total count is a result, not an input.
#[derive(Serialize)]
struct Fingerprint<'a> {
    filters: &'a [Filter],
    sort_by: &'a [SortCriterion],
    group_by: &'a Option<String>,
    display_sums: bool,
    page: u32,
    page_size: u32,
}

/// Gate that prevents feedback loops where a server-confirmed reload
/// re-triggers a client-side reload of itself.
#[derive(Debug, Default)]
pub struct QueryChecksum {
    record: Mutex<Option<ChecksumRecord>>,
}

impl QueryChecksum {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn compute(query: &QueryDescriptor, pagination: &Pagination) -> ChecksumRecord {
        let fingerprint = Fingerprint {
            filters: &query.filters,
            sort_by: &query.sort_by,
            group_by: &query.group_by,
            display_sums: query.display_sums,
            page: pagination.page,
            page_size: pagination.page_size,
        };
        // Serializing a plain data struct cannot fail.
        let props = serde_json::to_string(&fingerprint).unwrap_or_default();
        ChecksumRecord {
            query_id: query.id,
            props,
        }
    }

    pub fn current(&self) -> Option<ChecksumRecord> {
        self.lock().clone()
    }

    /// The opaque checksum string for the host to write into the URL.
    pub fn current_props(&self) -> Option<String> {
        self.lock().as_ref().map(|record| record.props.clone())
    }

    /// True when no record is stored yet or the fresh fingerprint differs
    /// structurally from the stored one.
    pub fn is_outdated(&self, query: &QueryDescriptor, pagination: &Pagination) -> bool {
        let fresh = Self::compute(query, pagination);
        self.lock().as_ref() != Some(&fresh)
    }

    pub fn update(&self, query: &QueryDescriptor, pagination: &Pagination) {
        *self.lock() = Some(Self::compute(query, pagination));
    }

    /// Store the fresh record only if it differs; returns whether an update
    /// occurred. This is the single equality gate in the reload protocol.
    pub fn update_if_different(&self, query: &QueryDescriptor, pagination: &Pagination) -> bool {
        let fresh = Self::compute(query, pagination);
        let mut record = self.lock();
        if record.as_ref() == Some(&fresh) {
            return false;
        }
        *record = Some(fresh);
        true
    }

    /// Force the next comparison to report outdated. Called when a brand
    /// new query load begins.
    pub fn clear(&self) {
        *self.lock() = None;
    }

    /// Route-driven divergence check: the route's query id or opaque
    /// checksum string differs from what is currently recorded. A route
    /// without props is only compared by id.
    pub fn route_is_outdated(&self, query_id: Option<u64>, props: Option<&str>) -> bool {
        match &*self.lock() {
            None => true,
            Some(record) => {
                record.query_id != query_id || props.is_some_and(|p| p != record.props)
            }
        }
    }

    /// Invoke `action` exactly once when the route diverges from the
    /// recorded state; otherwise no-op. Returns whether `action` ran.
    pub async fn execute_if_outdated<F, Fut>(
        &self,
        query_id: Option<u64>,
        props: Option<&str>,
        action: F,
    ) -> bool
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = ()>,
    {
        if self.route_is_outdated(query_id, props) {
            action().await;
            true
        } else {
            false
        }
    }

    fn lock(&self) -> MutexGuard<'_, Option<ChecksumRecord>> {
        self.record.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
