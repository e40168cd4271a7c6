//! Keyed collection of reactive cells.
//!
//! Built on `MutableBTreeMap` for ordered, deterministic iteration, the same
//! backing the reactive map containers elsewhere in this codebase use.

use futures_signals::signal::Signal;
use futures_signals::signal_map::MutableBTreeMap;

use crate::dataflow::state_cell::State;

/// Mapping from string identity to a [`State`] cell.
///
/// At most one cell exists per key; cells are created lazily on first
/// access and shared by every observer from then on.
#[derive(Clone, Debug)]
pub struct MultiState<V>
where
    V: Clone + Send + Sync + 'static,
{
    cells: MutableBTreeMap<String, State<V>>,
}

impl<V> MultiState<V>
where
    V: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            cells: MutableBTreeMap::new(),
        }
    }

    /// The cell for `key`, created pristine on first access.
    pub fn state(&self, key: &str) -> State<V> {
        let mut cells = self.cells.lock_mut();
        if let Some(cell) = cells.get(key) {
            return cell.clone();
        }
        let cell = State::new();
        cells.insert_cloned(key.to_string(), cell.clone());
        cell
    }

    /// Signal of the value under `key`, `None` while pristine or absent.
    pub fn value_signal(&self, key: &str) -> impl Signal<Item = Option<V>> + use<V> {
        self.state(key).signal()
    }

    /// Drop the cell for `key` entirely. Observers holding the old cell
    /// keep a detached handle; the next `state(key)` starts fresh.
    pub fn remove(&self, key: &str) {
        self.cells.lock_mut().remove(&key.to_string());
    }

    pub fn len(&self) -> usize {
        self.cells.lock_ref().len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.lock_ref().is_empty()
    }

    pub fn keys(&self) -> Vec<String> {
        self.cells.lock_ref().keys().cloned().collect()
    }
}

impl<V> Default for MultiState<V>
where
    V: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}
