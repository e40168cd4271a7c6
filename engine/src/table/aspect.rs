//! Generic state-backed, diff-against-query table aspect.
//!
//! One parameterized container replaces a per-aspect service hierarchy:
//! each aspect contributes its value type, its change predicate against the
//! authoritative query descriptor, and how it writes itself back into one.

use futures_signals::signal::Signal;
use shared::QueryDescriptor;

use crate::dataflow::State;

/// Value object held by one table aspect cell.
pub trait AspectValue: Clone + PartialEq + Send + Sync + 'static {
    /// Aspect name used in debug logging.
    const NAME: &'static str;

    /// Whether a divergence of this aspect invalidates the current result
    /// set. Render-only aspects (columns, timeline) leave this false.
    const TRIGGERS_RELOAD: bool;

    fn from_query(query: &QueryDescriptor) -> Self;

    /// Has this aspect's value materially diverged from the descriptor?
    fn is_changed(&self, query: &QueryDescriptor) -> bool;

    /// Write this aspect's value back into a descriptor.
    fn apply_to(&self, query: &mut QueryDescriptor);
}

/// One reactive cell per table aspect.
#[derive(Clone, Debug)]
pub struct TableAspect<V>
where
    V: AspectValue,
{
    state: State<V>,
}

impl<V> TableAspect<V>
where
    V: AspectValue,
{
    pub fn new() -> Self {
        Self {
            state: State::new(),
        }
    }

    /// Seed the cell from the authoritative descriptor. Called once per
    /// fresh query load.
    pub fn initialize(&self, query: &QueryDescriptor) {
        self.state.put(V::from_query(query));
    }

    pub fn current(&self) -> Option<V> {
        self.state.get()
    }

    pub fn is_pristine(&self) -> bool {
        self.state.is_pristine()
    }

    /// Replace the held value. Always a fresh `put`, never an in-place
    /// mutation, so subscribers get one notification per logical change.
    pub fn update(&self, value: V) {
        self.state.put(value);
    }

    /// Read-modify-write through `put`. No-op while pristine.
    pub fn update_with(&self, mutate: impl FnOnce(&mut V)) {
        if let Some(mut value) = self.state.get() {
            mutate(&mut value);
            self.state.put(value);
        }
    }

    pub fn signal(&self) -> impl Signal<Item = Option<V>> + use<V> {
        self.state.signal()
    }

    pub fn state(&self) -> &State<V> {
        &self.state
    }
}

impl<V> Default for TableAspect<V>
where
    V: AspectValue,
{
    fn default() -> Self {
        Self::new()
    }
}
