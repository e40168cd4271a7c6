//! Single-value reactive cell with a pristine marker.
//!
//! A [`State`] either holds a value or is *pristine* (never populated since
//! creation or the last `clear`). Every `put` notifies subscribers, even
//! when the new value equals the old one: equality suppression belongs to
//! callers (the checksum gate), not to the cell.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use futures::Stream;
use futures::future::{BoxFuture, FutureExt, Shared};
use futures_signals::signal::{Mutable, Signal, SignalExt};

use crate::dataflow::task::{Task, TaskHandle};
use crate::error::EngineError;

/// In-flight population shared by every concurrent caller of the same cell.
pub type Population<T> = Shared<BoxFuture<'static, Result<T, EngineError>>>;

/// Single-value reactive state container.
///
/// ```
/// use engine::dataflow::State;
///
/// let cell = State::new();
/// assert!(cell.is_pristine());
/// cell.put(1);
/// assert_eq!(cell.get(), Some(1));
/// cell.clear();
/// assert!(cell.is_pristine());
/// ```
#[derive(Clone, Debug)]
pub struct State<T>
where
    T: Clone + Send + Sync + 'static,
{
    value: Mutable<Option<T>>,
    pending: Arc<Mutex<Option<Population<T>>>>,
    /// Bumped on every `put`/`clear`; a population driver only writes back
    /// when the cell has not moved on since the population started.
    epoch: Arc<AtomicU64>,
}

impl<T> State<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            value: Mutable::new(None),
            pending: Arc::new(Mutex::new(None)),
            epoch: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Current value, `None` while pristine.
    pub fn get(&self) -> Option<T> {
        self.value.get_cloned()
    }

    /// True when never populated since creation or the last `clear`.
    pub fn is_pristine(&self) -> bool {
        self.value.lock_ref().is_none()
    }

    /// Replace the value and notify all subscribers, equal or not.
    /// A direct `put` supersedes any in-flight population.
    pub fn put(&self, value: T) {
        let mut pending = self.lock_pending();
        self.epoch.fetch_add(1, Ordering::SeqCst);
        pending.take();
        self.value.set(Some(value));
    }

    /// Reset to pristine. Discards any in-flight population so a later load
    /// attempt is not blocked by a stale one.
    pub fn clear(&self) {
        let mut pending = self.lock_pending();
        self.epoch.fetch_add(1, Ordering::SeqCst);
        pending.take();
        self.value.set(None);
    }

    /// Populate from a computation only if currently pristine.
    ///
    /// If a value is present the returned future resolves to it immediately
    /// and `make` is never invoked. If a population is already in flight,
    /// the caller rendezvouses on that same shared computation, so N
    /// concurrent callers issue exactly one unit of work. Otherwise `make`
    /// is invoked and the cell is populated when it resolves; a failed
    /// population leaves the cell pristine so the next attempt retries.
    pub fn populate_if_pristine<F, Fut>(&self, make: F) -> Population<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, EngineError>> + Send + 'static,
    {
        if let Some(current) = self.get() {
            return async move { Ok(current) }.boxed().shared();
        }

        let mut pending = self.lock_pending();
        if let Some(in_flight) = pending.as_ref() {
            return in_flight.clone();
        }
        self.register_population(make(), &mut pending)
    }

    /// Reset to pristine, then populate unconditionally from `future`.
    pub fn clear_and_populate<Fut>(&self, future: Fut) -> Population<T>
    where
        Fut: Future<Output = Result<T, EngineError>> + Send + 'static,
    {
        let mut pending = self.lock_pending();
        self.epoch.fetch_add(1, Ordering::SeqCst);
        pending.take();
        self.value.set(None);
        self.register_population(future, &mut pending)
    }

    fn register_population<Fut>(
        &self,
        future: Fut,
        slot: &mut Option<Population<T>>,
    ) -> Population<T>
    where
        Fut: Future<Output = Result<T, EngineError>> + Send + 'static,
    {
        let shared: Population<T> = future.boxed().shared();
        *slot = Some(shared.clone());

        let started_at = self.epoch.load(Ordering::SeqCst);
        let cell = self.clone();
        let driver = shared.clone();
        Task::start(async move {
            let result = driver.await;
            let mut pending = cell.lock_pending();
            if cell.epoch.load(Ordering::SeqCst) != started_at {
                // The cell moved on while the computation was in flight;
                // the late resolution is a benign no-op.
                return;
            }
            pending.take();
            if let Ok(value) = result {
                cell.value.set(Some(value));
            }
        });

        shared
    }

    /// Subscription stream of value transitions, starting with the current
    /// state. Combined observation of two cells (`map_ref!`) retains the
    /// latest known value of each side across independent emissions.
    pub fn signal(&self) -> impl Signal<Item = Option<T>> + use<T> {
        self.value.signal_cloned()
    }

    pub fn stream(&self) -> impl Stream<Item = Option<T>> + use<T> {
        self.signal().to_stream()
    }

    /// Run `callback` for the current value and every transition until the
    /// returned handle is dropped.
    pub fn for_each<F>(&self, mut callback: F) -> TaskHandle
    where
        F: FnMut(Option<T>) + Send + 'static,
    {
        Task::start_droppable(self.value.signal_cloned().for_each(move |value| {
            callback(value);
            async {}
        }))
    }

    fn lock_pending(&self) -> MutexGuard<'_, Option<Population<T>>> {
        self.pending.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl<T> Default for State<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    #[tokio::test]
    async fn get_returns_exactly_the_nth_put_value() {
        let cell = State::new();
        for n in 1..=5 {
            cell.put(n);
            assert_eq!(cell.get(), Some(n));
        }
    }

    #[tokio::test]
    async fn put_notifies_even_when_the_value_is_equal() {
        let cell = State::new();
        let mut stream = cell.stream();
        assert_eq!(stream.next().await, Some(None));

        cell.put("same".to_string());
        assert_eq!(stream.next().await, Some(Some("same".to_string())));

        cell.put("same".to_string());
        assert_eq!(stream.next().await, Some(Some("same".to_string())));
    }

    #[tokio::test]
    async fn streams_can_be_moved_into_spawned_tasks() {
        let cell = State::new();
        cell.put(4u32);

        let mut stream = cell.stream();
        let first = tokio::spawn(async move { stream.next().await })
            .await
            .unwrap();
        assert_eq!(first, Some(Some(4)));
    }

    #[tokio::test]
    async fn clear_returns_the_cell_to_pristine() {
        let cell = State::new();
        cell.put(7);
        assert!(!cell.is_pristine());

        cell.clear();
        assert!(cell.is_pristine());
        assert_eq!(cell.get(), None);
    }

    #[tokio::test]
    async fn concurrent_populations_share_one_computation() {
        let cell = State::new();
        let invocations = Arc::new(AtomicUsize::new(0));

        let mut callers = Vec::new();
        for _ in 0..4 {
            let counter = invocations.clone();
            callers.push(cell.populate_if_pristine(move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(10)).await;
                Ok(42)
            }));
        }

        for caller in callers {
            assert_eq!(caller.await, Ok(42));
        }
        assert_eq!(invocations.load(Ordering::SeqCst), 1);
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(cell.get(), Some(42));
    }

    #[tokio::test]
    async fn populate_is_skipped_when_a_value_is_present() {
        let cell = State::new();
        cell.put(1);

        let result = cell
            .populate_if_pristine(|| async { panic!("must not be invoked") })
            .await;
        assert_eq!(result, Ok(1));
    }

    #[tokio::test]
    async fn failed_population_leaves_the_cell_pristine() {
        let cell: State<u32> = State::new();

        let result = cell
            .populate_if_pristine(|| async {
                Err(EngineError::fetch("work item", "connection reset"))
            })
            .await;
        assert!(result.is_err());

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(cell.is_pristine());

        // A later attempt retries fresh instead of caching the rejection.
        let retried = cell.populate_if_pristine(|| async { Ok(9) }).await;
        assert_eq!(retried, Ok(9));
    }

    #[tokio::test]
    async fn late_population_never_clobbers_a_cleared_cell() {
        let cell = State::new();
        let population = cell.populate_if_pristine(|| async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            Ok("stale".to_string())
        });

        cell.clear();
        cell.put("current".to_string());

        let _ = population.await;
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(cell.get(), Some("current".to_string()));
    }
}
