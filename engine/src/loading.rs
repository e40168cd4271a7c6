//! Table loading indicator.
//!
//! Every fetch path resolves the indicator, success or failure: the view is
//! never left in a state indistinguishable from "still loading".

use futures_signals::signal::{Mutable, Signal, SignalExt};

#[derive(Debug, Clone, Default)]
pub struct LoadingIndicator {
    active: Mutable<u32>,
}

/// Decrements the active count when dropped, so a cancelled tracked future
/// still resolves the indicator.
#[derive(Debug)]
pub struct LoadingGuard {
    active: Mutable<u32>,
}

impl Drop for LoadingGuard {
    fn drop(&mut self) {
        self.active.replace_with(|count| count.saturating_sub(1));
    }
}

impl LoadingIndicator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&self) -> LoadingGuard {
        self.active.replace_with(|count| *count + 1);
        LoadingGuard {
            active: self.active.clone(),
        }
    }

    /// Run `future` with the indicator raised for its whole duration.
    pub async fn track<T>(&self, future: impl Future<Output = T>) -> T {
        let _guard = self.begin();
        future.await
    }

    pub fn is_loading(&self) -> bool {
        self.active.get() > 0
    }

    pub fn signal(&self) -> impl Signal<Item = bool> {
        self.active.signal().map(|count| count > 0).dedupe()
    }
}
