//! Droppable task handles for observer lifetimes.

use std::future::Future;

/// Handle to a spawned observer task. Dropping the handle aborts the task,
/// which is how all subscriptions registered for a view's lifetime are torn
/// down at once: collect the handles in one bag and drop the bag.
#[derive(Debug)]
pub struct TaskHandle(tokio::task::JoinHandle<()>);

impl Drop for TaskHandle {
    fn drop(&mut self) {
        self.0.abort();
    }
}

pub struct Task;

impl Task {
    /// Spawn a detached task.
    ///
    /// Used for cell population drivers: an in-flight fetch is never
    /// forcibly aborted, its eventual resolution writes into a cell that may
    /// already have moved on, and such writes are benign no-ops.
    pub fn start<F>(future: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        drop(tokio::spawn(future));
    }

    /// Spawn a task that is aborted when the returned handle is dropped.
    pub fn start_droppable<F>(future: F) -> TaskHandle
    where
        F: Future<Output = ()> + Send + 'static,
    {
        TaskHandle(tokio::spawn(future))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[tokio::test]
    async fn dropping_the_handle_aborts_the_task() {
        let finished = Arc::new(AtomicBool::new(false));
        let flag = finished.clone();

        let handle = Task::start_droppable(async move {
            tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;
            flag.store(true, Ordering::SeqCst);
        });
        drop(handle);

        tokio::time::sleep(tokio::time::Duration::from_millis(80)).await;
        assert!(!finished.load(Ordering::SeqCst));
    }
}
