//! Read-through cache of the remote task list.
//!
//! The cache is only ever replaced wholesale: a refresh fetches the full
//! list and swaps the snapshot, so readers never observe a half-applied
//! change. A failed refresh keeps the previous snapshot.

use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::broadcast::error::RecvError;

use taskboard_proto::task::Task;

use crate::api::{ApiError, TaskApi};
use crate::board::Board;
use crate::events::{BoardEvent, EventBus};

#[derive(Debug, Default)]
struct Snapshot {
    tasks: Arc<Vec<Task>>,
    generation: u64,
}

/// Shared, wholesale-replaced copy of the backend's task list.
#[derive(Debug, Clone, Default)]
pub struct TaskCache {
    inner: Arc<RwLock<Snapshot>>,
}

impl TaskCache {
    /// An empty cache at generation 0.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The current list. Cheap: shares the snapshot.
    #[must_use]
    pub fn snapshot(&self) -> Arc<Vec<Task>> {
        Arc::clone(&self.inner.read().tasks)
    }

    /// Number of replacements so far; 0 means never loaded.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.inner.read().generation
    }

    /// The current list grouped into columns.
    #[must_use]
    pub fn board(&self) -> Board {
        Board::from_tasks(&self.snapshot())
    }

    /// Swaps in a new list and returns the new generation.
    pub fn replace(&self, tasks: Vec<Task>) -> u64 {
        let mut inner = self.inner.write();
        inner.tasks = Arc::new(tasks);
        inner.generation += 1;
        inner.generation
    }

    /// Fetches the full list from `api` and replaces the snapshot.
    ///
    /// # Errors
    ///
    /// Returns the [`ApiError`] from the fetch; the snapshot is unchanged.
    pub async fn refresh<A: TaskApi>(&self, api: &A) -> Result<u64, ApiError> {
        let tasks = api.list_tasks().await?;
        let count = tasks.len();
        let generation = self.replace(tasks);
        tracing::debug!(generation, count, "task cache replaced");
        Ok(generation)
    }
}

/// Spawns a task that refreshes `cache` on every [`BoardEvent::Invalidate`].
///
/// Publishes [`BoardEvent::Refreshed`] after each successful replace. When
/// the subscriber lags, the missed invalidations collapse into one refresh.
/// The task ends once every [`EventBus`] handle is dropped; it holds only a
/// weak one itself.
pub fn spawn_invalidation_listener<A>(
    cache: TaskCache,
    api: Arc<A>,
    bus: EventBus,
) -> tokio::task::JoinHandle<()>
where
    A: TaskApi + 'static,
{
    let mut rx = bus.subscribe();
    let bus = bus.downgrade();
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(BoardEvent::Invalidate { source }) => {
                    tracing::debug!(%source, "refetching tasks");
                }
                Ok(BoardEvent::Refreshed { .. }) => continue,
                Err(RecvError::Lagged(missed)) => {
                    tracing::debug!(missed, "invalidation listener lagged, refetching once");
                }
                Err(RecvError::Closed) => break,
            }

            match cache.refresh(api.as_ref()).await {
                Ok(generation) => {
                    bus.publish(BoardEvent::Refreshed {
                        generation,
                        task_count: cache.snapshot().len(),
                    });
                }
                Err(e) => {
                    tracing::warn!(err = %e, "task refetch failed, keeping stale list");
                }
            }
        }
        tracing::debug!("invalidation listener exiting");
    })
}
