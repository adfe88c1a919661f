//! The board's user actions.
//!
//! [`BoardController`] ties the remote API, the cache, the event bus and the
//! session together. It never edits the cache directly: every successful
//! mutation is followed by an invalidation, and the cache refetches the
//! authoritative list. Remote failures are logged and reported as outcome
//! values; nothing is retried or rolled back.

use std::sync::Arc;

use chrono::{SecondsFormat, Utc};

use taskboard_proto::api::{NewTask, TaskPatch};
use taskboard_proto::task::{Category, TaskId};

use crate::api::TaskApi;
use crate::board::{
    BoardError, DragPlan, DropTarget, NoOpReason, Reconciliation, TaskForm, next_order, plan_drag,
};
use crate::cache::TaskCache;
use crate::events::{EventBus, InvalidationSource};
use crate::session::SessionService;

/// Result of finishing a drag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DragOutcome {
    /// The update was accepted by the backend.
    Sent(DragPlan),
    /// Nothing needed sending.
    Skipped(NoOpReason),
    /// The backend call failed; the board is unchanged.
    Failed(DragPlan),
}

/// Result of a delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// The task was removed.
    Deleted,
    /// The backend call failed.
    Failed,
}

/// Executes board actions against a [`TaskApi`].
#[derive(Debug)]
pub struct BoardController<A> {
    api: Arc<A>,
    cache: TaskCache,
    bus: EventBus,
    session: Arc<SessionService>,
}

impl<A: TaskApi> BoardController<A> {
    /// Wires a controller; all handles are shared with other components.
    #[must_use]
    pub const fn new(
        api: Arc<A>,
        cache: TaskCache,
        bus: EventBus,
        session: Arc<SessionService>,
    ) -> Self {
        Self {
            api,
            cache,
            bus,
            session,
        }
    }

    /// The shared API client.
    #[must_use]
    pub const fn api(&self) -> &Arc<A> {
        &self.api
    }

    /// The cache this controller plans against.
    #[must_use]
    pub const fn cache(&self) -> &TaskCache {
        &self.cache
    }

    /// The session guarding task actions.
    #[must_use]
    pub const fn session(&self) -> &Arc<SessionService> {
        &self.session
    }

    /// Creates a task at the end of the To-Do column.
    ///
    /// Returns `false` when the backend call failed.
    ///
    /// # Errors
    ///
    /// [`BoardError::NotSignedIn`] or a validation error; nothing is sent.
    pub async fn create_task(&self, form: &TaskForm) -> Result<bool, BoardError> {
        let user = self.session.require_user()?;
        let (title, description) = form.validate()?;

        let category = Category::Todo;
        let task = NewTask {
            email: user.email,
            title,
            description,
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            category,
            order: next_order(&self.cache.snapshot(), category),
        };

        match self.api.create_task(&task).await {
            Ok(()) => {
                tracing::info!(title = %task.title, "task created");
                self.bus.invalidate(InvalidationSource::LocalMutation);
                Ok(true)
            }
            Err(e) => {
                tracing::warn!(err = %e, title = %task.title, "create task failed");
                Ok(false)
            }
        }
    }

    /// Replaces a task's title, description and category.
    ///
    /// Returns `false` when the backend call failed.
    ///
    /// # Errors
    ///
    /// [`BoardError::NotSignedIn`] or a validation error; nothing is sent.
    pub async fn edit_task(
        &self,
        id: &TaskId,
        form: &TaskForm,
        category: Category,
    ) -> Result<bool, BoardError> {
        self.session.require_user()?;
        let (title, description) = form.validate()?;

        let patch = TaskPatch {
            title: Some(title),
            description: Some(description),
            category: Some(category),
        };
        match self.api.update_task(id, &patch).await {
            Ok(()) => {
                tracing::info!(%id, "task updated");
                self.bus.invalidate(InvalidationSource::LocalMutation);
                Ok(true)
            }
            Err(e) => {
                tracing::warn!(err = %e, %id, "update task failed");
                Ok(false)
            }
        }
    }

    /// Deletes a task and reports what actually happened.
    ///
    /// # Errors
    ///
    /// [`BoardError::NotSignedIn`]; nothing is sent.
    pub async fn delete_task(&self, id: &TaskId) -> Result<DeleteOutcome, BoardError> {
        self.session.require_user()?;
        match self.api.delete_task(id).await {
            Ok(()) => {
                tracing::info!(%id, "task deleted");
                self.bus.invalidate(InvalidationSource::LocalMutation);
                Ok(DeleteOutcome::Deleted)
            }
            Err(e) => {
                tracing::warn!(err = %e, %id, "delete task failed");
                Ok(DeleteOutcome::Failed)
            }
        }
    }

    /// Finishes a drag of `active_id` onto `target` (`None` when released
    /// over nothing).
    ///
    /// Plans against the current cache snapshot and sends at most one
    /// request. The cache is left alone; the backend's push notification
    /// drives the refetch.
    ///
    /// # Errors
    ///
    /// [`BoardError::NotSignedIn`]; nothing is planned.
    pub async fn drag_end(
        &self,
        active_id: &TaskId,
        target: Option<&DropTarget>,
    ) -> Result<DragOutcome, BoardError> {
        self.session.require_user()?;
        let snapshot = self.cache.snapshot();

        let plan = match plan_drag(&snapshot, active_id, target) {
            Reconciliation::Update(plan) => plan,
            Reconciliation::NoOp(reason) => {
                tracing::debug!(%active_id, %reason, "drag needs no update");
                return Ok(DragOutcome::Skipped(reason));
            }
        };

        let result = match &plan {
            DragPlan::Reorder(request) => self.api.reorder(request).await,
            DragPlan::Move { id, category } => {
                self.api
                    .update_task(id, &TaskPatch::category(*category))
                    .await
            }
        };

        match result {
            Ok(()) => {
                tracing::debug!(%active_id, ?plan, "drag update sent");
                Ok(DragOutcome::Sent(plan))
            }
            Err(e) => {
                tracing::warn!(err = %e, %active_id, "drag update failed");
                Ok(DragOutcome::Failed(plan))
            }
        }
    }

    /// Like [`drag_end`](Self::drag_end) for an untagged drop id, resolved
    /// against the current snapshot.
    ///
    /// # Errors
    ///
    /// [`BoardError::NotSignedIn`].
    pub async fn drag_end_raw(
        &self,
        active_id: &TaskId,
        over_id: Option<&str>,
    ) -> Result<DragOutcome, BoardError> {
        let snapshot = self.cache.snapshot();
        let target = over_id.and_then(|id| DropTarget::resolve(id, active_id, &snapshot));
        self.drag_end(active_id, target.as_ref()).await
    }
}
