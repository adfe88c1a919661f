//! In-memory [`TaskApi`] for tests and offline demos.
//!
//! Behaves like the REST backend: mutations persist immediately, ids are
//! minted on create, and (when a bus is attached) every successful mutation
//! publishes a push-style invalidation the way the real backend emits
//! `tasksUpdated`. Every call is recorded so tests can assert on exactly
//! what a component sent.

use parking_lot::Mutex;
use uuid::Uuid;

use taskboard_proto::api::{NewTask, ReorderRequest, TaskPatch, UserRecord};
use taskboard_proto::task::{Task, TaskId};

use super::{ApiError, TaskApi};
use crate::events::{EventBus, InvalidationSource};

/// One recorded call against a [`MemoryTaskApi`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiCall {
    /// `GET /Alltask`.
    ListTasks,
    /// `POST /task`.
    CreateTask(NewTask),
    /// `PUT /tasks/{id}`.
    UpdateTask {
        /// Target task.
        id: TaskId,
        /// Fields sent.
        patch: TaskPatch,
    },
    /// `DELETE /delete/{id}`.
    DeleteTask(TaskId),
    /// `PUT /reorder`.
    Reorder(ReorderRequest),
    /// `POST /user`.
    RegisterUser(UserRecord),
}

impl ApiCall {
    /// Whether this call changes remote state.
    #[must_use]
    pub const fn is_mutation(&self) -> bool {
        !matches!(self, Self::ListTasks)
    }
}

#[derive(Debug, Default)]
struct MemoryState {
    tasks: Vec<Task>,
    users: Vec<UserRecord>,
    calls: Vec<ApiCall>,
    /// Remaining calls that fail with [`ApiError::Unavailable`].
    failures: usize,
}

/// In-process stand-in for the REST backend.
#[derive(Debug, Default)]
pub struct MemoryTaskApi {
    state: Mutex<MemoryState>,
    bus: Option<EventBus>,
}

impl MemoryTaskApi {
    /// An empty store with no push notifications.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A store seeded with `tasks`.
    #[must_use]
    pub fn with_tasks(tasks: Vec<Task>) -> Self {
        let api = Self::default();
        api.state.lock().tasks = tasks;
        api
    }

    /// Publish an invalidation on `bus` after every successful mutation.
    #[must_use]
    pub fn with_push(mut self, bus: EventBus) -> Self {
        self.bus = Some(bus);
        self
    }

    /// Make the next `count` calls fail with [`ApiError::Unavailable`].
    pub fn fail_next(&self, count: usize) {
        self.state.lock().failures = count;
    }

    /// Every call received so far, oldest first.
    #[must_use]
    pub fn calls(&self) -> Vec<ApiCall> {
        self.state.lock().calls.clone()
    }

    /// Only the calls that mutate remote state.
    #[must_use]
    pub fn mutations(&self) -> Vec<ApiCall> {
        self.state
            .lock()
            .calls
            .iter()
            .filter(|c| c.is_mutation())
            .cloned()
            .collect()
    }

    /// Forget recorded calls.
    pub fn clear_calls(&self) {
        self.state.lock().calls.clear();
    }

    /// Current stored tasks.
    #[must_use]
    pub fn tasks(&self) -> Vec<Task> {
        self.state.lock().tasks.clone()
    }

    /// Users registered so far.
    #[must_use]
    pub fn users(&self) -> Vec<UserRecord> {
        self.state.lock().users.clone()
    }

    /// Records `call`, then applies `apply` unless a failure is pending.
    fn handle<T>(
        &self,
        call: ApiCall,
        apply: impl FnOnce(&mut MemoryState) -> Result<T, ApiError>,
    ) -> Result<T, ApiError> {
        let mutation = call.is_mutation();
        let result = {
            let mut state = self.state.lock();
            state.calls.push(call);
            if state.failures > 0 {
                state.failures -= 1;
                Err(ApiError::Unavailable("injected failure".to_string()))
            } else {
                apply(&mut state)
            }
        };

        if mutation
            && result.is_ok()
            && let Some(bus) = &self.bus
        {
            bus.invalidate(InvalidationSource::Push);
        }
        result
    }
}

fn find_mut<'a>(tasks: &'a mut [Task], id: &TaskId) -> Result<&'a mut Task, ApiError> {
    tasks
        .iter_mut()
        .find(|t| &t.id == id)
        .ok_or_else(|| ApiError::NotFound(id.clone()))
}

impl TaskApi for MemoryTaskApi {
    async fn list_tasks(&self) -> Result<Vec<Task>, ApiError> {
        self.handle(ApiCall::ListTasks, |state| Ok(state.tasks.clone()))
    }

    async fn create_task(&self, task: &NewTask) -> Result<(), ApiError> {
        self.handle(ApiCall::CreateTask(task.clone()), |state| {
            state.tasks.push(Task {
                id: TaskId::new(Uuid::now_v7().simple().to_string()),
                title: task.title.clone(),
                description: task.description.clone(),
                email: task.email.clone(),
                timestamp: task.timestamp.clone(),
                category: task.category,
                order: task.order,
            });
            Ok(())
        })
    }

    async fn update_task(&self, id: &TaskId, patch: &TaskPatch) -> Result<(), ApiError> {
        let call = ApiCall::UpdateTask {
            id: id.clone(),
            patch: patch.clone(),
        };
        self.handle(call, |state| {
            let task = find_mut(&mut state.tasks, id)?;
            if let Some(title) = &patch.title {
                task.title.clone_from(title);
            }
            if let Some(description) = &patch.description {
                task.description.clone_from(description);
            }
            if let Some(category) = patch.category {
                task.category = category;
            }
            Ok(())
        })
    }

    async fn delete_task(&self, id: &TaskId) -> Result<(), ApiError> {
        self.handle(ApiCall::DeleteTask(id.clone()), |state| {
            let before = state.tasks.len();
            state.tasks.retain(|t| &t.id != id);
            if state.tasks.len() == before {
                return Err(ApiError::NotFound(id.clone()));
            }
            Ok(())
        })
    }

    async fn reorder(&self, request: &ReorderRequest) -> Result<(), ApiError> {
        self.handle(ApiCall::Reorder(request.clone()), |state| {
            for entry in &request.tasks {
                let task = find_mut(&mut state.tasks, &entry.id)?;
                task.order = entry.order;
                task.category = request.category;
            }
            Ok(())
        })
    }

    async fn register_user(&self, user: &UserRecord) -> Result<(), ApiError> {
        self.handle(ApiCall::RegisterUser(user.clone()), |state| {
            state.users.retain(|u| u.email != user.email);
            state.users.push(user.clone());
            Ok(())
        })
    }
}
