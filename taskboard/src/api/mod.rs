//! Remote task storage seam.
//!
//! Defines the [`TaskApi`] trait covering every endpoint the board calls.
//! Concrete implementations:
//! - [`http::HttpTaskApi`]: the REST backend over `reqwest`
//! - [`memory::MemoryTaskApi`]: in-process store for tests and offline demos

pub mod http;
pub mod memory;

use taskboard_proto::api::{NewTask, ReorderRequest, TaskPatch, UserRecord};
use taskboard_proto::task::{Task, TaskId};

/// Errors returned by a [`TaskApi`] call.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The request could not be sent or the connection failed.
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The backend answered with a non-success status.
    #[error("backend returned {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, possibly truncated.
        body: String,
    },

    /// The response body was not the expected JSON.
    #[error("malformed response: {0}")]
    Decode(String),

    /// A configured base URL cannot carry endpoint paths.
    #[error("invalid base url {url}: {reason}")]
    InvalidUrl {
        /// The offending URL.
        url: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The target task does not exist.
    #[error("task not found: {0}")]
    NotFound(TaskId),

    /// The backend is unavailable (used by the in-memory store to simulate outages).
    #[error("backend unavailable: {0}")]
    Unavailable(String),
}

/// Async access to the board's REST endpoints.
///
/// Every mutation is expected to make the backend emit a `tasksUpdated`
/// push notification once persisted. Implementations never touch local
/// caches; callers refetch.
pub trait TaskApi: Send + Sync {
    /// `GET /Alltask`: the full task list.
    fn list_tasks(&self) -> impl std::future::Future<Output = Result<Vec<Task>, ApiError>> + Send;

    /// `POST /task`: create a task.
    fn create_task(
        &self,
        task: &NewTask,
    ) -> impl std::future::Future<Output = Result<(), ApiError>> + Send;

    /// `PUT /tasks/{id}`: partial update of title, description and category.
    fn update_task(
        &self,
        id: &TaskId,
        patch: &TaskPatch,
    ) -> impl std::future::Future<Output = Result<(), ApiError>> + Send;

    /// `DELETE /delete/{id}`: remove a task.
    fn delete_task(
        &self,
        id: &TaskId,
    ) -> impl std::future::Future<Output = Result<(), ApiError>> + Send;

    /// `PUT /reorder`: new ranks for one column.
    fn reorder(
        &self,
        request: &ReorderRequest,
    ) -> impl std::future::Future<Output = Result<(), ApiError>> + Send;

    /// `POST /user`: record a signed-in user.
    fn register_user(
        &self,
        user: &UserRecord,
    ) -> impl std::future::Future<Output = Result<(), ApiError>> + Send;
}
