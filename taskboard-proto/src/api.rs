//! Request bodies for the board's REST endpoints.
//!
//! | Endpoint             | Body              |
//! |----------------------|-------------------|
//! | `POST /task`         | [`NewTask`]       |
//! | `PUT /tasks/{id}`    | [`TaskPatch`]     |
//! | `PUT /reorder`       | [`ReorderRequest`]|
//! | `POST /user`         | [`UserRecord`]    |

use serde::{Deserialize, Serialize};

use crate::task::{Category, TaskId};

/// Body of `POST /task`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTask {
    /// Owner's email.
    pub email: String,
    /// Validated title.
    pub title: String,
    /// Validated description, empty when not given.
    pub description: String,
    /// RFC 3339 creation time.
    pub timestamp: String,
    /// Initial column; new tasks land in `To-Do`.
    pub category: Category,
    /// Initial rank, one past the current end of the column.
    pub order: i64,
}

/// Body of `PUT /tasks/{id}`: a partial update.
///
/// Unset fields are omitted from the JSON so the backend leaves them alone.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskPatch {
    /// New title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// New description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// New column.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
}

impl TaskPatch {
    /// A patch that only changes the category.
    #[must_use]
    pub const fn category(category: Category) -> Self {
        Self {
            title: None,
            description: None,
            category: Some(category),
        }
    }

    /// Whether the patch changes nothing.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.title.is_none() && self.description.is_none() && self.category.is_none()
    }
}

/// One `{id, order}` pair inside a [`ReorderRequest`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderEntry {
    /// Task being ranked.
    pub id: TaskId,
    /// New 0-based rank.
    pub order: i64,
}

/// Body of `PUT /reorder`: new ranks for every task in one column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReorderRequest {
    /// Column being reordered.
    pub category: Category,
    /// Every task of the column in its new sequence.
    pub tasks: Vec<OrderEntry>,
}

/// Body of `POST /user`, sent once after sign-in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    /// Display name.
    pub name: String,
    /// Email address.
    pub email: String,
    /// Avatar URL.
    pub imgurl: String,
}
