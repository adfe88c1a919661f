//! Task model shared with the board backend.
//!
//! A [`Task`] is owned by the remote store; clients only ever hold a
//! snapshot of the list. Ids are opaque strings minted by the backend and
//! travel as `_id` on the wire.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};

/// Maximum allowed task title length in characters.
pub const MAX_TASK_TITLE_LENGTH: usize = 50;

/// Maximum allowed task description length in characters.
pub const MAX_TASK_DESCRIPTION_LENGTH: usize = 200;

/// Opaque identifier for a task, assigned by the backend.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    /// Wraps a backend-assigned id.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TaskId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// One of the three fixed board columns.
///
/// The display strings double as column ids in drop events, so they are
/// matched exactly.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    /// Not started.
    #[default]
    #[serde(rename = "To-Do")]
    Todo,
    /// Being worked on.
    #[serde(rename = "In Progress")]
    InProgress,
    /// Finished.
    #[serde(rename = "Done")]
    Done,
}

impl Category {
    /// All categories in column order.
    pub const ALL: [Self; 3] = [Self::Todo, Self::InProgress, Self::Done];

    /// The wire and display name of this category.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Todo => "To-Do",
            Self::InProgress => "In Progress",
            Self::Done => "Done",
        }
    }

    /// Column index, 0-based, in [`Category::ALL`] order.
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Todo => 0,
            Self::InProgress => 1,
            Self::Done => 2,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a string is not one of the three category names.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown category: {0:?}")]
pub struct UnknownCategory(pub String);

impl FromStr for Category {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| UnknownCategory(s.to_string()))
    }
}

/// A task as returned by `GET /Alltask`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Backend-assigned id.
    #[serde(rename = "_id")]
    pub id: TaskId,
    /// Short title, at most [`MAX_TASK_TITLE_LENGTH`] characters.
    pub title: String,
    /// Optional longer text; empty when not given.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub description: String,
    /// Owner's email address.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub email: String,
    /// RFC 3339 creation time as written by the creating client.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub timestamp: String,
    /// Column the task lives in.
    #[serde(default)]
    pub category: Category,
    /// Rank within the category. Tasks written before ordering existed
    /// carry no value and rank as 0.
    #[serde(default)]
    pub order: i64,
}

impl Task {
    /// Sort key used for display and reordering: `order`, then id.
    #[must_use]
    pub fn rank(&self) -> (i64, &TaskId) {
        (self.order, &self.id)
    }
}

/// Stored documents may carry `null` for optional text fields.
fn null_as_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}
