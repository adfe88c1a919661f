//! Board model: columns, ordering, form validation and drag reconciliation.

pub mod form;
pub mod reconcile;

pub use form::TaskForm;
pub use reconcile::{DragPlan, DropTarget, NoOpReason, Reconciliation, plan_drag};

use thiserror::Error;

use taskboard_proto::task::{Category, Task, TaskId};

use crate::api::ApiError;

/// Errors surfaced by board operations.
#[derive(Debug, Error)]
pub enum BoardError {
    /// Task title cannot be empty.
    #[error("task title cannot be empty")]
    TitleEmpty,
    /// Task title exceeds the maximum length.
    #[error("task title too long ({len} characters, max 50)")]
    TitleTooLong {
        /// Length of the rejected title in characters.
        len: usize,
    },
    /// Task description exceeds the maximum length.
    #[error("task description too long ({len} characters, max 200)")]
    DescriptionTooLong {
        /// Length of the rejected description in characters.
        len: usize,
    },
    /// The action needs a signed-in user.
    #[error("not signed in")]
    NotSignedIn,
    /// Task with the given ID is not on the board.
    #[error("task not found: {0}")]
    TaskNotFound(TaskId),
    /// The backend call failed.
    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Tasks of one category in display order (`order`, then id).
#[must_use]
pub fn column(tasks: &[Task], category: Category) -> Vec<&Task> {
    let mut column: Vec<&Task> = tasks.iter().filter(|t| t.category == category).collect();
    column.sort_by(|a, b| a.rank().cmp(&b.rank()));
    column
}

/// Rank that places a new task after everything in `category`.
#[must_use]
pub fn next_order(tasks: &[Task], category: Category) -> i64 {
    tasks
        .iter()
        .filter(|t| t.category == category)
        .map(|t| t.order)
        .max()
        .map_or(0, |max| max.saturating_add(1))
}

/// The three columns of a task snapshot, each in display order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Board {
    columns: [Vec<Task>; 3],
}

impl Board {
    /// Groups a flat task list into columns.
    #[must_use]
    pub fn from_tasks(tasks: &[Task]) -> Self {
        let columns = Category::ALL.map(|c| column(tasks, c).into_iter().cloned().collect());
        Self { columns }
    }

    /// Tasks in `category`, in display order.
    #[must_use]
    pub fn column(&self, category: Category) -> &[Task] {
        &self.columns[category.index()]
    }

    /// Iterates `(category, tasks)` in column order.
    pub fn columns(&self) -> impl Iterator<Item = (Category, &[Task])> {
        Category::ALL
            .into_iter()
            .map(move |c| (c, self.column(c)))
    }

    /// Total number of tasks on the board.
    #[must_use]
    pub fn len(&self) -> usize {
        self.columns.iter().map(Vec::len).sum()
    }

    /// Whether the board has no tasks.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.columns.iter().all(Vec::is_empty)
    }

    /// Looks a task up by id.
    #[must_use]
    pub fn find(&self, id: &TaskId) -> Option<&Task> {
        self.columns.iter().flatten().find(|t| &t.id == id)
    }
}
