//! Drag-completion reconciliation.
//!
//! Turns "task X was dropped on Y" into at most one remote update. The
//! planner is a pure function of the current snapshot; executing the plan
//! and waiting for the backend's push notification is the controller's job.
//! Nothing here mutates local state: the cache only changes when the
//! backend's list is refetched.

use taskboard_proto::api::{OrderEntry, ReorderRequest};
use taskboard_proto::task::{Category, Task, TaskId};

use super::column;

/// What the pointer was released over.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropTarget {
    /// Another task card.
    Task(TaskId),
    /// An empty area of a column.
    Column(Category),
}

impl DropTarget {
    /// Interprets an untagged drop id from a drag-and-drop layer that reuses
    /// one id space for cards and columns.
    ///
    /// A task in the dragged task's column wins, then a category name, then
    /// any other task; anything else is `None`.
    #[must_use]
    pub fn resolve(over_id: &str, active_id: &TaskId, tasks: &[Task]) -> Option<Self> {
        let over = tasks.iter().find(|t| t.id.as_str() == over_id);
        let active_category = tasks
            .iter()
            .find(|t| &t.id == active_id)
            .map(|t| t.category);

        if let Some(task) = over.filter(|t| Some(t.category) == active_category) {
            return Some(Self::Task(task.id.clone()));
        }
        if let Ok(category) = over_id.parse::<Category>() {
            return Some(Self::Column(category));
        }
        over.map(|t| Self::Task(t.id.clone()))
    }
}

impl std::fmt::Display for DropTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Task(id) => write!(f, "task {id}"),
            Self::Column(category) => write!(f, "column {category}"),
        }
    }
}

/// The single remote update a drag requires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DragPlan {
    /// New ranks for every task in one column.
    Reorder(ReorderRequest),
    /// Change only the dragged task's category.
    Move {
        /// The dragged task.
        id: TaskId,
        /// Destination column.
        category: Category,
    },
}

/// Why a drag produced no update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoOpReason {
    /// The dragged id is not in the snapshot (stale drag state).
    ActiveNotFound(TaskId),
    /// The drop target id is neither a known task nor a column.
    TargetNotFound,
    /// Dropped on itself or into the column it already occupies.
    SamePosition,
    /// Dropped on a card in another column; only column drops move tasks.
    ForeignTask {
        /// Column of the card under the pointer.
        category: Category,
    },
}

impl std::fmt::Display for NoOpReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ActiveNotFound(id) => write!(f, "dragged task {id} is not on the board"),
            Self::TargetNotFound => write!(f, "drop target is not a task or column"),
            Self::SamePosition => write!(f, "task is already there"),
            Self::ForeignTask { category } => {
                write!(f, "dropped on a task in {category}; drop on the column to move")
            }
        }
    }
}

/// Result of planning a drag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reconciliation {
    /// Send this update.
    Update(DragPlan),
    /// Send nothing.
    NoOp(NoOpReason),
}

/// Plans the remote update for dropping `active_id` on `target`.
#[must_use]
pub fn plan_drag(tasks: &[Task], active_id: &TaskId, target: Option<&DropTarget>) -> Reconciliation {
    let Some(active) = tasks.iter().find(|t| &t.id == active_id) else {
        return Reconciliation::NoOp(NoOpReason::ActiveNotFound(active_id.clone()));
    };
    let Some(target) = target else {
        return Reconciliation::NoOp(NoOpReason::TargetNotFound);
    };

    match target {
        DropTarget::Column(category) if *category == active.category => {
            Reconciliation::NoOp(NoOpReason::SamePosition)
        }
        DropTarget::Column(category) => Reconciliation::Update(DragPlan::Move {
            id: active.id.clone(),
            category: *category,
        }),
        DropTarget::Task(over_id) if over_id == &active.id => {
            Reconciliation::NoOp(NoOpReason::SamePosition)
        }
        DropTarget::Task(over_id) => {
            let Some(over) = tasks.iter().find(|t| &t.id == over_id) else {
                return Reconciliation::NoOp(NoOpReason::TargetNotFound);
            };
            if over.category != active.category {
                return Reconciliation::NoOp(NoOpReason::ForeignTask {
                    category: over.category,
                });
            }
            plan_reorder(tasks, active, over)
        }
    }
}

fn plan_reorder(tasks: &[Task], active: &Task, over: &Task) -> Reconciliation {
    let mut sequence: Vec<&Task> = column(tasks, active.category);
    let (Some(from), Some(to)) = (
        sequence.iter().position(|t| t.id == active.id),
        sequence.iter().position(|t| t.id == over.id),
    ) else {
        return Reconciliation::NoOp(NoOpReason::TargetNotFound);
    };
    if from == to {
        return Reconciliation::NoOp(NoOpReason::SamePosition);
    }

    array_move(&mut sequence, from, to);

    let entries = sequence
        .iter()
        .zip(0_i64..)
        .map(|(task, order)| OrderEntry {
            id: task.id.clone(),
            order,
        })
        .collect();

    Reconciliation::Update(DragPlan::Reorder(ReorderRequest {
        category: active.category,
        tasks: entries,
    }))
}

/// Moves the element at `from` to `to`, shifting everything in between by
/// one. Out-of-range indices leave the slice untouched.
pub fn array_move<T>(items: &mut [T], from: usize, to: usize) {
    if from >= items.len() || to >= items.len() {
        return;
    }
    if from < to {
        items[from..=to].rotate_left(1);
    } else {
        items[to..=from].rotate_right(1);
    }
}
