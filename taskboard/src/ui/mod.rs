//! Plain-text board rendering for the CLI.

use std::fmt::Write as _;

use chrono::DateTime;

use taskboard_proto::task::Task;

use crate::board::Board;
use crate::session::UserProfile;

/// How creation times are shown.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Renders the three columns one after another.
#[must_use]
pub fn render_board(board: &Board) -> String {
    let mut out = String::new();
    for (category, tasks) in board.columns() {
        let _ = writeln!(out, "{category} ({})", tasks.len());
        if tasks.is_empty() {
            out.push_str("  (empty)\n");
        }
        for task in tasks {
            out.push_str(&render_task(task));
            out.push('\n');
        }
        out.push('\n');
    }
    out
}

/// One task: id, title, optional description, creation time.
#[must_use]
pub fn render_task(task: &Task) -> String {
    let mut line = format!("  [{}] {}", task.id, task.title);
    if !task.description.is_empty() {
        let _ = write!(line, ": {}", task.description);
    }
    if let Some(created) = format_timestamp(&task.timestamp) {
        let _ = write!(line, " ({created})");
    }
    line
}

/// The signed-in user for `whoami`.
#[must_use]
pub fn render_user(user: &UserProfile) -> String {
    if user.name.is_empty() {
        user.email.clone()
    } else {
        format!("{} <{}>", user.name, user.email)
    }
}

/// Timestamps that are not RFC 3339 are left out.
fn format_timestamp(raw: &str) -> Option<String> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|t| t.format(TIMESTAMP_FORMAT).to_string())
}
