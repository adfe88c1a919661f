//! Add/edit form input and its validation.
//!
//! Limits match the backend's: a required title of at most 50 characters
//! and an optional description of at most 200. Lengths count characters,
//! not bytes. Validation runs before any request is built.

use taskboard_proto::task::{MAX_TASK_DESCRIPTION_LENGTH, MAX_TASK_TITLE_LENGTH};

use super::BoardError;

/// Raw values from the add or edit form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskForm {
    /// Title as typed.
    pub title: String,
    /// Description as typed; `None` when the field was left out.
    pub description: Option<String>,
}

impl TaskForm {
    /// A form with a title and no description.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: None,
        }
    }

    /// Adds a description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Checks the limits and returns `(title, description)` ready to send.
    ///
    /// The title limit counts the title as typed, surrounding whitespace
    /// included; the value sent is trimmed. The description is sent as typed
    /// and becomes an empty string when absent.
    ///
    /// # Errors
    ///
    /// Returns [`BoardError::TitleEmpty`], [`BoardError::TitleTooLong`] or
    /// [`BoardError::DescriptionTooLong`].
    pub fn validate(&self) -> Result<(String, String), BoardError> {
        let len = self.title.chars().count();
        if len > MAX_TASK_TITLE_LENGTH {
            return Err(BoardError::TitleTooLong { len });
        }
        let title = self.title.trim();
        if title.is_empty() {
            return Err(BoardError::TitleEmpty);
        }

        let description = self.description.clone().unwrap_or_default();
        let len = description.chars().count();
        if len > MAX_TASK_DESCRIPTION_LENGTH {
            return Err(BoardError::DescriptionTooLong { len });
        }

        Ok((title.to_string(), description))
    }
}
