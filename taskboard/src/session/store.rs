//! On-disk persistence of the signed-in profile.
//!
//! The file is TOML with a single optional `[user]` table. A missing file
//! means "signed out".

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::{SessionError, UserProfile};

#[derive(Debug, Default, Serialize, Deserialize)]
struct SessionFile {
    user: Option<UserProfile>,
}

/// Location of the persisted session.
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    /// A store backed by `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<data dir>/taskboard/session.toml`, if the platform has a data dir.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        dirs::data_dir().map(|dir| dir.join("taskboard").join("session.toml"))
    }

    /// The backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the persisted profile, `None` when there is none.
    ///
    /// # Errors
    ///
    /// [`SessionError::Io`] if the file exists but cannot be read, and
    /// [`SessionError::Decode`] if it is not valid session TOML.
    pub fn load(&self) -> Result<Option<UserProfile>, SessionError> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(self.io_error(e)),
        };
        let file: SessionFile = toml::from_str(&contents)?;
        Ok(file.user)
    }

    /// Persists `profile`, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// [`SessionError::Io`] or [`SessionError::Encode`].
    pub fn save(&self, profile: &UserProfile) -> Result<(), SessionError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
        }
        let file = SessionFile {
            user: Some(profile.clone()),
        };
        let contents = toml::to_string(&file)?;
        std::fs::write(&self.path, contents).map_err(|e| self.io_error(e))?;
        tracing::debug!(path = %self.path.display(), "session saved");
        Ok(())
    }

    /// Removes the persisted session. A missing file is fine.
    ///
    /// # Errors
    ///
    /// [`SessionError::Io`] if the file exists and cannot be removed.
    pub fn clear(&self) -> Result<(), SessionError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(self.io_error(e)),
        }
    }

    fn io_error(&self, source: std::io::Error) -> SessionError {
        SessionError::Io {
            path: self.path.clone(),
            source,
        }
    }
}
