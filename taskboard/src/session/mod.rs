//! Sign-in state.
//!
//! [`SessionService`] is the single source of truth for "who is signed in".
//! It is injected wherever a user is needed instead of being read from
//! ambient state, and broadcasts changes over a [`watch`] channel.
//!
//! Identity comes from an [`IdentityProvider`]. The bundled
//! [`ProfileIdentity`] simply vouches for a profile the user typed in;
//! a federated provider would slot in behind the same trait.

pub mod store;

pub use store::SessionStore;

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use taskboard_proto::api::UserRecord;

use crate::api::TaskApi;
use crate::board::BoardError;

/// Errors from sign-in and session persistence.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The profile has no email; tasks are owned by email.
    #[error("profile has no email address")]
    MissingEmail,

    /// The identity provider refused or failed.
    #[error("sign-in failed: {0}")]
    Provider(String),

    /// The session file could not be read or written.
    #[error("session file {path}: {source}")]
    Io {
        /// File that was accessed.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The session file is not valid TOML.
    #[error("failed to parse session file: {0}")]
    Decode(#[from] toml::de::Error),

    /// The session could not be serialised.
    #[error("failed to write session file: {0}")]
    Encode(#[from] toml::ser::Error),
}

/// The signed-in user as the identity provider reports it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    /// Display name.
    pub name: String,
    /// Email; stamped on every task the user creates.
    pub email: String,
    /// Avatar URL, empty when unknown.
    #[serde(default)]
    pub photo_url: String,
}

impl UserProfile {
    /// The body of `POST /user`.
    #[must_use]
    pub fn to_record(&self) -> UserRecord {
        UserRecord {
            name: self.name.clone(),
            email: self.email.clone(),
            imgurl: self.photo_url.clone(),
        }
    }
}

/// Observable sign-in state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SessionState {
    /// Not yet restored from disk.
    #[default]
    Loading,
    /// Nobody is signed in.
    SignedOut,
    /// A user is signed in.
    SignedIn(UserProfile),
}

impl SessionState {
    /// The signed-in user, if any.
    #[must_use]
    pub const fn user(&self) -> Option<&UserProfile> {
        match self {
            Self::SignedIn(user) => Some(user),
            Self::Loading | Self::SignedOut => None,
        }
    }
}

/// Source of user identity.
pub trait IdentityProvider: Send + Sync {
    /// Authenticates and returns the user's profile.
    fn sign_in(
        &self,
    ) -> impl std::future::Future<Output = Result<UserProfile, SessionError>> + Send;

    /// Ends the provider-side session.
    fn sign_out(&self) -> impl std::future::Future<Output = Result<(), SessionError>> + Send;
}

/// Provider that signs in with a profile supplied up front.
#[derive(Debug, Clone)]
pub struct ProfileIdentity {
    profile: UserProfile,
}

impl ProfileIdentity {
    /// Wraps `profile`; it is validated on sign-in.
    #[must_use]
    pub const fn new(profile: UserProfile) -> Self {
        Self { profile }
    }
}

impl IdentityProvider for ProfileIdentity {
    async fn sign_in(&self) -> Result<UserProfile, SessionError> {
        let email = self.profile.email.trim();
        if email.is_empty() {
            return Err(SessionError::MissingEmail);
        }
        Ok(UserProfile {
            name: self.profile.name.trim().to_string(),
            email: email.to_string(),
            photo_url: self.profile.photo_url.trim().to_string(),
        })
    }

    async fn sign_out(&self) -> Result<(), SessionError> {
        Ok(())
    }
}

/// Holds and publishes the current [`SessionState`].
#[derive(Debug)]
pub struct SessionService {
    state: watch::Sender<SessionState>,
    store: Option<SessionStore>,
}

impl SessionService {
    /// A service persisting to `store`, in [`SessionState::Loading`] until
    /// [`restore`](Self::restore) runs.
    #[must_use]
    pub fn new(store: SessionStore) -> Self {
        Self {
            state: watch::Sender::new(SessionState::Loading),
            store: Some(store),
        }
    }

    /// A service that keeps nothing on disk and starts signed out.
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            state: watch::Sender::new(SessionState::SignedOut),
            store: None,
        }
    }

    /// A non-persistent service already signed in as `user`.
    #[must_use]
    pub fn signed_in(user: UserProfile) -> Self {
        Self {
            state: watch::Sender::new(SessionState::SignedIn(user)),
            store: None,
        }
    }

    /// Loads the persisted user, leaving the state `SignedIn` or `SignedOut`.
    ///
    /// # Errors
    ///
    /// Returns the store's error; the state becomes `SignedOut`.
    pub fn restore(&self) -> Result<Option<UserProfile>, SessionError> {
        let loaded = self.store.as_ref().map_or(Ok(None), SessionStore::load);
        match &loaded {
            Ok(Some(user)) => {
                tracing::debug!(email = %user.email, "session restored");
                self.state.send_replace(SessionState::SignedIn(user.clone()));
            }
            Ok(None) => {
                self.state.send_replace(SessionState::SignedOut);
            }
            Err(e) => {
                tracing::warn!(err = %e, "could not restore session");
                self.state.send_replace(SessionState::SignedOut);
            }
        }
        loaded
    }

    /// Snapshot of the current state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    /// The signed-in user, if any.
    #[must_use]
    pub fn current_user(&self) -> Option<UserProfile> {
        self.state.borrow().user().cloned()
    }

    /// Receives every state change from now on.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// The signed-in user, or [`BoardError::NotSignedIn`].
    ///
    /// # Errors
    ///
    /// [`BoardError::NotSignedIn`] while loading or signed out.
    pub fn require_user(&self) -> Result<UserProfile, BoardError> {
        self.current_user().ok_or(BoardError::NotSignedIn)
    }

    /// Signs in through `provider`, persists the session and records the
    /// user with the backend.
    ///
    /// A failed `POST /user` is logged and does not undo the sign-in.
    ///
    /// # Errors
    ///
    /// Returns the provider's error or a persistence error; the state is
    /// unchanged in both cases.
    pub async fn sign_in<P, A>(&self, provider: &P, api: &A) -> Result<UserProfile, SessionError>
    where
        P: IdentityProvider,
        A: TaskApi,
    {
        let user = provider.sign_in().await?;
        if let Some(store) = &self.store {
            store.save(&user)?;
        }
        self.state.send_replace(SessionState::SignedIn(user.clone()));
        tracing::info!(email = %user.email, "signed in");

        if let Err(e) = api.register_user(&user.to_record()).await {
            tracing::warn!(err = %e, email = %user.email, "failed to register user");
        }
        Ok(user)
    }

    /// Signs out of `provider` and forgets the persisted session.
    ///
    /// # Errors
    ///
    /// Returns the provider's or store's error. The local state is
    /// `SignedOut` afterwards regardless.
    pub async fn sign_out<P: IdentityProvider>(&self, provider: &P) -> Result<(), SessionError> {
        let provider_result = provider.sign_out().await;
        self.state.send_replace(SessionState::SignedOut);
        if let Some(store) = &self.store {
            store.clear()?;
        }
        tracing::info!("signed out");
        provider_result
    }
}
