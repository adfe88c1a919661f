//! Configuration for the taskboard client.
//!
//! Supports layered configuration with the following priority (highest first):
//! 1. CLI arguments
//! 2. Environment variables (via clap `env` attribute)
//! 3. TOML config file (`~/.config/taskboard/config.toml`)
//! 4. Compiled defaults
//!
//! Missing config file is not an error (defaults are used). An explicit
//! `--config` path that doesn't exist is an error.

use std::path::PathBuf;
use std::time::Duration;

use crate::api::http::HttpApiConfig;
use crate::push::PushConfig;
use crate::session::{SessionStore, UserProfile};

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file {path}: {source}")]
    ReadFile {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Failed to parse the TOML configuration.
    #[error("failed to parse config file: {0}")]
    ParseToml(#[from] toml::de::Error),

    /// No session file configured and no platform data directory.
    #[error("could not determine data directory for the session file")]
    NoDataDir,
}

// ---------------------------------------------------------------------------
// TOML file structs (all fields Option for partial overrides)
// ---------------------------------------------------------------------------

/// Top-level TOML config file structure.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct ConfigFile {
    api: ApiFileConfig,
    push: PushFileConfig,
    session: SessionFileConfig,
    profile: ProfileFileConfig,
}

/// `[api]` section of the config file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct ApiFileConfig {
    base_url: Option<String>,
    user_base_url: Option<String>,
    request_timeout_secs: Option<u64>,
}

/// `[push]` section of the config file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct PushFileConfig {
    url: Option<String>,
    connect_timeout_secs: Option<u64>,
    channel_capacity: Option<usize>,
    reconnect_initial_ms: Option<u64>,
    reconnect_max_ms: Option<u64>,
    reconnect_max_attempts: Option<u32>,
}

/// `[session]` section of the config file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct SessionFileConfig {
    file: Option<PathBuf>,
}

/// `[profile]` section: defaults for `login`.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct ProfileFileConfig {
    name: Option<String>,
    email: Option<String>,
    photo_url: Option<String>,
}

// ---------------------------------------------------------------------------
// Resolved configuration (concrete types, all fields populated)
// ---------------------------------------------------------------------------

/// Exponential backoff for push reconnects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconnectConfig {
    /// Delay before the first attempt.
    pub initial_delay: Duration,
    /// Upper bound for any single delay.
    pub max_delay: Duration,
    /// Give up after this many attempts; `None` retries forever.
    pub max_attempts: Option<u32>,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
            max_attempts: None,
        }
    }
}

impl ReconnectConfig {
    /// Delay before attempt `attempt` (1-based): `initial * 2^(attempt-1)`,
    /// capped at `max_delay`.
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 1_u32
            .checked_shl(attempt.saturating_sub(1))
            .unwrap_or(u32::MAX);
        self.initial_delay
            .saturating_mul(factor)
            .min(self.max_delay)
    }
}

/// Fully resolved client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    // -- API --
    /// Base URL of the task endpoints.
    pub api_url: String,
    /// Base URL of `POST /user`, when it lives elsewhere.
    pub user_api_url: Option<String>,
    /// Per-request timeout; `None` waits indefinitely.
    pub request_timeout: Option<Duration>,

    // -- Push --
    /// Push endpoint; derived from `api_url` when unset.
    pub push_url: Option<String>,
    /// Timeout for connecting to the push endpoint.
    pub connect_timeout: Duration,
    /// Event bus capacity per subscriber.
    pub channel_capacity: usize,
    /// Push reconnect backoff.
    pub reconnect: ReconnectConfig,

    // -- Session --
    /// Session file; the platform data dir is used when unset.
    pub session_file: Option<PathBuf>,

    // -- Profile --
    /// Default display name for `login`.
    pub profile_name: Option<String>,
    /// Default email for `login`.
    pub profile_email: Option<String>,
    /// Default avatar URL for `login`.
    pub profile_photo_url: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:5000".to_string(),
            user_api_url: None,
            request_timeout: None,
            push_url: None,
            connect_timeout: Duration::from_secs(10),
            channel_capacity: 64,
            reconnect: ReconnectConfig::default(),
            session_file: None,
            profile_name: None,
            profile_email: None,
            profile_photo_url: None,
        }
    }
}

impl ClientConfig {
    /// Load configuration by merging CLI args, env vars, and a TOML file.
    ///
    /// If `--config` is given and the file does not exist, returns an
    /// error. Otherwise the default path
    /// (`~/.config/taskboard/config.toml`) is tried and silently ignored if
    /// missing.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the config file cannot be read or parsed.
    pub fn load(cli: &CliArgs) -> Result<Self, ConfigError> {
        let file = load_config_file(cli.config.as_deref())?;
        Ok(Self::resolve(cli, &file))
    }

    /// Priority: CLI > file > default. Separate from `load()` for testing.
    #[must_use]
    fn resolve(cli: &CliArgs, file: &ConfigFile) -> Self {
        let defaults = Self::default();
        let reconnect = ReconnectConfig {
            initial_delay: file
                .push
                .reconnect_initial_ms
                .map_or(defaults.reconnect.initial_delay, Duration::from_millis),
            max_delay: file
                .push
                .reconnect_max_ms
                .map_or(defaults.reconnect.max_delay, Duration::from_millis),
            max_attempts: file
                .push
                .reconnect_max_attempts
                .or(defaults.reconnect.max_attempts),
        };

        Self {
            api_url: cli
                .api_url
                .clone()
                .or_else(|| file.api.base_url.clone())
                .unwrap_or(defaults.api_url),
            user_api_url: file.api.user_base_url.clone(),
            request_timeout: file.api.request_timeout_secs.map(Duration::from_secs),
            push_url: cli.push_url.clone().or_else(|| file.push.url.clone()),
            connect_timeout: file
                .push
                .connect_timeout_secs
                .map_or(defaults.connect_timeout, Duration::from_secs),
            channel_capacity: file
                .push
                .channel_capacity
                .unwrap_or(defaults.channel_capacity),
            reconnect,
            session_file: file.session.file.clone(),
            profile_name: file.profile.name.clone(),
            profile_email: file.profile.email.clone(),
            profile_photo_url: file.profile.photo_url.clone(),
        }
    }

    /// Settings for [`HttpTaskApi`](crate::api::http::HttpTaskApi).
    #[must_use]
    pub fn to_api_config(&self) -> HttpApiConfig {
        HttpApiConfig {
            base_url: self.api_url.clone(),
            user_base_url: self.user_api_url.clone(),
            request_timeout: self.request_timeout,
        }
    }

    /// Settings for [`PushChannel`](crate::push::PushChannel). The push
    /// endpoint defaults to the API host.
    #[must_use]
    pub fn to_push_config(&self) -> PushConfig {
        PushConfig {
            url: self.push_url.clone().unwrap_or_else(|| self.api_url.clone()),
            connect_timeout: self.connect_timeout,
            reconnect: self.reconnect.clone(),
        }
    }

    /// The session store at the configured or default location.
    ///
    /// # Errors
    ///
    /// [`ConfigError::NoDataDir`] when neither is available.
    pub fn session_store(&self) -> Result<SessionStore, ConfigError> {
        self.session_file
            .clone()
            .or_else(SessionStore::default_path)
            .map(SessionStore::new)
            .ok_or(ConfigError::NoDataDir)
    }

    /// Builds a login profile from CLI values, falling back to `[profile]`.
    ///
    /// Returns `None` when no email is known.
    #[must_use]
    pub fn login_profile(
        &self,
        name: Option<String>,
        email: Option<String>,
        photo_url: Option<String>,
    ) -> Option<UserProfile> {
        let email = email.or_else(|| self.profile_email.clone())?;
        Some(UserProfile {
            name: name
                .or_else(|| self.profile_name.clone())
                .unwrap_or_default(),
            email,
            photo_url: photo_url
                .or_else(|| self.profile_photo_url.clone())
                .unwrap_or_default(),
        })
    }
}

/// CLI arguments parsed by clap.
#[derive(clap::Parser, Debug, Default)]
#[command(version, about = "Kanban task board client")]
pub struct CliArgs {
    /// Base URL of the board's REST API.
    #[arg(long, env = "TASKBOARD_API_URL", global = true)]
    pub api_url: Option<String>,

    /// Push endpoint (defaults to the API URL).
    #[arg(long, env = "TASKBOARD_PUSH_URL", global = true)]
    pub push_url: Option<String>,

    /// Path to config file (default: `~/.config/taskboard/config.toml`).
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Log level filter (trace, debug, info, warn, error).
    #[arg(long, default_value = "warn", env = "TASKBOARD_LOG", global = true)]
    pub log_level: String,

    /// Write logs to this file instead of stderr.
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    /// Action to run.
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Board actions.
#[derive(clap::Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Sign in and register the user with the backend.
    Login {
        /// Display name.
        #[arg(long)]
        name: Option<String>,
        /// Email address; owns the tasks you create.
        #[arg(long)]
        email: Option<String>,
        /// Avatar URL.
        #[arg(long)]
        photo_url: Option<String>,
    },
    /// Forget the signed-in user.
    Logout,
    /// Show the signed-in user.
    Whoami,
    /// Print the board.
    List,
    /// Add a task to To-Do.
    Add {
        /// Task title (max 50 characters).
        title: String,
        /// Task description (max 200 characters).
        #[arg(long)]
        description: Option<String>,
    },
    /// Replace a task's title, description and column.
    Edit {
        /// Task id.
        id: String,
        /// New title.
        #[arg(long)]
        title: String,
        /// New description.
        #[arg(long)]
        description: Option<String>,
        /// Column ("To-Do", "In Progress" or "Done"); unchanged when omitted.
        #[arg(long)]
        category: Option<String>,
    },
    /// Delete a task.
    Delete {
        /// Task id.
        id: String,
    },
    /// Drop a task onto another task or a column.
    Drag {
        /// Task being dragged.
        active_id: String,
        /// Drop onto this task.
        #[arg(long, group = "target")]
        over_task: Option<String>,
        /// Drop onto this column.
        #[arg(long, group = "target")]
        over_column: Option<String>,
        /// Drop onto a raw id, resolved as task id first, then column name.
        #[arg(long, group = "target")]
        over: Option<String>,
    },
    /// Follow live updates and reprint the board until Ctrl-C.
    Watch,
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

/// Load and parse a TOML config file.
///
/// If `explicit_path` is `Some`, the file must exist (error if not).
/// If `explicit_path` is `None`, the default path is tried and missing file
/// is treated as empty config.
fn load_config_file(explicit_path: Option<&std::path::Path>) -> Result<ConfigFile, ConfigError> {
    let path = if let Some(p) = explicit_path {
        let contents = std::fs::read_to_string(p).map_err(|e| ConfigError::ReadFile {
            path: p.to_path_buf(),
            source: e,
        })?;
        return Ok(toml::from_str(&contents)?);
    } else {
        let Some(config_dir) = dirs::config_dir() else {
            return Ok(ConfigFile::default());
        };
        config_dir.join("taskboard").join("config.toml")
    };

    match std::fs::read_to_string(&path) {
        Ok(contents) => Ok(toml::from_str(&contents)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(ConfigFile::default()),
        Err(e) => Err(ConfigError::ReadFile { path, source: e }),
    }
}
