//! `taskboard`: Kanban task board client.
//!
//! Talks to the board's REST API and follows its push channel. Configuration
//! via CLI flags, environment variables, or config file
//! (`~/.config/taskboard/config.toml`).
//!
//! ```bash
//! taskboard --api-url http://localhost:5000 login --name Ada --email ada@example.com
//! taskboard add "Write release notes" --description "for 0.2"
//! taskboard drag <task-id> --over-column "In Progress"
//! taskboard watch
//! ```

use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tokio::sync::broadcast::error::RecvError;
use tracing_appender::non_blocking::WorkerGuard;

use taskboard::api::ApiError;
use taskboard::api::http::HttpTaskApi;
use taskboard::board::{BoardError, DropTarget, TaskForm};
use taskboard::cache::{self, TaskCache};
use taskboard::config::{CliArgs, ClientConfig, Command, ConfigError};
use taskboard::controller::{BoardController, DeleteOutcome, DragOutcome};
use taskboard::events::{BoardEvent, EventBus, InvalidationSource};
use taskboard::push::{PushChannel, PushError};
use taskboard::session::{ProfileIdentity, SessionError, SessionService};
use taskboard::ui;
use taskboard_proto::task::{Category, TaskId, UnknownCategory};

/// Everything a command can fail with.
#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Board(#[from] BoardError),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Push(#[from] PushError),
    #[error(transparent)]
    Category(#[from] UnknownCategory),
    #[error("{0}")]
    Usage(&'static str),
    /// The backend rejected an action; already logged.
    #[error("{0}")]
    Rejected(String),
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = CliArgs::parse();

    let config = match ClientConfig::load(&cli) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::from(2);
        }
    };

    let _log_guard = init_logging(&cli.log_level, cli.log_file.as_deref());
    tracing::debug!(api_url = %config.api_url, "taskboard starting");

    let command = cli.command.clone().unwrap_or(Command::List);
    match run(command, &config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Initialize logging.
///
/// Logs go to `file_path` when given, otherwise to stderr so stdout only
/// carries board output. Returns a [`WorkerGuard`] that must be held until
/// shutdown to flush buffered entries.
fn init_logging(level: &str, file_path: Option<&Path>) -> Option<WorkerGuard> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let (writer, guard) = match file_path {
        Some(path) => {
            let log_dir = path.parent()?;
            let file_name = path.file_name()?.to_str()?;
            let file_appender = tracing_appender::rolling::never(log_dir, file_name);
            tracing_appender::non_blocking(file_appender)
        }
        None => tracing_appender::non_blocking(std::io::stderr()),
    };

    tracing_subscriber::fmt()
        .with_writer(writer)
        .with_env_filter(env_filter)
        .with_ansi(file_path.is_none())
        .init();

    Some(guard)
}

async fn run(command: Command, config: &ClientConfig) -> Result<(), CliError> {
    let session = Arc::new(SessionService::new(config.session_store()?));
    // A corrupt session file just means signed out; restore logs it.
    let _ = session.restore();
    let api = Arc::new(HttpTaskApi::new(&config.to_api_config())?);

    match command {
        Command::Login {
            name,
            email,
            photo_url,
        } => {
            let profile = config
                .login_profile(name, email, photo_url)
                .ok_or(CliError::Usage("login needs --email (or [profile] email)"))?;
            let user = session
                .sign_in(&ProfileIdentity::new(profile), api.as_ref())
                .await?;
            println!("Signed in as {}", ui::render_user(&user));
        }
        Command::Logout => {
            let provider = ProfileIdentity::new(session.current_user().unwrap_or_default());
            session.sign_out(&provider).await?;
            println!("Signed out");
        }
        Command::Whoami => {
            let user = session.require_user()?;
            println!("{}", ui::render_user(&user));
        }
        Command::Watch => {
            session.require_user()?;
            watch(config, api).await?;
        }
        action => {
            let controller = board_controller(config, api, session).await?;
            run_action(action, &controller).await?;
        }
    }
    Ok(())
}

/// Loads the board and wires a controller for one action.
async fn board_controller(
    config: &ClientConfig,
    api: Arc<HttpTaskApi>,
    session: Arc<SessionService>,
) -> Result<BoardController<HttpTaskApi>, CliError> {
    session.require_user()?;
    let cache = TaskCache::new();
    cache.refresh(api.as_ref()).await?;
    Ok(BoardController::new(
        api,
        cache,
        EventBus::new(config.channel_capacity),
        session,
    ))
}

async fn run_action(
    action: Command,
    controller: &BoardController<HttpTaskApi>,
) -> Result<(), CliError> {
    match action {
        Command::List => {
            print!("{}", ui::render_board(&controller.cache().board()));
        }
        Command::Add { title, description } => {
            let mut form = TaskForm::new(title);
            form.description = description;
            if !controller.create_task(&form).await? {
                return Err(CliError::Rejected("task was not created".to_string()));
            }
            println!("Task added");
        }
        Command::Edit {
            id,
            title,
            description,
            category,
        } => {
            let id = TaskId::new(id);
            let category = match category {
                Some(raw) => raw.parse::<Category>()?,
                None => controller
                    .cache()
                    .board()
                    .find(&id)
                    .map(|t| t.category)
                    .ok_or_else(|| BoardError::TaskNotFound(id.clone()))?,
            };
            let form = TaskForm { title, description };
            if !controller.edit_task(&id, &form, category).await? {
                return Err(CliError::Rejected(format!("task {id} was not updated")));
            }
            println!("Task {id} updated");
        }
        Command::Delete { id } => {
            let id = TaskId::new(id);
            match controller.delete_task(&id).await? {
                DeleteOutcome::Deleted => println!("Task {id} deleted"),
                DeleteOutcome::Failed => {
                    return Err(CliError::Rejected(format!("task {id} was not deleted")));
                }
            }
        }
        Command::Drag {
            active_id,
            over_task,
            over_column,
            over,
        } => {
            let active_id = TaskId::new(active_id);
            let outcome = if let Some(raw) = over {
                controller.drag_end_raw(&active_id, Some(&raw)).await?
            } else {
                let target = match (over_task, over_column) {
                    (Some(task), _) => Some(DropTarget::Task(TaskId::new(task))),
                    (None, Some(column)) => Some(DropTarget::Column(column.parse()?)),
                    (None, None) => None,
                };
                controller.drag_end(&active_id, target.as_ref()).await?
            };
            match outcome {
                DragOutcome::Sent(plan) => println!("Sent {plan:?}"),
                DragOutcome::Skipped(reason) => println!("Nothing to do: {reason}"),
                DragOutcome::Failed(_) => {
                    return Err(CliError::Rejected("drag update failed".to_string()));
                }
            }
        }
        Command::Login { .. } | Command::Logout | Command::Whoami | Command::Watch => {}
    }
    Ok(())
}

/// Follows the push channel and reprints the board after every refresh.
async fn watch(config: &ClientConfig, api: Arc<HttpTaskApi>) -> Result<(), CliError> {
    let bus = EventBus::new(config.channel_capacity);
    let cache = TaskCache::new();
    let mut events = bus.subscribe();
    let listener = cache::spawn_invalidation_listener(cache.clone(), api, bus.clone());

    let push = PushChannel::connect(&config.to_push_config(), bus.clone()).await?;
    bus.invalidate(InvalidationSource::Startup);
    eprintln!("Watching {} (Ctrl-C to stop)", push.url());

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            event = events.recv() => match event {
                Ok(BoardEvent::Refreshed { generation, .. }) => {
                    println!("--- board (refresh #{generation}) ---");
                    print!("{}", ui::render_board(&cache.board()));
                }
                Ok(BoardEvent::Invalidate { .. }) | Err(RecvError::Lagged(_)) => {}
                Err(RecvError::Closed) => break,
            },
        }
    }

    push.shutdown().await;
    listener.abort();
    Ok(())
}
