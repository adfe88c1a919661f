//! In-process fake of the board backend for integration tests.
//!
//! Serves the REST endpoints and a Socket.IO-over-WebSocket push endpoint
//! on `127.0.0.1:0`. Every successful mutation emits `tasksUpdated` to all
//! connected sockets, like the real server. Tests can inject failures,
//! push raw frames and drop sockets to exercise reconnects.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Json;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{delete, get, post, put};
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::broadcast;

use taskboard_proto::api::{NewTask, ReorderRequest, TaskPatch, UserRecord};
use taskboard_proto::push::{OpenParams, PushFrame, encode_frame, tasks_updated};
use taskboard_proto::task::{Category, Task, TaskId};

/// One request as the fake received it.
#[derive(Debug, Clone, PartialEq)]
pub struct Recorded {
    pub method: &'static str,
    pub path: String,
    pub body: Value,
}

#[derive(Debug, Clone)]
enum Control {
    Frame(String),
    Drop,
}

#[derive(Debug, Default)]
struct BackendState {
    tasks: Vec<Task>,
    users: Vec<UserRecord>,
    requests: Vec<Recorded>,
    failures: usize,
    next_id: u64,
    handshakes: usize,
    active_sockets: usize,
    pongs: usize,
}

struct Shared {
    state: Mutex<BackendState>,
    push: broadcast::Sender<Control>,
}

type AppState = State<Arc<Shared>>;

impl Shared {
    /// Records the request; `Err` if an injected failure is pending.
    fn record(&self, method: &'static str, path: String, body: Value) -> Result<(), StatusCode> {
        let mut state = self.state.lock();
        state.requests.push(Recorded { method, path, body });
        if state.failures > 0 {
            state.failures -= 1;
            return Err(StatusCode::INTERNAL_SERVER_ERROR);
        }
        Ok(())
    }

    fn notify(&self) {
        let _ = self.push.send(Control::Frame(encode_frame(&tasks_updated())));
    }
}

/// A running fake backend.
pub struct FakeBackend {
    pub addr: SocketAddr,
    shared: Arc<Shared>,
    handle: tokio::task::JoinHandle<()>,
}

impl FakeBackend {
    pub async fn start() -> Self {
        Self::start_with(Vec::new()).await
    }

    pub async fn start_with(tasks: Vec<Task>) -> Self {
        let (push, _) = broadcast::channel(64);
        let shared = Arc::new(Shared {
            state: Mutex::new(BackendState {
                tasks,
                ..BackendState::default()
            }),
            push,
        });

        let app = axum::Router::new()
            .route("/Alltask", get(list_tasks))
            .route("/task", post(create_task))
            .route("/tasks/{id}", put(update_task))
            .route("/delete/{id}", delete(delete_task))
            .route("/reorder", put(reorder))
            .route("/user", post(register_user))
            .route("/socket.io/", get(socket_io))
            .with_state(Arc::clone(&shared));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self {
            addr,
            shared,
            handle,
        }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn tasks(&self) -> Vec<Task> {
        self.shared.state.lock().tasks.clone()
    }

    pub fn users(&self) -> Vec<UserRecord> {
        self.shared.state.lock().users.clone()
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.shared.state.lock().requests.clone()
    }

    /// Requests other than `GET /Alltask`.
    pub fn mutations(&self) -> Vec<Recorded> {
        self.requests()
            .into_iter()
            .filter(|r| r.method != "GET")
            .collect()
    }

    pub fn fail_next(&self, count: usize) {
        self.shared.state.lock().failures = count;
    }

    /// Replaces the stored tasks without notifying anyone.
    pub fn set_tasks(&self, tasks: Vec<Task>) {
        self.shared.state.lock().tasks = tasks;
    }

    /// Emits `tasksUpdated` to every socket.
    pub fn notify(&self) {
        self.shared.notify();
    }

    /// Sends a raw text frame to every socket.
    pub fn emit_raw(&self, frame: impl Into<String>) {
        let _ = self.shared.push.send(Control::Frame(frame.into()));
    }

    /// Closes every socket from the server side.
    pub fn drop_sockets(&self) {
        let _ = self.shared.push.send(Control::Drop);
    }

    pub fn handshakes(&self) -> usize {
        self.shared.state.lock().handshakes
    }

    pub fn active_sockets(&self) -> usize {
        self.shared.state.lock().active_sockets
    }

    pub fn pongs(&self) -> usize {
        self.shared.state.lock().pongs
    }

    pub fn stop(&self) {
        self.handle.abort();
    }
}

impl Drop for FakeBackend {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

pub fn task(id: &str, category: Category, order: i64) -> Task {
    Task {
        id: TaskId::new(id),
        title: format!("task {id}"),
        description: String::new(),
        email: "ada@example.com".to_string(),
        timestamp: "2025-02-20T10:00:00Z".to_string(),
        category,
        order,
    }
}

/// Polls `check` every 20ms until it holds or 5 seconds pass.
pub async fn eventually(what: &str, mut check: impl FnMut() -> bool) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while tokio::time::Instant::now() < deadline {
        if check() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("timed out waiting for {what}");
}

// --- REST handlers ---

async fn list_tasks(State(shared): AppState) -> Result<Json<Vec<Task>>, StatusCode> {
    shared.record("GET", "/Alltask".to_string(), Value::Null)?;
    Ok(Json(shared.state.lock().tasks.clone()))
}

async fn create_task(
    State(shared): AppState,
    Json(body): Json<Value>,
) -> Result<Json<Value>, StatusCode> {
    shared.record("POST", "/task".to_string(), body.clone())?;
    let new: NewTask = serde_json::from_value(body).map_err(|_| StatusCode::BAD_REQUEST)?;
    let id = {
        let mut state = shared.state.lock();
        state.next_id += 1;
        let id = format!("srv-{}", state.next_id);
        state.tasks.push(Task {
            id: TaskId::new(id.clone()),
            title: new.title,
            description: new.description,
            email: new.email,
            timestamp: new.timestamp,
            category: new.category,
            order: new.order,
        });
        id
    };
    shared.notify();
    Ok(Json(serde_json::json!({ "insertedId": id })))
}

async fn update_task(
    State(shared): AppState,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, StatusCode> {
    shared.record("PUT", format!("/tasks/{id}"), body.clone())?;
    let patch: TaskPatch = serde_json::from_value(body).map_err(|_| StatusCode::BAD_REQUEST)?;
    {
        let mut state = shared.state.lock();
        let task = state
            .tasks
            .iter_mut()
            .find(|t| t.id.as_str() == id)
            .ok_or(StatusCode::NOT_FOUND)?;
        if let Some(title) = patch.title {
            task.title = title;
        }
        if let Some(description) = patch.description {
            task.description = description;
        }
        if let Some(category) = patch.category {
            task.category = category;
        }
    }
    shared.notify();
    Ok(Json(serde_json::json!({ "modifiedCount": 1 })))
}

async fn delete_task(
    State(shared): AppState,
    Path(id): Path<String>,
) -> Result<Json<Value>, StatusCode> {
    shared.record("DELETE", format!("/delete/{id}"), Value::Null)?;
    {
        let mut state = shared.state.lock();
        let before = state.tasks.len();
        state.tasks.retain(|t| t.id.as_str() != id);
        if state.tasks.len() == before {
            return Err(StatusCode::NOT_FOUND);
        }
    }
    shared.notify();
    Ok(Json(serde_json::json!({ "deletedCount": 1 })))
}

async fn reorder(
    State(shared): AppState,
    Json(body): Json<Value>,
) -> Result<Json<Value>, StatusCode> {
    shared.record("PUT", "/reorder".to_string(), body.clone())?;
    let request: ReorderRequest =
        serde_json::from_value(body).map_err(|_| StatusCode::BAD_REQUEST)?;
    {
        let mut state = shared.state.lock();
        for entry in &request.tasks {
            if let Some(task) = state.tasks.iter_mut().find(|t| t.id == entry.id) {
                task.order = entry.order;
                task.category = request.category;
            }
        }
    }
    shared.notify();
    Ok(Json(serde_json::json!({ "ok": true })))
}

async fn register_user(
    State(shared): AppState,
    Json(body): Json<Value>,
) -> Result<Json<Value>, StatusCode> {
    shared.record("POST", "/user".to_string(), body.clone())?;
    let user: UserRecord = serde_json::from_value(body).map_err(|_| StatusCode::BAD_REQUEST)?;
    shared.state.lock().users.push(user);
    Ok(Json(serde_json::json!({ "ok": true })))
}

// --- Socket.IO push endpoint ---

async fn socket_io(ws: WebSocketUpgrade, State(shared): AppState) -> impl IntoResponse {
    ws.on_upgrade(move |socket| serve_socket(socket, shared))
}

async fn serve_socket(mut socket: WebSocket, shared: Arc<Shared>) {
    let mut control = shared.push.subscribe();

    let open = encode_frame(&PushFrame::Open(OpenParams {
        sid: "fake-sid".to_string(),
        ping_interval: 25_000,
        ping_timeout: 20_000,
    }));
    if socket.send(Message::Text(open.into())).await.is_err() {
        return;
    }

    // Wait for the namespace join.
    loop {
        match socket.recv().await {
            Some(Ok(Message::Text(text))) if text.as_str() == "40" => break,
            Some(Ok(_)) => {}
            _ => return,
        }
    }
    // Count before acking so a client that saw the ack also sees the count.
    {
        let mut state = shared.state.lock();
        state.handshakes += 1;
        state.active_sockets += 1;
    }
    if socket
        .send(Message::Text(r#"40{"sid":"fake-nsp"}"#.into()))
        .await
        .is_err()
    {
        shared.state.lock().active_sockets -= 1;
        return;
    }

    loop {
        tokio::select! {
            msg = socket.recv() => match msg {
                Some(Ok(Message::Text(text))) => {
                    if text.as_str() == "3" {
                        shared.state.lock().pongs += 1;
                    }
                }
                Some(Ok(Message::Close(_)) | Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
            ctl = control.recv() => match ctl {
                Ok(Control::Frame(text)) => {
                    if socket.send(Message::Text(text.into())).await.is_err() {
                        break;
                    }
                }
                Ok(Control::Drop) => {
                    let _ = socket.send(Message::Close(None)).await;
                    break;
                }
                Err(broadcast::error::RecvError::Lagged(_)) => {}
                Err(broadcast::error::RecvError::Closed) => break,
            },
        }
    }

    shared.state.lock().active_sockets -= 1;
}
