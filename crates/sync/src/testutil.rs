//! In-process stub backend for tests
//!
//! Serves the backend REST surface over a real socket so the client and
//! reconciler are exercised through reqwest end to end. Failure
//! injection flags let tests drive the error paths deterministically.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use uuid::Uuid;

use td_core::task::Task;

use crate::session::{Credential, User};

const TOKEN: &str = "stub-token";

/// Build a task fixture without timestamps
pub fn task(id: &str, position: i64, done: bool) -> Task {
    Task {
        id: id.to_string(),
        title: format!("Task {}", id),
        description: String::new(),
        done,
        position,
        created_at: None,
        updated_at: None,
    }
}

/// A base URL nothing listens on, for transport-failure tests
pub async fn dead_endpoint() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}

#[derive(Debug, Serialize, Deserialize)]
struct ErrorBody {
    error: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CredentialsPayload {
    username: String,
    password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AuthPayload {
    token: String,
    user: User,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TaskPayload {
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    position: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReorderPayload {
    task_ids: Vec<String>,
}

#[derive(Default)]
struct StubState {
    tasks: RwLock<Vec<Task>>,
    reorder_calls: RwLock<Vec<Vec<String>>>,
    requests: AtomicUsize,
    fail_reorder: AtomicBool,
    fail_list: AtomicBool,
    fail_next_update: AtomicBool,
    list_delay: Mutex<Option<Duration>>,
}

#[derive(Clone, Default)]
struct Stub {
    state: Arc<StubState>,
}

/// Handle to a running stub backend
pub struct StubHandle {
    base_url: String,
    stub: Stub,
}

impl StubHandle {
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn token(&self) -> String {
        TOKEN.to_string()
    }

    /// A credential the stub accepts, as login would have returned it
    pub fn credential(&self) -> Credential {
        Credential {
            token: TOKEN.to_string(),
            user: User {
                id: "u1".to_string(),
                username: "alice".to_string(),
            },
        }
    }

    /// Replace the stored task list
    pub async fn seed(&self, tasks: Vec<Task>) {
        *self.stub.state.tasks.write().await = tasks;
    }

    /// Every id sequence received on /tasks/reorder, in call order
    pub async fn reorder_calls(&self) -> Vec<Vec<String>> {
        self.stub.state.reorder_calls.read().await.clone()
    }

    /// Total requests served so far
    pub fn request_count(&self) -> usize {
        self.stub.state.requests.load(Ordering::SeqCst)
    }

    pub fn fail_reorder(&self, fail: bool) {
        self.stub.state.fail_reorder.store(fail, Ordering::SeqCst);
    }

    pub fn fail_list(&self, fail: bool) {
        self.stub.state.fail_list.store(fail, Ordering::SeqCst);
    }

    /// Make the next update call fail with a server fault
    pub fn fail_next_update(&self) {
        self.stub
            .state
            .fail_next_update
            .store(true, Ordering::SeqCst);
    }

    /// Delay list responses, for in-flight-result tests
    pub fn delay_list(&self, delay: Duration) {
        *self.stub.state.list_delay.lock().unwrap() = Some(delay);
    }
}

/// Start a stub backend on an ephemeral port
pub async fn spawn() -> StubHandle {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "td_sync=debug".into()),
        )
        .with_test_writer()
        .try_init();

    let stub = Stub::default();
    let router = Router::new()
        .route("/login", post(login))
        .route("/register", post(register))
        .route("/tasks", get(list_tasks).post(create_task))
        .route("/tasks/reorder", put(reorder_tasks))
        .route("/tasks/{id}", put(update_task).delete(delete_task))
        .with_state(stub.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    StubHandle {
        base_url: format!("http://{}", addr),
        stub,
    }
}

type StubError = (StatusCode, Json<ErrorBody>);

fn stub_error(status: StatusCode, error: impl Into<String>) -> StubError {
    (
        status,
        Json(ErrorBody {
            error: error.into(),
        }),
    )
}

fn authorize(headers: &HeaderMap) -> Result<(), StubError> {
    let expected = format!("Bearer {}", TOKEN);
    match headers.get("authorization").and_then(|v| v.to_str().ok()) {
        Some(value) if value == expected => Ok(()),
        _ => Err(stub_error(
            StatusCode::UNAUTHORIZED,
            "Missing or invalid token",
        )),
    }
}

async fn login(
    State(stub): State<Stub>,
    Json(payload): Json<CredentialsPayload>,
) -> Result<Json<AuthPayload>, StubError> {
    stub.state.requests.fetch_add(1, Ordering::SeqCst);
    if payload.username != "alice" || payload.password != "secret" {
        return Err(stub_error(StatusCode::UNAUTHORIZED, "Invalid credentials"));
    }
    Ok(Json(AuthPayload {
        token: TOKEN.to_string(),
        user: User {
            id: "u1".to_string(),
            username: payload.username,
        },
    }))
}

async fn register(
    State(stub): State<Stub>,
    Json(payload): Json<CredentialsPayload>,
) -> Result<Json<AuthPayload>, StubError> {
    stub.state.requests.fetch_add(1, Ordering::SeqCst);
    if payload.username.trim().is_empty() {
        return Err(stub_error(StatusCode::BAD_REQUEST, "Username cannot be empty"));
    }
    Ok(Json(AuthPayload {
        token: TOKEN.to_string(),
        user: User {
            id: Uuid::new_v4().to_string(),
            username: payload.username,
        },
    }))
}

async fn list_tasks(
    State(stub): State<Stub>,
    headers: HeaderMap,
) -> Result<Json<Vec<Task>>, StubError> {
    stub.state.requests.fetch_add(1, Ordering::SeqCst);
    authorize(&headers)?;
    if stub.state.fail_list.load(Ordering::SeqCst) {
        return Err(stub_error(StatusCode::INTERNAL_SERVER_ERROR, "List failed"));
    }
    let delay = *stub.state.list_delay.lock().unwrap();
    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }

    let mut tasks = stub.state.tasks.read().await.clone();
    tasks.sort_by_key(|t| t.position);
    Ok(Json(tasks))
}

async fn create_task(
    State(stub): State<Stub>,
    headers: HeaderMap,
    Json(payload): Json<TaskPayload>,
) -> Result<Json<Task>, StubError> {
    stub.state.requests.fetch_add(1, Ordering::SeqCst);
    authorize(&headers)?;
    if payload.title.trim().is_empty() {
        return Err(stub_error(StatusCode::BAD_REQUEST, "Title cannot be empty"));
    }

    let now = Utc::now();
    let task = Task {
        id: Uuid::new_v4().to_string(),
        title: payload.title,
        description: payload.description,
        done: payload.done,
        position: payload.position,
        created_at: Some(now),
        updated_at: Some(now),
    };
    stub.state.tasks.write().await.push(task.clone());
    Ok(Json(task))
}

async fn update_task(
    State(stub): State<Stub>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(payload): Json<TaskPayload>,
) -> Result<Json<Task>, StubError> {
    stub.state.requests.fetch_add(1, Ordering::SeqCst);
    authorize(&headers)?;
    if stub.state.fail_next_update.swap(false, Ordering::SeqCst) {
        return Err(stub_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Update failed",
        ));
    }

    let mut tasks = stub.state.tasks.write().await;
    let Some(task) = tasks.iter_mut().find(|t| t.id == id) else {
        return Err(stub_error(
            StatusCode::NOT_FOUND,
            format!("Task {} not found", id),
        ));
    };
    task.title = payload.title;
    task.description = payload.description;
    task.done = payload.done;
    task.position = payload.position;
    task.updated_at = Some(Utc::now());
    Ok(Json(task.clone()))
}

async fn delete_task(
    State(stub): State<Stub>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<StatusCode, StubError> {
    stub.state.requests.fetch_add(1, Ordering::SeqCst);
    authorize(&headers)?;

    let mut tasks = stub.state.tasks.write().await;
    let before = tasks.len();
    tasks.retain(|t| t.id != id);
    if tasks.len() == before {
        return Err(stub_error(
            StatusCode::NOT_FOUND,
            format!("Task {} not found", id),
        ));
    }
    Ok(StatusCode::NO_CONTENT)
}

async fn reorder_tasks(
    State(stub): State<Stub>,
    headers: HeaderMap,
    Json(payload): Json<ReorderPayload>,
) -> Result<StatusCode, StubError> {
    stub.state.requests.fetch_add(1, Ordering::SeqCst);
    authorize(&headers)?;
    if stub.state.fail_reorder.load(Ordering::SeqCst) {
        return Err(stub_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Reorder failed",
        ));
    }

    stub.state
        .reorder_calls
        .write()
        .await
        .push(payload.task_ids.clone());

    let mut tasks = stub.state.tasks.write().await;
    for (index, id) in payload.task_ids.iter().enumerate() {
        if let Some(task) = tasks.iter_mut().find(|t| &t.id == id) {
            task.position = index as i64;
        }
    }
    tasks.sort_by_key(|t| t.position);
    Ok(StatusCode::OK)
}
