// Copyright (c) 2025 sbksba
//
// This software is licensed under the terms of the MIT License.
// See the LICENSE file in the project root for the full license text.

//! An in-process stand-in for the task REST API, plus shared fixtures.
#![allow(dead_code)]

use axum::{
    Router,
    extract::{Json, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use chrono::Utc;
use client::{ApiConfig, Priority, Status, Task, TaskDraft};
use parking_lot::Mutex;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tower_http::trace::TraceLayer;
use tracing::{debug, info};

/// Installs a test subscriber; honours `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// What the fake server holds.
#[derive(Debug, Default)]
pub struct Store {
    next_id: i64,
    tasks: Vec<Task>,
}

impl Store {
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    fn insert(&mut self, draft: TaskDraft) -> Task {
        self.next_id += 1;
        let now = Utc::now();
        let task = Task {
            id: self.next_id,
            title: draft.title,
            description: draft.description,
            completed: draft.status == Status::Done,
            priority: draft.priority,
            status: draft.status,
            created_at: Some(now),
            updated_at: Some(now),
        };
        self.tasks.push(task.clone());
        task
    }
}

pub type SharedStore = Arc<Mutex<Store>>;

/// A running fake server.
pub struct FakeTaskServer {
    pub addr: SocketAddr,
    pub store: SharedStore,
}

impl FakeTaskServer {
    /// Starts the server on an ephemeral port, holding one task per draft.
    pub async fn start(seed: Vec<TaskDraft>) -> Self {
        init_tracing();

        let mut store = Store::default();
        for draft in seed {
            store.insert(draft);
        }
        let store = Arc::new(Mutex::new(store));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind fake task server");
        let addr = listener.local_addr().expect("Failed to read local address");
        let app = create_router(store.clone());
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("fake task server stopped");
        });
        info!("Fake task server listens on http://{}", addr);

        Self { addr, store }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}/api/tasks", self.addr)
    }

    pub fn config(&self) -> ApiConfig {
        ApiConfig::with_base_url(self.base_url())
    }

    pub fn tasks(&self) -> Vec<Task> {
        self.store.lock().tasks().to_vec()
    }
}

pub fn draft(title: &str, priority: Priority, status: Status) -> TaskDraft {
    TaskDraft {
        title: title.to_string(),
        description: String::new(),
        priority,
        status,
    }
}

/// A base URL nothing listens on.
pub async fn unreachable_base_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}/api/tasks", addr)
}

/// Serves `body` as a JSON 200 to the first request, then drops every later
/// connection without answering.
pub async fn answer_once_then_drop(body: String) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        if let Ok((mut socket, _)) = listener.accept().await {
            let mut buf = [0u8; 4096];
            let _ = socket.read(&mut buf).await;
            let response = format!(
                "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                body.len(),
                body
            );
            let _ = socket.write_all(response.as_bytes()).await;
            let _ = socket.shutdown().await;
        }
        while let Ok((socket, _)) = listener.accept().await {
            drop(socket);
        }
    });
    format!("http://{}/api/tasks", addr)
}

/// Answers every request with a 500 whose announced body is cut off before
/// its declared length, so reading the body fails.
pub async fn answer_with_truncated_error() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let mut buf = [0u8; 4096];
            let _ = socket.read(&mut buf).await;
            let response = "HTTP/1.1 500 Internal Server Error\r\ncontent-type: application/json\r\ncontent-length: 64\r\nconnection: close\r\n\r\n{\"message\":";
            let _ = socket.write_all(response.as_bytes()).await;
            let _ = socket.shutdown().await;
        }
    });
    format!("http://{}/api/tasks", addr)
}

fn create_router(store: SharedStore) -> Router {
    Router::new()
        .route("/api/tasks", get(list_tasks).post(create_task))
        .route("/api/tasks/completed", get(list_completed))
        .route("/api/tasks/status/{status}", get(list_by_status))
        .route(
            "/api/tasks/{id}",
            get(get_task).put(update_task).delete(delete_task),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(store)
}

async fn list_tasks(State(store): State<SharedStore>) -> Json<Vec<Task>> {
    Json(store.lock().tasks.clone())
}

async fn list_by_status(
    State(store): State<SharedStore>,
    Path(status): Path<Status>,
) -> Json<Vec<Task>> {
    let tasks = store
        .lock()
        .tasks
        .iter()
        .filter(|t| t.status == status)
        .cloned()
        .collect();
    Json(tasks)
}

async fn list_completed(State(store): State<SharedStore>) -> Json<Vec<Task>> {
    let tasks = store
        .lock()
        .tasks
        .iter()
        .filter(|t| t.completed)
        .cloned()
        .collect();
    Json(tasks)
}

async fn get_task(
    State(store): State<SharedStore>,
    Path(id): Path<i64>,
) -> Result<Json<Task>, AppError> {
    store
        .lock()
        .tasks
        .iter()
        .find(|t| t.id == id)
        .cloned()
        .map(Json)
        .ok_or_else(|| AppError::not_found(id))
}

async fn create_task(
    State(store): State<SharedStore>,
    Json(payload): Json<TaskDraft>,
) -> Result<(StatusCode, Json<Task>), AppError> {
    if payload.title.trim().is_empty() {
        return Err(AppError::new(StatusCode::BAD_REQUEST, "Title is required"));
    }
    let task = store.lock().insert(payload);
    debug!("Fake server created task {}", task.id);
    Ok((StatusCode::CREATED, Json(task)))
}

async fn update_task(
    State(store): State<SharedStore>,
    Path(id): Path<i64>,
    Json(payload): Json<TaskDraft>,
) -> Result<Json<Task>, AppError> {
    let mut store = store.lock();
    let task = store
        .tasks
        .iter_mut()
        .find(|t| t.id == id)
        .ok_or_else(|| AppError::not_found(id))?;
    task.title = payload.title;
    task.description = payload.description;
    task.priority = payload.priority;
    task.status = payload.status;
    task.completed = payload.status == Status::Done;
    task.updated_at = Some(Utc::now());
    Ok(Json(task.clone()))
}

async fn delete_task(
    State(store): State<SharedStore>,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    let mut store = store.lock();
    let before = store.tasks.len();
    store.tasks.retain(|t| t.id != id);
    if store.tasks.len() == before {
        return Err(AppError::not_found(id));
    }
    Ok(StatusCode::NO_CONTENT)
}

struct AppError {
    code: StatusCode,
    message: String,
}

impl AppError {
    fn new(code: StatusCode, message: &str) -> Self {
        Self {
            code,
            message: message.to_string(),
        }
    }

    fn not_found(id: i64) -> Self {
        Self::new(
            StatusCode::NOT_FOUND,
            &format!("Task not found with id: {}", id),
        )
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (
            self.code,
            Json(serde_json::json!({ "message": self.message })),
        )
            .into_response()
    }
}
