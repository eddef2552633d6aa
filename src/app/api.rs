//! HTTP surface of the task list.
//!
//! Handlers only extract parameters, call [`Storage`] on the blocking pool
//! and map the outcome to a status code and a JSON body.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, put},
    Json, Router,
};
use std::sync::Arc;
use tracing::error;

use crate::app::error::{StoreError, StoreResult};
use crate::app::models::{CreateTask, DeleteAck, ErrorBody, Task, TaskId, UpdateCompletion};
use crate::app::storage::Storage;

pub type AppState = Arc<Storage>;

pub fn router(storage: AppState) -> Router {
    Router::new()
        .route("/api/tasks", get(list_tasks).post(create_task))
        .route("/api/tasks/{id}", put(update_task).delete(delete_task))
        .with_state(storage)
}

pub struct ApiError {
    status: StatusCode,
    message: &'static str,
}

impl ApiError {
    fn not_found() -> ApiError {
        ApiError {
            status: StatusCode::NOT_FOUND,
            message: "Task not found",
        }
    }

    // Storage failures become 500 with the operation's message, a missing task 404
    fn from_store(err: StoreError, message: &'static str) -> ApiError {
        match err {
            StoreError::TaskNotFound(_) => ApiError::not_found(),
            other => {
                error!(error = %other, "{}", message);
                ApiError {
                    status: StatusCode::INTERNAL_SERVER_ERROR,
                    message,
                }
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.message.to_string(),
        };
        (self.status, Json(body)).into_response()
    }
}

// Run a storage call off the async workers
async fn blocking<T: Send + 'static>(
    storage: &AppState,
    operation: impl FnOnce(&Storage) -> StoreResult<T> + Send + 'static,
) -> StoreResult<T> {
    let storage = storage.clone();
    tokio::task::spawn_blocking(move || operation(&storage))
        .await
        .map_err(StoreError::write)?
}

// Read an id the lenient way: optional sign and leading digits, rest ignored.
// "12abc" is 12; an id without digits matches no task.
pub fn parse_task_id(raw: &str) -> Option<TaskId> {
    let raw = raw.trim_start();
    let (sign, rest) = match raw.strip_prefix('-') {
        Some(rest) => (-1, rest),
        None => (1, raw.strip_prefix('+').unwrap_or(raw)),
    };
    let digits_end = rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len());
    rest[..digits_end]
        .parse::<TaskId>()
        .ok()
        .map(|id| sign * id)
}

pub async fn list_tasks(State(storage): State<AppState>) -> Result<Json<Vec<Task>>, ApiError> {
    blocking(&storage, |storage| storage.list_tasks())
        .await
        .map(Json)
        .map_err(|err| ApiError::from_store(err, "Failed to read tasks"))
}

pub async fn create_task(
    State(storage): State<AppState>,
    Json(request): Json<CreateTask>,
) -> Result<Json<Task>, ApiError> {
    blocking(&storage, move |storage| storage.create_task(&request.text))
        .await
        .map(Json)
        .map_err(|err| ApiError::from_store(err, "Failed to add task"))
}

pub async fn update_task(
    State(storage): State<AppState>,
    Path(raw_id): Path<String>,
    Json(request): Json<UpdateCompletion>,
) -> Result<Json<Task>, ApiError> {
    let Some(id) = parse_task_id(&raw_id) else {
        return Err(ApiError::not_found());
    };
    blocking(&storage, move |storage| {
        storage.set_completed(id, request.completed)
    })
    .await
    .map(Json)
    .map_err(|err| ApiError::from_store(err, "Failed to update task"))
}

pub async fn delete_task(
    State(storage): State<AppState>,
    Path(raw_id): Path<String>,
) -> Result<Json<DeleteAck>, ApiError> {
    let id = parse_task_id(&raw_id);
    blocking(&storage, move |storage| match id {
        Some(id) => storage.delete_task(id),
        // no digits, nothing can match
        None => storage.list_tasks().map(|_| ()),
    })
    .await
    .map(|()| Json(DeleteAck { success: true }))
    .map_err(|err| ApiError::from_store(err, "Failed to delete task"))
}
