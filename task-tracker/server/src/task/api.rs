use crate::task::{Task, TaskInput, TaskService, TaskServiceError, TaskState, TaskStats};
use axum::{
    Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, patch},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

/// JSON representation of a Task for API responses.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TaskJson {
    /// Unique identifier, assigned by the server
    id: Option<i32>,
    /// Short title of the task
    title: String,
    /// Optional longer description
    description: Option<String>,
    /// Whether the task is done
    completed: bool,
    /// Creation time, assigned by the server
    created_at: DateTime<Utc>,
}

impl From<Task> for TaskJson {
    fn from(task: Task) -> Self {
        Self {
            id: task.id(),
            title: task.title().to_string(),
            description: task.description().map(str::to_string),
            completed: task.is_completed(),
            created_at: task.created_at(),
        }
    }
}

/// Request body for creating or updating a task. `id` and `createdAt` are ignored if sent.
#[derive(Debug, Deserialize, ToSchema)]
pub struct TaskRequest {
    /// Required, must not be blank. Absent or null counts as blank.
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    completed: bool,
}

impl From<TaskRequest> for TaskInput {
    fn from(request: TaskRequest) -> Self {
        Self {
            title: request.title.unwrap_or_default(),
            description: request.description,
            completed: request.completed,
        }
    }
}

/// Aggregate counts returned by the stats endpoint.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TaskStatsJson {
    total: u64,
    completed: u64,
    pending: u64,
}

impl From<TaskStats> for TaskStatsJson {
    fn from(stats: TaskStats) -> Self {
        Self {
            total: stats.total,
            completed: stats.completed,
            pending: stats.pending,
        }
    }
}

/// JSON response for a failed request.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    status: u16,
    error: String,
}

impl ErrorResponse {
    pub fn new(status: StatusCode, error: String) -> Self {
        Self {
            status: status.as_u16(),
            error,
        }
    }
}

/// JSON response for a request whose body failed validation.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ValidationErrorResponse {
    status: u16,
    errors: Vec<String>,
}

/// Maps service errors onto API status codes and bodies.
#[derive(Debug)]
pub struct ApiError(TaskServiceError);

impl From<TaskServiceError> for ApiError {
    fn from(err: TaskServiceError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let message = self.0.to_string();
        match self.0 {
            TaskServiceError::NotFound(_) => (
                StatusCode::NOT_FOUND,
                Json(ErrorResponse::new(StatusCode::NOT_FOUND, message)),
            )
                .into_response(),
            TaskServiceError::Validation(errors) => (
                StatusCode::BAD_REQUEST,
                Json(ValidationErrorResponse {
                    status: StatusCode::BAD_REQUEST.as_u16(),
                    errors: errors.into_messages(),
                }),
            )
                .into_response(),
            TaskServiceError::Database(err) => {
                tracing::error!("Task request failed: {}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ErrorResponse::new(
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "An unexpected error occurred while processing your request".to_string(),
                    )),
                )
                    .into_response()
            }
        }
    }
}

fn to_json(tasks: Vec<Task>) -> Json<Vec<TaskJson>> {
    Json(tasks.into_iter().map(TaskJson::from).collect())
}

/// Handler for GET /api/tasks - Returns all tasks.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    get,
    path = "/api/tasks",
    responses(
        (status = 200, description = "Successfully retrieved tasks", body = [TaskJson]),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "Tasks"
)]
pub async fn list_tasks_handler(
    State(state): State<Arc<TaskState>>,
) -> Result<Json<Vec<TaskJson>>, ApiError> {
    let service = TaskService::from_db(&state.db);
    Ok(to_json(service.get_all().await?))
}

/// Handler for GET /api/tasks/{id} - Returns a single task.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    get,
    path = "/api/tasks/{id}",
    params(("id" = i32, Path, description = "Task ID")),
    responses(
        (status = 200, description = "Task found", body = TaskJson),
        (status = 404, description = "No task with this ID", body = ErrorResponse)
    ),
    tag = "Tasks"
)]
pub async fn get_task_handler(
    State(state): State<Arc<TaskState>>,
    Path(id): Path<i32>,
) -> Result<Json<TaskJson>, ApiError> {
    let service = TaskService::from_db(&state.db);
    Ok(Json(service.get_by_id(id).await?.into()))
}

/// Handler for POST /api/tasks - Creates a task.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    post,
    path = "/api/tasks",
    request_body = TaskRequest,
    responses(
        (status = 201, description = "Task created", body = TaskJson),
        (status = 400, description = "Validation failed", body = ValidationErrorResponse)
    ),
    tag = "Tasks"
)]
pub async fn create_task_handler(
    State(state): State<Arc<TaskState>>,
    Json(request): Json<TaskRequest>,
) -> Result<(StatusCode, Json<TaskJson>), ApiError> {
    let service = TaskService::from_db(&state.db);
    let created = service.create(request.into()).await?;
    Ok((StatusCode::CREATED, Json(created.into())))
}

/// Handler for PUT /api/tasks/{id} - Replaces the editable fields of a task.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    put,
    path = "/api/tasks/{id}",
    params(("id" = i32, Path, description = "Task ID")),
    request_body = TaskRequest,
    responses(
        (status = 200, description = "Task updated", body = TaskJson),
        (status = 400, description = "Validation failed", body = ValidationErrorResponse),
        (status = 404, description = "No task with this ID", body = ErrorResponse)
    ),
    tag = "Tasks"
)]
pub async fn update_task_handler(
    State(state): State<Arc<TaskState>>,
    Path(id): Path<i32>,
    Json(request): Json<TaskRequest>,
) -> Result<Json<TaskJson>, ApiError> {
    let service = TaskService::from_db(&state.db);
    Ok(Json(service.update(id, request.into()).await?.into()))
}

/// Handler for DELETE /api/tasks/{id}.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    delete,
    path = "/api/tasks/{id}",
    params(("id" = i32, Path, description = "Task ID")),
    responses(
        (status = 204, description = "Task deleted"),
        (status = 404, description = "No task with this ID", body = ErrorResponse)
    ),
    tag = "Tasks"
)]
pub async fn delete_task_handler(
    State(state): State<Arc<TaskState>>,
    Path(id): Path<i32>,
) -> Result<StatusCode, ApiError> {
    let service = TaskService::from_db(&state.db);
    service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Handler for GET /api/tasks/completed.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    get,
    path = "/api/tasks/completed",
    responses((status = 200, description = "Completed tasks", body = [TaskJson])),
    tag = "Tasks"
)]
pub async fn completed_tasks_handler(
    State(state): State<Arc<TaskState>>,
) -> Result<Json<Vec<TaskJson>>, ApiError> {
    let service = TaskService::from_db(&state.db);
    Ok(to_json(service.get_completed_tasks().await?))
}

/// Handler for GET /api/tasks/pending.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    get,
    path = "/api/tasks/pending",
    responses((status = 200, description = "Pending tasks", body = [TaskJson])),
    tag = "Tasks"
)]
pub async fn pending_tasks_handler(
    State(state): State<Arc<TaskState>>,
) -> Result<Json<Vec<TaskJson>>, ApiError> {
    let service = TaskService::from_db(&state.db);
    Ok(to_json(service.get_pending_tasks().await?))
}

/// Handler for PATCH /api/tasks/{id}/complete.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    patch,
    path = "/api/tasks/{id}/complete",
    params(("id" = i32, Path, description = "Task ID")),
    responses(
        (status = 200, description = "Task marked as completed", body = TaskJson),
        (status = 404, description = "No task with this ID", body = ErrorResponse)
    ),
    tag = "Tasks"
)]
pub async fn mark_completed_handler(
    State(state): State<Arc<TaskState>>,
    Path(id): Path<i32>,
) -> Result<Json<TaskJson>, ApiError> {
    let service = TaskService::from_db(&state.db);
    Ok(Json(service.mark_as_completed(id).await?.into()))
}

/// Handler for PATCH /api/tasks/{id}/pending.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    patch,
    path = "/api/tasks/{id}/pending",
    params(("id" = i32, Path, description = "Task ID")),
    responses(
        (status = 200, description = "Task marked as pending", body = TaskJson),
        (status = 404, description = "No task with this ID", body = ErrorResponse)
    ),
    tag = "Tasks"
)]
pub async fn mark_pending_handler(
    State(state): State<Arc<TaskState>>,
    Path(id): Path<i32>,
) -> Result<Json<TaskJson>, ApiError> {
    let service = TaskService::from_db(&state.db);
    Ok(Json(service.mark_as_pending(id).await?.into()))
}

/// Handler for GET /api/tasks/stats.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    get,
    path = "/api/tasks/stats",
    responses((status = 200, description = "Task counts", body = TaskStatsJson)),
    tag = "Tasks"
)]
pub async fn stats_handler(
    State(state): State<Arc<TaskState>>,
) -> Result<Json<TaskStatsJson>, ApiError> {
    let service = TaskService::from_db(&state.db);
    Ok(Json(service.stats().await?.into()))
}

/// Creates and returns the tasks API router. Paths are relative to `/api`.
pub fn create_api_router(state: Arc<TaskState>) -> Router {
    Router::new()
        .route("/tasks", get(list_tasks_handler).post(create_task_handler))
        .route("/tasks/completed", get(completed_tasks_handler))
        .route("/tasks/pending", get(pending_tasks_handler))
        .route("/tasks/stats", get(stats_handler))
        .route(
            "/tasks/{id}",
            get(get_task_handler)
                .put(update_task_handler)
                .delete(delete_task_handler),
        )
        .route("/tasks/{id}/complete", patch(mark_completed_handler))
        .route("/tasks/{id}/pending", patch(mark_pending_handler))
        .with_state(state)
}
