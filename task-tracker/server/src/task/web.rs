use askama::Template;
use axum::{
    Form, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
};
use serde::Deserialize;
use std::sync::Arc;

use crate::task::{Task, TaskInput, TaskService, TaskServiceError, TaskState};

/// Fields posted by the create and edit forms.
///
/// An unchecked checkbox is not submitted at all, so `completed` defaults to false.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct TaskForm {
    #[serde(default)]
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    completed: bool,
}

impl From<TaskForm> for TaskInput {
    fn from(form: TaskForm) -> Self {
        let description = Some(form.description).filter(|text| !text.trim().is_empty());
        Self {
            title: form.title,
            description,
            completed: form.completed,
        }
    }
}

impl From<&Task> for TaskForm {
    fn from(task: &Task) -> Self {
        Self {
            title: task.title().to_string(),
            description: task.description().unwrap_or_default().to_string(),
            completed: task.is_completed(),
        }
    }
}

/// A task prepared for display in the list page.
#[derive(Debug)]
struct TaskRow {
    id: i32,
    title: String,
    description: String,
    completed: bool,
    created_at: String,
}

impl From<Task> for TaskRow {
    fn from(task: Task) -> Self {
        Self {
            id: task.id().unwrap_or_default(),
            title: task.title().to_string(),
            description: task.description().unwrap_or_default().to_string(),
            completed: task.is_completed(),
            created_at: task.created_at().format("%Y-%m-%d %H:%M").to_string(),
        }
    }
}

/// Custom error type for task page handlers.
#[derive(Debug, thiserror::Error)]
enum TaskPageError {
    /// Represents an error during template rendering.
    #[error("Template rendering failed")]
    Template(#[from] askama::Error),
    /// Represents a task service error.
    #[error("Task service error")]
    Service(#[from] TaskServiceError),
}

impl IntoResponse for TaskPageError {
    fn into_response(self) -> Response {
        let (status_code, user_facing_error_message) = match self {
            // Stale links to a deleted task just land back on the list.
            TaskPageError::Service(TaskServiceError::NotFound(_)) => {
                return Redirect::to("/").into_response();
            }
            TaskPageError::Service(TaskServiceError::Validation(_)) => (
                StatusCode::BAD_REQUEST,
                "The submitted task is not valid. Please check the form and try again.",
            ),
            err => {
                tracing::error!("Task page failed: {:?}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An unexpected error occurred while processing your request. Please try again later.",
                )
            }
        };

        let error_template = ErrorMessageTemplate::new(user_facing_error_message.to_string());
        let Ok(rendered) = error_template.render() else {
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        };
        (status_code, Html(rendered)).into_response()
    }
}

#[derive(Template)]
#[template(path = "tasks/index.html")]
struct IndexTemplate {
    tasks: Vec<TaskRow>,
    completed_count: u64,
    pending_count: u64,
}

#[derive(Template)]
#[template(path = "tasks/create.html")]
struct CreateTaskTemplate {
    form: TaskForm,
    errors: Vec<String>,
}

impl CreateTaskTemplate {
    pub fn new(form: TaskForm, errors: Vec<String>) -> Self {
        Self { form, errors }
    }
}

#[derive(Template)]
#[template(path = "tasks/edit.html")]
struct EditTaskTemplate {
    id: i32,
    form: TaskForm,
    errors: Vec<String>,
}

impl EditTaskTemplate {
    pub fn new(id: i32, form: TaskForm, errors: Vec<String>) -> Self {
        Self { id, form, errors }
    }
}

#[derive(Template)]
#[template(path = "tasks/error_message.html")]
struct ErrorMessageTemplate {
    message: String,
}

impl ErrorMessageTemplate {
    pub fn new(message: String) -> Self {
        Self { message }
    }
}

/// Handler for GET / that lists every task.
#[tracing::instrument(skip(state))]
async fn index_handler(
    State(state): State<Arc<TaskState>>,
) -> Result<Html<String>, TaskPageError> {
    let task_service = TaskService::from_db(&state.db);
    let tasks = task_service.get_all().await?;
    let template = IndexTemplate {
        completed_count: task_service.count_completed_tasks().await?,
        pending_count: task_service.count_pending_tasks().await?,
        tasks: tasks.into_iter().map(TaskRow::from).collect(),
    };
    template.render().map(Html).map_err(TaskPageError::from)
}

/// Handler for serving the create task form.
#[tracing::instrument]
async fn new_task_form_handler() -> Result<Html<String>, TaskPageError> {
    let template = CreateTaskTemplate::new(TaskForm::default(), Vec::new());
    template.render().map(Html).map_err(TaskPageError::from)
}

/// Handler for POST /tasks. Redirects to the list, or re-renders the form with errors.
#[tracing::instrument(skip(state))]
async fn create_task_handler(
    State(state): State<Arc<TaskState>>,
    Form(form): Form<TaskForm>,
) -> Result<Response, TaskPageError> {
    let task_service = TaskService::from_db(&state.db);
    let input = TaskInput::from(form.clone());

    match task_service.create(input).await {
        Ok(_) => Ok(Redirect::to("/").into_response()),
        Err(TaskServiceError::Validation(errors)) => {
            let template = CreateTaskTemplate::new(form, errors.into_messages());
            let rendered = template.render()?;
            Ok((StatusCode::BAD_REQUEST, Html(rendered)).into_response())
        }
        Err(err) => Err(TaskPageError::Service(err)),
    }
}

/// Handler for serving the edit form of an existing task.
#[tracing::instrument(skip(state))]
async fn edit_task_form_handler(
    State(state): State<Arc<TaskState>>,
    Path(id): Path<i32>,
) -> Result<Html<String>, TaskPageError> {
    let task_service = TaskService::from_db(&state.db);
    let task = task_service.get_by_id(id).await?;
    let template = EditTaskTemplate::new(id, TaskForm::from(&task), Vec::new());
    template.render().map(Html).map_err(TaskPageError::from)
}

/// Handler for POST /tasks/update/{id}.
#[tracing::instrument(skip(state))]
async fn update_task_handler(
    State(state): State<Arc<TaskState>>,
    Path(id): Path<i32>,
    Form(form): Form<TaskForm>,
) -> Result<Response, TaskPageError> {
    let task_service = TaskService::from_db(&state.db);
    let input = TaskInput::from(form.clone());

    match task_service.update(id, input).await {
        Ok(_) => Ok(Redirect::to("/").into_response()),
        Err(TaskServiceError::Validation(errors)) => {
            let template = EditTaskTemplate::new(id, form, errors.into_messages());
            let rendered = template.render()?;
            Ok((StatusCode::BAD_REQUEST, Html(rendered)).into_response())
        }
        Err(err) => Err(TaskPageError::Service(err)),
    }
}

/// Handler for the delete link of a task.
#[tracing::instrument(skip(state))]
async fn delete_task_handler(
    State(state): State<Arc<TaskState>>,
    Path(id): Path<i32>,
) -> Result<Redirect, TaskPageError> {
    let task_service = TaskService::from_db(&state.db);
    task_service.delete(id).await?;
    Ok(Redirect::to("/"))
}

/// Creates and returns the router for the server-rendered task pages.
pub fn create_task_router(state: Arc<TaskState>) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/tasks", post(create_task_handler))
        .route("/tasks/new", get(new_task_form_handler))
        .route("/tasks/edit/{id}", get(edit_task_form_handler))
        .route("/tasks/update/{id}", post(update_task_handler))
        .route("/tasks/delete/{id}", get(delete_task_handler))
        .with_state(state)
}
