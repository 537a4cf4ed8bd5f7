use std::sync::Arc;

use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::task::TaskState;
use crate::task::api::{
    ErrorResponse, TaskJson, TaskRequest, TaskStatsJson, ValidationErrorResponse,
};

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::task::api::list_tasks_handler,
        crate::task::api::get_task_handler,
        crate::task::api::create_task_handler,
        crate::task::api::update_task_handler,
        crate::task::api::delete_task_handler,
        crate::task::api::completed_tasks_handler,
        crate::task::api::pending_tasks_handler,
        crate::task::api::mark_completed_handler,
        crate::task::api::mark_pending_handler,
        crate::task::api::stats_handler,
    ),
    components(schemas(
        TaskJson,
        TaskRequest,
        TaskStatsJson,
        ErrorResponse,
        ValidationErrorResponse
    )),
    tags((name = "Tasks", description = "Create, update, filter and count tasks"))
)]
pub struct ApiDoc;

/// Creates the API routes for JSON API endpoints, plus the Swagger UI describing them.
pub fn create_api_router(task_state: Arc<TaskState>) -> Router {
    let tasks_router = crate::task::api::create_api_router(task_state);
    Router::new()
        .nest("/api", tasks_router)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
