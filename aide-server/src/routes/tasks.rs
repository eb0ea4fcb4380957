//! Task-manager CRUD.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use tracing::info;
use utoipa::OpenApi;

use crate::entities::{NewTask, TaskRecord, TaskStore};
use crate::error::ServerError;
use crate::extract::{ApiJson, ApiPath};
use crate::routes::required_text;
use crate::schemas::MessageBody;
use crate::schemas::task::{CreateTaskRequest, TaskResponse, UpdateTaskRequest};
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(
    paths(list_tasks, create_task, get_task, update_task, delete_task),
    components(schemas(CreateTaskRequest, UpdateTaskRequest, TaskResponse, MessageBody))
)]
pub struct TasksApi;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/tasks", get(list_tasks).post(create_task))
        .route("/tasks/{id}", get(get_task).put(update_task).delete(delete_task))
}

async fn find_task(state: &AppState, id: i64) -> Result<TaskRecord, ServerError> {
    state
        .store
        .get_task(id)
        .await?
        .ok_or_else(|| ServerError::NotFound(format!("Task {id} not found")))
}

/// Apply a partial update; `None` when nothing actually changes.
fn merge_task(existing: &TaskRecord, req: UpdateTaskRequest) -> Result<Option<TaskRecord>, ServerError> {
    let mut task = existing.clone();
    if let Some(title) = req.title {
        task.title = required_text(Some(title), "Title is required")?;
    }
    if let Some(description) = req.description {
        task.description = Some(description);
    }
    if let Some(completed) = req.completed {
        task.completed = completed;
    }
    Ok((task != *existing).then_some(task))
}

#[utoipa::path(
    get,
    path = "/api/tasks",
    tag = "tasks",
    responses(
        (status = 200, description = "All tasks, newest first", body = Vec<TaskResponse>),
        (status = 500, description = "Backend error"),
    )
)]
pub async fn list_tasks(State(state): State<Arc<AppState>>) -> Result<Json<Vec<TaskResponse>>, ServerError> {
    let tasks = state.store.list_tasks().await?;
    Ok(Json(tasks.iter().map(TaskRecord::to_response).collect()))
}

#[utoipa::path(
    post,
    path = "/api/tasks",
    tag = "tasks",
    request_body = CreateTaskRequest,
    responses(
        (status = 201, description = "Task created", body = TaskResponse),
        (status = 400, description = "Missing or blank title"),
        (status = 500, description = "Backend error"),
    )
)]
pub async fn create_task(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<CreateTaskRequest>,
) -> Result<(StatusCode, Json<TaskResponse>), ServerError> {
    let title = required_text(req.title, "Title is required")?;
    let task = state
        .store
        .insert_task(NewTask {
            title,
            description: req.description,
            completed: req.completed.unwrap_or(false),
        })
        .await?;
    info!(task_id = task.id, "task created");
    Ok((StatusCode::CREATED, Json(task.to_response())))
}

#[utoipa::path(
    get,
    path = "/api/tasks/{id}",
    tag = "tasks",
    params(("id" = i64, Path, description = "Task id")),
    responses(
        (status = 200, description = "Task found", body = TaskResponse),
        (status = 404, description = "No such task"),
    )
)]
pub async fn get_task(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<TaskResponse>, ServerError> {
    Ok(Json(find_task(&state, id).await?.to_response()))
}

#[utoipa::path(
    put,
    path = "/api/tasks/{id}",
    tag = "tasks",
    params(("id" = i64, Path, description = "Task id")),
    request_body = UpdateTaskRequest,
    responses(
        (status = 200, description = "Task updated", body = TaskResponse),
        (status = 400, description = "Blank title"),
        (status = 404, description = "No such task"),
    )
)]
pub async fn update_task(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(req): ApiJson<UpdateTaskRequest>,
) -> Result<Json<TaskResponse>, ServerError> {
    let existing = find_task(&state, id).await?;
    let Some(mut task) = merge_task(&existing, req)? else {
        return Ok(Json(existing.to_response()));
    };
    task.updated_at = Utc::now();
    state.store.update_task(&task).await?;
    info!(task_id = id, completed = task.completed, "task updated");
    Ok(Json(task.to_response()))
}

#[utoipa::path(
    delete,
    path = "/api/tasks/{id}",
    tag = "tasks",
    params(("id" = i64, Path, description = "Task id")),
    responses(
        (status = 200, description = "Task deleted", body = MessageBody),
        (status = 404, description = "No such task"),
    )
)]
pub async fn delete_task(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<MessageBody>, ServerError> {
    if !state.store.delete_task(id).await? {
        return Err(ServerError::NotFound(format!("Task {id} not found")));
    }
    info!(task_id = id, "task deleted");
    Ok(Json(MessageBody::new("Task deleted successfully")))
}
