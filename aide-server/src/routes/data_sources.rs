//! Data sources and the context snippets attached to them.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, put};
use axum::{Json, Router};
use chrono::Utc;
use serde_json::json;
use tracing::info;
use utoipa::OpenApi;

use crate::entities::{ContextRecord, DataSourceRecord, DataSourceStore, NewContext, NewDataSource};
use crate::error::ServerError;
use crate::extract::{ApiJson, ApiPath};
use crate::routes::required_text;
use crate::schemas::MessageBody;
use crate::schemas::data_source::{
    ContextResponse, CreateContextRequest, CreateDataSourceRequest, DataSourceResponse,
    UpdateDataSourceRequest,
};
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(
    paths(
        list_data_sources,
        create_data_source,
        update_data_source,
        delete_data_source,
        add_context,
        list_contexts
    ),
    components(schemas(
        CreateDataSourceRequest,
        UpdateDataSourceRequest,
        DataSourceResponse,
        CreateContextRequest,
        ContextResponse,
        MessageBody
    ))
)]
pub struct DataSourcesApi;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/data-sources", get(list_data_sources).post(create_data_source))
        .route("/data-sources/{id}", put(update_data_source).delete(delete_data_source))
        .route("/data-sources/{id}/contexts", get(list_contexts).post(add_context))
}

async fn find_source(state: &AppState, id: i64) -> Result<DataSourceRecord, ServerError> {
    state
        .store
        .get_data_source(id)
        .await?
        .ok_or_else(|| ServerError::NotFound(format!("Data source {id} not found")))
}

/// Apply a partial update; `None` when nothing actually changes.
fn merge_source(
    existing: &DataSourceRecord,
    req: UpdateDataSourceRequest,
) -> Result<Option<DataSourceRecord>, ServerError> {
    if req.is_empty() {
        return Err(ServerError::BadRequest("No data provided".into()));
    }
    let mut source = existing.clone();
    if let Some(name) = req.name {
        source.name = required_text(Some(name), "Name must not be empty")?;
    }
    if let Some(source_type) = req.source_type {
        source.source_type = required_text(Some(source_type), "Type must not be empty")?;
    }
    if let Some(enabled) = req.enabled {
        source.enabled = enabled;
    }
    if let Some(config) = req.config {
        source.config = config;
    }
    Ok((source != *existing).then_some(source))
}

#[utoipa::path(
    get,
    path = "/api/data-sources",
    tag = "data-sources",
    responses(
        (status = 200, description = "All data sources, by name", body = Vec<DataSourceResponse>),
        (status = 500, description = "Backend error"),
    )
)]
pub async fn list_data_sources(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<DataSourceResponse>>, ServerError> {
    let sources = state.store.list_data_sources(false).await?;
    Ok(Json(sources.iter().map(DataSourceRecord::to_response).collect()))
}

#[utoipa::path(
    post,
    path = "/api/data-sources",
    tag = "data-sources",
    request_body = CreateDataSourceRequest,
    responses(
        (status = 201, description = "Data source created", body = DataSourceResponse),
        (status = 400, description = "Missing name or type"),
        (status = 500, description = "Backend error"),
    )
)]
pub async fn create_data_source(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<CreateDataSourceRequest>,
) -> Result<(StatusCode, Json<DataSourceResponse>), ServerError> {
    let name = required_text(req.name, "Name and type are required")?;
    let source_type = required_text(req.source_type, "Name and type are required")?;
    let source = state
        .store
        .create_data_source(NewDataSource {
            name,
            source_type,
            enabled: req.enabled.unwrap_or(true),
            config: req.config.unwrap_or_else(|| json!({})),
        })
        .await?;
    info!(data_source_id = source.id, name = %source.name, "data source created");
    Ok((StatusCode::CREATED, Json(source.to_response())))
}

#[utoipa::path(
    put,
    path = "/api/data-sources/{id}",
    tag = "data-sources",
    params(("id" = i64, Path, description = "Data source id")),
    request_body = UpdateDataSourceRequest,
    responses(
        (status = 200, description = "Data source updated", body = DataSourceResponse),
        (status = 400, description = "No data provided"),
        (status = 404, description = "No such data source"),
    )
)]
pub async fn update_data_source(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(req): ApiJson<UpdateDataSourceRequest>,
) -> Result<Json<DataSourceResponse>, ServerError> {
    let existing = find_source(&state, id).await?;
    let Some(mut source) = merge_source(&existing, req)? else {
        return Ok(Json(existing.to_response()));
    };
    source.updated_at = Utc::now();
    state.store.update_data_source(&source).await?;
    info!(data_source_id = id, enabled = source.enabled, "data source updated");
    Ok(Json(source.to_response()))
}

#[utoipa::path(
    delete,
    path = "/api/data-sources/{id}",
    tag = "data-sources",
    params(("id" = i64, Path, description = "Data source id")),
    responses(
        (status = 200, description = "Data source and its contexts deleted", body = MessageBody),
        (status = 404, description = "No such data source"),
    )
)]
pub async fn delete_data_source(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<MessageBody>, ServerError> {
    if !state.store.delete_data_source(id).await? {
        return Err(ServerError::NotFound(format!("Data source {id} not found")));
    }
    info!(data_source_id = id, "data source deleted");
    Ok(Json(MessageBody::new("Data source deleted successfully")))
}

#[utoipa::path(
    post,
    path = "/api/data-sources/{id}/contexts",
    tag = "data-sources",
    params(("id" = i64, Path, description = "Data source id")),
    request_body = CreateContextRequest,
    responses(
        (status = 201, description = "Context stored", body = ContextResponse),
        (status = 400, description = "Missing content"),
        (status = 404, description = "No such data source"),
    )
)]
pub async fn add_context(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(req): ApiJson<CreateContextRequest>,
) -> Result<(StatusCode, Json<ContextResponse>), ServerError> {
    find_source(&state, id).await?;
    let content = req
        .content
        .ok_or_else(|| ServerError::BadRequest("Content is required".into()))?;
    let context = state
        .store
        .add_context(NewContext {
            data_source_id: id,
            content,
            summary: req.summary,
            expires_at: req.expires_at,
        })
        .await?;
    info!(data_source_id = id, context_id = context.id, "context added");
    Ok((StatusCode::CREATED, Json(context.to_response())))
}

#[utoipa::path(
    get,
    path = "/api/data-sources/{id}/contexts",
    tag = "data-sources",
    params(("id" = i64, Path, description = "Data source id")),
    responses(
        (status = 200, description = "Contexts, newest first", body = Vec<ContextResponse>),
        (status = 404, description = "No such data source"),
    )
)]
pub async fn list_contexts(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<Vec<ContextResponse>>, ServerError> {
    find_source(&state, id).await?;
    let contexts = state.store.list_contexts(id, None).await?;
    Ok(Json(contexts.iter().map(ContextRecord::to_response).collect()))
}
