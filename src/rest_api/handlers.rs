use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::ApiError;
use super::AppState;
use crate::coordinator::{CreateDatabase, Operation};
use crate::crd::{Database, DatabasePhase, DatabaseSummary};

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub namespace: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ResourceQuery {
    pub namespace: Option<String>,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateDatabaseRequest {
    #[serde(default)]
    pub name: String,
    pub namespace: Option<String>,
    pub spec: Option<Value>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ListDatabasesResponse {
    pub items: Vec<DatabaseSummary>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteDatabaseResponse {
    pub accepted: bool,
    pub namespace: String,
    pub name: String,
    pub pending_finalization: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phase: Option<DatabasePhase>,
}

pub async fn list_databases(
    State(state): State<Arc<AppState>>,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> Result<Json<ListDatabasesResponse>, ApiError> {
    let Query(query) = query.map_err(|e| ApiError::from_query_rejection(Operation::List, e))?;
    let databases = state.coordinator.list(query.namespace.as_deref()).await?;

    Ok(Json(ListDatabasesResponse {
        items: databases.iter().map(Database::summary).collect(),
    }))
}

pub async fn get_database(
    State(state): State<Arc<AppState>>,
    query: Result<Query<ResourceQuery>, QueryRejection>,
) -> Result<Json<Database>, ApiError> {
    let Query(query) = query.map_err(|e| ApiError::from_query_rejection(Operation::Get, e))?;
    let database = state
        .coordinator
        .get(query.namespace.as_deref(), &query.name)
        .await?;
    Ok(Json(database))
}

pub async fn create_database(
    State(state): State<Arc<AppState>>,
    body: Result<Json<CreateDatabaseRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(body) = body.map_err(|e| ApiError::from_json_rejection(Operation::Create, e))?;
    let database = state
        .coordinator
        .create(CreateDatabase {
            namespace: body.namespace,
            name: body.name,
            spec: body.spec,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(database)))
}

pub async fn delete_database(
    State(state): State<Arc<AppState>>,
    query: Result<Query<ResourceQuery>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Query(query) = query.map_err(|e| ApiError::from_query_rejection(Operation::Delete, e))?;
    let accepted = state
        .coordinator
        .delete(query.namespace.as_deref(), &query.name)
        .await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(DeleteDatabaseResponse {
            accepted: true,
            phase: accepted.phase(),
            pending_finalization: accepted.pending_finalization,
            namespace: accepted.reference.namespace,
            name: accepted.reference.name,
        }),
    ))
}

pub async fn healthz() -> &'static str {
    "ok"
}

pub async fn readyz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.coordinator.ready().await {
        Ok(()) => (StatusCode::OK, "ok".to_string()),
        Err(e) => (StatusCode::SERVICE_UNAVAILABLE, e.message),
    }
}

#[cfg(feature = "metrics")]
pub async fn metrics() -> impl IntoResponse {
    match crate::metrics::encode() {
        Ok(body) => (
            StatusCode::OK,
            [(
                axum::http::header::CONTENT_TYPE,
                "application/openmetrics-text; version=1.0.0; charset=utf-8",
            )],
            body,
        )
            .into_response(),
        Err(_) => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
    }
}
