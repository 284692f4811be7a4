use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::coordinator::{ErrorKind, LifecycleError, Operation};

/// Error body returned by every endpoint.
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: String,
    pub kind: ErrorKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation: Option<Operation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub retryable: bool,
}

pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::Validation => StatusCode::BAD_REQUEST,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Conflict => StatusCode::CONFLICT,
        ErrorKind::Forbidden => StatusCode::FORBIDDEN,
        ErrorKind::Timeout => StatusCode::GATEWAY_TIMEOUT,
        ErrorKind::StoreUnavailable => StatusCode::SERVICE_UNAVAILABLE,
    }
}

impl ApiError {
    /// A request the endpoint layer could not even decode.
    pub fn bad_request(operation: Operation, message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
            kind: ErrorKind::Validation,
            operation: Some(operation),
            namespace: None,
            name: None,
            retryable: false,
        }
    }

    pub fn from_json_rejection(operation: Operation, rejection: JsonRejection) -> Self {
        Self::bad_request(operation, rejection.body_text())
    }

    pub fn from_query_rejection(operation: Operation, rejection: QueryRejection) -> Self {
        Self::bad_request(operation, rejection.body_text())
    }
}

impl From<LifecycleError> for ApiError {
    fn from(e: LifecycleError) -> Self {
        Self {
            retryable: e.is_retryable(),
            kind: e.kind,
            operation: Some(e.operation),
            namespace: e.namespace,
            name: e.name,
            error: e.message,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (status_for(self.kind), Json(self)).into_response()
    }
}
