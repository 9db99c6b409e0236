//! HTTP rendering of `errors::Error`.
//!
//! Every error becomes `{"message": ...}` with a status derived from its kind.
//! Internal failures are logged and answered with a generic message; their detail
//! travels in a response extension that `attach_internal_detail` copies into the
//! body when the deployment opts in.

use crate::errors::Error;
use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use tracing::error;

/// Message returned for every internal failure.
pub const INTERNAL_MESSAGE: &str = "Internal server error";

/// Diagnostic text of an internal failure, carried as a response extension.
#[derive(Debug, Clone)]
pub struct InternalDetail(pub String);

impl Error {
    /// HTTP status for this error kind.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::InvalidInput { .. } => StatusCode::BAD_REQUEST,
            Self::PermissionDenied { .. } => StatusCode::FORBIDDEN,
            Self::InvalidState { .. } => StatusCode::CONFLICT,
            Self::Unauthenticated { .. } => StatusCode::UNAUTHORIZED,
            Self::Config { .. } | Self::PasswordHash { .. } | Self::Database(_) | Self::Io(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if !self.is_internal() {
            return (status, Json(json!({ "message": self.to_string() }))).into_response();
        }

        error!(error = %self, "Request failed");
        let mut response = (status, Json(json!({ "message": INTERNAL_MESSAGE }))).into_response();
        response
            .extensions_mut()
            .insert(InternalDetail(self.to_string()));
        response
    }
}

/// Rewrites internal-failure bodies to include their detail. Only installed when
/// `errors.expose_internal_detail` is enabled.
pub async fn attach_internal_detail(mut response: Response) -> Response {
    match response.extensions_mut().remove::<InternalDetail>() {
        Some(InternalDetail(detail)) => (
            response.status(),
            Json(json!({ "message": INTERNAL_MESSAGE, "detail": detail })),
        )
            .into_response(),
        None => response,
    }
}

impl From<JsonRejection> for Error {
    fn from(rejection: JsonRejection) -> Self {
        Self::invalid_input(rejection.body_text())
    }
}

impl From<QueryRejection> for Error {
    fn from(rejection: QueryRejection) -> Self {
        Self::invalid_input(rejection.body_text())
    }
}

impl From<PathRejection> for Error {
    fn from(rejection: PathRejection) -> Self {
        Self::invalid_input(rejection.body_text())
    }
}
