//! Error handling for the HTTP surface.
//!
//! Store and validation failures are mapped onto [`ApiError`], which knows its
//! [`ErrorCode`], records itself in the metrics registry and renders the
//! response body clients expect.

use crate::metrics::METRICS;
use crate::store::StoreError;
use crate::validation::ValidationErrors;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::json;
use std::fmt;
use thiserror::Error;

/// Stable classification of API failures, used as a metrics label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// Request body violated its schema
    ValidationError,
    /// Path id matched no stored repository
    NotFound,
    /// Request body was not JSON at all
    MalformedBody,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::ValidationError => "validation_error",
            ErrorCode::NotFound => "not_found",
            ErrorCode::MalformedBody => "malformed_body",
        }
    }

    pub fn category(&self) -> &'static str {
        match self {
            ErrorCode::ValidationError | ErrorCode::MalformedBody => "client_error",
            ErrorCode::NotFound => "resource_not_found",
        }
    }

    /// Every failure is reported as a bad request, not-found included.
    pub fn status_code(&self) -> StatusCode {
        StatusCode::BAD_REQUEST
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationErrors),

    #[error("repository '{id}' not found")]
    NotFound { id: String },

    #[error("malformed request body: {reason}")]
    MalformedBody { reason: String },
}

impl ApiError {
    pub fn not_found(id: impl Into<String>) -> Self {
        ApiError::NotFound { id: id.into() }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            ApiError::Validation(_) => ErrorCode::ValidationError,
            ApiError::NotFound { .. } => ErrorCode::NotFound,
            ApiError::MalformedBody { .. } => ErrorCode::MalformedBody,
        }
    }

    /// Body of a validation rejection: every offending key plus the joined messages.
    fn validation_body(errors: &ValidationErrors) -> serde_json::Value {
        json!({
            "statusCode": 400,
            "error": "Bad Request",
            "message": "Validation failed",
            "validation": {
                "body": {
                    "source": "body",
                    "keys": errors.keys(),
                    "message": errors.to_string(),
                }
            }
        })
    }
}

impl From<StoreError> for ApiError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::NotFound { id } => ApiError::NotFound { id },
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(error: serde_json::Error) -> Self {
        ApiError::MalformedBody {
            reason: error.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let code = self.code();
        METRICS.record_error(code);
        tracing::info!(
            error.code = %code,
            error.category = code.category(),
            error = %self,
            "request rejected"
        );

        let status = code.status_code();
        match self {
            ApiError::Validation(errors) => {
                (status, Json(Self::validation_body(&errors))).into_response()
            }
            ApiError::NotFound { .. } => status.into_response(),
            ApiError::MalformedBody { reason } => (
                status,
                Json(json!({
                    "statusCode": 400,
                    "error": "Bad Request",
                    "message": reason,
                })),
            )
                .into_response(),
        }
    }
}
