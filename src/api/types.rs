//! API request and response types

use axum::http::StatusCode;
use serde::Serialize;

use crate::errors::GrainwiseError;

/// Standard API response wrapper
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<ErrorBody>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(body: ErrorBody) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(body),
        }
    }
}

/// Structured error payload
#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    pub message: String,
    pub kind: &'static str,
    pub retryable: bool,
}

impl ErrorBody {
    #[must_use]
    pub fn from_error(error: &GrainwiseError) -> Self {
        Self {
            message: error.to_string(),
            kind: error_kind(error),
            retryable: error.is_retryable(),
        }
    }
}

/// Map a pipeline error to its HTTP status.
#[must_use]
pub fn error_status(error: &GrainwiseError) -> StatusCode {
    match error {
        GrainwiseError::Validation(_) => StatusCode::BAD_REQUEST,
        GrainwiseError::StageTimeout { .. } => StatusCode::SERVICE_UNAVAILABLE,
        GrainwiseError::StageTransient { .. }
        | GrainwiseError::Http(_)
        | GrainwiseError::Streaming(_) => StatusCode::BAD_GATEWAY,
        GrainwiseError::Configuration(_)
        | GrainwiseError::Database(_)
        | GrainwiseError::Serialization(_)
        | GrainwiseError::TomlParsing(_)
        | GrainwiseError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_kind(error: &GrainwiseError) -> &'static str {
    match error {
        GrainwiseError::Validation(_) => "validation",
        GrainwiseError::Configuration(_) => "configuration",
        GrainwiseError::StageTimeout { .. } => "stage-timeout",
        GrainwiseError::StageTransient { .. } => "stage-transient",
        GrainwiseError::Streaming(_) => "streaming",
        _ => "internal",
    }
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}
