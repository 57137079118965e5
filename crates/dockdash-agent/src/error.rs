//! Error types for the DockDash HTTP API
//!
//! Every error renders as `{message, type, code}` JSON.

use crate::docker::EngineError;
use crate::replace::ReplaceError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Main error type for the agent
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("Internal server error")]
    Unknown,

    #[error("The requested route was not found")]
    RouteNotFound,

    #[error("Missing or invalid API key")]
    Unauthorized,

    #[error("{0}")]
    BadRequest(String),

    #[error("Container not found: {0}")]
    ContainerNotFound(String),

    #[error("{0}")]
    ContainerConflict(String),

    #[error("A replacement of {0} is already in progress")]
    ReplaceConflict(String),

    #[error("Container engine unavailable: {0}")]
    EngineUnavailable(String),

    #[error("Container engine error: {0}")]
    Engine(String),
}

impl AgentError {
    pub fn error_type(&self) -> &'static str {
        match self {
            Self::Unknown => "general_unknown",
            Self::RouteNotFound => "general_route_not_found",
            Self::Unauthorized => "general_unauthorized",
            Self::BadRequest(_) => "general_bad_request",
            Self::ContainerNotFound(_) => "container_not_found",
            Self::ContainerConflict(_) => "container_conflict",
            Self::ReplaceConflict(_) => "replace_conflict",
            Self::EngineUnavailable(_) => "engine_unavailable",
            Self::Engine(_) => "engine_error",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Unknown => StatusCode::INTERNAL_SERVER_ERROR,
            Self::RouteNotFound => StatusCode::NOT_FOUND,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::ContainerNotFound(_) => StatusCode::NOT_FOUND,
            Self::ContainerConflict(_) => StatusCode::CONFLICT,
            Self::ReplaceConflict(_) => StatusCode::CONFLICT,
            Self::EngineUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Engine(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// HTTP status for a failed replacement, decided by what failed first
pub fn replace_status(err: &ReplaceError) -> StatusCode {
    match err.root_cause() {
        ReplaceError::NotFound(_) => StatusCode::NOT_FOUND,
        ReplaceError::EngineUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        ReplaceError::NetworkModeUnresolved {
            source: EngineError::Unavailable(_),
            ..
        } => StatusCode::SERVICE_UNAVAILABLE,
        ReplaceError::NetworkModeUnresolved { .. } => StatusCode::CONFLICT,
        ReplaceError::RenameFailed(EngineError::Conflict(_)) => StatusCode::CONFLICT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// JSON error response body
#[derive(Serialize)]
struct ErrorResponse {
    message: String,
    r#type: String,
    code: u16,
}

impl IntoResponse for AgentError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            message: self.to_string(),
            r#type: self.error_type().to_string(),
            code: status.as_u16(),
        };
        (status, Json(body)).into_response()
    }
}

impl From<EngineError> for AgentError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::NotFound(what) => AgentError::ContainerNotFound(what),
            EngineError::Conflict(msg) => AgentError::ContainerConflict(msg),
            EngineError::Unavailable(msg) => AgentError::EngineUnavailable(msg),
            EngineError::Api(msg) | EngineError::InvalidResponse(msg) => AgentError::Engine(msg),
        }
    }
}

impl From<serde_json::Error> for AgentError {
    fn from(err: serde_json::Error) -> Self {
        AgentError::BadRequest(format!("Failed to parse JSON body: {}", err))
    }
}

/// Result type alias for HTTP handlers
pub type Result<T> = std::result::Result<T, AgentError>;
