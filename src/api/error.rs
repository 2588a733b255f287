use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::error::EngineError;

/// HTTP-mapped engine refusal. The body always carries the structured
/// `{success, error}` shape so callers never see a bare status code.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
        }
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::SERVICE_UNAVAILABLE,
            message: message.into(),
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::CONFLICT,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }
}

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        let message = err.to_string();
        match err {
            EngineError::AgentNotFound(_)
            | EngineError::CapabilityNotFound { .. }
            | EngineError::WorkflowNotFound(_)
            | EngineError::UnknownAction(_) => Self::not_found(message),
            EngineError::AgentUnavailable(_) | EngineError::AgentDisabled(_) => {
                Self::unavailable(message)
            }
            EngineError::WorkflowDisabled(_)
            | EngineError::DuplicateAgent(_)
            | EngineError::DuplicateCapability { .. }
            | EngineError::DuplicateWorkflow(_) => Self::conflict(message),
            EngineError::InvalidWorkflow(_) => Self::bad_request(message),
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "success": false,
            "error": self.message,
        }));
        (self.status, body).into_response()
    }
}
