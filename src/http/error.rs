use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::app::error::ServiceError;

#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    message: String,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

impl AppError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            message: message.into(),
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::CONFLICT,
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::TOO_MANY_REQUESTS,
            message: message.into(),
        }
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::FORBIDDEN,
            message: message.into(),
        }
    }

    pub fn payload_too_large(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::PAYLOAD_TOO_LARGE,
            message: message.into(),
        }
    }

    /// Maps a service failure to a response, logging it with the attempted
    /// `action`. Storage details never reach the caller.
    pub fn from_service(err: ServiceError, action: &str) -> Self {
        match err {
            ServiceError::NotFound(message) => {
                tracing::debug!(action, %message, "not found");
                Self::not_found(message)
            }
            ServiceError::Forbidden(message) => {
                tracing::debug!(action, %message, "forbidden");
                Self::forbidden(message)
            }
            ServiceError::InvalidInput(message) => {
                tracing::debug!(action, %message, "invalid input");
                Self::bad_request(message)
            }
            ServiceError::Conflict(message) => {
                tracing::debug!(action, %message, "conflict");
                Self::conflict(message)
            }
            ServiceError::Internal(err) => {
                tracing::error!(error = ?err, "failed to {}", action);
                Self::internal(format!("failed to {}", action))
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = Json(ErrorResponse {
            error: self.message,
        });
        (self.status, body).into_response()
    }
}
