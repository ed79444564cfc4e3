use axum::extract::rejection::JsonRejection;
use axum::extract::FromRequest;
use axum::http::StatusCode;

use crate::http::AppError;

/// JSON request body whose rejections use the `{"error": ...}` shape.
/// Malformed or mistyped fields are reported as 400.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct JsonBody<T>(pub T);

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            return AppError::payload_too_large(rejection.body_text());
        }
        AppError::bad_request(rejection.body_text())
    }
}
