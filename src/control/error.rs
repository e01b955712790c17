//! Standardized error responses for the control surface.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ControlErrorCode {
    NotFound,
    Conflict,
}

#[derive(Debug, Clone, Serialize)]
pub struct ControlError {
    pub code: ControlErrorCode,
    pub message: String,
}

impl ControlError {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            code: ControlErrorCode::NotFound,
            message: message.into(),
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self {
            code: ControlErrorCode::Conflict,
            message: message.into(),
        }
    }

    fn status_code(&self) -> StatusCode {
        match self.code {
            ControlErrorCode::NotFound => StatusCode::NOT_FOUND,
            ControlErrorCode::Conflict => StatusCode::CONFLICT,
        }
    }
}

impl IntoResponse for ControlError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        (status, Json(self)).into_response()
    }
}
