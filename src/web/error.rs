//! JSON error responses for the web API.

use axum::extract::multipart::MultipartRejection;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::Serialize;
use ts_rs::TS;

use crate::plan::review::ReviewError;
use crate::session::SessionError;

/// Machine-readable error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, TS)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export)]
pub enum ApiErrorCode {
    InvalidRequest,
    MissingFile,
    SessionNotFound,
    InvalidTransition,
    NoCourses,
    UnsupportedVersion,
    Internal,
}

#[derive(Debug, Serialize, TS)]
#[ts(export)]
pub struct ApiError {
    #[serde(skip)]
    #[ts(skip)]
    pub status: StatusCode,
    pub code: ApiErrorCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, code: ApiErrorCode, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, ApiErrorCode::InvalidRequest, message)
    }

    pub fn missing_file() -> Self {
        Self::new(
            StatusCode::BAD_REQUEST,
            ApiErrorCode::MissingFile,
            "expected a multipart 'file' field with an image",
        )
    }

    pub fn internal(context: &str, error: impl std::fmt::Display) -> Self {
        tracing::error!(error = %error, "{context} failed");
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            ApiErrorCode::Internal,
            format!("{context} failed"),
        )
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self)).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::new(
            rejection.status(),
            ApiErrorCode::InvalidRequest,
            rejection.body_text(),
        )
    }
}

impl From<MultipartRejection> for ApiError {
    fn from(rejection: MultipartRejection) -> Self {
        Self::new(
            rejection.status(),
            ApiErrorCode::InvalidRequest,
            rejection.body_text(),
        )
    }
}

impl From<SessionError> for ApiError {
    fn from(err: SessionError) -> Self {
        let (status, code) = match err {
            SessionError::NotFound => (StatusCode::NOT_FOUND, ApiErrorCode::SessionNotFound),
            SessionError::InvalidTransition { .. } => {
                (StatusCode::CONFLICT, ApiErrorCode::InvalidTransition)
            }
            SessionError::NoCourses => (StatusCode::CONFLICT, ApiErrorCode::NoCourses),
        };
        Self::new(status, code, err.to_string())
    }
}

impl From<ReviewError> for ApiError {
    fn from(err: ReviewError) -> Self {
        match err {
            ReviewError::UnsupportedVersion { .. } => Self::new(
                StatusCode::BAD_REQUEST,
                ApiErrorCode::UnsupportedVersion,
                err.to_string(),
            ),
            ReviewError::Malformed(ref source) => {
                Self::bad_request(format!("malformed study plan data: {source}"))
            }
        }
    }
}
