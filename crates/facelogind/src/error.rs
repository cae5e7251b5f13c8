use crate::auth::AuthError;
use crate::files::FileError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

/// Flash message category shown alongside a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Success,
    Warning,
    Danger,
}

/// Errors surfaced at the HTTP boundary.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    File(#[from] FileError),
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("internal: {0}")]
    Internal(String),
}

impl ApiError {
    fn parts(&self) -> (StatusCode, Category, String) {
        use Category::*;
        let (status, category, message) = match self {
            ApiError::Auth(AuthError::NoFaceDetected) => (
                StatusCode::BAD_REQUEST,
                Danger,
                "No face detected. Make sure your face is clearly visible.",
            ),
            ApiError::Auth(AuthError::DuplicateUsername(_)) => {
                (StatusCode::CONFLICT, Warning, "Username already exists.")
            }
            ApiError::Auth(AuthError::NoMatch) => (
                StatusCode::UNAUTHORIZED,
                Danger,
                "Face not recognized. Please try again or register.",
            ),
            ApiError::Auth(AuthError::InvalidUsername) | ApiError::File(FileError::InvalidUsername) => (
                StatusCode::BAD_REQUEST,
                Warning,
                "Username is required and may not contain '/', '\\' or '..'.",
            ),
            ApiError::Auth(AuthError::InvalidImage(_)) => {
                (StatusCode::BAD_REQUEST, Danger, "The submitted image could not be read.")
            }
            ApiError::File(FileError::NoFileSelected) => {
                (StatusCode::BAD_REQUEST, Warning, "No file selected.")
            }
            ApiError::File(FileError::FileNotFound) => {
                (StatusCode::NOT_FOUND, Danger, "File not found or access denied.")
            }
            ApiError::File(FileError::FileMissing) => (StatusCode::NOT_FOUND, Danger, "File not found."),
            ApiError::BadRequest(detail) => {
                return (StatusCode::BAD_REQUEST, Warning, detail.clone());
            }
            ApiError::Auth(_) | ApiError::File(_) | ApiError::Internal(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, Danger, "Internal server error.")
            }
        };
        (status, category, message.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, category, message) = self.parts();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::debug!(error = %self, %status, "request rejected");
        }
        (status, Json(serde_json::json!({ "category": category, "message": message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (ApiError::Auth(AuthError::NoFaceDetected), StatusCode::BAD_REQUEST),
            (ApiError::Auth(AuthError::DuplicateUsername("a".into())), StatusCode::CONFLICT),
            (ApiError::Auth(AuthError::NoMatch), StatusCode::UNAUTHORIZED),
            (ApiError::Auth(AuthError::EngineUnavailable), StatusCode::INTERNAL_SERVER_ERROR),
            (ApiError::File(FileError::FileNotFound), StatusCode::NOT_FOUND),
            (ApiError::File(FileError::FileMissing), StatusCode::NOT_FOUND),
            (ApiError::File(FileError::NoFileSelected), StatusCode::BAD_REQUEST),
            (ApiError::File(FileError::InvalidUsername), StatusCode::BAD_REQUEST),
            (ApiError::Auth(AuthError::InvalidUsername), StatusCode::BAD_REQUEST),
            (ApiError::BadRequest("bad json".into()), StatusCode::BAD_REQUEST),
        ];
        for (err, expected) in cases {
            assert_eq!(err.parts().0, expected, "{err}");
        }
    }

    #[test]
    fn test_internal_detail_not_leaked() {
        let (_, category, message) = ApiError::Internal("disk on fire".into()).parts();
        assert_eq!(category, Category::Danger);
        assert!(!message.contains("disk"));
    }
}
