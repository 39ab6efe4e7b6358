use mcs_core::CoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Path outside the control actions; the message is the exact body text.
    #[error("{0}")]
    UnknownAction(&'static str),

    #[error("execution not found: {0}")]
    ExecutionNotFound(String),

    #[error("internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Core(#[from] CoreError),
}

#[cfg(feature = "http")]
impl ApiError {
    pub fn status_code(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;

        match self {
            ApiError::InvalidRequest(_) | ApiError::UnknownAction(_) => StatusCode::BAD_REQUEST,
            ApiError::ExecutionNotFound(_) | ApiError::Core(CoreError::ExecutionNotFound(_)) => {
                StatusCode::NOT_FOUND
            }
            ApiError::Core(CoreError::Cloud(_)) => StatusCode::BAD_GATEWAY,
            ApiError::Internal(_) | ApiError::Core(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[cfg(feature = "http")]
impl axum::response::IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::warn!(%status, error = %self, "request failed");
        }
        let body = serde_json::json!({ "error": self.to_string() });
        (status, axum::Json(body)).into_response()
    }
}
