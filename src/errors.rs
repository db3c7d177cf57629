use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("data fetch error: {0}")]
    DataFetch(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("push delivery error: {0}")]
    Push(String),
}

impl AppError {
    /// Wraps a storage failure. Keeps the whole context chain in the message.
    pub fn fetch(err: anyhow::Error) -> Self {
        AppError::DataFetch(format!("{err:#}"))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::DataFetch(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Push(_) => StatusCode::BAD_GATEWAY,
        };

        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }

        let body = serde_json::json!({ "error": self.to_string() });
        (status, axum::Json(body)).into_response()
    }
}
