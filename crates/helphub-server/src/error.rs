use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use helphub_engine::EngineError;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<EngineError> for ServerError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::InvalidTrigger(msg) => ServerError::BadRequest(msg),
            other => {
                tracing::error!(error = %other, "engine failure");
                ServerError::Internal(other.to_string())
            }
        }
    }
}

impl From<helphub_store::StoreError> for ServerError {
    fn from(err: helphub_store::StoreError) -> Self {
        ServerError::from(EngineError::from(err))
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ServerError::BadRequest(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            ServerError::Forbidden(_) => (StatusCode::FORBIDDEN, self.to_string()),
            ServerError::NotFound(_) => (StatusCode::NOT_FOUND, self.to_string()),
            ServerError::Internal(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
        };

        let body = serde_json::json!({
            "error": message,
        });

        (status, axum::Json(body)).into_response()
    }
}
