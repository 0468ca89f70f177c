use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde_json::json;

use crate::config::ConfigError;
use crate::engine::EngineError;

/// Errors surfaced to HTTP callers before a response stream starts.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("Server is busy generating another response. Please wait.")]
    AdmissionRejected,

    #[error("Engine unavailable: {0}")]
    EngineUnavailable(String),

    #[error("Upstream engine error: {0}")]
    Upstream(#[from] EngineError),
}

impl From<ConfigError> for ApiError {
    fn from(err: ConfigError) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::AdmissionRejected => StatusCode::TOO_MANY_REQUESTS,
            ApiError::EngineUnavailable(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Upstream(_) => StatusCode::BAD_GATEWAY,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(json!({ "error": self.to_string() }))
    }
}
