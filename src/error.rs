use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde_json::Error as SerdeJsonError;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("JSON error: {0}")]
    Json(#[from] SerdeJsonError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed object key or request body.
    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Label oracle error: {0}")]
    Oracle(String),

    #[error("Object store error: {0}")]
    ObjectStore(String),

    /// Non-2xx answer from the search store, body kept verbatim.
    #[error("Search store error {status}: {body}")]
    RemoteStore { status: u16, body: String },

    /// A stored document that does not have the indexed shape.
    #[error("Malformed search hit: {0}")]
    MalformedHit(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("Invocation exceeded its {0:?} deadline")]
    Timeout(Duration),

    #[error("{failed} of {total} records failed")]
    BatchFailed { failed: usize, total: usize },
}

impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .json(serde_json::json!({
                "error": self.to_string(),
            }))
    }

    fn status_code(&self) -> StatusCode {
        match *self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Decode(_) => StatusCode::BAD_REQUEST,
            AppError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Json(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Oracle(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::ObjectStore(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::RemoteStore { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::MalformedHit(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Transport(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Timeout(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::BatchFailed { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_errors_map_to_400() {
        assert_eq!(
            AppError::BadRequest("Missing search-key".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::Decode("bad body".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn downstream_errors_map_to_500() {
        let err = AppError::RemoteStore {
            status: 503,
            body: "no shards".into(),
        };
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.to_string(), "Search store error 503: no shards");
        assert_eq!(
            AppError::Transport("connection reset".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            AppError::MalformedHit("missing field `bucket`".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn io_errors_convert_and_map_to_500() {
        let err: AppError = std::io::Error::new(std::io::ErrorKind::AddrInUse, "port taken").into();
        assert!(matches!(err, AppError::Io(_)));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn bad_request_message_is_verbatim() {
        assert_eq!(
            AppError::BadRequest("Missing search-key".into()).to_string(),
            "Missing search-key"
        );
    }
}
