//! Unified server error type.
//!
//! Every handler returns `Result<T, ServerError>`, which implements
//! [`axum::response::IntoResponse`].
//!
//! **Security note:** transcoder and I/O errors are logged with full detail but
//! the caller only ever sees a generic message, so file paths and ffmpeg
//! diagnostics never leak to clients.

use axum::Json;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;
use tracing::error;
use vidpress_transcode::TranscodeError;

/// Body sent for any failed transcode.
pub const COMPRESSION_FAILED: &str = "Compression failed";

/// All errors that can occur in the vidpress-server request lifecycle.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The caller sent an invalid or malformed request.
    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("payload too large: {0}")]
    PayloadTooLarge(String),

    #[error("unsupported media type: {0}")]
    UnsupportedMediaType(String),

    /// The external transcoder failed, timed out, or produced nothing.
    #[error("transcode error: {0}")]
    Transcode(#[from] TranscodeError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// An unclassified internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, client_message) = match &self {
            // Client-facing errors: expose the message directly.
            ServerError::BadRequest(m) => (StatusCode::BAD_REQUEST, m.clone()),
            ServerError::PayloadTooLarge(m) => (StatusCode::PAYLOAD_TOO_LARGE, m.clone()),
            ServerError::UnsupportedMediaType(m) => {
                (StatusCode::UNSUPPORTED_MEDIA_TYPE, m.clone())
            }

            // Transcoder failures keep their plain-text contract.
            ServerError::Transcode(e) => {
                error!(error = %e, "compression failed");
                return (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
                    COMPRESSION_FAILED,
                )
                    .into_response();
            }

            ServerError::Io(e) => {
                error!(error = %e, "io error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_owned(),
                )
            }
            ServerError::Internal(m) => {
                error!(message = %m, "internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_owned(),
                )
            }
        };
        (status, Json(json!({ "error": client_message }))).into_response()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use axum::body::to_bytes;
    use std::time::Duration;

    async fn body_of(resp: Response) -> String {
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn transcode_error_is_plain_text_500() {
        let resp = ServerError::from(TranscodeError::TimedOut(Duration::from_secs(1))).into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            resp.headers()[header::CONTENT_TYPE],
            "text/plain; charset=utf-8"
        );
        assert_eq!(body_of(resp).await, COMPRESSION_FAILED);
    }

    #[tokio::test]
    async fn io_error_does_not_leak_detail() {
        let err = std::io::Error::other("/srv/uploads/secret: permission denied");
        let resp = ServerError::from(err).into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_of(resp).await;
        assert!(!body.contains("secret"));
        assert!(body.contains("internal server error"));
    }

    #[tokio::test]
    async fn client_errors_expose_message() {
        let resp = ServerError::PayloadTooLarge("too big".into()).into_response();
        assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert!(body_of(resp).await.contains("too big"));
    }
}
