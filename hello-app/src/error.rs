use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors surfaced on the request path.
#[derive(Error, Debug)]
pub enum HelloError {
    #[error("Failed to encode response: {0}")]
    EncodeResponseFailed(#[source] serde_json::Error),
}

/// Error response structure
#[derive(Serialize, Deserialize, Debug)]
pub struct ErrorResponse {
    /// Human-readable error description
    pub message: String,
}

impl IntoResponse for HelloError {
    fn into_response(self) -> Response {
        tracing::error!(error = %self, "responding errors to downstream");

        let body = Json(ErrorResponse {
            message: self.to_string(),
        });

        (StatusCode::INTERNAL_SERVER_ERROR, body).into_response()
    }
}

#[cfg(test)]
mod tests {

    use anyhow::Result;
    use axum::body::to_bytes;

    use super::*;

    #[tokio::test]
    async fn test_error_into_response() -> Result<()> {
        let error = serde_json::from_str::<serde_json::Value>("{")
            .map_err(HelloError::EncodeResponseFailed)
            .err();
        #[allow(clippy::unwrap_used)]
        let response = error.unwrap().into_response();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = to_bytes(response.into_body(), usize::MAX).await?;
        let error_response: ErrorResponse = serde_json::from_slice(&body)?;
        assert!(error_response
            .message
            .starts_with("Failed to encode response"));

        Ok(())
    }
}
