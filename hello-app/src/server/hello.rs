use std::sync::Arc;

use axum::{
    extract::State,
    response::{IntoResponse as _, Response},
};
use http::{header::CONTENT_TYPE, HeaderValue, StatusCode};
use serde::{Deserialize, Serialize};

use crate::{
    error::HelloError,
    observability::{log::current_trace_id, metric::HelloMetrics},
};

const GREETING: &str = "Hello World";

/// Body returned by `/hello`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HelloResponse {
    #[serde(rename = "Message")]
    pub message: String,
}

impl Default for HelloResponse {
    fn default() -> Self {
        Self {
            message: GREETING.to_owned(),
        }
    }
}

impl HelloResponse {
    pub fn is_valid(&self) -> bool {
        self.message == GREETING
    }
}

pub(super) async fn hello(State(metrics): State<Arc<HelloMetrics>>) -> Result<Response, HelloError> {
    let body = tracing::info_span!("build_response").in_scope(|| {
        let response = HelloResponse::default();
        serde_json::to_vec(&response).map(|body| (response, body))
    });
    let (response, body) = body.map_err(HelloError::EncodeResponseFailed)?;

    tracing::info_span!("validate_response").in_scope(|| {
        if response.is_valid() {
            match current_trace_id() {
                Some(trace_id) => {
                    tracing::info!(trace.id = %trace_id, "The response is valid")
                }
                None => tracing::info!("The response is valid"),
            }
        } else {
            tracing::warn!(response.message = %response.message, "The response is not valid");
        }
    });

    metrics.record_execution();

    let mut http_response = (StatusCode::OK, body).into_response();
    http_response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    Ok(http_response)
}

#[cfg(test)]
mod tests {
    use anyhow::Result;

    use super::*;

    #[test]
    fn test_response_wire_format() -> Result<()> {
        let encoded = serde_json::to_string(&HelloResponse::default())?;
        assert_eq!(encoded, r#"{"Message":"Hello World"}"#);

        let decoded: HelloResponse = serde_json::from_str(&encoded)?;
        assert!(decoded.is_valid());
        Ok(())
    }

    #[test]
    fn test_other_message_is_not_valid() {
        assert!(!HelloResponse {
            message: "Goodbye".to_owned()
        }
        .is_valid());
    }
}
