use std::convert::Infallible;

use axum::{extract::Request, middleware::Next, response::Response};
use http::HeaderValue;
use tracing::Instrument as _;
use tracing_opentelemetry::OpenTelemetrySpanExt as _;

use crate::{observability::trace::propagation::extract_remote_context, HTTP_RESPONSE_SERVER_HEADER};

/// Wraps each request in a server span, continuing the trace of the caller if it sent one.
pub(super) async fn trace_http_request(req: Request, next: Next) -> Response {
    let span = tracing::info_span!(
        "http_request",
        otel.name = %format!("{} {}", req.method(), req.uri().path()),
        otel.kind = "server",
        http.request.method = %req.method(),
        url.path = req.uri().path(),
        http.response.status_code = tracing::field::Empty,
    );
    if let Err(error) = span.set_parent(extract_remote_context(req.headers())) {
        tracing::debug!(?error, "The caller's trace is not continued");
    }

    let response = next.run(req).instrument(span.clone()).await;
    span.record("http.response.status_code", response.status().as_u16());
    response
}

pub(super) async fn add_server_header(req: Request, next: Next) -> Result<Response, Infallible> {
    let mut res = next.run(req).await;
    res.headers_mut().insert(
        "Server",
        HeaderValue::from_static(HTTP_RESPONSE_SERVER_HEADER),
    );
    Ok(res)
}
