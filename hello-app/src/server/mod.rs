use std::sync::Arc;

use anyhow::{Context as _, Result};
use async_trait::async_trait;
use axum::{routing::any, Router};
use tokio::sync::mpsc::Sender;
use tower::ServiceBuilder;

use crate::{config::HttpArgs, observability::metric::HelloMetrics, service::RegistedService};

pub mod hello;
mod middleware;

/// The http server exposing `/hello`.
pub struct HelloServer {
    args: HttpArgs,
    metrics: Arc<HelloMetrics>,
}

impl HelloServer {
    pub fn new(args: HttpArgs, metrics: Arc<HelloMetrics>) -> Self {
        Self { args, metrics }
    }
}

pub(crate) fn router(metrics: Arc<HelloMetrics>) -> Router {
    Router::new()
        .route("/hello", any(hello::hello))
        .layer(
            ServiceBuilder::new()
                .layer(axum::middleware::from_fn(middleware::add_server_header))
                .layer(axum::middleware::from_fn(middleware::trace_http_request)),
        )
        .with_state(metrics)
}

#[async_trait]
impl RegistedService for HelloServer {
    async fn serve(&self, ready: Sender<()>) -> Result<()> {
        let addr = (
            self.args.bind.host.as_deref().unwrap_or("0.0.0.0"),
            self.args.bind.port,
        );
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .with_context(|| format!("Failed to listen on {}:{}", addr.0, addr.1))?;
        tracing::info!("Listening on http://{}:{}/hello", addr.0, addr.1);

        let _ = ready.send(()).await;

        axum::serve(listener, router(Arc::clone(&self.metrics))).await?;

        tracing::info!("Http server stopping");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use anyhow::{bail, Result};
    use http::{header, Method, Request, StatusCode};
    use opentelemetry::trace::{SpanId, SpanKind, TraceId};
    use scopeguard::defer;
    use tokio::select;
    use tower::ServiceExt as _;
    use tracing_subscriber::EnvFilter;

    use super::*;
    use crate::{
        config::observability::ExporterType,
        observability::{
            log::build_tracing_subscriber,
            metric::{testing::last_u64_sum, NUMBER_OF_EXEC_NAME},
            Telemetry,
        },
        runtime::HelloRuntime,
        tests::mock_config,
        HelloResponse, HTTP_RESPONSE_SERVER_HEADER,
    };

    async fn wait_exit(join_handle: tokio::task::JoinHandle<Result<()>>) -> Result<()> {
        select! {
            _ = tokio::time::sleep(std::time::Duration::from_secs(5)) => {
                defer! {
                    std::process::exit(1);
                }
                panic!("Wait for hello-app exit timeout")
            }
            res = join_handle => {
                res??;
            }
        }
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 10)]
    async fn test_hello_endpoint() -> Result<()> {
        #[allow(clippy::unwrap_used)]
        let port = portpicker::pick_unused_port().unwrap();
        let (ready_sender, ready_receiver) = tokio::sync::oneshot::channel();
        let hello_runtime = HelloRuntime::from_config(&mock_config(port))?;
        let canceller = hello_runtime.canceller();
        let state = hello_runtime.state();

        let join_handle =
            tokio::task::spawn(async move { hello_runtime.serve_with_ready(ready_sender).await });

        ready_receiver.await?;
        assert!(state.is_ready());

        let client = reqwest::ClientBuilder::new().no_proxy().build()?;
        for method in [Method::GET, Method::POST, Method::PUT] {
            let resp = client
                .request(method.clone(), format!("http://127.0.0.1:{port}/hello"))
                .send()
                .await?;

            assert_eq!(resp.status(), StatusCode::OK, "method {method}");
            assert_eq!(resp.headers()[header::CONTENT_TYPE], "application/json");
            assert_eq!(resp.headers()[header::SERVER], HTTP_RESPONSE_SERVER_HEADER);
            assert_eq!(resp.text().await?, r#"{"Message":"Hello World"}"#);
        }

        let resp = client
            .get(format!("http://127.0.0.1:{port}/goodbye"))
            .send()
            .await?;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        canceller.cancel();
        wait_exit(join_handle).await
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 10)]
    async fn test_counter_matches_requests() -> Result<()> {
        const REQUESTS: u64 = 20;

        #[allow(clippy::unwrap_used)]
        let port = portpicker::pick_unused_port().unwrap();
        let config = mock_config(port);
        let ExporterType::Mock { metrics, .. } = &config.exporter else {
            bail!("expected the mock exporter");
        };
        let metrics = metrics.clone();

        let (ready_sender, ready_receiver) = tokio::sync::oneshot::channel();
        let hello_runtime = HelloRuntime::from_config(&config)?;
        let telemetry = hello_runtime.telemetry().clone();
        let canceller = hello_runtime.canceller();

        let join_handle =
            tokio::task::spawn(async move { hello_runtime.serve_with_ready(ready_sender).await });
        ready_receiver.await?;

        let client = reqwest::ClientBuilder::new().no_proxy().build()?;
        let requests = (0..REQUESTS).map(|_| {
            let client = client.clone();
            tokio::spawn(async move {
                let resp = client
                    .get(format!("http://127.0.0.1:{port}/hello"))
                    .send()
                    .await?;
                let body: HelloResponse = resp.json().await?;
                Ok::<_, anyhow::Error>(body)
            })
        });
        for request in requests.collect::<Vec<_>>() {
            assert!(request.await??.is_valid());
        }

        telemetry.force_flush().await?;
        assert_eq!(last_u64_sum(&metrics, NUMBER_OF_EXEC_NAME), Some(REQUESTS));

        canceller.cancel();
        wait_exit(join_handle).await
    }

    #[tokio::test]
    async fn test_request_spans() -> Result<()> {
        let config = mock_config(0);
        let ExporterType::Mock { spans, .. } = &config.exporter else {
            bail!("expected the mock exporter");
        };
        let spans = spans.clone();

        let telemetry = Telemetry::new(&config)?;
        let metrics = Arc::new(HelloMetrics::new(&telemetry.meter()));
        let _guard = tracing::subscriber::set_default(build_tracing_subscriber(
            Some(telemetry.tracer()),
            EnvFilter::new("trace"),
            EnvFilter::new("off"),
        ));

        let remote_trace_id = "4bf92f3577b34da6a3ce929d0e0e4736";
        let remote_span_id = "00f067aa0ba902b7";
        let response = router(metrics)
            .oneshot(
                Request::builder()
                    .uri("/hello")
                    .header(
                        "traceparent",
                        format!("00-{remote_trace_id}-{remote_span_id}-01"),
                    )
                    .body(axum::body::Body::empty())?,
            )
            .await?;
        assert_eq!(response.status(), StatusCode::OK);

        let finished = spans.get_finished_spans()?;
        let find = |name: &str| {
            finished
                .iter()
                .find(|span| span.name == name)
                .cloned()
                .ok_or_else(|| anyhow::anyhow!("span {name} not exported, got {finished:?}"))
        };
        let server = find("GET /hello")?;
        let build_response = find("build_response")?;
        let validate_response = find("validate_response")?;

        assert_eq!(server.span_kind, SpanKind::Server);
        assert_eq!(
            server.span_context.trace_id(),
            TraceId::from_hex(remote_trace_id)?
        );
        assert_eq!(server.parent_span_id, SpanId::from_hex(remote_span_id)?);

        for child in [&build_response, &validate_response] {
            assert_eq!(
                child.span_context.trace_id(),
                server.span_context.trace_id()
            );
            assert_eq!(child.parent_span_id, server.span_context.span_id());
        }
        Ok(())
    }

    /// Collects the message of every event.
    #[derive(Clone, Default)]
    struct EventMessages(Arc<std::sync::Mutex<Vec<String>>>);

    impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for EventMessages {
        fn on_event(
            &self,
            event: &tracing::Event<'_>,
            _ctx: tracing_subscriber::layer::Context<'_, S>,
        ) {
            struct Message(Option<String>);

            impl tracing::field::Visit for Message {
                fn record_debug(
                    &mut self,
                    field: &tracing::field::Field,
                    value: &dyn std::fmt::Debug,
                ) {
                    if field.name() == "message" {
                        self.0 = Some(format!("{value:?}"));
                    }
                }
            }

            let mut message = Message(None);
            event.record(&mut message);
            if let (Some(message), Ok(mut messages)) = (message.0, self.0.lock()) {
                messages.push(message);
            }
        }
    }

    #[tokio::test]
    async fn test_remote_trace_without_opentelemetry_layer() -> Result<()> {
        use tracing_subscriber::layer::SubscriberExt as _;

        let config = mock_config(0);
        let telemetry = Telemetry::new(&config)?;
        let metrics = Arc::new(HelloMetrics::new(&telemetry.meter()));

        let events = EventMessages::default();
        let _guard =
            tracing::subscriber::set_default(tracing_subscriber::registry().with(events.clone()));

        let response = router(metrics)
            .oneshot(
                Request::builder()
                    .uri("/hello")
                    .header(
                        "traceparent",
                        "00-4bf92f3577b34da6a3ce929d0e0e4736-00f067aa0ba902b7-01",
                    )
                    .body(axum::body::Body::empty())?,
            )
            .await?;
        assert_eq!(response.status(), StatusCode::OK);

        let messages = events.0.lock().map_err(|e| anyhow::anyhow!("{e}"))?;
        assert!(
            messages
                .iter()
                .any(|message| message == "The caller's trace is not continued"),
            "got {messages:?}"
        );
        Ok(())
    }
}
