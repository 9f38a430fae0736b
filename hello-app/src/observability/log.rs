use anyhow::{Context as _, Result};
use opentelemetry::trace::{TraceContextExt as _, TraceId};
use opentelemetry_sdk::trace::SdkTracer;
use tracing::Subscriber;
use tracing_opentelemetry::OpenTelemetrySpanExt as _;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt as _, EnvFilter, Layer};

pub const DEFAULT_OPENTELEMETRY_DIRECTIVES: &str = "info,tokio_graceful=off,hello_app=trace";
pub const DEFAULT_FMT_DIRECTIVES: &str = "info,tokio_graceful=off,hello_app=info";

/// The filter from `RUST_LOG`, or `default` when it is unset or malformed.
pub fn env_filter_or(default: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| default.into())
}

/// Builds the subscriber of the process.
///
/// Each layer has its own filter (per-layer filter), so the OpenTelemetry layer can record more
/// than what is printed. The OpenTelemetry layer is attached directly to the registry: it must be
/// reachable by downcasting for parent context propagation and trace id lookups to work.
pub fn build_tracing_subscriber(
    tracer: Option<SdkTracer>,
    opentelemetry_filter: EnvFilter,
    fmt_filter: EnvFilter,
) -> impl Subscriber + Send + Sync + 'static {
    let opentelemetry_layer = tracer.map(|tracer| {
        tracing_opentelemetry::layer()
            .with_level(true)
            .with_tracer(tracer)
    });

    tracing_subscriber::registry()
        .with(opentelemetry_layer.with_filter(opentelemetry_filter))
        .with(tracing_subscriber::fmt::layer().with_filter(fmt_filter))
}

/// Installs the global subscriber, bridging spans to `tracer` when one is given.
pub fn init_tracing_subscriber(tracer: Option<SdkTracer>) -> Result<()> {
    build_tracing_subscriber(
        tracer,
        env_filter_or(DEFAULT_OPENTELEMETRY_DIRECTIVES),
        env_filter_or(DEFAULT_FMT_DIRECTIVES),
    )
    .try_init()
    .context("Failed to install the global tracing subscriber")
}

/// Trace id of the current span, if it belongs to a sampled or remote trace.
pub fn current_trace_id() -> Option<TraceId> {
    let context = tracing::Span::current().context();
    let span = context.span();
    let span_context = span.span_context();

    span_context.is_valid().then(|| span_context.trace_id())
}
