use anyhow::{Context, Result};
use opentelemetry_sdk::{
    trace::{Sampler, SdkTracerProvider},
    Resource,
};

use crate::{
    config::observability::ExporterType,
    observability::{configure_tonic_exporter, TonicExporterSettings},
};

impl ExporterType {
    pub fn instantiate_trace(&self) -> Result<TraceExporterInstance> {
        match self {
            ExporterType::Oltp(config) => {
                let settings = TonicExporterSettings::new(&config.transport()?)?;
                let span_exporter = configure_tonic_exporter(
                    opentelemetry_otlp::SpanExporter::builder().with_tonic(),
                    settings,
                )
                .build()
                .context("Failed to create OTLP gRPC span exporter")?;

                Ok(TraceExporterInstance::OpenTelemetryOltp(span_exporter))
            }
            ExporterType::Stdout => Ok(TraceExporterInstance::OpenTelemetryStdout(
                opentelemetry_stdout::SpanExporter::default(),
            )),
            #[cfg(test)]
            ExporterType::Mock { spans, .. } => Ok(TraceExporterInstance::Mock(spans.clone())),
        }
    }
}

#[allow(clippy::large_enum_variant)]
pub enum TraceExporterInstance {
    OpenTelemetryOltp(opentelemetry_otlp::SpanExporter),
    OpenTelemetryStdout(opentelemetry_stdout::SpanExporter),
    #[cfg(test)]
    Mock(opentelemetry_sdk::trace::InMemorySpanExporter),
}

impl TraceExporterInstance {
    /// Every span is sampled. The OTLP exporter is driven by a batch processor on the tokio
    /// runtime, so this must be called from within one.
    pub fn into_sdk_tracer_provider(self, resource: Resource) -> SdkTracerProvider {
        let builder = SdkTracerProvider::builder()
            .with_sampler(Sampler::AlwaysOn)
            .with_resource(resource);

        match self {
            TraceExporterInstance::OpenTelemetryOltp(span_exporter) => {
                let batch =
                    opentelemetry_sdk::trace::span_processor_with_async_runtime::BatchSpanProcessor::builder(span_exporter, opentelemetry_sdk::runtime::Tokio).build();
                builder.with_span_processor(batch).build()
            }
            TraceExporterInstance::OpenTelemetryStdout(span_exporter) => {
                builder.with_simple_exporter(span_exporter).build()
            }
            #[cfg(test)]
            TraceExporterInstance::Mock(span_exporter) => {
                builder.with_simple_exporter(span_exporter).build()
            }
        }
    }
}
