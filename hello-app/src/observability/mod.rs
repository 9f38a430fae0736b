use std::time::Duration;

use anyhow::{bail, Result};
use opentelemetry::{metrics::MeterProvider as _, trace::TracerProvider as _, KeyValue};
use opentelemetry_otlp::{Compression, Protocol, WithExportConfig, WithTonicConfig};
use opentelemetry_sdk::{
    metrics::SdkMeterProvider,
    trace::{SdkTracer, SdkTracerProvider},
    Resource,
};
use opentelemetry_semantic_conventions::resource::SERVICE_VERSION;
use tonic::{metadata::MetadataMap, transport::ClientTlsConfig};

use crate::config::{observability::ExporterTransport, HelloConfig, ServiceIdentity};

pub mod log;
pub mod metric;
pub mod trace;

/// Instrumentation scope of every span emitted by the service.
pub const TRACER_NAME: &str = "io.opentelemetry.traces.hello";

/// Instrumentation scope of every instrument created by the service.
pub const METER_NAME: &str = "io.opentelemetry.metrics.hello";

const EXPORT_TIMEOUT: Duration = Duration::from_secs(5);

/// Builds the attribute set shared by all traces and metrics of this process.
///
/// The SDK detectors contribute `telemetry.sdk.*`, the service identity is added on top.
pub fn otlp_resource(service: &ServiceIdentity) -> Result<Resource> {
    if service.name.trim().is_empty() {
        bail!("The service name should not be empty");
    }
    if service.version.trim().is_empty() {
        bail!("The service version should not be empty");
    }

    Ok(Resource::builder()
        .with_service_name(service.name.clone())
        .with_attribute(KeyValue::new(SERVICE_VERSION, service.version.clone()))
        .build())
}

/// What the OTLP gRPC exporters are told about the collector.
#[derive(Debug, Clone)]
pub(crate) struct TonicExporterSettings {
    pub uri: String,
    /// Set only for the managed vendor.
    pub tls: Option<ClientTlsConfig>,
    pub metadata: MetadataMap,
}

impl TonicExporterSettings {
    pub fn new(transport: &ExporterTransport) -> Result<Self> {
        Ok(match transport {
            ExporterTransport::Secure { headers, .. } => Self {
                uri: transport.uri(),
                tls: Some(ClientTlsConfig::new().with_webpki_roots()),
                metadata: MetadataMap::from_headers(headers.to_header_map()?),
            },
            ExporterTransport::Insecure { uri } => Self {
                uri: uri.clone(),
                tls: None,
                metadata: MetadataMap::new(),
            },
        })
    }
}

/// Applies the collector settings to an OTLP gRPC exporter builder.
pub(crate) fn configure_tonic_exporter<B>(builder: B, settings: TonicExporterSettings) -> B
where
    B: WithExportConfig + WithTonicConfig,
{
    let builder = builder
        .with_endpoint(settings.uri)
        .with_protocol(Protocol::Grpc)
        .with_compression(Compression::Gzip)
        .with_timeout(EXPORT_TIMEOUT)
        .with_metadata(settings.metadata);

    match settings.tls {
        Some(tls) => builder.with_tls_config(tls),
        None => builder,
    }
}

/// The tracer provider and meter provider of the process.
///
/// Both are cheap handles to shared state, so a clone observes the same pipelines.
#[derive(Debug, Clone)]
pub struct Telemetry {
    tracer_provider: SdkTracerProvider,
    meter_provider: SdkMeterProvider,
}

impl Telemetry {
    pub fn new(config: &HelloConfig) -> Result<Self> {
        // Nothing is spawned until the whole config is known to be valid.
        metric::instance::check_step(config.metric.step)?;
        let resource = otlp_resource(&config.service)?;

        if let crate::config::observability::ExporterType::Oltp(oltp) = &config.exporter {
            let transport = oltp.transport()?;
            tracing::debug!(
                endpoint = transport.uri(),
                secure = transport.is_secure(),
                "Exporting telemetry to collector"
            );
        }

        let tracer_provider = config
            .exporter
            .instantiate_trace()?
            .into_sdk_tracer_provider(resource.clone());
        let meter_provider = config
            .exporter
            .instantiate_metric(config.metric.step)?
            .into_sdk_meter_provider(resource);

        trace::propagation::install_text_map_propagator();

        Ok(Self {
            tracer_provider,
            meter_provider,
        })
    }

    pub fn tracer(&self) -> SdkTracer {
        self.tracer_provider.tracer(TRACER_NAME)
    }

    pub fn meter(&self) -> opentelemetry::metrics::Meter {
        self.meter_provider.meter(METER_NAME)
    }

    /// Exports everything recorded so far.
    pub async fn force_flush(&self) -> Result<()> {
        let this = self.clone();
        tokio::task::spawn_blocking(move || -> Result<()> {
            this.tracer_provider.force_flush()?;
            this.meter_provider.force_flush()?;
            Ok(())
        })
        .await?
    }

    /// Flushes and stops both pipelines. Failures are logged and otherwise ignored.
    pub async fn shutdown(self) {
        let Self {
            tracer_provider,
            meter_provider,
        } = self;

        // The SDK blocks the calling thread until the exporters are drained.
        let res = tokio::task::spawn_blocking(move || {
            if let Err(error) = tracer_provider.shutdown() {
                tracing::warn!(%error, "Failed to shutdown tracer provider");
            }
            if let Err(error) = meter_provider.shutdown() {
                tracing::warn!(%error, "Failed to shutdown meter provider");
            }
        })
        .await;

        if let Err(error) = res {
            tracing::warn!(%error, "Telemetry shutdown task failed");
        }
    }
}
