use std::time::Duration;

use anyhow::{bail, Context, Result};
use opentelemetry_sdk::{
    metrics::{PeriodicReader, SdkMeterProvider},
    Resource,
};

use crate::{
    config::observability::ExporterType,
    observability::{configure_tonic_exporter, TonicExporterSettings},
};

pub fn check_step(step: u64) -> Result<()> {
    if step == 0 {
        bail!("The metric step should be at least 1 second");
    }
    Ok(())
}

impl ExporterType {
    pub fn instantiate_metric(&self, step: u64) -> Result<MetricExporterInstance> {
        check_step(step)?;

        match self {
            ExporterType::Oltp(config) => {
                let settings = TonicExporterSettings::new(&config.transport()?)?;
                let exporter = configure_tonic_exporter(
                    opentelemetry_otlp::MetricExporter::builder().with_tonic(),
                    settings,
                )
                .build()
                .context("Failed to create OTLP gRPC metric exporter")?;

                Ok(MetricExporterInstance::OpenTelemetryOltp(step, exporter))
            }
            ExporterType::Stdout => Ok(MetricExporterInstance::OpenTelemetryStdout(
                step,
                opentelemetry_stdout::MetricExporter::default(),
            )),
            #[cfg(test)]
            ExporterType::Mock { metrics, .. } => {
                Ok(MetricExporterInstance::Mock(step, metrics.clone()))
            }
        }
    }
}

pub enum MetricExporterInstance {
    OpenTelemetryOltp(u64 /* step */, opentelemetry_otlp::MetricExporter),
    OpenTelemetryStdout(u64 /* step */, opentelemetry_stdout::MetricExporter),
    #[cfg(test)]
    Mock(
        u64, /* step */
        opentelemetry_sdk::metrics::InMemoryMetricExporter,
    ),
}

impl MetricExporterInstance {
    /// The reader collects and pushes every `step` seconds from its own thread.
    pub fn into_sdk_meter_provider(self, resource: Resource) -> SdkMeterProvider {
        let builder = SdkMeterProvider::builder().with_resource(resource);

        match self {
            MetricExporterInstance::OpenTelemetryOltp(step, exporter) => {
                let reader = PeriodicReader::builder(exporter)
                    .with_interval(Duration::from_secs(step))
                    .build();
                builder.with_reader(reader).build()
            }
            MetricExporterInstance::OpenTelemetryStdout(step, exporter) => {
                let reader = PeriodicReader::builder(exporter)
                    .with_interval(Duration::from_secs(step))
                    .build();
                builder.with_reader(reader).build()
            }
            #[cfg(test)]
            MetricExporterInstance::Mock(step, exporter) => {
                let reader = PeriodicReader::builder(exporter)
                    .with_interval(Duration::from_secs(step))
                    .build();
                builder.with_reader(reader).build()
            }
        }
    }
}
