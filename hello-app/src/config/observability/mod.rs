use derivative::Derivative;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod headers;
pub mod metric;

pub use headers::{ExporterHeaders, HeaderParseError};

/// Endpoints containing this suffix belong to the managed Elastic Cloud offering, which only
/// accepts TLS connections authenticated by headers.
pub const MANAGED_VENDOR_SUFFIX: &str = "cloud.es.io";

const HTTPS_PREFIX: &str = "https://";
const HTTP_PREFIX: &str = "http://";

#[derive(Clone, Serialize, Deserialize, Derivative)]
#[derivative(Debug, PartialEq)]
#[serde(tag = "type")]
pub enum ExporterType {
    /// Exporting in the OpenTelemetry Protocol (OTLP) format over gRPC
    #[serde(rename = "oltp")]
    Oltp(OltpExporterConfig),

    /// Exporting traces and metrics to stdout (for debug only)
    #[serde(rename = "stdout")]
    Stdout,

    #[cfg(test)]
    #[serde(skip)]
    #[serde(rename = "mock")]
    Mock {
        #[derivative(Debug = "ignore")]
        #[derivative(PartialEq = "ignore")]
        spans: opentelemetry_sdk::trace::InMemorySpanExporter,

        #[derivative(Debug = "ignore")]
        #[derivative(PartialEq = "ignore")]
        metrics: opentelemetry_sdk::metrics::InMemoryMetricExporter,
    },
}

#[cfg(test)]
impl ExporterType {
    pub fn mock() -> Self {
        ExporterType::Mock {
            spans: Default::default(),
            metrics: Default::default(),
        }
    }
}

#[derive(Clone, Serialize, Deserialize, PartialEq, Derivative)]
#[derivative(Debug)]
#[serde(deny_unknown_fields)]
pub struct OltpExporterConfig {
    pub endpoint: String,

    /// Comma-separated `key=value` list, only sent to managed vendor endpoints.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[derivative(Debug = "ignore")]
    pub headers: Option<String>,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExporterConfigError {
    #[error("The exporter endpoint is empty")]
    EmptyEndpoint,

    #[error("Invalid exporter headers: {0}")]
    InvalidHeaders(#[from] HeaderParseError),

    #[error("The exporter endpoint `{0}` should use plaintext `http://`")]
    UnsupportedScheme(String),
}

/// How the exporters reach the collector. Decided once, before any telemetry is sent.
#[derive(Debug, Clone, PartialEq)]
pub enum ExporterTransport {
    /// TLS channel, carrying the parsed headers as credentials.
    Secure {
        /// `host[:port]` with the scheme stripped.
        authority: String,
        headers: ExporterHeaders,
    },
    /// Plaintext channel without any header.
    Insecure { uri: String },
}

impl ExporterTransport {
    pub fn uri(&self) -> String {
        match self {
            ExporterTransport::Secure { authority, .. } => format!("{HTTPS_PREFIX}{authority}"),
            ExporterTransport::Insecure { uri } => uri.clone(),
        }
    }

    pub fn is_secure(&self) -> bool {
        matches!(self, ExporterTransport::Secure { .. })
    }
}

impl OltpExporterConfig {
    pub fn transport(&self) -> Result<ExporterTransport, ExporterConfigError> {
        let endpoint = self.endpoint.trim();
        if endpoint.is_empty() {
            return Err(ExporterConfigError::EmptyEndpoint);
        }

        if endpoint.contains(MANAGED_VENDOR_SUFFIX) {
            let authority = endpoint
                .strip_prefix(HTTPS_PREFIX)
                .or_else(|| endpoint.strip_prefix(HTTP_PREFIX))
                .unwrap_or(endpoint)
                .trim_end_matches('/')
                .to_owned();
            let headers = ExporterHeaders::parse(self.headers.as_deref().unwrap_or_default())?;

            Ok(ExporterTransport::Secure { authority, headers })
        } else {
            let uri = if endpoint.starts_with(HTTP_PREFIX) {
                endpoint.to_owned()
            } else if endpoint.contains("://") {
                // tonic refuses `https` without a TLS config, on the first export.
                return Err(ExporterConfigError::UnsupportedScheme(endpoint.to_owned()));
            } else {
                format!("{HTTP_PREFIX}{endpoint}")
            };

            Ok(ExporterTransport::Insecure { uri })
        }
    }
}
