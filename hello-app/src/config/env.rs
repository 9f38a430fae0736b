//! Environment variables understood by the service.
//!
//! `EXPORTER_ENDPOINT` is the current name of the collector address. Older deployments still set
//! `ENDPOINT_ADDRESS` or `COLLECTOR_ADDRESS`, which are consulted in that order when it is absent.

pub const EXPORTER_ENDPOINT: &str = "EXPORTER_ENDPOINT";
pub const EXPORTER_HEADERS: &str = "EXPORTER_HEADERS";
pub const LEGACY_EXPORTER_ENDPOINTS: [&str; 2] = ["ENDPOINT_ADDRESS", "COLLECTOR_ADDRESS"];

/// Reads the collector address, falling back to the legacy variable names.
///
/// Empty values are treated as unset.
pub fn exporter_endpoint() -> Option<String> {
    std::iter::once(EXPORTER_ENDPOINT)
        .chain(LEGACY_EXPORTER_ENDPOINTS)
        .find_map(|name| {
            let value = std::env::var(name).ok()?;
            if value.trim().is_empty() {
                None
            } else {
                tracing::debug!(variable = name, "Collector address read from environment");
                Some(value)
            }
        })
}

pub fn exporter_headers() -> Option<String> {
    std::env::var(EXPORTER_HEADERS)
        .ok()
        .filter(|value| !value.trim().is_empty())
}
