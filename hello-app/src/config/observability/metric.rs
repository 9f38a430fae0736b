use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct MetricArgs {
    /// Seconds between two collections of the metric reader.
    #[serde(default = "metric_args_default_step")]
    pub step: u64,
}

impl Default for MetricArgs {
    fn default() -> Self {
        Self {
            step: metric_args_default_step(),
        }
    }
}

fn metric_args_default_step() -> u64 {
    5
}
