use observability::{metric::MetricArgs, ExporterType};
use serde::{Deserialize, Serialize};

pub mod env;
pub mod observability;

pub const DEFAULT_SERVICE_NAME: &str = "hello-app";
pub const DEFAULT_SERVICE_VERSION: &str = const_format::concatcp!("v", crate::build::PKG_VERSION);
pub const DEFAULT_HTTP_PORT: u16 = 8888;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct HelloConfig {
    #[serde(default)]
    pub http: HttpArgs,

    #[serde(default)]
    pub service: ServiceIdentity,

    /// Where traces and metrics are shipped to.
    pub exporter: ExporterType,

    #[serde(default)]
    pub metric: MetricArgs,
}

impl HelloConfig {
    pub fn with_exporter(exporter: ExporterType) -> Self {
        Self {
            http: HttpArgs::default(),
            service: ServiceIdentity::default(),
            exporter,
            metric: MetricArgs::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct HttpArgs {
    #[serde(default = "http_args_default_bind")]
    pub bind: Endpoint,
}

impl Default for HttpArgs {
    fn default() -> Self {
        Self {
            bind: http_args_default_bind(),
        }
    }
}

fn http_args_default_bind() -> Endpoint {
    Endpoint {
        host: None,
        port: DEFAULT_HTTP_PORT,
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Endpoint {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    pub port: u16,
}

/// Identifies the emitting service on every span and metric point.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ServiceIdentity {
    #[serde(default = "service_identity_default_name")]
    pub name: String,
    #[serde(default = "service_identity_default_version")]
    pub version: String,
}

impl Default for ServiceIdentity {
    fn default() -> Self {
        Self {
            name: service_identity_default_name(),
            version: service_identity_default_version(),
        }
    }
}

fn service_identity_default_name() -> String {
    DEFAULT_SERVICE_NAME.to_owned()
}

fn service_identity_default_version() -> String {
    DEFAULT_SERVICE_VERSION.to_owned()
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use serde_json::json;

    use super::observability::OltpExporterConfig;
    use super::*;

    #[test]
    fn test_deserialize_minimal() -> Result<()> {
        let json_value = json!(
            {
                "exporter": {
                    "type": "oltp",
                    "endpoint": "localhost:4317"
                }
            }
        );

        let expected = HelloConfig {
            http: HttpArgs {
                bind: Endpoint {
                    host: None,
                    port: 8888,
                },
            },
            service: ServiceIdentity {
                name: "hello-app".to_owned(),
                version: "v1.0.0".to_owned(),
            },
            exporter: ExporterType::Oltp(OltpExporterConfig {
                endpoint: "localhost:4317".to_owned(),
                headers: None,
            }),
            metric: MetricArgs { step: 5 },
        };

        let deserialized: HelloConfig = serde_json::from_value(json_value)?;
        assert_eq!(deserialized, expected);
        Ok(())
    }

    #[test]
    fn test_deserialize_full() -> Result<()> {
        let json_value = json!(
            {
                "http": {
                    "bind": {
                        "host": "127.0.0.1",
                        "port": 18888
                    }
                },
                "service": {
                    "name": "greeter",
                    "version": "v2.0.0"
                },
                "exporter": {
                    "type": "oltp",
                    "endpoint": "https://my-deployment.apm.us-east-1.aws.cloud.es.io:443",
                    "headers": "Authorization=Bearer xyz"
                },
                "metric": {
                    "step": 1
                }
            }
        );

        let expected = HelloConfig {
            http: HttpArgs {
                bind: Endpoint {
                    host: Some("127.0.0.1".to_owned()),
                    port: 18888,
                },
            },
            service: ServiceIdentity {
                name: "greeter".to_owned(),
                version: "v2.0.0".to_owned(),
            },
            exporter: ExporterType::Oltp(OltpExporterConfig {
                endpoint: "https://my-deployment.apm.us-east-1.aws.cloud.es.io:443".to_owned(),
                headers: Some("Authorization=Bearer xyz".to_owned()),
            }),
            metric: MetricArgs { step: 1 },
        };

        let deserialized: HelloConfig = serde_json::from_value(json_value)?;
        assert_eq!(deserialized, expected);
        Ok(())
    }

    #[test]
    fn test_deserialize_stdout() -> Result<()> {
        let deserialized: HelloConfig = serde_json::from_value(json!(
            {
                "exporter": {
                    "type": "stdout"
                }
            }
        ))?;
        assert_eq!(deserialized.exporter, ExporterType::Stdout);
        Ok(())
    }

    #[test]
    fn test_deserialize_rejects_unknown_fields() {
        let res = serde_json::from_value::<HelloConfig>(json!(
            {
                "exporter": {
                    "type": "stdout"
                },
                "admin_bind": {
                    "port": 9901
                }
            }
        ));
        assert!(res.is_err());
    }

    #[test]
    fn test_deserialize_requires_exporter() {
        let res = serde_json::from_value::<HelloConfig>(json!({}));
        assert!(res.is_err());
    }
}
