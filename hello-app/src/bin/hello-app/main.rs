#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

use std::{fs::File, io::BufReader};

use anyhow::{bail, Context, Result};
use clap::Parser as _;
use cli::{Cli, GlobalSubcommand, LaunchOptions};

use hello_app::build;
use hello_app::config::{
    env,
    observability::{metric::MetricArgs, ExporterType, OltpExporterConfig},
    Endpoint, HelloConfig, HttpArgs, ServiceIdentity,
};
use hello_app::observability::{log::init_tracing_subscriber, Telemetry};
use hello_app::runtime::HelloRuntime;

mod cli;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize rustls crypto provider
    #[allow(clippy::expect_used)]
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    let fut = async {
        match cli.command {
            GlobalSubcommand::Launch(options) => {
                let config = load_config(options).context("Failed to load config")?;

                let telemetry =
                    Telemetry::new(&config).context("Failed to setup telemetry exporters")?;

                // Spans are bridged to the tracer from now on.
                init_tracing_subscriber(Some(telemetry.tracer()))?;

                tracing::info!(
                    r#"
  _          _ _
 | |__   ___| | | ___
 | '_ \ / _ \ | |/ _ \
 | | | |  __/ | | (_) |
 |_| |_|\___|_|_|\___/  version: v{}  commit: {}  buildtime: {}"#,
                    build::PKG_VERSION,
                    build::COMMIT_HASH,
                    build::BUILD_TIME
                );

                tracing::info!("Current process PID: {}", std::process::id());
                tracing::debug!("hello-app config: {config:#?}");

                tracing::info!("Starting hello-app instance now");
                HelloRuntime::new(&config, telemetry)?.serve().await?;

                tracing::info!("Gracefully exit now");
            }
        }

        Ok::<_, anyhow::Error>(())
    };

    if let Err(error) = fut.await {
        // Startup may fail before the subscriber is installed.
        let _ = init_tracing_subscriber(None);
        tracing::error!(error = format!("{error:#}"));
        std::process::exit(1);
    }
}

fn load_config(options: LaunchOptions) -> Result<HelloConfig> {
    Ok(match (options.config_file, options.config_content) {
        (Some(_), Some(_)) => {
            bail!("Cannot set both --config-file and --config-content at the same time")
        }
        (None, Some(s)) => serde_json::from_str(&s)?,
        (Some(path), None) => {
            let file = File::open(&path)
                .with_context(|| format!("Failed to open config file {path:?}"))?;
            let reader = BufReader::new(file);
            serde_json::from_reader(reader)?
        }
        (None, None) => {
            let endpoint = options
                .exporter_endpoint
                .filter(|endpoint| !endpoint.trim().is_empty())
                .or_else(env::exporter_endpoint)
                .with_context(|| {
                    format!(
                        "The collector address is not set, use --exporter-endpoint or one of the environment variables {}, {}",
                        env::EXPORTER_ENDPOINT,
                        env::LEGACY_EXPORTER_ENDPOINTS.join(", ")
                    )
                })?;

            HelloConfig {
                http: HttpArgs {
                    bind: Endpoint {
                        host: options.host,
                        port: options.port,
                    },
                },
                service: ServiceIdentity::default(),
                exporter: ExporterType::Oltp(OltpExporterConfig {
                    endpoint,
                    headers: options
                        .exporter_headers
                        .filter(|headers| !headers.trim().is_empty())
                        .or_else(env::exporter_headers),
                }),
                metric: MetricArgs {
                    step: options.metric_step,
                },
            }
        }
    })
}
