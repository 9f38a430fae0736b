#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

use shadow_rs::shadow;

pub mod config;
pub mod error;
pub mod observability;
pub mod runtime;
mod server;
mod service;
mod state;

shadow!(build);

#[global_allocator]
static GLOBAL_ALLOCATOR: observability::metric::heap::CountingAllocator =
    observability::metric::heap::CountingAllocator;

pub(crate) const HTTP_RESPONSE_SERVER_HEADER: &str =
    const_format::concatcp!("hello-app/", crate::build::PKG_VERSION);

pub use crate::server::hello::HelloResponse;

#[cfg(test)]
mod tests {

    use anyhow::Result;
    use scopeguard::defer;
    use tokio::select;
    use tracing_subscriber::EnvFilter;

    use crate::{
        config::{observability::ExporterType, HelloConfig},
        observability::log::build_tracing_subscriber,
        runtime::HelloRuntime,
    };

    #[ctor::ctor]
    #[allow(clippy::expect_used)]
    fn init() {
        // Initialize rustls crypto provider
        rustls::crypto::ring::default_provider()
            .install_default()
            .expect("Failed to install rustls crypto provider");

        // Initialize log tracing. Tests which check exported spans install their own subscriber.
        tracing::subscriber::set_global_default(build_tracing_subscriber(
            None,
            EnvFilter::new("off"),
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tokio_graceful=off,hello_app=debug".into()),
        ))
        .expect("Failed to install the global tracing subscriber");
    }

    /// A config exporting to in-memory exporters, listening on a random port.
    pub fn mock_config(port: u16) -> HelloConfig {
        let mut config = HelloConfig::with_exporter(ExporterType::mock());
        config.http.bind.host = Some("127.0.0.1".to_owned());
        config.http.bind.port = port;
        config
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 10)]
    async fn test_exit_on_cancel() -> Result<()> {
        #[allow(clippy::unwrap_used)]
        let config = mock_config(portpicker::pick_unused_port().unwrap());

        let (ready_sender, ready_receiver) = tokio::sync::oneshot::channel();

        let hello_runtime = HelloRuntime::from_config(&config)?;
        let canceller = hello_runtime.canceller();

        let join_handle =
            tokio::task::spawn(async move { hello_runtime.serve_with_ready(ready_sender).await });

        ready_receiver.await?;
        // the service is ready now, so we cancel it
        canceller.cancel();

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
    async fn test_exit_on_bind_error() -> Result<()> {
        #[allow(clippy::unwrap_used)]
        let port = portpicker::pick_unused_port().unwrap();
        let _occupied = tokio::net::TcpListener::bind(("127.0.0.1", port)).await?;

        let (ready_sender, ready_receiver) = tokio::sync::oneshot::channel();

        let hello_runtime = HelloRuntime::from_config(&mock_config(port))?;
        let join_handle =
            tokio::task::spawn(async move { hello_runtime.serve_with_ready(ready_sender).await });

        select! {
            _ = tokio::time::sleep(std::time::Duration::from_secs(5)) => {
                defer! {
                    std::process::exit(1);
                }
                panic!("Wait for hello-app exit timeout")
            }
            res = join_handle => {
                assert!(res?.is_err(), "serving on an occupied port should fail");
            }
        }

        assert!(ready_receiver.await.is_err());

        Ok(())
    }
}
