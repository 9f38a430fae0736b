use std::sync::Arc;

use anyhow::Result;
use scopeguard::defer;
use tokio_graceful::{Shutdown, ShutdownGuard};
use tokio_util::sync::CancellationToken;
use tracing::Span;

use crate::{
    config::HelloConfig,
    observability::{metric::HelloMetrics, Telemetry},
    server::HelloServer,
    service::RegistedService,
    state::HelloState,
};

use self::supervised_task::ShutdownGuardExt as _;

pub mod supervised_task;

pub struct HelloRuntime {
    services: Vec<(Box<dyn RegistedService + Send + Sync>, Span)>,
    state: Arc<HelloState>,
    telemetry: Telemetry,
    shutdown: Shutdown,
    shutdown_guard: ShutdownGuard,
    // This is a cancel token which can be called from the caller to cancel the task. Note that this funnction will not call the cancel() function on this.
    canceller: CancellationToken,
}

impl HelloRuntime {
    /// Sets up the telemetry pipelines and the runtime in one go.
    ///
    /// Must be called from within a tokio runtime.
    pub fn from_config(config: &HelloConfig) -> Result<Self> {
        let telemetry = Telemetry::new(config)?;
        Self::new(config, telemetry)
    }

    pub fn new(config: &HelloConfig, telemetry: Telemetry) -> Result<Self> {
        let canceller = CancellationToken::new();

        // Prepare for graceful shutdown
        let shutdown = {
            let canceller = canceller.clone();
            tokio_graceful::Shutdown::builder()
                .with_signal(async move {
                    tokio::select! {
                        _ = canceller.cancelled() => {}
                        _ = tokio_graceful::default_signal() => {}
                    }
                })
                .with_overwrite_fn(tokio::signal::ctrl_c)
                .build()
        };
        let shutdown_guard = shutdown.guard();

        let metrics = Arc::new(HelloMetrics::new(&telemetry.meter()));

        let services: Vec<(Box<dyn RegistedService + Send + Sync>, Span)> = vec![(
            Box::new(HelloServer::new(config.http.clone(), metrics)),
            tracing::info_span!("http_server"),
        )];

        Ok(Self {
            services,
            state: Arc::new(HelloState::new()),
            telemetry,
            shutdown,
            shutdown_guard,
            canceller,
        })
    }

    pub fn state(&self) -> Arc<HelloState> {
        Arc::clone(&self.state)
    }

    pub fn canceller(&self) -> CancellationToken {
        self.canceller.clone()
    }

    pub fn telemetry(&self) -> &Telemetry {
        &self.telemetry
    }

    pub async fn serve(self) -> Result<()> {
        self.serve_with_ready(tokio::sync::oneshot::channel().0)
            .await
    }

    /// Runs all services until cancelled or until one of them fails, then flushes telemetry.
    ///
    /// `ready` is notified once every service is ready. A failed service is reported as an error.
    pub async fn serve_with_ready(mut self, ready: tokio::sync::oneshot::Sender<()>) -> Result<()> {
        let for_cancel_safity = self.canceller.clone();
        defer! {
            // Cancel-Safity: exit hello-app in case of the future of this function is dropped
            for_cancel_safity.cancel();
        }

        // Watch the ready signal from the runtime state object.
        {
            let mut receiver = self.state.ready.0.subscribe();
            self.shutdown_guard.spawn_supervised_task(async move {
                while receiver.changed().await.is_ok() {
                    if *receiver.borrow_and_update() {
                        let _ = ready.send(()); // Ignore any error occuring during send
                        break;
                    }
                }
            });
        }

        // Setup all services
        let service_count = self.services.len();
        let (mut ready_receiver, mut error_receiver) = {
            let (ready_sender, ready_receiver) = tokio::sync::mpsc::channel(service_count);
            let (error_sender, error_receiver) = tokio::sync::mpsc::channel(service_count);

            for (service, span) in self.services.drain(..) {
                let ready_sender = ready_sender.clone();
                let error_sender = error_sender.clone();
                self.shutdown_guard.spawn_supervised_task_fn_with_span(
                    span,
                    move |shutdown_guard| async move {
                        if let Err(e) = service.serve(ready_sender).await {
                            tracing::error!(error=?e, "service failed");
                            let _ = error_sender.send(e).await;
                        }
                        // Ensure the shutdown_guard is used to prevent warning
                        drop(shutdown_guard);
                    },
                );
            }
            (ready_receiver, error_receiver)
        };

        let check_services_ready = async {
            for _ in 0..service_count {
                ready_receiver.recv().await;
            }
        };

        let maybe_err = tokio::select! {
            _ = check_services_ready => {
                tracing::info!("All of the {service_count} services are ready");

                let _ = self.state.ready.0.send(true); // Ignore any error occuring during send

                // Now waiting for exiting signal
                tokio::select! {
                    maybe_err = error_receiver.recv() => {maybe_err}
                    _ = self.shutdown_guard.cancelled() => None
                }
            }
            maybe_err = error_receiver.recv() => {maybe_err}
            _ = self.shutdown_guard.cancelled() => None
        };

        if maybe_err.is_some() {
            tracing::error!("Failed to serve all services, canceling and exiting now");
        } else {
            tracing::info!("Shutting down the instance");
        }

        // Trigger the shutdown guard to gracefully shutdown all the tokio tasks.
        self.canceller.cancel();

        // Wait for the shutdown guard to complete.
        {
            drop(self.shutdown_guard); // Release the guard hold by the runtime itself
            self.shutdown.shutdown().await;
        }

        tracing::debug!("Flushing pending telemetry");
        self.telemetry.shutdown().await;

        tracing::debug!("The instance is shutdown complete");
        match maybe_err {
            Some(e) => Err(e.context("A service failed")),
            None => Ok(()),
        }
    }
}
