use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::mpsc::Sender;

/// A long-running component owned by the hello-app runtime. Every service is started in its own
/// supervised task, and any service failing causes the runtime to shutdown.
///
/// The task is cancelled when the runtime is cancelled, so a service does not need to watch the
/// shutdown signal itself.
#[async_trait]
pub trait RegistedService {
    async fn serve(&self, ready: Sender<()>) -> Result<()>;
}
