use anyhow::{bail, Result};
use tokio_graceful::ShutdownGuard;
use tracing::{Instrument, Span};

#[derive(Debug)]
pub enum SupervisedTaskResult<O> {
    /// The task finished successfully.
    Finished(O),
    /// The task was cancelled.
    Cancelled,
}

impl<O> SupervisedTaskResult<O> {
    #[allow(dead_code)]
    pub fn assume_finished(self) -> Result<O> {
        match self {
            Self::Finished(o) => Ok(o),
            Self::Cancelled => bail!("task was cancelled"),
        }
    }
}

/// Spawns tasks which are dropped as soon as the shutdown signal is received.
///
/// Each task holds a clone of the guard until it exits, so a graceful shutdown waits for all of
/// them to be torn down.
pub trait ShutdownGuardExt {
    fn spawn_supervised_task_with_span<T, O>(
        &self,
        span: Span,
        task: T,
    ) -> tokio::task::JoinHandle<SupervisedTaskResult<O>>
    where
        T: std::future::Future<Output = O> + Send + 'static,
        O: Send + 'static;

    #[inline]
    #[track_caller]
    fn spawn_supervised_task<T, O>(&self, task: T) -> tokio::task::JoinHandle<SupervisedTaskResult<O>>
    where
        T: std::future::Future<Output = O> + Send + 'static,
        O: Send + 'static,
    {
        self.spawn_supervised_task_with_span(Span::current(), task)
    }

    fn spawn_supervised_task_fn_with_span<F, T, O>(
        &self,
        span: Span,
        task: F,
    ) -> tokio::task::JoinHandle<SupervisedTaskResult<O>>
    where
        F: FnOnce(ShutdownGuard) -> T + Send + 'static,
        T: std::future::Future<Output = O> + Send + 'static,
        O: Send + 'static;
}

impl ShutdownGuardExt for ShutdownGuard {
    #[inline]
    #[track_caller]
    fn spawn_supervised_task_with_span<T, O>(
        &self,
        span: Span,
        task: T,
    ) -> tokio::task::JoinHandle<SupervisedTaskResult<O>>
    where
        T: std::future::Future<Output = O> + Send + 'static,
        O: Send + 'static,
    {
        let guard_cloned = self.clone();

        tokio::task::spawn(async move {
            let output = tokio::select! {
                _ = guard_cloned.cancelled() => {
                    /* cancelled, so we just exit here and drop the another future */
                    SupervisedTaskResult::Cancelled
                }
                output = task.instrument(span) => {
                    /* finished */
                    SupervisedTaskResult::Finished(output)
                }
            };
            drop(guard_cloned);
            output
        })
    }

    #[inline]
    #[track_caller]
    fn spawn_supervised_task_fn_with_span<F, T, O>(
        &self,
        span: Span,
        task: F,
    ) -> tokio::task::JoinHandle<SupervisedTaskResult<O>>
    where
        F: FnOnce(ShutdownGuard) -> T + Send + 'static,
        T: std::future::Future<Output = O> + Send + 'static,
        O: Send + 'static,
    {
        let guard_cloned = self.clone();
        self.spawn_supervised_task_with_span(span, async move { task(guard_cloned).await })
    }
}
