//! Bounded worker pool for per-invocation fan-out.

use crate::error::RunnerError;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinSet};
use tracing::error;

/// Fixed-size pool running a batch of tasks concurrently.
///
/// Created once per runner and reused across invocations. At most `size`
/// tasks of a batch run at a time. Dropping the pool closes it.
#[derive(Debug)]
pub struct WorkerPool {
    permits: Arc<Semaphore>,
    size: usize,
}

impl WorkerPool {
    /// Create a pool of `size` workers (at least one).
    pub fn new(size: usize) -> Self {
        let size = size.max(1);
        Self {
            permits: Arc::new(Semaphore::new(size)),
            size,
        }
    }

    /// Number of workers.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Run every task and wait for all of them.
    ///
    /// Tasks are never cancelled: a failure is recorded and the remaining
    /// tasks still run to completion. Returns the number of tasks that
    /// succeeded, or the first failure observed.
    pub async fn run_all<F>(&self, tasks: Vec<F>) -> Result<usize, RunnerError>
    where
        F: Future<Output = Result<(), RunnerError>> + Send + 'static,
    {
        let mut set = JoinSet::new();
        for task in tasks {
            let permits = Arc::clone(&self.permits);
            set.spawn(async move {
                let _permit = permits
                    .acquire_owned()
                    .await
                    .map_err(|_| RunnerError::Concurrency("worker pool is closed".to_string()))?;
                task.await
            });
        }

        let mut succeeded = 0;
        let mut first_failure = None;
        while let Some(joined) = set.join_next().await {
            match joined.map_err(join_failure).and_then(|outcome| outcome) {
                Ok(()) => succeeded += 1,
                Err(e) => {
                    error!("Worker task failed: {e}");
                    first_failure.get_or_insert(e);
                }
            }
        }

        match first_failure {
            Some(e) => Err(e),
            None => Ok(succeeded),
        }
    }

    /// Stop accepting work.
    pub fn close(&self) {
        self.permits.close();
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.close();
    }
}

fn join_failure(e: JoinError) -> RunnerError {
    if e.is_panic() {
        RunnerError::Concurrency(format!("worker task panicked: {e}"))
    } else {
        RunnerError::Concurrency(format!("worker task cancelled: {e}"))
    }
}
