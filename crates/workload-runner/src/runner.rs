//! Runner contract shared by every workload variant.

use crate::collection::DocumentCollection;
use crate::error::RunnerError;
use crate::reporter::Reporter;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use workload_core::WorkloadStep;
use workload_template::Template;

/// One configured, repeatedly invoked unit of synthetic workload.
///
/// The driver calls [`Runner::run_once`] on a schedule. Calls on the same
/// runner never overlap: `&mut self` makes the runner's own state (such as
/// a time-series clock) exclusive to the invocation in progress.
#[async_trait]
pub trait Runner: Send {
    /// Step name, for reporting and log correlation.
    fn name(&self) -> &str;

    /// Perform one batch of database operations.
    ///
    /// Returns the elapsed wall-clock time of the batch. Each call performs
    /// real I/O against the target collection.
    async fn run_once(&mut self) -> Result<Duration, RunnerError>;

    /// Whether further invocations can no longer do any work.
    ///
    /// The driver retires a finished runner instead of calling it again.
    fn is_finished(&self) -> bool {
        false
    }
}

/// Collaborators every runner is built from.
#[derive(Clone)]
pub struct RunnerContext {
    /// The step being run
    pub step: WorkloadStep,
    /// Document and expression source
    pub template: Arc<dyn Template>,
    /// Target collection
    pub collection: Arc<dyn DocumentCollection>,
    /// Telemetry sink
    pub reporter: Arc<dyn Reporter>,
}

impl RunnerContext {
    pub fn new(
        step: WorkloadStep,
        template: Arc<dyn Template>,
        collection: Arc<dyn DocumentCollection>,
        reporter: Arc<dyn Reporter>,
    ) -> Self {
        Self {
            step,
            template,
            collection,
            reporter,
        }
    }

    /// Step name.
    pub fn name(&self) -> &str {
        &self.step.name
    }
}
