//! Operation reporting.

use std::time::Duration;
use tracing::debug;

/// Sink for per-operation telemetry.
///
/// Called from worker tasks concurrently; implementations must be cheap
/// and must not fail.
pub trait Reporter: Send + Sync {
    /// Record that `runner` completed `op_count` operations in `elapsed`.
    fn report_op(&self, runner: &str, op_count: u64, elapsed: Duration);
}

/// Reporter that logs every operation at debug level.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogReporter;

impl Reporter for LogReporter {
    fn report_op(&self, runner: &str, op_count: u64, elapsed: Duration) {
        debug!(
            runner,
            op_count,
            elapsed_ms = elapsed.as_millis() as u64,
            "operation completed"
        );
    }
}
