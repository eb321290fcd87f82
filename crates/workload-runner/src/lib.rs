//! Runners turning workload steps into timed MongoDB operations.
//!
//! A [`Runner`] is built once per step and invoked repeatedly by a driver.
//! Each [`Runner::run_once`] performs one batch of database operations and
//! returns its elapsed wall-clock time. Per-operation telemetry goes to a
//! [`Reporter`].
//!
//! # Runners
//!
//! - [`TimeSeriesRunner`] - one insert per dictionary entity per invocation,
//!   stamped from a per-runner clock, fanned out over a [`WorkerPool`]
//! - [`UpdateManyRunner`] / [`UpdateOneRunner`] - render a filter and an
//!   update (document or pipeline) and apply them
//!
//! # Architecture
//!
//! ```text
//! WorkloadStep ──► build_runner() ──► Box<dyn Runner>
//!                                          │ run_once()
//!                                          ▼
//!                   Template ──► documents / filter / update
//!                                          │
//!                                          ▼
//!                   DocumentCollection (MongoCollection, MemoryCollection)
//!                                          │
//!                                          ▼
//!                   Reporter::report_op(runner, 1, latency)
//! ```

pub mod clock;
pub mod collection;
pub mod error;
pub mod factory;
pub mod pool;
pub mod reporter;
pub mod runner;
pub mod testing;
pub mod timeseries;
pub mod update;

// Re-exports for convenience
pub use clock::{jitter, ClockState, RunnerClock};
pub use collection::{DocumentCollection, MongoCollection, UpdateOutcome, UpdateSettings};
pub use error::{RunnerError, StoreError};
pub use factory::{build_runner, validate_step};
pub use pool::WorkerPool;
pub use reporter::{LogReporter, Reporter};
pub use runner::{Runner, RunnerContext};
pub use timeseries::TimeSeriesRunner;
pub use update::{UpdateMany, UpdateManyRunner, UpdateOne, UpdateOneRunner, UpdateRunner, UpdateStrategy};
