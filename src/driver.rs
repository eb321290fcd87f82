//! Drives runners on a schedule for a bounded duration.
//!
//! Every runner gets its own task. Within that task `run_once` is called
//! sequentially, so a runner's state is never touched by two invocations
//! at once. A runner whose invocation fails is stopped; the others keep
//! going until the deadline. A runner reporting itself finished is retired
//! early. Unpaced runners yield between invocations so they cannot starve
//! the rest of the runtime.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};
use workload_runner::Runner;

/// A runner together with its pacing.
pub struct ScheduledRunner {
    pub runner: Box<dyn Runner>,
    /// Minimum time between invocation starts. `None` runs back to back.
    pub pace: Option<Duration>,
}

impl ScheduledRunner {
    pub fn new(runner: Box<dyn Runner>, pace: Option<Duration>) -> Self {
        Self { runner, pace }
    }
}

/// Outcome of one runner.
#[derive(Debug, Clone, Serialize)]
pub struct RunnerSummary {
    pub name: String,
    /// Completed invocations
    pub invocations: u64,
    /// Sum of the elapsed times returned by the runner
    pub busy_ms: u64,
    /// Error that stopped the runner
    pub failure: Option<String>,
}

/// Outcome of a whole run.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub runners: Vec<RunnerSummary>,
}

impl RunSummary {
    /// Runners that stopped on an error.
    pub fn failed(&self) -> Vec<&RunnerSummary> {
        self.runners.iter().filter(|r| r.failure.is_some()).collect()
    }

    pub fn is_success(&self) -> bool {
        self.runners.iter().all(|r| r.failure.is_none())
    }
}

/// Run every runner until `duration` elapses or `shutdown` flips to true.
pub async fn drive(
    runners: Vec<ScheduledRunner>,
    duration: Duration,
    shutdown: watch::Receiver<bool>,
) -> RunSummary {
    let started_at = Utc::now();
    let now = Instant::now();
    // Durations beyond what the clock can represent run until shutdown
    let deadline = now
        .checked_add(duration)
        .unwrap_or_else(|| now + Duration::from_secs(100 * 365 * 86_400));

    info!("Driving {} runners for {:?}", runners.len(), duration);

    let handles: Vec<_> = runners
        .into_iter()
        .map(|scheduled| {
            let name = scheduled.runner.name().to_string();
            let handle = tokio::spawn(drive_one(scheduled, deadline, shutdown.clone()));
            (name, handle)
        })
        .collect();

    let mut summaries = Vec::with_capacity(handles.len());
    for (name, handle) in handles {
        let summary = match handle.await {
            Ok(summary) => summary,
            Err(e) => {
                error!("Runner {} task did not complete: {}", name, e);
                RunnerSummary {
                    name,
                    invocations: 0,
                    busy_ms: 0,
                    failure: Some(format!("task did not complete: {e}")),
                }
            }
        };
        summaries.push(summary);
    }

    RunSummary {
        started_at,
        finished_at: Utc::now(),
        runners: summaries,
    }
}

async fn drive_one(
    scheduled: ScheduledRunner,
    deadline: Instant,
    mut shutdown: watch::Receiver<bool>,
) -> RunnerSummary {
    let ScheduledRunner { mut runner, pace } = scheduled;
    let mut summary = RunnerSummary {
        name: runner.name().to_string(),
        invocations: 0,
        busy_ms: 0,
        failure: None,
    };

    while Instant::now() < deadline && !*shutdown.borrow() {
        let started = Instant::now();

        match runner.run_once().await {
            Ok(elapsed) => {
                summary.invocations += 1;
                summary.busy_ms += elapsed.as_millis() as u64;
                debug!("Runner {} invocation took {:?}", summary.name, elapsed);
            }
            Err(e) => {
                if e.is_configuration() {
                    error!("Runner {} is misconfigured, stopping: {}", summary.name, e);
                } else {
                    error!("Runner {} failed, stopping: {}", summary.name, e);
                }
                summary.failure = Some(e.to_string());
                break;
            }
        }

        if runner.is_finished() {
            info!("Runner {} has no more work, retiring", summary.name);
            break;
        }

        match pace {
            Some(pace) => {
                let next = (started + pace).min(deadline);
                tokio::select! {
                    _ = tokio::time::sleep_until(next) => {}
                    Ok(()) = shutdown.changed() => {}
                }
            }
            None => tokio::task::yield_now().await,
        }
    }

    if *shutdown.borrow() {
        warn!("Runner {} interrupted", summary.name);
    }
    info!(
        "Runner {} finished after {} invocations",
        summary.name, summary.invocations
    );
    summary
}
