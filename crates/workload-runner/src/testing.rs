//! In-memory test doubles for driving runners without a database.

use crate::collection::{DocumentCollection, UpdateOutcome, UpdateSettings};
use crate::error::StoreError;
use crate::reporter::Reporter;
use async_trait::async_trait;
use bson::Document;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use workload_core::UpdateBody;

/// Which update call was made.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateScope {
    Many,
    One,
}

/// An update call captured by [`MemoryCollection`].
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedUpdate {
    pub scope: UpdateScope,
    pub filter: Document,
    pub update: UpdateBody,
    pub settings: UpdateSettings,
}

/// Collection that records every call in memory.
#[derive(Debug, Default)]
pub struct MemoryCollection {
    name: String,
    inserted: Mutex<Vec<Document>>,
    updates: Mutex<Vec<RecordedUpdate>>,
    insert_attempts: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    insert_delay: Option<Duration>,
    fail_inserts_from: Option<usize>,
}

impl MemoryCollection {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Hold each insert for `delay` before completing it.
    pub fn with_insert_delay(mut self, delay: Duration) -> Self {
        self.insert_delay = Some(delay);
        self
    }

    /// Fail every insert attempt numbered `attempt` or later (0-based).
    pub fn failing_inserts_from(mut self, attempt: usize) -> Self {
        self.fail_inserts_from = Some(attempt);
        self
    }

    /// Documents inserted so far.
    pub fn inserted(&self) -> Vec<Document> {
        self.inserted
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Update calls made so far.
    pub fn updates(&self) -> Vec<RecordedUpdate> {
        self.updates
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Highest number of inserts observed running at once.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn record_update(&self, update: RecordedUpdate) {
        self.updates
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(update);
    }
}

#[async_trait]
impl DocumentCollection for MemoryCollection {
    fn name(&self) -> &str {
        &self.name
    }

    async fn insert_one(&self, doc: Document) -> Result<(), StoreError> {
        let attempt = self.insert_attempts.fetch_add(1, Ordering::SeqCst);
        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(running, Ordering::SeqCst);

        if let Some(delay) = self.insert_delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.fail_inserts_from.is_some_and(|from| attempt >= from) {
            return Err(StoreError::Other(format!("insert {attempt} rejected")));
        }

        self.inserted
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(doc);
        Ok(())
    }

    async fn update_many(
        &self,
        filter: Document,
        update: UpdateBody,
        settings: UpdateSettings,
    ) -> Result<UpdateOutcome, StoreError> {
        self.record_update(RecordedUpdate {
            scope: UpdateScope::Many,
            filter,
            update,
            settings,
        });
        Ok(UpdateOutcome::default())
    }

    async fn update_one(
        &self,
        filter: Document,
        update: UpdateBody,
        settings: UpdateSettings,
    ) -> Result<UpdateOutcome, StoreError> {
        self.record_update(RecordedUpdate {
            scope: UpdateScope::One,
            filter,
            update,
            settings,
        });
        Ok(UpdateOutcome::default())
    }
}

/// A single `report_op` call.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportedOp {
    pub runner: String,
    pub op_count: u64,
    pub elapsed: Duration,
}

/// Reporter that keeps every call.
#[derive(Debug, Default)]
pub struct RecordingReporter {
    ops: Mutex<Vec<ReportedOp>>,
}

impl RecordingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// All calls so far.
    pub fn ops(&self) -> Vec<ReportedOp> {
        self.ops
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of calls made for `runner`.
    pub fn calls_for(&self, runner: &str) -> usize {
        self.ops
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|op| op.runner == runner)
            .count()
    }
}

impl Reporter for RecordingReporter {
    fn report_op(&self, runner: &str, op_count: u64, elapsed: Duration) {
        self.ops
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(ReportedOp {
                runner: runner.to_string(),
                op_count,
                elapsed,
            });
    }
}
