//! Time-series runner.
//!
//! Each invocation resolves a base timestamp, fans out over the entities of
//! a dictionary and inserts one generated document per entity through the
//! runner's worker pool:
//!
//! ```text
//! value override? ──yes──► base = resolved value (clock untouched)
//!       │ no
//!       ▼
//! cursor + step ──► base (cursor committed)
//!       │
//!       ▼
//! base > stop? ──yes──► no-op, elapsed 0
//!       │ no
//!       ▼
//! dictionary ──► one document per entity (meta field, jittered time field)
//!       │
//!       ▼
//! WorkerPool: insert_one per document, report_op(name, 1, latency) each
//! ```

use crate::clock::{jitter, ClockState, RunnerClock};
use crate::error::RunnerError;
use crate::pool::WorkerPool;
use crate::runner::{Runner, RunnerContext};
use async_trait::async_trait;
use bson::{Bson, Document};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};
use workload_core::{
    workers, ConfigError, GenerateMode, MetaConfig, TimeConfig, DEFAULT_STEP_MILLIS,
};

/// Runner inserting per-entity, time-stamped measurement documents.
pub struct TimeSeriesRunner {
    context: RunnerContext,
    time: TimeConfig,
    meta: MetaConfig,
    clock: RunnerClock,
    jitter_millis: Option<i64>,
    pool: WorkerPool,
    past_stop: bool,
}

impl TimeSeriesRunner {
    /// Create a runner from the step's `time`, `meta` and `workers` parameters.
    ///
    /// The worker pool is created here and lives as long as the runner.
    pub fn new(context: RunnerContext) -> Result<Self, RunnerError> {
        let time = TimeConfig::from_params(&context.step)?;
        let meta = MetaConfig::from_params(&context.step)?;
        let pool = WorkerPool::new(workers(&context.step)?);
        let name = context.name();

        let step_millis = match (&time.step, time.step_millis()) {
            (_, Some(ms)) => ms,
            (None, None) => DEFAULT_STEP_MILLIS,
            (Some(raw), None) => {
                info!(
                    "TimeSeriesRunner {}: step resolved to {}, defaulting to {}ms",
                    name, raw, DEFAULT_STEP_MILLIS
                );
                DEFAULT_STEP_MILLIS
            }
        };

        let step = ChronoDuration::try_milliseconds(step_millis).ok_or_else(|| {
            ConfigError::invalid(name, "time.step", format!("step {step_millis}ms out of range"))
        })?;

        let jitter_millis = match (&time.jitter, time.jitter_millis()) {
            (_, Some(bound)) if bound > 0 => Some(bound),
            (Some(raw), None) => {
                warn!(
                    "TimeSeriesRunner {}: jitter {} is not a number, ignoring",
                    name, raw
                );
                None
            }
            _ => None,
        };

        debug!(
            "TimeSeriesRunner {}: start {:?}, step {}ms, jitter {:?}, {} workers",
            name,
            time.start,
            step_millis,
            jitter_millis,
            pool.size()
        );

        Ok(Self {
            clock: RunnerClock::new(time.start, step),
            context,
            time,
            meta,
            jitter_millis,
            pool,
            past_stop: false,
        })
    }

    /// Where the clock stands.
    pub fn state(&self) -> ClockState {
        if self.past_stop {
            ClockState::PastStop
        } else if self.clock.cursor().is_some() {
            ClockState::HasBase
        } else {
            ClockState::AwaitingBase
        }
    }

    /// The runner's clock.
    pub fn clock(&self) -> &RunnerClock {
        &self.clock
    }

    /// Worker pool size.
    pub fn workers(&self) -> usize {
        self.pool.size()
    }

    /// Resolve this invocation's base timestamp.
    ///
    /// Returns the base and, when it came from the clock, the cursor value
    /// to commit once the invocation goes ahead.
    fn resolve_base(&self) -> Result<(DateTime<Utc>, Option<DateTime<Utc>>), RunnerError> {
        if let Some(raw) = &self.time.value {
            match self.context.template.generate_expression(raw)? {
                Bson::DateTime(dt) => return Ok((dt.to_chrono(), None)),
                Bson::Int64(ms) => {
                    if let Some(dt) = DateTime::from_timestamp_millis(ms) {
                        return Ok((dt, None));
                    }
                    warn!("Time value {} is out of range, ignoring", ms);
                }
                Bson::Int32(ms) => {
                    if let Some(dt) = DateTime::from_timestamp_millis(i64::from(ms)) {
                        return Ok((dt, None));
                    }
                }
                other => {
                    info!("Time value resolved to {:?}, ignoring", other.element_type());
                }
            }
        }

        let Some(cursor) = self.clock.cursor() else {
            error!("Invalid timeseries configuration, no start/step and no value. Aborting");
            return Err(ConfigError::MissingTimeAnchor(self.context.name().to_string()).into());
        };

        match self.clock.peek_next() {
            Some(next) => Ok((next, Some(next))),
            None => Err(ConfigError::invalid(
                self.context.name(),
                "time.step",
                format!(
                    "advancing {} by {}ms leaves the supported date range",
                    cursor,
                    self.clock.step().num_milliseconds()
                ),
            )
            .into()),
        }
    }

    /// One generated document per entity, carrying meta and time fields.
    fn assemble(
        &self,
        base: DateTime<Utc>,
        entities: &[Bson],
    ) -> Result<Vec<Document>, RunnerError> {
        let mut rng = rand::thread_rng();

        entities
            .iter()
            .map(|entity| {
                let ts = match self.jitter_millis {
                    Some(bound) => jitter(base, bound, &mut rng),
                    None => base,
                };

                let mut doc = self.context.template.generate()?;
                doc.insert(self.meta.meta_field.clone(), entity.clone());
                doc.insert(
                    self.time.time_field.clone(),
                    bson::DateTime::from_chrono(ts),
                );
                Ok(doc)
            })
            .collect()
    }
}

#[async_trait]
impl Runner for TimeSeriesRunner {
    fn name(&self) -> &str {
        self.context.name()
    }

    /// Past the stop date with a clock that can only move further away.
    ///
    /// A `value` override is re-evaluated on every call and may land
    /// before `stop` again, so such runners never finish.
    fn is_finished(&self) -> bool {
        self.past_stop && self.time.value.is_none() && self.clock.step() >= ChronoDuration::zero()
    }

    async fn run_once(&mut self) -> Result<Duration, RunnerError> {
        if let GenerateMode::Unsupported(mode) = &self.meta.generate {
            return Err(RunnerError::Unsupported(format!(
                "timeseries generation option '{mode}'"
            )));
        }

        let (base, next_cursor) = self.resolve_base()?;

        if let Some(stop) = self.time.stop {
            if base > stop {
                if let Some(next) = next_cursor {
                    self.clock.commit(next);
                }
                if !self.past_stop {
                    info!("TimeSeriesRunner {} has run beyond stop date", self.name());
                }
                self.past_stop = true;
                return Ok(Duration::ZERO);
            }
        }

        let entities = self
            .context
            .template
            .dictionary(&self.meta.dictionary)
            .ok_or_else(|| {
                error!("Series dictionary {} not found", self.meta.dictionary);
                ConfigError::DictionaryNotFound {
                    step: self.context.name().to_string(),
                    dictionary: self.meta.dictionary.clone(),
                }
            })?;
        let documents = self.assemble(base, entities)?;

        if let Some(next) = next_cursor {
            self.clock.commit(next);
        }
        self.past_stop = false;

        let tasks: Vec<_> = documents
            .into_iter()
            .map(|doc| {
                let collection = Arc::clone(&self.context.collection);
                let reporter = Arc::clone(&self.context.reporter);
                let name = self.context.name().to_string();
                async move {
                    let start = Instant::now();
                    collection.insert_one(doc).await?;
                    reporter.report_op(&name, 1, start.elapsed());
                    Ok::<(), RunnerError>(())
                }
            })
            .collect();

        let start = Instant::now();
        let inserted = self.pool.run_all(tasks).await?;
        let elapsed = start.elapsed();

        debug!(
            "TimeSeriesRunner {}: {} documents at {} in {:?}",
            self.name(),
            inserted,
            base,
            elapsed
        );
        Ok(elapsed)
    }
}
