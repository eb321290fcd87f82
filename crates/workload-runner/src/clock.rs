//! Time-series clock cursor and timestamp jitter.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use rand::Rng;

/// Lifecycle of a time-series runner's clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockState {
    /// No cursor yet; only a `value` override can produce a base.
    AwaitingBase,
    /// Cursor established and advancing.
    HasBase,
    /// Last resolved base was after `stop`.
    PastStop,
}

/// "Current time" cursor of one time-series runner.
///
/// Advanced by `step` per invocation. Advancing is split into
/// [`RunnerClock::peek_next`] and [`RunnerClock::commit`] so an invocation
/// that fails before emitting anything leaves the cursor where it was.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunnerClock {
    cursor: Option<DateTime<Utc>>,
    step: ChronoDuration,
}

impl RunnerClock {
    pub fn new(start: Option<DateTime<Utc>>, step: ChronoDuration) -> Self {
        Self {
            cursor: start,
            step,
        }
    }

    /// Current cursor.
    pub fn cursor(&self) -> Option<DateTime<Utc>> {
        self.cursor
    }

    /// Step applied per advance.
    pub fn step(&self) -> ChronoDuration {
        self.step
    }

    /// The cursor one step ahead, without moving it.
    ///
    /// `None` when there is no cursor or the step leaves the representable
    /// date range.
    pub fn peek_next(&self) -> Option<DateTime<Utc>> {
        self.cursor?.checked_add_signed(self.step)
    }

    /// Move the cursor to `next`.
    pub fn commit(&mut self, next: DateTime<Utc>) {
        self.cursor = Some(next);
    }
}

/// Offset `base` by a uniformly random amount in `[0, bound_millis)` with a
/// random sign. Bounds of zero or less return `base` unchanged, as does an
/// offset that would leave the representable date range.
pub fn jitter<R: Rng>(base: DateTime<Utc>, bound_millis: i64, rng: &mut R) -> DateTime<Utc> {
    if bound_millis <= 0 {
        return base;
    }

    let Some(offset) = ChronoDuration::try_milliseconds(rng.gen_range(0..bound_millis)) else {
        return base;
    };
    let shifted = if rng.gen_bool(0.5) {
        base.checked_add_signed(offset)
    } else {
        base.checked_sub_signed(offset)
    };
    shifted.unwrap_or(base)
}
