//! Timestamp value generators.

use bson::Bson;
use chrono::{DateTime, Utc};
use rand::Rng;
use workload_core::parse_timestamp;

/// Generate the current UTC timestamp.
///
/// This is NOT deterministic - each call returns the current time.
pub fn generate_timestamp_now() -> Bson {
    Bson::DateTime(bson::DateTime::from_chrono(Utc::now()))
}

/// Generate the current time as integer epoch milliseconds.
pub fn generate_epoch_millis_now() -> Bson {
    Bson::Int64(Utc::now().timestamp_millis())
}

/// Generate a random timestamp in the given range.
///
/// The start and end should be ISO 8601 formatted timestamps.
pub fn generate_timestamp_range<R: Rng>(rng: &mut R, start: &str, end: &str) -> Bson {
    let dt = match (parse_timestamp(start), parse_timestamp(end)) {
        (Some(start), Some(end)) => {
            let start_ms = start.timestamp_millis();
            let end_ms = end.timestamp_millis();

            if start_ms >= end_ms {
                start
            } else {
                let random_ms = rng.gen_range(start_ms..=end_ms);
                DateTime::from_timestamp_millis(random_ms).unwrap_or(start)
            }
        }
        (Some(dt), None) | (None, Some(dt)) => dt,
        (None, None) => Utc::now(),
    };

    Bson::DateTime(bson::DateTime::from_chrono(dt))
}
