//! Individual value generators.
//!
//! This module maps a [`GeneratorConfig`] to a BSON value.

pub mod numeric;
pub mod pattern;
pub mod timestamp;
pub mod uuid;

use crate::error::TemplateError;
use bson::Bson;
use rand::Rng;
use std::collections::HashMap;
use workload_core::GeneratorConfig;

/// Resolved dictionaries, by name.
pub type Dictionaries = HashMap<String, Vec<Bson>>;

/// Generate a value based on the generator configuration.
///
/// `index` feeds `sequential` and the `{index}` pattern placeholder.
pub fn generate_value<R: Rng>(
    config: &GeneratorConfig,
    rng: &mut R,
    index: u64,
    dictionaries: &Dictionaries,
) -> Result<Bson, TemplateError> {
    let value = match config {
        GeneratorConfig::UuidV4 => uuid::generate_uuid_v4(rng),

        GeneratorConfig::Sequential { start } => {
            Bson::Int64(start.wrapping_add(index as i64))
        }

        GeneratorConfig::Pattern { pattern } => pattern::generate_pattern(pattern, rng, index),

        GeneratorConfig::IntRange { min, max } => numeric::generate_int_range(rng, *min, *max),

        GeneratorConfig::FloatRange { min, max } => {
            numeric::generate_float_range(rng, *min, *max)?
        }

        GeneratorConfig::TimestampRange { start, end } => {
            timestamp::generate_timestamp_range(rng, start, end)
        }

        GeneratorConfig::TimestampNow => timestamp::generate_timestamp_now(),

        GeneratorConfig::EpochMillisNow => timestamp::generate_epoch_millis_now(),

        GeneratorConfig::WeightedBool { true_weight } => {
            numeric::generate_weighted_bool(rng, *true_weight)?
        }

        GeneratorConfig::OneOf { values } => pick(rng, values),

        GeneratorConfig::Dictionary { name } => {
            let values = dictionaries
                .get(name)
                .ok_or_else(|| TemplateError::UnknownDictionary(name.clone()))?;
            pick(rng, values)
        }

        GeneratorConfig::Static { value } => value.clone(),

        GeneratorConfig::Null => Bson::Null,
    };

    Ok(value)
}

fn pick<R: Rng>(rng: &mut R, values: &[Bson]) -> Bson {
    if values.is_empty() {
        Bson::Null
    } else {
        values[rng.gen_range(0..values.len())].clone()
    }
}
