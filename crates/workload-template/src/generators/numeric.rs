//! Numeric value generators.

use crate::error::TemplateError;
use bson::Bson;
use rand::Rng;

/// Generate a random integer in the given range (inclusive).
pub fn generate_int_range<R: Rng>(rng: &mut R, min: i64, max: i64) -> Bson {
    if min >= max {
        return Bson::Int64(min);
    }
    Bson::Int64(rng.gen_range(min..=max))
}

/// Generate a random float in the given range (inclusive).
///
/// Bounds must be finite and their span representable.
pub fn generate_float_range<R: Rng>(
    rng: &mut R,
    min: f64,
    max: f64,
) -> Result<Bson, TemplateError> {
    if !(max - min).is_finite() {
        return Err(TemplateError::InvalidGenerator {
            generator: "float_range",
            reason: format!("bounds [{min}, {max}] are not a finite range"),
        });
    }
    if min >= max {
        return Ok(Bson::Double(min));
    }
    Ok(Bson::Double(rng.gen_range(min..=max)))
}

/// Generate a boolean that is true with probability `true_weight`.
///
/// Weights outside `[0, 1]` are clamped.
pub fn generate_weighted_bool<R: Rng>(
    rng: &mut R,
    true_weight: f64,
) -> Result<Bson, TemplateError> {
    if !true_weight.is_finite() {
        return Err(TemplateError::InvalidGenerator {
            generator: "weighted_bool",
            reason: format!("true_weight {true_weight} is not finite"),
        });
    }
    Ok(Bson::Boolean(rng.gen_bool(true_weight.clamp(0.0, 1.0))))
}
