//! Pattern-based string generator.
//!
//! Supports placeholders:
//! - `{index}` - generation index
//! - `{uuid}` - random UUID
//! - `{rand:N}` - random N-digit number

use super::uuid::random_uuid_v4;
use bson::Bson;
use rand::Rng;

/// Generate a string based on a pattern with placeholders.
pub fn generate_pattern<R: Rng>(pattern: &str, rng: &mut R, index: u64) -> Bson {
    let mut result = pattern.replace("{index}", &index.to_string());

    while result.contains("{uuid}") {
        let uuid = random_uuid_v4(rng).to_string();
        result = result.replacen("{uuid}", &uuid, 1);
    }

    // Replace {rand:N} patterns
    let mut search_from = 0;
    while let Some(offset) = result[search_from..].find("{rand:") {
        let start = search_from + offset;
        let Some(len) = result[start..].find('}') else {
            break;
        };
        let end = start + len;
        match result[start + 6..end].parse::<usize>() {
            Ok(digits) => {
                let random_num = generate_random_digits(rng, digits);
                result = format!("{}{}{}", &result[..start], random_num, &result[end + 1..]);
                search_from = start + random_num.len();
            }
            // Invalid format, leave it verbatim
            Err(_) => search_from = end + 1,
        }
    }

    Bson::String(result)
}

/// Generate a random number with exactly N digits.
fn generate_random_digits<R: Rng>(rng: &mut R, digits: usize) -> String {
    let mut result = String::with_capacity(digits);

    for i in 0..digits {
        // First digit should be 1-9 to avoid leading zeros
        let low = if i == 0 { 1 } else { 0 };
        let digit = rng.gen_range(low..10u8);
        result.push(char::from(b'0' + digit));
    }

    result
}
