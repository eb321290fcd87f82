//! UUID value generator.

use bson::{Binary, Bson};
use rand::Rng;
use uuid::Uuid;

/// Generate a random UUID v4 using the provided RNG.
pub fn random_uuid_v4<R: Rng>(rng: &mut R) -> Uuid {
    // Generate 16 random bytes
    let mut bytes = [0u8; 16];
    rng.fill(&mut bytes);

    // Set version (4) and variant (RFC 4122) bits
    bytes[6] = (bytes[6] & 0x0f) | 0x40; // Version 4
    bytes[8] = (bytes[8] & 0x3f) | 0x80; // Variant RFC 4122

    Uuid::from_bytes(bytes)
}

/// Generate a UUID v4 as a BSON binary (subtype 4).
pub fn generate_uuid_v4<R: Rng>(rng: &mut R) -> Bson {
    let uuid = random_uuid_v4(rng);
    Bson::Binary(Binary::from_uuid(bson::Uuid::from_bytes(*uuid.as_bytes())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_generate_uuid_v4() {
        let mut rng = StdRng::seed_from_u64(42);
        let value = generate_uuid_v4(&mut rng);
        assert!(matches!(value, Bson::Binary(_)));

        // Ensure uniqueness
        let value2 = generate_uuid_v4(&mut rng);
        assert_ne!(value, value2);
    }

    #[test]
    fn test_uuid_deterministic() {
        let mut rng1 = StdRng::seed_from_u64(42);
        let mut rng2 = StdRng::seed_from_u64(42);

        assert_eq!(random_uuid_v4(&mut rng1), random_uuid_v4(&mut rng2));
    }

    #[test]
    fn test_uuid_version() {
        let mut rng = StdRng::seed_from_u64(42);
        assert_eq!(random_uuid_v4(&mut rng).get_version_num(), 4);
    }
}
