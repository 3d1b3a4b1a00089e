//! Identity fingerprinting for observations
//!
//! The identity hash groups re-scans of the same logical finding across
//! import runs. Call only after `Observation::normalize_origin`, so that the
//! combined name/version fields are derived and absent fields are empty.

use crate::observation::Observation;
use sha2::{Digest, Sha256};

/// Compute the canonical identity hash of an observation
///
/// Concatenates the identity-relevant fields in a fixed order, case-folds
/// and trims the result, and returns the SHA-256 hex digest. Two
/// observations from the same scanner run with identical identity-relevant
/// fields hash identically regardless of which fields the parser populated.
pub fn identity_hash(observation: &Observation) -> String {
    let mut hash_string = String::with_capacity(128);
    hash_string.push_str(&observation.title);
    hash_string.push_str(&observation.origin_component_name_version);
    hash_string.push_str(&observation.origin_docker_image_name_tag);
    hash_string.push_str(&observation.origin_endpoint_url);
    hash_string.push_str(&observation.origin_service_name);
    hash_string.push_str(&observation.origin_source_file);
    if let Some(line) = observation.origin_source_line_start {
        hash_string.push_str(&line.to_string());
    }
    if let Some(line) = observation.origin_source_line_end {
        hash_string.push_str(&line.to_string());
    }

    let canonical = hash_string.to_lowercase();
    let mut hasher = Sha256::new();
    hasher.update(canonical.trim().as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observation::{Observation, Product};

    fn base(product: &Product) -> Observation {
        Observation::builder(product, "Outdated log4j")
            .component("log4j", "2.14.0")
            .service("billing")
            .build()
    }

    #[test]
    fn test_hash_is_deterministic() {
        let product = Product::new("test");
        let a = base(&product);
        let b = base(&product);
        assert_eq!(a.identity_hash, b.identity_hash);
    }

    #[test]
    fn test_hash_ignores_case_and_whitespace() {
        let product = Product::new("test");
        let a = base(&product);
        let b = Observation::builder(&product, "  OUTDATED Log4j")
            .component("LOG4J", "2.14.0")
            .service("Billing")
            .build();
        assert_eq!(a.identity_hash, b.identity_hash);
    }

    #[test]
    fn test_hash_insensitive_to_field_population_order() {
        let product = Product::new("test");
        let split = base(&product);

        let mut combined = Observation::builder(&product, "Outdated log4j")
            .service("billing")
            .build();
        combined.origin_component_name_version = "log4j:2.14.0".to_string();
        combined.normalize_origin();
        combined.identity_hash = identity_hash(&combined);

        assert_eq!(split.identity_hash, combined.identity_hash);
    }

    #[test]
    fn test_hash_differs_per_identity_field() {
        let product = Product::new("test");
        let a = base(&product);

        let other_version = Observation::builder(&product, "Outdated log4j")
            .component("log4j", "2.15.0")
            .service("billing")
            .build();
        assert_ne!(a.identity_hash, other_version.identity_hash);

        let other_service = Observation::builder(&product, "Outdated log4j")
            .component("log4j", "2.14.0")
            .service("checkout")
            .build();
        assert_ne!(a.identity_hash, other_service.identity_hash);

        let with_lines = Observation::builder(&product, "Outdated log4j")
            .component("log4j", "2.14.0")
            .service("billing")
            .source_location("pom.xml", 10, 12)
            .build();
        assert_ne!(a.identity_hash, with_lines.identity_hash);
    }

    #[test]
    fn test_hash_ignores_non_identity_fields() {
        let product = Product::new("test");
        let a = base(&product);
        let b = Observation::builder(&product, "Outdated log4j")
            .component("log4j", "2.14.0")
            .service("billing")
            .description("something new")
            .cvss3(9.8, "CVSS:3.1/AV:N/AC:L/PR:N/UI:N/S:C/C:H/I:H/A:H")
            .build();
        assert_eq!(a.identity_hash, b.identity_hash);
    }
}
