//! Error types for the Observa engines

use thiserror::Error;

/// Result type alias using Observa Error
pub type Result<T> = std::result::Result<T, Error>;

/// Observa error types
///
/// Malformed versions, ranges and purls are deliberately NOT errors: feeds
/// are routinely malformed and those degrade to unknown/low-confidence
/// results at the call site instead.
#[derive(Error, Debug)]
pub enum Error {
    // === Configuration Errors ===
    #[error("Rule '{rule}': invalid pattern for {field}: {source}")]
    InvalidRulePattern {
        rule: String,
        field: &'static str,
        source: regex::Error,
    },

    #[error("Configuration error: {0}")]
    Configuration(String),

    // === Invariant Violations ===
    #[error("Duplicate identity hash {hash} among stored observations of one scan context")]
    DuplicateIdentityHash { hash: String },

    #[error("Observation {id} was reconciled twice within one import run")]
    ObservationReprocessed { id: uuid::Uuid },

    // === Collaborator Errors ===
    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Check if this error is a data-integrity bug rather than bad input
    pub fn is_invariant_violation(&self) -> bool {
        matches!(
            self,
            Error::DuplicateIdentityHash { .. } | Error::ObservationReprocessed { .. }
        )
    }

    /// Get an error code for logging/metrics
    pub fn code(&self) -> &'static str {
        match self {
            Error::InvalidRulePattern { .. } => "INVALID_RULE_PATTERN",
            Error::Configuration(_) => "CONFIG_ERROR",
            Error::DuplicateIdentityHash { .. } => "DUPLICATE_IDENTITY_HASH",
            Error::ObservationReprocessed { .. } => "OBSERVATION_REPROCESSED",
            Error::Persistence(_) => "PERSISTENCE_ERROR",
            Error::Json(_) => "JSON_ERROR",
        }
    }
}
