//! Observa Versions - version ordering and affected-range matching
//!
//! Two total-order comparators (extended semver with an epoch prefix, and
//! RPM segment ordering) plus the range matcher that decides whether a
//! component version is affected by an advisory.

pub mod range;
pub mod rpm;
pub mod semver_ext;

pub use range::{check_affected, Affected, AffectedRange, Confidence, RangeEvent, RangeMatch, RangeType};
pub use semver_ext::ExtendedVersion;
