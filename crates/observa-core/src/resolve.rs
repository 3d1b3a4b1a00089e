//! Precedence resolution for layered observation state
//!
//! An observation's authoritative severity/status/justification is derived
//! from its layers: human assessment first, then rule and VEX overrides,
//! then what the scanner reported, then a CVSS-derived default. These
//! functions are pure and idempotent; callers recompute after every layer
//! mutation instead of caching.

use crate::observation::Observation;
use crate::severity::{Severity, Status, VexJustification};

/// Derive the authoritative severity
pub fn resolve_severity(observation: &Observation) -> Severity {
    if let Some(severity) = observation.assessment_severity {
        return severity;
    }
    if let Some(severity) = observation.rule_severity {
        return severity;
    }
    if let Some(severity) = observation.parser_severity {
        return severity;
    }
    Severity::from_cvss3(observation.cvss3_score)
}

/// Derive the authoritative status
///
/// A scanner explicitly reporting resolution cannot be overridden by any
/// other layer.
pub fn resolve_status(observation: &Observation) -> Status {
    if observation.parser_status == Some(Status::Resolved) {
        return Status::Resolved;
    }
    if let Some(status) = observation.assessment_status {
        return status;
    }
    if let Some(status) = observation.rule_status {
        return status;
    }
    if let Some(status) = observation.vex_status {
        return status;
    }
    if let Some(status) = observation.parser_status {
        return status;
    }
    Status::Open
}

/// Derive the authoritative VEX justification
pub fn resolve_vex_justification(observation: &Observation) -> Option<VexJustification> {
    if observation.rule_vex_justification.is_some() {
        return observation.rule_vex_justification;
    }
    observation.vex_vex_justification
}

/// Recompute all derived fields in place
pub fn resolve(observation: &mut Observation) {
    observation.current_severity = resolve_severity(observation);
    observation.current_status = resolve_status(observation);
    observation.current_vex_justification = resolve_vex_justification(observation);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observation::Product;

    fn observation() -> Observation {
        let product = Product::new("test");
        Observation::builder(&product, "Finding").build()
    }

    #[test]
    fn test_severity_layer_precedence() {
        let mut obs = observation();
        obs.cvss3_score = Some(8.1);
        assert_eq!(resolve_severity(&obs), Severity::High);

        obs.parser_severity = Some(Severity::Medium);
        assert_eq!(resolve_severity(&obs), Severity::Medium);

        obs.rule_severity = Some(Severity::Low);
        assert_eq!(resolve_severity(&obs), Severity::Low);

        obs.assessment_severity = Some(Severity::Critical);
        assert_eq!(resolve_severity(&obs), Severity::Critical);
    }

    #[test]
    fn test_severity_without_any_layer_is_unknown() {
        let obs = observation();
        assert_eq!(resolve_severity(&obs), Severity::Unknown);
    }

    #[test]
    fn test_status_layer_precedence() {
        let mut obs = observation();
        assert_eq!(resolve_status(&obs), Status::Open);

        obs.parser_status = Some(Status::Open);
        obs.vex_status = Some(Status::NotAffected);
        assert_eq!(resolve_status(&obs), Status::NotAffected);

        obs.rule_status = Some(Status::FalsePositive);
        assert_eq!(resolve_status(&obs), Status::FalsePositive);

        obs.assessment_status = Some(Status::RiskAccepted);
        assert_eq!(resolve_status(&obs), Status::RiskAccepted);
    }

    #[test]
    fn test_parser_resolved_wins_unconditionally() {
        let mut obs = observation();
        obs.parser_status = Some(Status::Resolved);
        obs.assessment_status = Some(Status::Open);
        obs.rule_status = Some(Status::RiskAccepted);
        obs.vex_status = Some(Status::NotAffected);
        assert_eq!(resolve_status(&obs), Status::Resolved);
    }

    #[test]
    fn test_justification_rule_before_vex() {
        let mut obs = observation();
        assert_eq!(resolve_vex_justification(&obs), None);

        obs.vex_vex_justification = Some(VexJustification::ComponentNotPresent);
        assert_eq!(
            resolve_vex_justification(&obs),
            Some(VexJustification::ComponentNotPresent)
        );

        obs.rule_vex_justification = Some(VexJustification::VulnerableCodeNotPresent);
        assert_eq!(
            resolve_vex_justification(&obs),
            Some(VexJustification::VulnerableCodeNotPresent)
        );
    }

    #[test]
    fn test_resolve_is_idempotent() {
        let mut obs = observation();
        obs.cvss3_score = Some(5.0);
        obs.vex_status = Some(Status::NotAffected);
        resolve(&mut obs);
        let first = (
            obs.current_severity,
            obs.current_status,
            obs.current_vex_justification,
        );
        resolve(&mut obs);
        assert_eq!(
            first,
            (
                obs.current_severity,
                obs.current_status,
                obs.current_vex_justification
            )
        );
        assert_eq!(obs.current_status, Status::NotAffected);
        assert_eq!(obs.current_severity, Severity::Medium);
    }
}
