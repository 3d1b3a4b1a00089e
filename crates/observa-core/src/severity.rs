//! Severity, status and VEX justification vocabularies

use serde::{Deserialize, Serialize};

/// Severity of an observation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Severity could not be determined
    #[default]
    Unknown,
    /// No security impact
    None,
    /// Low severity, minimal risk
    Low,
    /// Medium severity, moderate risk
    Medium,
    /// High severity, significant risk
    High,
    /// Critical severity, immediate action required
    Critical,
}

impl Severity {
    /// Bucket a CVSS 3.x base score into a severity
    pub fn from_cvss3(score: Option<f64>) -> Self {
        match score {
            None => Severity::Unknown,
            Some(s) if s >= 9.0 => Severity::Critical,
            Some(s) if s >= 7.0 => Severity::High,
            Some(s) if s >= 4.0 => Severity::Medium,
            Some(s) if s >= 0.1 => Severity::Low,
            Some(_) => Severity::None,
        }
    }

    /// Normalize a scanner-provided severity string
    pub fn from_scanner(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "critical" | "urgent" => Some(Severity::Critical),
            "high" | "serious" => Some(Severity::High),
            "medium" | "moderate" => Some(Severity::Medium),
            "low" | "minimal" => Some(Severity::Low),
            "none" | "info" | "informational" => Some(Severity::None),
            "unknown" => Some(Severity::Unknown),
            "" => None,
            _ => Some(Severity::Unknown),
        }
    }

    /// Numeric sort key, most severe first
    pub fn as_number(&self) -> u8 {
        match self {
            Severity::Critical => 1,
            Severity::High => 2,
            Severity::Medium => 3,
            Severity::Low => 4,
            Severity::None => 5,
            Severity::Unknown => 6,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Unknown => "Unknown",
            Severity::None => "None",
            Severity::Low => "Low",
            Severity::Medium => "Medium",
            Severity::High => "High",
            Severity::Critical => "Critical",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Workflow status of an observation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    /// Finding is active and unhandled
    #[default]
    Open,
    /// Finding no longer present or fixed
    Resolved,
    /// Same finding already tracked elsewhere
    Duplicate,
    /// Scanner result was wrong
    FalsePositive,
    /// Triage in progress
    InReview,
    /// Component is not exploitable in this product
    NotAffected,
    /// Not a security issue
    NotSecurity,
    /// Risk consciously accepted
    RiskAccepted,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Open => "Open",
            Status::Resolved => "Resolved",
            Status::Duplicate => "Duplicate",
            Status::FalsePositive => "False positive",
            Status::InReview => "In review",
            Status::NotAffected => "Not affected",
            Status::NotSecurity => "Not security",
            Status::RiskAccepted => "Risk accepted",
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// CSAF justification for a `not_affected` assessment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VexJustification {
    ComponentNotPresent,
    VulnerableCodeNotPresent,
    VulnerableCodeNotInExecutePath,
    VulnerableCodeCannotBeControlledByAdversary,
    InlineMitigationsAlreadyExist,
}

impl VexJustification {
    pub fn as_str(&self) -> &'static str {
        match self {
            VexJustification::ComponentNotPresent => "component_not_present",
            VexJustification::VulnerableCodeNotPresent => "vulnerable_code_not_present",
            VexJustification::VulnerableCodeNotInExecutePath => {
                "vulnerable_code_not_in_execute_path"
            }
            VexJustification::VulnerableCodeCannotBeControlledByAdversary => {
                "vulnerable_code_cannot_be_controlled_by_adversary"
            }
            VexJustification::InlineMitigationsAlreadyExist => "inline_mitigations_already_exist",
        }
    }

    /// Parse a CSAF/OpenVEX justification label
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "component_not_present" => Some(VexJustification::ComponentNotPresent),
            "vulnerable_code_not_present" => Some(VexJustification::VulnerableCodeNotPresent),
            "vulnerable_code_not_in_execute_path" => {
                Some(VexJustification::VulnerableCodeNotInExecutePath)
            }
            "vulnerable_code_cannot_be_controlled_by_adversary" => {
                Some(VexJustification::VulnerableCodeCannotBeControlledByAdversary)
            }
            "inline_mitigations_already_exist" => {
                Some(VexJustification::InlineMitigationsAlreadyExist)
            }
            _ => None,
        }
    }
}

impl std::fmt::Display for VexJustification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cvss_buckets() {
        assert_eq!(Severity::from_cvss3(Some(9.8)), Severity::Critical);
        assert_eq!(Severity::from_cvss3(Some(7.0)), Severity::High);
        assert_eq!(Severity::from_cvss3(Some(5.0)), Severity::Medium);
        assert_eq!(Severity::from_cvss3(Some(0.1)), Severity::Low);
        assert_eq!(Severity::from_cvss3(Some(0.0)), Severity::None);
        assert_eq!(Severity::from_cvss3(None), Severity::Unknown);
    }

    #[test]
    fn test_scanner_severity_normalization() {
        assert_eq!(Severity::from_scanner("CRITICAL"), Some(Severity::Critical));
        assert_eq!(Severity::from_scanner("moderate"), Some(Severity::Medium));
        assert_eq!(Severity::from_scanner(""), None);
        assert_eq!(Severity::from_scanner("weird"), Some(Severity::Unknown));
    }

    #[test]
    fn test_numerical_severity_ordering() {
        assert!(Severity::Critical.as_number() < Severity::High.as_number());
        assert!(Severity::None.as_number() < Severity::Unknown.as_number());
    }

    #[test]
    fn test_justification_labels_round_trip() {
        let j = VexJustification::ComponentNotPresent;
        assert_eq!(VexJustification::parse(j.as_str()), Some(j));
        assert_eq!(VexJustification::parse("nonsense"), None);
    }
}
