//! Affected-range matching for vulnerability advisories
//!
//! Decides whether a concrete component version falls into an advisory's
//! affected ranges (OSV-style introduced/fixed event lists) or exact-version
//! list. Malformed versions and exotic range types degrade to an unknown
//! verdict with low confidence instead of failing the import.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::semver_ext::ExtendedVersion;

/// Range interpretation, from the advisory's `type` field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RangeType {
    Ecosystem,
    Semver,
    Git,
    #[serde(other)]
    Other,
}

/// A single introduced/fixed event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RangeEvent {
    Introduced(String),
    Fixed(String),
}

/// One affected range of an advisory
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AffectedRange {
    pub range_type: RangeType,
    pub events: Vec<RangeEvent>,
}

/// Affected-version information of one advisory entry
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Affected {
    #[serde(default)]
    pub ranges: Vec<AffectedRange>,
    /// Exact affected versions, matched by containment
    #[serde(default)]
    pub versions: Vec<String>,
}

impl Default for AffectedRange {
    fn default() -> Self {
        Self {
            range_type: RangeType::Semver,
            events: Vec::new(),
        }
    }
}

/// Annotation for the human-readable assessment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Confidence {
    High,
    Low,
}

impl Confidence {
    pub fn as_str(&self) -> &'static str {
        match self {
            Confidence::High => "High",
            Confidence::Low => "Low",
        }
    }
}

/// Verdict of a range match
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeMatch {
    /// `Some(true)` affected, `Some(false)` confidently not affected,
    /// `None` undecidable
    pub affected: Option<bool>,
    /// Fixed version of the matching range, if any
    pub fixed_version: Option<String>,
    pub confidence: Confidence,
}

impl RangeMatch {
    fn unknown() -> Self {
        Self {
            affected: None,
            fixed_version: None,
            confidence: Confidence::Low,
        }
    }
}

/// Check a component version against an advisory's affected information
pub fn check_affected(version: &str, affected: &Affected) -> RangeMatch {
    let Some(component) = ExtendedVersion::parse(version) else {
        debug!(version, "component version is unparseable");
        return RangeMatch::unknown();
    };

    let has_exact = !affected.versions.is_empty();
    if affected.versions.iter().any(|v| v.trim() == version.trim()) {
        return RangeMatch {
            affected: Some(true),
            fixed_version: None,
            confidence: Confidence::High,
        };
    }

    let mut any_evaluable = has_exact;
    let mut all_evaluable = true;

    for range in &affected.ranges {
        if !matches!(range.range_type, RangeType::Ecosystem | RangeType::Semver) {
            all_evaluable = false;
            continue;
        }

        let mut range_evaluable = true;
        let mut introduced: Option<ExtendedVersion> = None;
        for event in &range.events {
            match event {
                RangeEvent::Introduced(raw) => match ExtendedVersion::parse(raw) {
                    Some(parsed) => introduced = Some(parsed),
                    None => {
                        debug!(version = raw.as_str(), "unparseable introduced event");
                        range_evaluable = false;
                        introduced = None;
                    }
                },
                RangeEvent::Fixed(raw) => {
                    let Some(fixed) = ExtendedVersion::parse(raw) else {
                        debug!(version = raw.as_str(), "unparseable fixed event");
                        range_evaluable = false;
                        continue;
                    };
                    // an introduced defaulting to 0.0.0 when absent
                    let lower = introduced.take().unwrap_or(ExtendedVersion {
                        epoch: 0,
                        version: semver::Version::new(0, 0, 0),
                    });
                    if lower <= component && component < fixed {
                        return RangeMatch {
                            affected: Some(true),
                            fixed_version: Some(raw.clone()),
                            confidence: if all_evaluable && range_evaluable {
                                Confidence::High
                            } else {
                                Confidence::Low
                            },
                        };
                    }
                }
            }
        }

        if range_evaluable {
            any_evaluable = true;
        } else {
            all_evaluable = false;
        }
    }

    if any_evaluable {
        RangeMatch {
            affected: Some(false),
            fixed_version: None,
            confidence: if all_evaluable {
                Confidence::High
            } else {
                Confidence::Low
            },
        }
    } else {
        RangeMatch::unknown()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn semver_range(events: Vec<RangeEvent>) -> AffectedRange {
        AffectedRange {
            range_type: RangeType::Semver,
            events,
        }
    }

    #[test]
    fn test_introduced_fixed_window() {
        let affected = Affected {
            ranges: vec![semver_range(vec![
                RangeEvent::Introduced("0.0.0".into()),
                RangeEvent::Fixed("2.0.0".into()),
            ])],
            versions: vec![],
        };

        let hit = check_affected("1.5.0", &affected);
        assert_eq!(hit.affected, Some(true));
        assert_eq!(hit.fixed_version.as_deref(), Some("2.0.0"));
        assert_eq!(hit.confidence, Confidence::High);

        let boundary = check_affected("2.0.0", &affected);
        assert_eq!(boundary.affected, Some(false));
        assert_eq!(boundary.confidence, Confidence::High);
    }

    #[test]
    fn test_unparseable_component_is_unknown() {
        let affected = Affected {
            ranges: vec![semver_range(vec![RangeEvent::Fixed("2.0.0".into())])],
            versions: vec![],
        };
        let verdict = check_affected("not-a-version", &affected);
        assert_eq!(verdict.affected, None);
        assert_eq!(verdict.fixed_version, None);
        assert_eq!(verdict.confidence, Confidence::Low);
    }

    #[test]
    fn test_missing_introduced_defaults_to_zero() {
        let affected = Affected {
            ranges: vec![semver_range(vec![RangeEvent::Fixed("1.2.0".into())])],
            versions: vec![],
        };
        assert_eq!(check_affected("0.9.0", &affected).affected, Some(true));
        assert_eq!(check_affected("1.2.0", &affected).affected, Some(false));
    }

    #[test]
    fn test_multiple_windows_in_one_range() {
        let affected = Affected {
            ranges: vec![semver_range(vec![
                RangeEvent::Introduced("1.0.0".into()),
                RangeEvent::Fixed("1.5.0".into()),
                RangeEvent::Introduced("2.0.0".into()),
                RangeEvent::Fixed("2.3.0".into()),
            ])],
            versions: vec![],
        };
        assert_eq!(check_affected("2.1.0", &affected).affected, Some(true));
        assert_eq!(check_affected("1.7.0", &affected).affected, Some(false));
    }

    #[test]
    fn test_exact_version_containment() {
        let affected = Affected {
            ranges: vec![],
            versions: vec!["1.0.3".into(), "1.0.4".into()],
        };
        let hit = check_affected("1.0.3", &affected);
        assert_eq!(hit.affected, Some(true));
        assert_eq!(hit.confidence, Confidence::High);

        let miss = check_affected("1.0.5", &affected);
        assert_eq!(miss.affected, Some(false));
    }

    #[test]
    fn test_git_range_is_skipped_and_lowers_confidence() {
        let affected = Affected {
            ranges: vec![
                AffectedRange {
                    range_type: RangeType::Git,
                    events: vec![RangeEvent::Fixed("deadbeef".into())],
                },
                semver_range(vec![RangeEvent::Fixed("3.0.0".into())]),
            ],
            versions: vec![],
        };
        let miss = check_affected("3.1.0", &affected);
        assert_eq!(miss.affected, Some(false));
        assert_eq!(miss.confidence, Confidence::Low);
    }

    #[test]
    fn test_only_unevaluable_ranges_is_unknown() {
        let affected = Affected {
            ranges: vec![AffectedRange {
                range_type: RangeType::Git,
                events: vec![RangeEvent::Fixed("deadbeef".into())],
            }],
            versions: vec![],
        };
        let verdict = check_affected("1.0.0", &affected);
        assert_eq!(verdict.affected, None);
        assert_eq!(verdict.confidence, Confidence::Low);
    }

    #[test]
    fn test_no_information_is_unknown() {
        let verdict = check_affected("1.0.0", &Affected::default());
        assert_eq!(verdict.affected, None);
        assert_eq!(verdict.confidence, Confidence::Low);
    }
}
