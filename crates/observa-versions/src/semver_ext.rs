//! Semantic version comparison with epoch prefix and lenient normalization
//!
//! Vulnerability feeds carry versions like `2:1.4` or `7`; this module
//! accepts an optional `epoch:` integer prefix and right-pads 1- or
//! 2-component versions with `.0` before handing the rest to strict semver.

use std::cmp::Ordering;

/// A parsed `[epoch:]semver` version
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtendedVersion {
    pub epoch: u64,
    pub version: semver::Version,
}

impl ExtendedVersion {
    /// Parse a version string, normalizing short forms
    ///
    /// Returns `None` for strings that remain invalid after normalization;
    /// malformed feed data degrades to unknown rather than failing a run.
    pub fn parse(input: &str) -> Option<Self> {
        let input = input.trim();
        if input.is_empty() {
            return None;
        }

        let (epoch, rest) = match input.split_once(':') {
            Some((prefix, rest)) if !prefix.is_empty() && prefix.bytes().all(|b| b.is_ascii_digit()) => {
                (prefix.parse().ok()?, rest)
            }
            _ => (0, input),
        };

        let version = semver::Version::parse(rest)
            .ok()
            .or_else(|| semver::Version::parse(&normalize(rest)).ok())?;

        Some(Self { epoch, version })
    }
}

impl PartialOrd for ExtendedVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ExtendedVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        // build metadata is excluded from precedence
        self.epoch
            .cmp(&other.epoch)
            .then_with(|| self.version.cmp_precedence(&other.version))
    }
}

/// Right-pad a 1- or 2-component version core with `.0`
///
/// `"7"` becomes `"7.0.0"`, `"1.4-rc1"` becomes `"1.4.0-rc1"`. Strings with
/// three or more components are returned unchanged.
fn normalize(input: &str) -> String {
    let core_end = input
        .find(['-', '+'])
        .unwrap_or(input.len());
    let (core, tail) = input.split_at(core_end);

    match core.bytes().filter(|b| *b == b'.').count() {
        0 => format!("{core}.0.0{tail}"),
        1 => format!("{core}.0{tail}"),
        _ => input.to_string(),
    }
}

/// Compare two version strings, `None` if either is unparseable
pub fn compare(a: &str, b: &str) -> Option<Ordering> {
    let a = ExtendedVersion::parse(a)?;
    let b = ExtendedVersion::parse(b)?;
    Some(a.cmp(&b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_normalizes_short_versions() {
        assert_eq!(
            ExtendedVersion::parse("0").unwrap().version,
            semver::Version::new(0, 0, 0)
        );
        assert_eq!(
            ExtendedVersion::parse("7").unwrap().version,
            semver::Version::new(7, 0, 0)
        );
        assert_eq!(
            ExtendedVersion::parse("1.4").unwrap().version,
            semver::Version::new(1, 4, 0)
        );
    }

    #[test]
    fn test_parse_epoch_prefix() {
        let version = ExtendedVersion::parse("2:1.0.0").unwrap();
        assert_eq!(version.epoch, 2);
        assert_eq!(version.version, semver::Version::new(1, 0, 0));

        // no digits before the colon means no epoch
        assert!(ExtendedVersion::parse("abc:1.0.0").is_none());
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(ExtendedVersion::parse("").is_none());
        assert!(ExtendedVersion::parse("not.a.version").is_none());
        assert!(ExtendedVersion::parse("1.2.3.4").is_none());
    }

    #[test]
    fn test_epoch_outranks_version() {
        assert_eq!(compare("1:0.1.0", "2.0.0"), Some(Ordering::Greater));
        assert_eq!(compare("0:2.0.0", "2.0.0"), Some(Ordering::Equal));
    }

    #[test]
    fn test_semver_precedence() {
        assert_eq!(compare("1.9.0", "1.10.0"), Some(Ordering::Less));
        assert_eq!(compare("2.0.0-rc.1", "2.0.0"), Some(Ordering::Less));
        assert_eq!(compare("1.0", "1.0.0"), Some(Ordering::Equal));
        assert_eq!(compare("junk", "1.0.0"), None);
    }

    #[test]
    fn test_prerelease_on_short_version() {
        assert_eq!(compare("1.4-rc1", "1.4.0"), Some(Ordering::Less));
    }
}
