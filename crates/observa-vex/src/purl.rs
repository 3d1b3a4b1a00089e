//! Package URL (purl) parsing and template matching
//!
//! Format: `pkg:type/namespace/name@version?qualifiers#subpath`
//!
//! VEX statements carry purl templates; observations carry purl instances.
//! Matching is deliberately asymmetric: a version, subpath or qualifier
//! present on only one side does not block a match.

use std::collections::BTreeMap;
use std::fmt;

/// A parsed Package-URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageUrl {
    /// Package type (ecosystem): cargo, npm, pypi, golang, maven, etc.
    pub pkg_type: String,
    /// npm scope, Maven groupId, Go module host
    pub namespace: Option<String>,
    pub name: String,
    pub version: Option<String>,
    pub qualifiers: BTreeMap<String, String>,
    pub subpath: Option<String>,
}

impl PackageUrl {
    /// Parse a purl string; returns `None` for malformed input
    ///
    /// Malformed purls in statements or observations degrade to "no match"
    /// rather than failing a run.
    pub fn parse(purl: &str) -> Option<Self> {
        let rest = purl.trim().strip_prefix("pkg:")?;

        let (rest, subpath) = match rest.split_once('#') {
            Some((rest, subpath)) if !subpath.is_empty() => (rest, Some(decode(subpath))),
            Some((rest, _)) => (rest, None),
            None => (rest, None),
        };

        let (rest, qualifiers) = match rest.split_once('?') {
            Some((rest, query)) => (rest, parse_qualifiers(query)),
            None => (rest, BTreeMap::new()),
        };

        let (rest, version) = match rest.rsplit_once('@') {
            Some((rest, version)) if !version.is_empty() => (rest, Some(decode(version))),
            Some((rest, _)) => (rest, None),
            None => (rest, None),
        };

        let rest = rest.trim_matches('/');
        let (pkg_type, name_part) = rest.split_once('/')?;
        if pkg_type.is_empty() || name_part.is_empty() {
            return None;
        }

        let (namespace, name) = match name_part.rsplit_once('/') {
            Some((namespace, name)) => (Some(decode(namespace)), decode(name)),
            None => (None, decode(name_part)),
        };
        if name.is_empty() {
            return None;
        }

        Some(Self {
            pkg_type: pkg_type.to_lowercase(),
            namespace,
            name,
            version,
            qualifiers,
            subpath,
        })
    }

    /// The purl reduced to `type:namespace/name`, used as search prefix
    /// for statement preloading
    pub fn base_identity(&self) -> String {
        match &self.namespace {
            Some(namespace) => format!("pkg:{}/{}/{}", self.pkg_type, namespace, self.name),
            None => format!("pkg:{}/{}", self.pkg_type, self.name),
        }
    }

    /// Match this purl as a template against a concrete instance
    ///
    /// Type, namespace and name must be equal. Version and subpath are
    /// compared only when both sides carry one. Qualifiers are compared
    /// key by key: a key with conflicting non-empty values on both sides
    /// fails the match, a key present on only one side is ignored.
    pub fn matches(&self, instance: &PackageUrl) -> bool {
        if self.pkg_type != instance.pkg_type
            || self.namespace != instance.namespace
            || self.name != instance.name
        {
            return false;
        }

        if let (Some(template), Some(observed)) = (&self.version, &instance.version) {
            if template != observed {
                return false;
            }
        }
        if let (Some(template), Some(observed)) = (&self.subpath, &instance.subpath) {
            if template != observed {
                return false;
            }
        }

        for (key, template_value) in &self.qualifiers {
            if template_value.is_empty() {
                continue;
            }
            if let Some(observed_value) = instance.qualifiers.get(key) {
                if !observed_value.is_empty() && observed_value != template_value {
                    return false;
                }
            }
        }

        true
    }
}

impl fmt::Display for PackageUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.base_identity())?;
        if let Some(version) = &self.version {
            write!(f, "@{version}")?;
        }
        if !self.qualifiers.is_empty() {
            let query: Vec<String> = self
                .qualifiers
                .iter()
                .map(|(key, value)| format!("{key}={value}"))
                .collect();
            write!(f, "?{}", query.join("&"))?;
        }
        if let Some(subpath) = &self.subpath {
            write!(f, "#{subpath}")?;
        }
        Ok(())
    }
}

fn parse_qualifiers(query: &str) -> BTreeMap<String, String> {
    query
        .split('&')
        .filter_map(|pair| {
            let (key, value) = pair.split_once('=')?;
            if key.is_empty() {
                return None;
            }
            Some((decode(key).to_lowercase(), decode(value)))
        })
        .collect()
}

/// Basic percent decoding
fn decode(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '%' {
            let hex: String = chars.by_ref().take(2).collect();
            if let Ok(byte) = u8::from_str_radix(&hex, 16) {
                result.push(byte as char);
            } else {
                result.push('%');
                result.push_str(&hex);
            }
        } else {
            result.push(c);
        }
    }
    result
}
