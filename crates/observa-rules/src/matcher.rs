//! Field matchers compiled from rule patterns
//!
//! Patterns are compiled once per engine construction, not per observation.
//! A pattern that fails to compile fails the whole run: rules are operator
//! configuration and a broken pattern is a data-integrity bug.

use observa_core::{Error, Observation, Result};
use regex::{Regex, RegexBuilder};

use crate::rule::Rule;

/// A single compiled predicate over one observation field
#[derive(Debug)]
pub enum FieldMatcher {
    /// Field equals the value exactly
    Exact(&'static str, String),
    /// Field starts with the value
    Prefix(&'static str, String),
    /// Case-insensitive regex anchored at the start of the field
    Pattern(&'static str, Regex),
}

impl FieldMatcher {
    /// Whether the configured field of the observation passes
    ///
    /// An unset observation field fails; an unconfigured matcher is never
    /// constructed in the first place.
    pub fn matches(&self, observation: &Observation) -> bool {
        let value = self.field_value(observation);
        if value.is_empty() {
            return false;
        }
        match self {
            FieldMatcher::Exact(_, expected) => value == expected.as_str(),
            FieldMatcher::Prefix(_, prefix) => value.starts_with(prefix.as_str()),
            FieldMatcher::Pattern(_, regex) => regex.is_match(value),
        }
    }

    pub fn field_name(&self) -> &'static str {
        match self {
            FieldMatcher::Exact(name, _)
            | FieldMatcher::Prefix(name, _)
            | FieldMatcher::Pattern(name, _) => name,
        }
    }

    fn field_value<'a>(&self, observation: &'a Observation) -> &'a str {
        match self.field_name() {
            "parser" => &observation.parser,
            "scanner" => &observation.scanner,
            "title" => &observation.title,
            "description" => &observation.description,
            "origin_component_name_version" => &observation.origin_component_name_version,
            "origin_docker_image_name_tag" => &observation.origin_docker_image_name_tag,
            "origin_endpoint_url" => &observation.origin_endpoint_url,
            "origin_service_name" => &observation.origin_service_name,
            "origin_source_file" => &observation.origin_source_file,
            "origin_cloud_qualified_resource" => &observation.origin_cloud_qualified_resource,
            "origin_kubernetes_qualified_resource" => {
                &observation.origin_kubernetes_qualified_resource
            }
            _ => "",
        }
    }
}

/// A rule with its predicate compiled
#[derive(Debug)]
pub struct CompiledRule {
    pub rule: Rule,
    matchers: Vec<FieldMatcher>,
}

impl CompiledRule {
    pub fn compile(rule: Rule) -> Result<Self> {
        let mut matchers = Vec::new();

        if !rule.parser.is_empty() {
            matchers.push(FieldMatcher::Exact("parser", rule.parser.clone()));
        }
        if !rule.scanner_prefix.is_empty() {
            matchers.push(FieldMatcher::Prefix("scanner", rule.scanner_prefix.clone()));
        }

        for (field, pattern) in [
            ("title", &rule.title),
            ("description", &rule.description_observation),
            (
                "origin_component_name_version",
                &rule.origin_component_name_version,
            ),
            (
                "origin_docker_image_name_tag",
                &rule.origin_docker_image_name_tag,
            ),
            ("origin_endpoint_url", &rule.origin_endpoint_url),
            ("origin_service_name", &rule.origin_service_name),
            ("origin_source_file", &rule.origin_source_file),
            (
                "origin_cloud_qualified_resource",
                &rule.origin_cloud_qualified_resource,
            ),
            (
                "origin_kubernetes_qualified_resource",
                &rule.origin_kubernetes_qualified_resource,
            ),
        ] {
            if pattern.is_empty() {
                continue;
            }
            let regex = compile_anchored(pattern).map_err(|source| Error::InvalidRulePattern {
                rule: rule.name.clone(),
                field,
                source,
            })?;
            matchers.push(FieldMatcher::Pattern(field, regex));
        }

        Ok(Self { rule, matchers })
    }

    /// Every configured matcher must pass; a rule with no matchers passes
    pub fn matches(&self, observation: &Observation) -> bool {
        self.matchers
            .iter()
            .all(|matcher| matcher.matches(observation))
    }
}

/// Compile a pattern that must match at the start of the value, not merely
/// somewhere inside it
fn compile_anchored(pattern: &str) -> std::result::Result<Regex, regex::Error> {
    RegexBuilder::new(&format!("^(?:{pattern})"))
        .case_insensitive(true)
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::RuleScope;
    use observa_core::{Observation, Product};

    fn observation() -> Observation {
        let product = Product::new("test");
        Observation::builder(&product, "CVE-2024-1234 in libfoo")
            .parser("CycloneDX")
            .scanner("Trivy / 0.50.1")
            .component("libfoo", "1.2.3")
            .build()
    }

    #[test]
    fn test_regex_matches_at_start_only() {
        let mut rule = Rule::new("title", RuleScope::General);
        rule.title = "cve-2024".to_string();
        let compiled = CompiledRule::compile(rule).unwrap();
        assert!(compiled.matches(&observation()));

        let mut rule = Rule::new("title", RuleScope::General);
        rule.title = "libfoo".to_string();
        let compiled = CompiledRule::compile(rule).unwrap();
        assert!(!compiled.matches(&observation()));
    }

    #[test]
    fn test_all_configured_matchers_must_pass() {
        let mut rule = Rule::new("combined", RuleScope::General);
        rule.title = "cve-".to_string();
        rule.origin_component_name_version = "libfoo:".to_string();
        rule.scanner_prefix = "Trivy".to_string();
        let compiled = CompiledRule::compile(rule).unwrap();
        assert!(compiled.matches(&observation()));

        let mut rule = Rule::new("combined", RuleScope::General);
        rule.title = "cve-".to_string();
        rule.origin_component_name_version = "libbar:".to_string();
        let compiled = CompiledRule::compile(rule).unwrap();
        assert!(!compiled.matches(&observation()));
    }

    #[test]
    fn test_empty_rule_matches_everything() {
        let compiled = CompiledRule::compile(Rule::new("all", RuleScope::General)).unwrap();
        assert!(compiled.matches(&observation()));
    }

    #[test]
    fn test_unset_observation_field_fails_configured_matcher() {
        let mut rule = Rule::new("endpoint", RuleScope::General);
        rule.origin_endpoint_url = "https://".to_string();
        let compiled = CompiledRule::compile(rule).unwrap();
        assert!(!compiled.matches(&observation()));
    }

    #[test]
    fn test_parser_is_exact_match() {
        let mut rule = Rule::new("parser", RuleScope::General);
        rule.parser = "CycloneDX".to_string();
        let compiled = CompiledRule::compile(rule).unwrap();
        assert!(compiled.matches(&observation()));

        let mut rule = Rule::new("parser", RuleScope::General);
        rule.parser = "Cyclone".to_string();
        let compiled = CompiledRule::compile(rule).unwrap();
        assert!(!compiled.matches(&observation()));
    }

    #[test]
    fn test_invalid_pattern_fails_compilation() {
        let mut rule = Rule::new("broken", RuleScope::General);
        rule.title = "[unclosed".to_string();
        let error = CompiledRule::compile(rule).unwrap_err();
        assert_eq!(error.code(), "INVALID_RULE_PATTERN");
    }
}
