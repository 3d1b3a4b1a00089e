//! First-match-wins rule evaluation
//!
//! A rule engine is constructed once per product with the product's own
//! rules, its product-group's rules and, if the product opts in, the
//! general rules. Rules are evaluated in that list order; the first rule
//! whose predicate matches wins and evaluation stops.

use std::collections::HashMap;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use observa_core::{
    resolve, ChangeListener, Observation, ObservationLog, Product, Result, StateSnapshot, Status,
};
use tracing::debug;
use uuid::Uuid;

use crate::matcher::CompiledRule;
use crate::rule::{Rule, RuleScope};

const ACTOR: &str = "Rule engine";

/// Per-product rule engine; cheap to build, stateless after construction
pub struct RuleEngine {
    product: Product,
    rules: Vec<CompiledRule>,
    /// Names of every rule handed in, including non-participating ones, so
    /// removal log entries can name orphaned references
    rule_names: HashMap<Uuid, String>,
    now: DateTime<Utc>,
}

impl RuleEngine {
    /// Build the ordered rule list for one product
    ///
    /// Only enabled, approved product rules participate; product-group
    /// rules bypass the approval gate; general rules participate when the
    /// product opts in. A pattern that fails to compile aborts construction.
    pub fn new(
        product: &Product,
        product_rules: Vec<Rule>,
        product_group_rules: Vec<Rule>,
        general_rules: Vec<Rule>,
        now: DateTime<Utc>,
    ) -> Result<Self> {
        let mut rule_names = HashMap::new();
        for rule in product_rules
            .iter()
            .chain(product_group_rules.iter())
            .chain(general_rules.iter())
        {
            rule_names.insert(rule.id, rule.name.clone());
        }

        let mut ordered = Vec::new();
        ordered.extend(
            product_rules
                .into_iter()
                .filter(|rule| rule.enabled && rule.approval_status.is_approved()),
        );
        ordered.extend(product_group_rules.into_iter().filter(|rule| rule.enabled));
        if product.apply_general_rules {
            ordered.extend(
                general_rules
                    .into_iter()
                    .filter(|rule| rule.enabled && rule.approval_status.is_approved()),
            );
        }

        let rules = ordered
            .into_iter()
            .map(CompiledRule::compile)
            .collect::<Result<Vec<_>>>()?;

        debug!(
            product = product.name.as_str(),
            rules = rules.len(),
            "rule engine constructed"
        );

        Ok(Self {
            product: product.clone(),
            rules,
            rule_names,
            now,
        })
    }

    /// Evaluate the rule list against one observation
    ///
    /// Returns the audit entry when the evaluation changed the observation.
    pub fn apply(
        &self,
        observation: &mut Observation,
        listener: &mut dyn ChangeListener,
    ) -> Option<ObservationLog> {
        let before = StateSnapshot::of(observation);
        let before_layer = RuleLayer::of(observation);

        match self.rules.iter().find(|rule| rule.matches(observation)) {
            Some(matched) => self.apply_match(observation, matched, &before, &before_layer, listener),
            None => self.clear_stale_reference(observation, &before, &before_layer, listener),
        }
    }

    /// Re-run the per-observation logic over a whole product
    pub fn apply_all(
        &self,
        observations: &mut [Observation],
        listener: &mut dyn ChangeListener,
    ) -> Vec<ObservationLog> {
        observations
            .iter_mut()
            .filter_map(|observation| self.apply(observation, listener))
            .collect()
    }

    fn apply_match(
        &self,
        observation: &mut Observation,
        matched: &CompiledRule,
        before: &StateSnapshot,
        before_layer: &RuleLayer,
        listener: &mut dyn ChangeListener,
    ) -> Option<ObservationLog> {
        let rule = &matched.rule;

        if let Some(severity) = rule.new_severity {
            observation.rule_severity = Some(severity);
        }
        if let Some(status) = rule.new_status {
            observation.rule_status = Some(status);
        }
        if let Some(justification) = rule.new_vex_justification {
            observation.rule_vex_justification = Some(justification);
        }
        match rule.scope {
            RuleScope::General => {
                observation.general_rule = Some(rule.id);
                observation.product_rule = None;
            }
            RuleScope::Product(_) | RuleScope::ProductGroup(_) => {
                observation.product_rule = Some(rule.id);
                observation.general_rule = None;
            }
        }

        resolve::resolve(observation);
        self.update_risk_acceptance_expiry(observation, before);

        if RuleLayer::of(observation) == *before_layer
            && observation.current_status == before.status
            && observation.current_severity == before.severity
            && observation.current_vex_justification == before.vex_justification
        {
            return None;
        }

        let comment = match rule.scope {
            RuleScope::General => format!("Updated by general rule {}", rule.name),
            RuleScope::Product(_) | RuleScope::ProductGroup(_) => {
                format!("Updated by product rule {}", rule.name)
            }
        };
        debug!(
            observation = %observation.id,
            rule = rule.name.as_str(),
            "rule applied"
        );
        listener.observation_changed(observation, before, &comment);
        Some(ObservationLog::for_change(
            observation,
            before,
            comment,
            ACTOR,
            self.now,
        ))
    }

    fn clear_stale_reference(
        &self,
        observation: &mut Observation,
        before: &StateSnapshot,
        before_layer: &RuleLayer,
        listener: &mut dyn ChangeListener,
    ) -> Option<ObservationLog> {
        if before_layer.product_rule.is_none() && before_layer.general_rule.is_none() {
            return None;
        }

        let comment = if let Some(id) = before_layer.product_rule {
            match self.rule_names.get(&id) {
                Some(name) => format!("Removed product rule {name}"),
                None => "Removed unknown rule".to_string(),
            }
        } else if let Some(id) = before_layer.general_rule {
            match self.rule_names.get(&id) {
                Some(name) => format!("Removed general rule {name}"),
                None => "Removed unknown rule".to_string(),
            }
        } else {
            "Removed unknown rule".to_string()
        };

        observation.rule_severity = None;
        observation.rule_status = None;
        observation.rule_vex_justification = None;
        observation.product_rule = None;
        observation.general_rule = None;

        resolve::resolve(observation);
        self.update_risk_acceptance_expiry(observation, before);

        debug!(observation = %observation.id, "stale rule reference cleared");
        listener.observation_changed(observation, before, &comment);
        Some(ObservationLog::for_change(
            observation,
            before,
            comment,
            ACTOR,
            self.now,
        ))
    }

    /// Set or clear the expiry date, only on transitions into/out of
    /// risk acceptance
    fn update_risk_acceptance_expiry(&self, observation: &mut Observation, before: &StateSnapshot) {
        let was_accepted = before.status == Status::RiskAccepted;
        let is_accepted = observation.current_status == Status::RiskAccepted;
        if !was_accepted && is_accepted {
            observation.risk_acceptance_expiry_date = self.expiry_date();
        } else if was_accepted && !is_accepted {
            observation.risk_acceptance_expiry_date = None;
        }
    }

    fn expiry_date(&self) -> Option<NaiveDate> {
        match self.product.risk_acceptance_expiry_days {
            None | Some(0) => None,
            Some(days) => Some(self.now.date_naive() + Duration::days(i64::from(days))),
        }
    }
}

/// The mutable rule layer of an observation, for change detection
#[derive(Debug, Clone, PartialEq, Eq)]
struct RuleLayer {
    severity: Option<observa_core::Severity>,
    status: Option<Status>,
    vex_justification: Option<observa_core::VexJustification>,
    product_rule: Option<Uuid>,
    general_rule: Option<Uuid>,
}

impl RuleLayer {
    fn of(observation: &Observation) -> Self {
        Self {
            severity: observation.rule_severity,
            status: observation.rule_status,
            vex_justification: observation.rule_vex_justification,
            product_rule: observation.product_rule,
            general_rule: observation.general_rule,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::ApprovalStatus;
    use observa_core::{NoopListener, RecordingListener, Severity};

    fn product() -> Product {
        let mut product = Product::new("shop");
        product.risk_acceptance_expiry_days = Some(30);
        product
    }

    fn observation(product: &Product) -> Observation {
        let mut observation = Observation::builder(product, "CVE-2024-1 in libfoo")
            .parser("CycloneDX")
            .component("libfoo", "1.0.0")
            .parser_severity(Severity::High)
            .build();
        resolve::resolve(&mut observation);
        observation
    }

    fn title_rule(name: &str, pattern: &str, scope: RuleScope) -> Rule {
        let mut rule = Rule::new(name, scope);
        rule.title = pattern.to_string();
        rule
    }

    fn engine(product: &Product, rules: Vec<Rule>) -> RuleEngine {
        let mut product_rules = Vec::new();
        let mut group_rules = Vec::new();
        let mut general_rules = Vec::new();
        for rule in rules {
            match rule.scope {
                RuleScope::Product(_) => product_rules.push(rule),
                RuleScope::ProductGroup(_) => group_rules.push(rule),
                RuleScope::General => general_rules.push(rule),
            }
        }
        RuleEngine::new(product, product_rules, group_rules, general_rules, Utc::now()).unwrap()
    }

    #[test]
    fn test_first_matching_rule_wins() {
        let product = product();
        let mut first = title_rule("first", "cve-", RuleScope::Product(product.id));
        first.new_severity = Some(Severity::Low);
        let mut second = title_rule("second", "cve-", RuleScope::Product(product.id));
        second.new_severity = Some(Severity::Critical);
        second.new_status = Some(Status::FalsePositive);

        let engine = engine(&product, vec![first, second]);
        let mut observation = observation(&product);
        let log = engine.apply(&mut observation, &mut NoopListener).unwrap();

        assert_eq!(observation.current_severity, Severity::Low);
        assert_eq!(observation.current_status, Status::Open);
        assert_eq!(log.severity, Some(Severity::Low));
        assert!(log.comment.contains("first"));
    }

    #[test]
    fn test_unapproved_product_rule_does_not_participate() {
        let product = product();
        let mut rule = title_rule("pending", "cve-", RuleScope::Product(product.id));
        rule.new_severity = Some(Severity::Low);
        rule.approval_status = ApprovalStatus::NeedsApproval;

        let engine = engine(&product, vec![rule]);
        let mut observation = observation(&product);
        assert!(engine.apply(&mut observation, &mut NoopListener).is_none());
        assert_eq!(observation.current_severity, Severity::High);
    }

    #[test]
    fn test_group_rule_bypasses_approval_gate() {
        let product = product();
        let group = Uuid::new_v4();
        let mut rule = title_rule("group", "cve-", RuleScope::ProductGroup(group));
        rule.new_status = Some(Status::NotAffected);
        rule.approval_status = ApprovalStatus::NeedsApproval;

        let engine = engine(&product, vec![rule]);
        let mut observation = observation(&product);
        engine.apply(&mut observation, &mut NoopListener).unwrap();
        assert_eq!(observation.current_status, Status::NotAffected);
        assert!(observation.product_rule.is_some());
    }

    #[test]
    fn test_general_rules_require_opt_in() {
        let mut product = product();
        product.apply_general_rules = false;
        let mut rule = title_rule("general", "cve-", RuleScope::General);
        rule.new_severity = Some(Severity::Low);

        let engine = engine(&product, vec![rule]);
        let mut observation = observation(&product);
        assert!(engine.apply(&mut observation, &mut NoopListener).is_none());
    }

    #[test]
    fn test_risk_acceptance_sets_and_clears_expiry() {
        let product = product();
        let mut accept = title_rule("accept", "cve-", RuleScope::Product(product.id));
        accept.new_status = Some(Status::RiskAccepted);

        let engine_accept = engine(&product, vec![accept]);
        let mut observation = observation(&product);
        engine_accept
            .apply(&mut observation, &mut NoopListener)
            .unwrap();
        assert_eq!(observation.current_status, Status::RiskAccepted);
        let expiry = observation.risk_acceptance_expiry_date.unwrap();
        assert_eq!(expiry, Utc::now().date_naive() + Duration::days(30));

        // rule disappears: layer cleared, expiry cleared, removal logged
        let engine_empty = engine(&product, vec![]);
        let log = engine_empty
            .apply(&mut observation, &mut NoopListener)
            .unwrap();
        assert_eq!(observation.current_status, Status::Open);
        assert!(observation.risk_acceptance_expiry_date.is_none());
        assert!(log.comment.contains("Removed product rule accept"));
    }

    #[test]
    fn test_reapplying_same_rule_is_silent() {
        let product = product();
        let mut rule = title_rule("same", "cve-", RuleScope::Product(product.id));
        rule.new_severity = Some(Severity::Low);

        let engine = engine(&product, vec![rule.clone()]);
        let mut observation = observation(&product);
        let mut listener = RecordingListener::default();
        assert!(engine.apply(&mut observation, &mut listener).is_some());
        assert!(engine.apply(&mut observation, &mut listener).is_none());
        assert_eq!(listener.events.len(), 1);
    }

    #[test]
    fn test_orphaned_reference_removal() {
        let product = product();
        let mut observation = observation(&product);
        observation.product_rule = Some(Uuid::new_v4());
        observation.rule_status = Some(Status::NotAffected);
        resolve::resolve(&mut observation);

        let engine = engine(&product, vec![]);
        let log = engine.apply(&mut observation, &mut NoopListener).unwrap();
        assert_eq!(log.comment, "Removed unknown rule");
        assert_eq!(observation.current_status, Status::Open);
        assert!(observation.rule_status.is_none());
    }

    #[test]
    fn test_bulk_apply() {
        let product = product();
        let mut rule = title_rule("bulk", "cve-", RuleScope::Product(product.id));
        rule.new_severity = Some(Severity::None);
        let engine = engine(&product, vec![rule]);

        let mut observations = vec![observation(&product), observation(&product)];
        let logs = engine.apply_all(&mut observations, &mut NoopListener);
        assert_eq!(logs.len(), 2);
        assert!(observations
            .iter()
            .all(|o| o.current_severity == Severity::None));
    }
}
