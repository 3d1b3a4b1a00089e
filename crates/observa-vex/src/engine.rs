//! Reconciliation of external VEX statements against observations
//!
//! A VEX engine is constructed per `(product, branch)`: it reduces the
//! effective Package-URL to `type:namespace/name`, preloads every statement
//! whose product purl starts with that prefix, and applies the first
//! matching statement to each observation.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use observa_core::{
    resolve, Branch, ChangeListener, Observation, ObservationLog, Product, StateSnapshot, Status,
};
use tracing::debug;
use uuid::Uuid;

use crate::purl::PackageUrl;
use crate::statement::{VexStatement, VexStatementStore};

const ACTOR: &str = "VEX engine";

/// Per-(product, branch) VEX engine; cheap to build, stateless after
/// construction
pub struct VexEngine {
    /// Parsed effective product/branch purl, `None` when the product
    /// carries no usable purl
    effective_purl: Option<PackageUrl>,
    statements: Vec<VexStatement>,
    /// Document tracking ids of every loaded statement, for removal comments
    document_ids: HashMap<Uuid, String>,
    now: DateTime<Utc>,
}

impl VexEngine {
    pub fn new(
        product: &Product,
        branch: Option<&Branch>,
        store: &dyn VexStatementStore,
        now: DateTime<Utc>,
    ) -> Self {
        let raw_purl = match branch {
            Some(branch) if !branch.purl.is_empty() => branch.purl.as_str(),
            _ => product.purl.as_str(),
        };
        let effective_purl = PackageUrl::parse(raw_purl);

        let statements = match &effective_purl {
            Some(purl) => store.by_product_purl_prefix(&purl.base_identity()),
            None => Vec::new(),
        };
        let document_ids = statements
            .iter()
            .map(|statement| (statement.id, statement.document_id.clone()))
            .collect();

        debug!(
            product = product.name.as_str(),
            statements = statements.len(),
            "VEX engine constructed"
        );

        Self {
            effective_purl,
            statements,
            document_ids,
            now,
        }
    }

    /// Apply the first matching statement to one observation
    pub fn apply(
        &self,
        observation: &mut Observation,
        listener: &mut dyn ChangeListener,
    ) -> Option<ObservationLog> {
        let before = StateSnapshot::of(observation);
        let before_statement = observation.vex_statement;

        match self
            .statements
            .iter()
            .find(|statement| self.statement_matches(statement, observation))
        {
            Some(matched) => {
                observation.vex_status = Some(matched.status.observation_status());
                observation.vex_vex_justification = matched.justification;
                observation.vex_statement = Some(matched.id);
                resolve::resolve(observation);

                let changed = observation.vex_statement != before_statement
                    || observation.current_status != before.status
                    || observation.current_vex_justification != before.vex_justification;
                // a statement merely reasserting "still open" is not worth
                // an audit entry or a tracker push
                let open_churn = before.status == Status::Open
                    && observation.current_status == Status::Open
                    && observation.current_vex_justification == before.vex_justification;
                if !changed || open_churn {
                    return None;
                }

                let comment = format!("Updated by VEX statement from {}", matched.document_id);
                debug!(
                    observation = %observation.id,
                    document = matched.document_id.as_str(),
                    "VEX statement applied"
                );
                listener.observation_changed(observation, &before, &comment);
                Some(ObservationLog::for_change(
                    observation,
                    &before,
                    comment,
                    ACTOR,
                    self.now,
                ))
            }
            None => {
                let stale = before_statement?;

                let comment = match self.document_ids.get(&stale) {
                    Some(document_id) => format!("Removed VEX statement from {document_id}"),
                    None => "Removed VEX statement from unknown document".to_string(),
                };
                observation.vex_status = None;
                observation.vex_vex_justification = None;
                observation.vex_statement = None;
                resolve::resolve(observation);

                debug!(observation = %observation.id, "stale VEX statement cleared");
                listener.observation_changed(observation, &before, &comment);
                Some(ObservationLog::for_change(
                    observation,
                    &before,
                    comment,
                    ACTOR,
                    self.now,
                ))
            }
        }
    }

    /// Apply to every observation of the product/branch
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

    fn statement_matches(&self, statement: &VexStatement, observation: &Observation) -> bool {
        if observation.vulnerability_id.is_empty()
            || statement.vulnerability_id != observation.vulnerability_id
        {
            return false;
        }

        let Some(effective_purl) = &self.effective_purl else {
            return false;
        };
        // a statement purl that cannot be parsed only disables that statement
        let Some(statement_purl) = PackageUrl::parse(&statement.product_purl) else {
            return false;
        };
        if !statement_purl.matches(effective_purl) {
            return false;
        }

        if !statement.component_purl.is_empty() {
            let Some(component_template) = PackageUrl::parse(&statement.component_purl) else {
                return false;
            };
            let Some(component) = PackageUrl::parse(&observation.origin_component_purl) else {
                return false;
            };
            if !component_template.matches(&component) {
                return false;
            }
        }

        true
    }
}

/// Re-apply newly imported statements to every matching scope of a product
///
/// Invoked after a VEX document import: each branch (and the product
/// itself) whose reduced purl prefixes a new statement's product purl gets
/// a fresh engine run over its observations against the new statements.
pub fn apply_after_import(
    product: &Product,
    branches: &[Branch],
    observations: &mut [Observation],
    new_statements: &[VexStatement],
    listener: &mut dyn ChangeListener,
    now: DateTime<Utc>,
) -> Vec<ObservationLog> {
    let mut logs = Vec::new();

    let mut scopes: Vec<(Option<&Branch>, &str)> = vec![(None, product.purl.as_str())];
    for branch in branches {
        if !branch.purl.is_empty() {
            scopes.push((Some(branch), branch.purl.as_str()));
        }
    }

    for (branch, raw_purl) in scopes {
        let Some(purl) = PackageUrl::parse(raw_purl) else {
            continue;
        };
        let prefix = purl.base_identity();
        if !new_statements
            .iter()
            .any(|statement| statement.product_purl.starts_with(&prefix))
        {
            continue;
        }

        let store = SliceStore(new_statements);
        let engine = VexEngine::new(product, branch, &store, now);
        let branch_id = branch.map(|b| b.id);
        for observation in observations
            .iter_mut()
            .filter(|observation| match branch_id {
                Some(id) => observation.branch == Some(id),
                None => observation.branch.is_none(),
            })
        {
            if let Some(entry) = engine.apply(observation, listener) {
                logs.push(entry);
            }
        }
    }

    logs
}

struct SliceStore<'a>(&'a [VexStatement]);

impl VexStatementStore for SliceStore<'_> {
    fn by_product_purl_prefix(&self, prefix: &str) -> Vec<VexStatement> {
        self.0
            .iter()
            .filter(|statement| statement.product_purl.starts_with(prefix))
            .cloned()
            .collect()
    }
}
