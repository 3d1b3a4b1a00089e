//! Scan import reconciliation
//!
//! Diffs a batch of freshly parsed observations against the previous batch
//! of the same scan context, classifying each as new, updated or resolved.
//! Severity/status resolution and rule evaluation run per observation; the
//! leftover pass that marks missing observations resolved only starts after
//! every incoming observation is fully processed, because rule outcomes can
//! flip an observation between the counter buckets.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use observa_core::{
    identity_hash, resolve, ChangeListener, Error, Observation, ObservationLog, Result,
    ScanContext, StateSnapshot, Status,
};
use observa_core::store::ObservationRepository;
use observa_rules::RuleEngine;
use tracing::{debug, info};
use uuid::Uuid;

const RESOLVED_COMMENT: &str = "Observation not found in latest scan";

/// Counters and touched set of one reconciliation run
#[derive(Debug, Default)]
pub struct ImportResult {
    /// Newly created observations whose resolved status is open
    pub new: usize,
    /// Changed existing observations whose resolved status is open
    pub updated: usize,
    /// Observations whose status transitioned out of open because they
    /// were missing from this scan
    pub resolved: usize,
    /// Every observation written during the run, for downstream
    /// notification and duplicate-detection collaborators
    pub touched: Vec<Uuid>,
}

/// One reconciliation run for one scan context
///
/// The host must serialize concurrent imports into the same context; the
/// reconciler assumes exclusive access to the context's stored observations
/// for the duration of the run.
pub struct ImportReconciler<'a> {
    context: ScanContext,
    rule_engine: &'a RuleEngine,
    now: DateTime<Utc>,
}

impl<'a> ImportReconciler<'a> {
    pub fn new(context: ScanContext, rule_engine: &'a RuleEngine, now: DateTime<Utc>) -> Self {
        Self {
            context,
            rule_engine,
            now,
        }
    }

    /// Run the reconciliation state machine
    pub fn reconcile(
        &self,
        parsed: Vec<Observation>,
        repository: &mut dyn ObservationRepository,
        listener: &mut dyn ChangeListener,
    ) -> Result<ImportResult> {
        let mut result = ImportResult::default();

        // load the previous batch, keyed by identity hash in stored order
        let mut before: HashMap<String, Observation> = HashMap::new();
        let mut leftover_order: Vec<String> = Vec::new();
        for observation in repository.observations_for_context(&self.context) {
            let hash = observation.identity_hash.clone();
            if before.insert(hash.clone(), observation).is_some() {
                return Err(Error::DuplicateIdentityHash { hash });
            }
            leftover_order.push(hash);
        }

        let mut processed: HashSet<String> = HashSet::new();

        for mut incoming in parsed {
            self.context.apply_to(&mut incoming);
            incoming.normalize_origin();
            incoming.identity_hash = identity_hash(&incoming);

            // duplicate within one scan: first occurrence wins
            if !processed.insert(incoming.identity_hash.clone()) {
                debug!(
                    hash = incoming.identity_hash.as_str(),
                    "duplicate observation within scan skipped"
                );
                continue;
            }

            match before.remove(&incoming.identity_hash) {
                Some(existing) => {
                    self.process_existing(existing, incoming, repository, listener, &mut result)
                }
                None => self.process_new(incoming, repository, listener, &mut result),
            }
        }

        // everything not seen again is missing from this scan
        for hash in leftover_order {
            let Some(observation) = before.remove(&hash) else {
                continue;
            };
            if processed.contains(&hash) {
                return Err(Error::ObservationReprocessed { id: observation.id });
            }
            self.process_missing(observation, repository, listener, &mut result);
        }

        if let Some(branch) = self.context.branch {
            repository.set_branch_last_import(branch, self.now);
        }

        info!(
            new = result.new,
            updated = result.updated,
            resolved = result.resolved,
            "scan import reconciled"
        );
        Ok(result)
    }

    /// Merge the latest scanner data onto a known observation
    fn process_existing(
        &self,
        mut existing: Observation,
        incoming: Observation,
        repository: &mut dyn ObservationRepository,
        listener: &mut dyn ChangeListener,
        result: &mut ImportResult,
    ) {
        let before_state = StateSnapshot::of(&existing);
        let fields_changed = merge_scanner_fields(&mut existing, &incoming);
        existing.references = incoming.references;
        existing.evidences = incoming.evidences;
        existing.last_seen = self.now;

        resolve::resolve(&mut existing);
        let rule_log = self.rule_engine.apply(&mut existing, listener);

        let state_changed = StateSnapshot::of(&existing) != before_state;
        if state_changed && rule_log.is_none() {
            listener.observation_changed(&existing, &before_state, "Updated by latest scan");
            repository.append_log(ObservationLog::for_change(
                &existing,
                &before_state,
                "Updated by latest scan",
                scan_actor(&existing),
                self.now,
            ));
        }
        if let Some(entry) = rule_log {
            repository.append_log(entry);
        }

        if (state_changed || fields_changed) && existing.current_status == Status::Open {
            result.updated += 1;
        }
        result.touched.push(existing.id);
        repository.save(existing);
    }

    /// Create an observation seen for the first time in this context
    fn process_new(
        &self,
        mut incoming: Observation,
        repository: &mut dyn ObservationRepository,
        listener: &mut dyn ChangeListener,
        result: &mut ImportResult,
    ) {
        incoming.created = self.now;
        incoming.last_seen = self.now;
        resolve::resolve(&mut incoming);
        let rule_log = self.rule_engine.apply(&mut incoming, listener);

        repository.append_log(ObservationLog {
            id: Uuid::new_v4(),
            observation: incoming.id,
            severity: Some(incoming.current_severity),
            status: Some(incoming.current_status),
            vex_justification: incoming.current_vex_justification,
            risk_acceptance_expiry_date: incoming.risk_acceptance_expiry_date,
            comment: "Observation created by import".to_string(),
            actor: scan_actor(&incoming).to_string(),
            created: self.now,
        });
        if let Some(entry) = rule_log {
            repository.append_log(entry);
        }

        if incoming.current_status == Status::Open {
            result.new += 1;
        }
        result.touched.push(incoming.id);
        repository.save(incoming);
    }

    /// Force an observation missing from this scan to resolved
    fn process_missing(
        &self,
        mut observation: Observation,
        repository: &mut dyn ObservationRepository,
        listener: &mut dyn ChangeListener,
        result: &mut ImportResult,
    ) {
        let before_state = StateSnapshot::of(&observation);
        observation.parser_status = Some(Status::Resolved);
        // recompute even when the value cannot change, downstream side
        // effects still apply
        resolve::resolve(&mut observation);

        // only the open -> resolved transition is counted and logged
        if before_state.status == Status::Open {
            result.resolved += 1;
            listener.observation_changed(&observation, &before_state, RESOLVED_COMMENT);
            repository.append_log(ObservationLog::for_change(
                &observation,
                &before_state,
                RESOLVED_COMMENT,
                scan_actor(&observation),
                self.now,
            ));
        }

        result.touched.push(observation.id);
        repository.save(observation);
    }
}

fn scan_actor(observation: &Observation) -> &str {
    if observation.scanner.is_empty() {
        "Import"
    } else {
        &observation.scanner
    }
}

/// Copy the scanner-provided fields of the latest run onto the stored
/// observation; returns whether anything differed
///
/// The parser status layer gets one special rule: a run reporting no
/// explicit status reopens a previously resolved observation, anything
/// else leaves the layer untouched.
fn merge_scanner_fields(existing: &mut Observation, incoming: &Observation) -> bool {
    let mut changed = false;

    macro_rules! merge {
        ($field:ident) => {
            if existing.$field != incoming.$field {
                existing.$field = incoming.$field.clone();
                changed = true;
            }
        };
    }

    merge!(title);
    merge!(description);
    merge!(recommendation);
    merge!(parser);
    merge!(scanner);
    merge!(scanner_observation_id);
    merge!(vulnerability_id);
    merge!(cvss3_score);
    merge!(cvss3_vector);
    merge!(cwe);
    merge!(origin_component_dependencies);
    merge!(parser_severity);

    match incoming.parser_status {
        Some(status) => {
            if existing.parser_status != Some(status) {
                existing.parser_status = Some(status);
                changed = true;
            }
        }
        None => {
            if existing.parser_status == Some(Status::Resolved) {
                existing.parser_status = Some(Status::Open);
                changed = true;
            }
        }
    }

    changed
}
