//! Append-only audit trail for observation state changes

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::observation::Observation;
use crate::severity::{Severity, Status, VexJustification};

/// Snapshot of an observation's resolved state, taken before a mutation so
/// the delta can be recorded and collaborators notified
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateSnapshot {
    pub severity: Severity,
    pub status: Status,
    pub vex_justification: Option<VexJustification>,
    pub risk_acceptance_expiry_date: Option<NaiveDate>,
}

impl StateSnapshot {
    pub fn of(observation: &Observation) -> Self {
        Self {
            severity: observation.current_severity,
            status: observation.current_status,
            vex_justification: observation.current_vex_justification,
            risk_acceptance_expiry_date: observation.risk_acceptance_expiry_date,
        }
    }
}

/// One audit trail entry; never edited or deleted
///
/// Delta fields carry the new value when it changed during the mutation
/// that produced the entry and `None` when it did not.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservationLog {
    pub id: Uuid,
    pub observation: Uuid,
    pub severity: Option<Severity>,
    pub status: Option<Status>,
    pub vex_justification: Option<VexJustification>,
    pub risk_acceptance_expiry_date: Option<NaiveDate>,
    pub comment: String,
    /// Who caused the change, e.g. a scanner name, "Rule engine", "VEX engine"
    pub actor: String,
    pub created: DateTime<Utc>,
}

impl ObservationLog {
    /// Build an entry recording the delta between a snapshot and the
    /// observation's current resolved state
    pub fn for_change(
        observation: &Observation,
        before: &StateSnapshot,
        comment: impl Into<String>,
        actor: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            observation: observation.id,
            severity: (observation.current_severity != before.severity)
                .then_some(observation.current_severity),
            status: (observation.current_status != before.status)
                .then_some(observation.current_status),
            vex_justification: if observation.current_vex_justification != before.vex_justification
            {
                observation.current_vex_justification
            } else {
                None
            },
            risk_acceptance_expiry_date: if observation.risk_acceptance_expiry_date
                != before.risk_acceptance_expiry_date
            {
                observation.risk_acceptance_expiry_date
            } else {
                None
            },
            comment: comment.into(),
            actor: actor.into(),
            created: now,
        }
    }
}
