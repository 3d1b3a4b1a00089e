//! Persistence and collaborator seams
//!
//! The engines talk to the host system through these traits. The in-memory
//! implementations are id-keyed arenas used by tests and as reference
//! behavior; production hosts back them with their own persistence.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::context::ScanContext;
use crate::log::{ObservationLog, StateSnapshot};
use crate::observation::Observation;

/// Observation persistence as consumed by the import reconciler
pub trait ObservationRepository {
    /// All stored observations of one scan context
    fn observations_for_context(&self, context: &ScanContext) -> Vec<Observation>;

    /// Insert or update an observation
    fn save(&mut self, observation: Observation);

    /// Append an audit trail entry (insert-only)
    fn append_log(&mut self, entry: ObservationLog);

    /// Record the time of the latest import into a branch
    fn set_branch_last_import(&mut self, branch: Uuid, when: DateTime<Utc>);
}

/// Receives per-observation change events for notification and
/// issue-tracker delivery; deciding whether to push is the receiver's job
pub trait ChangeListener {
    fn observation_changed(
        &mut self,
        observation: &Observation,
        before: &StateSnapshot,
        comment: &str,
    );
}

/// Listener that drops all events
#[derive(Debug, Default)]
pub struct NoopListener;

impl ChangeListener for NoopListener {
    fn observation_changed(&mut self, _: &Observation, _: &StateSnapshot, _: &str) {}
}

/// Listener that records events, for tests and dry runs
#[derive(Debug, Default)]
pub struct RecordingListener {
    pub events: Vec<ChangeEvent>,
}

/// A recorded change event with before/after resolved state
#[derive(Debug, Clone)]
pub struct ChangeEvent {
    pub observation: Uuid,
    pub before: StateSnapshot,
    pub after: StateSnapshot,
    pub comment: String,
}

impl ChangeListener for RecordingListener {
    fn observation_changed(
        &mut self,
        observation: &Observation,
        before: &StateSnapshot,
        comment: &str,
    ) {
        self.events.push(ChangeEvent {
            observation: observation.id,
            before: before.clone(),
            after: StateSnapshot::of(observation),
            comment: comment.to_string(),
        });
    }
}

/// In-memory observation arena
#[derive(Debug, Default)]
pub struct MemoryRepository {
    observations: HashMap<Uuid, Observation>,
    logs: Vec<ObservationLog>,
    branch_imports: HashMap<Uuid, DateTime<Utc>>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: Uuid) -> Option<&Observation> {
        self.observations.get(&id)
    }

    pub fn all(&self) -> impl Iterator<Item = &Observation> {
        self.observations.values()
    }

    pub fn logs(&self) -> &[ObservationLog] {
        &self.logs
    }

    pub fn logs_for(&self, observation: Uuid) -> Vec<&ObservationLog> {
        self.logs
            .iter()
            .filter(|entry| entry.observation == observation)
            .collect()
    }

    pub fn branch_last_import(&self, branch: Uuid) -> Option<DateTime<Utc>> {
        self.branch_imports.get(&branch).copied()
    }
}

impl ObservationRepository for MemoryRepository {
    fn observations_for_context(&self, context: &ScanContext) -> Vec<Observation> {
        let mut observations: Vec<Observation> = self
            .observations
            .values()
            .filter(|observation| context.contains(observation))
            .cloned()
            .collect();
        observations.sort_by(|a, b| a.created.cmp(&b.created));
        observations
    }

    fn save(&mut self, observation: Observation) {
        self.observations.insert(observation.id, observation);
    }

    fn append_log(&mut self, entry: ObservationLog) {
        self.logs.push(entry);
    }

    fn set_branch_last_import(&mut self, branch: Uuid, when: DateTime<Utc>) {
        self.branch_imports.insert(branch, when);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observation::Product;

    #[test]
    fn test_memory_repository_filters_by_context() {
        let product = Product::new("test");
        let context = ScanContext::file_upload(product.id, None, "scan.sarif");
        let mut repository = MemoryRepository::new();

        let mut inside = Observation::builder(&product, "Inside").build();
        context.apply_to(&mut inside);
        let inside_id = inside.id;
        repository.save(inside);

        let outside = Observation::builder(&product, "Outside").build();
        repository.save(outside);

        let found = repository.observations_for_context(&context);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, inside_id);
    }
}
