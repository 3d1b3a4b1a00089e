//! Observa Import - reconciliation of scan runs
//!
//! Parsed observations arrive per scan context `(product, branch,
//! scanner-key)`; the reconciler diffs them against the previous run of the
//! same context, merges scanner data, re-resolves state, runs the rule
//! engine and marks observations missing from the scan as resolved.

pub mod reconciler;

pub use reconciler::{ImportReconciler, ImportResult};
