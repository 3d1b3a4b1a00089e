//! Scan context - the tuple that defines which observations are diffed together

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::observation::Observation;

/// Identifies the scanner side of a scan context
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScannerKey {
    /// File upload, keyed by the uploaded filename
    Filename(String),
    /// API pull, keyed by the API configuration name
    ApiConfiguration(String),
}

/// A `(product, branch, scanner-key)` tuple
///
/// Successive imports into the same context are diffed against each other;
/// observations absent from the latest import of their context are marked
/// resolved.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScanContext {
    pub product: Uuid,
    pub branch: Option<Uuid>,
    pub scanner_key: ScannerKey,
}

impl ScanContext {
    pub fn file_upload(product: Uuid, branch: Option<Uuid>, filename: impl Into<String>) -> Self {
        Self {
            product,
            branch,
            scanner_key: ScannerKey::Filename(filename.into()),
        }
    }

    pub fn api_import(product: Uuid, branch: Option<Uuid>, configuration: impl Into<String>) -> Self {
        Self {
            product,
            branch,
            scanner_key: ScannerKey::ApiConfiguration(configuration.into()),
        }
    }

    /// Whether an observation belongs to this context
    pub fn contains(&self, observation: &Observation) -> bool {
        if observation.product != self.product || observation.branch != self.branch {
            return false;
        }
        match &self.scanner_key {
            ScannerKey::Filename(filename) => observation.upload_filename == *filename,
            ScannerKey::ApiConfiguration(name) => observation.api_configuration_name == *name,
        }
    }

    /// Stamp the context's key fields onto an observation
    pub fn apply_to(&self, observation: &mut Observation) {
        observation.product = self.product;
        observation.branch = self.branch;
        match &self.scanner_key {
            ScannerKey::Filename(filename) => {
                observation.upload_filename = filename.clone();
                observation.api_configuration_name.clear();
            }
            ScannerKey::ApiConfiguration(name) => {
                observation.api_configuration_name = name.clone();
                observation.upload_filename.clear();
            }
        }
    }
}
