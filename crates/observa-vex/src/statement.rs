//! VEX document and statement models

use observa_core::{Status, VexJustification};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Status vocabulary shared by CSAF, OpenVEX and CycloneDX VEX
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VexStatementStatus {
    Affected,
    NotAffected,
    Fixed,
    UnderInvestigation,
    FalsePositive,
}

impl VexStatementStatus {
    /// Map the document vocabulary to the internal observation status
    pub fn observation_status(&self) -> Status {
        match self {
            VexStatementStatus::NotAffected => Status::NotAffected,
            VexStatementStatus::Fixed => Status::Resolved,
            VexStatementStatus::UnderInvestigation => Status::InReview,
            _ => Status::Open,
        }
    }
}

/// An imported VEX document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VexDocument {
    pub id: Uuid,
    /// Tracking id from the document itself, e.g. a CSAF `document.tracking.id`
    pub document_id: String,
    pub version: String,
    pub author: String,
}

impl VexDocument {
    pub fn new(document_id: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            document_id: document_id.into(),
            version: String::new(),
            author: String::new(),
        }
    }
}

/// One exploitability claim for a `(vulnerability, product, component?)` triple
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VexStatement {
    pub id: Uuid,
    pub document: Uuid,
    /// Denormalized tracking id of the originating document, used in
    /// audit log comments
    pub document_id: String,
    pub vulnerability_id: String,
    pub product_purl: String,
    /// Empty when the statement covers the whole product
    pub component_purl: String,
    pub status: VexStatementStatus,
    pub justification: Option<VexJustification>,
    pub impact: String,
    pub remediation: String,
}

impl VexStatement {
    pub fn new(
        document: &VexDocument,
        vulnerability_id: impl Into<String>,
        product_purl: impl Into<String>,
        status: VexStatementStatus,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            document: document.id,
            document_id: document.document_id.clone(),
            vulnerability_id: vulnerability_id.into(),
            product_purl: product_purl.into(),
            component_purl: String::new(),
            status,
            justification: None,
            impact: String::new(),
            remediation: String::new(),
        }
    }
}

/// VEX statement persistence as consumed by the engine
pub trait VexStatementStore {
    /// Statements whose product purl starts with the given reduced purl,
    /// in load order
    fn by_product_purl_prefix(&self, prefix: &str) -> Vec<VexStatement>;
}

/// In-memory statement arena preserving insertion order
#[derive(Debug, Default)]
pub struct MemoryVexStore {
    statements: Vec<VexStatement>,
}

impl MemoryVexStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, statement: VexStatement) {
        self.statements.push(statement);
    }

    pub fn all(&self) -> &[VexStatement] {
        &self.statements
    }
}

impl VexStatementStore for MemoryVexStore {
    fn by_product_purl_prefix(&self, prefix: &str) -> Vec<VexStatement> {
        self.statements
            .iter()
            .filter(|statement| statement.product_purl.starts_with(prefix))
            .cloned()
            .collect()
    }
}
