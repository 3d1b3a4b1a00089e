//! Rule definitions - administrator-defined pattern rules

use observa_core::{Severity, Status, VexJustification};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Where a rule applies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleScope {
    /// One product's own rule
    Product(Uuid),
    /// Inherited by every member product of the group
    ProductGroup(Uuid),
    /// Inherited only by products that opt in
    General,
}

/// Four-eyes state of a rule
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalStatus {
    #[default]
    NeedsApproval,
    Approved,
    AutoApproved,
    Rejected,
}

impl ApprovalStatus {
    pub fn is_approved(&self) -> bool {
        matches!(self, ApprovalStatus::Approved | ApprovalStatus::AutoApproved)
    }
}

/// An ordered predicate plus rewrite
///
/// Pattern fields are case-insensitive regular expressions matched at the
/// start of the observation field; an empty pattern matches anything. The
/// `parser` field is an exact match, `scanner_prefix` a prefix match. The
/// `new_*` fields are applied to the rule layer of a matching observation;
/// `None` leaves that part of the layer untouched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rule {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub scope: RuleScope,
    pub enabled: bool,
    pub approval_status: ApprovalStatus,

    pub parser: String,
    pub scanner_prefix: String,
    pub title: String,
    pub description_observation: String,
    pub origin_component_name_version: String,
    pub origin_docker_image_name_tag: String,
    pub origin_endpoint_url: String,
    pub origin_service_name: String,
    pub origin_source_file: String,
    pub origin_cloud_qualified_resource: String,
    pub origin_kubernetes_qualified_resource: String,

    pub new_severity: Option<Severity>,
    pub new_status: Option<Status>,
    pub new_vex_justification: Option<VexJustification>,
}

impl Rule {
    pub fn new(name: impl Into<String>, scope: RuleScope) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            description: String::new(),
            scope,
            enabled: true,
            approval_status: ApprovalStatus::Approved,
            parser: String::new(),
            scanner_prefix: String::new(),
            title: String::new(),
            description_observation: String::new(),
            origin_component_name_version: String::new(),
            origin_docker_image_name_tag: String::new(),
            origin_endpoint_url: String::new(),
            origin_service_name: String::new(),
            origin_source_file: String::new(),
            origin_cloud_qualified_resource: String::new(),
            origin_kubernetes_qualified_resource: String::new(),
            new_severity: None,
            new_status: None,
            new_vex_justification: None,
        }
    }
}
