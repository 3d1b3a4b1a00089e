//! Observation definitions - unified vulnerability findings and their state layers

use crate::severity::{Severity, Status, VexJustification};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A product under observation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    /// Package-URL identifying the product, may be empty
    pub purl: String,
    pub product_group: Option<Uuid>,
    /// Whether general rules apply to this product's observations
    pub apply_general_rules: bool,
    /// Days until an accepted risk expires, None disables expiry
    pub risk_acceptance_expiry_days: Option<u32>,
}

impl Product {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            purl: String::new(),
            product_group: None,
            apply_general_rules: true,
            risk_acceptance_expiry_days: None,
        }
    }
}

/// A branch/version of a product
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Branch {
    pub id: Uuid,
    pub product: Uuid,
    pub name: String,
    /// Branch-level Package-URL override, may be empty
    pub purl: String,
    pub last_import: Option<DateTime<Utc>>,
}

impl Branch {
    pub fn new(product: &Product, name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            product: product.id,
            name: name.into(),
            purl: String::new(),
            last_import: None,
        }
    }
}

/// Supporting evidence attached to an observation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evidence {
    pub name: String,
    pub evidence: String,
}

/// A single finding for one product/branch
///
/// Fields fall into layers: immutable origin data set by the parser at
/// import time, then the parser/rule/vex/assessment override layers that
/// feed the precedence resolver, then the derived `current_*` state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Observation {
    pub id: Uuid,
    pub product: Uuid,
    pub branch: Option<Uuid>,
    /// Stable fingerprint grouping re-scans of the same logical finding
    pub identity_hash: String,

    // --- origin ---
    pub title: String,
    pub description: String,
    pub recommendation: String,
    /// Parser/format that produced this observation, e.g. "CycloneDX"
    pub parser: String,
    /// Scanner that produced this observation, e.g. "Trivy / 0.50.1"
    pub scanner: String,
    pub scanner_observation_id: String,
    /// File the scan was uploaded as, empty for API imports
    pub upload_filename: String,
    /// API configuration the scan was pulled through, empty for file uploads
    pub api_configuration_name: String,
    pub vulnerability_id: String,
    pub cvss3_score: Option<f64>,
    pub cvss3_vector: String,
    pub cwe: Option<u32>,
    pub origin_component_name: String,
    pub origin_component_version: String,
    pub origin_component_name_version: String,
    pub origin_component_purl: String,
    pub origin_component_cpe: String,
    pub origin_component_dependencies: String,
    pub origin_docker_image_name: String,
    pub origin_docker_image_tag: String,
    pub origin_docker_image_name_tag: String,
    pub origin_endpoint_url: String,
    pub origin_service_name: String,
    pub origin_source_file: String,
    pub origin_source_line_start: Option<u32>,
    pub origin_source_line_end: Option<u32>,
    pub origin_cloud_qualified_resource: String,
    pub origin_kubernetes_qualified_resource: String,

    // --- parser layer ---
    pub parser_severity: Option<Severity>,
    pub parser_status: Option<Status>,

    // --- rule layer ---
    pub rule_severity: Option<Severity>,
    pub rule_status: Option<Status>,
    pub rule_vex_justification: Option<VexJustification>,
    pub product_rule: Option<Uuid>,
    pub general_rule: Option<Uuid>,

    // --- vex layer ---
    pub vex_status: Option<Status>,
    pub vex_vex_justification: Option<VexJustification>,
    pub vex_statement: Option<Uuid>,

    // --- assessment layer (human input, highest precedence) ---
    pub assessment_severity: Option<Severity>,
    pub assessment_status: Option<Status>,

    // --- derived ---
    pub current_severity: Severity,
    pub current_status: Status,
    pub current_vex_justification: Option<VexJustification>,
    pub risk_acceptance_expiry_date: Option<NaiveDate>,

    pub references: Vec<String>,
    pub evidences: Vec<Evidence>,

    pub created: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
}

impl Observation {
    /// Create an observation builder
    pub fn builder(product: &Product, title: impl Into<String>) -> ObservationBuilder {
        ObservationBuilder::new(product, title)
    }

    /// Numeric sort key derived from the current severity
    pub fn numerical_severity(&self) -> u8 {
        self.current_severity.as_number()
    }

    /// Collapse absent origin fields and derive the combined name/version
    /// fields. Must run before identity hashing so that "field present but
    /// empty" and "field absent" fingerprint identically.
    pub fn normalize_origin(&mut self) {
        for field in [
            &mut self.title,
            &mut self.description,
            &mut self.recommendation,
            &mut self.vulnerability_id,
            &mut self.origin_component_name,
            &mut self.origin_component_version,
            &mut self.origin_component_name_version,
            &mut self.origin_docker_image_name,
            &mut self.origin_docker_image_tag,
            &mut self.origin_docker_image_name_tag,
            &mut self.origin_endpoint_url,
            &mut self.origin_service_name,
            &mut self.origin_source_file,
            &mut self.origin_cloud_qualified_resource,
            &mut self.origin_kubernetes_qualified_resource,
        ] {
            if field.trim().len() != field.len() {
                let trimmed = field.trim().to_string();
                *field = trimmed;
            }
        }

        if self.origin_component_name_version.is_empty() && !self.origin_component_name.is_empty()
        {
            self.origin_component_name_version = if self.origin_component_version.is_empty() {
                self.origin_component_name.clone()
            } else {
                format!(
                    "{}:{}",
                    self.origin_component_name, self.origin_component_version
                )
            };
        } else if !self.origin_component_name_version.is_empty()
            && self.origin_component_name.is_empty()
        {
            match self.origin_component_name_version.rsplit_once(':') {
                Some((name, version)) => {
                    self.origin_component_name = name.to_string();
                    self.origin_component_version = version.to_string();
                }
                None => {
                    self.origin_component_name = self.origin_component_name_version.clone();
                }
            }
        }

        if self.origin_docker_image_name_tag.is_empty() && !self.origin_docker_image_name.is_empty()
        {
            self.origin_docker_image_name_tag = if self.origin_docker_image_tag.is_empty() {
                self.origin_docker_image_name.clone()
            } else {
                format!(
                    "{}:{}",
                    self.origin_docker_image_name, self.origin_docker_image_tag
                )
            };
        } else if !self.origin_docker_image_name_tag.is_empty()
            && self.origin_docker_image_name.is_empty()
        {
            match self.origin_docker_image_name_tag.rsplit_once(':') {
                Some((name, tag)) => {
                    self.origin_docker_image_name = name.to_string();
                    self.origin_docker_image_tag = tag.to_string();
                }
                None => {
                    self.origin_docker_image_name = self.origin_docker_image_name_tag.clone();
                }
            }
        }
    }
}

/// Builder for constructing observations
pub struct ObservationBuilder {
    observation: Observation,
}

impl ObservationBuilder {
    pub fn new(product: &Product, title: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            observation: Observation {
                id: Uuid::new_v4(),
                product: product.id,
                branch: None,
                identity_hash: String::new(),
                title: title.into(),
                description: String::new(),
                recommendation: String::new(),
                parser: String::new(),
                scanner: String::new(),
                scanner_observation_id: String::new(),
                upload_filename: String::new(),
                api_configuration_name: String::new(),
                vulnerability_id: String::new(),
                cvss3_score: None,
                cvss3_vector: String::new(),
                cwe: None,
                origin_component_name: String::new(),
                origin_component_version: String::new(),
                origin_component_name_version: String::new(),
                origin_component_purl: String::new(),
                origin_component_cpe: String::new(),
                origin_component_dependencies: String::new(),
                origin_docker_image_name: String::new(),
                origin_docker_image_tag: String::new(),
                origin_docker_image_name_tag: String::new(),
                origin_endpoint_url: String::new(),
                origin_service_name: String::new(),
                origin_source_file: String::new(),
                origin_source_line_start: None,
                origin_source_line_end: None,
                origin_cloud_qualified_resource: String::new(),
                origin_kubernetes_qualified_resource: String::new(),
                parser_severity: None,
                parser_status: None,
                rule_severity: None,
                rule_status: None,
                rule_vex_justification: None,
                product_rule: None,
                general_rule: None,
                vex_status: None,
                vex_vex_justification: None,
                vex_statement: None,
                assessment_severity: None,
                assessment_status: None,
                current_severity: Severity::Unknown,
                current_status: Status::Open,
                current_vex_justification: None,
                risk_acceptance_expiry_date: None,
                references: Vec::new(),
                evidences: Vec::new(),
                created: now,
                last_seen: now,
            },
        }
    }

    pub fn branch(mut self, branch: &Branch) -> Self {
        self.observation.branch = Some(branch.id);
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.observation.description = description.into();
        self
    }

    pub fn recommendation(mut self, recommendation: impl Into<String>) -> Self {
        self.observation.recommendation = recommendation.into();
        self
    }

    pub fn parser(mut self, parser: impl Into<String>) -> Self {
        self.observation.parser = parser.into();
        self
    }

    pub fn scanner(mut self, scanner: impl Into<String>) -> Self {
        self.observation.scanner = scanner.into();
        self
    }

    pub fn vulnerability_id(mut self, id: impl Into<String>) -> Self {
        self.observation.vulnerability_id = id.into();
        self
    }

    pub fn cvss3(mut self, score: f64, vector: impl Into<String>) -> Self {
        self.observation.cvss3_score = Some(score);
        self.observation.cvss3_vector = vector.into();
        self
    }

    pub fn cwe(mut self, cwe: u32) -> Self {
        self.observation.cwe = Some(cwe);
        self
    }

    pub fn component(mut self, name: impl Into<String>, version: impl Into<String>) -> Self {
        self.observation.origin_component_name = name.into();
        self.observation.origin_component_version = version.into();
        self
    }

    pub fn component_purl(mut self, purl: impl Into<String>) -> Self {
        self.observation.origin_component_purl = purl.into();
        self
    }

    pub fn docker_image(mut self, name: impl Into<String>, tag: impl Into<String>) -> Self {
        self.observation.origin_docker_image_name = name.into();
        self.observation.origin_docker_image_tag = tag.into();
        self
    }

    pub fn endpoint(mut self, url: impl Into<String>) -> Self {
        self.observation.origin_endpoint_url = url.into();
        self
    }

    pub fn service(mut self, name: impl Into<String>) -> Self {
        self.observation.origin_service_name = name.into();
        self
    }

    pub fn source_location(mut self, file: impl Into<String>, start: u32, end: u32) -> Self {
        self.observation.origin_source_file = file.into();
        self.observation.origin_source_line_start = Some(start);
        self.observation.origin_source_line_end = Some(end);
        self
    }

    pub fn parser_severity(mut self, severity: Severity) -> Self {
        self.observation.parser_severity = Some(severity);
        self
    }

    pub fn parser_status(mut self, status: Status) -> Self {
        self.observation.parser_status = Some(status);
        self
    }

    pub fn reference(mut self, url: impl Into<String>) -> Self {
        self.observation.references.push(url.into());
        self
    }

    pub fn evidence(mut self, name: impl Into<String>, evidence: impl Into<String>) -> Self {
        self.observation.evidences.push(Evidence {
            name: name.into(),
            evidence: evidence.into(),
        });
        self
    }

    /// Normalize origin fields and fingerprint the observation
    pub fn build(mut self) -> Observation {
        self.observation.normalize_origin();
        self.observation.identity_hash = crate::identity::identity_hash(&self.observation);
        self.observation
    }
}
