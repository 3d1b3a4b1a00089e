//! Observa Rules - administrator-defined pattern rules
//!
//! Rules rewrite the rule layer of matching observations: severity, status
//! and VEX justification. Evaluation is first-match-wins over an ordered
//! list built per product from product, product-group and general rules.

pub mod engine;
pub mod matcher;
pub mod rule;

pub use engine::RuleEngine;
pub use matcher::{CompiledRule, FieldMatcher};
pub use rule::{ApprovalStatus, Rule, RuleScope};
