//! Observa VEX - third-party exploitability statements
//!
//! Reconciles CSAF/OpenVEX/CycloneDX statements (already parsed into
//! `VexStatement`s by the format collaborators) against observations via
//! Package-URL matching, and rewrites the vex layer of matching
//! observations.

pub mod engine;
pub mod purl;
pub mod statement;

pub use engine::{apply_after_import, VexEngine};
pub use purl::PackageUrl;
pub use statement::{
    MemoryVexStore, VexDocument, VexStatement, VexStatementStatus, VexStatementStore,
};
