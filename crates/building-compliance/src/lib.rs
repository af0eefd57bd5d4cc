//! Compliance scoring for NYC buildings: turns DOB, ECB and HPD violation histories plus
//! DOB permits into a weighted 0-100 score with a risk tier, and saves scored reports for
//! signed-in users.

pub mod config;
pub mod error;
pub mod importers;
pub mod reports;
pub mod scoring;
pub mod telemetry;

pub use scoring::{compute_compliance_score, ComplianceEngine, ComplianceScore, PropertyData};
