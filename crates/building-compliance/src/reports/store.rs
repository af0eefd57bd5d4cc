use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::auth::UserId;
use crate::scoring::{ComplianceScore, PropertyData, RiskLevel};

/// Server-assigned identifier for a saved report.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ReportId(pub String);

impl fmt::Display for ReportId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Persisted report snapshot, keyed by `(user_id, bin)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedReport {
    pub id: ReportId,
    pub user_id: UserId,
    pub bin: String,
    pub address: String,
    pub report_data: PropertyData,
    pub compliance_score: u8,
    pub risk_level: RiskLevel,
    pub created_at: DateTime<Utc>,
}

/// Report payload before the store assigns `id` and `created_at`.
#[derive(Debug, Clone, PartialEq)]
pub struct NewSavedReport {
    pub user_id: UserId,
    pub bin: String,
    pub address: String,
    pub report_data: PropertyData,
    pub compliance_score: u8,
    pub risk_level: RiskLevel,
}

impl NewSavedReport {
    /// Copy the scored values onto the property snapshot they were computed from.
    pub fn from_score(user_id: UserId, property: PropertyData, score: &ComplianceScore) -> Self {
        Self {
            user_id,
            bin: property.bin.trim().to_string(),
            address: property.address.trim().to_string(),
            report_data: property,
            compliance_score: score.overall,
            risk_level: score.risk_level,
        }
    }
}

/// Lightweight listing row so collections don't ship every violation record.
#[derive(Debug, Clone, Serialize)]
pub struct SavedReportSummary {
    pub id: ReportId,
    pub bin: String,
    pub address: String,
    pub compliance_score: u8,
    pub risk_level: RiskLevel,
    pub created_at: DateTime<Utc>,
}

impl From<&SavedReport> for SavedReportSummary {
    fn from(report: &SavedReport) -> Self {
        Self {
            id: report.id.clone(),
            bin: report.bin.clone(),
            address: report.address.clone(),
            compliance_score: report.compliance_score,
            risk_level: report.risk_level,
            created_at: report.created_at,
        }
    }
}

/// Persistence collaborator; implementations own access-control and id assignment.
pub trait ReportStore: Send + Sync {
    fn save(&self, report: NewSavedReport) -> Result<SavedReport, ReportStoreError>;
    fn fetch(&self, id: &ReportId) -> Result<Option<SavedReport>, ReportStoreError>;
    fn list_for_user(&self, user_id: &UserId) -> Result<Vec<SavedReport>, ReportStoreError>;
}

/// Error enumeration for store failures.
#[derive(Debug, thiserror::Error)]
pub enum ReportStoreError {
    #[error("report rejected by store policy: {0}")]
    Rejected(String),
    #[error("report store unavailable: {0}")]
    Unavailable(String),
}
