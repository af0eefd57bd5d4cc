use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{info, warn};

use super::auth::{AuthError, AuthService, Role, Session};
use super::store::{NewSavedReport, ReportId, ReportStore, ReportStoreError, SavedReport};
use crate::scoring::{ComplianceEngine, ComplianceScore, PropertyData, PropertyValidationError};

/// Service composing the scoring engine with the auth and persistence collaborators.
pub struct ReportService<A, S> {
    engine: Arc<ComplianceEngine>,
    auth: Arc<A>,
    store: Arc<S>,
}

impl<A, S> ReportService<A, S>
where
    A: AuthService + 'static,
    S: ReportStore + 'static,
{
    pub fn new(engine: ComplianceEngine, auth: Arc<A>, store: Arc<S>) -> Self {
        Self {
            engine: Arc::new(engine),
            auth,
            store,
        }
    }

    pub fn engine(&self) -> &ComplianceEngine {
        &self.engine
    }

    /// Score without persisting; open to anonymous callers.
    pub fn preview(
        &self,
        property: &PropertyData,
        as_of: NaiveDate,
    ) -> Result<ComplianceScore, ReportServiceError> {
        Ok(self.engine.score(property, as_of)?)
    }

    /// Score and persist a report for the signed-in caller.
    pub fn save_report(
        &self,
        token: Option<&str>,
        property: PropertyData,
        as_of: NaiveDate,
    ) -> Result<(SavedReport, ComplianceScore), ReportServiceError> {
        let session = self.authorize(token, Role::Member)?;
        let score = self.engine.score(&property, as_of)?;

        let record = NewSavedReport::from_score(session.user_id.clone(), property, &score);
        let saved = self.store.save(record)?;

        info!(
            report_id = %saved.id.0,
            bin = %saved.bin,
            score = saved.compliance_score,
            risk = %saved.risk_level,
            "saved compliance report"
        );

        Ok((saved, score))
    }

    /// Fetch one of the caller's reports. Reports owned by other users read as missing.
    pub fn get_report(
        &self,
        token: Option<&str>,
        id: &ReportId,
    ) -> Result<SavedReport, ReportServiceError> {
        let session = self.authorize(token, Role::Member)?;
        match self.store.fetch(id)? {
            Some(report) if report.user_id == session.user_id => Ok(report),
            _ => Err(ReportServiceError::NotFound(id.clone())),
        }
    }

    /// Caller's reports, newest first.
    pub fn list_reports(
        &self,
        token: Option<&str>,
    ) -> Result<Vec<SavedReport>, ReportServiceError> {
        let session = self.authorize(token, Role::Member)?;
        let mut reports = self.store.list_for_user(&session.user_id)?;
        reports.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));
        Ok(reports)
    }

    fn authorize(&self, token: Option<&str>, role: Role) -> Result<Session, ReportServiceError> {
        let token = token
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or(ReportServiceError::Unauthenticated)?;

        let session = self
            .auth
            .get_session(token)?
            .ok_or(ReportServiceError::Unauthenticated)?;

        if !self.auth.has_role(&session.user_id, role)? {
            warn!(user = %session.user_id.0, role = role.label(), "report access denied");
            return Err(ReportServiceError::Forbidden(role));
        }

        Ok(session)
    }
}

/// Error raised by the report service.
#[derive(Debug, thiserror::Error)]
pub enum ReportServiceError {
    #[error("sign in to save reports")]
    Unauthenticated,
    #[error("the {0} role is required")]
    Forbidden(Role),
    #[error("report {0} not found")]
    NotFound(ReportId),
    #[error(transparent)]
    Validation(#[from] PropertyValidationError),
    #[error(transparent)]
    Store(#[from] ReportStoreError),
    #[error(transparent)]
    Auth(#[from] AuthError),
}
