//! Saved compliance reports and the auth/persistence seams they depend on.
//!
//! Authentication and storage live in a hosted backend; this module only talks to them
//! through the [`AuthService`] and [`ReportStore`] capabilities so any concrete client can
//! be substituted.

pub mod auth;
pub mod router;
pub mod service;
pub mod store;

#[cfg(test)]
mod tests;

pub use auth::{
    AuthError, AuthEvent, AuthService, AuthStateNotifier, Role, Session, Subscription, UserId,
};
pub use router::{report_router, SaveReportRequest};
pub use service::{ReportService, ReportServiceError};
pub use store::{
    NewSavedReport, ReportId, ReportStore, ReportStoreError, SavedReport, SavedReportSummary,
};
