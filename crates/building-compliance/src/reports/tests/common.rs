use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use axum::response::Response;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde_json::Value;

use crate::reports::auth::{AuthError, AuthService, Role, Session, UserId};
use crate::reports::service::ReportService;
use crate::reports::store::{
    NewSavedReport, ReportId, ReportStore, ReportStoreError, SavedReport,
};
use crate::scoring::{ComplianceEngine, HpdViolation, PropertyData};

pub(super) const MEMBER_TOKEN: &str = "token-member";
pub(super) const OTHER_MEMBER_TOKEN: &str = "token-other";
pub(super) const GUEST_TOKEN: &str = "token-guest";

pub(super) fn as_of() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 6, 1).expect("valid date")
}

pub(super) fn property() -> PropertyData {
    let mut property = PropertyData::new("1012345", "MANHATTAN");
    property.address = "100 Broadway".to_string();
    property.block = "00047".to_string();
    property.lot = "0007".to_string();
    property.hpd_violations.push(HpdViolation {
        violation_id: Some("14022931".to_string()),
        class: Some("C".to_string()),
        violationstatus: Some("Open".to_string()),
        novissueddate: Some("2025-05-10".to_string()),
        ..HpdViolation::default()
    });
    property
}

#[derive(Default)]
pub(super) struct MemoryStore {
    records: Mutex<Vec<SavedReport>>,
    sequence: AtomicU64,
}

impl MemoryStore {
    pub(super) fn saved(&self) -> Vec<SavedReport> {
        self.records.lock().expect("store mutex poisoned").clone()
    }
}

impl ReportStore for MemoryStore {
    fn save(&self, report: NewSavedReport) -> Result<SavedReport, ReportStoreError> {
        let sequence = self.sequence.fetch_add(1, Ordering::Relaxed) + 1;
        let base = DateTime::<Utc>::from_timestamp(1_748_736_000, 0).expect("valid timestamp");
        let saved = SavedReport {
            id: ReportId(format!("rpt-{sequence:04}")),
            user_id: report.user_id,
            bin: report.bin,
            address: report.address,
            report_data: report.report_data,
            compliance_score: report.compliance_score,
            risk_level: report.risk_level,
            created_at: base + Duration::minutes(sequence as i64),
        };
        self.records
            .lock()
            .expect("store mutex poisoned")
            .push(saved.clone());
        Ok(saved)
    }

    fn fetch(&self, id: &ReportId) -> Result<Option<SavedReport>, ReportStoreError> {
        let guard = self.records.lock().expect("store mutex poisoned");
        Ok(guard.iter().find(|report| &report.id == id).cloned())
    }

    fn list_for_user(&self, user_id: &UserId) -> Result<Vec<SavedReport>, ReportStoreError> {
        let guard = self.records.lock().expect("store mutex poisoned");
        Ok(guard
            .iter()
            .filter(|report| &report.user_id == user_id)
            .cloned()
            .collect())
    }
}

pub(super) struct UnavailableStore;

impl ReportStore for UnavailableStore {
    fn save(&self, _report: NewSavedReport) -> Result<SavedReport, ReportStoreError> {
        Err(ReportStoreError::Unavailable("database offline".to_string()))
    }

    fn fetch(&self, _id: &ReportId) -> Result<Option<SavedReport>, ReportStoreError> {
        Err(ReportStoreError::Unavailable("database offline".to_string()))
    }

    fn list_for_user(&self, _user_id: &UserId) -> Result<Vec<SavedReport>, ReportStoreError> {
        Err(ReportStoreError::Unavailable("database offline".to_string()))
    }
}

pub(super) struct RejectingStore;

impl ReportStore for RejectingStore {
    fn save(&self, _report: NewSavedReport) -> Result<SavedReport, ReportStoreError> {
        Err(ReportStoreError::Rejected("quota exceeded".to_string()))
    }

    fn fetch(&self, _id: &ReportId) -> Result<Option<SavedReport>, ReportStoreError> {
        Ok(None)
    }

    fn list_for_user(&self, _user_id: &UserId) -> Result<Vec<SavedReport>, ReportStoreError> {
        Ok(Vec::new())
    }
}

pub(super) struct StaticAuth {
    sessions: HashMap<String, Session>,
    members: HashSet<UserId>,
}

impl Default for StaticAuth {
    fn default() -> Self {
        let mut sessions = HashMap::new();
        let mut members = HashSet::new();
        for (token, user, member) in [
            (MEMBER_TOKEN, "user-1", true),
            (OTHER_MEMBER_TOKEN, "user-2", true),
            (GUEST_TOKEN, "user-3", false),
        ] {
            let user_id = UserId(user.to_string());
            if member {
                members.insert(user_id.clone());
            }
            sessions.insert(
                token.to_string(),
                Session {
                    user_id,
                    email: Some(format!("{user}@example.com")),
                },
            );
        }
        Self { sessions, members }
    }
}

impl AuthService for StaticAuth {
    fn get_session(&self, token: &str) -> Result<Option<Session>, AuthError> {
        Ok(self.sessions.get(token).cloned())
    }

    fn has_role(&self, user_id: &UserId, role: Role) -> Result<bool, AuthError> {
        Ok(role == Role::Member && self.members.contains(user_id))
    }
}

pub(super) struct OfflineAuth;

impl AuthService for OfflineAuth {
    fn get_session(&self, _token: &str) -> Result<Option<Session>, AuthError> {
        Err(AuthError::Unavailable("auth provider timeout".to_string()))
    }

    fn has_role(&self, _user_id: &UserId, _role: Role) -> Result<bool, AuthError> {
        Err(AuthError::Unavailable("auth provider timeout".to_string()))
    }
}

pub(super) fn build_service() -> (
    Arc<ReportService<StaticAuth, MemoryStore>>,
    Arc<MemoryStore>,
) {
    let store = Arc::new(MemoryStore::default());
    let service = ReportService::new(
        ComplianceEngine::default(),
        Arc::new(StaticAuth::default()),
        store.clone(),
    );
    (Arc::new(service), store)
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
