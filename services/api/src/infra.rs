use building_compliance::reports::{
    AuthError, AuthEvent, AuthService, AuthStateNotifier, NewSavedReport, ReportId, ReportStore,
    ReportStoreError, Role, SavedReport, Session, UserId,
};
use building_compliance::ComplianceEngine;
use chrono::{NaiveDate, Utc};
use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
    pub(crate) engine: Arc<ComplianceEngine>,
}

#[derive(Default)]
pub(crate) struct InMemoryReportStore {
    records: Mutex<BTreeMap<ReportId, SavedReport>>,
    sequence: AtomicU64,
}

impl ReportStore for InMemoryReportStore {
    fn save(&self, report: NewSavedReport) -> Result<SavedReport, ReportStoreError> {
        if report.bin.is_empty() {
            return Err(ReportStoreError::Rejected("bin is required".to_string()));
        }

        let id = self.sequence.fetch_add(1, Ordering::Relaxed) + 1;
        let saved = SavedReport {
            id: ReportId(format!("rpt-{id:06}")),
            user_id: report.user_id,
            bin: report.bin,
            address: report.address,
            report_data: report.report_data,
            compliance_score: report.compliance_score,
            risk_level: report.risk_level,
            created_at: Utc::now(),
        };

        let mut guard = self.records.lock().expect("report mutex poisoned");
        guard.insert(saved.id.clone(), saved.clone());
        Ok(saved)
    }

    fn fetch(&self, id: &ReportId) -> Result<Option<SavedReport>, ReportStoreError> {
        let guard = self.records.lock().expect("report mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn list_for_user(&self, user_id: &UserId) -> Result<Vec<SavedReport>, ReportStoreError> {
        let guard = self.records.lock().expect("report mutex poisoned");
        Ok(guard
            .values()
            .filter(|report| &report.user_id == user_id)
            .cloned()
            .collect())
    }
}

/// Token table standing in for the hosted auth backend, configured through
/// `AUTH_STATIC_TOKENS="token:user[:role],..."`.
pub(crate) struct StaticAuthService {
    sessions: HashMap<String, Session>,
    roles: HashMap<UserId, Vec<Role>>,
    signed_in: Mutex<HashSet<String>>,
    notifier: AuthStateNotifier,
}

impl StaticAuthService {
    pub(crate) fn from_env(notifier: AuthStateNotifier) -> Self {
        let raw = std::env::var("AUTH_STATIC_TOKENS").unwrap_or_default();
        Self::parse(&raw, notifier)
    }

    pub(crate) fn parse(raw: &str, notifier: AuthStateNotifier) -> Self {
        let mut sessions = HashMap::new();
        let mut roles: HashMap<UserId, Vec<Role>> = HashMap::new();

        for entry in raw.split(',').map(str::trim).filter(|entry| !entry.is_empty()) {
            let mut parts = entry.split(':').map(str::trim);
            let (Some(token), Some(user)) = (parts.next(), parts.next()) else {
                continue;
            };
            if token.is_empty() || user.is_empty() {
                continue;
            }

            let role = match parts.next() {
                Some("admin") => Some(Role::Admin),
                Some("guest") => None,
                _ => Some(Role::Member),
            };

            let user_id = UserId(user.to_string());
            let granted = roles.entry(user_id.clone()).or_default();
            if let Some(role) = role {
                granted.push(role);
                if role == Role::Admin {
                    granted.push(Role::Member);
                }
            }
            sessions.insert(
                token.to_string(),
                Session {
                    user_id,
                    email: None,
                },
            );
        }

        Self {
            sessions,
            roles,
            signed_in: Mutex::new(HashSet::new()),
            notifier,
        }
    }
}

impl AuthService for StaticAuthService {
    fn get_session(&self, token: &str) -> Result<Option<Session>, AuthError> {
        let Some(session) = self.sessions.get(token).cloned() else {
            return Ok(None);
        };

        let first_use = self
            .signed_in
            .lock()
            .expect("sign-in mutex poisoned")
            .insert(token.to_string());
        if first_use {
            self.notifier.publish(&AuthEvent::SignedIn(session.clone()));
        }
        Ok(Some(session))
    }

    fn has_role(&self, user_id: &UserId, role: Role) -> Result<bool, AuthError> {
        Ok(self
            .roles
            .get(user_id)
            .map(|granted| granted.contains(&role))
            .unwrap_or(false))
    }
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use building_compliance::scoring::RiskLevel;

    #[test]
    fn static_auth_parses_tokens_and_roles() {
        let auth = StaticAuthService::parse(
            "alpha:user-1, beta:user-2:admin, gamma:user-3:guest, broken, :user-4",
            AuthStateNotifier::new(),
        );

        let alpha = auth.get_session("alpha").expect("lookup").expect("session");
        assert_eq!(alpha.user_id.0, "user-1");
        assert!(auth.has_role(&alpha.user_id, Role::Member).expect("roles"));
        assert!(!auth.has_role(&alpha.user_id, Role::Admin).expect("roles"));

        let beta = auth.get_session("beta").expect("lookup").expect("session");
        assert!(auth.has_role(&beta.user_id, Role::Member).expect("roles"));
        assert!(auth.has_role(&beta.user_id, Role::Admin).expect("roles"));

        let gamma = auth.get_session("gamma").expect("lookup").expect("session");
        assert!(!auth.has_role(&gamma.user_id, Role::Member).expect("roles"));

        assert!(auth.get_session("broken").expect("lookup").is_none());
        assert!(auth.get_session("").expect("lookup").is_none());
    }

    #[test]
    fn static_auth_announces_each_token_sign_in_once() {
        let notifier = AuthStateNotifier::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let _subscription = {
            let seen = seen.clone();
            notifier.subscribe(move |event| {
                if let AuthEvent::SignedIn(session) = event {
                    seen.lock().expect("seen mutex").push(session.user_id.0.clone());
                }
            })
        };

        let auth = StaticAuthService::parse("alpha:user-1, beta:user-2", notifier);
        for _ in 0..3 {
            auth.get_session("alpha").expect("lookup");
        }
        auth.get_session("nope").expect("lookup");
        auth.get_session("beta").expect("lookup");
        auth.get_session("beta").expect("lookup");

        assert_eq!(
            *seen.lock().expect("seen mutex"),
            vec!["user-1".to_string(), "user-2".to_string()]
        );
    }

    #[test]
    fn in_memory_store_assigns_ids_and_scopes_by_user() {
        let store = InMemoryReportStore::default();
        let record = NewSavedReport {
            user_id: UserId("user-1".to_string()),
            bin: "1012345".to_string(),
            address: "100 Broadway".to_string(),
            report_data: building_compliance::PropertyData::new("1012345", "MANHATTAN"),
            compliance_score: 88,
            risk_level: RiskLevel::Low,
        };

        let saved = store.save(record.clone()).expect("saved");
        assert_eq!(saved.id.0, "rpt-000001");
        assert_eq!(store.fetch(&saved.id).expect("fetch"), Some(saved.clone()));
        assert_eq!(
            store
                .list_for_user(&UserId("user-1".to_string()))
                .expect("list")
                .len(),
            1
        );
        assert!(store
            .list_for_user(&UserId("user-2".to_string()))
            .expect("list")
            .is_empty());

        let mut nameless = record;
        nameless.bin.clear();
        assert!(matches!(
            store.save(nameless),
            Err(ReportStoreError::Rejected(_))
        ));
    }
}
