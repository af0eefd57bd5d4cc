use crate::cli::ServeArgs;
use crate::infra::{AppState, InMemoryReportStore, StaticAuthService};
use crate::routes::with_service_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use building_compliance::config::{AppConfig, ConfigError};
use building_compliance::error::AppError;
use building_compliance::reports::{AuthEvent, AuthStateNotifier, ReportService};
use building_compliance::telemetry;
use building_compliance::ComplianceEngine;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::{debug, info};

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry, config.environment)?;

    let engine = ComplianceEngine::new(config.scoring.clone()).map_err(ConfigError::Scoring)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
        engine: Arc::new(engine.clone()),
    };

    let notifier = AuthStateNotifier::new();
    let _auth_log = notifier.subscribe(|event| match event {
        AuthEvent::SignedIn(session) => debug!(user = %session.user_id.0, "signed in"),
        AuthEvent::SignedOut(user_id) => debug!(user = %user_id.0, "session ended"),
        AuthEvent::RolesChanged(user_id) => debug!(user = %user_id.0, "roles changed"),
    });

    let auth = Arc::new(StaticAuthService::from_env(notifier));
    let store = Arc::new(InMemoryReportStore::default());
    let report_service = Arc::new(ReportService::new(engine, auth, store));

    let app = with_service_routes(report_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "compliance scoring service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
