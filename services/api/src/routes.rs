use crate::infra::AppState;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use building_compliance::error::AppError;
use building_compliance::importers::PropertyImporter;
use building_compliance::reports::{report_router, AuthService, ReportService, ReportStore};
use building_compliance::{ComplianceScore, PropertyData};
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::io::Cursor;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub(crate) struct ScoreRequest {
    pub(crate) property: PropertyData,
    #[serde(default)]
    pub(crate) as_of: Option<NaiveDate>,
    /// Raw Open Data CSV exports; each one present replaces the matching list on `property`.
    #[serde(default)]
    pub(crate) exports: Option<RegistryExports>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct RegistryExports {
    #[serde(default)]
    pub(crate) dob_csv: Option<String>,
    #[serde(default)]
    pub(crate) ecb_csv: Option<String>,
    #[serde(default)]
    pub(crate) hpd_csv: Option<String>,
    #[serde(default)]
    pub(crate) permits_csv: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct ScoreResponse {
    pub(crate) bin: String,
    pub(crate) as_of: NaiveDate,
    pub(crate) data_source: DataSource,
    #[serde(flatten)]
    pub(crate) score: ComplianceScore,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum DataSource {
    OpenDataExport,
    Payload,
}

pub(crate) fn with_service_routes<A, S>(service: Arc<ReportService<A, S>>) -> axum::Router
where
    A: AuthService + 'static,
    S: ReportStore + 'static,
{
    report_router(service)
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
        .route(
            "/api/v1/compliance/score",
            axum::routing::post(score_endpoint),
        )
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

pub(crate) async fn score_endpoint(
    Extension(state): Extension<AppState>,
    Json(payload): Json<ScoreRequest>,
) -> Result<Json<ScoreResponse>, AppError> {
    let ScoreRequest {
        mut property,
        as_of,
        exports,
    } = payload;

    let data_source = match exports {
        Some(exports) => {
            apply_exports(&mut property, exports)?;
            DataSource::OpenDataExport
        }
        None => DataSource::Payload,
    };

    let as_of = as_of.unwrap_or_else(|| Local::now().date_naive());
    let score = state.engine.score(&property, as_of)?;

    Ok(Json(ScoreResponse {
        bin: property.bin,
        as_of,
        data_source,
        score,
    }))
}

fn apply_exports(property: &mut PropertyData, exports: RegistryExports) -> Result<(), AppError> {
    let importer = PropertyImporter::new(property.bin.clone(), property.borough.clone());

    if let Some(csv) = exports.dob_csv {
        property.dob_violations = importer.read(Cursor::new(csv.into_bytes()))?;
    }
    if let Some(csv) = exports.ecb_csv {
        property.ecb_violations = importer.read(Cursor::new(csv.into_bytes()))?;
    }
    if let Some(csv) = exports.hpd_csv {
        property.hpd_violations = importer.read(Cursor::new(csv.into_bytes()))?;
    }
    if let Some(csv) = exports.permits_csv {
        property.permits = importer.read(Cursor::new(csv.into_bytes()))?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::{InMemoryReportStore, StaticAuthService};
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use building_compliance::reports::AuthStateNotifier;
    use building_compliance::scoring::{ComplianceCategory, HpdViolation, RiskLevel};
    use building_compliance::ComplianceEngine;
    use metrics_exporter_prometheus::PrometheusBuilder;
    use std::sync::atomic::AtomicBool;
    use tower::ServiceExt;

    fn app_state(ready: bool) -> AppState {
        let recorder = PrometheusBuilder::new().build_recorder();
        AppState {
            readiness: Arc::new(AtomicBool::new(ready)),
            metrics: Arc::new(recorder.handle()),
            engine: Arc::new(ComplianceEngine::default()),
        }
    }

    fn as_of() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 1).expect("valid date")
    }

    fn app(ready: bool) -> axum::Router {
        let auth = StaticAuthService::parse("member-token:user-1", AuthStateNotifier::new());
        let service = Arc::new(ReportService::new(
            ComplianceEngine::default(),
            Arc::new(auth),
            Arc::new(InMemoryReportStore::default()),
        ));
        with_service_routes(service).layer(Extension(app_state(ready)))
    }

    async fn read_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        serde_json::from_slice(&bytes).expect("json body")
    }

    #[tokio::test]
    async fn score_endpoint_scores_payload_property() {
        let mut property = PropertyData::new("1012345", "MANHATTAN");
        property.hpd_violations.push(HpdViolation {
            class: Some("C".to_string()),
            violationstatus: Some("Open".to_string()),
            novissueddate: Some("2025-05-10".to_string()),
            ..HpdViolation::default()
        });
        let request = ScoreRequest {
            property,
            as_of: Some(as_of()),
            exports: None,
        };

        let Json(body) = score_endpoint(Extension(app_state(true)), Json(request))
            .await
            .expect("scores");

        assert_eq!(body.data_source, DataSource::Payload);
        assert_eq!(body.as_of, as_of());
        assert_eq!(body.score.risk_level, RiskLevel::Low);
        assert!(
            body.score
                .category(ComplianceCategory::HpdViolations)
                .expect("hpd")
                .score
                < 100
        );
    }

    #[tokio::test]
    async fn score_endpoint_reads_uploaded_exports() {
        let request = ScoreRequest {
            property: PropertyData::new("1012345", "MN"),
            as_of: Some(as_of()),
            exports: Some(RegistryExports {
                dob_csv: Some(
                    "BIN,ISSUE_DATE,VIOLATION_CATEGORY,VIOLATION_TYPE\n\
1012345,20250401,V-DOB VIOLATION - ACTIVE,IMMEDIATELY HAZARDOUS\n\
3000001,20250401,V-DOB VIOLATION - ACTIVE,IMMEDIATELY HAZARDOUS\n"
                        .to_string(),
                ),
                ..RegistryExports::default()
            }),
        };

        let Json(body) = score_endpoint(Extension(app_state(true)), Json(request))
            .await
            .expect("scores");

        assert_eq!(body.data_source, DataSource::OpenDataExport);
        assert_eq!(
            body.score
                .category(ComplianceCategory::DobViolations)
                .expect("dob")
                .details,
            "1 open (1 hazardous), 0 closed"
        );
    }

    #[tokio::test]
    async fn score_route_rejects_malformed_bin() {
        let payload = json!({
            "property": { "bin": "12", "borough": "BROOKLYN" },
            "as_of": "2025-06-01"
        });
        let response = app(true)
            .oneshot(
                Request::post("/api/v1/compliance/score")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(payload.to_string()))
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body = read_json(response).await;
        assert!(body["error"]
            .as_str()
            .expect("error message")
            .contains("7 digit"));
    }

    #[tokio::test]
    async fn readiness_reflects_startup_state() {
        let response = app(false)
            .oneshot(Request::get("/ready").body(Body::empty()).expect("request"))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        let response = app(true)
            .oneshot(Request::get("/health").body(Body::empty()).expect("request"))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(read_json(response).await["status"], "ok");
    }

    #[tokio::test]
    async fn report_routes_are_mounted_alongside_scoring() {
        let response = app(true)
            .oneshot(
                Request::get("/api/v1/reports")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
