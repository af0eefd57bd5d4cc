use crate::infra::{InMemoryReportStore, StaticAuthService};
use building_compliance::config::{load_scoring_policy, ConfigError};
use building_compliance::error::AppError;
use building_compliance::importers::{ImportSources, PropertyImporter};
use building_compliance::reports::{AuthStateNotifier, ReportService, ReportServiceError};
use building_compliance::scoring::{DobViolation, EcbViolation, HpdViolation, Permit};
use building_compliance::{ComplianceEngine, ComplianceScore, PropertyData};
use chrono::{Duration, Local, NaiveDate};
use clap::Args;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Args, Debug)]
pub(crate) struct ScoreArgs {
    /// JSON file holding a single property snapshot
    #[arg(long)]
    pub(crate) input: PathBuf,
    /// Evaluation date (YYYY-MM-DD). Defaults to today.
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) as_of: Option<NaiveDate>,
    /// Print the score as JSON instead of a text report
    #[arg(long)]
    pub(crate) json: bool,
}

#[derive(Args, Debug)]
pub(crate) struct ImportArgs {
    /// Building identification number to import
    #[arg(long)]
    pub(crate) bin: String,
    /// Borough name, abbreviation or code
    #[arg(long)]
    pub(crate) borough: String,
    /// Street address shown on the report
    #[arg(long)]
    pub(crate) address: Option<String>,
    /// DOB violations CSV export
    #[arg(long)]
    pub(crate) dob: Option<PathBuf>,
    /// ECB violations CSV export
    #[arg(long)]
    pub(crate) ecb: Option<PathBuf>,
    /// HPD violations CSV export
    #[arg(long)]
    pub(crate) hpd: Option<PathBuf>,
    /// DOB permit filings CSV export
    #[arg(long)]
    pub(crate) permits: Option<PathBuf>,
    /// Evaluation date (YYYY-MM-DD). Defaults to today.
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) as_of: Option<NaiveDate>,
    /// Print the score as JSON instead of a text report
    #[arg(long)]
    pub(crate) json: bool,
}

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Evaluation date (YYYY-MM-DD). Defaults to today.
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) as_of: Option<NaiveDate>,
    /// Skip the saved report portion of the demo.
    #[arg(long)]
    pub(crate) skip_reports: bool,
}

pub(crate) fn run_score(args: ScoreArgs) -> Result<(), AppError> {
    let ScoreArgs {
        input,
        as_of,
        json,
    } = args;

    let raw = std::fs::read_to_string(&input)?;
    let property: PropertyData = serde_json::from_str(&raw)?;
    let as_of = as_of.unwrap_or_else(|| Local::now().date_naive());

    let score = configured_engine()?.score(&property, as_of)?;
    print_score(&property, &score, as_of, json)
}

pub(crate) fn run_import(args: ImportArgs) -> Result<(), AppError> {
    let ImportArgs {
        bin,
        borough,
        address,
        dob,
        ecb,
        hpd,
        permits,
        as_of,
        json,
    } = args;

    let mut importer = PropertyImporter::new(bin, borough);
    if let Some(address) = address {
        importer = importer.with_address(address);
    }
    let property = importer.import(&ImportSources {
        dob_violations: dob,
        ecb_violations: ecb,
        hpd_violations: hpd,
        permits,
    })?;

    let as_of = as_of.unwrap_or_else(|| Local::now().date_naive());
    let score = configured_engine()?.score(&property, as_of)?;
    print_score(&property, &score, as_of, json)
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        as_of,
        skip_reports,
    } = args;
    let as_of = as_of.unwrap_or_else(|| Local::now().date_naive());

    println!("Building compliance demo");
    let property = demo_property(as_of);
    let engine = ComplianceEngine::default();
    let score = engine.score(&property, as_of)?;
    render_score(&property, &score, as_of);

    if skip_reports {
        return Ok(());
    }

    println!("\nSaved report demo");
    let auth = StaticAuthService::parse("demo-token:demo-user", AuthStateNotifier::new());
    let store = Arc::new(InMemoryReportStore::default());
    let service = ReportService::new(engine, Arc::new(auth), store);

    match service.save_report(None, property.clone(), as_of) {
        Err(ReportServiceError::Unauthenticated) => {
            println!("- Anonymous save rejected: sign in required")
        }
        Err(err) => println!("- Anonymous save failed: {}", err),
        Ok(_) => println!("- Anonymous save unexpectedly accepted"),
    }

    let (saved, _) = match service.save_report(Some("demo-token"), property, as_of) {
        Ok(saved) => saved,
        Err(err) => {
            println!("- Save unavailable: {}", err);
            return Ok(());
        }
    };
    println!(
        "- Saved report {} for BIN {} (score {}, {} risk)",
        saved.id,
        saved.bin,
        saved.compliance_score,
        saved.risk_level.label()
    );

    match service.list_reports(Some("demo-token")) {
        Ok(reports) => println!("- demo-user has {} saved report(s)", reports.len()),
        Err(err) => println!("- Report listing unavailable: {}", err),
    }

    Ok(())
}

fn configured_engine() -> Result<ComplianceEngine, AppError> {
    let policy = load_scoring_policy()?;
    ComplianceEngine::new(policy)
        .map_err(ConfigError::Scoring)
        .map_err(AppError::from)
}

fn print_score(
    property: &PropertyData,
    score: &ComplianceScore,
    as_of: NaiveDate,
    json: bool,
) -> Result<(), AppError> {
    if json {
        println!("{}", serde_json::to_string_pretty(score)?);
    } else {
        render_score(property, score, as_of);
    }
    Ok(())
}

pub(crate) fn render_score(property: &PropertyData, score: &ComplianceScore, as_of: NaiveDate) {
    let address = if property.address.trim().is_empty() {
        "(no address on file)"
    } else {
        property.address.trim()
    };
    println!(
        "BIN {} | {} | {} (evaluated {})",
        property.bin.trim(),
        address,
        property.borough.trim(),
        as_of
    );
    println!(
        "Records: {} DOB, {} ECB, {} HPD, {} permits",
        property.dob_violations.len(),
        property.ecb_violations.len(),
        property.hpd_violations.len(),
        property.permits.len()
    );

    println!("\nCategory scores");
    for category in &score.categories {
        println!(
            "- {}: {}/100 (weight {:.0}%) {}",
            category.category.label(),
            category.score,
            category.weight * 100.0,
            category.details
        );
    }

    println!(
        "\nOverall compliance score: {}/100 ({} risk, {})",
        score.overall,
        score.risk_level.label(),
        score.color
    );
}

fn demo_property(as_of: NaiveDate) -> PropertyData {
    let days_ago = |days: i64| (as_of - Duration::days(days)).format("%Y-%m-%d").to_string();

    let mut property = PropertyData::new("1012345", "MANHATTAN");
    property.address = "100 Broadway".to_string();
    property.block = "00047".to_string();
    property.lot = "0007".to_string();
    property.dob_violations = vec![
        DobViolation {
            violation_number: Some("0105/24".to_string()),
            violation_type: Some("LL6291-LOCAL LAW 62/91 - BOILERS".to_string()),
            violation_category: Some("V-DOB VIOLATION - ACTIVE".to_string()),
            issue_date: Some(days_ago(120)),
            ..DobViolation::default()
        },
        DobViolation {
            violation_number: Some("0210/19".to_string()),
            violation_category: Some("V*-DOB VIOLATION - DISMISSED".to_string()),
            violation_type: Some("IMMEDIATELY HAZARDOUS".to_string()),
            issue_date: Some(days_ago(2200)),
            ..DobViolation::default()
        },
    ];
    property.ecb_violations = vec![EcbViolation {
        ecb_violation_number: Some("35012345X".to_string()),
        ecb_violation_status: Some("ACTIVE".to_string()),
        severity: Some("CLASS - 2".to_string()),
        issue_date: Some(days_ago(700)),
        balance_due: Some(1250.0),
        ..EcbViolation::default()
    }];
    property.hpd_violations = vec![
        HpdViolation {
            violation_id: Some("14022931".to_string()),
            class: Some("C".to_string()),
            violationstatus: Some("Open".to_string()),
            novissueddate: Some(days_ago(12)),
            novdescription: Some("ABATE THE NUISANCE CONSISTING OF MOLD".to_string()),
            ..HpdViolation::default()
        },
        HpdViolation {
            violation_id: Some("13877410".to_string()),
            class: Some("B".to_string()),
            violationstatus: Some("Close".to_string()),
            novissueddate: Some(days_ago(400)),
            certifieddate: Some(days_ago(380)),
            ..HpdViolation::default()
        },
    ];
    property.permits = vec![
        Permit {
            job_number: Some("121234567".to_string()),
            job_type: Some("A2".to_string()),
            permit_status: Some("ISSUED".to_string()),
            filing_date: Some(days_ago(90)),
            ..Permit::default()
        },
        Permit {
            job_number: Some("121234999".to_string()),
            job_type: Some("A3".to_string()),
            filing_status: Some("IN PROCESS".to_string()),
            filing_date: Some(days_ago(240)),
            ..Permit::default()
        },
    ];
    property
}
