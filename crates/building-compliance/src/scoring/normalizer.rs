use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use super::domain::{
    ComplianceCategory, DobViolation, EcbViolation, HpdViolation, Permit, PropertyData,
};
use super::policy::ScoringPolicy;

/// Severity bucket shared by every violation source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeverityTier {
    Low,
    Moderate,
    High,
}

/// Violation reduced to what the scorers need.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedViolation {
    pub category: ComplianceCategory,
    pub is_open: bool,
    pub severity: SeverityTier,
    pub severity_weight: f64,
    pub age_days: Option<i64>,
}

/// Lifecycle bucket for a permit or job filing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PermitState {
    Completed,
    InProcess,
    Disapproved,
}

/// Permit counts; permits are not violations and only feed the completion ratio.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PermitSummary {
    pub total: usize,
    pub completed: usize,
    pub in_process: usize,
    pub disapproved: usize,
    pub stale: usize,
}

impl PermitSummary {
    pub fn completion_ratio(&self) -> f64 {
        if self.total == 0 {
            1.0
        } else {
            self.completed as f64 / self.total as f64
        }
    }
}

/// Violations grouped per category, tagged with open state and severity weight.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NormalizedViolations {
    pub dob: Vec<NormalizedViolation>,
    pub ecb: Vec<NormalizedViolation>,
    pub hpd: Vec<NormalizedViolation>,
    pub permits: PermitSummary,
}

impl NormalizedViolations {
    pub fn for_category(&self, category: ComplianceCategory) -> &[NormalizedViolation] {
        match category {
            ComplianceCategory::DobViolations => &self.dob,
            ComplianceCategory::EcbPenalties => &self.ecb,
            ComplianceCategory::HpdViolations => &self.hpd,
            ComplianceCategory::PermitCompliance => &[],
        }
    }
}

/// Convert raw registry records into the common severity-bearing shape. Never fails.
pub fn normalize(
    property: &PropertyData,
    as_of: NaiveDate,
    policy: &ScoringPolicy,
) -> NormalizedViolations {
    let tag = |category, is_open, severity, date: Option<&str>| NormalizedViolation {
        category,
        is_open,
        severity,
        severity_weight: policy.penalties.for_tier(severity),
        age_days: age_in_days(date, as_of),
    };

    let dob = property
        .dob_violations
        .iter()
        .map(|violation| {
            tag(
                ComplianceCategory::DobViolations,
                dob_is_open(violation),
                dob_severity(violation),
                violation.issue_date.as_deref(),
            )
        })
        .collect();

    let ecb = property
        .ecb_violations
        .iter()
        .map(|violation| {
            tag(
                ComplianceCategory::EcbPenalties,
                ecb_is_open(violation),
                text_severity(violation.severity.as_deref()),
                violation.issue_date.as_deref(),
            )
        })
        .collect();

    let hpd = property
        .hpd_violations
        .iter()
        .map(|violation| {
            tag(
                ComplianceCategory::HpdViolations,
                hpd_is_open(violation),
                hpd_severity(violation),
                violation
                    .novissueddate
                    .as_deref()
                    .or(violation.inspectiondate.as_deref()),
            )
        })
        .collect();

    let permits = summarize_permits(&property.permits, as_of, policy.stale_permit_days);

    NormalizedViolations {
        dob,
        ecb,
        hpd,
        permits,
    }
}

fn dob_is_open(violation: &DobViolation) -> bool {
    if violation.violation_date_closed.is_some() {
        return false;
    }

    const TERMINAL: [&str; 4] = ["CLOSED", "DISMISSED", "RESOLVED", "RESOLVE"];
    let terminal_status = violation
        .status
        .as_deref()
        .map(normalize_status)
        .map(|status| TERMINAL.contains(&status.as_str()))
        .unwrap_or(false);

    // Categories read like "V*-DOB VIOLATION - DISMISSED".
    let terminal_category = violation
        .violation_category
        .as_deref()
        .map(normalize_status)
        .map(|category| {
            TERMINAL
                .iter()
                .any(|terminal| category.ends_with(&format!("- {terminal}")))
        })
        .unwrap_or(false);

    !(terminal_status || terminal_category)
}

fn dob_severity(violation: &DobViolation) -> SeverityTier {
    match violation.severity.as_deref() {
        Some(severity) => text_severity(Some(severity)),
        None => text_severity(violation.violation_type.as_deref()),
    }
}

fn ecb_is_open(violation: &EcbViolation) -> bool {
    const TERMINAL: [&str; 4] = ["RESOLVE", "RESOLVED", "DISMISSED", "CLOSED"];
    let terminal = violation
        .ecb_violation_status
        .as_deref()
        .map(normalize_status)
        .map(|status| TERMINAL.contains(&status.as_str()))
        .unwrap_or(false);

    let outstanding_balance = violation.balance_due.map(|due| due > 0.0).unwrap_or(false);

    !terminal || outstanding_balance
}

fn hpd_is_open(violation: &HpdViolation) -> bool {
    if violation.certifieddate.is_some() {
        return false;
    }

    const TERMINAL: [&str; 4] = ["CLOSE", "CLOSED", "VIOLATION CLOSED", "VIOLATION DISMISSED"];
    let closed = [&violation.violationstatus, &violation.currentstatus]
        .into_iter()
        .flatten()
        .map(|status| normalize_status(status))
        .any(|status| TERMINAL.contains(&status.as_str()) || reports_certification(&status));

    !closed
}

/// HPD current statuses such as `NOV CERTIFIED ON TIME` or `CERTIFIED LATE` mean the owner
/// certified the correction even when the export carries no certified date.
fn reports_certification(status: &str) -> bool {
    let words = status_words(status);
    words.contains(&"CERTIFIED") && !is_negated(&words)
}

fn hpd_severity(violation: &HpdViolation) -> SeverityTier {
    match violation.class.as_deref().map(normalize_status).as_deref() {
        Some("C") => SeverityTier::High,
        Some("B") => SeverityTier::Moderate,
        _ => SeverityTier::Low,
    }
}

/// Map free-form DOB/ECB severity wording onto a tier; absent text is the lowest tier.
fn text_severity(raw: Option<&str>) -> SeverityTier {
    let Some(text) = raw.map(normalize_status) else {
        return SeverityTier::Low;
    };

    if text.contains("NON-HAZARDOUS") || text.contains("NON HAZARDOUS") {
        return SeverityTier::Low;
    }

    let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    if text.contains("IMMEDIATELY HAZARDOUS") || compact.contains("CLASS-1") || compact == "CLASS1"
    {
        SeverityTier::High
    } else if text.contains("HAZARDOUS") || compact.contains("CLASS-2") || compact == "CLASS2" {
        SeverityTier::Moderate
    } else {
        SeverityTier::Low
    }
}

fn summarize_permits(permits: &[Permit], as_of: NaiveDate, stale_after_days: i64) -> PermitSummary {
    let mut summary = PermitSummary {
        total: permits.len(),
        ..PermitSummary::default()
    };

    for permit in permits {
        let state = permit_state(permit);
        match state {
            PermitState::Completed => {
                summary.completed += 1;
                continue;
            }
            PermitState::InProcess => summary.in_process += 1,
            PermitState::Disapproved => summary.disapproved += 1,
        }

        if let Some(age) = age_in_days(permit.filing_date.as_deref(), as_of) {
            if age > stale_after_days {
                summary.stale += 1;
            }
        }
    }

    summary
}

pub(crate) fn permit_state(permit: &Permit) -> PermitState {
    let statuses: Vec<String> = [
        &permit.permit_status,
        &permit.job_status,
        &permit.filing_status,
    ]
    .into_iter()
    .flatten()
    .map(|status| normalize_status(status))
    .collect();

    const COMPLETED_PHRASES: [&[&str]; 7] = [
        &["ISSUED"],
        &["SIGNED", "OFF"],
        &["SIGNOFF"],
        &["APPROVED"],
        &["COMPLETE"],
        &["COMPLETED"],
        &["PERMIT", "ENTIRE"],
    ];
    const COMPLETED_JOB_CODES: [&str; 4] = ["X", "R", "Q", "U"];

    if statuses.iter().any(|status| {
        status == "J" || status_words(status).contains(&"DISAPPROVED")
    }) {
        return PermitState::Disapproved;
    }

    let completed = statuses.iter().any(|status| {
        if COMPLETED_JOB_CODES.contains(&status.as_str()) {
            return true;
        }
        let words = status_words(status);
        !is_negated(&words)
            && COMPLETED_PHRASES
                .iter()
                .any(|phrase| contains_phrase(&words, phrase))
    });

    if completed {
        PermitState::Completed
    } else {
        PermitState::InProcess
    }
}

/// Split a normalized status on punctuation so `SIGNED-OFF` and `PLAN EXAM - DISAPPROVED`
/// compare word by word.
fn status_words(status: &str) -> Vec<&str> {
    status
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|word| !word.is_empty())
        .collect()
}

fn contains_phrase(words: &[&str], phrase: &[&str]) -> bool {
    words.windows(phrase.len()).any(|window| window == phrase)
}

/// `NOT ISSUED`, `NO SIGN OFF`, `INCOMPLETE` and friends never count as terminal.
fn is_negated(words: &[&str]) -> bool {
    words
        .iter()
        .any(|word| matches!(*word, "NOT" | "NO" | "INCOMPLETE" | "UNAPPROVED"))
}

pub(crate) fn normalize_status(value: &str) -> String {
    value
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_ascii_uppercase()
}

fn age_in_days(raw: Option<&str>, as_of: NaiveDate) -> Option<i64> {
    raw.and_then(parse_registry_date)
        .map(|issued| (as_of - issued).num_days())
}

/// Registry dates arrive as ISO dates, timestamps, US dates, or compact `YYYYMMDD`.
pub(crate) fn parse_registry_date(value: &str) -> Option<NaiveDate> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.naive_utc().date());
    }

    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Some(dt.date());
        }
    }

    for format in ["%Y-%m-%d", "%m/%d/%Y", "%Y%m%d"] {
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, format) {
            return Some(date);
        }
    }

    None
}
