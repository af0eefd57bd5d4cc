use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

/// Snapshot of one building's violation and permit history as fetched from the city registries.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PropertyData {
    pub bin: String,
    #[serde(default)]
    pub address: String,
    pub borough: String,
    #[serde(default)]
    pub block: String,
    #[serde(default)]
    pub lot: String,
    #[serde(default, alias = "dobViolations")]
    pub dob_violations: Vec<DobViolation>,
    #[serde(default, alias = "ecbViolations")]
    pub ecb_violations: Vec<EcbViolation>,
    #[serde(default, alias = "hpdViolations")]
    pub hpd_violations: Vec<HpdViolation>,
    #[serde(default)]
    pub permits: Vec<Permit>,
}

impl PropertyData {
    pub fn new(bin: impl Into<String>, borough: impl Into<String>) -> Self {
        Self {
            bin: bin.into(),
            borough: borough.into(),
            ..Self::default()
        }
    }

    pub fn is_clean(&self) -> bool {
        self.dob_violations.is_empty()
            && self.ecb_violations.is_empty()
            && self.hpd_violations.is_empty()
            && self.permits.is_empty()
    }
}

/// Department of Buildings violation record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DobViolation {
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub violation_number: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub violation_type: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub violation_category: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub issue_date: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub violation_date_closed: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub severity: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub description: Option<String>,
}

/// Environmental Control Board violation record, including outstanding penalties.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EcbViolation {
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub ecb_violation_number: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub ecb_violation_status: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub severity: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub issue_date: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub violation_description: Option<String>,
    #[serde(
        default,
        alias = "penalty_balance_due",
        alias = "amount_baldue",
        deserialize_with = "lenient_amount"
    )]
    pub balance_due: Option<f64>,
}

/// Housing Preservation & Development violation record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HpdViolation {
    #[serde(
        default,
        alias = "violationid",
        deserialize_with = "empty_string_as_none"
    )]
    pub violation_id: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub class: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub currentstatus: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub violationstatus: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub inspectiondate: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub novissueddate: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub certifieddate: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub novdescription: Option<String>,
}

/// DOB job filing and permit lifecycle record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Permit {
    #[serde(default, alias = "job__", deserialize_with = "empty_string_as_none")]
    pub job_number: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub job_type: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub job_status: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub filing_status: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub permit_status: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub filing_date: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub issuance_date: Option<String>,
}

/// Compliance dimensions scored for every building.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ComplianceCategory {
    #[serde(rename = "DOB Violations")]
    DobViolations,
    #[serde(rename = "ECB Penalties")]
    EcbPenalties,
    #[serde(rename = "HPD Violations")]
    HpdViolations,
    #[serde(rename = "Permit Compliance")]
    PermitCompliance,
}

impl ComplianceCategory {
    pub const ALL: [ComplianceCategory; 4] = [
        ComplianceCategory::DobViolations,
        ComplianceCategory::EcbPenalties,
        ComplianceCategory::HpdViolations,
        ComplianceCategory::PermitCompliance,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            ComplianceCategory::DobViolations => "DOB Violations",
            ComplianceCategory::EcbPenalties => "ECB Penalties",
            ComplianceCategory::HpdViolations => "HPD Violations",
            ComplianceCategory::PermitCompliance => "Permit Compliance",
        }
    }
}

impl fmt::Display for ComplianceCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Score for a single compliance dimension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryScore {
    pub category: ComplianceCategory,
    pub score: u8,
    pub weight: f64,
    pub details: String,
}

/// Coarse triage bucket derived from the overall score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn label(&self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
        }
    }

    /// Presentation hint; always derived from the tier, never from the raw score.
    pub fn color(&self) -> &'static str {
        match self {
            RiskLevel::Low => "green",
            RiskLevel::Medium => "yellow",
            RiskLevel::High => "red",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Weighted building score handed to presentation and persistence collaborators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplianceScore {
    pub overall: u8,
    pub categories: Vec<CategoryScore>,
    #[serde(rename = "riskLevel")]
    pub risk_level: RiskLevel,
    pub color: String,
}

impl ComplianceScore {
    pub fn category(&self, category: ComplianceCategory) -> Option<&CategoryScore> {
        self.categories
            .iter()
            .find(|entry| entry.category == category)
    }
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawAmount {
    Number(f64),
    Text(String),
}

// Open Data exports carry amounts as strings ("1,250.00"), JSON feeds as numbers.
fn lenient_amount<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<RawAmount>::deserialize(deserializer)?;
    Ok(match raw {
        Some(RawAmount::Number(value)) if value.is_finite() => Some(value),
        Some(RawAmount::Text(text)) => {
            let cleaned: String = text
                .trim()
                .chars()
                .filter(|c| !matches!(c, '$' | ','))
                .collect();
            cleaned.parse::<f64>().ok().filter(|value| value.is_finite())
        }
        _ => None,
    })
}
