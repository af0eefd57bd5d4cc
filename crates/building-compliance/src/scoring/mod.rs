//! Compliance scoring core: normalize registry records, score each category, aggregate.
//!
//! Everything here is pure and synchronous. Inputs are immutable snapshots and every call
//! allocates a fresh [`ComplianceScore`]; nothing is cached between requests.

pub mod aggregator;
pub mod domain;
pub mod normalizer;
pub mod policy;
pub mod scorers;
pub mod validation;

pub use aggregator::{aggregate, risk_level_for};
pub use domain::{
    CategoryScore, ComplianceCategory, ComplianceScore, DobViolation, EcbViolation, HpdViolation,
    Permit, PropertyData, RiskLevel,
};
pub use normalizer::{
    normalize, NormalizedViolation, NormalizedViolations, PermitSummary, SeverityTier,
};
pub use policy::{CategoryWeights, PolicyError, RecencyCurve, ScoringPolicy, SeverityPenalties};
pub use validation::{validate_property, Borough, PropertyValidationError};

use chrono::{Local, NaiveDate};
use rayon::prelude::*;
use tracing::debug;

/// Stateless scorer bound to a validated policy.
#[derive(Debug, Clone)]
pub struct ComplianceEngine {
    policy: ScoringPolicy,
}

impl Default for ComplianceEngine {
    fn default() -> Self {
        Self {
            policy: ScoringPolicy::default(),
        }
    }
}

impl ComplianceEngine {
    pub fn new(policy: ScoringPolicy) -> Result<Self, PolicyError> {
        policy.validate()?;
        Ok(Self { policy })
    }

    pub fn policy(&self) -> &ScoringPolicy {
        &self.policy
    }

    /// Score a building as of `as_of`. Identical inputs always produce identical scores.
    pub fn score(
        &self,
        property: &PropertyData,
        as_of: NaiveDate,
    ) -> Result<ComplianceScore, PropertyValidationError> {
        validate_property(property)?;

        let normalized = normalize(property, as_of, &self.policy);
        let categories = self.score_categories(&normalized);
        let score = aggregate(&categories);

        debug!(
            bin = %property.bin.trim(),
            overall = score.overall,
            risk = %score.risk_level,
            "computed compliance score"
        );

        Ok(score)
    }

    /// Category scorers share nothing mutable, so they run on the rayon pool. `collect`
    /// keeps declaration order, which keeps the output deterministic.
    fn score_categories(&self, normalized: &NormalizedViolations) -> Vec<CategoryScore> {
        let policy = &self.policy;

        ComplianceCategory::ALL
            .par_iter()
            .map(|&category| match category {
                ComplianceCategory::PermitCompliance => {
                    scorers::score_permits(&normalized.permits, policy)
                }
                _ => scorers::score_violations(category, normalized.for_category(category), policy),
            })
            .collect()
    }
}

/// Inbound boundary used by the report workflow: default policy, scored as of today.
pub fn compute_compliance_score(
    property: &PropertyData,
) -> Result<ComplianceScore, PropertyValidationError> {
    ComplianceEngine::default().score(property, Local::now().date_naive())
}
