use serde::{Deserialize, Serialize};

use super::domain::ComplianceCategory;
use super::normalizer::SeverityTier;

const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

/// Validation errors for scoring policy dials.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PolicyError {
    #[error("weight for {category} must be within 0.0..=1.0 (found {weight})")]
    WeightOutOfRange {
        category: ComplianceCategory,
        weight: f64,
    },
    #[error("category weights must sum to 1.0 (found {sum:.6})")]
    WeightSum { sum: f64 },
    #[error("{0} must be a finite, non-negative number")]
    InvalidPenalty(&'static str),
}

/// Relative importance of each compliance dimension in the overall score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CategoryWeights {
    pub dob: f64,
    pub ecb: f64,
    pub hpd: f64,
    pub permits: f64,
}

impl CategoryWeights {
    pub fn weight_for(&self, category: ComplianceCategory) -> f64 {
        match category {
            ComplianceCategory::DobViolations => self.dob,
            ComplianceCategory::EcbPenalties => self.ecb,
            ComplianceCategory::HpdViolations => self.hpd,
            ComplianceCategory::PermitCompliance => self.permits,
        }
    }

    pub fn sum(&self) -> f64 {
        ComplianceCategory::ALL
            .iter()
            .map(|category| self.weight_for(*category))
            .sum()
    }

    pub fn validate(&self) -> Result<(), PolicyError> {
        for category in ComplianceCategory::ALL {
            let weight = self.weight_for(category);
            if !weight.is_finite() || !(0.0..=1.0).contains(&weight) {
                return Err(PolicyError::WeightOutOfRange { category, weight });
            }
        }

        let sum = self.sum();
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(PolicyError::WeightSum { sum });
        }

        Ok(())
    }
}

impl Default for CategoryWeights {
    fn default() -> Self {
        // DOB and HPD dominate: both track physical hazards in the building today.
        Self {
            dob: 0.35,
            ecb: 0.25,
            hpd: 0.30,
            permits: 0.10,
        }
    }
}

/// Points subtracted per open violation before recency adjustment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeverityPenalties {
    pub low: f64,
    pub moderate: f64,
    pub high: f64,
}

impl SeverityPenalties {
    pub fn for_tier(&self, tier: SeverityTier) -> f64 {
        match tier {
            SeverityTier::Low => self.low,
            SeverityTier::Moderate => self.moderate,
            SeverityTier::High => self.high,
        }
    }
}

impl Default for SeverityPenalties {
    fn default() -> Self {
        Self {
            low: 4.0,
            moderate: 8.0,
            high: 15.0,
        }
    }
}

/// Linear decay of open-violation penalties with age.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RecencyCurve {
    pub full_weight_days: i64,
    pub floor_after_days: i64,
    pub floor: f64,
}

impl RecencyCurve {
    /// 1.0 inside the full-weight window, then linear down to `floor`.
    /// Unknown or future ages keep full weight.
    pub fn multiplier(&self, age_days: Option<i64>) -> f64 {
        let age = match age_days {
            Some(age) if age > self.full_weight_days => age,
            _ => return 1.0,
        };

        if age >= self.floor_after_days || self.floor_after_days <= self.full_weight_days {
            return self.floor;
        }

        let span = (self.floor_after_days - self.full_weight_days) as f64;
        let progress = (age - self.full_weight_days) as f64 / span;
        1.0 - progress * (1.0 - self.floor)
    }
}

impl Default for RecencyCurve {
    fn default() -> Self {
        Self {
            full_weight_days: 365,
            floor_after_days: 5 * 365,
            floor: 0.5,
        }
    }
}

/// Every tunable constant the scorers and aggregator consume.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringPolicy {
    pub weights: CategoryWeights,
    pub penalties: SeverityPenalties,
    pub recency: RecencyCurve,
    pub closed_violation_penalty: f64,
    pub stale_permit_days: i64,
    pub incomplete_permit_penalty: f64,
    pub stale_permit_penalty: f64,
}

impl ScoringPolicy {
    pub fn validate(&self) -> Result<(), PolicyError> {
        self.weights.validate()?;

        let dials = [
            ("low severity penalty", self.penalties.low),
            ("moderate severity penalty", self.penalties.moderate),
            ("high severity penalty", self.penalties.high),
            ("closed violation penalty", self.closed_violation_penalty),
            ("incomplete permit penalty", self.incomplete_permit_penalty),
            ("stale permit penalty", self.stale_permit_penalty),
        ];
        for (name, value) in dials {
            if !value.is_finite() || value < 0.0 {
                return Err(PolicyError::InvalidPenalty(name));
            }
        }

        if !(0.0..=1.0).contains(&self.recency.floor) {
            return Err(PolicyError::InvalidPenalty("recency floor"));
        }

        Ok(())
    }
}

impl Default for ScoringPolicy {
    fn default() -> Self {
        Self {
            weights: CategoryWeights::default(),
            penalties: SeverityPenalties::default(),
            recency: RecencyCurve::default(),
            closed_violation_penalty: 1.0,
            stale_permit_days: 180,
            incomplete_permit_penalty: 20.0,
            stale_permit_penalty: 10.0,
        }
    }
}
