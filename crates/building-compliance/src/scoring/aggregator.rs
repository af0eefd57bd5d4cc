use super::domain::{CategoryScore, ComplianceScore, RiskLevel};
use super::scorers::clamp_score;

const LOW_RISK_FLOOR: u8 = 80;
const MEDIUM_RISK_FLOOR: u8 = 50;

/// Tier boundaries are inclusive on the lower bound.
pub fn risk_level_for(overall: u8) -> RiskLevel {
    if overall >= LOW_RISK_FLOOR {
        RiskLevel::Low
    } else if overall >= MEDIUM_RISK_FLOOR {
        RiskLevel::Medium
    } else {
        RiskLevel::High
    }
}

/// Combine category scores into the overall score. Total over any input: an empty sequence
/// (or one with no weight) scores 0 and lands in the high risk tier.
pub fn aggregate(categories: &[CategoryScore]) -> ComplianceScore {
    let total_weight: f64 = categories
        .iter()
        .map(|entry| sanitize_weight(entry.weight))
        .sum();

    let overall = if total_weight > 0.0 {
        let weighted: f64 = categories
            .iter()
            .map(|entry| f64::from(entry.score.min(100)) * sanitize_weight(entry.weight))
            .sum();
        clamp_score(weighted / total_weight)
    } else {
        0
    };

    let risk_level = risk_level_for(overall);

    ComplianceScore {
        overall,
        categories: categories.to_vec(),
        risk_level,
        color: risk_level.color().to_string(),
    }
}

fn sanitize_weight(weight: f64) -> f64 {
    if weight.is_finite() && weight > 0.0 {
        weight
    } else {
        0.0
    }
}
