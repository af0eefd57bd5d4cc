use super::domain::{CategoryScore, ComplianceCategory};
use super::normalizer::{NormalizedViolation, PermitSummary, SeverityTier};
use super::policy::ScoringPolicy;

const PERFECT_SCORE: f64 = 100.0;

/// Score one violation category: start at 100, subtract recency-weighted penalties for open
/// violations and a flat penalty for each closed one.
pub fn score_violations(
    category: ComplianceCategory,
    violations: &[NormalizedViolation],
    policy: &ScoringPolicy,
) -> CategoryScore {
    let weight = policy.weights.weight_for(category);

    if violations.is_empty() {
        return CategoryScore {
            category,
            score: 100,
            weight,
            details: "No violations on record".to_string(),
        };
    }

    let mut penalty = 0.0;
    let mut open = 0usize;
    let mut open_high = 0usize;
    let mut closed = 0usize;

    for violation in violations {
        if violation.is_open {
            open += 1;
            if violation.severity == SeverityTier::High {
                open_high += 1;
            }
            penalty += violation.severity_weight * policy.recency.multiplier(violation.age_days);
        } else {
            closed += 1;
            penalty += policy.closed_violation_penalty;
        }
    }

    CategoryScore {
        category,
        score: clamp_score(PERFECT_SCORE - penalty),
        weight,
        details: violation_details(category, open, open_high, closed),
    }
}

/// Permits score on completion ratio, with an extra penalty per stale filing.
pub fn score_permits(summary: &PermitSummary, policy: &ScoringPolicy) -> CategoryScore {
    let category = ComplianceCategory::PermitCompliance;
    let weight = policy.weights.weight_for(category);

    if summary.total == 0 {
        return CategoryScore {
            category,
            score: 100,
            weight,
            details: "No permits on record".to_string(),
        };
    }

    let penalty = (1.0 - summary.completion_ratio()) * policy.incomplete_permit_penalty
        + summary.stale as f64 * policy.stale_permit_penalty;

    CategoryScore {
        category,
        score: clamp_score(PERFECT_SCORE - penalty),
        weight,
        details: format!(
            "{} of {} permits complete, {} stale",
            summary.completed, summary.total, summary.stale
        ),
    }
}

fn violation_details(
    category: ComplianceCategory,
    open: usize,
    open_high: usize,
    closed: usize,
) -> String {
    if open_high == 0 {
        return format!("{open} open, {closed} closed");
    }

    let label = match category {
        ComplianceCategory::DobViolations => "hazardous",
        ComplianceCategory::EcbPenalties => "Class 1",
        ComplianceCategory::HpdViolations => "Class C",
        ComplianceCategory::PermitCompliance => "high severity",
    };
    format!("{open} open ({open_high} {label}), {closed} closed")
}

pub(crate) fn clamp_score(raw: f64) -> u8 {
    if raw.is_nan() {
        return 0;
    }
    raw.round().clamp(0.0, PERFECT_SCORE) as u8
}
