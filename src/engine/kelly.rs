//! Fractional Kelly stake sizing for decimal-odds bets.

use serde::Serialize;

use super::edge::EdgeAssessment;

/// Quarter-Kelly.
pub const DEFAULT_KELLY_MULTIPLIER: f64 = 0.25;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StakePlan {
    pub outcome_code: String,
    /// Share of bankroll to stake, after the fractional multiplier.
    pub kelly_fraction: f64,
    pub recommended_amount: f64,
}

/// Fractional Kelly share of bankroll.
///
/// - `probability_pct`: model probability (0–100)
/// - `quoted_odds`: decimal price
/// - `multiplier`: scaling factor (e.g. 0.25 for quarter-Kelly)
///
/// Never negative. Odds of exactly 1 (or below) pay nothing and return 0
/// instead of dividing by zero.
pub fn kelly_fraction(probability_pct: f64, quoted_odds: f64, multiplier: f64) -> f64 {
    let b = quoted_odds - 1.0;
    if b <= 0.0 || !b.is_finite() || multiplier <= 0.0 {
        return 0.0;
    }

    let p = probability_pct / 100.0;
    let q = 1.0 - p;

    // f* = (b*p - q) / b
    let f_star = (b * p - q) / b;

    f_star.max(0.0) * multiplier
}

/// Size a stake for a positive-edge assessment. Returns `None` when the
/// edge is not positive; the implied stake is then zero.
pub fn plan_stake(assessment: &EdgeAssessment, bankroll: f64, multiplier: f64) -> Option<StakePlan> {
    if assessment.edge <= 0.0 {
        return None;
    }

    let fraction = kelly_fraction(assessment.probability, assessment.quoted_odds, multiplier);
    Some(StakePlan {
        outcome_code: assessment.outcome_code.clone(),
        kelly_fraction: fraction,
        recommended_amount: fraction * bankroll.max(0.0),
    })
}
