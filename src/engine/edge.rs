use serde::Serialize;

/// Quotes above this price are flagged risky regardless of edge sign.
pub const RISKY_ODDS: f64 = 2.5;

/// Edges smaller than this are float noise around the fair price.
const EDGE_EPSILON: f64 = 1e-12;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Value,
    NoValue,
}

/// Fair price vs. quoted price for a single outcome.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EdgeAssessment {
    pub outcome_code: String,
    /// Model probability in percent.
    pub probability: f64,
    /// `None` for a zero-probability outcome: no finite fair price exists.
    pub fair_odds: Option<f64>,
    pub quoted_odds: f64,
    /// Expected return per unit staked, e.g. 0.20 = +20%.
    pub edge: f64,
    pub verdict: Verdict,
    pub risky: bool,
}

/// Outcome of evaluating one outcome code.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Signal {
    /// The model has no opinion on this outcome.
    Unmodeled,
    /// Modeled, but no usable bookmaker price.
    NoQuote {
        probability: f64,
        fair_odds: Option<f64>,
    },
    Priced(EdgeAssessment),
}

impl Signal {
    pub fn assessment(&self) -> Option<&EdgeAssessment> {
        match self {
            Signal::Priced(a) => Some(a),
            _ => None,
        }
    }
}

/// `100 / probability_pct`, or `None` when the probability is zero.
pub fn fair_odds(probability_pct: f64) -> Option<f64> {
    if probability_pct > 0.0 {
        Some(100.0 / probability_pct)
    } else {
        None
    }
}

/// `p * odds - 1`, defined only for a positive quote.
pub fn edge(probability_pct: f64, quoted_odds: f64) -> Option<f64> {
    if quoted_odds <= 0.0 || !quoted_odds.is_finite() {
        return None;
    }
    let e = (probability_pct / 100.0) * quoted_odds - 1.0;
    Some(if e.abs() < EDGE_EPSILON { 0.0 } else { e })
}

pub fn is_risky(quoted_odds: f64) -> bool {
    quoted_odds > RISKY_ODDS
}

/// Evaluate one outcome.
///
/// `probability_pct`: model probability (0–100), `None` if unmodeled
/// `quoted_odds`: decimal price, `None` or <= 0 if not quoted
pub fn assess(outcome_code: &str, probability_pct: Option<f64>, quoted_odds: Option<f64>) -> Signal {
    let Some(probability) = probability_pct else {
        return Signal::Unmodeled;
    };
    let fair = fair_odds(probability);

    let priced = quoted_odds.and_then(|odds| edge(probability, odds).map(|e| (odds, e)));
    let Some((quoted_odds, edge)) = priced else {
        return Signal::NoQuote {
            probability,
            fair_odds: fair,
        };
    };

    Signal::Priced(EdgeAssessment {
        outcome_code: outcome_code.to_string(),
        probability,
        fair_odds: fair,
        quoted_odds,
        edge,
        verdict: if edge > 0.0 { Verdict::Value } else { Verdict::NoValue },
        risky: is_risky(quoted_odds),
    })
}
