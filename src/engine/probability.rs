//! Per-match outcome probabilities, expressed in percent.
//!
//! Each market family (1X2, double chance, goals totals, handicaps) is
//! normalised upstream; the model only stores what it is given. A missing
//! code means "no opinion" and must never be read as 0%.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::markets::Side;

pub const HOME: &str = "1";
pub const DRAW: &str = "X";
pub const AWAY: &str = "2";
pub const HOME_OR_DRAW: &str = "1X";
pub const DRAW_OR_AWAY: &str = "X2";

/// Probability code for the over side of a goals total, e.g. `Over2.5`.
pub fn over_code(line: f64) -> String {
    format!("Over{}", line)
}

/// Probability code for the under side of a goals total, e.g. `Under2.5`.
pub fn under_code(line: f64) -> String {
    format!("Under{}", line)
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "HashMap<String, f64>", into = "HashMap<String, f64>")]
pub struct ProbabilityModel {
    pct: HashMap<String, f64>,
}

impl ProbabilityModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a raw code -> percent mapping. Values that are not finite
    /// or fall outside 0..=100 are dropped so they surface as unmodeled.
    pub fn from_map(raw: HashMap<String, f64>) -> Self {
        let mut model = Self::new();
        for (code, value) in raw {
            model.insert(code, value);
        }
        model
    }

    /// Returns false when the value was rejected.
    pub fn insert(&mut self, code: impl Into<String>, pct: f64) -> bool {
        let code = code.into();
        if !pct.is_finite() || !(0.0..=100.0).contains(&pct) {
            tracing::debug!(code = %code, pct, "dropping out-of-range probability");
            return false;
        }
        self.pct.insert(code, pct);
        true
    }

    pub fn get(&self, code: &str) -> Option<f64> {
        self.pct.get(code).copied()
    }

    /// Handicap lookup. Side-qualified codes (`Home-1`) win over bare line
    /// codes (`-1`), which carry no side and are shared by both.
    pub fn handicap(&self, side: Side, line: &str) -> Option<f64> {
        self.get(&format!("{}{}", side.label(), line))
            .or_else(|| self.get(line))
    }

    pub fn is_empty(&self) -> bool {
        self.pct.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pct.len()
    }
}

impl From<HashMap<String, f64>> for ProbabilityModel {
    fn from(raw: HashMap<String, f64>) -> Self {
        Self::from_map(raw)
    }
}

impl From<ProbabilityModel> for HashMap<String, f64> {
    fn from(model: ProbabilityModel) -> Self {
        model.pct
    }
}
