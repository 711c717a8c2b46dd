use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

use super::probability;

/// One Asian-handicap price as the bookmaker labels it, e.g. `"Home -1"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandicapQuote {
    pub label: String,
    #[serde(default)]
    pub odd: f64,
}

/// Over/under prices for a single goals total.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GoalsQuote {
    #[serde(rename = "Over", default)]
    pub over: Option<f64>,
    #[serde(rename = "Under", default)]
    pub under: Option<f64>,
}

/// Bookmaker decimal prices for one match.
///
/// Simple markets (1X2, double chance, flat goals codes) live in a flat
/// code -> price map; handicaps and goals totals keep their own structure.
/// A price of 0, a negative price, or a missing code all mean "no quote".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawQuoteBook")]
pub struct MarketQuoteBook {
    #[serde(rename = "Handicaps", default)]
    pub handicaps: Vec<HandicapQuote>,
    #[serde(rename = "Goals", default)]
    pub goals: HashMap<String, GoalsQuote>,
    #[serde(flatten)]
    prices: HashMap<String, Option<f64>>,
}

/// Wire shape before the flat prices are checked.
#[derive(Debug, Deserialize)]
struct RawQuoteBook {
    #[serde(rename = "Handicaps", default)]
    handicaps: Vec<HandicapQuote>,
    #[serde(rename = "Goals", default)]
    goals: HashMap<String, GoalsQuote>,
    #[serde(flatten)]
    rest: HashMap<String, Value>,
}

/// Flat codes the engine prices. A malformed value under one of these
/// rejects the book; anything else under an unknown key is ignored.
fn is_priced_code(code: &str) -> bool {
    matches!(
        code,
        probability::HOME
            | probability::DRAW
            | probability::AWAY
            | probability::HOME_OR_DRAW
            | probability::DRAW_OR_AWAY
    ) || code.starts_with("Over")
        || code.starts_with("Under")
}

impl TryFrom<RawQuoteBook> for MarketQuoteBook {
    type Error = String;

    fn try_from(raw: RawQuoteBook) -> Result<Self, Self::Error> {
        let mut prices = HashMap::with_capacity(raw.rest.len());
        for (code, value) in raw.rest {
            match value {
                Value::Null => {
                    prices.insert(code, None);
                }
                Value::Number(n) => {
                    prices.insert(code, n.as_f64());
                }
                other if is_priced_code(&code) => {
                    return Err(format!("invalid price for {}: {}", code, other));
                }
                _ => {
                    tracing::debug!(code = %code, "ignoring unmodeled market in quotes");
                }
            }
        }
        Ok(Self {
            handicaps: raw.handicaps,
            goals: raw.goals,
            prices,
        })
    }
}

impl MarketQuoteBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_price(&mut self, code: impl Into<String>, odds: f64) {
        self.prices.insert(code.into(), Some(odds));
    }

    /// Quoted decimal price for a flat outcome code, if one is on offer.
    pub fn price(&self, code: &str) -> Option<f64> {
        self.prices
            .get(code)
            .copied()
            .flatten()
            .filter(|odds| odds.is_finite() && *odds > 0.0)
    }

    /// Goals total lookup; lines are keyed by their plain decimal form (`"2.5"`).
    pub fn goals_line(&self, line: f64) -> Option<&GoalsQuote> {
        self.goals.get(&line.to_string())
    }

    pub fn is_empty(&self) -> bool {
        self.handicaps.is_empty()
            && self.goals.is_empty()
            && self.prices.values().all(|p| p.map_or(true, |v| v <= 0.0))
    }
}
