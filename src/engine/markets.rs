//! Market expansion: which lines get evaluated for a match.
//!
//! Primary 1X2 lines are always listed. Double-chance lines are attached
//! alongside them and flagged as hedges when the matching 1X2 price is
//! risky. Handicaps are split by side and capped; goals totals come from a
//! fixed ladder so a missing line renders as a placeholder.

use serde::Serialize;

use super::edge::is_risky;
use super::probability::{self, ProbabilityModel};
use super::quotes::{HandicapQuote, MarketQuoteBook};

/// At most this many handicap lines are evaluated per side.
pub const MAX_HANDICAP_LINES: usize = 4;

/// Goals totals evaluated for every match, in display order.
pub const GOALS_LINES: [f64; 4] = [1.5, 2.5, 3.5, 4.5];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Side {
    Home,
    Away,
}

impl Side {
    pub fn label(self) -> &'static str {
        match self {
            Side::Home => "Home",
            Side::Away => "Away",
        }
    }

    /// Side a bookmaker label belongs to, by substring.
    fn of_label(label: &str) -> Option<Side> {
        if label.contains("Home") {
            Some(Side::Home)
        } else if label.contains("Away") {
            Some(Side::Away)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MarketKind {
    MatchWinner,
    DoubleChance,
    AsianHandicap,
    Goals,
}

/// One line ready for edge evaluation. Missing probability or price stay
/// `None` and become placeholders downstream.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarketLine {
    pub market: MarketKind,
    pub outcome_code: String,
    pub label: String,
    pub side: Option<Side>,
    pub probability: Option<f64>,
    pub quoted_odds: Option<f64>,
    pub is_hedge: bool,
}

/// Side and line parsed out of a handicap label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandicapKey {
    pub side: Side,
    /// Line with the side token removed, e.g. `"-1"`, `"0"`, `"+1.5"`.
    pub line: String,
}

impl HandicapKey {
    /// Side-qualified probability code, e.g. `"Home-1"`.
    pub fn code(&self) -> String {
        format!("{}{}", self.side.label(), self.line)
    }
}

/// Recognised handicap label shapes, checked in order.
const HANDICAP_LABEL_PREFIXES: [(&str, Side); 2] = [("Home ", Side::Home), ("Away ", Side::Away)];

/// Map a bookmaker label to its handicap key.
///
/// Only `"<Side> <line>"` is understood: the leading side token and the
/// single space after it are stripped and the rest must be one
/// whitespace-free token. Anything else is unmodeled.
pub fn handicap_key(label: &str) -> Option<HandicapKey> {
    HANDICAP_LABEL_PREFIXES.iter().find_map(|(prefix, side)| {
        let line = label.strip_prefix(prefix)?;
        if line.is_empty() || line.chars().any(char::is_whitespace) {
            return None;
        }
        Some(HandicapKey {
            side: *side,
            line: line.to_string(),
        })
    })
}

#[derive(Debug, Clone, PartialEq)]
pub struct HandicapLine {
    pub side: Side,
    pub label: String,
    pub key: Option<HandicapKey>,
    pub odds: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct HandicapSplit {
    pub home: Vec<HandicapLine>,
    pub away: Vec<HandicapLine>,
}

/// Partition handicap quotes by side, cheapest price first, capped per side.
/// Unpriced quotes (<= 0) sort after every priced one.
pub fn split_handicaps(quotes: &[HandicapQuote]) -> HandicapSplit {
    let mut split = HandicapSplit::default();

    for q in quotes {
        let Some(side) = Side::of_label(&q.label) else {
            tracing::debug!(label = %q.label, "handicap label has no side");
            continue;
        };
        let key = handicap_key(&q.label);
        if key.is_none() {
            tracing::debug!(label = %q.label, "unrecognised handicap label shape");
        }
        let line = HandicapLine {
            side,
            label: q.label.clone(),
            key,
            odds: q.odd,
        };
        match side {
            Side::Home => split.home.push(line),
            Side::Away => split.away.push(line),
        }
    }

    for lines in [&mut split.home, &mut split.away] {
        lines.sort_by(|a, b| sort_price(a.odds).total_cmp(&sort_price(b.odds)));
        lines.truncate(MAX_HANDICAP_LINES);
    }
    split
}

fn sort_price(odds: f64) -> f64 {
    if odds > 0.0 {
        odds
    } else {
        f64::INFINITY
    }
}

fn flat_line(
    market: MarketKind,
    code: &str,
    label: &str,
    probs: &ProbabilityModel,
    book: &MarketQuoteBook,
) -> MarketLine {
    MarketLine {
        market,
        outcome_code: code.to_string(),
        label: label.to_string(),
        side: None,
        probability: probs.get(code),
        quoted_odds: book.price(code),
        is_hedge: false,
    }
}

/// Build every line to evaluate for one match.
pub fn expand(probs: &ProbabilityModel, book: &MarketQuoteBook) -> Vec<MarketLine> {
    let mut lines = vec![
        flat_line(MarketKind::MatchWinner, probability::HOME, "Home", probs, book),
        flat_line(MarketKind::MatchWinner, probability::DRAW, "Draw", probs, book),
        flat_line(MarketKind::MatchWinner, probability::AWAY, "Away", probs, book),
    ];

    for (code, label) in DOUBLE_CHANCE {
        lines.push(flat_line(MarketKind::DoubleChance, code, label, probs, book));
    }

    let split = split_handicaps(&book.handicaps);
    for h in split.home.iter().chain(split.away.iter()) {
        let (code, probability) = match &h.key {
            Some(key) => (key.code(), probs.handicap(key.side, &key.line)),
            None => (h.label.split_whitespace().collect::<String>(), None),
        };
        lines.push(MarketLine {
            market: MarketKind::AsianHandicap,
            outcome_code: code,
            label: h.label.clone(),
            side: Some(h.side),
            probability,
            quoted_odds: Some(h.odds).filter(|o| *o > 0.0),
            is_hedge: false,
        });
    }

    for total in GOALS_LINES {
        let quote = book.goals_line(total);
        if quote.is_none() {
            tracing::trace!(total, "no goals quote for line");
        }
        let over = probability::over_code(total);
        let under = probability::under_code(total);
        lines.push(MarketLine {
            market: MarketKind::Goals,
            probability: probs.get(&over),
            quoted_odds: quote
                .and_then(|g| g.over)
                .filter(|o| *o > 0.0)
                .or_else(|| book.price(&over)),
            label: format!("Over {}", total),
            outcome_code: over,
            side: None,
            is_hedge: false,
        });
        lines.push(MarketLine {
            market: MarketKind::Goals,
            probability: probs.get(&under),
            quoted_odds: quote
                .and_then(|g| g.under)
                .filter(|o| *o > 0.0)
                .or_else(|| book.price(&under)),
            label: format!("Under {}", total),
            outcome_code: under,
            side: None,
            is_hedge: false,
        });
    }

    mark_hedges(&mut lines);
    lines
}

/// Double-chance lines paired with the 1X2 outcome they hedge.
const DOUBLE_CHANCE: [(&str, &str); 2] = [
    (probability::HOME_OR_DRAW, "Home/Draw"),
    (probability::DRAW_OR_AWAY, "Draw/Away"),
];

fn hedged_outcome(code: &str) -> Option<&'static str> {
    match code {
        probability::HOME_OR_DRAW => Some(probability::HOME),
        probability::DRAW_OR_AWAY => Some(probability::AWAY),
        _ => None,
    }
}

/// Flag each priced double-chance line whose home/away price is risky.
/// Re-run after any line prices change.
pub fn mark_hedges(lines: &mut [MarketLine]) {
    fn price_of(lines: &[MarketLine], code: &str) -> Option<f64> {
        lines
            .iter()
            .find(|l| l.market == MarketKind::MatchWinner && l.outcome_code == code)
            .and_then(|l| l.quoted_odds)
    }
    for i in 0..lines.len() {
        if lines[i].market != MarketKind::DoubleChance {
            continue;
        }
        let risky_primary = hedged_outcome(&lines[i].outcome_code)
            .and_then(|primary| price_of(lines, primary))
            .is_some_and(is_risky);
        lines[i].is_hedge = risky_primary && lines[i].quoted_odds.is_some();
    }
}
