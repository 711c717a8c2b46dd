use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::engine::lifecycle::{self, Lifecycle, Score};
use crate::engine::{MarketQuoteBook, ProbabilityModel};

/// Normalized per-poll match record used by the engine (source-agnostic).
#[derive(Debug, Clone, PartialEq)]
pub struct MatchSnapshot {
    pub id: String,
    pub league: String,
    pub round: String,
    pub home_team: String,
    pub away_team: String,
    pub kickoff: DateTime<Utc>,
    pub status: Option<String>,
    pub elapsed: Option<u16>,
    pub score: Score,
    /// Gates every probability-derived market for this match.
    pub has_model: bool,
    pub probabilities: ProbabilityModel,
    pub quotes: MarketQuoteBook,
}

impl MatchSnapshot {
    pub fn lifecycle(&self) -> Lifecycle {
        lifecycle::classify(self.status.as_deref(), self.elapsed, self.score, self.kickoff)
    }

    pub fn matchup(&self) -> String {
        format!("{} vs {}", self.home_team, self.away_team)
    }
}

// ── Edges JSON record list ───────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct RawMatch {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub date: String,
    #[serde(default)]
    pub league: String,
    #[serde(default)]
    pub round: Option<String>,
    pub home_team: String,
    pub away_team: String,
    #[serde(default)]
    pub score: Option<RawScore>,
    #[serde(default)]
    pub has_model: bool,
    #[serde(default, alias = "probs")]
    pub probabilities: ProbabilityModel,
    #[serde(default, alias = "market_odds")]
    pub quotes: MarketQuoteBook,
}

#[derive(Debug, Default, Deserialize)]
pub struct RawScore {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default, alias = "time")]
    pub elapsed: Option<u16>,
    #[serde(default, alias = "goals_h")]
    pub goals_home: Option<u16>,
    #[serde(default, alias = "goals_a")]
    pub goals_away: Option<u16>,
}

fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number id, got {}",
            other
        ))),
    }
}

/// Parse an ISO-8601 kickoff with offset into UTC.
pub fn parse_kickoff(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .with_context(|| format!("invalid kickoff timestamp: {}", raw))
}

impl TryFrom<RawMatch> for MatchSnapshot {
    type Error = anyhow::Error;

    fn try_from(raw: RawMatch) -> Result<Self> {
        let kickoff = parse_kickoff(&raw.date)?;
        let score = raw.score.unwrap_or_default();
        Ok(MatchSnapshot {
            id: raw.id,
            league: raw.league,
            round: raw.round.unwrap_or_default(),
            home_team: raw.home_team,
            away_team: raw.away_team,
            kickoff,
            status: score.status,
            elapsed: score.elapsed,
            score: Score {
                home: score.goals_home,
                away: score.goals_away,
            },
            has_model: raw.has_model,
            probabilities: raw.probabilities,
            quotes: raw.quotes,
        })
    }
}

/// Decode one poll's payload.
///
/// A payload that is not a JSON list, or any record that fails to decode,
/// rejects the whole poll so the caller can keep its previous good state.
pub fn parse_feed(json: &str) -> Result<Vec<MatchSnapshot>> {
    let value: Value = serde_json::from_str(json).context("feed payload is not valid JSON")?;
    if !value.is_array() {
        anyhow::bail!("feed payload is not a list");
    }
    let raw: Vec<RawMatch> =
        serde_json::from_value(value).context("failed to decode match records")?;
    raw.into_iter().map(MatchSnapshot::try_from).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const ONE_MATCH: &str = r#"[
        {
            "id": 1388412,
            "date": "2025-10-18T13:30:00+00:00",
            "match": "Eintracht Frankfurt vs Borussia Dortmund",
            "home_team": "Eintracht Frankfurt",
            "away_team": "Borussia Dortmund",
            "league": "Bundesliga",
            "round": "Regular Season - 7",
            "score": {"status": "2H", "time": 63, "goals_h": 1, "goals_a": 0},
            "has_model": true,
            "probs": {"1": 54.6, "X": 20.7, "2": 24.6, "1X": 75.3, "X2": 45.3},
            "fair_odds": {"1": 1.83, "X": 4.83, "2": 4.07},
            "predicted_xg": "1.90 - 1.21",
            "market_odds": {"1": 2.05, "X": 3.6, "2": 3.3, "1X": 1.35, "X2": 1.7}
        }
    ]"#;

    #[test]
    fn test_parse_feed_record() {
        let matches = parse_feed(ONE_MATCH).unwrap();
        assert_eq!(matches.len(), 1);
        let m = &matches[0];
        assert_eq!(m.id, "1388412");
        assert_eq!(m.round, "Regular Season - 7");
        assert_eq!(m.elapsed, Some(63));
        assert_eq!(m.score, Score::new(1, 0));
        assert!(m.has_model);
        assert_eq!(m.probabilities.get("1"), Some(54.6));
        assert_eq!(m.quotes.price("X2"), Some(1.7));
        assert!(m.lifecycle().is_live());
        assert_eq!(m.matchup(), "Eintracht Frankfurt vs Borussia Dortmund");
    }

    #[test]
    fn test_minimal_record_defaults() {
        let json = r#"[{"id": "abc", "date": "2025-10-19T15:30:00Z",
                        "home_team": "A", "away_team": "B"}]"#;
        let m = &parse_feed(json).unwrap()[0];
        assert!(!m.has_model);
        assert!(m.probabilities.is_empty());
        assert!(m.quotes.is_empty());
        assert_eq!(m.status, None);
        assert!(matches!(m.lifecycle(), Lifecycle::Prematch { .. }));
    }

    #[test]
    fn test_non_list_payload_rejected() {
        assert!(parse_feed(r#"{"errors": {"requests": "limit reached"}}"#).is_err());
        assert!(parse_feed("null").is_err());
        assert!(parse_feed("not json").is_err());
        assert!(parse_feed("[]").unwrap().is_empty());
    }

    #[test]
    fn test_unmodeled_market_keeps_poll() {
        let json = r#"[
            {"id": 1, "date": "2025-10-19T15:30:00Z", "home_team": "A", "away_team": "B",
             "market_odds": {"1": 2.0, "BTTS": {"Yes": 1.8}}},
            {"id": 2, "date": "2025-10-19T17:30:00Z", "home_team": "C", "away_team": "D",
             "market_odds": {"2": 3.1}}
        ]"#;
        let matches = parse_feed(json).unwrap();
        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].quotes.price("1"), Some(2.0));
        assert_eq!(matches[0].quotes.price("BTTS"), None);
        assert_eq!(matches[1].quotes.price("2"), Some(3.1));
    }

    #[test]
    fn test_unparseable_field_rejects_poll() {
        let bad_odds = r#"[{"id": 1, "date": "2025-10-19T15:30:00Z", "home_team": "A",
                            "away_team": "B", "market_odds": {"1": "two"}}]"#;
        assert!(parse_feed(bad_odds).is_err());

        let bad_date = r#"[{"id": 1, "date": "tomorrow", "home_team": "A", "away_team": "B"}]"#;
        assert!(parse_feed(bad_date).is_err());
    }
}
