//! api-football (v3) fixtures + odds feed.
//!
//! Each poll requests live fixtures and the next N scheduled fixtures for one
//! league, then one odds request per fixture. Probabilities come from the
//! local ratings table, never from the bookmaker.

use super::types::{parse_kickoff, MatchSnapshot};
use super::MatchFeed;
use crate::config::FeedConfig;
use crate::engine::lifecycle::Score;
use crate::engine::quotes::{GoalsQuote, HandicapQuote, MarketQuoteBook};
use crate::engine::ratings::LeagueRatings;
use crate::engine::{probability, ProbabilityModel};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashSet;
use std::time::Duration;

const BET_MATCH_WINNER: u32 = 1;
const BET_ASIAN_HANDICAP: u32 = 4;
const BET_GOALS_OVER_UNDER: u32 = 5;
const BET_DOUBLE_CHANCE: u32 = 12;

// ── api-football response types ──────────────────────────────────────

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    #[serde(default)]
    errors: Value,
    #[serde(default = "Vec::new")]
    response: Vec<T>,
}

#[derive(Debug, Deserialize)]
pub struct ApiFixture {
    pub fixture: FixtureInfo,
    pub league: LeagueInfo,
    pub teams: Teams,
    #[serde(default)]
    pub goals: Goals,
}

#[derive(Debug, Deserialize)]
pub struct FixtureInfo {
    pub id: u64,
    pub date: String,
    pub status: FixtureStatus,
}

#[derive(Debug, Deserialize)]
pub struct FixtureStatus {
    #[serde(default)]
    pub short: Option<String>,
    #[serde(default)]
    pub elapsed: Option<u16>,
}

#[derive(Debug, Deserialize)]
pub struct LeagueInfo {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub round: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Teams {
    pub home: Team,
    pub away: Team,
}

#[derive(Debug, Deserialize)]
pub struct Team {
    pub name: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct Goals {
    #[serde(default)]
    pub home: Option<u16>,
    #[serde(default)]
    pub away: Option<u16>,
}

#[derive(Debug, Deserialize)]
struct OddsEntry {
    #[serde(default)]
    bookmakers: Vec<Bookmaker>,
}

#[derive(Debug, Deserialize)]
struct Bookmaker {
    id: u32,
    #[serde(default)]
    bets: Vec<Bet>,
}

#[derive(Debug, Deserialize)]
struct Bet {
    id: u32,
    #[serde(default)]
    values: Vec<BetValue>,
}

#[derive(Debug, Deserialize)]
struct BetValue {
    value: Value,
    odd: String,
}

fn has_errors(errors: &Value) -> bool {
    match errors {
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
        Value::Null => false,
        _ => true,
    }
}

fn check_errors(errors: &Value) -> Result<()> {
    if has_errors(errors) {
        anyhow::bail!("api-football returned errors: {}", errors);
    }
    Ok(())
}

pub fn parse_fixtures_response(json: &str) -> Result<Vec<ApiFixture>> {
    let envelope: Envelope<ApiFixture> =
        serde_json::from_str(json).context("failed to parse api-football fixtures")?;
    check_errors(&envelope.errors)?;
    Ok(envelope.response)
}

fn parse_odd(raw: &str) -> Result<f64> {
    raw.trim()
        .parse::<f64>()
        .with_context(|| format!("unparseable odd: {:?}", raw))
}

fn decode_odds(json: &str) -> Result<Envelope<OddsEntry>> {
    serde_json::from_str(json).context("failed to parse api-football odds")
}

/// Pick the preferred bookmaker (else the first) and map its bets into a book.
pub fn parse_odds_response(json: &str, bookmaker_id: u32) -> Result<MarketQuoteBook> {
    let envelope = decode_odds(json)?;
    check_errors(&envelope.errors)?;
    book_from_entries(&envelope.response, bookmaker_id)
}

/// Quotes for one fixture inside a poll. A failed request or an api-football
/// error envelope (quota, unknown fixture) leaves this fixture's book empty;
/// an unparseable odd or undecodable body still fails the poll.
pub fn fixture_quotes(
    fixture_id: u64,
    body: Result<String>,
    bookmaker_id: u32,
) -> Result<MarketQuoteBook> {
    let body = match body {
        Ok(body) => body,
        Err(e) => {
            tracing::warn!(fixture = fixture_id, error = %e, "odds fetch failed, continuing without quotes");
            return Ok(MarketQuoteBook::new());
        }
    };
    let envelope = decode_odds(&body)?;
    if has_errors(&envelope.errors) {
        tracing::warn!(
            fixture = fixture_id,
            errors = %envelope.errors,
            "api-football refused odds, continuing without quotes"
        );
        return Ok(MarketQuoteBook::new());
    }
    book_from_entries(&envelope.response, bookmaker_id)
}

fn book_from_entries(entries: &[OddsEntry], bookmaker_id: u32) -> Result<MarketQuoteBook> {
    let mut book = MarketQuoteBook::new();
    let Some(entry) = entries.first() else {
        return Ok(book);
    };
    let Some(bookie) = entry
        .bookmakers
        .iter()
        .find(|b| b.id == bookmaker_id)
        .or_else(|| entry.bookmakers.first())
    else {
        return Ok(book);
    };

    for bet in &bookie.bets {
        for v in &bet.values {
            // Values are usually strings; some markets send bare numbers.
            let label = match &v.value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            let odd = parse_odd(&v.odd)?;
            match (bet.id, label.as_str()) {
                (BET_MATCH_WINNER, "Home") => book.set_price(probability::HOME, odd),
                (BET_MATCH_WINNER, "Draw") => book.set_price(probability::DRAW, odd),
                (BET_MATCH_WINNER, "Away") => book.set_price(probability::AWAY, odd),
                (BET_DOUBLE_CHANCE, "Home/Draw") => book.set_price(probability::HOME_OR_DRAW, odd),
                (BET_DOUBLE_CHANCE, "Draw/Away") => book.set_price(probability::DRAW_OR_AWAY, odd),
                (BET_ASIAN_HANDICAP, _) => book.handicaps.push(HandicapQuote { label, odd }),
                (BET_GOALS_OVER_UNDER, _) => insert_goals(&mut book, &label, odd),
                _ => {}
            }
        }
    }
    Ok(book)
}

fn insert_goals(book: &mut MarketQuoteBook, label: &str, odd: f64) {
    let Some((side, line)) = label.split_once(' ') else {
        tracing::trace!(label, "skipping goals value without a line");
        return;
    };
    let Ok(line) = line.trim().parse::<f64>() else {
        tracing::trace!(label, "skipping goals value with non-numeric line");
        return;
    };
    let entry: &mut GoalsQuote = book.goals.entry(line.to_string()).or_default();
    match side {
        "Over" => entry.over = Some(odd),
        "Under" => entry.under = Some(odd),
        _ => {}
    }
}

/// Assemble a snapshot; the model is present only when both teams are rated.
pub fn build_snapshot(
    fixture: ApiFixture,
    quotes: MarketQuoteBook,
    ratings: Option<&LeagueRatings>,
) -> Result<MatchSnapshot> {
    let kickoff = parse_kickoff(&fixture.fixture.date)?;
    let home = fixture.teams.home.name;
    let away = fixture.teams.away.name;
    let model = ratings.and_then(|r| r.model_for(&home, &away));

    let snapshot = MatchSnapshot {
        id: fixture.fixture.id.to_string(),
        league: fixture.league.name,
        round: fixture.league.round.unwrap_or_default(),
        home_team: home,
        away_team: away,
        kickoff,
        status: fixture.fixture.status.short,
        elapsed: fixture.fixture.status.elapsed,
        score: Score {
            home: fixture.goals.home,
            away: fixture.goals.away,
        },
        has_model: model.is_some(),
        probabilities: model.unwrap_or_else(ProbabilityModel::new),
        quotes,
    };
    if !snapshot.has_model {
        tracing::debug!(matchup = %snapshot.matchup(), "no model for fixture");
    }
    Ok(snapshot)
}

pub struct ApiFootball {
    client: Client,
    api_key: String,
    base_url: String,
    league_id: u32,
    season: u32,
    upcoming: u32,
    bookmaker_id: u32,
    ratings: Option<LeagueRatings>,
}

impl ApiFootball {
    pub fn new(api_key: String, config: &FeedConfig, ratings: Option<LeagueRatings>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            client,
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            league_id: config.league_id,
            season: config.season,
            upcoming: config.upcoming,
            bookmaker_id: config.bookmaker_id,
            ratings,
        })
    }

    async fn get(&self, path_and_query: &str) -> Result<String> {
        let url = format!("{}/{}", self.base_url, path_and_query);
        let resp = self
            .client
            .get(&url)
            .header("x-apisports-key", &self.api_key)
            .send()
            .await
            .with_context(|| format!("api-football request failed: {}", path_and_query))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("api-football {} ({}): {}", path_and_query, status, body);
        }
        resp.text().await.context("failed to read api-football body")
    }

    async fn fetch_fixtures(&self) -> Result<Vec<ApiFixture>> {
        let mut fixtures = Vec::new();
        let mut seen = HashSet::new();
        for filter in ["live=all".to_string(), format!("next={}", self.upcoming)] {
            let path = format!(
                "fixtures?league={}&season={}&{}",
                self.league_id, self.season, filter
            );
            let body = self.get(&path).await?;
            for f in parse_fixtures_response(&body)? {
                if seen.insert(f.fixture.id) {
                    fixtures.push(f);
                }
            }
        }
        Ok(fixtures)
    }
}

#[async_trait]
impl MatchFeed for ApiFootball {
    async fn fetch_matches(&mut self) -> Result<Vec<MatchSnapshot>> {
        let fixtures = self.fetch_fixtures().await?;
        let mut snapshots = Vec::with_capacity(fixtures.len());

        for fixture in fixtures {
            let id = fixture.fixture.id;
            let body = self.get(&format!("odds?fixture={}", id)).await;
            let quotes = fixture_quotes(id, body, self.bookmaker_id)?;
            snapshots.push(build_snapshot(fixture, quotes, self.ratings.as_ref())?);
        }

        snapshots.sort_by_key(|m| m.kickoff);
        Ok(snapshots)
    }

    fn name(&self) -> &'static str {
        "api-football"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURES: &str = r#"{
        "errors": [],
        "response": [
            {
                "fixture": {"id": 1388412, "date": "2025-10-18T13:30:00+00:00",
                            "status": {"short": "2H", "elapsed": 63}},
                "league": {"id": 78, "name": "Bundesliga", "round": "Regular Season - 7"},
                "teams": {"home": {"id": 169, "name": "Eintracht Frankfurt"},
                          "away": {"id": 165, "name": "Borussia Dortmund"}},
                "goals": {"home": 1, "away": 0}
            },
            {
                "fixture": {"id": 1388413, "date": "2025-10-19T15:30:00+00:00",
                            "status": {"short": "NS", "elapsed": null}},
                "league": {"id": 78, "name": "Bundesliga", "round": "Regular Season - 7"},
                "teams": {"home": {"id": 180, "name": "1. FC Heidenheim"},
                          "away": {"id": 192, "name": "1. FC Köln"}},
                "goals": {"home": null, "away": null}
            }
        ]
    }"#;

    const ODDS: &str = r#"{
        "errors": [],
        "response": [{
            "bookmakers": [
                {"id": 8, "name": "Other", "bets": [
                    {"id": 1, "name": "Match Winner", "values": [{"value": "Home", "odd": "9.99"}]}
                ]},
                {"id": 1, "name": "10Bet", "bets": [
                    {"id": 1, "name": "Match Winner", "values": [
                        {"value": "Home", "odd": "2.05"},
                        {"value": "Draw", "odd": "3.60"},
                        {"value": "Away", "odd": "3.30"}
                    ]},
                    {"id": 12, "name": "Double Chance", "values": [
                        {"value": "Home/Draw", "odd": "1.35"},
                        {"value": "Home/Away", "odd": "1.28"},
                        {"value": "Draw/Away", "odd": "1.70"}
                    ]},
                    {"id": 4, "name": "Asian Handicap", "values": [
                        {"value": "Home -1", "odd": "3.10"},
                        {"value": "Away +1", "odd": "1.36"}
                    ]},
                    {"id": 5, "name": "Goals Over/Under", "values": [
                        {"value": "Over 2.5", "odd": "1.72"},
                        {"value": "Under 2.5", "odd": "2.10"},
                        {"value": "Over 3.5", "odd": "2.75"}
                    ]}
                ]}
            ]
        }]
    }"#;

    #[test]
    fn test_parse_fixtures() {
        let fixtures = parse_fixtures_response(FIXTURES).unwrap();
        assert_eq!(fixtures.len(), 2);
        assert_eq!(fixtures[0].fixture.status.short.as_deref(), Some("2H"));
        assert_eq!(fixtures[1].goals.home, None);
    }

    #[test]
    fn test_api_errors_fail_the_poll() {
        let json = r#"{"errors": {"token": "Error/Missing application key"}, "response": []}"#;
        assert!(parse_fixtures_response(json).is_err());
    }

    #[test]
    fn test_parse_odds_prefers_configured_bookmaker() {
        let book = parse_odds_response(ODDS, 1).unwrap();
        assert_eq!(book.price("1"), Some(2.05));
        assert_eq!(book.price("X"), Some(3.6));
        assert_eq!(book.price("1X"), Some(1.35));
        assert_eq!(book.price("X2"), Some(1.7));
        assert_eq!(book.handicaps.len(), 2);
        assert_eq!(book.handicaps[0].label, "Home -1");
        let g = book.goals_line(2.5).unwrap();
        assert_eq!((g.over, g.under), (Some(1.72), Some(2.1)));
        assert_eq!(book.goals_line(3.5).unwrap().under, None);
    }

    #[test]
    fn test_parse_odds_falls_back_to_first_bookmaker() {
        let book = parse_odds_response(ODDS, 999).unwrap();
        assert_eq!(book.price("1"), Some(9.99));
        assert_eq!(book.price("X"), None);
    }

    #[test]
    fn test_parse_odds_empty_response() {
        let book = parse_odds_response(r#"{"errors": [], "response": []}"#, 1).unwrap();
        assert!(book.is_empty());
    }

    #[test]
    fn test_refused_odds_leave_fixture_unquoted() {
        let quota = r#"{"errors": {"requests": "You have reached the request limit for the day"},
                        "response": []}"#;
        assert!(parse_odds_response(quota, 1).is_err());

        let book = fixture_quotes(1388412, Ok(quota.to_string()), 1).unwrap();
        assert!(book.is_empty());
        let book = fixture_quotes(1388412, Err(anyhow::anyhow!("timed out")), 1).unwrap();
        assert!(book.is_empty());

        let fixture = parse_fixtures_response(FIXTURES).unwrap().remove(0);
        let snapshot = build_snapshot(fixture, book, None).unwrap();
        assert_eq!(snapshot.id, "1388412");
        assert!(snapshot.quotes.is_empty());
    }

    #[test]
    fn test_fixture_quotes_still_fails_on_bad_odd() {
        let json = r#"{"errors": [], "response": [{"bookmakers": [{"id": 1, "bets": [
            {"id": 1, "values": [{"value": "Home", "odd": "n/a"}]}]}]}]}"#;
        assert!(fixture_quotes(7, Ok(json.to_string()), 1).is_err());
        assert_eq!(
            fixture_quotes(7, Ok(ODDS.to_string()), 1).unwrap().price("1"),
            Some(2.05)
        );
    }

    #[test]
    fn test_unparseable_odd_fails() {
        let json = r#"{"response": [{"bookmakers": [{"id": 1, "bets": [
            {"id": 1, "values": [{"value": "Home", "odd": "n/a"}]}]}]}]}"#;
        assert!(parse_odds_response(json, 1).is_err());
    }

    #[test]
    fn test_build_snapshot_with_and_without_ratings() {
        let ratings = LeagueRatings::parse(
            r#"
            avg_home_goals = 1.7
            avg_away_goals = 1.4
            [aliases]
            "Borussia Dortmund" = "Dortmund"
            [teams."Eintracht Frankfurt"]
            att_home = 1.1
            def_home = 1.0
            att_away = 1.0
            def_away = 1.1
            [teams."Dortmund"]
            att_home = 1.2
            def_home = 0.9
            att_away = 1.1
            def_away = 1.0
            "#,
        )
        .unwrap();

        let mut fixtures = parse_fixtures_response(FIXTURES).unwrap().into_iter();
        let live = build_snapshot(fixtures.next().unwrap(), MarketQuoteBook::new(), Some(&ratings)).unwrap();
        assert!(live.has_model);
        assert!(live.probabilities.get("1").is_some());
        assert_eq!(live.score, Score::new(1, 0));
        assert!(live.lifecycle().is_live());

        let unrated = build_snapshot(fixtures.next().unwrap(), MarketQuoteBook::new(), Some(&ratings)).unwrap();
        assert!(!unrated.has_model);
        assert!(unrated.probabilities.is_empty());
        assert_eq!(unrated.id, "1388413");
    }
}
