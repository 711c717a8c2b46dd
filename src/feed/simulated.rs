//! Offline feed for `--simulate` runs.
//!
//! Generates a fixed slate of fixtures with a Poisson model per match, quotes
//! jittered around the model's fair price, and a compressed match clock so
//! games move from prematch to live to finished across polls.

use super::types::MatchSnapshot;
use super::MatchFeed;
use crate::engine::lifecycle::Score;
use crate::engine::markets::GOALS_LINES;
use crate::engine::quotes::{GoalsQuote, HandicapQuote, MarketQuoteBook};
use crate::engine::{poisson, probability, ProbabilityModel};
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Simulated minutes that pass per poll.
const MINUTES_PER_POLL: i64 = 15;
const BOOK_MARGIN: f64 = 1.06;
const QUOTE_JITTER: f64 = 0.08;

const SLATE: [(&str, &str, i64); 6] = [
    ("Bayern Munich", "Borussia Dortmund", -40),
    ("Bayer Leverkusen", "RB Leipzig", 0),
    ("Eintracht Frankfurt", "VfB Stuttgart", 45),
    ("SC Freiburg", "1. FC Union Berlin", 150),
    ("VfL Wolfsburg", "Werder Bremen", 24 * 60 + 30),
    ("FC Augsburg", "1. FC Heidenheim", 24 * 60 + 150),
];

struct SimFixture {
    id: u64,
    home: &'static str,
    away: &'static str,
    kickoff: DateTime<Utc>,
    xg_home: f64,
    xg_away: f64,
    score: Score,
}

pub struct SimulatedFeed {
    rng: StdRng,
    league: String,
    start: DateTime<Utc>,
    polls: i64,
    fixtures: Vec<SimFixture>,
}

impl SimulatedFeed {
    pub fn new(league: &str, seed: Option<u64>) -> Self {
        let mut rng = match seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_entropy(),
        };
        let start = Utc::now();
        let fixtures = SLATE
            .iter()
            .enumerate()
            .map(|(i, &(home, away, offset_min))| SimFixture {
                id: 9_000_001 + i as u64,
                home,
                away,
                kickoff: start + Duration::minutes(offset_min),
                xg_home: rng.gen_range(0.9..2.3),
                xg_away: rng.gen_range(0.7..1.9),
                score: Score::default(),
            })
            .collect();

        Self {
            rng,
            league: league.to_string(),
            start,
            polls: 0,
            fixtures,
        }
    }

    fn clock(&self) -> DateTime<Utc> {
        self.start + Duration::minutes(self.polls * MINUTES_PER_POLL)
    }

    fn jittered(&mut self, probability_pct: f64) -> Option<f64> {
        if probability_pct <= 0.0 {
            return None;
        }
        let fair = 100.0 / probability_pct;
        let jitter = self.rng.gen_range(-QUOTE_JITTER..QUOTE_JITTER);
        let odds = (fair / BOOK_MARGIN) * (1.0 + jitter);
        Some((odds.max(1.01) * 100.0).round() / 100.0)
    }

    fn quote_book(&mut self, model: &ProbabilityModel) -> MarketQuoteBook {
        let mut book = MarketQuoteBook::new();
        for code in [
            probability::HOME,
            probability::DRAW,
            probability::AWAY,
            probability::HOME_OR_DRAW,
            probability::DRAW_OR_AWAY,
        ] {
            if let Some(odd) = model.get(code).and_then(|p| self.jittered(p)) {
                book.set_price(code, odd);
            }
        }

        for (home_line, away_line) in [("-1", "+1"), ("-0.5", "+0.5"), ("0", "0")] {
            for (label, code) in [
                (format!("Home {}", home_line), format!("Home{}", home_line)),
                (format!("Away {}", away_line), format!("Away{}", away_line)),
            ] {
                if let Some(odd) = model.get(&code).and_then(|p| self.jittered(p)) {
                    book.handicaps.push(HandicapQuote { label, odd });
                }
            }
        }

        for line in GOALS_LINES {
            let over = model
                .get(&probability::over_code(line))
                .and_then(|p| self.jittered(p));
            let under = model
                .get(&probability::under_code(line))
                .and_then(|p| self.jittered(p));
            book.goals.insert(line.to_string(), GoalsQuote { over, under });
        }
        book
    }

    /// Advance one fixture to `clock`, returning `(status, elapsed)`.
    fn advance(&mut self, idx: usize, clock: DateTime<Utc>) -> (String, Option<u16>) {
        let minutes = (clock - self.fixtures[idx].kickoff).num_minutes();
        let (status, elapsed) = match minutes {
            m if m < 0 => ("NS", None),
            m if m < 45 => ("1H", Some(m as u16)),
            m if m < 60 => ("HT", None),
            m if m < 105 => ("2H", Some((m - 15) as u16)),
            _ => ("FT", None),
        };

        if matches!(status, "1H" | "2H") {
            let share = MINUTES_PER_POLL as f64 / 90.0;
            let f = &self.fixtures[idx];
            let (p_home, p_away) = (f.xg_home * share, f.xg_away * share);
            let home_scores = self.rng.gen_bool(p_home.clamp(0.0, 1.0));
            let away_scores = self.rng.gen_bool(p_away.clamp(0.0, 1.0));
            let score = &mut self.fixtures[idx].score;
            if home_scores {
                score.home = Some(score.home.unwrap_or(0) + 1);
            }
            if away_scores {
                score.away = Some(score.away.unwrap_or(0) + 1);
            }
        }
        if status != "NS" {
            let score = &mut self.fixtures[idx].score;
            score.home.get_or_insert(0);
            score.away.get_or_insert(0);
        }
        (status.to_string(), elapsed)
    }
}

#[async_trait]
impl MatchFeed for SimulatedFeed {
    async fn fetch_matches(&mut self) -> Result<Vec<MatchSnapshot>> {
        let clock = self.clock();
        self.polls += 1;

        let mut snapshots = Vec::with_capacity(self.fixtures.len());
        for idx in 0..self.fixtures.len() {
            let (status, elapsed) = self.advance(idx, clock);
            let f = &self.fixtures[idx];
            let (xg_home, xg_away) = (f.xg_home, f.xg_away);
            let model = poisson::outcome_model(xg_home, xg_away);
            let quotes = match &model {
                Some(m) if status != "FT" => self.quote_book(m),
                _ => MarketQuoteBook::new(),
            };

            let f = &self.fixtures[idx];
            snapshots.push(MatchSnapshot {
                id: f.id.to_string(),
                league: self.league.clone(),
                round: "Simulated Round".to_string(),
                home_team: f.home.to_string(),
                away_team: f.away.to_string(),
                kickoff: f.kickoff,
                status: Some(status),
                elapsed,
                score: f.score,
                has_model: model.is_some(),
                probabilities: model.unwrap_or_default(),
                quotes,
            });
        }

        snapshots.sort_by_key(|m| m.kickoff);
        tracing::debug!(poll = self.polls, matches = snapshots.len(), "simulated poll");
        Ok(snapshots)
    }

    fn name(&self) -> &'static str {
        "simulated"
    }
}
