//! Per-poll transformation from feed snapshots to the evaluated board.
//!
//! Nothing here outlives a call except `SnapshotStore`, which only keeps the
//! last good poll. Bankroll and overrides come in with every call.

use crate::config::{Grouping, StakeConfig};
use crate::engine::edge::{self, EdgeAssessment, Signal, Verdict};
use crate::engine::grouping::{self, Group};
use crate::engine::kelly::{self, StakePlan};
use crate::engine::lifecycle::{Elapsed, Lifecycle};
use crate::engine::markets::{self, MarketKind, Side};
use crate::feed::types::MatchSnapshot;
use anyhow::Result;
use chrono::{DateTime, FixedOffset, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StakeContext {
    pub bankroll: f64,
    pub kelly_multiplier: f64,
}

impl From<&StakeConfig> for StakeContext {
    fn from(cfg: &StakeConfig) -> Self {
        Self {
            bankroll: cfg.bankroll,
            kelly_multiplier: cfg.kelly_multiplier,
        }
    }
}

/// User-entered prices keyed by (match id, outcome code). They replace the
/// feed quote for that line only and never touch the snapshot.
#[derive(Debug, Clone, Default)]
pub struct OddsOverrides {
    quotes: HashMap<(String, String), f64>,
}

impl OddsOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, match_id: &str, outcome_code: &str, odds: f64) {
        self.quotes
            .insert((match_id.to_string(), outcome_code.to_string()), odds);
    }

    pub fn get(&self, match_id: &str, outcome_code: &str) -> Option<f64> {
        self.quotes
            .get(&(match_id.to_string(), outcome_code.to_string()))
            .copied()
    }

    pub fn is_empty(&self) -> bool {
        self.quotes.is_empty()
    }
}

/// Last good poll. Each successful poll replaces the whole set; a failed
/// poll leaves it untouched.
#[derive(Debug, Default)]
pub struct SnapshotStore {
    matches: Vec<MatchSnapshot>,
    accepted: u64,
    rejected: u64,
    last_error: Option<String>,
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if the poll replaced the working set.
    pub fn apply(&mut self, poll: Result<Vec<MatchSnapshot>>) -> bool {
        match poll {
            Ok(matches) => {
                tracing::debug!(count = matches.len(), "poll accepted");
                self.matches = matches;
                self.accepted += 1;
                self.last_error = None;
                true
            }
            Err(e) => {
                self.rejected += 1;
                tracing::warn!(
                    error = %e,
                    rejected = self.rejected,
                    kept = self.matches.len(),
                    "poll rejected, keeping previous matches"
                );
                self.last_error = Some(format!("{:#}", e));
                false
            }
        }
    }

    pub fn matches(&self) -> &[MatchSnapshot] {
        &self.matches
    }

    pub fn accepted_polls(&self) -> u64 {
        self.accepted
    }

    pub fn rejected_polls(&self) -> u64 {
        self.rejected
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineView {
    pub market: MarketKind,
    pub outcome_code: String,
    pub label: String,
    pub side: Option<Side>,
    pub is_hedge: bool,
    /// The quote came from `OddsOverrides`, not the feed.
    pub overridden: bool,
    pub signal: Signal,
    pub stake: Option<StakePlan>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchView {
    pub id: String,
    pub league: String,
    pub round: String,
    pub home_team: String,
    pub away_team: String,
    pub kickoff: DateTime<Utc>,
    pub lifecycle: Lifecycle,
    pub has_model: bool,
    pub lines: Vec<LineView>,
}

impl MatchView {
    pub fn assessments(&self) -> impl Iterator<Item = &EdgeAssessment> {
        self.lines.iter().filter_map(|l| l.signal.assessment())
    }

    pub fn stakes(&self) -> impl Iterator<Item = &StakePlan> {
        self.lines.iter().filter_map(|l| l.stake.as_ref())
    }

    pub fn value_lines(&self) -> impl Iterator<Item = &LineView> {
        self.lines.iter().filter(|l| {
            l.signal
                .assessment()
                .is_some_and(|a| a.verdict == Verdict::Value)
        })
    }
}

/// Evaluate every visible line of one match. A match without a model
/// yields no lines at all.
pub fn evaluate_match(
    snapshot: &MatchSnapshot,
    overrides: &OddsOverrides,
    ctx: StakeContext,
) -> MatchView {
    let lines = if snapshot.has_model {
        evaluate_lines(snapshot, overrides, ctx)
    } else {
        Vec::new()
    };

    MatchView {
        id: snapshot.id.clone(),
        league: snapshot.league.clone(),
        round: snapshot.round.clone(),
        home_team: snapshot.home_team.clone(),
        away_team: snapshot.away_team.clone(),
        kickoff: snapshot.kickoff,
        lifecycle: snapshot.lifecycle(),
        has_model: snapshot.has_model,
        lines,
    }
}

fn evaluate_lines(
    snapshot: &MatchSnapshot,
    overrides: &OddsOverrides,
    ctx: StakeContext,
) -> Vec<LineView> {
    let mut lines = markets::expand(&snapshot.probabilities, &snapshot.quotes);
    let mut overridden = vec![false; lines.len()];
    if !overrides.is_empty() {
        for (line, flag) in lines.iter_mut().zip(overridden.iter_mut()) {
            if let Some(odds) = overrides.get(&snapshot.id, &line.outcome_code) {
                line.quoted_odds = Some(odds).filter(|o| *o > 0.0);
                *flag = true;
            }
        }
        if overridden.iter().any(|f| *f) {
            markets::mark_hedges(&mut lines);
        }
    }

    lines
        .into_iter()
        .zip(overridden)
        .map(|(line, overridden)| {
            let signal = edge::assess(&line.outcome_code, line.probability, line.quoted_odds);
            let stake = signal
                .assessment()
                .and_then(|a| kelly::plan_stake(a, ctx.bankroll, ctx.kelly_multiplier));
            LineView {
                market: line.market,
                outcome_code: line.outcome_code,
                label: line.label,
                side: line.side,
                is_hedge: line.is_hedge,
                overridden,
                signal,
                stake,
            }
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Board {
    pub generated_at: DateTime<Utc>,
    pub groups: Vec<Group<MatchView>>,
}

impl Board {
    pub fn match_count(&self) -> usize {
        self.groups.iter().map(|g| g.items.len()).sum()
    }

    pub fn matches(&self) -> impl Iterator<Item = &MatchView> {
        self.groups.iter().flat_map(|g| g.items.iter())
    }
}

/// Evaluate a poll and group it, keeping the feed's match order.
pub fn build_board(
    snapshots: &[MatchSnapshot],
    overrides: &OddsOverrides,
    ctx: StakeContext,
    mode: Grouping,
    now: DateTime<Utc>,
    offset: FixedOffset,
) -> Board {
    let views = snapshots.iter().map(|s| evaluate_match(s, overrides, ctx));
    let groups = match mode {
        Grouping::Date => grouping::group_by(views, |v| grouping::date_bucket(v.kickoff, now, offset)),
        Grouping::LeagueRound => {
            grouping::group_by(views, |v| grouping::league_round_label(&v.league, &v.round))
        }
    };
    Board {
        generated_at: now,
        groups,
    }
}

fn status_text(lifecycle: &Lifecycle) -> String {
    match lifecycle {
        Lifecycle::Prematch { kickoff } => kickoff.format("%H:%M UTC").to_string(),
        Lifecycle::Live { elapsed, score, .. } => {
            let clock = match elapsed {
                Elapsed::Minute(m) => format!("{}'", m),
                Elapsed::HalfTime => "HT".to_string(),
                Elapsed::Penalties => "PEN".to_string(),
                Elapsed::Unknown => "LIVE".to_string(),
            };
            format!("{} {}-{}", clock, score.home.unwrap_or(0), score.away.unwrap_or(0))
        }
        Lifecycle::Finished { score } => {
            format!("FT {}-{}", score.home.unwrap_or(0), score.away.unwrap_or(0))
        }
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for group in &self.groups {
            writeln!(f, "== {} ==", group.label)?;
            for m in &group.items {
                writeln!(
                    f,
                    "  {:<12} {} vs {}",
                    status_text(&m.lifecycle),
                    m.home_team,
                    m.away_team
                )?;
                if !m.has_model {
                    writeln!(f, "      (no model)")?;
                    continue;
                }
                for line in m.value_lines() {
                    let Some(a) = line.signal.assessment() else {
                        continue;
                    };
                    let stake = line.stake.as_ref().map_or(0.0, |s| s.recommended_amount);
                    writeln!(
                        f,
                        "      {:<10} @ {:<5.2} p={:>5.1}% edge={:+.1}% stake={:.2}{}{}",
                        line.label,
                        a.quoted_odds,
                        a.probability,
                        a.edge * 100.0,
                        stake,
                        if a.risky { " risky" } else { "" },
                        if line.is_hedge { " hedge" } else { "" },
                    )?;
                }
            }
        }
        Ok(())
    }
}
