//! League strength table used to derive expected goals for a fixture.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

use super::poisson;
use super::probability::ProbabilityModel;

#[derive(Debug, Clone, Deserialize)]
pub struct TeamRating {
    pub att_home: f64,
    pub def_home: f64,
    pub att_away: f64,
    pub def_away: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LeagueRatings {
    pub avg_home_goals: f64,
    pub avg_away_goals: f64,
    #[serde(default)]
    pub aliases: HashMap<String, String>,
    #[serde(default)]
    pub teams: HashMap<String, TeamRating>,
}

/// Loose team-name key: lowercase with common club prefixes/suffixes removed.
/// "1. FC Köln" and "FC Köln" both become "köln".
pub fn normalize_name(name: &str) -> String {
    let mut s = name.to_lowercase();
    for noise in ["fc ", " 04", "sv ", "borussia ", " 05", "1. "] {
        s = s.replace(noise, "");
    }
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

impl LeagueRatings {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read ratings file: {}", path.display()))?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse ratings TOML")
    }

    /// Resolve a feed team name: alias table, exact name, then loose match.
    pub fn team(&self, name: &str) -> Option<&TeamRating> {
        let mapped = self.aliases.get(name).map(String::as_str).unwrap_or(name);
        if let Some(rating) = self.teams.get(mapped) {
            return Some(rating);
        }
        let wanted = normalize_name(name);
        self.teams
            .iter()
            .find(|(k, _)| normalize_name(k) == wanted)
            .map(|(_, rating)| rating)
    }

    /// `(xg_home, xg_away)`, or `None` if either side is unrated.
    pub fn expected_goals(&self, home: &str, away: &str) -> Option<(f64, f64)> {
        let h = self.team(home)?;
        let a = self.team(away)?;
        let xg_home = h.att_home * a.def_away * self.avg_home_goals;
        let xg_away = a.att_away * h.def_home * self.avg_away_goals;
        Some((xg_home, xg_away))
    }

    pub fn model_for(&self, home: &str, away: &str) -> Option<ProbabilityModel> {
        let (xg_home, xg_away) = self.expected_goals(home, away)?;
        poisson::outcome_model(xg_home, xg_away)
    }
}
