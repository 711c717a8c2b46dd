use anyhow::{Context, Result};
use chrono::{FixedOffset, Offset, Utc};
use serde::Deserialize;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::engine::kelly::DEFAULT_KELLY_MULTIPLIER;

const ENV_FILE: &str = ".env";
const API_KEY_VAR: &str = "FOOTBALL_API_KEY";

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub stake: StakeConfig,
    pub feed: FeedConfig,
    #[serde(default)]
    pub display: DisplayConfig,
    #[serde(default)]
    pub model: ModelConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StakeConfig {
    #[serde(default = "default_bankroll")]
    pub bankroll: f64,
    #[serde(default = "default_kelly_multiplier")]
    pub kelly_multiplier: f64,
}

fn default_bankroll() -> f64 { 1000.0 }
fn default_kelly_multiplier() -> f64 { DEFAULT_KELLY_MULTIPLIER }

impl Default for StakeConfig {
    fn default() -> Self {
        Self {
            bankroll: default_bankroll(),
            kelly_multiplier: default_kelly_multiplier(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum FeedProvider {
    ApiFootball,
    EdgesJson,
    Simulated,
}

#[derive(Debug, Deserialize, Clone)]
pub struct FeedConfig {
    pub provider: FeedProvider,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_league_id")]
    pub league_id: u32,
    #[serde(default = "default_league_name")]
    pub league_name: String,
    #[serde(default = "default_season")]
    pub season: u32,
    /// Number of upcoming fixtures requested per poll.
    #[serde(default = "default_upcoming")]
    pub upcoming: u32,
    #[serde(default = "default_bookmaker_id")]
    pub bookmaker_id: u32,
    #[serde(default = "default_poll_interval")]
    pub poll_interval_s: u64,
    #[serde(default = "default_timeout")]
    pub request_timeout_ms: u64,
}

fn default_base_url() -> String { "https://v3.football.api-sports.io".to_string() }
fn default_league_id() -> u32 { 78 }
fn default_league_name() -> String { "Bundesliga".to_string() }
fn default_season() -> u32 { 2025 }
fn default_upcoming() -> u32 { 30 }
fn default_bookmaker_id() -> u32 { 1 }
fn default_poll_interval() -> u64 { 60 }
fn default_timeout() -> u64 { 10_000 }

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum Grouping {
    #[default]
    Date,
    LeagueRound,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct DisplayConfig {
    /// Calendar used for Today/Tomorrow buckets, minutes east of UTC.
    #[serde(default)]
    pub utc_offset_minutes: i32,
    #[serde(default)]
    pub grouping: Grouping,
}

impl DisplayConfig {
    /// Falls back to UTC for an out-of-range offset.
    pub fn offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.utc_offset_minutes.saturating_mul(60))
            .unwrap_or_else(|| Utc.fix())
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct ModelConfig {
    pub ratings_path: Option<PathBuf>,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| "Failed to parse config TOML")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.stake.bankroll >= 0.0) {
            anyhow::bail!("stake.bankroll must be >= 0 (got {})", self.stake.bankroll);
        }
        if !(self.stake.kelly_multiplier > 0.0 && self.stake.kelly_multiplier <= 1.0) {
            anyhow::bail!(
                "stake.kelly_multiplier must be in (0, 1] (got {})",
                self.stake.kelly_multiplier
            );
        }
        if self.feed.poll_interval_s == 0 {
            anyhow::bail!("feed.poll_interval_s must be positive");
        }
        Ok(())
    }

    /// Load `.env` into the process environment. Real env vars take precedence.
    pub fn load_env_file() {
        let Ok(content) = std::fs::read_to_string(ENV_FILE) else {
            return;
        };
        let content = content.strip_prefix('\u{feff}').unwrap_or(&content);
        for line in content.lines().map(str::trim) {
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let key = key.trim();
            let value = value.trim().trim_matches('"').trim_matches('\'');
            if std::env::var(key).is_err() {
                std::env::set_var(key, value);
            }
        }
    }

    /// api-football key from the environment, or prompted and saved to `.env`.
    pub fn football_api_key() -> Result<String> {
        match std::env::var(API_KEY_VAR) {
            Ok(key) if !key.trim().is_empty() => Ok(key.trim().to_string()),
            _ => {
                let key = prompt("api-football key")?;
                save_env_var(API_KEY_VAR, &key);
                Ok(key)
            }
        }
    }
}

fn prompt(label: &str) -> Result<String> {
    print!("  {} > ", label);
    io::stdout().flush()?;
    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    let value = input.trim().to_string();
    if value.is_empty() {
        anyhow::bail!("{} cannot be empty", label);
    }
    Ok(value)
}

fn save_env_var(key: &str, value: &str) {
    std::env::set_var(key, value);
    let mut contents = std::fs::read_to_string(ENV_FILE).unwrap_or_default();
    if !contents.is_empty() && !contents.ends_with('\n') {
        contents.push('\n');
    }
    contents.push_str(&format!("{}={}\n", key, value));
    if let Err(e) = std::fs::write(ENV_FILE, contents) {
        tracing::warn!(error = %e, "could not save {} to {}", key, ENV_FILE);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_parses() {
        let config = Config::load(Path::new("config.toml")).unwrap();
        assert_eq!(config.feed.provider, FeedProvider::ApiFootball);
        assert_eq!(config.feed.league_id, 78);
        assert_eq!(config.feed.poll_interval_s, 60);
        assert_eq!(config.stake.kelly_multiplier, 0.25);
        assert!(config.model.ratings_path.is_some());
    }

    #[test]
    fn test_defaults_from_minimal_config() {
        let config: Config = toml::from_str("[feed]\nprovider = \"simulated\"\n").unwrap();
        assert_eq!(config.feed.provider, FeedProvider::Simulated);
        assert_eq!(config.stake.bankroll, 1000.0);
        assert_eq!(config.display.grouping, Grouping::Date);
        assert_eq!(config.display.offset(), Utc.fix());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_bad_stake_settings() {
        let mut config: Config = toml::from_str("[feed]\nprovider = \"edges-json\"\n").unwrap();
        config.stake.kelly_multiplier = 0.0;
        assert!(config.validate().is_err());
        config.stake.kelly_multiplier = 0.5;
        config.stake.bankroll = -10.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_display_offset() {
        let display = DisplayConfig {
            utc_offset_minutes: 120,
            grouping: Grouping::LeagueRound,
        };
        assert_eq!(display.offset().local_minus_utc(), 7200);
    }
}
