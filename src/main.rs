use anyhow::{Context, Result};
use chrono::Utc;
use edgelock::config::{Config, FeedProvider};
use edgelock::engine::ratings::LeagueRatings;
use edgelock::feed::{
    api_football::ApiFootball, edges_json::EdgesJsonFeed, simulated::SimulatedFeed, MatchFeed,
};
use edgelock::pipeline::{self, OddsOverrides, SnapshotStore, StakeContext};
use std::path::Path;
use std::time::Duration;

/// `--override <match_id>:<outcome_code>=<odds>`, repeatable.
fn parse_overrides(args: &[String]) -> Result<OddsOverrides> {
    let mut overrides = OddsOverrides::new();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        if arg != "--override" {
            continue;
        }
        let raw = iter.next().context("--override needs <match_id>:<code>=<odds>")?;
        let (key, odds) = raw
            .split_once('=')
            .with_context(|| format!("bad override {:?}: missing '='", raw))?;
        let (match_id, code) = key
            .split_once(':')
            .with_context(|| format!("bad override {:?}: missing ':'", raw))?;
        let odds: f64 = odds
            .parse()
            .with_context(|| format!("bad override {:?}: odds not a number", raw))?;
        overrides.set(match_id, code, odds);
    }
    Ok(overrides)
}

fn load_ratings(config: &Config) -> Result<Option<LeagueRatings>> {
    match &config.model.ratings_path {
        Some(path) => Ok(Some(LeagueRatings::load(path)?)),
        None => {
            tracing::warn!("no ratings_path configured, every match will be unmodeled");
            Ok(None)
        }
    }
}

fn build_feed(config: &Config, sim_mode: bool) -> Result<Box<dyn MatchFeed>> {
    let provider = if sim_mode {
        FeedProvider::Simulated
    } else {
        config.feed.provider
    };
    let feed: Box<dyn MatchFeed> = match provider {
        FeedProvider::Simulated => Box::new(SimulatedFeed::new(&config.feed.league_name, None)),
        FeedProvider::EdgesJson => Box::new(EdgesJsonFeed::new(
            &config.feed.base_url,
            config.feed.request_timeout_ms,
        )?),
        FeedProvider::ApiFootball => {
            let api_key = Config::football_api_key()?;
            Box::new(ApiFootball::new(api_key, &config.feed, load_ratings(config)?)?)
        }
    };
    Ok(feed)
}

#[tokio::main]
async fn main() -> Result<()> {
    let log_file = std::fs::File::create("edgelock.log")?;
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("edgelock=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(log_file)
        .init();

    let args: Vec<String> = std::env::args().collect();
    let sim_mode = args.iter().any(|arg| arg == "--simulate");
    let json_mode = args.iter().any(|arg| arg == "--json");
    let once = args.iter().any(|arg| arg == "--once");
    let overrides = parse_overrides(&args)?;

    let config = Config::load(Path::new("config.toml"))?;

    // Load saved keys from .env (real env vars take precedence)
    Config::load_env_file();

    if !json_mode {
        println!();
        println!("  Edgelock v0.1.0");
        println!("  ===============");
        if sim_mode {
            println!("  ** SIMULATION MODE **");
        }
        println!();
    }

    let mut feed = build_feed(&config, sim_mode)?;
    let ctx = StakeContext::from(&config.stake);
    let offset = config.display.offset();
    let mut store = SnapshotStore::new();

    tracing::info!(
        feed = feed.name(),
        bankroll = ctx.bankroll,
        kelly_multiplier = ctx.kelly_multiplier,
        poll_interval_s = config.feed.poll_interval_s,
        "starting"
    );

    let mut interval = tokio::time::interval(Duration::from_secs(config.feed.poll_interval_s));
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = interval.tick() => {}
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("shutting down");
                break;
            }
        }

        let replaced = store.apply(feed.fetch_matches().await);
        let board = pipeline::build_board(
            store.matches(),
            &overrides,
            ctx,
            config.display.grouping,
            Utc::now(),
            offset,
        );

        tracing::info!(
            matches = board.match_count(),
            value_lines = board.matches().map(|m| m.value_lines().count()).sum::<usize>(),
            fresh = replaced,
            accepted = store.accepted_polls(),
            rejected = store.rejected_polls(),
            "board built"
        );

        if json_mode {
            println!("{}", serde_json::to_string(&board)?);
        } else {
            if let Some(err) = store.last_error() {
                println!("  (last poll rejected: {}; showing previous matches)", err);
            }
            print!("{}", board);
            println!();
        }

        if once {
            break;
        }
    }

    Ok(())
}
