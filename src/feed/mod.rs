pub mod api_football;
pub mod edges_json;
pub mod simulated;
pub mod types;

use anyhow::Result;
use async_trait::async_trait;
use types::MatchSnapshot;

/// A source of complete match snapshots. Each call returns the full working
/// set for one poll; nothing is merged across polls.
#[async_trait]
pub trait MatchFeed: Send + Sync {
    async fn fetch_matches(&mut self) -> Result<Vec<MatchSnapshot>>;
    fn name(&self) -> &'static str;
}
