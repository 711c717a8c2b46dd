use super::types::{parse_feed, MatchSnapshot};
use super::MatchFeed;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

/// Polls an upstream service that already serves the normalized match list.
pub struct EdgesJsonFeed {
    client: Client,
    url: String,
}

impl EdgesJsonFeed {
    pub fn new(url: &str, timeout_ms: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            client,
            url: url.to_string(),
        })
    }
}

#[async_trait]
impl MatchFeed for EdgesJsonFeed {
    async fn fetch_matches(&mut self) -> Result<Vec<MatchSnapshot>> {
        let resp = self
            .client
            .get(&self.url)
            .send()
            .await
            .with_context(|| format!("edges request failed: {}", self.url))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("edges endpoint returned {}: {}", status, body);
        }

        let body = resp.text().await.context("failed to read edges body")?;
        let mut matches = parse_feed(&body)?;
        matches.sort_by_key(|m| m.kickoff);
        Ok(matches)
    }

    fn name(&self) -> &'static str {
        "edges-json"
    }
}
