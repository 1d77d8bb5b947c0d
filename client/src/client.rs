use std::{future::Future, time::Duration};

use minesweeper_common::{
    models::{Difficulty, LeaderboardEntry, NewLeaderboardEntry},
    protocol::ErrorResponse,
};
use reqwest::{Client, Response};
use tracing::{debug, instrument};
use url::Url;

use crate::Result;

/// Where finished games are recorded and ranked.
pub trait LeaderboardStore: Send + Sync + 'static {
    /// Records a won game, returning the stored entry.
    fn submit(
        &self,
        entry: NewLeaderboardEntry,
    ) -> impl Future<Output = Result<LeaderboardEntry>> + Send;

    /// Fastest ten entries for a difficulty and board size.
    fn query(
        &self,
        difficulty: Difficulty,
        board_size: u8,
    ) -> impl Future<Output = Result<Vec<LeaderboardEntry>>> + Send;
}

/// HTTP client for the leaderboard server API
#[derive(Clone, Debug)]
pub struct LeaderboardClient {
    client: Client,
    base_url: Url,
}

impl LeaderboardClient {
    /// Create a new client connecting to the specified server URL
    pub fn new(base_url: &str) -> Result<Self> {
        Self::with_timeout(base_url, Duration::from_secs(10))
    }

    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self> {
        let base_url = Url::parse(base_url)?;
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self { client, base_url })
    }

    /// URL of the leaderboard resource, optionally filtered.
    pub fn leaderboard_url(&self, filter: Option<(Difficulty, u8)>) -> Result<Url> {
        let mut url = self.base_url.join("/api/leaderboard")?;
        if let Some((difficulty, board_size)) = filter {
            url.query_pairs_mut()
                .append_pair("difficulty", difficulty.as_str())
                .append_pair("boardSize", &board_size.to_string());
        }
        Ok(url)
    }
}

async fn check_status(response: Response, action: &str) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let reason = match serde_json::from_str::<ErrorResponse>(&body) {
        Ok(error) if error.details.is_empty() => error.error,
        Ok(error) => format!("{}: {}", error.error, error.details.join("; ")),
        Err(_) if !body.trim().is_empty() => body,
        Err(_) => status.canonical_reason().unwrap_or("unknown error").to_string(),
    };
    Err(format!("Failed to {}: {} ({})", action, status, reason).into())
}

impl LeaderboardStore for LeaderboardClient {
    #[instrument(level = "trace", skip(self))]
    async fn submit(&self, entry: NewLeaderboardEntry) -> Result<LeaderboardEntry> {
        let url = self.leaderboard_url(None)?;
        debug!("Submitting leaderboard entry to {}", url);

        let response = self.client.post(url).json(&entry).send().await?;
        let response = check_status(response, "add leaderboard entry").await?;

        Ok(response.json().await?)
    }

    #[instrument(level = "trace", skip(self))]
    async fn query(&self, difficulty: Difficulty, board_size: u8) -> Result<Vec<LeaderboardEntry>> {
        let url = self.leaderboard_url(Some((difficulty, board_size)))?;
        debug!("Fetching leaderboard from {}", url);

        let response = self.client.get(url).send().await?;
        let response = check_status(response, "fetch leaderboard").await?;

        Ok(response.json().await?)
    }
}
