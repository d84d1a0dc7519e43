use crate::state::messages::{NetworkRequest, NetworkResponse};
use espn_feed::{FreshnessCache, LiveResource, parse_scoreboard};
use log::{debug, error, warn};
use tokio::sync::mpsc;

/// Serves scoreboard requests through the shared freshness cache.
pub struct NetworkWorker {
    cache: FreshnessCache,
    scoreboard: LiveResource,
    requests: mpsc::Receiver<NetworkRequest>,
    responses: mpsc::Sender<NetworkResponse>,
}

impl NetworkWorker {
    pub fn new(
        cache: FreshnessCache,
        scoreboard: LiveResource,
        requests: mpsc::Receiver<NetworkRequest>,
        responses: mpsc::Sender<NetworkResponse>,
    ) -> Self {
        Self { cache, scoreboard, requests, responses }
    }

    pub async fn run(mut self) {
        while let Some(request) = self.requests.recv().await {
            let result = match request {
                NetworkRequest::RefreshScoreboard => self.handle_refresh_scoreboard().await,
                NetworkRequest::ReloadScoreboard => {
                    self.cache.invalidate(&self.scoreboard.url);
                    self.handle_refresh_scoreboard().await
                }
            };

            debug!("network request complete");
            let response = result.unwrap_or_else(|err| NetworkResponse::Error {
                message: err.to_string(),
            });

            if let Err(e) = self.responses.send(response).await {
                error!("Failed to send network response: {e}");
                break;
            }
        }
    }

    async fn handle_refresh_scoreboard(&self) -> anyhow::Result<NetworkResponse> {
        debug!("refreshing scoreboard");
        let cached = self.cache.get(&self.scoreboard.url, self.scoreboard.ttl).await?;
        if let Some(e) = &cached.refresh_error {
            warn!("scoreboard refresh failed, keeping previous board: {e}");
        }
        let games = parse_scoreboard(&cached.value)?;
        Ok(NetworkResponse::ScoreboardLoaded { games, stale: cached.is_stale() })
    }
}
