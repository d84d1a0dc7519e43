use crate::state::messages::NetworkRequest;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::interval;

/// Periodic scoreboard pass. Each pass recomputes the live set and the poll
/// interval handed to newly tracked games.
pub struct PeriodicRefresher {
    network_requests: mpsc::Sender<NetworkRequest>,
    every: Duration,
}

impl PeriodicRefresher {
    pub fn new(network_requests: mpsc::Sender<NetworkRequest>, every: Duration) -> Self {
        Self { network_requests, every }
    }

    pub async fn run(self) {
        let mut scoreboard_interval = interval(self.every);
        // Skip the immediate first tick so startup loading isn't double-triggered.
        scoreboard_interval.tick().await;

        loop {
            scoreboard_interval.tick().await;
            if self
                .network_requests
                .send(NetworkRequest::RefreshScoreboard)
                .await
                .is_err()
            {
                break;
            }
        }
    }
}
