use scorecast::app_settings::AppSettings;
use crate::state::messages::NetworkResponse;
use espn_feed::{League, LiveResource, PollSchedule, Poller, Resource, ScoreboardGame, TerminalRule};
use log::{debug, info, warn};
use std::collections::HashSet;
use tokio::sync::mpsc;

/// Keeps one poll session per live game on the current scoreboard.
pub struct LiveTracker {
    poller: Poller,
    league: League,
    schedule: PollSchedule,
    rule: TerminalRule,
    responses: mpsc::Sender<NetworkResponse>,
}

impl LiveTracker {
    pub fn new(
        poller: Poller,
        settings: &AppSettings,
        responses: mpsc::Sender<NetworkResponse>,
    ) -> Self {
        Self {
            poller,
            league: settings.league,
            schedule: settings.poll_schedule(),
            rule: settings.terminal_rule(),
            responses,
        }
    }

    /// Reconcile sessions with a freshly loaded scoreboard. Returns how many
    /// sessions were started.
    ///
    /// The poll interval is computed once per pass from the live count;
    /// sessions already running keep the interval they started with.
    pub fn sync(&self, games: &[ScoreboardGame]) -> usize {
        let live: Vec<&ScoreboardGame> = games
            .iter()
            .filter(|g| g.is_live() && !self.rule.suspended_ids.contains(&g.id))
            .collect();
        let interval = self.schedule.interval_for(live.len());

        let mut started = 0;
        for game in &live {
            if !self.poller.is_tracking(&game.id) {
                self.track(&game.id, interval);
                started += 1;
            }
        }

        let on_board: HashSet<&str> = games.iter().map(|g| g.id.as_str()).collect();
        for id in self.poller.tracked_ids() {
            if !on_board.contains(id.as_str()) {
                debug!("{id} left the scoreboard");
                self.poller.stop_tracking(&id);
            }
        }

        if started > 0 {
            info!("{} live, polling new games every {interval:?}", live.len());
        }
        started
    }

    pub fn tracked(&self) -> Vec<String> {
        self.poller.tracked_ids()
    }

    pub fn shutdown(&self) {
        self.poller.stop_all();
    }

    fn track(&self, game_id: &str, interval: std::time::Duration) {
        let summary = Resource::Summary { event_id: game_id.to_owned() };
        let resource = LiveResource::new(game_id, summary.url(self.league), summary.default_ttl());

        let responses = self.responses.clone();
        let id = game_id.to_owned();
        let on_update = move |update| {
            let response = NetworkResponse::GameUpdated { game_id: id.clone(), update };
            if let Err(e) = responses.try_send(response) {
                warn!("dropping update for {id}: {e}");
            }
        };
        let rule = self.rule.clone();

        self.poller
            .start_tracking(resource, move || interval, on_update, move |s| rule.is_terminal(s));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::test_support::StaticFetcher;
    use espn_feed::{FreshnessCache, GameState, PollUpdate};
    use serde_json::json;
    use std::time::Duration;

    fn game(id: &str, state: GameState) -> ScoreboardGame {
        ScoreboardGame { id: id.into(), state, ..Default::default() }
    }

    fn summary(state: &str) -> serde_json::Value {
        json!({"header": {"id": "x", "competitions": [{"status": {"type": {"state": state}}}]}})
    }

    fn tracker_with(
        fetcher: StaticFetcher,
        settings: &AppSettings,
    ) -> (LiveTracker, mpsc::Receiver<NetworkResponse>) {
        let (tx, rx) = mpsc::channel(32);
        let poller = Poller::new(FreshnessCache::new(fetcher));
        (LiveTracker::new(poller, settings, tx), rx)
    }

    fn summary_url(id: &str) -> String {
        Resource::Summary { event_id: id.into() }.url(League::Nfl)
    }

    #[tokio::test(start_paused = true)]
    async fn tracks_only_live_games() {
        let fetcher = StaticFetcher::default();
        fetcher.set(&summary_url("1"), summary("in"));
        let (tracker, mut rx) = tracker_with(fetcher, &AppSettings::default());

        let started = tracker.sync(&[
            game("1", GameState::In),
            game("2", GameState::Pre),
            game("3", GameState::Post),
        ]);
        assert_eq!(started, 1);
        assert_eq!(tracker.tracked(), vec!["1".to_string()]);

        match rx.recv().await.unwrap() {
            NetworkResponse::GameUpdated { game_id, update: PollUpdate::Fresh(_) } => {
                assert_eq!(game_id, "1")
            }
            other => panic!("unexpected response {other:?}"),
        }

        // A second pass does not restart a running session.
        assert_eq!(tracker.sync(&[game("1", GameState::In)]), 0);
        tracker.shutdown();
    }

    #[tokio::test(start_paused = true)]
    async fn games_leaving_the_board_are_stopped() {
        let fetcher = StaticFetcher::default();
        fetcher.set(&summary_url("1"), summary("in"));
        let (tracker, _rx) = tracker_with(fetcher, &AppSettings::default());

        tracker.sync(&[game("1", GameState::In)]);
        tracker.sync(&[game("2", GameState::Pre)]);
        assert!(tracker.tracked().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn suspended_games_are_never_tracked() {
        let settings = AppSettings {
            suspended_games: vec!["7".into()],
            ..AppSettings::default()
        };
        let (tracker, _rx) = tracker_with(StaticFetcher::default(), &settings);

        assert_eq!(tracker.sync(&[game("7", GameState::In)]), 0);
        assert!(tracker.tracked().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn final_summary_ends_the_session() {
        let fetcher = StaticFetcher::default();
        fetcher.set(&summary_url("5"), summary("post"));
        let (tracker, mut rx) = tracker_with(fetcher.clone(), &AppSettings::default());

        tracker.sync(&[game("5", GameState::In)]);
        rx.recv().await.unwrap();
        tokio::time::sleep(Duration::from_secs(120)).await;

        assert!(tracker.tracked().is_empty());
        assert_eq!(fetcher.calls(), 1);
        assert!(rx.try_recv().is_err());
    }
}
