use chrono::{DateTime, Local, Utc};
use espn_feed::{GameState, PollUpdate, ScoreboardGame, parse_event};
use std::collections::BTreeMap;

/// Last known good line for one game, plus how it was last refreshed.
#[derive(Debug, Clone)]
pub struct GameLine {
    pub game: ScoreboardGame,
    pub updated_at: Option<DateTime<Utc>>,
    /// The latest refresh failed and `game` is older than it should be.
    pub stale: bool,
    pub last_error: Option<String>,
}

impl GameLine {
    fn new(game: ScoreboardGame) -> Self {
        Self { game, updated_at: None, stale: false, last_error: None }
    }

    pub fn updated_local(&self) -> Option<DateTime<Local>> {
        self.updated_at.map(|t| t.with_timezone(&Local))
    }
}

/// Board of every game on the current scoreboard, keyed by event id.
#[derive(Debug, Default)]
pub struct AppState {
    pub games: BTreeMap<String, GameLine>,
    pub scoreboard_stale: bool,
    pub last_error: Option<String>,
}

impl AppState {
    /// Merge a scoreboard pass. Lines that a poll session has refreshed more
    /// recently keep their detail; games gone from the board are dropped.
    pub fn load_scoreboard(&mut self, games: Vec<ScoreboardGame>, stale: bool) {
        self.scoreboard_stale = stale;
        if !stale {
            self.last_error = None;
        }

        let mut next = BTreeMap::new();
        for game in games {
            let line = match self.games.remove(&game.id) {
                Some(mut line) if line.updated_at.is_some() && game.state != GameState::Post => {
                    line.game.name = game.name;
                    line
                }
                Some(mut line) => {
                    line.game = game;
                    line
                }
                None => GameLine::new(game),
            };
            next.insert(line.game.id.clone(), line);
        }
        self.games = next;
    }

    /// Apply one poll cycle. Returns the line when something visible changed.
    pub fn apply_update(&mut self, game_id: &str, update: PollUpdate) -> Option<&GameLine> {
        let line = self.games.get_mut(game_id)?;
        match update {
            PollUpdate::Fresh(snapshot) => {
                let Some(mut game) = parse_event(&snapshot.value) else {
                    line.last_error = Some("summary had no game header".into());
                    return None;
                };
                game.id = line.game.id.clone();
                if game.name.is_empty() {
                    game.name = line.game.name.clone();
                }
                let changed = game != line.game || line.stale;
                line.game = game;
                line.updated_at = Some(snapshot.fetched_at_wall);
                line.stale = false;
                line.last_error = None;
                changed.then_some(&*line)
            }
            PollUpdate::Stale { error, .. } => {
                let first_failure = !line.stale;
                line.stale = true;
                line.last_error = Some(error.to_string());
                first_failure.then_some(&*line)
            }
            PollUpdate::Failed(error) => {
                line.last_error = Some(error.to_string());
                None
            }
        }
    }

    pub fn live_count(&self) -> usize {
        self.games.values().filter(|l| l.game.is_live()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use espn_feed::{FetchError, Snapshot, TeamLine};
    use serde_json::{Value, json};
    use std::sync::Arc;

    fn board_game(id: &str, state: GameState, home: u16, away: u16) -> ScoreboardGame {
        ScoreboardGame {
            id: id.into(),
            name: "KC @ BUF".into(),
            state,
            detail: None,
            home: TeamLine { abbrev: "BUF".into(), score: Some(home) },
            away: TeamLine { abbrev: "KC".into(), score: Some(away) },
        }
    }

    fn fresh(value: Value) -> PollUpdate {
        PollUpdate::Fresh(Snapshot {
            resource_id: "1".into(),
            value: Arc::new(value),
            fetched_at: tokio::time::Instant::now(),
            fetched_at_wall: Utc::now(),
        })
    }

    fn summary(home: &str, away: &str) -> Value {
        json!({"header": {"id": "1", "competitions": [{
            "status": {"type": {"state": "in", "shortDetail": "Q3 8:00"}},
            "competitors": [
                {"homeAway": "home", "team": {"abbreviation": "BUF"}, "score": home},
                {"homeAway": "away", "team": {"abbreviation": "KC"}, "score": away}
            ]
        }]}})
    }

    fn outage() -> FetchError {
        FetchError::Network { url: "summary".into(), message: "reset".into(), timed_out: false }
    }

    #[test]
    fn fresh_summary_updates_the_line() {
        let mut state = AppState::default();
        state.load_scoreboard(vec![board_game("1", GameState::In, 0, 0)], false);

        let line = state.apply_update("1", fresh(summary("3", "7"))).unwrap();
        assert_eq!(line.game.home.score, Some(3));
        assert_eq!(line.game.away.score, Some(7));
        assert_eq!(line.game.name, "KC @ BUF");
        assert_eq!(line.game.detail.as_deref(), Some("Q3 8:00"));

        // Same payload again is not a visible change.
        assert!(state.apply_update("1", fresh(summary("3", "7"))).is_none());
    }

    #[test]
    fn failures_keep_last_known_good() {
        let mut state = AppState::default();
        state.load_scoreboard(vec![board_game("1", GameState::In, 0, 0)], false);
        state.apply_update("1", fresh(summary("3", "7")));

        assert!(state.apply_update("1", PollUpdate::Failed(outage())).is_none());
        let line = &state.games["1"];
        assert_eq!(line.game.away.score, Some(7));
        assert!(line.last_error.is_some());

        let snapshot = match fresh(summary("3", "7")) {
            PollUpdate::Fresh(s) => s,
            _ => unreachable!(),
        };
        let stale = PollUpdate::Stale { snapshot, error: outage() };
        assert!(state.apply_update("1", stale.clone()).unwrap().stale);
        assert!(state.apply_update("1", stale).is_none());
    }

    #[test]
    fn scoreboard_pass_keeps_polled_detail() {
        let mut state = AppState::default();
        state.load_scoreboard(vec![board_game("1", GameState::In, 0, 0)], false);
        state.apply_update("1", fresh(summary("10", "7")));

        // Scoreboard lags behind the summary feed.
        state.load_scoreboard(
            vec![board_game("1", GameState::In, 3, 7), board_game("2", GameState::Pre, 0, 0)],
            false,
        );
        assert_eq!(state.games["1"].game.home.score, Some(10));
        assert_eq!(state.games.len(), 2);
        assert_eq!(state.live_count(), 1);

        state.load_scoreboard(vec![board_game("2", GameState::Pre, 0, 0)], false);
        assert!(!state.games.contains_key("1"));
    }

    #[test]
    fn updates_for_unknown_games_are_ignored() {
        let mut state = AppState::default();
        assert!(state.apply_update("404", fresh(summary("1", "1"))).is_none());
    }
}
