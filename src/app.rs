use scorecast::app_settings::AppSettings;
use crate::state::app_state::{AppState, GameLine};
use espn_feed::{PollUpdate, ScoreboardGame};
use log::warn;

pub struct App {
    pub settings: AppSettings,
    pub state: AppState,
}

impl App {
    pub fn new(settings: AppSettings) -> Self {
        Self { settings, state: AppState::default() }
    }

    // -----------------------------------------------------------------------
    // Network response handlers, called from main_loop
    // -----------------------------------------------------------------------

    pub fn on_scoreboard_loaded(&mut self, games: Vec<ScoreboardGame>, stale: bool) {
        self.state.load_scoreboard(games, stale);
    }

    pub fn on_game_updated(&mut self, game_id: &str, update: PollUpdate) -> Option<&GameLine> {
        self.state.apply_update(game_id, update)
    }

    pub fn on_error(&mut self, message: String) {
        warn!("{message}");
        self.state.last_error = Some(message);
    }
}
