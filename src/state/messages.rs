use espn_feed::{PollUpdate, ScoreboardGame};

#[derive(Debug, Clone)]
pub enum NetworkRequest {
    RefreshScoreboard,
    /// Drop the cached scoreboard before refreshing.
    ReloadScoreboard,
}

#[derive(Debug)]
pub enum NetworkResponse {
    ScoreboardLoaded { games: Vec<ScoreboardGame>, stale: bool },
    /// One poll cycle for a tracked game.
    GameUpdated { game_id: String, update: PollUpdate },
    Error { message: String },
}
