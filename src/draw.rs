use crate::app::App;
use crate::state::app_state::GameLine;
use espn_feed::{GameState, TeamLine};

const STALE_MARK: &str = "[stale]";

/// Print the whole board after a scoreboard pass.
pub fn draw_board(app: &App, tracked: usize) {
    let state = &app.state;
    println!(
        "── {} scoreboard · {} games · {} live · {} tracked{}",
        app.settings.league.label(),
        state.games.len(),
        state.live_count(),
        tracked,
        if state.scoreboard_stale { format!(" {STALE_MARK}") } else { String::new() },
    );
    if let Some(error) = &state.last_error {
        println!("   ! {error}");
    }
    for line in state.games.values() {
        println!("{}", format_line(line));
    }
}

/// Print one line that a poll cycle changed.
pub fn draw_line(line: &GameLine) {
    println!("{}", format_line(line));
}

pub fn format_line(line: &GameLine) -> String {
    let game = &line.game;
    let marker = match game.state {
        GameState::In => "●",
        GameState::Post => "✓",
        GameState::Suspended => "‖",
        GameState::Pre | GameState::Unknown => " ",
    };
    let score = |team: &TeamLine| match team.score {
        Some(points) if game.state != GameState::Pre => format!("{} {points:>2}", team.abbrev),
        _ => team.abbrev.clone(),
    };

    let mut out = format!("{marker} {:<14} {} - {}", game.id, score(&game.away), score(&game.home));
    if let Some(detail) = &game.detail {
        out.push_str(&format!("  {detail}"));
    }
    if let Some(at) = line.updated_local() {
        out.push_str(&format!("  @{}", at.format("%H:%M:%S")));
    }
    if let Some(error) = &line.last_error {
        out.push_str(&format!("  ! {error}"));
    }
    if line.stale {
        out.push_str(&format!("  {STALE_MARK}"));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use espn_feed::ScoreboardGame;

    fn line(state: GameState, stale: bool) -> GameLine {
        GameLine {
            game: ScoreboardGame {
                id: "401".into(),
                name: "KC @ BUF".into(),
                state,
                detail: Some("Q2 3:12".into()),
                home: TeamLine { abbrev: "BUF".into(), score: Some(7) },
                away: TeamLine { abbrev: "KC".into(), score: Some(14) },
            },
            updated_at: None,
            stale,
            last_error: None,
        }
    }

    #[test]
    fn live_line_shows_scores_and_detail() {
        let text = format_line(&line(GameState::In, false));
        assert!(text.starts_with("● 401"));
        assert!(text.contains("KC 14 - BUF  7"));
        assert!(text.ends_with("Q2 3:12"));
    }

    #[test]
    fn scheduled_line_hides_scores() {
        let text = format_line(&line(GameState::Pre, false));
        assert!(text.contains("KC - BUF"));
    }

    #[test]
    fn stale_line_is_marked() {
        assert!(format_line(&line(GameState::In, true)).ends_with(STALE_MARK));
    }
}
