pub mod cache;
pub mod client;
pub mod espn;
pub mod poller;
pub mod relay;

pub use cache::{CacheEntry, Cached, FreshnessCache};
pub use client::{EspnClient, Fetch, FetchError, FetchResult};
pub use espn::{League, Resource};
pub use poller::{LiveResource, PollUpdate, Poller, Snapshot};

use crate::espn::{EspnCompetitor, EspnEvent, EspnStatus, ScoreboardResponse};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashSet;
use std::time::Duration;

// ---------------------------------------------------------------------------
// Game state, as far as polling cares
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum GameState {
    Pre,
    In,
    Post,
    /// Postponed, suspended, delayed or canceled.
    Suspended,
    #[default]
    Unknown,
}

impl GameState {
    fn from_status(status: &EspnStatus) -> Self {
        let Some(status_type) = status.status_type.as_ref() else {
            return GameState::Unknown;
        };
        // Suspensions are only visible in the name; their state stays "in" or "pre".
        if let Some(name) = status_type.name.as_deref() {
            match name {
                "STATUS_POSTPONED" | "STATUS_SUSPENDED" | "STATUS_CANCELED"
                | "STATUS_CANCELLED" | "STATUS_DELAYED" => return GameState::Suspended,
                _ => {}
            }
        }
        match status_type.state.as_deref() {
            Some("pre") => GameState::Pre,
            Some("in") => GameState::In,
            Some("post") => GameState::Post,
            _ => match status_type.name.as_deref() {
                Some("STATUS_SCHEDULED") => GameState::Pre,
                Some("STATUS_IN_PROGRESS" | "STATUS_HALFTIME" | "STATUS_END_PERIOD") => {
                    GameState::In
                }
                Some(name) if name.starts_with("STATUS_FINAL") => GameState::Post,
                _ if status_type.completed == Some(true) => GameState::Post,
                _ => GameState::Unknown,
            },
        }
    }

    /// Locate a status object in a summary, boxscore, CDN or event payload.
    pub fn of(value: &Value) -> Self {
        const STATUS_PATHS: [&str; 4] = [
            "/header/competitions/0/status",
            "/gamepackageJSON/header/competitions/0/status",
            "/competitions/0/status",
            "/status",
        ];
        STATUS_PATHS
            .iter()
            .filter_map(|path| value.pointer(path))
            .filter_map(|raw| EspnStatus::deserialize(raw).ok())
            .map(|status| GameState::from_status(&status))
            .find(|state| *state != GameState::Unknown)
            .unwrap_or_default()
    }
}

/// Explicit "stop polling" predicate for one resource type.
#[derive(Debug, Clone)]
pub struct TerminalRule {
    pub terminal_states: HashSet<GameState>,
    /// Resource ids treated as terminal regardless of what the payload says.
    pub suspended_ids: HashSet<String>,
}

impl Default for TerminalRule {
    fn default() -> Self {
        Self {
            terminal_states: HashSet::from([GameState::Post, GameState::Suspended]),
            suspended_ids: HashSet::new(),
        }
    }
}

impl TerminalRule {
    pub fn final_only() -> Self {
        Self {
            terminal_states: HashSet::from([GameState::Post]),
            suspended_ids: HashSet::new(),
        }
    }

    pub fn with_suspended_ids<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.suspended_ids.extend(ids.into_iter().map(Into::into));
        self
    }

    pub fn is_terminal(&self, snapshot: &Snapshot) -> bool {
        self.suspended_ids.contains(&snapshot.resource_id)
            || self.terminal_states.contains(&GameState::of(&snapshot.value))
    }
}

// ---------------------------------------------------------------------------
// Poll cadence
// ---------------------------------------------------------------------------

/// Poll interval as a step function of how many resources are live at once.
#[derive(Debug, Clone, Copy)]
pub struct PollSchedule {
    pub base: Duration,
}

impl Default for PollSchedule {
    fn default() -> Self {
        Self { base: Duration::from_secs(15) }
    }
}

impl PollSchedule {
    pub fn new(base: Duration) -> Self {
        Self { base }
    }

    pub fn interval_for(&self, live_count: usize) -> Duration {
        match live_count {
            0..=2 => self.base,
            3..=6 => self.base * 2,
            _ => self.base * 4,
        }
    }
}

// ---------------------------------------------------------------------------
// Scoreboard summary
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TeamLine {
    pub abbrev: String,
    pub score: Option<u16>,
}

/// One event from a scoreboard, reduced to what the tracker needs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScoreboardGame {
    pub id: String,
    pub name: String,
    pub state: GameState,
    pub detail: Option<String>, // "Q2 3:12", "Final", "Sun 1:00 PM"
    pub home: TeamLine,
    pub away: TeamLine,
}

impl ScoreboardGame {
    pub fn is_live(&self) -> bool {
        self.state == GameState::In
    }
}

pub fn parse_scoreboard(value: &Value) -> Result<Vec<ScoreboardGame>, serde_json::Error> {
    let raw = ScoreboardResponse::deserialize(value)?;
    Ok(raw
        .events
        .unwrap_or_default()
        .iter()
        .filter(|e| e.id.is_some())
        .map(map_event)
        .collect())
}

/// Reduce a game summary (its `header`) or a bare event payload to one line.
pub fn parse_event(value: &Value) -> Option<ScoreboardGame> {
    let raw = value.get("header").unwrap_or(value);
    let event = EspnEvent::deserialize(raw).ok()?;
    event.id.is_some().then(|| map_event(&event))
}

fn map_event(event: &EspnEvent) -> ScoreboardGame {
    let competition = event.competitions.as_deref().and_then(<[_]>::first);
    let status = competition
        .and_then(|c| c.status.as_ref())
        .or(event.status.as_ref());

    let competitors = competition
        .and_then(|c| c.competitors.as_deref())
        .unwrap_or_default();
    let side = |home_away: &str| {
        competitors
            .iter()
            .find(|c| c.home_away.as_deref() == Some(home_away))
            .map(map_competitor)
            .unwrap_or_default()
    };

    ScoreboardGame {
        id: event.id.clone().unwrap_or_default(),
        name: event
            .short_name
            .clone()
            .or_else(|| event.name.clone())
            .unwrap_or_default(),
        state: status.map(GameState::from_status).unwrap_or_default(),
        detail: status
            .and_then(|s| s.status_type.as_ref())
            .and_then(|t| t.short_detail.clone()),
        home: side("home"),
        away: side("away"),
    }
}

fn map_competitor(c: &EspnCompetitor) -> TeamLine {
    TeamLine {
        abbrev: c
            .team
            .as_ref()
            .and_then(|t| t.abbreviation.clone().or_else(|| t.display_name.clone()))
            .unwrap_or_default(),
        score: c.score.as_deref().and_then(|s| s.parse().ok()),
    }
}
