/// ESPN endpoint catalogue and the few wire shapes the core reads.
///
/// Payloads are otherwise treated as opaque JSON; only status objects and
/// scoreboard competitors are deserialized.
use serde::Deserialize;
use std::time::Duration;

const ESPN_SITE_V2: &str = "https://site.api.espn.com/apis/site/v2/sports/football";
const ESPN_WEB_V3: &str = "https://site.web.api.espn.com/apis/common/v3/sports/football";
const ESPN_CORE_V2: &str = "https://sports.core.api.espn.com/v2/sports/football/leagues";
const ESPN_STANDINGS_V2: &str = "https://site.api.espn.com/apis/v2/sports/football";
const ESPN_CDN: &str = "https://cdn.espn.com/core";

const LIVE_TTL: Duration = Duration::from_secs(15);
const SCOREBOARD_TTL: Duration = Duration::from_secs(30);
const NEWS_TTL: Duration = Duration::from_secs(5 * 60);
const SLOW_TTL: Duration = Duration::from_secs(10 * 60);
const DEFAULT_TTL: Duration = Duration::from_secs(2 * 60);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum League {
    #[default]
    Nfl,
    CollegeFootball,
}

impl League {
    pub fn slug(&self) -> &'static str {
        match self {
            League::Nfl => "nfl",
            League::CollegeFootball => "college-football",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            League::Nfl => "NFL",
            League::CollegeFootball => "NCAA",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "nfl" => Some(League::Nfl),
            "ncaa" | "ncaaf" | "college-football" => Some(League::CollegeFootball),
            _ => None,
        }
    }
}

/// One addressable upstream resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resource {
    Teams,
    Team { team_id: String },
    Roster { team_id: String },
    TeamSchedule { team_id: String, season: u16 },
    TeamNews { team_id: String, limit: u16 },
    TeamInjuries { team_id: String },
    DepthChart { team_id: String, season: u16 },
    AthleteOverview { athlete_id: String },
    AthleteGamelog { athlete_id: String },
    AthleteSplits { athlete_id: String },
    AthleteEventlog { athlete_id: String, season: u16 },
    Scoreboard { week: Option<u8> },
    /// CDN week schedule used by the match cards.
    WeekSchedule { season: u16, week: u8 },
    Summary { event_id: String },
    Boxscore { event_id: String },
    BoxscoreCdn { game_id: String },
    Plays { event_id: String },
    Standings { season: Option<u16> },
    News { limit: u16 },
}

impl Resource {
    pub fn url(&self, league: League) -> String {
        let lg = league.slug();
        match self {
            Resource::Teams => format!("{ESPN_SITE_V2}/{lg}/teams"),
            Resource::Team { team_id } => format!("{ESPN_SITE_V2}/{lg}/teams/{team_id}"),
            Resource::Roster { team_id } => format!(
                "{ESPN_SITE_V2}/{lg}/teams/{team_id}/roster?enable=roster,projection,stats"
            ),
            Resource::TeamSchedule { team_id, season } => {
                format!("{ESPN_SITE_V2}/{lg}/teams/{team_id}/schedule?season={season}")
            }
            Resource::TeamNews { team_id, limit } => {
                format!("{ESPN_SITE_V2}/{lg}/news?team={team_id}&limit={limit}")
            }
            Resource::TeamInjuries { team_id } => {
                format!("{ESPN_CORE_V2}/{lg}/teams/{team_id}/injuries")
            }
            Resource::DepthChart { team_id, season } => {
                format!("{ESPN_CORE_V2}/{lg}/seasons/{season}/teams/{team_id}/depthcharts")
            }
            Resource::AthleteOverview { athlete_id } => {
                format!("{ESPN_WEB_V3}/{lg}/athletes/{athlete_id}/overview")
            }
            Resource::AthleteGamelog { athlete_id } => {
                format!("{ESPN_WEB_V3}/{lg}/athletes/{athlete_id}/gamelog")
            }
            Resource::AthleteSplits { athlete_id } => {
                format!("{ESPN_WEB_V3}/{lg}/athletes/{athlete_id}/splits")
            }
            Resource::AthleteEventlog { athlete_id, season } => {
                format!("{ESPN_CORE_V2}/{lg}/seasons/{season}/athletes/{athlete_id}/eventlog")
            }
            Resource::Scoreboard { week: Some(week) } => {
                format!("{ESPN_SITE_V2}/{lg}/scoreboard?week={week}")
            }
            Resource::Scoreboard { week: None } => format!("{ESPN_SITE_V2}/{lg}/scoreboard"),
            Resource::WeekSchedule { season, week } => {
                format!("{ESPN_CDN}/{lg}/schedule?xhr=1&year={season}&week={week}")
            }
            Resource::Summary { event_id } => {
                format!("{ESPN_SITE_V2}/{lg}/summary?event={event_id}")
            }
            Resource::Boxscore { event_id } => {
                format!("{ESPN_SITE_V2}/{lg}/boxscore?event={event_id}")
            }
            Resource::BoxscoreCdn { game_id } => {
                format!("{ESPN_CDN}/{lg}/boxscore?xhr=1&gameId={game_id}")
            }
            Resource::Plays { event_id } => format!(
                "{ESPN_CORE_V2}/{lg}/events/{event_id}/competitions/{event_id}/plays?limit=300"
            ),
            Resource::Standings { season: Some(season) } => {
                format!("{ESPN_STANDINGS_V2}/{lg}/standings?season={season}")
            }
            Resource::Standings { season: None } => format!("{ESPN_STANDINGS_V2}/{lg}/standings"),
            Resource::News { limit } => format!("{ESPN_SITE_V2}/{lg}/news?limit={limit}"),
        }
    }

    /// How stale this resource may get before a refetch.
    pub fn default_ttl(&self) -> Duration {
        match self {
            Resource::Summary { .. }
            | Resource::Boxscore { .. }
            | Resource::BoxscoreCdn { .. }
            | Resource::Plays { .. } => LIVE_TTL,
            Resource::Scoreboard { .. } | Resource::WeekSchedule { .. } => SCOREBOARD_TTL,
            Resource::TeamNews { .. } | Resource::News { .. } => NEWS_TTL,
            Resource::Roster { .. }
            | Resource::TeamSchedule { .. }
            | Resource::DepthChart { .. }
            | Resource::Standings { .. }
            | Resource::Teams => SLOW_TTL,
            _ => DEFAULT_TTL,
        }
    }
}

// ---------------------------------------------------------------------------
// Wire shapes
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, Default, Clone)]
pub struct ScoreboardResponse {
    pub events: Option<Vec<EspnEvent>>,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct EspnEvent {
    pub id: Option<String>,
    pub name: Option<String>,
    #[serde(rename = "shortName")]
    pub short_name: Option<String>,
    pub date: Option<String>,
    pub status: Option<EspnStatus>,
    pub competitions: Option<Vec<EspnCompetition>>,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct EspnStatus {
    #[serde(rename = "type")]
    pub status_type: Option<EspnStatusType>,
    pub period: Option<u8>,
    #[serde(rename = "displayClock")]
    pub display_clock: Option<String>,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct EspnStatusType {
    pub name: Option<String>, // "STATUS_IN_PROGRESS", "STATUS_FINAL", ...
    pub state: Option<String>, // "pre" | "in" | "post"
    pub completed: Option<bool>,
    #[serde(rename = "shortDetail")]
    pub short_detail: Option<String>,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct EspnCompetition {
    pub status: Option<EspnStatus>,
    pub competitors: Option<Vec<EspnCompetitor>>,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct EspnCompetitor {
    #[serde(rename = "homeAway")]
    pub home_away: Option<String>,
    pub team: Option<EspnTeam>,
    pub score: Option<String>, // ESPN sends scores as strings
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct EspnTeam {
    pub id: Option<String>,
    pub abbreviation: Option<String>,
    #[serde(rename = "displayName")]
    pub display_name: Option<String>,
}
