use espn_feed::{League, PollSchedule, Resource, TerminalRule};
use log::LevelFilter;
use std::net::SocketAddr;
use std::time::Duration;

const DEFAULT_SCOREBOARD_SECS: u64 = 60;
const DEFAULT_POLL_BASE_SECS: u64 = 15;
const DEFAULT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_RELAY_BIND: SocketAddr =
    SocketAddr::new(std::net::IpAddr::V4(std::net::Ipv4Addr::UNSPECIFIED), 8788);

/// Runtime settings, read once from `SCORECAST_*` environment variables.
#[derive(Debug, Clone)]
pub struct AppSettings {
    pub league: League,
    pub week: Option<u8>,
    pub scoreboard_every: Duration,
    pub poll_base: Duration,
    pub timeout: Duration,
    pub suspended_games: Vec<String>,
    pub log_level: LevelFilter,
    pub relay_bind: SocketAddr,
    /// Upstream scheme and host the relay uses instead of ESPN's.
    pub relay_origin: Option<String>,
    /// Problems found while reading the environment; logged once logging is up.
    pub warnings: Vec<String>,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            league: League::Nfl,
            week: None,
            scoreboard_every: Duration::from_secs(DEFAULT_SCOREBOARD_SECS),
            poll_base: Duration::from_secs(DEFAULT_POLL_BASE_SECS),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            suspended_games: Vec::new(),
            log_level: LevelFilter::Info,
            relay_bind: DEFAULT_RELAY_BIND,
            relay_origin: None,
            warnings: Vec::new(),
        }
    }
}

impl AppSettings {
    pub fn load() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut settings = Self::default();
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(raw) = get("SCORECAST_LEAGUE") {
            match League::parse(&raw) {
                Some(league) => settings.league = league,
                None => settings.warnings.push(format!("unknown league {raw:?}, using nfl")),
            }
        }
        if let Some(raw) = get("SCORECAST_WEEK") {
            match raw.trim().parse::<u8>() {
                Ok(week) if (1..=25).contains(&week) => settings.week = Some(week),
                _ => settings.warnings.push(format!("ignoring SCORECAST_WEEK={raw:?}")),
            }
        }
        if let Some(secs) = seconds(&get, "SCORECAST_SCOREBOARD_SECS", &mut settings.warnings) {
            settings.scoreboard_every = secs;
        }
        if let Some(secs) = seconds(&get, "SCORECAST_POLL_BASE_SECS", &mut settings.warnings) {
            settings.poll_base = secs;
        }
        if let Some(secs) = seconds(&get, "SCORECAST_TIMEOUT_SECS", &mut settings.warnings) {
            settings.timeout = secs;
        }
        if let Some(raw) = get("SCORECAST_SUSPENDED_GAMES") {
            settings.suspended_games = raw
                .split(',')
                .map(str::trim)
                .filter(|id| !id.is_empty())
                .map(str::to_owned)
                .collect();
        }
        if let Some(raw) = get("SCORECAST_LOG") {
            match raw.trim().parse::<LevelFilter>() {
                Ok(level) => settings.log_level = level,
                Err(_) => settings.warnings.push(format!("unknown log level {raw:?}")),
            }
        }

        if let Some(raw) = get("SCORECAST_RELAY_BIND") {
            match raw.trim().parse::<SocketAddr>() {
                Ok(addr) => settings.relay_bind = addr,
                Err(_) => settings
                    .warnings
                    .push(format!("ignoring SCORECAST_RELAY_BIND={raw:?}, expected host:port")),
            }
        }
        if let Some(raw) = get("SCORECAST_RELAY_ORIGIN") {
            let origin = raw.trim();
            if origin.starts_with("http://") || origin.starts_with("https://") {
                settings.relay_origin = Some(origin.to_owned());
            } else {
                settings
                    .warnings
                    .push(format!("ignoring SCORECAST_RELAY_ORIGIN={raw:?}, expected an http(s) URL"));
            }
        }

        settings
    }

    pub fn scoreboard(&self) -> Resource {
        Resource::Scoreboard { week: self.week }
    }

    pub fn poll_schedule(&self) -> PollSchedule {
        PollSchedule::new(self.poll_base)
    }

    pub fn terminal_rule(&self) -> TerminalRule {
        TerminalRule::default().with_suspended_ids(self.suspended_games.iter().cloned())
    }
}

fn seconds(
    get: &impl Fn(&str) -> Option<String>,
    key: &str,
    warnings: &mut Vec<String>,
) -> Option<Duration> {
    let raw = get(key)?;
    match raw.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => Some(Duration::from_secs(secs)),
        _ => {
            warnings.push(format!("ignoring {key}={raw:?}, expected a positive number of seconds"));
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings_from(pairs: &[(&str, &str)]) -> AppSettings {
        let env: HashMap<String, String> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        AppSettings::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn defaults_without_environment() {
        let settings = settings_from(&[]);
        assert_eq!(settings.league, League::Nfl);
        assert_eq!(settings.scoreboard_every, Duration::from_secs(60));
        assert_eq!(settings.poll_base, Duration::from_secs(15));
        assert_eq!(settings.log_level, LevelFilter::Info);
        assert!(settings.warnings.is_empty());
    }

    #[test]
    fn reads_overrides() {
        let settings = settings_from(&[
            ("SCORECAST_LEAGUE", "ncaaf"),
            ("SCORECAST_WEEK", "3"),
            ("SCORECAST_POLL_BASE_SECS", "20"),
            ("SCORECAST_SUSPENDED_GAMES", " 401, ,402 "),
            ("SCORECAST_LOG", "debug"),
        ]);
        assert_eq!(settings.league, League::CollegeFootball);
        assert_eq!(settings.scoreboard(), Resource::Scoreboard { week: Some(3) });
        assert_eq!(settings.poll_schedule().interval_for(7), Duration::from_secs(80));
        assert_eq!(settings.suspended_games, vec!["401", "402"]);
        assert!(settings.terminal_rule().suspended_ids.contains("402"));
        assert_eq!(settings.log_level, LevelFilter::Debug);
    }

    #[test]
    fn bad_values_fall_back_with_warnings() {
        let settings = settings_from(&[
            ("SCORECAST_LEAGUE", "curling"),
            ("SCORECAST_TIMEOUT_SECS", "0"),
            ("SCORECAST_WEEK", "ninety"),
        ]);
        assert_eq!(settings.league, League::Nfl);
        assert_eq!(settings.timeout, Duration::from_secs(10));
        assert_eq!(settings.week, None);
        assert_eq!(settings.warnings.len(), 3);
    }

    #[test]
    fn relay_settings() {
        let defaults = settings_from(&[]);
        assert_eq!(defaults.relay_bind.to_string(), "0.0.0.0:8788");
        assert_eq!(defaults.relay_origin, None);

        let custom = settings_from(&[
            ("SCORECAST_RELAY_BIND", "127.0.0.1:9000"),
            ("SCORECAST_RELAY_ORIGIN", "http://127.0.0.1:5000"),
        ]);
        assert_eq!(custom.relay_bind.port(), 9000);
        assert_eq!(custom.relay_origin.as_deref(), Some("http://127.0.0.1:5000"));
        assert!(custom.warnings.is_empty());

        let bad = settings_from(&[
            ("SCORECAST_RELAY_BIND", "everywhere"),
            ("SCORECAST_RELAY_ORIGIN", "cdn.espn.com"),
        ]);
        assert_eq!(bad.relay_bind, DEFAULT_RELAY_BIND);
        assert_eq!(bad.relay_origin, None);
        assert_eq!(bad.warnings.len(), 2);
        assert!(bad.warnings[0].contains("SCORECAST_RELAY_BIND"));
    }
}
