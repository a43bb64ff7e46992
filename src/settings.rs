use std::collections::HashSet;
use std::env;
use std::fmt::{self, Display};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use tracing::warn;

pub const DEFAULT_API_URL: &str = "https://v3.football.api-sports.io/";
pub const DEFAULT_SEASON: u32 = 2022;
pub const DEFAULT_ACTIVE_LEAGUES: &[u32] = &[2, 3, 39, 140, 435];
pub const DEFAULT_REQUEST_DELAY_SECS: u64 = 6;
pub const DEFAULT_QUOTA_FLOOR: u64 = 20;

const SECRET_FILES: &[&str] = &[".env.secrets", ".env.local", ".env"];

#[derive(Clone)]
pub struct Settings {
    pub api_url: String,
    pub api_host: String,
    pub api_key: Option<String>,
    // Year the season starts in: 2022 for 2022/2023.
    pub current_season: u32,
    pub active_leagues: Vec<u32>,
    pub project_dir: PathBuf,
    pub request_delay: Duration,
    pub quota_floor: u64,
    pub bypass_quota_floor: bool,
}

impl Settings {
    pub fn new(project_dir: impl Into<PathBuf>) -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            api_host: host_of(DEFAULT_API_URL),
            api_key: None,
            current_season: DEFAULT_SEASON,
            active_leagues: DEFAULT_ACTIVE_LEAGUES.to_vec(),
            project_dir: project_dir.into(),
            request_delay: Duration::from_secs(DEFAULT_REQUEST_DELAY_SECS),
            quota_floor: DEFAULT_QUOTA_FLOOR,
            bypass_quota_floor: false,
        }
    }

    /// Loads the dotenv files (missing ones are fine) and reads the
    /// `FOOTBALL_*` variables on top of the defaults.
    pub fn from_env() -> Self {
        for file in SECRET_FILES {
            let _ = dotenvy::from_filename(file);
        }

        let project_dir = env_string("FOOTBALL_PROJECT_DIR")
            .map(PathBuf::from)
            .or_else(|| env::current_dir().ok())
            .unwrap_or_else(|| PathBuf::from("."));
        let mut out = Self::new(project_dir);

        if let Some(url) = env_string("FOOTBALL_API_URL") {
            out.api_url = with_trailing_slash(url);
            out.api_host = host_of(&out.api_url);
        }
        if let Some(host) = env_string("FOOTBALL_API_HOST") {
            out.api_host = host;
        }
        out.api_key = env_string("FOOTBALL_API_KEY");
        out.current_season = env_parsed("FOOTBALL_CURRENT_SEASON", DEFAULT_SEASON);
        if let Some(raw) = env_string("FOOTBALL_ACTIVE_LEAGUES") {
            let ids = parse_ids(&raw);
            if ids.is_empty() {
                warn!(value = %raw, "FOOTBALL_ACTIVE_LEAGUES has no valid ids, using defaults");
            } else {
                out.active_leagues = ids;
            }
        }
        out.request_delay = Duration::from_secs(env_parsed(
            "FOOTBALL_REQUEST_DELAY_SECS",
            DEFAULT_REQUEST_DELAY_SECS,
        ));
        out.quota_floor = env_parsed("FOOTBALL_QUOTA_FLOOR", DEFAULT_QUOTA_FLOOR);
        out.bypass_quota_floor = env_bool("FOOTBALL_BYPASS_QUOTA_FLOOR", false);
        out
    }

    pub fn raw_data_dir(&self) -> PathBuf {
        self.project_dir.join("raw_data")
    }

    pub fn newest_data_dir(&self) -> PathBuf {
        self.project_dir.join("newest_data")
    }
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("api_url", &self.api_url)
            .field("api_host", &self.api_host)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("current_season", &self.current_season)
            .field("active_leagues", &self.active_leagues)
            .field("project_dir", &self.project_dir)
            .field("request_delay", &self.request_delay)
            .field("quota_floor", &self.quota_floor)
            .field("bypass_quota_floor", &self.bypass_quota_floor)
            .finish()
    }
}

pub fn parse_ids(raw: &str) -> Vec<u32> {
    let ids = raw
        .split([',', ';', ' '])
        .filter_map(|part| part.trim().parse::<u32>().ok())
        .filter(|id| *id != 0)
        .collect::<Vec<_>>();
    dedup_ids(ids)
}

pub fn dedup_ids<T: Copy + Eq + std::hash::Hash>(ids: Vec<T>) -> Vec<T> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for id in ids {
        if seen.insert(id) {
            out.push(id);
        }
    }
    out
}

fn host_of(url: &str) -> String {
    let without_scheme = url
        .split_once("://")
        .map(|(_, rest)| rest)
        .unwrap_or(url);
    without_scheme
        .split('/')
        .next()
        .unwrap_or_default()
        .to_string()
}

fn with_trailing_slash(url: String) -> String {
    if url.ends_with('/') {
        url
    } else {
        format!("{url}/")
    }
}

fn env_string(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn env_parsed<T: FromStr + Display>(key: &str, default: T) -> T {
    parse_or_default(key, env_string(key).as_deref(), default)
}

/// A value that is set but unparseable falls back to `default` loudly.
fn parse_or_default<T: FromStr + Display>(key: &str, raw: Option<&str>, default: T) -> T {
    let Some(raw) = raw else {
        return default;
    };
    match raw.parse::<T>() {
        Ok(value) => value,
        Err(_) => {
            warn!(key, value = raw, %default, "unparseable setting, using default");
            default
        }
    }
}

fn env_bool(key: &str, default: bool) -> bool {
    match env::var(key) {
        Ok(raw) => matches!(
            raw.trim().to_ascii_lowercase().as_str(),
            "1" | "true" | "yes" | "on"
        ),
        Err(_) => default,
    }
}
