use std::env;
use std::path::PathBuf;
use std::time::Duration;

use tracing::warn;

use crate::model::Provider;

const APP_DIR: &str = "club_ledger";
const DB_FILE: &str = "ledger.sqlite";

const DEFAULT_TRACKED_CLUB: &str = "Ipswich Town";
const DEFAULT_USER_AGENT: &str = "club-ledger/0.1";
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_COOLDOWN_SECS: u64 = 60;
const DEFAULT_MAX_RETRIES: u32 = 1;
const MAX_RETRIES_CAP: u32 = 5;
const DEFAULT_RECENT_LIMIT: usize = 10;
const DEFAULT_UPCOMING_LIMIT: usize = 15;
const DEFAULT_RECENT_WINDOW_DAYS: u64 = 7;

#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub provider: Provider,
    pub api_key: Option<String>,
    pub base_url: String,
    pub team_id: String,
    /// Minimum spacing between the starts of two consecutive calls.
    pub min_interval: Duration,
    /// Wait after a throttling response before retrying.
    pub throttle_cooldown: Duration,
    /// Automatic retries after a throttling response.
    pub max_retries: u32,
    pub timeout: Duration,
    pub user_agent: String,
}

impl ProviderConfig {
    pub fn football_data_from_env() -> Self {
        Self {
            provider: Provider::FootballData,
            api_key: opt_env("FOOTBALL_DATA_API_KEY"),
            base_url: env_or("FOOTBALL_DATA_BASE_URL", "https://api.football-data.org/v4"),
            team_id: env_or("FOOTBALL_DATA_TEAM_ID", "349"),
            min_interval: Duration::from_secs(env_u64("FOOTBALL_DATA_RATE_LIMIT_SECS", 6)),
            ..Self::shared_from_env(Provider::FootballData)
        }
    }

    pub fn sportsdb_from_env() -> Self {
        Self {
            provider: Provider::SportsDb,
            api_key: Some(env_or("THESPORTSDB_API_KEY", "3")),
            base_url: env_or(
                "THESPORTSDB_BASE_URL",
                "https://www.thesportsdb.com/api/v1/json",
            ),
            team_id: env_or("THESPORTSDB_TEAM_ID", "133884"),
            min_interval: Duration::from_secs(env_u64("THESPORTSDB_RATE_LIMIT_SECS", 2)),
            ..Self::shared_from_env(Provider::SportsDb)
        }
    }

    fn shared_from_env(provider: Provider) -> Self {
        Self {
            provider,
            api_key: None,
            base_url: String::new(),
            team_id: String::new(),
            min_interval: Duration::ZERO,
            throttle_cooldown: Duration::from_secs(env_u64(
                "THROTTLE_COOLDOWN_SECS",
                DEFAULT_COOLDOWN_SECS,
            )),
            max_retries: retry_limit(env_u64("MAX_RETRIES", DEFAULT_MAX_RETRIES as u64)),
            timeout: Duration::from_secs(env_u64("REQUEST_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS).max(1)),
            user_agent: env_or("LEDGER_USER_AGENT", DEFAULT_USER_AGENT),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub tracked_club: String,
    pub db_path: Option<PathBuf>,
    pub recent_limit: usize,
    pub upcoming_limit: usize,
    /// football-data.org recent pass window in days; 0 uses the status filter.
    pub recent_window_days: u64,
    pub football_data: ProviderConfig,
    pub sportsdb: ProviderConfig,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            tracked_club: env_or("TRACKED_CLUB", DEFAULT_TRACKED_CLUB),
            db_path: opt_env("LEDGER_DB_PATH")
                .map(PathBuf::from)
                .or_else(default_db_path),
            recent_limit: env_u64("RECENT_LIMIT", DEFAULT_RECENT_LIMIT as u64).clamp(1, 100)
                as usize,
            upcoming_limit: env_u64("UPCOMING_LIMIT", DEFAULT_UPCOMING_LIMIT as u64).clamp(1, 100)
                as usize,
            recent_window_days: env_u64(
                "FOOTBALL_DATA_RECENT_WINDOW_DAYS",
                DEFAULT_RECENT_WINDOW_DAYS,
            )
            .min(365),
            football_data: ProviderConfig::football_data_from_env(),
            sportsdb: ProviderConfig::sportsdb_from_env(),
        }
    }
}

pub fn app_data_dir() -> Option<PathBuf> {
    if let Ok(base) = env::var("XDG_CACHE_HOME") {
        if !base.trim().is_empty() {
            return Some(PathBuf::from(base).join(APP_DIR));
        }
    }
    let home = env::var("HOME").ok()?;
    if home.trim().is_empty() {
        return None;
    }
    Some(PathBuf::from(home).join(".cache").join(APP_DIR))
}

pub fn default_db_path() -> Option<PathBuf> {
    app_data_dir().map(|dir| dir.join(DB_FILE))
}

/// Caps throttle retries at [`MAX_RETRIES_CAP`], logging when it applies.
fn retry_limit(requested: u64) -> u32 {
    if requested > u64::from(MAX_RETRIES_CAP) {
        warn!(requested, cap = MAX_RETRIES_CAP, "MAX_RETRIES above cap, using cap");
        return MAX_RETRIES_CAP;
    }
    requested as u32
}

fn opt_env(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|val| val.trim().to_string())
        .filter(|val| !val.is_empty())
}

fn env_or(key: &str, default: &str) -> String {
    opt_env(key).unwrap_or_else(|| default.to_string())
}

fn env_u64(key: &str, default: u64) -> u64 {
    opt_env(key)
        .and_then(|val| val.parse::<u64>().ok())
        .unwrap_or(default)
}
