//! Server configuration loaded from environment variables.
//!
//! All settings have sensible defaults so the server can start with zero
//! configuration for local development.

use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

use chrono::{FixedOffset, Offset, Utc};

use helphub_engine::push::PlatformHints;
use helphub_engine::tournament::TournamentSettings;
use helphub_shared::constants::{DEFAULT_ANDROID_CHANNEL, DEFAULT_GROUP_SIZE, DEFAULT_MEDAL_CUTOFF};

/// Server configuration.
///
/// The `Debug` output masks the API and push tokens so the configuration can
/// be logged.
#[derive(Clone)]
pub struct ServerConfig {
    /// Socket address for the HTTP (axum) API server.
    /// Env: `HTTP_ADDR`
    /// Default: `0.0.0.0:8080`
    pub http_addr: SocketAddr,

    /// SQLite database file.
    /// Env: `DATABASE_PATH`
    /// Default: `None` (platform data directory).
    pub database_path: Option<PathBuf>,

    /// Bearer token for triggers, admin jobs and inbox reads.
    /// Env: `API_TOKEN`
    /// Default: empty (protected routes disabled).
    pub api_token: Option<String>,

    /// Push gateway URL.
    /// Env: `PUSH_ENDPOINT`
    /// Default: empty (pushes are only logged).
    pub push_endpoint: Option<String>,

    /// Env: `PUSH_AUTH_TOKEN`
    pub push_auth_token: Option<String>,

    /// Env: `PUSH_ANDROID_CHANNEL`
    /// Default: `helphub_channel`
    pub push_android_channel: String,

    /// Directory holding `medals/<season>/<tier>.png`.
    /// Env: `MEDAL_ASSET_DIR`
    /// Default: `./assets`
    pub medal_asset_dir: PathBuf,

    /// Public prefix of resolved medal icons.
    /// Env: `MEDAL_ASSET_BASE_URL`
    /// Default: `/assets`
    pub medal_asset_base_url: String,

    /// Env: `TOURNAMENT_GROUP_SIZE` (>= 1)
    pub group_size: usize,

    /// Env: `TOURNAMENT_MEDAL_CUTOFF` (>= 1)
    pub medal_cutoff: usize,

    /// Calendar used for scheduled jobs and season ids.
    /// Env: `SCHEDULE_UTC_OFFSET_HOURS`
    /// Default: `2`
    pub utc_offset_hours: i32,

    /// Env: `DAILY_JOB_HOUR` (0..=23)
    pub daily_job_hour: u32,

    /// Env: `SEASON_START_HOUR` (0..=23)
    pub season_start_hour: u32,

    /// Env: `SEASON_END_HOUR` (0..=23)
    pub season_end_hour: u32,
}

fn redacted(secret: &Option<String>) -> Option<&'static str> {
    secret.as_ref().map(|_| "<redacted>")
}

impl fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerConfig")
            .field("http_addr", &self.http_addr)
            .field("database_path", &self.database_path)
            .field("api_token", &redacted(&self.api_token))
            .field("push_endpoint", &self.push_endpoint)
            .field("push_auth_token", &redacted(&self.push_auth_token))
            .field("push_android_channel", &self.push_android_channel)
            .field("medal_asset_dir", &self.medal_asset_dir)
            .field("medal_asset_base_url", &self.medal_asset_base_url)
            .field("group_size", &self.group_size)
            .field("medal_cutoff", &self.medal_cutoff)
            .field("utc_offset_hours", &self.utc_offset_hours)
            .field("daily_job_hour", &self.daily_job_hour)
            .field("season_start_hour", &self.season_start_hour)
            .field("season_end_hour", &self.season_end_hour)
            .finish()
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: ([0, 0, 0, 0], 8080).into(),
            database_path: None,
            api_token: None,
            push_endpoint: None,
            push_auth_token: None,
            push_android_channel: DEFAULT_ANDROID_CHANNEL.to_string(),
            medal_asset_dir: PathBuf::from("./assets"),
            medal_asset_base_url: "/assets".to_string(),
            group_size: DEFAULT_GROUP_SIZE,
            medal_cutoff: DEFAULT_MEDAL_CUTOFF,
            utc_offset_hours: 2,
            daily_job_hour: 6,
            season_start_hour: 4,
            season_end_hour: 23,
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(addr) = lookup("HTTP_ADDR") {
            parse_into(&mut config.http_addr, "HTTP_ADDR", &addr, |_| true);
        }

        if let Some(path) = non_empty(lookup("DATABASE_PATH")) {
            config.database_path = Some(PathBuf::from(path));
        }

        config.api_token = non_empty(lookup("API_TOKEN"));
        config.push_endpoint = non_empty(lookup("PUSH_ENDPOINT"));
        config.push_auth_token = non_empty(lookup("PUSH_AUTH_TOKEN"));

        if let Some(channel) = non_empty(lookup("PUSH_ANDROID_CHANNEL")) {
            config.push_android_channel = channel;
        }

        if let Some(dir) = non_empty(lookup("MEDAL_ASSET_DIR")) {
            config.medal_asset_dir = PathBuf::from(dir);
        }
        if let Some(url) = non_empty(lookup("MEDAL_ASSET_BASE_URL")) {
            config.medal_asset_base_url = url;
        }

        if let Some(val) = lookup("TOURNAMENT_GROUP_SIZE") {
            parse_into(&mut config.group_size, "TOURNAMENT_GROUP_SIZE", &val, |n| *n >= 1);
        }
        if let Some(val) = lookup("TOURNAMENT_MEDAL_CUTOFF") {
            parse_into(&mut config.medal_cutoff, "TOURNAMENT_MEDAL_CUTOFF", &val, |n| *n >= 1);
        }

        if let Some(val) = lookup("SCHEDULE_UTC_OFFSET_HOURS") {
            parse_into(&mut config.utc_offset_hours, "SCHEDULE_UTC_OFFSET_HOURS", &val, |h| {
                (-23..=23).contains(h)
            });
        }
        for (key, slot) in [
            ("DAILY_JOB_HOUR", &mut config.daily_job_hour),
            ("SEASON_START_HOUR", &mut config.season_start_hour),
            ("SEASON_END_HOUR", &mut config.season_end_hour),
        ] {
            if let Some(val) = lookup(key) {
                parse_into(slot, key, &val, |h| *h <= 23);
            }
        }

        config
    }

    /// Fixed offset of the scheduling calendar.
    pub fn utc_offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.utc_offset_hours * 3600).unwrap_or_else(|| Utc.fix())
    }

    pub fn tournament_settings(&self) -> TournamentSettings {
        TournamentSettings {
            group_size: self.group_size,
            medal_cutoff: self.medal_cutoff,
        }
    }

    pub fn platform_hints(&self) -> PlatformHints {
        PlatformHints {
            android_channel: self.push_android_channel.clone(),
            ..PlatformHints::default()
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Parse `raw` into `slot` when it is valid, otherwise keep the default.
fn parse_into<T, V>(slot: &mut T, key: &str, raw: &str, valid: V)
where
    T: FromStr,
    V: Fn(&T) -> bool,
{
    match raw.trim().parse::<T>() {
        Ok(value) if valid(&value) => *slot = value,
        _ => tracing::warn!(key, value = %raw, "invalid configuration value, using default"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn from_pairs(pairs: &[(&str, &str)]) -> ServerConfig {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServerConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_default_config() {
        let config = from_pairs(&[]);
        assert_eq!(config.http_addr, ([0, 0, 0, 0], 8080).into());
        assert!(config.api_token.is_none());
        assert!(config.push_endpoint.is_none());
        assert_eq!(config.group_size, 100);
        assert_eq!(config.medal_cutoff, 10);
        assert_eq!(config.utc_offset().local_minus_utc(), 7200);
        assert_eq!(config.platform_hints().android_channel, "helphub_channel");
    }

    #[test]
    fn test_overrides() {
        let config = from_pairs(&[
            ("HTTP_ADDR", "127.0.0.1:9000"),
            ("API_TOKEN", "secret"),
            ("TOURNAMENT_GROUP_SIZE", "25"),
            ("SCHEDULE_UTC_OFFSET_HOURS", "-5"),
            ("DAILY_JOB_HOUR", "7"),
            ("PUSH_ANDROID_CHANNEL", "alerts"),
        ]);
        assert_eq!(config.http_addr, ([127, 0, 0, 1], 9000).into());
        assert_eq!(config.api_token.as_deref(), Some("secret"));
        assert_eq!(config.tournament_settings().group_size, 25);
        assert_eq!(config.utc_offset().local_minus_utc(), -5 * 3600);
        assert_eq!(config.daily_job_hour, 7);
        assert_eq!(config.platform_hints().android_channel, "alerts");
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let config = from_pairs(&[
            ("HTTP_ADDR", "nope"),
            ("TOURNAMENT_GROUP_SIZE", "0"),
            ("TOURNAMENT_MEDAL_CUTOFF", "many"),
            ("SEASON_END_HOUR", "24"),
            ("API_TOKEN", "  "),
        ]);
        assert_eq!(config.http_addr, ([0, 0, 0, 0], 8080).into());
        assert_eq!(config.group_size, 100);
        assert_eq!(config.medal_cutoff, 10);
        assert_eq!(config.season_end_hour, 23);
        assert!(config.api_token.is_none());
    }

    #[test]
    fn test_debug_masks_tokens() {
        let config = from_pairs(&[
            ("API_TOKEN", "api-secret-123"),
            ("PUSH_AUTH_TOKEN", "push-secret-456"),
            ("PUSH_ENDPOINT", "https://push.example.org/send"),
        ]);
        let printed = format!("{config:?}");
        assert!(!printed.contains("api-secret-123"));
        assert!(!printed.contains("push-secret-456"));
        assert!(printed.contains("<redacted>"));
        assert!(printed.contains("https://push.example.org/send"));

        let unset = format!("{:?}", from_pairs(&[]));
        assert!(unset.contains("api_token: None"));
    }
}
