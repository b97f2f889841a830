//! Configuration types for sgw-sniper

use serde::Deserialize;
use std::collections::HashMap;
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub auth: AuthConfig,
    #[serde(default)]
    pub sniper: SniperConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

/// Authentication configuration
///
/// `universal` mode uses one account for everything. `command_bid` keeps
/// the browsing/scheduling account separate from the one that submits
/// bids, so a bid-account sanction cannot take the watcher down with it.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    #[serde(default)]
    pub mode: AuthMode,
    /// Credentials for `universal` mode
    #[serde(flatten)]
    pub account: Credentials,
    /// Browsing/scheduling account for `command_bid` mode
    pub command_account: Option<Credentials>,
    /// Bid-submitting account for `command_bid` mode
    pub bid_account: Option<Credentials>,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum AuthMode {
    #[default]
    Universal,
    CommandBid,
}

/// One account's credentials. A bearer token is preferred when present
/// and still valid; otherwise the username/password pair (plain or
/// pre-obfuscated) is used to log in.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Credentials {
    pub access_token: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub encrypted_username: Option<String>,
    pub encrypted_password: Option<String>,
}

impl AuthConfig {
    /// Credentials for browsing, scheduling, and favorite mutations.
    pub fn command_credentials(&self) -> anyhow::Result<&Credentials> {
        match self.mode {
            AuthMode::Universal => Ok(&self.account),
            AuthMode::CommandBid => self.command_account.as_ref().ok_or_else(|| {
                anyhow::anyhow!("auth.mode = \"command_bid\" requires [auth.command_account]")
            }),
        }
    }

    /// Credentials for the account that submits bids.
    pub fn bid_credentials(&self) -> anyhow::Result<&Credentials> {
        match self.mode {
            AuthMode::Universal => Ok(&self.account),
            AuthMode::CommandBid => self.bid_account.as_ref().ok_or_else(|| {
                anyhow::anyhow!("auth.mode = \"command_bid\" requires [auth.bid_account]")
            }),
        }
    }
}

/// Sniper daemon configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SniperConfig {
    /// Poll period for the scheduling loop (seconds)
    #[serde(default = "default_refresh_seconds")]
    pub refresh_seconds: u64,

    /// Staleness bound for the favorites cache (seconds)
    #[serde(default = "default_favorites_max_cache_seconds")]
    pub favorites_max_cache_seconds: u64,

    /// Reminder offsets before auction close, e.g. ["5 minutes", "1 minute"]
    #[serde(default)]
    pub alert_time_deltas: Vec<String>,

    /// Offset before auction close at which the snipe bid fires
    #[serde(default = "default_bid_snipe_time_delta")]
    pub bid_snipe_time_delta: String,

    /// Bidder names that must never be outbid
    #[serde(default)]
    pub friend_list: Vec<String>,

    /// If set, favorites without a note get this note on each poll
    #[serde(default)]
    pub favorite_default_note: Option<String>,

    /// Log bid intents without submitting them
    #[serde(default)]
    pub dry_run: bool,
}

fn default_refresh_seconds() -> u64 {
    300
}
fn default_favorites_max_cache_seconds() -> u64 {
    60
}
fn default_bid_snipe_time_delta() -> String {
    "30 seconds".to_string()
}

impl Default for SniperConfig {
    fn default() -> Self {
        Self {
            refresh_seconds: 300,
            favorites_max_cache_seconds: 60,
            alert_time_deltas: Vec::new(),
            bid_snipe_time_delta: "30 seconds".to_string(),
            friend_list: Vec::new(),
            favorite_default_note: None,
            dry_run: false,
        }
    }
}

/// Saved-search alerting configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SearchConfig {
    /// Where the seen-listings store lives
    #[serde(default = "default_seen_listings_path")]
    pub seen_listings_path: PathBuf,

    /// Global time-remaining filter, e.g. "<2 hours" or ">30 minutes"
    #[serde(default)]
    pub time_remaining: Option<String>,

    /// Per-query filter overrides, keyed by saved-search id
    #[serde(default)]
    pub filters: HashMap<String, QueryFilter>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct QueryFilter {
    #[serde(default)]
    pub time_remaining: Option<String>,
}

fn default_seen_listings_path() -> PathBuf {
    PathBuf::from("seen_listings.json")
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            seen_listings_path: default_seen_listings_path(),
            time_remaining: None,
            filters: HashMap::new(),
        }
    }
}

/// Telemetry configuration
#[derive(Debug, Clone, Deserialize)]
pub struct TelemetryConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// If set, serve Prometheus metrics on this port
    #[serde(default)]
    pub metrics_port: Option<u16>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_port: None,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<std::path::Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }
}
