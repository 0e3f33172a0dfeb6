//! Configuration schema definitions.

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use howl_core::{CategoryId, ChannelId, CommunityId, UserId};
use howl_framework::{RestrictedCommunity, RoutingConfig};

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HowlConfig {
    /// Bot identity and command prefixes.
    #[serde(default)]
    pub bot: BotConfig,

    /// The operator community where commands are confined.
    #[serde(default)]
    pub lounge: LoungeConfig,

    /// Image album served by game commands.
    #[serde(default)]
    pub album: AlbumConfig,

    /// Metrics collection.
    #[serde(default)]
    pub metrics: MetricsConfig,

    /// Logging setup.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl HowlConfig {
    /// The routing settings handed to the dispatcher.
    pub fn routing(&self) -> RoutingConfig {
        let routing = RoutingConfig::new(self.bot.active_prefix(), self.bot.owner_id);
        match self.lounge.restricted_community() {
            Some(restricted) => routing.restricted(restricted),
            None => routing,
        }
    }
}

// =============================================================================
// Bot
// =============================================================================

/// Bot identity and command prefixes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotConfig {
    /// Use the debug prefix instead of the default one.
    #[serde(default = "default_debug")]
    pub debug: bool,

    #[serde(default = "default_prefix")]
    pub default_prefix: String,

    #[serde(default = "default_debug_prefix")]
    pub debug_prefix: String,

    /// The user allowed to run owner-only commands.
    #[serde(default)]
    pub owner_id: u64,

    /// Platform token, consumed by the connection layer.
    #[serde(default)]
    pub token: String,

    /// Channel operators read bot logs in. Zero when unused.
    #[serde(default)]
    pub log_channel_id: u64,
}

impl BotConfig {
    /// The prefix commands are recognised by.
    pub fn active_prefix(&self) -> &str {
        if self.debug {
            &self.debug_prefix
        } else {
            &self.default_prefix
        }
    }

    pub fn owner(&self) -> UserId {
        UserId(self.owner_id)
    }
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            debug: default_debug(),
            default_prefix: default_prefix(),
            debug_prefix: default_debug_prefix(),
            owner_id: 0,
            token: String::new(),
            log_channel_id: 0,
        }
    }
}

fn default_debug() -> bool {
    true
}

fn default_prefix() -> String {
    "w.".to_string()
}

fn default_debug_prefix() -> String {
    "d.".to_string()
}

// =============================================================================
// Lounge
// =============================================================================

/// The operator community. All ids zero means no community is restricted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoungeConfig {
    #[serde(default)]
    pub community_id: u64,

    /// Channel where anyone may run commands.
    #[serde(default)]
    pub exempt_channel_id: u64,

    /// Category holding the game channels.
    #[serde(default)]
    pub game_category_id: u64,

    /// Channel the rules reminder points at.
    #[serde(default)]
    pub rules_channel_id: u64,

    /// Seconds the rules reminder stays up.
    #[serde(default = "default_notice_ttl_secs")]
    pub notice_ttl_secs: u64,
}

impl LoungeConfig {
    pub fn is_enabled(&self) -> bool {
        self.community_id != 0
    }

    pub fn restricted_community(&self) -> Option<RestrictedCommunity> {
        self.is_enabled().then(|| RestrictedCommunity {
            community: CommunityId(self.community_id),
            exempt_channel: ChannelId(self.exempt_channel_id),
            game_category: CategoryId(self.game_category_id),
            rules_channel: ChannelId(self.rules_channel_id),
            notice_ttl: Duration::from_secs(self.notice_ttl_secs),
        })
    }
}

impl Default for LoungeConfig {
    fn default() -> Self {
        Self {
            community_id: 0,
            exempt_channel_id: 0,
            game_category_id: 0,
            rules_channel_id: 0,
            notice_ttl_secs: default_notice_ttl_secs(),
        }
    }
}

fn default_notice_ttl_secs() -> u64 {
    5
}

// =============================================================================
// Album
// =============================================================================

/// Imgur album backing the image rotation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlbumConfig {
    /// Album url, e.g. `https://imgur.com/a/abc123`. No refresh when unset.
    #[serde(default)]
    pub url: Option<String>,

    /// Imgur API client id.
    #[serde(default)]
    pub client_id: String,

    #[serde(default = "default_refresh_interval_secs")]
    pub refresh_interval_secs: u64,

    /// Image served until the album has been fetched.
    #[serde(default = "default_fallback_url")]
    pub fallback_url: String,

    /// Base url of the imgur API.
    #[serde(default = "default_api_base")]
    pub api_base: String,
}

impl AlbumConfig {
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }
}

impl Default for AlbumConfig {
    fn default() -> Self {
        Self {
            url: None,
            client_id: String::new(),
            refresh_interval_secs: default_refresh_interval_secs(),
            fallback_url: default_fallback_url(),
            api_base: default_api_base(),
        }
    }
}

fn default_refresh_interval_secs() -> u64 {
    3600
}

fn default_fallback_url() -> String {
    "http://i.imgur.com/KLXYGHG.png".to_string()
}

fn default_api_base() -> String {
    "https://api.imgur.com/3".to_string()
}

// =============================================================================
// Metrics
// =============================================================================

/// Metrics collection settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Record dispatch timings.
    #[serde(default)]
    pub enabled: bool,

    /// Labels added to every exported metric.
    #[serde(default)]
    pub global_labels: HashMap<String, String>,
}

// =============================================================================
// Logging
// =============================================================================

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Base log level. `RUST_LOG` takes precedence when set.
    #[serde(default)]
    pub level: LogLevel,

    #[serde(default)]
    pub format: LogFormat,

    #[serde(default)]
    pub output: LogOutput,

    /// Log file, required when `output` is `file`.
    #[serde(default)]
    pub file_path: Option<PathBuf>,

    #[serde(default)]
    pub thread_ids: bool,

    /// Include file names and line numbers.
    #[serde(default)]
    pub file_location: bool,

    /// Per-module levels, e.g. `howl_framework = "debug"`.
    #[serde(default)]
    pub filters: HashMap<String, LogLevel>,

    #[serde(default)]
    pub span_events: SpanEventConfig,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            format: LogFormat::Compact,
            output: LogOutput::Stdout,
            file_path: None,
            thread_ids: false,
            file_location: false,
            filters: HashMap::new(),
            span_events: SpanEventConfig::default(),
        }
    }
}

/// Log level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }

    pub fn to_tracing_level(self) -> tracing::Level {
        match self {
            Self::Trace => tracing::Level::TRACE,
            Self::Debug => tracing::Level::DEBUG,
            Self::Info => tracing::Level::INFO,
            Self::Warn => tracing::Level::WARN,
            Self::Error => tracing::Level::ERROR,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Log line layout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Full,
    Pretty,
    /// Requires the `json-log` feature.
    Json,
}

/// Where log lines go.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogOutput {
    #[default]
    Stdout,
    Stderr,
    File,
}

/// Which span lifecycle events are logged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpanEventConfig {
    #[serde(default)]
    pub new: bool,
    #[serde(default)]
    pub enter: bool,
    #[serde(default)]
    pub exit: bool,
    #[serde(default)]
    pub close: bool,
}
