//! Configuration for the Howl runtime.
//!
//! Layered loading (defaults, files, `HOWL_*` environment variables) lives in
//! [`loader`], the schema in [`schema`] and the startup checks in
//! [`validation`].

pub mod error;
pub mod loader;
pub mod schema;
pub mod validation;

pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigLoader, Profile, load_config, load_config_from_file};
pub use schema::{
    AlbumConfig, BotConfig, HowlConfig, LogFormat, LogLevel, LogOutput, LoggingConfig,
    LoungeConfig, MetricsConfig, SpanEventConfig,
};
pub use validation::{album_id, validate_config};
