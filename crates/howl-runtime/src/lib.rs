//! Howl Runtime - orchestration layer for the Howl command routing core.
//!
//! This crate provides:
//! - Layered configuration loading and validation ([`config`])
//! - Logging setup ([`LoggingBuilder`])
//! - Metrics recorder installation ([`init_metrics`])
//! - The rotating image album backed by imgur ([`ImageAlbum`])
//! - Runtime orchestration ([`HowlRuntime`])
//!
//! ```ignore
//! use howl_runtime::HowlRuntime;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let runtime = HowlRuntime::builder()
//!         .commands(commands)
//!         .messenger(messenger)
//!         .build()?;
//!
//!     runtime.run().await?;
//!     Ok(())
//! }
//! ```
//!
//! # Features
//!
//! - `toml-config` (default): TOML configuration files
//! - `yaml-config`: YAML configuration files
//! - `json-log`: JSON log output
//! - `prometheus`: Prometheus exposition of dispatch timings

pub mod album;
pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod runtime;

pub use album::{ImageAlbum, RefreshOutcome};
pub use config::{ConfigError, ConfigLoader, ConfigResult, HowlConfig};
pub use error::{RuntimeError, RuntimeResult};
pub use logging::{LoggingBuilder, SpanEvents};
pub use metrics::{MetricsHandle, init_metrics};
pub use runtime::{HowlRuntime, RuntimeBuilder};

// Re-export tracing for use by other crates
pub use tracing;
pub use tracing_subscriber;

/// Logging macros for command implementations.
pub mod prelude {
    pub use tracing::{Level, debug, error, info, instrument, span, trace, warn};
}
