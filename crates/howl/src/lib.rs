//! # Howl
//!
//! The inbound command routing core of a chat bot.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌────────────┐     ┌─────────────┐     ┌──────────┐
//! │ connection  │────▶│  Runtime   │────▶│ Dispatcher  │────▶│ Command  │──▶ Messenger
//! │   layer     │     │ (per-event │     │ guard/parse │     │          │
//! └─────────────┘     │   task)    │     │  /recover   │     └──────────┘
//!                     └────────────┘     └─────────────┘
//! ```
//!
//! - **Runtime**: configuration, logging, metrics, background tasks
//! - **Dispatcher**: access rules, parsing, timing and failure recovery
//! - **Commands**: user code behind a trigger, tagged public or owner-only
//! - **Collaborators**: the platform seams ([`core::Messenger`],
//!   [`core::GameRegistry`], [`core::InviteResolver`], [`core::Scheduler`])
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use howl::prelude::*;
//!
//! struct Ping;
//!
//! #[async_trait]
//! impl Command for Ping {
//!     fn trigger(&self) -> &str {
//!         "ping"
//!     }
//!
//!     async fn execute(&self, ctx: &CommandContext) -> CommandResult {
//!         ctx.reply("pong").await?;
//!         Ok(())
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let mut commands = CommandRegistry::new();
//!     commands.register_public(Ping)?;
//!
//!     let runtime = HowlRuntime::builder()
//!         .commands(commands)
//!         .messenger(my_messenger)
//!         .build()?;
//!     runtime.run().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - `toml-config` (default): TOML configuration files
//! - `yaml-config`: YAML configuration files
//! - `json-log`: JSON log output
//! - `prometheus`: Prometheus exposition of dispatch timings

pub use howl_core as core;
pub use howl_framework as framework;
pub use howl_runtime as runtime;

/// Commonly used types for building a bot.
///
/// ```rust,ignore
/// use howl::prelude::*;
/// ```
pub mod prelude {
    // Runtime
    pub use howl_runtime::{HowlConfig, HowlRuntime, ImageAlbum};

    // Commands
    pub use howl_framework::{Capability, Command, CommandContext, CommandRegistry};

    // Events and failures
    pub use howl_core::{
        Author, ChannelId, ChannelInfo, CommandError, CommandResult, CommunityId, InboundEvent,
        MessageHandle, MessageId, UserId,
    };

    // Collaborator traits for custom implementations
    pub use howl_core::{GameHandle, GameRegistry, InviteResolver, Messenger, Scheduler};

    pub use howl_framework::async_trait;
}
