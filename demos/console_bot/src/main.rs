//! Console Bot
//!
//! Runs the Howl routing core against the terminal: every line typed on
//! stdin becomes an inbound message, and every reply is printed.
//!
//! # Usage
//!
//! ```bash
//! cargo run --package console-bot -- --owner 1 --user 1
//! ```
//!
//! Then type e.g. `d.help`, `d.picture`, `d.fail` or `d.shutdown`.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::{Context, Result};
use clap::Parser;
use howl::core::{InviteError, MessagingResult};
use howl::prelude::*;
use howl::runtime::ConfigLoader;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "console-bot", about = "Drive the Howl routing core from stdin")]
struct Args {
    /// Configuration file (defaults to howl.toml in the current directory)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Configuration profile
    #[arg(long)]
    profile: Option<String>,

    /// Owner user id, overriding the configuration
    #[arg(long)]
    owner: Option<u64>,

    /// User id the typed messages come from
    #[arg(long, default_value_t = 2)]
    user: u64,

    /// Channel id the typed messages are posted in
    #[arg(long, default_value_t = 10)]
    channel: u64,

    /// Community the channel belongs to. A direct channel when unset
    #[arg(long)]
    community: Option<u64>,
}

// ============================================================================
// Collaborators
// ============================================================================

/// Prints outbound messages.
#[derive(Default)]
struct ConsoleMessenger {
    next_id: AtomicU64,
}

#[async_trait]
impl Messenger for ConsoleMessenger {
    async fn send(&self, channel: ChannelId, text: &str) -> MessagingResult<MessageHandle> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1_000;
        println!("[{channel} #{id}] {text}");
        Ok(MessageHandle::new(channel, id))
    }

    async fn delete(&self, message: MessageHandle) -> MessagingResult<()> {
        println!("[{} #{}] (deleted)", message.channel, message.id);
        Ok(())
    }
}

struct ConsoleInvites;

#[async_trait]
impl InviteResolver for ConsoleInvites {
    async fn resolve_invite(
        &self,
        community: CommunityId,
        _channel: ChannelId,
    ) -> Result<String, InviteError> {
        Ok(format!("https://discord.gg/howl-{community}"))
    }
}

// ============================================================================
// Commands
// ============================================================================

struct Help;

#[async_trait]
impl Command for Help {
    fn trigger(&self) -> &str {
        "help"
    }

    async fn execute(&self, ctx: &CommandContext) -> CommandResult {
        ctx.reply(
            "help - this text\n\
             picture - the next image of the album\n\
             fail - fails on purpose\n\
             shutdown - stops the bot (owner only)",
        )
        .await?;
        Ok(())
    }
}

struct Picture {
    album: ImageAlbum,
}

#[async_trait]
impl Command for Picture {
    fn trigger(&self) -> &str {
        "picture"
    }

    fn aliases(&self) -> &[&'static str] {
        &["pic"]
    }

    async fn execute(&self, ctx: &CommandContext) -> CommandResult {
        let Some(url) = self.album.next() else {
            return Err(CommandError::user_friendly("The album is empty."));
        };
        ctx.reply(&url).await?;
        Ok(())
    }
}

struct Fail;

#[async_trait]
impl Command for Fail {
    fn trigger(&self) -> &str {
        "fail"
    }

    async fn execute(&self, _ctx: &CommandContext) -> CommandResult {
        let save: Result<()> = Err(anyhow::anyhow!("checksum mismatch"));
        save.context("loading the game save")?;
        Ok(())
    }
}

struct Shutdown {
    quit: CancellationToken,
}

#[async_trait]
impl Command for Shutdown {
    fn trigger(&self) -> &str {
        "shutdown"
    }

    async fn execute(&self, ctx: &CommandContext) -> CommandResult {
        ctx.reply("Shutting down.").await?;
        self.quit.cancel();
        Ok(())
    }
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut loader = ConfigLoader::new().with_current_dir();
    if let Some(path) = &args.config {
        loader = loader.file(path);
    }
    if let Some(profile) = &args.profile {
        loader = loader.profile(profile);
    }
    let mut config = loader.load()?;
    if let Some(owner) = args.owner {
        config.bot.owner_id = owner;
    }
    let prefix = config.bot.active_prefix().to_string();

    let album = ImageAlbum::from_config(&config.album)?;
    let quit = CancellationToken::new();

    let mut commands = CommandRegistry::new();
    commands.register_public(Help)?;
    commands.register_public(Picture {
        album: album.clone(),
    })?;
    commands.register_public(Fail)?;
    commands.register_owner(Shutdown { quit: quit.clone() })?;

    let runtime = HowlRuntime::builder()
        .config(config)
        .commands(commands)
        .messenger(Arc::new(ConsoleMessenger::default()))
        .invites(Arc::new(ConsoleInvites))
        .album(album)
        .build()?;
    runtime.start();

    info!(prefix = %prefix, user = args.user, channel = args.channel, "Reading messages from stdin");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut next_message = 1u64;
    loop {
        tokio::select! {
            () = quit.cancelled() => break,
            _ = tokio::signal::ctrl_c() => break,
            line = lines.next_line() => {
                let Some(text) = line? else { break };
                let author = Author::user(args.user, "console");
                let event = match args.community {
                    Some(community) => {
                        InboundEvent::new(next_message, author, ChannelInfo::text(args.channel), text)
                            .in_community(community, "console")
                    }
                    None => InboundEvent::new(next_message, author, ChannelInfo::direct(args.channel), text),
                };
                next_message += 1;
                runtime.on_inbound_event(event);
            }
        }
    }

    runtime.stop().await;
    Ok(())
}
