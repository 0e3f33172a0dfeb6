//! Commands and the command registry.
//!
//! Every command is registered under a [`Capability`] tag. The dispatcher
//! decides whether the invoker may run a command from that tag alone, never
//! by inspecting the command's concrete type.
//!
//! # Example
//!
//! ```rust,ignore
//! use howl_framework::{Command, CommandContext, CommandRegistry};
//!
//! struct Help;
//!
//! #[async_trait]
//! impl Command for Help {
//!     fn trigger(&self) -> &str {
//!         "help"
//!     }
//!
//!     async fn execute(&self, ctx: &CommandContext) -> CommandResult {
//!         ctx.reply("Try `w.start`").await?;
//!         Ok(())
//!     }
//! }
//!
//! let mut registry = CommandRegistry::new();
//! registry.register_public(Help)?;
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::context::CommandContext;
use crate::error::{RegistryError, RegistryResult};
use howl_core::CommandResult;

/// An executable command.
#[async_trait]
pub trait Command: Send + Sync + 'static {
    /// The primary trigger, without prefix.
    fn trigger(&self) -> &str;

    /// Additional triggers resolving to the same command.
    fn aliases(&self) -> &[&'static str] {
        &[]
    }

    /// Name used to label metrics and logs. Defaults to the trigger.
    fn name(&self) -> &str {
        self.trigger()
    }

    /// Runs the command for one invocation.
    async fn execute(&self, ctx: &CommandContext) -> CommandResult;
}

/// Who may invoke a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    /// Anyone who passes the access guard.
    Public,
    /// Only the configured owner.
    Owner,
}

/// A command together with its capability tag.
///
/// Cheap to clone; the command itself is shared.
#[derive(Clone)]
pub struct RegisteredCommand {
    command: Arc<dyn Command>,
    capability: Capability,
}

impl RegisteredCommand {
    pub fn new(command: Arc<dyn Command>, capability: Capability) -> Self {
        Self {
            command,
            capability,
        }
    }

    pub fn capability(&self) -> Capability {
        self.capability
    }

    pub fn is_owner_restricted(&self) -> bool {
        self.capability == Capability::Owner
    }

    /// The command kind used as a metrics label.
    pub fn kind(&self) -> &str {
        self.command.name()
    }

    pub fn trigger(&self) -> &str {
        self.command.trigger()
    }

    /// Runs the wrapped command.
    pub async fn execute(&self, ctx: &CommandContext) -> CommandResult {
        self.command.execute(ctx).await
    }
}

impl fmt::Debug for RegisteredCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisteredCommand")
            .field("trigger", &self.command.trigger())
            .field("capability", &self.capability)
            .finish()
    }
}

/// Lookup table from trigger to command.
///
/// Built once at startup and read-only afterwards, so it can be shared
/// behind an `Arc` by every dispatch cycle without locking.
#[derive(Default, Clone)]
pub struct CommandRegistry {
    /// Lowercased trigger (or alias) to command.
    commands: HashMap<String, RegisteredCommand>,
}

impl CommandRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a command anyone may invoke.
    pub fn register_public<C: Command>(&mut self, command: C) -> RegistryResult<()> {
        self.register(Arc::new(command), Capability::Public)
    }

    /// Registers a command only the owner may invoke.
    pub fn register_owner<C: Command>(&mut self, command: C) -> RegistryResult<()> {
        self.register(Arc::new(command), Capability::Owner)
    }

    /// Registers a shared command under the given capability.
    ///
    /// Fails without modifying the registry if the trigger or any alias is
    /// invalid or already taken.
    pub fn register(
        &mut self,
        command: Arc<dyn Command>,
        capability: Capability,
    ) -> RegistryResult<()> {
        let mut triggers = vec![command.trigger()];
        for alias in command.aliases() {
            triggers.push(*alias);
        }

        let mut keys: Vec<String> = Vec::with_capacity(triggers.len());
        for trigger in triggers {
            if trigger.is_empty() || trigger.chars().any(char::is_whitespace) {
                return Err(RegistryError::InvalidTrigger(trigger.to_string()));
            }
            let key = trigger.to_lowercase();
            if self.commands.contains_key(&key) || keys.contains(&key) {
                return Err(RegistryError::DuplicateTrigger(key));
            }
            keys.push(key);
        }

        debug!(
            trigger = command.trigger(),
            capability = ?capability,
            aliases = keys.len() - 1,
            "Registered command"
        );

        let registered = RegisteredCommand::new(command, capability);
        for key in keys {
            self.commands.insert(key, registered.clone());
        }
        Ok(())
    }

    /// Resolves a trigger, ignoring case.
    pub fn resolve(&self, trigger: &str) -> Option<&RegisteredCommand> {
        self.commands.get(&trigger.to_lowercase())
    }

    /// Number of registered triggers, aliases included.
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

impl fmt::Debug for CommandRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandRegistry")
            .field("trigger_count", &self.commands.len())
            .finish()
    }
}
