//! The command invocation handed to [`Command::execute`](crate::Command::execute).

use std::fmt;
use std::sync::Arc;

use howl_core::{
    ChannelId, InboundEvent, MessageHandle, Messenger, MessagingResult, UserId,
};

use crate::command::RegisteredCommand;

/// One parsed command invocation.
///
/// Built by the [`ContextParser`](crate::ContextParser) and immutable from
/// then on. The dispatcher owns it for the duration of one execution.
pub struct CommandContext {
    command: RegisteredCommand,
    trigger: String,
    invoker: UserId,
    channel: ChannelId,
    raw_args: String,
    args: Vec<String>,
    event: InboundEvent,
    messenger: Arc<dyn Messenger>,
}

impl CommandContext {
    pub(crate) fn new(
        command: RegisteredCommand,
        trigger: String,
        raw_args: String,
        args: Vec<String>,
        event: InboundEvent,
        messenger: Arc<dyn Messenger>,
    ) -> Self {
        Self {
            command,
            trigger,
            invoker: event.author.id,
            channel: event.channel.id,
            raw_args,
            args,
            event,
            messenger,
        }
    }

    /// The resolved command.
    pub fn command(&self) -> &RegisteredCommand {
        &self.command
    }

    /// The trigger as typed, lowercased and without prefix.
    pub fn trigger(&self) -> &str {
        &self.trigger
    }

    pub fn invoker(&self) -> UserId {
        self.invoker
    }

    pub fn channel(&self) -> ChannelId {
        self.channel
    }

    /// Everything after the trigger, trimmed.
    pub fn raw_args(&self) -> &str {
        &self.raw_args
    }

    /// Arguments split shell-style.
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// The event this invocation was parsed from.
    pub fn event(&self) -> &InboundEvent {
        &self.event
    }

    /// The raw message text.
    pub fn raw_text(&self) -> &str {
        &self.event.content
    }

    /// Handle to the invoking message.
    pub fn message(&self) -> MessageHandle {
        MessageHandle::new(self.channel, self.event.message_id)
    }

    /// Sends `text` to the invoking channel.
    pub async fn reply(&self, text: &str) -> MessagingResult<MessageHandle> {
        self.messenger.send(self.channel, text).await
    }

    /// Sends `text` to the invoking channel, prefixed with a mention of the invoker.
    pub async fn reply_with_mention(&self, text: &str) -> MessagingResult<MessageHandle> {
        let text = format!("{}, {}", self.invoker.mention(), text);
        self.messenger.send(self.channel, &text).await
    }

    /// Deletes the invoking message.
    pub async fn delete_message(&self) -> MessagingResult<()> {
        self.messenger.delete(self.message()).await
    }

    /// The messenger this invocation replies through.
    pub fn messenger(&self) -> &Arc<dyn Messenger> {
        &self.messenger
    }
}

impl fmt::Debug for CommandContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandContext")
            .field("command", &self.command)
            .field("invoker", &self.invoker)
            .field("channel", &self.channel)
            .field("args", &self.args)
            .finish_non_exhaustive()
    }
}
