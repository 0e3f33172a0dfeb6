//! Outbound messaging contract.

use async_trait::async_trait;

use crate::error::MessagingResult;
use crate::event::{ChannelId, MessageId};

/// Reference to a message that was sent or received, enough to delete it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MessageHandle {
    pub channel: ChannelId,
    pub id: MessageId,
}

impl MessageHandle {
    pub fn new(channel: impl Into<ChannelId>, id: impl Into<MessageId>) -> Self {
        Self {
            channel: channel.into(),
            id: id.into(),
        }
    }
}

/// Sends and deletes text messages on the platform.
#[async_trait]
pub trait Messenger: Send + Sync + 'static {
    /// Posts `text` to `channel` and returns a handle to the new message.
    async fn send(&self, channel: ChannelId, text: &str) -> MessagingResult<MessageHandle>;

    /// Deletes a previously sent or received message.
    async fn delete(&self, message: MessageHandle) -> MessagingResult<()>;
}
