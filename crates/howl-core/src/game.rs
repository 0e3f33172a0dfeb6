//! Contract with the game-state engine.
//!
//! The engine owns per-channel game state and guarantees at most one writer
//! per channel. The routing core only looks games up and tells them that a
//! user posted; it never coordinates writers itself.

use std::sync::Arc;

use crate::event::{ChannelId, InboundEvent};

/// A running game bound to one channel.
pub trait GameHandle: Send + Sync {
    /// Records that a user posted in the game's channel. Best-effort.
    fn notify_user_posted(&self, event: &InboundEvent);
}

/// Lookup of running games by channel.
pub trait GameRegistry: Send + Sync + 'static {
    fn lookup(&self, channel: ChannelId) -> Option<Arc<dyn GameHandle>>;
}

/// A registry with no games at all.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoGames;

impl GameRegistry for NoGames {
    fn lookup(&self, _channel: ChannelId) -> Option<Arc<dyn GameHandle>> {
        None
    }
}
