//! Support invite resolution.

use async_trait::async_trait;

use crate::error::InviteError;
use crate::event::{ChannelId, CommunityId};

/// Resolves (or creates) an invite link for a community channel.
#[async_trait]
pub trait InviteResolver: Send + Sync + 'static {
    async fn resolve_invite(
        &self,
        community: CommunityId,
        channel: ChannelId,
    ) -> Result<String, InviteError>;
}

/// A resolver that never produces invites.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoInvites;

#[async_trait]
impl InviteResolver for NoInvites {
    async fn resolve_invite(
        &self,
        community: CommunityId,
        _channel: ChannelId,
    ) -> Result<String, InviteError> {
        Err(InviteError::MissingPermission { community })
    }
}
