//! Incident reporting for unclassified command failures.
//!
//! Operators get the full causal chain in the logs, one error record per
//! link. The user gets a single apology pointing at the support invite
//! command. Nothing in here propagates a failure.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tracing::error;

use crate::dispatcher::panic_message;

use howl_core::{CausalChain, ChannelId, InboundEvent, InviteResolver, Messenger, UserId};

/// Community field value for events outside any community.
pub const NOT_A_COMMUNITY: &str = "not a guild";

/// Invite field value for direct-message events.
pub const PRIVATE_INVITE: &str = "PRIVATE";

/// What was reported about one failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncidentReport {
    /// `name(id)` of the community, or [`NOT_A_COMMUNITY`].
    pub community: String,
    pub channel: ChannelId,
    pub author: UserId,
    /// Invite link, [`PRIVATE_INVITE`], or empty when resolution failed.
    pub invite: String,
    pub chain: CausalChain,
    /// Whether the apology reached the channel.
    pub apology_sent: bool,
}

/// Logs unclassified failures and apologises to the user.
#[derive(Clone)]
pub struct DiagnosticReporter {
    messenger: Arc<dyn Messenger>,
    invites: Arc<dyn InviteResolver>,
    invite_trigger: String,
}

impl DiagnosticReporter {
    /// `invite_trigger` is the full prefixed command users should type for a
    /// support invite, e.g. `w.invite`.
    pub fn new(
        messenger: Arc<dyn Messenger>,
        invites: Arc<dyn InviteResolver>,
        invite_trigger: impl Into<String>,
    ) -> Self {
        Self {
            messenger,
            invites,
            invite_trigger: invite_trigger.into(),
        }
    }

    /// Reports `failure`, raised while handling `event`.
    pub async fn report(&self, event: &InboundEvent, failure: &anyhow::Error) -> IncidentReport {
        let chain = CausalChain::from_anyhow(failure);
        let community = event
            .community
            .as_ref()
            .map_or_else(|| NOT_A_COMMUNITY.to_string(), ToString::to_string);
        let invite = self.invite_for(event).await;

        for link in chain.iter() {
            error!(
                guild = %community,
                channel = %event.channel.id,
                author = %event.author.id,
                invite = %invite,
                "{link}"
            );
        }

        let apology = self.apology(event);
        let apology_sent = match self.messenger.send(event.channel.id, &apology).await {
            Ok(_) => true,
            Err(e) => {
                error!(error = %e, "Exception during exception handling of command");
                error!(error = %chain, "Original exception");
                false
            }
        };

        IncidentReport {
            community,
            channel: event.channel.id,
            author: event.author.id,
            invite,
            chain,
            apology_sent,
        }
    }

    async fn invite_for(&self, event: &InboundEvent) -> String {
        let community = match event.community_id() {
            Some(community) if !event.channel.is_direct() => community,
            _ => return PRIVATE_INVITE.to_string(),
        };

        let resolved = AssertUnwindSafe(self.invites.resolve_invite(community, event.channel.id))
            .catch_unwind()
            .await;
        match resolved {
            Ok(Ok(invite)) => invite,
            Ok(Err(e)) => {
                error!(
                    community = %community,
                    error = %e,
                    "Exception during exception handling of command creating an invite"
                );
                String::new()
            }
            Err(panic) => {
                error!(
                    community = %community,
                    panic = panic_message(panic.as_ref()),
                    "Exception during exception handling of command creating an invite"
                );
                String::new()
            }
        }
    }

    fn apology(&self, event: &InboundEvent) -> String {
        format!(
            "{}, an internal exception happened while executing your command:\n`{}`\n\
             Sorry about that. The issue has been logged and will hopefully be fixed soon.\n\
             If you want to help solve this as fast as possible, please join our support guild.\n\
             Say `{}` to receive an invite.",
            event.author.id.mention(),
            event.content,
            self.invite_trigger
        )
    }
}
