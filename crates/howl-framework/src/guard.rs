//! Access control for inbound commands.
//!
//! The guard is a fixed sequence of rules. Each rule reaches exactly one
//! [`AccessDecision`] and the first denial short-circuits the rest:
//!
//! 1. [`GuardRule::BotOrigin`]: automated authors are dropped silently.
//! 2. [`GuardRule::SendPermission`]: channels the bot cannot post in are
//!    dropped silently, except for the help trigger.
//! 3. [`GuardRule::RestrictedCommunity`]: inside the operator community,
//!    commands are only accepted in the exempt channel, in game channels, or
//!    from the owner. Everyone else gets a rules reminder that cleans itself
//!    up together with the offending message.
//! 4. [`GuardRule::Privilege`]: owner-only commands from anyone else are
//!    dropped and logged.
//!
//! Rules 1 and 2 run on the raw event ([`AccessGuard::admit`]), rule 3 on the
//! parsed invocation ([`AccessGuard::check_community`]) and rule 4 right
//! before execution ([`AccessGuard::check_privilege`]). The guard never
//! awaits I/O; the only side effect it starts is fire-and-forget scheduling.

use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use tracing::{debug, info, trace};

use crate::context::CommandContext;
use howl_core::{
    CategoryId, ChannelId, CommunityId, InboundEvent, MessageHandle, Messenger, Scheduler,
    UserId,
};

/// Why an event was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    BotAuthor,
    CannotTalk,
    RestrictedCommunity,
    OwnerOnly,
}

/// A user-visible notice attached to a denial.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub text: String,
    /// When set, the notice and the offending message are deleted after this delay.
    pub ttl: Option<Duration>,
}

/// Outcome of one guard rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessDecision {
    Allow,
    DenySilent(DenyReason),
    DenyWithNotice(DenyReason, Notice),
}

impl AccessDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allow)
    }
}

/// The individual guard rules, in evaluation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardRule {
    BotOrigin,
    SendPermission,
    RestrictedCommunity,
    Privilege,
}

/// The operator community where commands are confined to a few places.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestrictedCommunity {
    pub community: CommunityId,
    /// Channel where any command is fine.
    pub exempt_channel: ChannelId,
    /// Category holding the game channels.
    pub game_category: CategoryId,
    /// Channel the reminder points at.
    pub rules_channel: ChannelId,
    /// How long the reminder and the offending message stay up.
    pub notice_ttl: Duration,
}

impl RestrictedCommunity {
    /// Reminder sent to users commanding in the wrong place.
    pub fn notice_text(&self) -> String {
        format!("read the **rules** in {}.", self.rules_channel.mention())
    }
}

/// The access guard.
#[derive(Clone)]
pub struct AccessGuard {
    help_trigger: String,
    owner: UserId,
    restricted: Option<RestrictedCommunity>,
    scheduler: Arc<dyn Scheduler>,
}

impl AccessGuard {
    /// Creates a guard.
    ///
    /// `help_trigger` is the full prefixed help command (e.g. `w.help`) that
    /// may bypass the send-permission rule.
    pub fn new(
        help_trigger: impl Into<String>,
        owner: UserId,
        restricted: Option<RestrictedCommunity>,
        scheduler: Arc<dyn Scheduler>,
    ) -> Self {
        Self {
            help_trigger: help_trigger.into().to_lowercase(),
            owner,
            restricted,
            scheduler,
        }
    }

    pub fn owner(&self) -> UserId {
        self.owner
    }

    /// Evaluates the admission rules (bot origin, send permission).
    pub fn admit(&self, event: &InboundEvent) -> AccessDecision {
        for rule in [GuardRule::BotOrigin, GuardRule::SendPermission] {
            let decision = self.evaluate(rule, event);
            trace!(?rule, ?decision, "Guard rule evaluated");
            if !decision.is_allowed() {
                return decision;
            }
        }
        AccessDecision::Allow
    }

    fn evaluate(&self, rule: GuardRule, event: &InboundEvent) -> AccessDecision {
        match rule {
            GuardRule::BotOrigin if event.author.bot => {
                AccessDecision::DenySilent(DenyReason::BotAuthor)
            }
            GuardRule::SendPermission
                if !event.channel.can_talk && !self.is_help_request(&event.content) =>
            {
                AccessDecision::DenySilent(DenyReason::CannotTalk)
            }
            _ => AccessDecision::Allow,
        }
    }

    /// Whether raw text starts with the help trigger, ignoring case and
    /// leading whitespace the same way the parser does.
    fn is_help_request(&self, content: &str) -> bool {
        content
            .trim_start()
            .get(..self.help_trigger.len())
            .is_some_and(|head| head.to_lowercase() == self.help_trigger)
    }

    /// Evaluates the restricted-community rule against a parsed invocation.
    pub fn check_community(&self, ctx: &CommandContext) -> AccessDecision {
        let Some(restricted) = &self.restricted else {
            return AccessDecision::Allow;
        };
        if ctx.event().community_id() != Some(restricted.community) {
            return AccessDecision::Allow;
        }

        let channel = &ctx.event().channel;
        let allowed = channel.id == restricted.exempt_channel
            || channel.parent() == Some(restricted.game_category)
            || ctx.invoker() == self.owner;

        if allowed {
            AccessDecision::Allow
        } else {
            AccessDecision::DenyWithNotice(
                DenyReason::RestrictedCommunity,
                Notice {
                    text: restricted.notice_text(),
                    ttl: Some(restricted.notice_ttl),
                },
            )
        }
    }

    /// Evaluates the privilege rule. Denials are logged for auditing.
    pub fn check_privilege(&self, ctx: &CommandContext) -> AccessDecision {
        if ctx.command().is_owner_restricted() && ctx.invoker() != self.owner {
            info!(
                user = %ctx.invoker(),
                channel = %ctx.channel(),
                text = ctx.raw_text(),
                "User attempted issuing owner restricted command"
            );
            return AccessDecision::DenySilent(DenyReason::OwnerOnly);
        }
        AccessDecision::Allow
    }

    /// Delivers a denial notice and schedules the cleanup.
    ///
    /// Returns immediately. The notice is sent from a scheduled task, and once
    /// sent it is deleted after `ttl`; the offending message is deleted after
    /// `ttl` as well. Cleanup failures (e.g. the message is already gone) are
    /// swallowed.
    pub fn deliver_notice(&self, ctx: &CommandContext, notice: Notice) {
        let messenger = Arc::clone(ctx.messenger());
        let scheduler = Arc::clone(&self.scheduler);
        let channel = ctx.channel();
        let text = format!("{}, {}", ctx.invoker().mention(), notice.text);
        let ttl = notice.ttl;

        self.scheduler.schedule(
            Duration::ZERO,
            async move {
                match messenger.send(channel, &text).await {
                    Ok(sent) => {
                        if let Some(ttl) = ttl {
                            schedule_delete(scheduler.as_ref(), Arc::clone(&messenger), sent, ttl);
                        }
                    }
                    Err(e) => debug!(channel = %channel, error = %e, "Failed to send guard notice"),
                }
            }
            .boxed(),
        );

        if let Some(ttl) = ttl {
            schedule_delete(
                self.scheduler.as_ref(),
                Arc::clone(ctx.messenger()),
                ctx.message(),
                ttl,
            );
        }
    }
}

fn schedule_delete(
    scheduler: &dyn Scheduler,
    messenger: Arc<dyn Messenger>,
    message: MessageHandle,
    delay: Duration,
) {
    scheduler.schedule(
        delay,
        async move {
            if let Err(e) = messenger.delete(message).await {
                debug!(message = %message.id, error = %e, "Scheduled delete failed");
            }
        }
        .boxed(),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{Command, CommandRegistry};
    use crate::parser::ContextParser;
    use async_trait::async_trait;
    use futures::future::BoxFuture;
    use howl_core::{Author, ChannelInfo, CommandResult, MessagingResult};
    use parking_lot::Mutex;

    #[derive(Default)]
    struct Recorder {
        scheduled: Mutex<Vec<Duration>>,
    }

    impl Scheduler for Recorder {
        fn schedule(&self, delay: Duration, _action: BoxFuture<'static, ()>) {
            self.scheduled.lock().push(delay);
        }
    }

    struct Silent;

    #[async_trait]
    impl Messenger for Silent {
        async fn send(&self, channel: ChannelId, _text: &str) -> MessagingResult<MessageHandle> {
            Ok(MessageHandle::new(channel, 0))
        }

        async fn delete(&self, _message: MessageHandle) -> MessagingResult<()> {
            Ok(())
        }
    }

    struct Noop(&'static str);

    #[async_trait]
    impl Command for Noop {
        fn trigger(&self) -> &str {
            self.0
        }

        async fn execute(&self, _ctx: &CommandContext) -> CommandResult {
            Ok(())
        }
    }

    const OWNER: u64 = 1;
    const LOUNGE: u64 = 100;
    const SPAM: u64 = 101;
    const GAMES: u64 = 102;
    const RULES: u64 = 103;

    fn guard(scheduler: Arc<Recorder>) -> AccessGuard {
        AccessGuard::new(
            "w.help",
            UserId(OWNER),
            Some(RestrictedCommunity {
                community: CommunityId(LOUNGE),
                exempt_channel: ChannelId(SPAM),
                game_category: CategoryId(GAMES),
                rules_channel: ChannelId(RULES),
                notice_ttl: Duration::from_secs(5),
            }),
            scheduler,
        )
    }

    fn ctx(event: InboundEvent) -> CommandContext {
        let mut registry = CommandRegistry::new();
        registry.register_public(Noop("start")).unwrap();
        registry.register_owner(Noop("eval")).unwrap();
        ContextParser::new(["w."])
            .parse(&registry, event, Arc::new(Silent))
            .unwrap()
    }

    fn lounge_event(user: u64, channel: ChannelInfo, text: &str) -> InboundEvent {
        InboundEvent::new(50, Author::user(user, "u"), channel, text).in_community(LOUNGE, "lounge")
    }

    #[test]
    fn test_bot_authors_are_denied() {
        let g = guard(Arc::default());
        let event = InboundEvent::new(1, Author::bot(9, "b"), ChannelInfo::text(3), "w.help");
        assert_eq!(g.admit(&event), AccessDecision::DenySilent(DenyReason::BotAuthor));
    }

    #[test]
    fn test_cannot_talk_only_admits_help() {
        let g = guard(Arc::default());
        let channel = ChannelInfo::text(3).can_talk(false);

        let help = InboundEvent::new(1, Author::user(9, "u"), channel, "W.Help me");
        assert!(g.admit(&help).is_allowed());

        let other = InboundEvent::new(1, Author::user(9, "u"), channel, "w.start");
        assert_eq!(g.admit(&other), AccessDecision::DenySilent(DenyReason::CannotTalk));

        let short = InboundEvent::new(1, Author::user(9, "u"), channel, "w.");
        assert!(!g.admit(&short).is_allowed());
    }

    #[test]
    fn test_help_bypass_ignores_leading_whitespace() {
        let g = guard(Arc::default());
        let channel = ChannelInfo::text(3).can_talk(false);

        let help = InboundEvent::new(1, Author::user(9, "u"), channel, "  w.help");
        assert!(g.admit(&help).is_allowed());

        let other = InboundEvent::new(1, Author::user(9, "u"), channel, " w.start");
        assert!(!g.admit(&other).is_allowed());
    }

    #[test]
    fn test_admit_is_stateless() {
        let g = guard(Arc::default());
        let event = InboundEvent::new(1, Author::user(9, "u"), ChannelInfo::text(3), "w.start");
        for _ in 0..3 {
            assert!(g.admit(&event).is_allowed());
        }
    }

    #[test]
    fn test_restricted_community_allowances() {
        let g = guard(Arc::default());

        let exempt = ctx(lounge_event(9, ChannelInfo::text(SPAM), "w.start"));
        assert!(g.check_community(&exempt).is_allowed());

        let game = ctx(lounge_event(9, ChannelInfo::text(7).in_category(GAMES), "w.start"));
        assert!(g.check_community(&game).is_allowed());

        let owner = ctx(lounge_event(OWNER, ChannelInfo::text(7), "w.start"));
        assert!(g.check_community(&owner).is_allowed());

        let elsewhere = ctx(lounge_event(9, ChannelInfo::text(7).in_category(8), "w.start"));
        match g.check_community(&elsewhere) {
            AccessDecision::DenyWithNotice(DenyReason::RestrictedCommunity, notice) => {
                assert!(notice.text.contains("**rules**"));
                assert!(notice.text.contains("<#103>"));
                assert_eq!(notice.ttl, Some(Duration::from_secs(5)));
            }
            other => panic!("unexpected decision {other:?}"),
        }
    }

    #[test]
    fn test_other_communities_are_unrestricted() {
        let g = guard(Arc::default());
        let event = InboundEvent::new(1, Author::user(9, "u"), ChannelInfo::text(7), "w.start")
            .in_community(555, "elsewhere");
        assert!(g.check_community(&ctx(event)).is_allowed());
    }

    #[test]
    fn test_privilege_rule() {
        let g = guard(Arc::default());
        let outsider = ctx(InboundEvent::new(1, Author::user(9, "u"), ChannelInfo::text(3), "w.eval"));
        assert_eq!(
            g.check_privilege(&outsider),
            AccessDecision::DenySilent(DenyReason::OwnerOnly)
        );

        let owner = ctx(InboundEvent::new(1, Author::user(OWNER, "o"), ChannelInfo::text(3), "w.eval"));
        assert!(g.check_privilege(&owner).is_allowed());

        let public = ctx(InboundEvent::new(1, Author::user(9, "u"), ChannelInfo::text(3), "w.start"));
        assert!(g.check_privilege(&public).is_allowed());
    }

    #[test]
    fn test_deliver_notice_only_schedules() {
        let scheduler = Arc::new(Recorder::default());
        let g = guard(Arc::clone(&scheduler));
        let denied = ctx(lounge_event(9, ChannelInfo::text(7), "w.start"));
        let notice = Notice {
            text: "read the rules".into(),
            ttl: Some(Duration::from_secs(5)),
        };

        g.deliver_notice(&denied, notice);

        assert_eq!(
            *scheduler.scheduled.lock(),
            [Duration::ZERO, Duration::from_secs(5)]
        );
    }
}
