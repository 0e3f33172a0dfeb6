//! The inbound event dispatcher.
//!
//! [`Dispatcher`] runs the whole routing pipeline for one event: the access
//! guard, the best-effort game notification, parsing, execution under timing
//! instrumentation, and the recovery policy for failed commands.
//!
//! ```rust,ignore
//! let dispatcher = Dispatcher::builder(registry, RoutingConfig::new("w.", owner), messenger)
//!     .games(games)
//!     .invites(invites)
//!     .metrics(Metrics::new(Arc::new(FacadeSink)))
//!     .build();
//!
//! dispatcher.on_inbound_event(event).await;
//! ```
//!
//! # Recovery
//!
//! | failure               | reaction                                      |
//! |-----------------------|-----------------------------------------------|
//! | user-friendly         | reply with [`USER_FRIENDLY_PREFIX`] + message |
//! | illegal state         | reply with the message                        |
//! | storage unavailable   | error log, reply [`STORAGE_UNAVAILABLE_REPLY`]|
//! | anything else, panics | [`DiagnosticReporter`]                        |

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use futures::FutureExt;
use tracing::{Instrument, debug, error, info, info_span, trace};

use crate::command::CommandRegistry;
use crate::context::CommandContext;
use crate::guard::{AccessDecision, AccessGuard, DenyReason, RestrictedCommunity};
use crate::metrics::{Metrics, RetentionTimer};
use crate::parser::ContextParser;
use crate::report::{DiagnosticReporter, IncidentReport};
use howl_core::{
    CommandError, GameRegistry, InboundEvent, InviteResolver, Messenger, NoGames, NoInvites,
    Scheduler, TokioScheduler, UserId,
};

/// Prepended to user-friendly failure messages.
pub const USER_FRIENDLY_PREFIX: &str = "There was a problem executing your command:\n";

/// Reply sent when storage is unavailable.
pub const STORAGE_UNAVAILABLE_REPLY: &str =
    "The database is not available currently. Please try again later. Sorry for the inconvenience!";

/// Routing settings fixed at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutingConfig {
    /// The active command prefix.
    pub prefix: String,
    /// The bot owner, allowed to run owner-only commands.
    pub owner: UserId,
    /// The operator community, if commands there are confined.
    pub restricted: Option<RestrictedCommunity>,
}

impl RoutingConfig {
    pub fn new(prefix: impl Into<String>, owner: impl Into<UserId>) -> Self {
        Self {
            prefix: prefix.into(),
            owner: owner.into(),
            restricted: None,
        }
    }

    pub fn restricted(mut self, restricted: RestrictedCommunity) -> Self {
        self.restricted = Some(restricted);
        self
    }

    /// The prefixed help command, which may bypass the send-permission rule.
    pub fn help_trigger(&self) -> String {
        format!("{}help", self.prefix)
    }

    /// The prefixed command users type for a support invite.
    pub fn invite_trigger(&self) -> String {
        format!("{}invite", self.prefix)
    }
}

/// How one event ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The event was not a command.
    NotACommand,
    /// A guard rule refused the event.
    Denied(DenyReason),
    /// The command ran to completion.
    Completed,
    /// The command failed with a known failure kind and the user was told.
    Recovered(&'static str),
    /// The command failed unexpectedly and the failure was reported.
    Reported(IncidentReport),
    /// Reporting the failure itself failed. Only logs remain.
    ReportingFailed,
}

/// Builder for [`Dispatcher`].
pub struct DispatcherBuilder {
    registry: Arc<CommandRegistry>,
    routing: RoutingConfig,
    messenger: Arc<dyn Messenger>,
    games: Arc<dyn GameRegistry>,
    invites: Arc<dyn InviteResolver>,
    scheduler: Arc<dyn Scheduler>,
    metrics: Metrics,
}

impl DispatcherBuilder {
    /// Sets the game registry. Defaults to [`NoGames`].
    pub fn games(mut self, games: Arc<dyn GameRegistry>) -> Self {
        self.games = games;
        self
    }

    /// Sets the invite resolver. Defaults to [`NoInvites`].
    pub fn invites(mut self, invites: Arc<dyn InviteResolver>) -> Self {
        self.invites = invites;
        self
    }

    /// Sets the delay scheduler. Defaults to [`TokioScheduler`].
    pub fn scheduler(mut self, scheduler: Arc<dyn Scheduler>) -> Self {
        self.scheduler = scheduler;
        self
    }

    /// Sets the metrics. Defaults to the `metrics` facade.
    pub fn metrics(mut self, metrics: Metrics) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn build(self) -> Dispatcher {
        let guard = AccessGuard::new(
            self.routing.help_trigger(),
            self.routing.owner,
            self.routing.restricted.clone(),
            self.scheduler,
        );
        let reporter = DiagnosticReporter::new(
            Arc::clone(&self.messenger),
            self.invites,
            self.routing.invite_trigger(),
        );

        Dispatcher {
            parser: ContextParser::new([self.routing.prefix]),
            registry: self.registry,
            guard,
            games: self.games,
            messenger: self.messenger,
            metrics: self.metrics,
            reporter,
        }
    }
}

/// Routes inbound events to commands.
///
/// Cheap to clone and safe to share between tasks; nothing in it is mutated
/// after construction.
#[derive(Clone)]
pub struct Dispatcher {
    registry: Arc<CommandRegistry>,
    parser: ContextParser,
    guard: AccessGuard,
    games: Arc<dyn GameRegistry>,
    messenger: Arc<dyn Messenger>,
    metrics: Metrics,
    reporter: DiagnosticReporter,
}

impl Dispatcher {
    pub fn builder(
        registry: impl Into<Arc<CommandRegistry>>,
        routing: RoutingConfig,
        messenger: Arc<dyn Messenger>,
    ) -> DispatcherBuilder {
        DispatcherBuilder {
            registry: registry.into(),
            routing,
            messenger,
            games: Arc::new(NoGames),
            invites: Arc::new(NoInvites),
            scheduler: Arc::new(TokioScheduler),
            metrics: Metrics::default(),
        }
    }

    pub fn registry(&self) -> &CommandRegistry {
        &self.registry
    }

    /// Handles one inbound event. Every outcome is a side effect.
    pub async fn on_inbound_event(&self, event: InboundEvent) {
        self.process(event).await;
    }

    /// Handles one inbound event received just now.
    pub async fn process(&self, event: InboundEvent) -> DispatchOutcome {
        self.process_received(event, Instant::now()).await
    }

    /// Handles one inbound event received at `received_at`.
    pub async fn process_received(
        &self,
        event: InboundEvent,
        received_at: Instant,
    ) -> DispatchOutcome {
        let span = info_span!(
            "dispatch",
            channel = %event.channel.id,
            author = %event.author.id,
            message = %event.message_id,
        );
        let retention = self.metrics.retention_timer_since(received_at);

        async move {
            let outcome = self.route(event, retention).await;
            trace!(?outcome, "Dispatch finished");
            outcome
        }
        .instrument(span)
        .await
    }

    async fn route(&self, event: InboundEvent, retention: RetentionTimer) -> DispatchOutcome {
        if let Err(reason) = self.enforce(self.guard.admit(&event), None) {
            return DispatchOutcome::Denied(reason);
        }

        self.notify_game(&event);

        let Some(ctx) = self
            .parser
            .parse(&self.registry, event, Arc::clone(&self.messenger))
        else {
            return DispatchOutcome::NotACommand;
        };

        if let Err(reason) = self.enforce(self.guard.check_community(&ctx), Some(&ctx)) {
            return DispatchOutcome::Denied(reason);
        }
        if let Err(reason) = self.enforce(self.guard.check_privilege(&ctx), Some(&ctx)) {
            return DispatchOutcome::Denied(reason);
        }

        self.execute(ctx, retention).await
    }

    /// Applies a guard decision, delivering its notice if there is one.
    fn enforce(
        &self,
        decision: AccessDecision,
        ctx: Option<&CommandContext>,
    ) -> Result<(), DenyReason> {
        match decision {
            AccessDecision::Allow => Ok(()),
            AccessDecision::DenySilent(reason) => {
                debug!(?reason, "Event denied by guard");
                Err(reason)
            }
            AccessDecision::DenyWithNotice(reason, notice) => {
                debug!(?reason, "Event denied by guard with notice");
                if let Some(ctx) = ctx {
                    self.guard.deliver_notice(ctx, notice);
                }
                Err(reason)
            }
        }
    }

    fn notify_game(&self, event: &InboundEvent) {
        let Some(game) = self.games.lookup(event.channel.id) else {
            return;
        };
        let notified =
            std::panic::catch_unwind(AssertUnwindSafe(|| game.notify_user_posted(event)));
        if notified.is_err() {
            debug!("Game notification panicked, ignoring");
        }
    }

    async fn execute(&self, ctx: CommandContext, retention: RetentionTimer) -> DispatchOutcome {
        let command = ctx.command().clone();
        info!(
            user = %ctx.invoker(),
            channel = %ctx.channel(),
            command = command.kind(),
            "Command about to be executed"
        );
        retention.observe();

        let result = {
            let _timer = self.metrics.start_processing_timer(command.kind());
            AssertUnwindSafe(command.execute(&ctx)).catch_unwind().await
        };

        match result {
            Ok(Ok(())) => DispatchOutcome::Completed,
            Ok(Err(err)) => self.recover(&ctx, err).await,
            Err(panic) => {
                let err = anyhow::anyhow!("command panicked: {}", panic_message(panic.as_ref()));
                self.recover(&ctx, CommandError::Unclassified(err)).await
            }
        }
    }

    async fn recover(&self, ctx: &CommandContext, err: CommandError) -> DispatchOutcome {
        let kind = err.kind();
        match err {
            CommandError::UserFriendly(message) => {
                self.reply_or_log(ctx, &format!("{USER_FRIENDLY_PREFIX}{message}"))
                    .await;
            }
            CommandError::IllegalState(message) => {
                self.reply_or_log(ctx, &message).await;
            }
            CommandError::StorageUnavailable(source) => {
                error!(error = %source, "Storage blew up while handling command");
                self.reply_or_log(ctx, STORAGE_UNAVAILABLE_REPLY).await;
            }
            CommandError::Unclassified(failure) => return self.escalate(ctx, failure).await,
        }
        DispatchOutcome::Recovered(kind)
    }

    async fn reply_or_log(&self, ctx: &CommandContext, text: &str) {
        if let Err(e) = ctx.reply(text).await {
            error!(error = %e, "Exception during exception handling of command");
        }
    }

    async fn escalate(&self, ctx: &CommandContext, failure: anyhow::Error) -> DispatchOutcome {
        match AssertUnwindSafe(self.reporter.report(ctx.event(), &failure))
            .catch_unwind()
            .await
        {
            Ok(report) => DispatchOutcome::Reported(report),
            Err(panic) => {
                error!(
                    panic = panic_message(panic.as_ref()),
                    "Exception during exception handling of command"
                );
                error!(error = %failure, "Original exception");
                DispatchOutcome::ReportingFailed
            }
        }
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("registry", &self.registry)
            .field("prefixes", &self.parser.prefixes())
            .finish_non_exhaustive()
    }
}

pub(crate) fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&'static str>() {
        *message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.as_str()
    } else {
        "opaque panic payload"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_routing_triggers_follow_prefix() {
        let routing = RoutingConfig::new("d.", 1);
        assert_eq!(routing.help_trigger(), "d.help");
        assert_eq!(routing.invite_trigger(), "d.invite");
        assert!(routing.restricted.is_none());
    }

    #[test]
    fn test_panic_message_extraction() {
        let owned: Box<dyn Any + Send> = Box::new(String::from("owned"));
        let fixed: Box<dyn Any + Send> = Box::new("fixed");
        let other: Box<dyn Any + Send> = Box::new(7_u8);

        assert_eq!(panic_message(owned.as_ref()), "owned");
        assert_eq!(panic_message(fixed.as_ref()), "fixed");
        assert_eq!(panic_message(other.as_ref()), "opaque panic payload");
    }
}
