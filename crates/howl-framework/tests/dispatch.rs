//! End-to-end routing behaviour with in-memory collaborators.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context as LayerContext, SubscriberExt};
use tracing_subscriber::{Layer, Registry};

use howl_core::{
    Author, CategoryId, ChannelId, ChannelInfo, CommandError, CommandResult, CommunityId,
    GameHandle, GameRegistry, InboundEvent, InviteError, InviteResolver, MessageHandle,
    MessagingResult, Messenger,
};
use howl_framework::{
    Command, CommandContext, CommandRegistry, DenyReason, DispatchOutcome, Dispatcher, Metrics,
    MetricsSink, RestrictedCommunity, RoutingConfig, STORAGE_UNAVAILABLE_REPLY,
    USER_FRIENDLY_PREFIX,
};

const OWNER: u64 = 1;
const HUMAN: u64 = 42;
const LOUNGE: u64 = 500;
const SPAM: u64 = 501;
const GAMES: u64 = 502;
const RULES: u64 = 503;

// =============================================================================
// Fakes
// =============================================================================

#[derive(Default)]
struct Outbox {
    sent: Mutex<Vec<(ChannelId, String)>>,
    deleted: Mutex<Vec<MessageHandle>>,
    next_id: AtomicUsize,
}

impl Outbox {
    fn texts(&self) -> Vec<String> {
        self.sent.lock().iter().map(|(_, text)| text.clone()).collect()
    }
}

#[async_trait]
impl Messenger for Outbox {
    async fn send(&self, channel: ChannelId, text: &str) -> MessagingResult<MessageHandle> {
        self.sent.lock().push((channel, text.to_string()));
        let id = 9000 + self.next_id.fetch_add(1, Ordering::SeqCst) as u64;
        Ok(MessageHandle::new(channel, id))
    }

    async fn delete(&self, message: MessageHandle) -> MessagingResult<()> {
        self.deleted.lock().push(message);
        Ok(())
    }
}

#[derive(Default)]
struct Timings {
    retention: AtomicUsize,
    processing: Mutex<Vec<String>>,
}

impl MetricsSink for Timings {
    fn record_retention(&self, _elapsed: Duration) {
        self.retention.fetch_add(1, Ordering::SeqCst);
    }

    fn record_processing(&self, kind: &str, _elapsed: Duration) {
        self.processing.lock().push(kind.to_string());
    }
}

struct SupportInvite;

#[async_trait]
impl InviteResolver for SupportInvite {
    async fn resolve_invite(
        &self,
        _community: CommunityId,
        _channel: ChannelId,
    ) -> Result<String, InviteError> {
        Ok("https://invite.example/howl".into())
    }
}

struct BrokenInvites;

#[async_trait]
impl InviteResolver for BrokenInvites {
    async fn resolve_invite(
        &self,
        _community: CommunityId,
        _channel: ChannelId,
    ) -> Result<String, InviteError> {
        panic!("invite service unreachable")
    }
}

#[derive(Default)]
struct Game {
    posts: AtomicUsize,
    panics: bool,
}

impl GameHandle for Game {
    fn notify_user_posted(&self, _event: &InboundEvent) {
        self.posts.fetch_add(1, Ordering::SeqCst);
        if self.panics {
            panic!("game state poisoned");
        }
    }
}

struct OneGame {
    channel: ChannelId,
    game: Arc<Game>,
}

impl GameRegistry for OneGame {
    fn lookup(&self, channel: ChannelId) -> Option<Arc<dyn GameHandle>> {
        (channel == self.channel).then(|| Arc::clone(&self.game) as Arc<dyn GameHandle>)
    }
}

/// A command whose behaviour is fixed at construction.
struct Scripted {
    trigger: &'static str,
    calls: Arc<AtomicUsize>,
    outcome: fn() -> CommandResult,
}

#[async_trait]
impl Command for Scripted {
    fn trigger(&self) -> &str {
        self.trigger
    }

    async fn execute(&self, _ctx: &CommandContext) -> CommandResult {
        self.calls.fetch_add(1, Ordering::SeqCst);
        (self.outcome)()
    }
}

fn ok() -> CommandResult {
    Ok(())
}

fn storage_down() -> CommandResult {
    Err(CommandError::storage(std::io::Error::other("pool exhausted")))
}

fn nested_failure() -> CommandResult {
    let lookup: anyhow::Result<()> = Err(anyhow::anyhow!("no row for channel 77"));
    lookup.context("could not load game")?;
    Ok(())
}

fn bad_input() -> CommandResult {
    Err(CommandError::user_friendly("Say `w.start <mode>`"))
}

fn wrong_phase() -> CommandResult {
    Err(CommandError::illegal_state("You cannot vote during the night."))
}

fn explode() -> CommandResult {
    panic!("boom")
}

// =============================================================================
// Log capture
// =============================================================================

#[derive(Clone, Default)]
struct Captured {
    records: Arc<Mutex<Vec<(Level, String)>>>,
}

impl Captured {
    fn at(&self, level: Level) -> Vec<String> {
        self.records
            .lock()
            .iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, message)| message.clone())
            .collect()
    }
}

struct MessageVisitor(String);

impl Visit for MessageVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.0 = format!("{value:?}");
        }
    }
}

impl<S: Subscriber> Layer<S> for Captured {
    fn on_event(&self, event: &Event<'_>, _ctx: LayerContext<'_, S>) {
        let mut visitor = MessageVisitor(String::new());
        event.record(&mut visitor);
        self.records.lock().push((*event.metadata().level(), visitor.0));
    }
}

// =============================================================================
// Harness
// =============================================================================

struct Harness {
    dispatcher: Dispatcher,
    outbox: Arc<Outbox>,
    timings: Arc<Timings>,
    game: Arc<Game>,
    calls: Arc<AtomicUsize>,
}

const GAME_CHANNEL: u64 = 77;

fn harness(outcome: fn() -> CommandResult) -> Harness {
    harness_with_game(outcome, Game::default())
}

fn harness_with_game(outcome: fn() -> CommandResult, game: Game) -> Harness {
    harness_with(outcome, game, Arc::new(SupportInvite))
}

fn harness_with(
    outcome: fn() -> CommandResult,
    game: Game,
    invites: Arc<dyn InviteResolver>,
) -> Harness {
    let calls = Arc::new(AtomicUsize::new(0));
    let mut registry = CommandRegistry::new();
    for trigger in ["help", "start"] {
        registry
            .register_public(Scripted {
                trigger,
                calls: Arc::clone(&calls),
                outcome,
            })
            .unwrap();
    }
    registry
        .register_owner(Scripted {
            trigger: "shutdown",
            calls: Arc::clone(&calls),
            outcome,
        })
        .unwrap();

    let routing = RoutingConfig::new("w.", OWNER).restricted(RestrictedCommunity {
        community: CommunityId(LOUNGE),
        exempt_channel: ChannelId(SPAM),
        game_category: CategoryId(GAMES),
        rules_channel: ChannelId(RULES),
        notice_ttl: Duration::from_secs(5),
    });

    let outbox = Arc::new(Outbox::default());
    let timings = Arc::new(Timings::default());
    let game = Arc::new(game);

    let dispatcher = Dispatcher::builder(registry, routing, outbox.clone())
        .games(Arc::new(OneGame {
            channel: ChannelId(GAME_CHANNEL),
            game: Arc::clone(&game),
        }))
        .invites(invites)
        .metrics(Metrics::new(timings.clone()))
        .build();

    Harness {
        dispatcher,
        outbox,
        timings,
        game,
        calls,
    }
}

fn human(text: &str) -> InboundEvent {
    InboundEvent::new(10, Author::user(HUMAN, "ann"), ChannelInfo::text(20), text)
        .in_community(600, "pack")
}

fn capture() -> (Captured, tracing::subscriber::DefaultGuard) {
    let captured = Captured::default();
    let subscriber = Registry::default().with(captured.clone());
    let guard = tracing::subscriber::set_default(subscriber);
    (captured, guard)
}

// =============================================================================
// Scenarios
// =============================================================================

#[tokio::test]
async fn help_in_normal_channel_executes_and_records_timings() {
    let h = harness(ok);

    let outcome = h.dispatcher.process(human("w.help")).await;

    assert_eq!(outcome, DispatchOutcome::Completed);
    assert_eq!(h.calls.load(Ordering::SeqCst), 1);
    assert_eq!(h.timings.retention.load(Ordering::SeqCst), 1);
    assert_eq!(*h.timings.processing.lock(), ["help"]);
    assert!(h.outbox.sent.lock().is_empty());
}

#[tokio::test(start_paused = true)]
async fn restricted_community_gets_rules_notice_and_cleanup() {
    let h = harness(ok);
    let event = InboundEvent::new(33, Author::user(HUMAN, "ann"), ChannelInfo::text(700), "w.start")
        .in_community(LOUNGE, "lounge");

    let outcome = h.dispatcher.process(event).await;
    assert_eq!(outcome, DispatchOutcome::Denied(DenyReason::RestrictedCommunity));
    assert_eq!(h.calls.load(Ordering::SeqCst), 0);

    tokio::time::sleep(Duration::from_millis(10)).await;
    let sent = h.outbox.texts();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].starts_with("<@42>, "));
    assert!(sent[0].contains("rules"));
    assert!(sent[0].contains("<#503>"));
    assert!(h.outbox.deleted.lock().is_empty());

    tokio::time::sleep(Duration::from_secs(4)).await;
    assert!(h.outbox.deleted.lock().is_empty());

    tokio::time::sleep(Duration::from_secs(2)).await;
    let deleted = h.outbox.deleted.lock().clone();
    assert_eq!(deleted.len(), 2);
    assert!(deleted.contains(&MessageHandle::new(700, 33)));
    assert!(deleted.contains(&MessageHandle::new(700, 9000)));
}

#[tokio::test]
async fn unclassified_failure_logs_chain_and_apologises() {
    let h = harness(nested_failure);
    let (logs, _guard) = capture();

    let outcome = h.dispatcher.process(human("w.start fast")).await;

    let DispatchOutcome::Reported(report) = outcome else {
        panic!("expected a report, got {outcome:?}");
    };
    assert_eq!(report.invite, "https://invite.example/howl");
    assert_eq!(report.community, "pack(600)");
    assert!(report.apology_sent);

    assert_eq!(
        logs.at(Level::ERROR),
        ["could not load game", "no row for channel 77"]
    );

    let sent = h.outbox.texts();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].starts_with("<@42>, an internal exception"));
    assert!(sent[0].contains("`w.start fast`"));
    assert!(sent[0].contains("`w.invite`"));
}

#[tokio::test]
async fn storage_failure_logs_once_and_asks_to_retry() {
    let h = harness(storage_down);
    let (logs, _guard) = capture();

    let outcome = h.dispatcher.process(human("w.start")).await;

    assert_eq!(outcome, DispatchOutcome::Recovered("storage_unavailable"));
    assert_eq!(logs.at(Level::ERROR).len(), 1);
    assert_eq!(h.outbox.texts(), [STORAGE_UNAVAILABLE_REPLY]);
}

// =============================================================================
// Guard properties
// =============================================================================

#[tokio::test]
async fn bot_events_never_dispatch_or_reply() {
    let h = harness(ok);
    let event = InboundEvent::new(1, Author::bot(99, "other-bot"), ChannelInfo::text(20), "w.help");

    let outcome = h.dispatcher.process(event).await;

    assert_eq!(outcome, DispatchOutcome::Denied(DenyReason::BotAuthor));
    assert_eq!(h.calls.load(Ordering::SeqCst), 0);
    assert!(h.outbox.sent.lock().is_empty());
    assert_eq!(h.timings.retention.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn muted_channel_only_admits_help() {
    let h = harness(ok);
    let muted = ChannelInfo::text(21).can_talk(false);

    let help = InboundEvent::new(1, Author::user(HUMAN, "ann"), muted, "W.HELP");
    assert_eq!(h.dispatcher.process(help).await, DispatchOutcome::Completed);

    let start = InboundEvent::new(2, Author::user(HUMAN, "ann"), muted, "w.start");
    assert_eq!(
        h.dispatcher.process(start).await,
        DispatchOutcome::Denied(DenyReason::CannotTalk)
    );
    assert_eq!(h.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn restricted_community_allows_exempt_game_and_owner() {
    let h = harness(ok);
    let events = [
        InboundEvent::new(1, Author::user(HUMAN, "ann"), ChannelInfo::text(SPAM), "w.start"),
        InboundEvent::new(2, Author::user(HUMAN, "ann"), ChannelInfo::text(710).in_category(GAMES), "w.start"),
        InboundEvent::new(3, Author::user(OWNER, "op"), ChannelInfo::text(711), "w.start"),
    ];

    for event in events {
        let event = event.in_community(LOUNGE, "lounge");
        assert_eq!(h.dispatcher.process(event).await, DispatchOutcome::Completed);
    }
    assert_eq!(h.calls.load(Ordering::SeqCst), 3);
    assert!(h.outbox.sent.lock().is_empty());
}

#[tokio::test]
async fn owner_commands_from_others_are_denied_and_logged() {
    let h = harness(ok);
    let (logs, _guard) = capture();

    let outcome = h.dispatcher.process(human("w.shutdown now")).await;

    assert_eq!(outcome, DispatchOutcome::Denied(DenyReason::OwnerOnly));
    assert_eq!(h.calls.load(Ordering::SeqCst), 0);
    assert!(h.outbox.sent.lock().is_empty());
    assert!(
        logs.at(Level::INFO)
            .iter()
            .any(|m| m.contains("owner restricted command"))
    );

    let owner = InboundEvent::new(11, Author::user(OWNER, "op"), ChannelInfo::direct(5), "w.shutdown");
    assert_eq!(h.dispatcher.process(owner).await, DispatchOutcome::Completed);
}

#[tokio::test]
async fn repeated_events_pass_independently() {
    let h = harness(ok);

    for _ in 0..3 {
        assert_eq!(h.dispatcher.process(human("w.start")).await, DispatchOutcome::Completed);
    }

    assert_eq!(h.calls.load(Ordering::SeqCst), 3);
    assert_eq!(h.timings.retention.load(Ordering::SeqCst), 3);
}

// =============================================================================
// Recovery and side paths
// =============================================================================

#[tokio::test]
async fn user_friendly_and_illegal_state_replies() {
    let h = harness(bad_input);
    assert_eq!(
        h.dispatcher.process(human("w.start")).await,
        DispatchOutcome::Recovered("user_friendly")
    );
    assert_eq!(
        h.outbox.texts(),
        [format!("{USER_FRIENDLY_PREFIX}Say `w.start <mode>`")]
    );

    let h = harness(wrong_phase);
    assert_eq!(
        h.dispatcher.process(human("w.start")).await,
        DispatchOutcome::Recovered("illegal_state")
    );
    assert_eq!(h.outbox.texts(), ["You cannot vote during the night."]);
}

#[tokio::test]
async fn panicking_command_is_reported_and_timed() {
    let h = harness(explode);

    let outcome = h.dispatcher.process(human("w.start")).await;

    let DispatchOutcome::Reported(report) = outcome else {
        panic!("expected a report, got {outcome:?}");
    };
    assert_eq!(report.chain.links(), ["command panicked: boom"]);
    assert_eq!(*h.timings.processing.lock(), ["start"]);
    assert_eq!(h.outbox.texts().len(), 1);
}

#[tokio::test]
async fn game_channel_is_notified_even_for_chatter() {
    let h = harness(ok);
    let chatter = InboundEvent::new(1, Author::user(HUMAN, "ann"), ChannelInfo::text(GAME_CHANNEL), "I am the seer");

    assert_eq!(h.dispatcher.process(chatter).await, DispatchOutcome::NotACommand);
    assert_eq!(h.game.posts.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn panicking_game_does_not_stop_dispatch() {
    let h = harness_with_game(
        ok,
        Game {
            panics: true,
            ..Default::default()
        },
    );
    let event = InboundEvent::new(1, Author::user(HUMAN, "ann"), ChannelInfo::text(GAME_CHANNEL), "w.start");

    assert_eq!(h.dispatcher.process(event).await, DispatchOutcome::Completed);
    assert_eq!(h.game.posts.load(Ordering::SeqCst), 1);
}

#[test]
fn on_inbound_event_swallows_everything() {
    let h = harness(nested_failure);
    tokio_test::block_on(h.dispatcher.on_inbound_event(human("w.start")));
    assert_eq!(h.outbox.texts().len(), 1);
    assert_eq!(h.dispatcher.registry().len(), 3);
}

#[tokio::test]
async fn panicking_invite_resolver_does_not_abort_report() {
    let h = harness_with(nested_failure, Game::default(), Arc::new(BrokenInvites));
    let (logs, _guard) = capture();

    let outcome = h.dispatcher.process(human("w.start")).await;

    let DispatchOutcome::Reported(report) = outcome else {
        panic!("expected a report, got {outcome:?}");
    };
    assert_eq!(report.invite, "");
    assert!(report.apology_sent);
    assert_eq!(h.outbox.texts().len(), 1);

    let errors = logs.at(Level::ERROR);
    assert!(errors.contains(&"could not load game".to_string()));
    assert!(errors.contains(&"no row for channel 77".to_string()));
}
