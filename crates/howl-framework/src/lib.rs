//! # Howl Framework
//!
//! The inbound command routing pipeline:
//!
//! ```text
//! InboundEvent
//!   └─▶ AccessGuard::admit          (bot-origin, send-permission)
//!   └─▶ GameHandle::notify_user_posted (best-effort)
//!   └─▶ ContextParser::parse        (prefix + trigger lookup)
//!   └─▶ AccessGuard::check_community (restricted community rule)
//!   └─▶ AccessGuard::check_privilege (owner-only commands)
//!   └─▶ Command::execute            (timed, panics caught)
//!   └─▶ recovery / DiagnosticReporter
//! ```
//!
//! [`Dispatcher::on_inbound_event`] is the single entry point. Nothing it
//! does can fail outward; every outcome is a reply, a deletion, a log record
//! or a metric.

pub mod command;
pub mod context;
pub mod dispatcher;
pub mod error;
pub mod guard;
pub mod metrics;
pub mod parser;
pub mod report;

pub use command::{Capability, Command, CommandRegistry, RegisteredCommand};
pub use context::CommandContext;
pub use dispatcher::{
    DispatchOutcome, Dispatcher, DispatcherBuilder, RoutingConfig, STORAGE_UNAVAILABLE_REPLY,
    USER_FRIENDLY_PREFIX,
};
pub use error::{RegistryError, RegistryResult};
pub use guard::{AccessDecision, AccessGuard, DenyReason, GuardRule, Notice, RestrictedCommunity};
pub use metrics::{FacadeSink, Metrics, MetricsSink, NoopSink, ProcessingTimer, RetentionTimer};
pub use parser::ContextParser;
pub use report::{DiagnosticReporter, IncidentReport, NOT_A_COMMUNITY, PRIVATE_INVITE};

// Re-exported so commands can be implemented without a direct dependency
pub use async_trait::async_trait;
