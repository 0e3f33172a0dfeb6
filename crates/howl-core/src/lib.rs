//! # Howl Core
//!
//! Foundation types shared by every layer of the Howl command routing core:
//!
//! - Platform identifiers and the read-only [`InboundEvent`] snapshot
//! - Collaborator contracts the core consumes ([`Messenger`], [`GameRegistry`],
//!   [`InviteResolver`], [`Scheduler`])
//! - The failure taxonomy ([`CommandError`]) and the [`CausalChain`] used to
//!   report unclassified failures
//!
//! Nothing in this crate knows about command parsing or dispatch; those live
//! in `howl-framework`.

pub mod chain;
pub mod error;
pub mod event;
pub mod game;
pub mod invite;
pub mod messaging;
pub mod scheduler;

pub use chain::CausalChain;
pub use error::{
    BoxError, CommandError, CommandResult, InviteError, MessagingError, MessagingResult,
};
pub use event::{
    Author, CategoryId, ChannelId, ChannelInfo, ChannelKind, Community, CommunityId,
    InboundEvent, MessageId, UserId,
};
pub use game::{GameHandle, GameRegistry, NoGames};
pub use invite::{InviteResolver, NoInvites};
pub use messaging::{MessageHandle, Messenger};
pub use scheduler::{Scheduler, TokioScheduler};
