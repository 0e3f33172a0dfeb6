//! Inbound event model.
//!
//! An [`InboundEvent`] is a read-only snapshot of one received platform
//! message. It lives for a single dispatch cycle and is never retained by the
//! core after the cycle ends.

use std::fmt;

use serde::{Deserialize, Serialize};

// ============================================================================
// Identifiers
// ============================================================================

macro_rules! snowflake_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl $name {
            /// Returns the raw numeric id.
            pub fn get(self) -> u64 {
                self.0
            }
        }

        impl From<u64> for $name {
            fn from(id: u64) -> Self {
                Self(id)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

snowflake_id!(
    /// Identity of a platform user (human or automated).
    UserId
);
snowflake_id!(
    /// Identity of a text channel, direct or in a community.
    ChannelId
);
snowflake_id!(
    /// Identity of a channel category inside a community.
    CategoryId
);
snowflake_id!(
    /// Identity of a community (server / guild).
    CommunityId
);
snowflake_id!(
    /// Identity of a single message.
    MessageId
);

impl UserId {
    /// Platform mention markup for this user.
    pub fn mention(self) -> String {
        format!("<@{}>", self.0)
    }
}

impl ChannelId {
    /// Platform mention markup for this channel.
    pub fn mention(self) -> String {
        format!("<#{}>", self.0)
    }
}

// ============================================================================
// Event parts
// ============================================================================

/// The author of an inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Author {
    pub id: UserId,
    pub name: String,
    /// Set for automated accounts, including this bot itself.
    pub bot: bool,
}

impl Author {
    /// A human author.
    pub fn user(id: impl Into<UserId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            bot: false,
        }
    }

    /// An automated author.
    pub fn bot(id: impl Into<UserId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            bot: true,
        }
    }
}

/// Kind of channel a message arrived in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelKind {
    /// A one-to-one conversation with the bot.
    Direct,
    /// A text channel that belongs to a community, optionally nested in a category.
    Text { parent: Option<CategoryId> },
}

/// Snapshot of the channel a message arrived in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelInfo {
    pub id: ChannelId,
    pub kind: ChannelKind,
    /// Whether the bot may post messages here.
    pub can_talk: bool,
}

impl ChannelInfo {
    /// A direct-message channel. The bot can always talk in those.
    pub fn direct(id: impl Into<ChannelId>) -> Self {
        Self {
            id: id.into(),
            kind: ChannelKind::Direct,
            can_talk: true,
        }
    }

    /// A community text channel without a parent category.
    pub fn text(id: impl Into<ChannelId>) -> Self {
        Self {
            id: id.into(),
            kind: ChannelKind::Text { parent: None },
            can_talk: true,
        }
    }

    /// Places a text channel under a category. No effect on direct channels.
    pub fn in_category(mut self, category: impl Into<CategoryId>) -> Self {
        if let ChannelKind::Text { parent } = &mut self.kind {
            *parent = Some(category.into());
        }
        self
    }

    /// Sets whether the bot may post in this channel.
    pub fn can_talk(mut self, can_talk: bool) -> Self {
        self.can_talk = can_talk;
        self
    }

    /// Returns the parent category, if any.
    pub fn parent(&self) -> Option<CategoryId> {
        match self.kind {
            ChannelKind::Text { parent } => parent,
            ChannelKind::Direct => None,
        }
    }

    pub fn is_direct(&self) -> bool {
        matches!(self.kind, ChannelKind::Direct)
    }
}

/// The community an event originated from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Community {
    pub id: CommunityId,
    pub name: String,
}

impl fmt::Display for Community {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name, self.id)
    }
}

// ============================================================================
// InboundEvent
// ============================================================================

/// Read-only snapshot of a received message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundEvent {
    pub message_id: MessageId,
    pub author: Author,
    pub channel: ChannelInfo,
    /// Present for messages sent inside a community.
    pub community: Option<Community>,
    /// The raw message text as typed by the author.
    pub content: String,
}

impl InboundEvent {
    /// Creates an event outside of any community.
    pub fn new(
        message_id: impl Into<MessageId>,
        author: Author,
        channel: ChannelInfo,
        content: impl Into<String>,
    ) -> Self {
        Self {
            message_id: message_id.into(),
            author,
            channel,
            community: None,
            content: content.into(),
        }
    }

    /// Attaches the originating community.
    pub fn in_community(mut self, id: impl Into<CommunityId>, name: impl Into<String>) -> Self {
        self.community = Some(Community {
            id: id.into(),
            name: name.into(),
        });
        self
    }

    pub fn is_from_community(&self) -> bool {
        self.community.is_some()
    }

    pub fn community_id(&self) -> Option<CommunityId> {
        self.community.as_ref().map(|c| c.id)
    }
}
