//! The committed-change event taxonomy.
//!
//! Exactly one event is published per committed mutation, strictly after
//! the owning transaction commits (plus the secondary citation event when
//! a created message cites others). Downstream consumers — real-time
//! broadcast, bot dispatch, search indexing — treat these as their source
//! of truth for store state.

use super::{ChannelId, Message, MessageId, MessageStamp, ParsedContent, StampId, UnreadMarker, UserId};
use serde::{Deserialize, Serialize};

/// A committed state change in the message store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StoreEvent {
    /// A message was created.
    MessageCreated {
        /// The committed message.
        message: Message,
        /// Citations, mentions, and plain text extracted from the body.
        parsed: ParsedContent,
    },

    /// A created message cited other messages. Published immediately after
    /// the corresponding [`StoreEvent::MessageCreated`], only when the
    /// parsed content contains citations.
    MessageCited {
        /// The citing message.
        message: Message,
        /// The cited message identifiers.
        cited: Vec<MessageId>,
    },

    /// A message's text was edited.
    MessageUpdated {
        /// The pre-edit snapshot (also written to the archive).
        old: Message,
        /// The canonical post-edit state.
        new: Message,
    },

    /// A message was soft-deleted and its dependents cascaded.
    MessageDeleted {
        /// The deleted message.
        message: Message,
        /// The unread markers removed by the cascade.
        cleared_unreads: Vec<UnreadMarker>,
    },

    /// A message became unread for a user. Published only on first marker
    /// insert, never on a noticeable-flag update.
    MessageUnread {
        /// The unread message.
        message_id: MessageId,
        /// The user the message is unread for.
        user_id: UserId,
        /// Whether the unread state surfaces as a notification.
        noticeable: bool,
    },

    /// A user read a channel, clearing unread markers. Published only when
    /// at least one marker was removed.
    ChannelRead {
        /// The channel that was read.
        channel_id: ChannelId,
        /// The reading user.
        user_id: UserId,
        /// Number of markers removed.
        cleared: u64,
    },

    /// A user applied a stamp to a message.
    StampAdded {
        /// The counter row after the increment, carrying the
        /// authoritative post-increment count and first-applied time.
        stamp: MessageStamp,
    },

    /// A user removed all their stamps of one kind from a message.
    /// Published only when a counter row was actually deleted.
    StampRemoved {
        /// The stamped message.
        message_id: MessageId,
        /// The stamp kind.
        stamp_id: StampId,
        /// The user who removed the stamp.
        user_id: UserId,
    },
}

impl StoreEvent {
    /// Returns the event's stable name, used for logging and routing.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::MessageCreated { .. } => "message_created",
            Self::MessageCited { .. } => "message_cited",
            Self::MessageUpdated { .. } => "message_updated",
            Self::MessageDeleted { .. } => "message_deleted",
            Self::MessageUnread { .. } => "message_unread",
            Self::ChannelRead { .. } => "channel_read",
            Self::StampAdded { .. } => "stamp_added",
            Self::StampRemoved { .. } => "stamp_removed",
        }
    }
}
