//! Per-user unread markers and their per-channel summary.
//!
//! A marker's existence is the unread state: a message is unread by a user
//! exactly when a `(user, message)` marker row exists. Markers are removed
//! in bulk when the user reads a channel and individually when the
//! underlying message is deleted.

use super::{ChannelId, MessageId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An unread marker for one `(user, message)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnreadMarker {
    /// The user who has not read the message.
    user_id: UserId,

    /// The unread message.
    message_id: MessageId,

    /// Whether the unread state should surface as a notification.
    noticeable: bool,

    /// When the marker was first created.
    marked_at: DateTime<Utc>,
}

impl UnreadMarker {
    /// Creates a marker for the given pair.
    #[must_use]
    pub const fn new(
        user_id: UserId,
        message_id: MessageId,
        noticeable: bool,
        marked_at: DateTime<Utc>,
    ) -> Self {
        Self {
            user_id,
            message_id,
            noticeable,
            marked_at,
        }
    }

    /// Returns the user identifier.
    #[must_use]
    pub const fn user_id(&self) -> UserId {
        self.user_id
    }

    /// Returns the message identifier.
    #[must_use]
    pub const fn message_id(&self) -> MessageId {
        self.message_id
    }

    /// Returns whether the marker should surface as a notification.
    #[must_use]
    pub const fn noticeable(&self) -> bool {
        self.noticeable
    }

    /// Returns when the marker was first created.
    #[must_use]
    pub const fn marked_at(&self) -> DateTime<Utc> {
        self.marked_at
    }

    /// Returns a copy with only the noticeable flag changed.
    ///
    /// Used by the idempotent upsert path: a repeat mark updates the flag
    /// without counting as "became unread" again.
    #[must_use]
    pub const fn with_noticeable(mut self, noticeable: bool) -> Self {
        self.noticeable = noticeable;
        self
    }
}

/// Per-channel aggregate over a user's unread markers.
///
/// Computed directly from the marker set joined to messages; one row per
/// channel in which the user has at least one unread message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelUnreadSummary {
    /// The channel the unread messages belong to.
    pub channel_id: ChannelId,
    /// Number of unread messages in the channel.
    pub count: u64,
    /// `true` if any marker in the channel is noticeable.
    pub noticeable: bool,
    /// Creation time of the earliest unread message.
    pub earliest_unread_at: DateTime<Utc>,
    /// Creation time of the latest unread message.
    pub latest_message_at: DateTime<Utc>,
}
