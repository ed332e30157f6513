//! The per-channel latest-message pointer.
//!
//! A denormalised index avoiding a full scan-and-sort on every channel
//! listing: at most one row per channel, pointing at the most recently
//! created message. The pointer is upserted on every message creation and
//! deliberately never corrected when the pointed-to message is deleted;
//! the accepted staleness persists until a newer message supersedes it.

use super::{ChannelId, MessageId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The latest-message pointer for one channel.
///
/// # Invariants
///
/// - at most one row per channel
/// - `pointed_at` equals the creation time of the pointed-to message and
///   is monotonically non-decreasing across upserts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelLatestMessage {
    /// The channel this pointer belongs to.
    channel_id: ChannelId,

    /// The most recently created message in the channel.
    message_id: MessageId,

    /// The pointed-to message's creation time.
    pointed_at: DateTime<Utc>,
}

impl ChannelLatestMessage {
    /// Creates a pointer row.
    #[must_use]
    pub const fn new(
        channel_id: ChannelId,
        message_id: MessageId,
        pointed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            channel_id,
            message_id,
            pointed_at,
        }
    }

    /// Returns the channel identifier.
    #[must_use]
    pub const fn channel_id(&self) -> ChannelId {
        self.channel_id
    }

    /// Returns the pointed-to message identifier.
    #[must_use]
    pub const fn message_id(&self) -> MessageId {
        self.message_id
    }

    /// Returns the pointed-to message's creation time.
    #[must_use]
    pub const fn pointed_at(&self) -> DateTime<Utc> {
        self.pointed_at
    }
}
