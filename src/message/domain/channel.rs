//! Read-only snapshots of channel state.
//!
//! Channels and subscriptions are owned by an external collaborator (the
//! channel manager). The store never mutates them; the query paths read
//! them to decide visibility (public, non-deleted) and subscription scope
//! (forced or explicit).

use super::ChannelId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Visibility snapshot of a channel as seen by the query paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelSnapshot {
    /// The channel identifier.
    pub id: ChannelId,
    /// Whether the channel is public.
    pub is_public: bool,
    /// Whether membership notifications are forced for all users.
    pub is_forced: bool,
    /// Soft-deletion timestamp; `None` while the channel is live.
    pub deleted_at: Option<DateTime<Utc>>,
}

impl ChannelSnapshot {
    /// Returns `true` if the channel is live, public, and visible to
    /// default feed reads.
    #[must_use]
    pub const fn is_visible(&self) -> bool {
        self.is_public && self.deleted_at.is_none()
    }
}

