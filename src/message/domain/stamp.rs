//! Per-message reaction counters.
//!
//! One row per `(message, stamp kind, user)` triple, holding how many
//! times that user has applied that stamp to that message. The count is
//! incremented atomically at the substrate level; a row is deleted when
//! the user removes their reactions of that kind.

use super::{MessageId, StampId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A reaction counter row.
///
/// # Invariants
///
/// - `count >= 1` for any persisted row; removal deletes the row rather
///   than writing zero
/// - `first_applied_at` is set on first insert and never changes;
///   `updated_at` tracks the latest increment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageStamp {
    /// The message the stamp is applied to.
    message_id: MessageId,

    /// The stamp kind.
    stamp_id: StampId,

    /// The user applying the stamp.
    user_id: UserId,

    /// How many times the user has applied this stamp.
    count: i64,

    /// When the user first applied this stamp to the message.
    first_applied_at: DateTime<Utc>,

    /// When the count last changed.
    updated_at: DateTime<Utc>,
}

impl MessageStamp {
    /// Creates a counter row.
    #[must_use]
    pub const fn new(
        message_id: MessageId,
        stamp_id: StampId,
        user_id: UserId,
        count: i64,
        first_applied_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            message_id,
            stamp_id,
            user_id,
            count,
            first_applied_at,
            updated_at,
        }
    }

    /// Returns the message identifier.
    #[must_use]
    pub const fn message_id(&self) -> MessageId {
        self.message_id
    }

    /// Returns the stamp kind identifier.
    #[must_use]
    pub const fn stamp_id(&self) -> StampId {
        self.stamp_id
    }

    /// Returns the user identifier.
    #[must_use]
    pub const fn user_id(&self) -> UserId {
        self.user_id
    }

    /// Returns the current count.
    #[must_use]
    pub const fn count(&self) -> i64 {
        self.count
    }

    /// Returns when the user first applied this stamp.
    #[must_use]
    pub const fn first_applied_at(&self) -> DateTime<Utc> {
        self.first_applied_at
    }

    /// Returns when the count last changed.
    #[must_use]
    pub const fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Returns a copy with the count raised by `delta` and the update
    /// timestamp refreshed.
    #[must_use]
    pub fn incremented(&self, delta: i64, at: DateTime<Utc>) -> Self {
        Self {
            count: self.count.saturating_add(delta),
            updated_at: at,
            ..self.clone()
        }
    }
}
