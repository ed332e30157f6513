//! The Message aggregate and its archived revision snapshots.
//!
//! A message is soft-deletable and text-editable; every state it leaves
//! behind on edit is captured as an immutable [`ArchivedMessage`] row
//! before the mutation is applied, so the archive always reflects the
//! content being superseded.

use super::{ArchiveId, ChannelId, MessageId, UserId};
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};

/// A message within a channel.
///
/// # Invariants
///
/// - `id`, `author_id`, and `channel_id` are non-nil UUIDs (enforced at
///   the service boundary)
/// - `created_at` never changes after construction
/// - `updated_at >= created_at`
/// - a message with a non-null `deleted_at` is excluded from all default
///   reads; it is never physically removed
///
/// # Examples
///
/// ```
/// use mockable::DefaultClock;
/// use palaver::message::domain::{ChannelId, Message, UserId};
///
/// let message = Message::new(UserId::new(), ChannelId::new(), "hello", &DefaultClock);
/// assert_eq!(message.text(), "hello");
/// assert!(!message.is_deleted());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Unique identifier for this message.
    id: MessageId,

    /// The user who authored the message.
    author_id: UserId,

    /// The channel the message was posted to.
    channel_id: ChannelId,

    /// The message body.
    text: String,

    /// When the message was created.
    created_at: DateTime<Utc>,

    /// When the message text was last changed.
    updated_at: DateTime<Utc>,

    /// Soft-deletion timestamp; `None` while the message is live.
    deleted_at: Option<DateTime<Utc>>,
}

impl Message {
    /// Creates a new live message with a fresh identifier and the current
    /// timestamp.
    #[must_use]
    pub fn new(
        author_id: UserId,
        channel_id: ChannelId,
        text: impl Into<String>,
        clock: &impl Clock,
    ) -> Self {
        let now = clock.utc();
        Self {
            id: MessageId::new(),
            author_id,
            channel_id,
            text: text.into(),
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    /// Reconstructs a message from persisted row data.
    #[must_use]
    pub fn from_persisted(data: PersistedMessageData) -> Self {
        let PersistedMessageData {
            id,
            author_id,
            channel_id,
            text,
            created_at,
            updated_at,
            deleted_at,
        } = data;
        Self {
            id,
            author_id,
            channel_id,
            text,
            created_at,
            updated_at,
            deleted_at,
        }
    }

    /// Returns the message identifier.
    #[must_use]
    pub const fn id(&self) -> MessageId {
        self.id
    }

    /// Returns the author identifier.
    #[must_use]
    pub const fn author_id(&self) -> UserId {
        self.author_id
    }

    /// Returns the channel identifier.
    #[must_use]
    pub const fn channel_id(&self) -> ChannelId {
        self.channel_id
    }

    /// Returns the message body.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the last-update timestamp.
    #[must_use]
    pub const fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Returns the soft-deletion timestamp, if any.
    #[must_use]
    pub const fn deleted_at(&self) -> Option<DateTime<Utc>> {
        self.deleted_at
    }

    /// Returns `true` if the message has been soft-deleted.
    #[must_use]
    pub const fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Returns a copy with the text replaced and the update timestamp
    /// refreshed. The pre-edit state must be archived before this copy is
    /// persisted.
    #[must_use]
    pub fn edited(&self, text: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self {
            text: text.into(),
            updated_at: at,
            ..self.clone()
        }
    }

    /// Returns a copy marked as soft-deleted at the given instant.
    #[must_use]
    pub fn soft_deleted(&self, at: DateTime<Utc>) -> Self {
        Self {
            deleted_at: Some(at),
            ..self.clone()
        }
    }
}

/// Raw field data for reconstructing a [`Message`] from storage.
#[derive(Debug, Clone)]
pub struct PersistedMessageData {
    /// Message identifier.
    pub id: MessageId,
    /// Author identifier.
    pub author_id: UserId,
    /// Channel identifier.
    pub channel_id: ChannelId,
    /// Message body.
    pub text: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last-update timestamp.
    pub updated_at: DateTime<Utc>,
    /// Soft-deletion timestamp.
    pub deleted_at: Option<DateTime<Utc>>,
}

/// An immutable snapshot of a message revision, written exactly once per
/// edit before the edit is applied.
///
/// The `as_of` timestamp is the superseded revision's `updated_at`, so the
/// archive for a message reads as a timeline of its prior states.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchivedMessage {
    /// Unique identifier for this archive row.
    id: ArchiveId,

    /// The message this revision belongs to.
    message_id: MessageId,

    /// The author of the archived revision.
    author_id: UserId,

    /// The superseded text.
    text: String,

    /// The superseded revision's last-update timestamp.
    as_of: DateTime<Utc>,
}

impl ArchivedMessage {
    /// Captures the pre-edit state of `message` as a new archive row.
    #[must_use]
    pub fn capture(message: &Message) -> Self {
        Self {
            id: ArchiveId::new(),
            message_id: message.id(),
            author_id: message.author_id(),
            text: message.text().to_owned(),
            as_of: message.updated_at(),
        }
    }

    /// Reconstructs an archive row from persisted data.
    #[must_use]
    pub fn from_persisted(
        id: ArchiveId,
        message_id: MessageId,
        author_id: UserId,
        text: String,
        as_of: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            message_id,
            author_id,
            text,
            as_of,
        }
    }

    /// Returns the archive row identifier.
    #[must_use]
    pub const fn id(&self) -> ArchiveId {
        self.id
    }

    /// Returns the identifier of the message this revision belongs to.
    #[must_use]
    pub const fn message_id(&self) -> MessageId {
        self.message_id
    }

    /// Returns the author of the archived revision.
    #[must_use]
    pub const fn author_id(&self) -> UserId {
        self.author_id
    }

    /// Returns the superseded text.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Returns the superseded revision's last-update timestamp.
    #[must_use]
    pub const fn as_of(&self) -> DateTime<Utc> {
        self.as_of
    }
}
