//! Repository port for the message store.
//!
//! A single trait covers all five entity families because the store's
//! correctness contract couples them: message creation must upsert the
//! latest-message pointer in the same transaction, and deletion must
//! cascade to unread markers, pins, and clip associations atomically.
//! Every mutating method is exactly one transaction against the
//! substrate — the unit of atomicity and isolation. No method publishes
//! events; outcome values carry what the service layer needs to publish
//! after commit.

use crate::message::{
    domain::{
        ArchivedMessage, ChannelId, ChannelUnreadSummary, Message, MessageId, MessageQuery,
        MessageStamp, Page, StampId, UnreadMarker, UserId,
    },
    error::RepositoryResult,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Outcome of a text edit: both snapshots needed for the update event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateOutcome {
    /// The pre-edit snapshot, as written to the archive.
    pub old: Message,
    /// The canonical post-edit state, re-read inside the transaction.
    pub new: Message,
}

/// Outcome of a soft-delete with cascades.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteOutcome {
    /// The message in its deleted state.
    pub message: Message,
    /// The unread markers removed by the cascade, captured before
    /// deletion for the event payload.
    pub cleared_unreads: Vec<UnreadMarker>,
}

/// Outcome of the idempotent unread upsert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnreadOutcome {
    /// No marker existed; one was inserted. The "became unread" event
    /// fires for this case only.
    Inserted(UnreadMarker),
    /// A marker already existed; only its noticeable flag was updated.
    FlagUpdated(UnreadMarker),
}

impl UnreadOutcome {
    /// Returns the marker as stored after the operation.
    #[must_use]
    pub const fn marker(&self) -> &UnreadMarker {
        match self {
            Self::Inserted(marker) | Self::FlagUpdated(marker) => marker,
        }
    }
}

/// Port for transactional message persistence.
///
/// # Implementation notes
///
/// Implementations must ensure:
/// - each mutating method is one atomic unit; a failure at any step rolls
///   back every write the method performed
/// - soft-deleted messages are invisible to all default read paths
/// - the latest-message pointer upsert tolerates the benign race between
///   concurrent first messages in a brand-new channel
/// - stamp increments are atomic at the substrate level, never
///   read-modify-write in application code
/// - list paths answer nil-identifier scopes with empty collections,
///   never errors
#[async_trait]
pub trait MessageRepository: Send + Sync {
    /// Inserts a new message and upserts its channel's latest-message
    /// pointer in the same transaction.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError`](crate::message::error::RepositoryError)
    /// if any write or the commit fails; no partial state is visible.
    async fn create_message(&self, message: &Message) -> RepositoryResult<()>;

    /// Applies a text edit: archives the pre-edit state, writes the new
    /// text and update timestamp, and re-reads the canonical row, all in
    /// one transaction.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the message is absent or soft-deleted, or a
    /// storage error if any step fails.
    async fn update_message(
        &self,
        id: MessageId,
        text: String,
        at: DateTime<Utc>,
    ) -> RepositoryResult<UpdateOutcome>;

    /// Soft-deletes a message and hard-deletes its unread markers, pins,
    /// and clip-folder associations in one transaction. The removed
    /// unread markers are captured before deletion.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the message is absent or already
    /// soft-deleted, or a storage error if any step fails.
    async fn delete_message(
        &self,
        id: MessageId,
        at: DateTime<Utc>,
    ) -> RepositoryResult<DeleteOutcome>;

    /// Retrieves a live message by id.
    ///
    /// Returns `None` for an absent or soft-deleted message and for the
    /// nil id.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the query fails.
    async fn find_message(&self, id: MessageId) -> RepositoryResult<Option<Message>>;

    /// Lists live messages matching a composable query, fetching
    /// `limit + 1` rows to detect further pages.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the query fails.
    async fn list_messages(&self, query: &MessageQuery) -> RepositoryResult<Page<Message>>;

    /// Lists messages edited at or after `since`, ordered by update
    /// timestamp ascending, with look-ahead pagination.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the query fails.
    async fn messages_updated_since(
        &self,
        since: DateTime<Utc>,
        limit: usize,
    ) -> RepositoryResult<Page<Message>>;

    /// Lists messages soft-deleted at or after `since`, ordered by
    /// deletion timestamp ascending, with look-ahead pagination.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the query fails.
    async fn messages_deleted_since(
        &self,
        since: DateTime<Utc>,
        limit: usize,
    ) -> RepositoryResult<Page<Message>>;

    /// Returns all archived revisions of a message ordered by their as-of
    /// timestamp. Empty for the nil id.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the query fails.
    async fn archives_by_message(
        &self,
        id: MessageId,
    ) -> RepositoryResult<Vec<ArchivedMessage>>;

    /// Idempotent unread upsert: inserts the marker if absent, otherwise
    /// updates only its noticeable flag.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the write fails.
    async fn upsert_unread(&self, marker: UnreadMarker) -> RepositoryResult<UnreadOutcome>;

    /// Returns all messages with an unread marker for the user, ordered
    /// by creation time ascending. Empty for the nil id.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the query fails.
    async fn unread_messages(&self, user: UserId) -> RepositoryResult<Vec<Message>>;

    /// Bulk-deletes every unread marker of the user whose message belongs
    /// to the channel, in one statement. Returns the number removed.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the delete fails.
    async fn clear_channel_unreads(
        &self,
        channel: ChannelId,
        user: UserId,
    ) -> RepositoryResult<u64>;

    /// Computes the per-channel unread aggregate for the user from the
    /// marker set joined to messages. Empty for the nil id.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the query fails.
    async fn unread_summary(&self, user: UserId)
        -> RepositoryResult<Vec<ChannelUnreadSummary>>;

    /// Returns the latest message of each visible public channel, ordered
    /// by pointer timestamp descending. With `subscribed_only`, restricts
    /// to channels the user is forced-subscribed to or has explicitly
    /// subscribed to.
    ///
    /// Deleted messages are not filtered here: a pointer left stale by a
    /// deletion stays observable until a newer message supersedes it.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the query fails.
    async fn latest_per_channel(
        &self,
        user: UserId,
        limit: Option<usize>,
        subscribed_only: bool,
    ) -> RepositoryResult<Vec<Message>>;

    /// Upserts the `(message, stamp, user)` counter row, adding `delta`
    /// with a substrate-level atomic increment, then re-reads the row for
    /// the authoritative post-increment state.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the write or re-read fails.
    async fn add_stamp(
        &self,
        message: MessageId,
        stamp: StampId,
        user: UserId,
        delta: i64,
        at: DateTime<Utc>,
    ) -> RepositoryResult<MessageStamp>;

    /// Deletes the `(message, stamp, user)` counter row. Returns `true`
    /// if a row was actually deleted; `false` makes the operation an
    /// idempotent no-op for the caller.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the delete fails.
    async fn remove_stamp(
        &self,
        message: MessageId,
        stamp: StampId,
        user: UserId,
    ) -> RepositoryResult<bool>;
}
