//! The message store orchestration service.
//!
//! Validates arguments at the boundary, drives exactly one repository
//! transaction per mutation, and publishes the committed-change events
//! strictly after the repository call returns successfully. A failed
//! transaction surfaces its error to the caller and publishes nothing.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use mockable::Clock;

use crate::message::{
    domain::{
        ArchivedMessage, ChannelId, ChannelUnreadSummary, Message, MessageId, MessageQuery,
        MessageStamp, Page, ParsedContent, StampId, StoreEvent, UnreadMarker, UserId,
    },
    error::{RepositoryError, StoreResult, ValidationError},
    ports::{
        notifier::ChangeNotifier,
        repository::{MessageRepository, UnreadOutcome},
    },
};

/// Orchestration service for the message store.
///
/// Generic over the repository, notifier, and clock so tests can
/// substitute the in-memory adapter, a recording notifier, and a fixed
/// clock.
#[derive(Clone)]
pub struct MessageService<R, N, C>
where
    R: MessageRepository,
    N: ChangeNotifier,
    C: Clock + Send + Sync,
{
    repository: Arc<R>,
    notifier: Arc<N>,
    clock: Arc<C>,
}

impl<R, N, C> MessageService<R, N, C>
where
    R: MessageRepository,
    N: ChangeNotifier,
    C: Clock + Send + Sync,
{
    /// Creates a service over the given ports.
    #[must_use]
    pub const fn new(repository: Arc<R>, notifier: Arc<N>, clock: Arc<C>) -> Self {
        Self {
            repository,
            notifier,
            clock,
        }
    }

    /// Creates a message in a channel.
    ///
    /// One transaction inserts the message and upserts the channel's
    /// latest-message pointer. After commit, a `MessageCreated` event is
    /// published with the parsed content, followed by `MessageCited`
    /// when the body cites other messages.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` for a nil author or channel id or empty
    /// text, or the repository error if the transaction fails.
    pub async fn create(
        &self,
        author: UserId,
        channel: ChannelId,
        text: impl Into<String> + Send,
    ) -> StoreResult<Message> {
        require_non_nil(author, "author id")?;
        require_non_nil(channel, "channel id")?;
        let body = text.into();
        require_text(&body)?;

        let message = Message::new(author, channel, body, self.clock.as_ref());
        self.repository.create_message(&message).await?;

        let parsed = ParsedContent::parse(message.text());
        let citations = parsed.citations().to_vec();
        tracing::debug!(message_id = %message.id(), channel_id = %channel, "message created");
        self.notifier.publish(StoreEvent::MessageCreated {
            message: message.clone(),
            parsed,
        });
        if !citations.is_empty() {
            self.notifier.publish(StoreEvent::MessageCited {
                message: message.clone(),
                cited: citations,
            });
        }
        Ok(message)
    }

    /// Edits a message's text.
    ///
    /// One transaction archives the pre-edit state, applies the change,
    /// and re-reads the canonical row. After commit, `MessageUpdated` is
    /// published with both snapshots.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` for a nil id or empty text, `NotFound`
    /// for an absent or soft-deleted message, or the repository error if
    /// the transaction fails.
    pub async fn update(
        &self,
        id: MessageId,
        text: impl Into<String> + Send,
    ) -> StoreResult<Message> {
        require_non_nil(id, "message id")?;
        let body = text.into();
        require_text(&body)?;

        let outcome = self
            .repository
            .update_message(id, body, self.clock.utc())
            .await?;
        tracing::debug!(message_id = %id, "message updated");
        let new = outcome.new.clone();
        self.notifier.publish(StoreEvent::MessageUpdated {
            old: outcome.old,
            new: outcome.new,
        });
        Ok(new)
    }

    /// Soft-deletes a message, cascading to its unread markers, pins,
    /// and clip associations in the same transaction. After commit,
    /// `MessageDeleted` is published with the cleared markers.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` for a nil id, `NotFound` for an absent
    /// or already-deleted message, or the repository error if the
    /// transaction fails.
    pub async fn delete(&self, id: MessageId) -> StoreResult<()> {
        require_non_nil(id, "message id")?;

        let outcome = self.repository.delete_message(id, self.clock.utc()).await?;
        tracing::debug!(
            message_id = %id,
            cleared_unreads = outcome.cleared_unreads.len(),
            "message deleted",
        );
        self.notifier.publish(StoreEvent::MessageDeleted {
            message: outcome.message,
            cleared_unreads: outcome.cleared_unreads,
        });
        Ok(())
    }

    /// Retrieves a live message by id.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for a nil id and for an absent or soft-deleted
    /// message, or a storage error if the read fails.
    pub async fn get(&self, id: MessageId) -> StoreResult<Message> {
        let found = self.repository.find_message(id).await?;
        found.ok_or_else(|| RepositoryError::NotFound(id).into())
    }

    /// Lists live messages matching a composable query with look-ahead
    /// pagination. Nil-identifier scopes yield an empty page.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the read fails.
    pub async fn list(&self, query: &MessageQuery) -> StoreResult<Page<Message>> {
        Ok(self.repository.list_messages(query).await?)
    }

    /// Lists messages edited at or after `since` for incremental sync.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the read fails.
    pub async fn updated_since(
        &self,
        since: DateTime<Utc>,
        limit: usize,
    ) -> StoreResult<Page<Message>> {
        Ok(self.repository.messages_updated_since(since, limit).await?)
    }

    /// Lists messages deleted at or after `since` for incremental sync.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the read fails.
    pub async fn deleted_since(
        &self,
        since: DateTime<Utc>,
        limit: usize,
    ) -> StoreResult<Page<Message>> {
        Ok(self.repository.messages_deleted_since(since, limit).await?)
    }

    /// Returns all archived revisions of a message, oldest first. Empty
    /// for a nil id.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the read fails.
    pub async fn archives(&self, id: MessageId) -> StoreResult<Vec<ArchivedMessage>> {
        Ok(self.repository.archives_by_message(id).await?)
    }

    /// Marks a message unread for a user.
    ///
    /// Idempotent: the first call inserts the marker and publishes
    /// `MessageUnread`; repeat calls only update the noticeable flag and
    /// publish nothing, since publication signals "became unread", not
    /// "settings changed".
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` for a nil id or the repository error if
    /// the write fails.
    pub async fn mark_unread(
        &self,
        user: UserId,
        message: MessageId,
        noticeable: bool,
    ) -> StoreResult<()> {
        require_non_nil(user, "user id")?;
        require_non_nil(message, "message id")?;

        let marker = UnreadMarker::new(user, message, noticeable, self.clock.utc());
        let outcome = self.repository.upsert_unread(marker).await?;
        if let UnreadOutcome::Inserted(inserted) = outcome {
            self.notifier.publish(StoreEvent::MessageUnread {
                message_id: inserted.message_id(),
                user_id: inserted.user_id(),
                noticeable: inserted.noticeable(),
            });
        }
        Ok(())
    }

    /// Returns all messages unread by the user, ordered by creation time
    /// ascending. Empty for a nil id.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the read fails.
    pub async fn list_unread(&self, user: UserId) -> StoreResult<Vec<Message>> {
        Ok(self.repository.unread_messages(user).await?)
    }

    /// Clears every unread marker the user holds in a channel, in one
    /// statement. Publishes `ChannelRead` with the removed count, only
    /// when at least one marker was removed.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` for a nil id or the repository error if
    /// the delete fails.
    pub async fn clear_channel_unreads(
        &self,
        channel: ChannelId,
        user: UserId,
    ) -> StoreResult<u64> {
        require_non_nil(channel, "channel id")?;
        require_non_nil(user, "user id")?;

        let cleared = self
            .repository
            .clear_channel_unreads(channel, user)
            .await?;
        if cleared > 0 {
            tracing::debug!(channel_id = %channel, user_id = %user, cleared, "channel read");
            self.notifier.publish(StoreEvent::ChannelRead {
                channel_id: channel,
                user_id: user,
                cleared,
            });
        }
        Ok(cleared)
    }

    /// Returns the per-channel unread aggregate for the user. Empty for
    /// a nil id.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the read fails.
    pub async fn unread_summary(
        &self,
        user: UserId,
    ) -> StoreResult<Vec<ChannelUnreadSummary>> {
        Ok(self.repository.unread_summary(user).await?)
    }

    /// Returns the latest message of each visible public channel, newest
    /// pointer first, optionally restricted to the user's forced or
    /// explicit subscriptions.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the read fails.
    pub async fn latest_per_channel(
        &self,
        user: UserId,
        limit: Option<usize>,
        subscribed_only: bool,
    ) -> StoreResult<Vec<Message>> {
        Ok(self
            .repository
            .latest_per_channel(user, limit, subscribed_only)
            .await?)
    }

    /// Applies a stamp to a message, raising the user's counter by
    /// `delta` atomically. Publishes `StampAdded` with the authoritative
    /// post-increment row.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` for a nil id or a delta below 1, or the
    /// repository error if the write fails. Rejecting non-positive
    /// deltas is what keeps counters from ever going negative.
    pub async fn add_stamp(
        &self,
        message: MessageId,
        stamp: StampId,
        user: UserId,
        delta: i64,
    ) -> StoreResult<MessageStamp> {
        require_non_nil(message, "message id")?;
        require_non_nil(stamp, "stamp id")?;
        require_non_nil(user, "user id")?;
        if delta < 1 {
            return Err(ValidationError::InvalidStampDelta(delta).into());
        }

        let row = self
            .repository
            .add_stamp(message, stamp, user, delta, self.clock.utc())
            .await?;
        self.notifier.publish(StoreEvent::StampAdded { stamp: row.clone() });
        Ok(row)
    }

    /// Removes all of the user's stamps of one kind from a message.
    /// Publishes `StampRemoved` only when a counter row was actually
    /// deleted; otherwise the call is an idempotent no-op.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` for a nil id or the repository error if
    /// the delete fails.
    pub async fn remove_stamp(
        &self,
        message: MessageId,
        stamp: StampId,
        user: UserId,
    ) -> StoreResult<()> {
        require_non_nil(message, "message id")?;
        require_non_nil(stamp, "stamp id")?;
        require_non_nil(user, "user id")?;

        let removed = self.repository.remove_stamp(message, stamp, user).await?;
        if removed {
            self.notifier.publish(StoreEvent::StampRemoved {
                message_id: message,
                stamp_id: stamp,
                user_id: user,
            });
        }
        Ok(())
    }
}

/// Rejects the nil identifier for a required argument.
fn require_non_nil<T: AsRef<uuid::Uuid>>(
    id: T,
    field: &'static str,
) -> Result<(), ValidationError> {
    if id.as_ref().is_nil() {
        return Err(ValidationError::nil_id(field));
    }
    Ok(())
}

/// Rejects empty message text.
const fn require_text(text: &str) -> Result<(), ValidationError> {
    if text.is_empty() {
        return Err(ValidationError::EmptyText);
    }
    Ok(())
}
