//! In-memory implementation of the `MessageRepository` port.
//!
//! Provides a thread-safe repository for unit and integration testing
//! without database dependencies. Not suitable for production use.
//!
//! All state lives behind a single [`RwLock`], so each mutating method is
//! naturally atomic, matching the one-transaction-per-operation contract
//! of the port. The adapter also exposes seeding helpers for the
//! externally-owned data the query paths join against (channels,
//! subscriptions, pins, clip associations).

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::message::{
    domain::{
        ArchivedMessage, ChannelId, ChannelLatestMessage, ChannelSnapshot, ChannelUnreadSummary,
        ClipFolderId, Message, MessageId, MessageQuery, MessageStamp, Order, Page, StampId,
        UnreadMarker, UserId,
    },
    error::{RepositoryError, RepositoryResult},
    ports::repository::{DeleteOutcome, MessageRepository, UnreadOutcome, UpdateOutcome},
};

/// Error indicating a duplicate message ID was detected.
#[derive(Debug)]
struct DuplicateMessageError {
    id: MessageId,
}

impl fmt::Display for DuplicateMessageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "message with id {} already exists", self.id)
    }
}

impl std::error::Error for DuplicateMessageError {}

/// The whole store state, guarded by one lock.
#[derive(Debug, Default)]
struct StoreState {
    messages: HashMap<MessageId, Message>,
    archives: Vec<ArchivedMessage>,
    latest: HashMap<ChannelId, ChannelLatestMessage>,
    unreads: BTreeMap<(UserId, MessageId), UnreadMarker>,
    stamps: HashMap<(MessageId, StampId, UserId), MessageStamp>,
    pins: HashSet<MessageId>,
    clips: HashSet<(ClipFolderId, MessageId)>,
    channels: HashMap<ChannelId, ChannelSnapshot>,
    subscriptions: HashSet<(UserId, ChannelId)>,
}

impl StoreState {
    fn live_message(&self, id: MessageId) -> Option<&Message> {
        self.messages.get(&id).filter(|m| !m.is_deleted())
    }

    fn channel_visible(&self, id: ChannelId) -> bool {
        self.channels.get(&id).is_some_and(ChannelSnapshot::is_visible)
    }

    fn user_subscribed(&self, user: UserId, channel: ChannelId) -> bool {
        self.channels.get(&channel).is_some_and(|c| c.is_forced)
            || self.subscriptions.contains(&(user, channel))
    }
}

/// In-memory implementation of [`MessageRepository`].
///
/// Thread-safe via an internal [`RwLock`]. Suitable for tests only.
///
/// # Example
///
/// ```
/// use palaver::message::adapters::memory::InMemoryMessageRepository;
///
/// let repo = InMemoryMessageRepository::new();
/// assert!(repo.is_empty());
/// ```
#[derive(Debug, Default, Clone)]
pub struct InMemoryMessageRepository {
    state: Arc<RwLock<StoreState>>,
}

impl InMemoryMessageRepository {
    /// Creates an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored messages, deleted ones included.
    ///
    /// Returns `0` if the internal lock is poisoned, matching the
    /// fallback behaviour of an empty repository.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.read().map(|s| s.messages.len()).unwrap_or(0)
    }

    /// Returns `true` if no messages are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Registers a live, public, non-forced channel snapshot.
    pub fn seed_public_channel(&self, id: ChannelId) {
        self.seed_channel(ChannelSnapshot {
            id,
            is_public: true,
            is_forced: false,
            deleted_at: None,
        });
    }

    /// Registers a channel snapshot for the query paths to join against.
    pub fn seed_channel(&self, snapshot: ChannelSnapshot) {
        if let Ok(mut state) = self.state.write() {
            state.channels.insert(snapshot.id, snapshot);
        }
    }

    /// Registers an explicit channel subscription for a user.
    pub fn seed_subscription(&self, user: UserId, channel: ChannelId) {
        if let Ok(mut state) = self.state.write() {
            state.subscriptions.insert((user, channel));
        }
    }

    /// Registers a pin record referencing a message.
    pub fn seed_pin(&self, message: MessageId) {
        if let Ok(mut state) = self.state.write() {
            state.pins.insert(message);
        }
    }

    /// Registers a clip-folder association referencing a message.
    pub fn seed_clip(&self, folder: ClipFolderId, message: MessageId) {
        if let Ok(mut state) = self.state.write() {
            state.clips.insert((folder, message));
        }
    }

    /// Returns the latest-message pointer for a channel, if any.
    #[must_use]
    pub fn latest_pointer(&self, channel: ChannelId) -> Option<ChannelLatestMessage> {
        self.state
            .read()
            .ok()
            .and_then(|s| s.latest.get(&channel).copied())
    }

    /// Returns `true` if a pin record references the message.
    #[must_use]
    pub fn pin_exists(&self, message: MessageId) -> bool {
        self.state
            .read()
            .is_ok_and(|s| s.pins.contains(&message))
    }

    /// Returns the number of clip associations referencing the message.
    #[must_use]
    pub fn clip_count(&self, message: MessageId) -> usize {
        self.state
            .read()
            .map(|s| s.clips.iter().filter(|(_, m)| *m == message).count())
            .unwrap_or(0)
    }

    /// Returns the number of archive rows for the message.
    #[must_use]
    pub fn archive_count(&self, message: MessageId) -> usize {
        self.state
            .read()
            .map(|s| {
                s.archives
                    .iter()
                    .filter(|a| a.message_id() == message)
                    .count()
            })
            .unwrap_or(0)
    }

    fn read(&self) -> RepositoryResult<RwLockReadGuard<'_, StoreState>> {
        self.state
            .read()
            .map_err(|_| RepositoryError::connection("store lock poisoned"))
    }

    fn write(&self) -> RepositoryResult<RwLockWriteGuard<'_, StoreState>> {
        self.state
            .write()
            .map_err(|_| RepositoryError::connection("store lock poisoned"))
    }
}

/// Sorts messages by creation time with an id tiebreak for determinism.
fn sort_by_created(messages: &mut [Message], order: Order) {
    messages.sort_by(|a, b| {
        let forward = a
            .created_at()
            .cmp(&b.created_at())
            .then_with(|| a.id().cmp(&b.id()));
        match order {
            Order::Ascending => forward,
            Order::Descending => forward.reverse(),
        }
    });
}

#[async_trait]
impl MessageRepository for InMemoryMessageRepository {
    async fn create_message(&self, message: &Message) -> RepositoryResult<()> {
        let mut state = self.write()?;
        if state.messages.contains_key(&message.id()) {
            return Err(RepositoryError::database(DuplicateMessageError {
                id: message.id(),
            }));
        }
        state.messages.insert(message.id(), message.clone());
        state.latest.insert(
            message.channel_id(),
            ChannelLatestMessage::new(message.channel_id(), message.id(), message.created_at()),
        );
        Ok(())
    }

    async fn update_message(
        &self,
        id: MessageId,
        text: String,
        at: DateTime<Utc>,
    ) -> RepositoryResult<UpdateOutcome> {
        let mut state = self.write()?;
        let old = state
            .live_message(id)
            .cloned()
            .ok_or(RepositoryError::NotFound(id))?;

        // Archive the superseded revision before applying the edit.
        state.archives.push(ArchivedMessage::capture(&old));

        let new = old.edited(text, at);
        state.messages.insert(id, new.clone());
        Ok(UpdateOutcome { old, new })
    }

    async fn delete_message(
        &self,
        id: MessageId,
        at: DateTime<Utc>,
    ) -> RepositoryResult<DeleteOutcome> {
        let mut state = self.write()?;
        let live = state
            .live_message(id)
            .cloned()
            .ok_or(RepositoryError::NotFound(id))?;

        let cleared_unreads: Vec<UnreadMarker> = state
            .unreads
            .values()
            .filter(|marker| marker.message_id() == id)
            .cloned()
            .collect();

        state.unreads.retain(|_, marker| marker.message_id() != id);
        state.pins.remove(&id);
        state.clips.retain(|(_, message)| *message != id);

        let message = live.soft_deleted(at);
        state.messages.insert(id, message.clone());
        Ok(DeleteOutcome {
            message,
            cleared_unreads,
        })
    }

    async fn find_message(&self, id: MessageId) -> RepositoryResult<Option<Message>> {
        if id.is_nil() {
            return Ok(None);
        }
        Ok(self.read()?.live_message(id).cloned())
    }

    async fn list_messages(&self, query: &MessageQuery) -> RepositoryResult<Page<Message>> {
        if query.has_nil_scope() {
            return Ok(Page::empty());
        }
        let state = self.read()?;
        let mut matched: Vec<Message> = state
            .messages
            .values()
            .filter(|m| !m.is_deleted())
            .filter(|m| query.matches(m))
            .filter(|m| !query.is_public_only() || state.channel_visible(m.channel_id()))
            .filter(|m| {
                query
                    .subscription_user()
                    .is_none_or(|user| state.user_subscribed(user, m.channel_id()))
            })
            .cloned()
            .collect();
        drop(state);

        sort_by_created(&mut matched, query.order());
        let looked_ahead: Vec<Message> = matched
            .into_iter()
            .skip(query.offset())
            .take(query.limit().map_or(usize::MAX, |l| l.saturating_add(1)))
            .collect();
        Ok(Page::from_look_ahead(looked_ahead, query.limit()))
    }

    async fn messages_updated_since(
        &self,
        since: DateTime<Utc>,
        limit: usize,
    ) -> RepositoryResult<Page<Message>> {
        let state = self.read()?;
        let mut matched: Vec<Message> = state
            .messages
            .values()
            .filter(|m| !m.is_deleted() && m.updated_at() >= since)
            .cloned()
            .collect();
        drop(state);

        matched.sort_by(|a, b| {
            a.updated_at()
                .cmp(&b.updated_at())
                .then_with(|| a.id().cmp(&b.id()))
        });
        matched.truncate(limit.saturating_add(1));
        Ok(Page::from_look_ahead(matched, Some(limit)))
    }

    async fn messages_deleted_since(
        &self,
        since: DateTime<Utc>,
        limit: usize,
    ) -> RepositoryResult<Page<Message>> {
        let state = self.read()?;
        let mut matched: Vec<Message> = state
            .messages
            .values()
            .filter(|m| m.deleted_at().is_some_and(|at| at >= since))
            .cloned()
            .collect();
        drop(state);

        matched.sort_by(|a, b| {
            a.deleted_at()
                .cmp(&b.deleted_at())
                .then_with(|| a.id().cmp(&b.id()))
        });
        matched.truncate(limit.saturating_add(1));
        Ok(Page::from_look_ahead(matched, Some(limit)))
    }

    async fn archives_by_message(
        &self,
        id: MessageId,
    ) -> RepositoryResult<Vec<ArchivedMessage>> {
        if id.is_nil() {
            return Ok(Vec::new());
        }
        let state = self.read()?;
        let mut archives: Vec<ArchivedMessage> = state
            .archives
            .iter()
            .filter(|a| a.message_id() == id)
            .cloned()
            .collect();
        drop(state);
        archives.sort_by_key(ArchivedMessage::as_of);
        Ok(archives)
    }

    async fn upsert_unread(&self, marker: UnreadMarker) -> RepositoryResult<UnreadOutcome> {
        let mut state = self.write()?;
        let key = (marker.user_id(), marker.message_id());
        if let Some(existing) = state.unreads.get(&key).cloned() {
            let updated = existing.with_noticeable(marker.noticeable());
            state.unreads.insert(key, updated.clone());
            return Ok(UnreadOutcome::FlagUpdated(updated));
        }
        state.unreads.insert(key, marker.clone());
        Ok(UnreadOutcome::Inserted(marker))
    }

    async fn unread_messages(&self, user: UserId) -> RepositoryResult<Vec<Message>> {
        if user.is_nil() {
            return Ok(Vec::new());
        }
        let state = self.read()?;
        let mut messages: Vec<Message> = state
            .unreads
            .values()
            .filter(|marker| marker.user_id() == user)
            .filter_map(|marker| state.messages.get(&marker.message_id()).cloned())
            .collect();
        drop(state);
        sort_by_created(&mut messages, Order::Ascending);
        Ok(messages)
    }

    async fn clear_channel_unreads(
        &self,
        channel: ChannelId,
        user: UserId,
    ) -> RepositoryResult<u64> {
        let mut state = self.write()?;
        let targets: Vec<(UserId, MessageId)> = state
            .unreads
            .values()
            .filter(|marker| marker.user_id() == user)
            .filter(|marker| {
                state
                    .messages
                    .get(&marker.message_id())
                    .is_some_and(|m| m.channel_id() == channel)
            })
            .map(|marker| (marker.user_id(), marker.message_id()))
            .collect();
        for key in &targets {
            state.unreads.remove(key);
        }
        u64::try_from(targets.len())
            .map_err(|e| RepositoryError::serialization(e.to_string()))
    }

    async fn unread_summary(
        &self,
        user: UserId,
    ) -> RepositoryResult<Vec<ChannelUnreadSummary>> {
        if user.is_nil() {
            return Ok(Vec::new());
        }
        let state = self.read()?;
        let mut by_channel: BTreeMap<ChannelId, ChannelUnreadSummary> = BTreeMap::new();
        for marker in state.unreads.values().filter(|m| m.user_id() == user) {
            let Some(message) = state.messages.get(&marker.message_id()) else {
                continue;
            };
            let created = message.created_at();
            by_channel
                .entry(message.channel_id())
                .and_modify(|summary| {
                    summary.count += 1;
                    summary.noticeable |= marker.noticeable();
                    summary.earliest_unread_at = summary.earliest_unread_at.min(created);
                    summary.latest_message_at = summary.latest_message_at.max(created);
                })
                .or_insert_with(|| ChannelUnreadSummary {
                    channel_id: message.channel_id(),
                    count: 1,
                    noticeable: marker.noticeable(),
                    earliest_unread_at: created,
                    latest_message_at: created,
                });
        }
        Ok(by_channel.into_values().collect())
    }

    async fn latest_per_channel(
        &self,
        user: UserId,
        limit: Option<usize>,
        subscribed_only: bool,
    ) -> RepositoryResult<Vec<Message>> {
        let state = self.read()?;
        let mut pointers: Vec<ChannelLatestMessage> = state
            .latest
            .values()
            .filter(|pointer| state.channel_visible(pointer.channel_id()))
            .filter(|pointer| {
                !subscribed_only || state.user_subscribed(user, pointer.channel_id())
            })
            .copied()
            .collect();
        pointers.sort_by(|a, b| {
            b.pointed_at()
                .cmp(&a.pointed_at())
                .then_with(|| a.channel_id().cmp(&b.channel_id()))
        });

        // Stale pointers stay observable: the pointed-to message is
        // returned even if it has since been soft-deleted.
        let messages: Vec<Message> = pointers
            .iter()
            .filter_map(|pointer| state.messages.get(&pointer.message_id()).cloned())
            .take(limit.unwrap_or(usize::MAX))
            .collect();
        Ok(messages)
    }

    async fn add_stamp(
        &self,
        message: MessageId,
        stamp: StampId,
        user: UserId,
        delta: i64,
        at: DateTime<Utc>,
    ) -> RepositoryResult<MessageStamp> {
        let mut state = self.write()?;
        let key = (message, stamp, user);
        let row = state.stamps.get(&key).map_or_else(
            || MessageStamp::new(message, stamp, user, delta, at, at),
            |existing| existing.incremented(delta, at),
        );
        state.stamps.insert(key, row.clone());
        Ok(row)
    }

    async fn remove_stamp(
        &self,
        message: MessageId,
        stamp: StampId,
        user: UserId,
    ) -> RepositoryResult<bool> {
        let mut state = self.write()?;
        Ok(state.stamps.remove(&(message, stamp, user)).is_some())
    }
}
