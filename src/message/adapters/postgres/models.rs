//! Diesel row models and domain conversions for the message store.

use super::schema::{archived_messages, channel_latest_messages, messages, messages_stamps, unreads};
use crate::message::domain::{
    ArchiveId, ArchivedMessage, ChannelId, ChannelUnreadSummary, Message, MessageId, MessageStamp,
    PersistedMessageData, StampId, UnreadMarker, UserId,
};
use crate::message::error::{RepositoryError, RepositoryResult};
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

/// Query result row for messages.
#[derive(Debug, Clone, Queryable, QueryableByName, Selectable)]
#[diesel(table_name = messages)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct MessageRow {
    /// Message identifier.
    #[diesel(sql_type = diesel::sql_types::Uuid)]
    pub id: Uuid,
    /// Author identifier.
    #[diesel(sql_type = diesel::sql_types::Uuid)]
    pub user_id: Uuid,
    /// Channel identifier.
    #[diesel(sql_type = diesel::sql_types::Uuid)]
    pub channel_id: Uuid,
    /// Message body.
    #[diesel(sql_type = diesel::sql_types::Text)]
    pub text: String,
    /// Creation timestamp.
    #[diesel(sql_type = diesel::sql_types::Timestamptz)]
    pub created_at: DateTime<Utc>,
    /// Last-update timestamp.
    #[diesel(sql_type = diesel::sql_types::Timestamptz)]
    pub updated_at: DateTime<Utc>,
    /// Soft-deletion timestamp.
    #[diesel(sql_type = diesel::sql_types::Nullable<diesel::sql_types::Timestamptz>)]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl MessageRow {
    /// Converts the row into its domain type.
    #[must_use]
    pub fn into_domain(self) -> Message {
        Message::from_persisted(PersistedMessageData {
            id: MessageId::from_uuid(self.id),
            author_id: UserId::from_uuid(self.user_id),
            channel_id: ChannelId::from_uuid(self.channel_id),
            text: self.text,
            created_at: self.created_at,
            updated_at: self.updated_at,
            deleted_at: self.deleted_at,
        })
    }
}

/// Insert model for messages.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = messages)]
pub struct NewMessageRow {
    /// Message identifier.
    pub id: Uuid,
    /// Author identifier.
    pub user_id: Uuid,
    /// Channel identifier.
    pub channel_id: Uuid,
    /// Message body.
    pub text: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last-update timestamp.
    pub updated_at: DateTime<Utc>,
    /// Soft-deletion timestamp, always `None` on insert.
    pub deleted_at: Option<DateTime<Utc>>,
}

impl From<&Message> for NewMessageRow {
    fn from(message: &Message) -> Self {
        Self {
            id: message.id().into_inner(),
            user_id: message.author_id().into_inner(),
            channel_id: message.channel_id().into_inner(),
            text: message.text().to_owned(),
            created_at: message.created_at(),
            updated_at: message.updated_at(),
            deleted_at: message.deleted_at(),
        }
    }
}

/// Query result row for archived revisions.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = archived_messages)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ArchivedMessageRow {
    /// Archive row identifier.
    pub id: Uuid,
    /// The message this revision belongs to.
    pub message_id: Uuid,
    /// Author of the archived revision.
    pub user_id: Uuid,
    /// Superseded text.
    pub text: String,
    /// The superseded revision's last-update timestamp.
    pub date_time: DateTime<Utc>,
}

impl ArchivedMessageRow {
    /// Converts the row into its domain type.
    #[must_use]
    pub fn into_domain(self) -> ArchivedMessage {
        ArchivedMessage::from_persisted(
            ArchiveId::from_uuid(self.id),
            MessageId::from_uuid(self.message_id),
            UserId::from_uuid(self.user_id),
            self.text,
            self.date_time,
        )
    }
}

/// Insert model for archived revisions.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = archived_messages)]
pub struct NewArchivedMessageRow {
    /// Archive row identifier.
    pub id: Uuid,
    /// The message this revision belongs to.
    pub message_id: Uuid,
    /// Author of the archived revision.
    pub user_id: Uuid,
    /// Superseded text.
    pub text: String,
    /// The superseded revision's last-update timestamp.
    pub date_time: DateTime<Utc>,
}

impl From<&ArchivedMessage> for NewArchivedMessageRow {
    fn from(archive: &ArchivedMessage) -> Self {
        Self {
            id: archive.id().into_inner(),
            message_id: archive.message_id().into_inner(),
            user_id: archive.author_id().into_inner(),
            text: archive.text().to_owned(),
            date_time: archive.as_of(),
        }
    }
}

/// Upsert model for the latest-message pointer.
#[derive(Debug, Clone, Copy, Insertable)]
#[diesel(table_name = channel_latest_messages)]
pub struct LatestMessagePointerRow {
    /// Channel identifier.
    pub channel_id: Uuid,
    /// The most recently created message in the channel.
    pub message_id: Uuid,
    /// The pointed-to message's creation time.
    pub date_time: DateTime<Utc>,
}

/// Query result and insert model for unread markers.
#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = unreads)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct UnreadRow {
    /// The user who has not read the message.
    pub user_id: Uuid,
    /// The unread message.
    pub message_id: Uuid,
    /// Whether the unread state surfaces as a notification.
    pub noticeable: bool,
    /// When the marker was first created.
    pub created_at: DateTime<Utc>,
}

impl UnreadRow {
    /// Converts the row into its domain type.
    #[must_use]
    pub fn into_domain(self) -> UnreadMarker {
        UnreadMarker::new(
            UserId::from_uuid(self.user_id),
            MessageId::from_uuid(self.message_id),
            self.noticeable,
            self.created_at,
        )
    }
}

impl From<&UnreadMarker> for UnreadRow {
    fn from(marker: &UnreadMarker) -> Self {
        Self {
            user_id: marker.user_id().into_inner(),
            message_id: marker.message_id().into_inner(),
            noticeable: marker.noticeable(),
            created_at: marker.marked_at(),
        }
    }
}

/// Query result and insert model for reaction counters.
#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = messages_stamps)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct StampRow {
    /// The stamped message.
    pub message_id: Uuid,
    /// The stamp kind.
    pub stamp_id: Uuid,
    /// The stamping user.
    pub user_id: Uuid,
    /// How many times the user applied the stamp.
    pub count: i64,
    /// When the user first applied the stamp.
    pub created_at: DateTime<Utc>,
    /// When the count last changed.
    pub updated_at: DateTime<Utc>,
}

impl StampRow {
    /// Converts the row into its domain type.
    #[must_use]
    pub fn into_domain(self) -> MessageStamp {
        MessageStamp::new(
            MessageId::from_uuid(self.message_id),
            StampId::from_uuid(self.stamp_id),
            UserId::from_uuid(self.user_id),
            self.count,
            self.created_at,
            self.updated_at,
        )
    }
}

/// Aggregate row for the per-channel unread summary.
#[derive(Debug, Clone, QueryableByName)]
pub struct UnreadSummaryRow {
    /// The channel the unread messages belong to.
    #[diesel(sql_type = diesel::sql_types::Uuid)]
    pub channel_id: Uuid,
    /// Number of unread messages in the channel.
    #[diesel(sql_type = diesel::sql_types::Int8)]
    pub count: i64,
    /// `true` if any marker in the channel is noticeable.
    #[diesel(sql_type = diesel::sql_types::Bool)]
    pub noticeable: bool,
    /// Creation time of the earliest unread message.
    #[diesel(sql_type = diesel::sql_types::Timestamptz)]
    pub earliest_unread_at: DateTime<Utc>,
    /// Creation time of the latest unread message.
    #[diesel(sql_type = diesel::sql_types::Timestamptz)]
    pub latest_message_at: DateTime<Utc>,
}

impl UnreadSummaryRow {
    /// Converts the aggregate row into its domain type.
    ///
    /// # Errors
    ///
    /// Returns a serialisation error if the substrate reports a negative
    /// count, which the marker-existence model cannot represent.
    pub fn into_domain(self) -> RepositoryResult<ChannelUnreadSummary> {
        let count = u64::try_from(self.count)
            .map_err(|_| RepositoryError::serialization("negative unread count"))?;
        Ok(ChannelUnreadSummary {
            channel_id: ChannelId::from_uuid(self.channel_id),
            count,
            noticeable: self.noticeable,
            earliest_unread_at: self.earliest_unread_at,
            latest_message_at: self.latest_message_at,
        })
    }
}
