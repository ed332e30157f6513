//! Diesel schema for the message store.
//!
//! `channels` and `users_subscribe_channels` are owned by the channel
//! manager; the store only reads them in visibility and subscription
//! joins.

diesel::table! {
    /// Message records; soft-deleted via `deleted_at`.
    messages (id) {
        /// Message identifier.
        id -> Uuid,
        /// Author identifier.
        user_id -> Uuid,
        /// Channel identifier.
        channel_id -> Uuid,
        /// Message body.
        text -> Text,
        /// Creation timestamp.
        created_at -> Timestamptz,
        /// Last-update timestamp; independently indexed for sync reads.
        updated_at -> Timestamptz,
        /// Soft-deletion timestamp; independently indexed for sync reads.
        deleted_at -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    /// Immutable pre-edit snapshots, one row per superseded revision.
    archived_messages (id) {
        /// Archive row identifier.
        id -> Uuid,
        /// The message this revision belongs to.
        message_id -> Uuid,
        /// Author of the archived revision.
        user_id -> Uuid,
        /// Superseded text.
        text -> Text,
        /// The superseded revision's last-update timestamp.
        date_time -> Timestamptz,
    }
}

diesel::table! {
    /// Per-channel latest-message pointers, at most one row per channel.
    channel_latest_messages (channel_id) {
        /// Channel identifier.
        channel_id -> Uuid,
        /// The most recently created message in the channel.
        message_id -> Uuid,
        /// The pointed-to message's creation time.
        date_time -> Timestamptz,
    }
}

diesel::table! {
    /// Existence-based unread markers per `(user, message)`.
    unreads (user_id, message_id) {
        /// The user who has not read the message.
        user_id -> Uuid,
        /// The unread message.
        message_id -> Uuid,
        /// Whether the unread state surfaces as a notification.
        noticeable -> Bool,
        /// When the marker was first created.
        created_at -> Timestamptz,
    }
}

diesel::table! {
    /// Reaction counters per `(message, stamp, user)`.
    messages_stamps (message_id, stamp_id, user_id) {
        /// The stamped message.
        message_id -> Uuid,
        /// The stamp kind.
        stamp_id -> Uuid,
        /// The stamping user.
        user_id -> Uuid,
        /// How many times the user applied the stamp.
        count -> Int8,
        /// When the user first applied the stamp.
        created_at -> Timestamptz,
        /// When the count last changed.
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    /// Pin records; cascade-deleted with their message.
    pins (id) {
        /// Pin identifier.
        id -> Uuid,
        /// The pinned message.
        message_id -> Uuid,
        /// The pinning user.
        user_id -> Uuid,
        /// Creation timestamp.
        created_at -> Timestamptz,
    }
}

diesel::table! {
    /// Clip (bookmark) folder associations; cascade-deleted with their
    /// message.
    clip_folder_messages (folder_id, message_id) {
        /// The clip folder.
        folder_id -> Uuid,
        /// The clipped message.
        message_id -> Uuid,
        /// Creation timestamp.
        created_at -> Timestamptz,
    }
}

diesel::table! {
    /// Channel visibility snapshots (externally owned).
    channels (id) {
        /// Channel identifier.
        id -> Uuid,
        /// Whether the channel is public.
        is_public -> Bool,
        /// Whether notifications are forced for all users.
        is_forced -> Bool,
        /// Soft-deletion timestamp.
        deleted_at -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    /// Explicit channel subscriptions (externally owned).
    users_subscribe_channels (user_id, channel_id) {
        /// The subscribing user.
        user_id -> Uuid,
        /// The subscribed channel.
        channel_id -> Uuid,
    }
}

diesel::joinable!(unreads -> messages (message_id));
diesel::joinable!(channel_latest_messages -> channels (channel_id));
diesel::joinable!(channel_latest_messages -> messages (message_id));
diesel::joinable!(users_subscribe_channels -> channels (channel_id));
diesel::joinable!(pins -> messages (message_id));
diesel::joinable!(clip_folder_messages -> messages (message_id));

diesel::allow_tables_to_appear_in_same_query!(
    messages,
    archived_messages,
    channel_latest_messages,
    unreads,
    messages_stamps,
    pins,
    clip_folder_messages,
    channels,
    users_subscribe_channels,
);
