//! `PostgreSQL` implementation of the `MessageRepository` port using
//! Diesel ORM.
//!
//! Every mutating method runs inside one `conn.transaction`, matching the
//! port's one-transaction-per-operation contract. The latest-message
//! pointer is maintained with an `ON CONFLICT` upsert so concurrent first
//! messages in a brand-new channel race benignly, and stamp counters are
//! incremented in SQL (`count = count + $delta`) rather than
//! read-modify-write in application code.

pub mod models;
pub mod schema;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::pg::{Pg, PgConnection};
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};

use self::models::{
    ArchivedMessageRow, LatestMessagePointerRow, MessageRow, NewArchivedMessageRow, NewMessageRow,
    StampRow, UnreadRow, UnreadSummaryRow,
};
use self::schema::{
    archived_messages, channel_latest_messages, channels, clip_folder_messages, messages,
    messages_stamps, pins, unreads, users_subscribe_channels,
};
use crate::message::{
    domain::{
        ArchivedMessage, ChannelId, ChannelUnreadSummary, Message, MessageId, MessageQuery,
        MessageStamp, Order, Page, StampId, UnreadMarker, UserId,
    },
    error::{RepositoryError, RepositoryResult},
    ports::repository::{DeleteOutcome, MessageRepository, UnreadOutcome, UpdateOutcome},
};

/// `PostgreSQL` connection pool type.
pub type PgPool = Pool<ConnectionManager<PgConnection>>;

/// Latest-message feed over all visible public channels.
const LATEST_PUBLIC_SQL: &str = "\
SELECT m.id, m.user_id, m.channel_id, m.text, m.created_at, m.updated_at, m.deleted_at \
FROM channel_latest_messages clm \
         INNER JOIN messages m ON clm.message_id = m.id \
         INNER JOIN channels c ON clm.channel_id = c.id \
WHERE c.deleted_at IS NULL \
  AND c.is_public = TRUE \
ORDER BY clm.date_time DESC \
LIMIT $1";

/// Latest-message feed restricted to the user's forced or explicit
/// subscriptions.
const LATEST_SUBSCRIBED_SQL: &str = "\
SELECT m.id, m.user_id, m.channel_id, m.text, m.created_at, m.updated_at, m.deleted_at \
FROM channel_latest_messages clm \
         INNER JOIN messages m ON clm.message_id = m.id \
         INNER JOIN channels c ON clm.channel_id = c.id \
WHERE c.deleted_at IS NULL \
  AND c.is_public = TRUE \
  AND (c.is_forced = TRUE OR EXISTS (\
        SELECT 1 FROM users_subscribe_channels s \
        WHERE s.channel_id = clm.channel_id AND s.user_id = $1)) \
ORDER BY clm.date_time DESC \
LIMIT $2";

/// Hand-shaped public activity feed. `PostgreSQL` has no index hints, so
/// the latency-sensitive path gets a fixed query the planner resolves
/// through the `created_at` index instead of the generic filter builder.
const PUBLIC_FEED_SQL: &str = "\
SELECT m.id, m.user_id, m.channel_id, m.text, m.created_at, m.updated_at, m.deleted_at \
FROM messages m \
         INNER JOIN channels c ON m.channel_id = c.id \
WHERE m.deleted_at IS NULL \
  AND c.deleted_at IS NULL \
  AND c.is_public = TRUE \
ORDER BY m.created_at DESC \
LIMIT $1";

/// Per-channel unread aggregate for one user.
const UNREAD_SUMMARY_SQL: &str = "\
SELECT m.channel_id AS channel_id, \
       COUNT(*) AS count, \
       BOOL_OR(u.noticeable) AS noticeable, \
       MIN(m.created_at) AS earliest_unread_at, \
       MAX(m.created_at) AS latest_message_at \
FROM unreads u \
         INNER JOIN messages m ON u.message_id = m.id \
WHERE u.user_id = $1 \
GROUP BY m.channel_id";

/// `PostgreSQL`-backed message repository.
///
/// Uses Diesel ORM with connection pooling via r2d2, offloading
/// synchronous database work with [`tokio::task::spawn_blocking`].
///
/// # Example
///
/// ```ignore
/// use diesel::r2d2::{ConnectionManager, Pool};
/// use diesel::PgConnection;
/// use palaver::message::adapters::postgres::PostgresMessageRepository;
///
/// let manager = ConnectionManager::<PgConnection>::new("postgres://...");
/// let pool = Pool::builder().build(manager).expect("pool");
/// let repo = PostgresMessageRepository::new(pool);
/// ```
#[derive(Debug, Clone)]
pub struct PostgresMessageRepository {
    pool: PgPool,
}

impl PostgresMessageRepository {
    /// Creates a new repository with the given connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Returns a reference to the connection pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn run_blocking<F, T>(&self, f: F) -> RepositoryResult<T>
    where
        F: FnOnce(&mut PgConnection) -> RepositoryResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut connection = pool
                .get()
                .map_err(|e| RepositoryError::connection(e.to_string()))?;
            f(&mut connection)
        })
        .await
        .map_err(|e| RepositoryError::connection(format!("task join error: {e}")))?
    }
}

/// Loads a live message row inside a transaction, translating the
/// substrate's "no rows" signal to the semantic not-found error.
fn load_live_message(conn: &mut PgConnection, id: MessageId) -> RepositoryResult<MessageRow> {
    messages::table
        .filter(messages::id.eq(id.into_inner()))
        .filter(messages::deleted_at.is_null())
        .select(MessageRow::as_select())
        .first::<MessageRow>(conn)
        .map_err(|e| RepositoryError::from_diesel(e, id))
}

/// Converts a usize page parameter into the SQL bigint Diesel expects.
fn to_sql_count(value: usize) -> RepositoryResult<i64> {
    i64::try_from(value).map_err(RepositoryError::database)
}

/// Runs the generic filtered statement for [`MessageQuery`] with the
/// `limit + 1` look-ahead applied.
fn load_filtered(
    conn: &mut PgConnection,
    query: &MessageQuery,
) -> RepositoryResult<Vec<MessageRow>> {
    let mut statement = messages::table
        .select(MessageRow::as_select())
        .filter(messages::deleted_at.is_null())
        .into_boxed::<Pg>();

    if let Some(channel) = query.channel() {
        statement = statement.filter(messages::channel_id.eq(channel.into_inner()));
    }
    if let Some(author) = query.author() {
        statement = statement.filter(messages::user_id.eq(author.into_inner()));
    }
    if query.is_public_only() {
        let visible = channels::table
            .filter(channels::is_public.eq(true))
            .filter(channels::deleted_at.is_null())
            .select(channels::id);
        statement = statement.filter(messages::channel_id.eq_any(visible));
    }
    if let Some(user) = query.subscription_user() {
        let explicit = users_subscribe_channels::table
            .filter(users_subscribe_channels::user_id.eq(user.into_inner()))
            .select(users_subscribe_channels::channel_id);
        let forced = channels::table
            .filter(channels::is_forced.eq(true))
            .select(channels::id);
        statement = statement.filter(
            messages::channel_id
                .eq_any(explicit)
                .or(messages::channel_id.eq_any(forced)),
        );
    }
    if let Some(since) = query.since_bound() {
        statement = if since.inclusive {
            statement.filter(messages::created_at.ge(since.at))
        } else {
            statement.filter(messages::created_at.gt(since.at))
        };
    }
    if let Some(until) = query.until_bound() {
        statement = if until.inclusive {
            statement.filter(messages::created_at.le(until.at))
        } else {
            statement.filter(messages::created_at.lt(until.at))
        };
    }

    statement = match query.order() {
        Order::Ascending => statement.order(messages::created_at.asc()),
        Order::Descending => statement.order(messages::created_at.desc()),
    };

    if query.offset() > 0 {
        statement = statement.offset(to_sql_count(query.offset())?);
    }
    if let Some(limit) = query.limit() {
        statement = statement.limit(to_sql_count(limit.saturating_add(1))?);
    }
    statement.load::<MessageRow>(conn).map_err(RepositoryError::from)
}

/// Returns `true` if the query matches the latency-sensitive public feed
/// shape: public channels, newest first, a limit and nothing else.
fn is_public_feed(query: &MessageQuery) -> bool {
    query.is_public_only()
        && query.channel().is_none()
        && query.author().is_none()
        && query.subscription_user().is_none()
        && query.since_bound().is_none()
        && query.until_bound().is_none()
        && query.offset() == 0
        && query.order() == Order::Descending
        && query.limit().is_some()
}

#[async_trait]
impl MessageRepository for PostgresMessageRepository {
    async fn create_message(&self, message: &Message) -> RepositoryResult<()> {
        let new_row = NewMessageRow::from(message);
        let pointer = LatestMessagePointerRow {
            channel_id: message.channel_id().into_inner(),
            message_id: message.id().into_inner(),
            date_time: message.created_at(),
        };

        self.run_blocking(move |conn| {
            conn.transaction::<_, RepositoryError, _>(|tx| {
                diesel::insert_into(messages::table)
                    .values(&new_row)
                    .execute(tx)?;

                diesel::insert_into(channel_latest_messages::table)
                    .values(&pointer)
                    .on_conflict(channel_latest_messages::channel_id)
                    .do_update()
                    .set((
                        channel_latest_messages::message_id.eq(pointer.message_id),
                        channel_latest_messages::date_time.eq(pointer.date_time),
                    ))
                    .execute(tx)?;
                Ok(())
            })
        })
        .await
    }

    async fn update_message(
        &self,
        id: MessageId,
        text: String,
        at: DateTime<Utc>,
    ) -> RepositoryResult<UpdateOutcome> {
        self.run_blocking(move |conn| {
            conn.transaction::<_, RepositoryError, _>(|tx| {
                let old = load_live_message(tx, id)?.into_domain();

                // The archive must reflect the superseded content, so it
                // is written before the edit is applied.
                let archive = ArchivedMessage::capture(&old);
                diesel::insert_into(archived_messages::table)
                    .values(&NewArchivedMessageRow::from(&archive))
                    .execute(tx)?;

                diesel::update(messages::table.filter(messages::id.eq(id.into_inner())))
                    .set((messages::text.eq(&text), messages::updated_at.eq(at)))
                    .execute(tx)?;

                let new = load_live_message(tx, id)?.into_domain();
                Ok(UpdateOutcome { old, new })
            })
        })
        .await
    }

    async fn delete_message(
        &self,
        id: MessageId,
        at: DateTime<Utc>,
    ) -> RepositoryResult<DeleteOutcome> {
        self.run_blocking(move |conn| {
            conn.transaction::<_, RepositoryError, _>(|tx| {
                let live = load_live_message(tx, id)?.into_domain();

                let cleared_unreads: Vec<UnreadMarker> = unreads::table
                    .filter(unreads::message_id.eq(id.into_inner()))
                    .select(UnreadRow::as_select())
                    .load::<UnreadRow>(tx)?
                    .into_iter()
                    .map(UnreadRow::into_domain)
                    .collect();

                diesel::update(messages::table.filter(messages::id.eq(id.into_inner())))
                    .set(messages::deleted_at.eq(Some(at)))
                    .execute(tx)?;
                diesel::delete(unreads::table.filter(unreads::message_id.eq(id.into_inner())))
                    .execute(tx)?;
                diesel::delete(pins::table.filter(pins::message_id.eq(id.into_inner())))
                    .execute(tx)?;
                diesel::delete(
                    clip_folder_messages::table
                        .filter(clip_folder_messages::message_id.eq(id.into_inner())),
                )
                .execute(tx)?;

                Ok(DeleteOutcome {
                    message: live.soft_deleted(at),
                    cleared_unreads,
                })
            })
        })
        .await
    }

    async fn find_message(&self, id: MessageId) -> RepositoryResult<Option<Message>> {
        if id.is_nil() {
            return Ok(None);
        }
        self.run_blocking(move |conn| {
            let row = messages::table
                .filter(messages::id.eq(id.into_inner()))
                .filter(messages::deleted_at.is_null())
                .select(MessageRow::as_select())
                .first::<MessageRow>(conn)
                .optional()?;
            Ok(row.map(MessageRow::into_domain))
        })
        .await
    }

    async fn list_messages(&self, query: &MessageQuery) -> RepositoryResult<Page<Message>> {
        if query.has_nil_scope() {
            return Ok(Page::empty());
        }
        let filter = query.clone();
        self.run_blocking(move |conn| {
            let rows: Vec<MessageRow> = if is_public_feed(&filter) {
                let limit = filter.limit().unwrap_or(0);
                diesel::sql_query(PUBLIC_FEED_SQL)
                    .bind::<diesel::sql_types::BigInt, _>(to_sql_count(
                        limit.saturating_add(1),
                    )?)
                    .load::<MessageRow>(conn)?
            } else {
                load_filtered(conn, &filter)?
            };
            let items = rows.into_iter().map(MessageRow::into_domain).collect();
            Ok(Page::from_look_ahead(items, filter.limit()))
        })
        .await
    }

    async fn messages_updated_since(
        &self,
        since: DateTime<Utc>,
        limit: usize,
    ) -> RepositoryResult<Page<Message>> {
        self.run_blocking(move |conn| {
            let rows: Vec<MessageRow> = messages::table
                .filter(messages::deleted_at.is_null())
                .filter(messages::updated_at.ge(since))
                .order(messages::updated_at.asc())
                .limit(to_sql_count(limit.saturating_add(1))?)
                .select(MessageRow::as_select())
                .load::<MessageRow>(conn)?;
            let items = rows.into_iter().map(MessageRow::into_domain).collect();
            Ok(Page::from_look_ahead(items, Some(limit)))
        })
        .await
    }

    async fn messages_deleted_since(
        &self,
        since: DateTime<Utc>,
        limit: usize,
    ) -> RepositoryResult<Page<Message>> {
        self.run_blocking(move |conn| {
            let rows: Vec<MessageRow> = messages::table
                .filter(messages::deleted_at.ge(since))
                .order(messages::deleted_at.asc())
                .limit(to_sql_count(limit.saturating_add(1))?)
                .select(MessageRow::as_select())
                .load::<MessageRow>(conn)?;
            let items = rows.into_iter().map(MessageRow::into_domain).collect();
            Ok(Page::from_look_ahead(items, Some(limit)))
        })
        .await
    }

    async fn archives_by_message(
        &self,
        id: MessageId,
    ) -> RepositoryResult<Vec<ArchivedMessage>> {
        if id.is_nil() {
            return Ok(Vec::new());
        }
        self.run_blocking(move |conn| {
            let rows: Vec<ArchivedMessageRow> = archived_messages::table
                .filter(archived_messages::message_id.eq(id.into_inner()))
                .order(archived_messages::date_time.asc())
                .select(ArchivedMessageRow::as_select())
                .load::<ArchivedMessageRow>(conn)?;
            Ok(rows.into_iter().map(ArchivedMessageRow::into_domain).collect())
        })
        .await
    }

    async fn upsert_unread(&self, marker: UnreadMarker) -> RepositoryResult<UnreadOutcome> {
        self.run_blocking(move |conn| {
            conn.transaction::<_, RepositoryError, _>(|tx| {
                let existing = unreads::table
                    .filter(unreads::user_id.eq(marker.user_id().into_inner()))
                    .filter(unreads::message_id.eq(marker.message_id().into_inner()))
                    .select(UnreadRow::as_select())
                    .first::<UnreadRow>(tx)
                    .optional()?;

                if let Some(row) = existing {
                    diesel::update(
                        unreads::table
                            .filter(unreads::user_id.eq(row.user_id))
                            .filter(unreads::message_id.eq(row.message_id)),
                    )
                    .set(unreads::noticeable.eq(marker.noticeable()))
                    .execute(tx)?;
                    return Ok(UnreadOutcome::FlagUpdated(
                        row.into_domain().with_noticeable(marker.noticeable()),
                    ));
                }

                diesel::insert_into(unreads::table)
                    .values(&UnreadRow::from(&marker))
                    .execute(tx)?;
                Ok(UnreadOutcome::Inserted(marker))
            })
        })
        .await
    }

    async fn unread_messages(&self, user: UserId) -> RepositoryResult<Vec<Message>> {
        if user.is_nil() {
            return Ok(Vec::new());
        }
        self.run_blocking(move |conn| {
            let rows: Vec<MessageRow> = unreads::table
                .inner_join(messages::table)
                .filter(unreads::user_id.eq(user.into_inner()))
                .order(messages::created_at.asc())
                .select(MessageRow::as_select())
                .load::<MessageRow>(conn)?;
            Ok(rows.into_iter().map(MessageRow::into_domain).collect())
        })
        .await
    }

    async fn clear_channel_unreads(
        &self,
        channel: ChannelId,
        user: UserId,
    ) -> RepositoryResult<u64> {
        self.run_blocking(move |conn| {
            let channel_messages = messages::table
                .filter(messages::channel_id.eq(channel.into_inner()))
                .select(messages::id);
            let removed = diesel::delete(
                unreads::table
                    .filter(unreads::user_id.eq(user.into_inner()))
                    .filter(unreads::message_id.eq_any(channel_messages)),
            )
            .execute(conn)?;
            u64::try_from(removed).map_err(RepositoryError::database)
        })
        .await
    }

    async fn unread_summary(
        &self,
        user: UserId,
    ) -> RepositoryResult<Vec<ChannelUnreadSummary>> {
        if user.is_nil() {
            return Ok(Vec::new());
        }
        self.run_blocking(move |conn| {
            let rows: Vec<UnreadSummaryRow> = diesel::sql_query(UNREAD_SUMMARY_SQL)
                .bind::<diesel::sql_types::Uuid, _>(user.into_inner())
                .load::<UnreadSummaryRow>(conn)?;
            rows.into_iter().map(UnreadSummaryRow::into_domain).collect()
        })
        .await
    }

    async fn latest_per_channel(
        &self,
        user: UserId,
        limit: Option<usize>,
        subscribed_only: bool,
    ) -> RepositoryResult<Vec<Message>> {
        self.run_blocking(move |conn| {
            let sql_limit = match limit {
                Some(cap) => to_sql_count(cap)?,
                None => i64::MAX,
            };
            let rows: Vec<MessageRow> = if subscribed_only {
                diesel::sql_query(LATEST_SUBSCRIBED_SQL)
                    .bind::<diesel::sql_types::Uuid, _>(user.into_inner())
                    .bind::<diesel::sql_types::BigInt, _>(sql_limit)
                    .load::<MessageRow>(conn)?
            } else {
                diesel::sql_query(LATEST_PUBLIC_SQL)
                    .bind::<diesel::sql_types::BigInt, _>(sql_limit)
                    .load::<MessageRow>(conn)?
            };
            Ok(rows.into_iter().map(MessageRow::into_domain).collect())
        })
        .await
    }

    async fn add_stamp(
        &self,
        message: MessageId,
        stamp: StampId,
        user: UserId,
        delta: i64,
        at: DateTime<Utc>,
    ) -> RepositoryResult<MessageStamp> {
        self.run_blocking(move |conn| {
            conn.transaction::<_, RepositoryError, _>(|tx| {
                diesel::insert_into(messages_stamps::table)
                    .values(&StampRow {
                        message_id: message.into_inner(),
                        stamp_id: stamp.into_inner(),
                        user_id: user.into_inner(),
                        count: delta,
                        created_at: at,
                        updated_at: at,
                    })
                    .on_conflict((
                        messages_stamps::message_id,
                        messages_stamps::stamp_id,
                        messages_stamps::user_id,
                    ))
                    .do_update()
                    .set((
                        messages_stamps::count.eq(messages_stamps::count + delta),
                        messages_stamps::updated_at.eq(at),
                    ))
                    .execute(tx)?;

                // Re-read for the authoritative post-increment state.
                let row: StampRow = messages_stamps::table
                    .filter(messages_stamps::message_id.eq(message.into_inner()))
                    .filter(messages_stamps::stamp_id.eq(stamp.into_inner()))
                    .filter(messages_stamps::user_id.eq(user.into_inner()))
                    .select(StampRow::as_select())
                    .first::<StampRow>(tx)?;
                Ok(row.into_domain())
            })
        })
        .await
    }

    async fn remove_stamp(
        &self,
        message: MessageId,
        stamp: StampId,
        user: UserId,
    ) -> RepositoryResult<bool> {
        self.run_blocking(move |conn| {
            let removed = diesel::delete(
                messages_stamps::table
                    .filter(messages_stamps::message_id.eq(message.into_inner()))
                    .filter(messages_stamps::stamp_id.eq(stamp.into_inner()))
                    .filter(messages_stamps::user_id.eq(user.into_inner())),
            )
            .execute(conn)?;
            Ok(removed > 0)
        })
        .await
    }
}
