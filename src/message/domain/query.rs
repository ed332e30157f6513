//! The composable message query and look-ahead pagination types.
//!
//! A query combines channel scope, author scope, subscription-based
//! channel scope, public-only filtering, inclusive or exclusive time
//! bounds, ordering, offset, and limit. List paths fetch `limit + 1` rows
//! and trim the extra one to detect further pages without a count query.

use super::{ChannelId, Message, UserId};
use chrono::{DateTime, Utc};

/// One end of a time window, inclusive or exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeBound {
    /// The boundary instant.
    pub at: DateTime<Utc>,
    /// Whether a message exactly at the boundary is included.
    pub inclusive: bool,
}

impl TimeBound {
    /// An inclusive bound at the given instant.
    #[must_use]
    pub const fn inclusive(at: DateTime<Utc>) -> Self {
        Self {
            at,
            inclusive: true,
        }
    }

    /// An exclusive bound at the given instant.
    #[must_use]
    pub const fn exclusive(at: DateTime<Utc>) -> Self {
        Self {
            at,
            inclusive: false,
        }
    }
}

/// Result ordering by creation time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Order {
    /// Oldest first.
    Ascending,
    /// Newest first (the default for channel timelines).
    #[default]
    Descending,
}

/// A composable filter over the message table.
///
/// # Examples
///
/// ```
/// use palaver::message::domain::{ChannelId, MessageQuery};
///
/// let query = MessageQuery::new()
///     .in_channel(ChannelId::new())
///     .ascending()
///     .with_limit(50);
/// assert_eq!(query.limit(), Some(50));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageQuery {
    channel: Option<ChannelId>,
    author: Option<UserId>,
    subscribed_by: Option<UserId>,
    public_only: bool,
    since: Option<TimeBound>,
    until: Option<TimeBound>,
    order: Order,
    offset: usize,
    limit: Option<usize>,
}

impl MessageQuery {
    /// Creates an unconstrained query (all live messages, newest first).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Restricts results to one channel.
    #[must_use]
    pub const fn in_channel(mut self, channel: ChannelId) -> Self {
        self.channel = Some(channel);
        self
    }

    /// Restricts results to one author.
    #[must_use]
    pub const fn by_author(mut self, author: UserId) -> Self {
        self.author = Some(author);
        self
    }

    /// Restricts results to channels the given user is forced-subscribed
    /// to or has explicitly subscribed to.
    #[must_use]
    pub const fn subscribed_by(mut self, user: UserId) -> Self {
        self.subscribed_by = Some(user);
        self
    }

    /// Restricts results to live public channels.
    #[must_use]
    pub const fn public_only(mut self) -> Self {
        self.public_only = true;
        self
    }

    /// Sets the lower time bound.
    #[must_use]
    pub const fn since(mut self, bound: TimeBound) -> Self {
        self.since = Some(bound);
        self
    }

    /// Sets the upper time bound.
    #[must_use]
    pub const fn until(mut self, bound: TimeBound) -> Self {
        self.until = Some(bound);
        self
    }

    /// Orders results oldest first.
    #[must_use]
    pub const fn ascending(mut self) -> Self {
        self.order = Order::Ascending;
        self
    }

    /// Orders results newest first.
    #[must_use]
    pub const fn descending(mut self) -> Self {
        self.order = Order::Descending;
        self
    }

    /// Skips the first `offset` matching rows.
    #[must_use]
    pub const fn with_offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    /// Caps the page size. Queries without a limit return all matches.
    #[must_use]
    pub const fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Returns the channel scope.
    #[must_use]
    pub const fn channel(&self) -> Option<ChannelId> {
        self.channel
    }

    /// Returns the author scope.
    #[must_use]
    pub const fn author(&self) -> Option<UserId> {
        self.author
    }

    /// Returns the subscription scope.
    #[must_use]
    pub const fn subscription_user(&self) -> Option<UserId> {
        self.subscribed_by
    }

    /// Returns `true` if results are restricted to live public channels.
    #[must_use]
    pub const fn is_public_only(&self) -> bool {
        self.public_only
    }

    /// Returns the lower time bound.
    #[must_use]
    pub const fn since_bound(&self) -> Option<TimeBound> {
        self.since
    }

    /// Returns the upper time bound.
    #[must_use]
    pub const fn until_bound(&self) -> Option<TimeBound> {
        self.until
    }

    /// Returns the result ordering.
    #[must_use]
    pub const fn order(&self) -> Order {
        self.order
    }

    /// Returns the row offset.
    #[must_use]
    pub const fn offset(&self) -> usize {
        self.offset
    }

    /// Returns the page size cap.
    #[must_use]
    pub const fn limit(&self) -> Option<usize> {
        self.limit
    }

    /// Returns `true` if any scope argument is the nil identifier.
    ///
    /// Nil-scoped queries match nothing by definition; list paths answer
    /// them with an empty page rather than an error.
    #[must_use]
    pub fn has_nil_scope(&self) -> bool {
        self.channel.is_some_and(|id| id.is_nil())
            || self.author.is_some_and(|id| id.is_nil())
            || self.subscribed_by.is_some_and(|id| id.is_nil())
    }

    /// Evaluates the row-local predicates (channel, author, time window)
    /// against a message.
    ///
    /// Subscription and public-only scopes need channel data and are
    /// applied by the adapter.
    #[must_use]
    pub fn matches(&self, message: &Message) -> bool {
        if self.channel.is_some_and(|c| c != message.channel_id()) {
            return false;
        }
        if self.author.is_some_and(|a| a != message.author_id()) {
            return false;
        }
        let created = message.created_at();
        if let Some(since) = self.since {
            let in_range = if since.inclusive {
                created >= since.at
            } else {
                created > since.at
            };
            if !in_range {
                return false;
            }
        }
        if let Some(until) = self.until {
            let in_range = if until.inclusive {
                created <= until.at
            } else {
                created < until.at
            };
            if !in_range {
                return false;
            }
        }
        true
    }
}

/// One page of results with a look-ahead continuation flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    /// The page contents, at most the requested limit.
    pub items: Vec<T>,
    /// `true` if strictly more matching rows existed at call time.
    pub has_more: bool,
}

impl<T> Page<T> {
    /// An empty page with no continuation.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            items: Vec::new(),
            has_more: false,
        }
    }

    /// Builds a page from a `limit + 1` look-ahead fetch, trimming the
    /// extra row if one was returned.
    #[must_use]
    pub fn from_look_ahead(mut items: Vec<T>, limit: Option<usize>) -> Self {
        let has_more = limit.is_some_and(|cap| items.len() > cap);
        if has_more && let Some(cap) = limit {
            items.truncate(cap);
        }
        Self { items, has_more }
    }
}

impl<T> Default for Page<T> {
    fn default() -> Self {
        Self::empty()
    }
}
