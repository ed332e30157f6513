//! Domain types for the message store.
//!
//! This module contains pure domain types with no infrastructure
//! dependencies. All types are serialisable via serde; entities are
//! reconstructed from storage through their `from_persisted` constructors.

mod channel;
mod content;
mod event;
mod ids;
mod latest;
mod message;
mod query;
mod stamp;
mod unread;

pub use channel::ChannelSnapshot;
pub use content::ParsedContent;
pub use event::StoreEvent;
pub use ids::{ArchiveId, ChannelId, ClipFolderId, MessageId, StampId, UserId};
pub use latest::ChannelLatestMessage;
pub use message::{ArchivedMessage, Message, PersistedMessageData};
pub use query::{MessageQuery, Order, Page, TimeBound};
pub use stamp::MessageStamp;
pub use unread::{ChannelUnreadSummary, UnreadMarker};
