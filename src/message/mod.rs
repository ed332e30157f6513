//! The message store bounded context.
//!
//! Owns the message entity lifecycle (create, edit-with-archival,
//! soft-delete with cascades) and the derived structures bound to it by
//! transactional invariants: the per-channel latest-message pointer, the
//! per-user unread index, and the per-message reaction counters. Committed
//! mutations are announced through the change notifier port, exactly once,
//! only after the owning transaction commits.
//!
//! # Architecture
//!
//! The module follows hexagonal architecture principles:
//!
//! - **Domain**: Pure domain types ([`domain::Message`],
//!   [`domain::UnreadMarker`], [`domain::MessageStamp`], etc.)
//! - **Ports**: Abstract trait interfaces
//!   ([`ports::MessageRepository`], [`ports::ChangeNotifier`])
//! - **Adapters**: Concrete implementations
//!   ([`adapters::memory::InMemoryMessageRepository`],
//!   [`adapters::postgres::PostgresMessageRepository`],
//!   [`adapters::bus::EventBus`])
//! - **Services**: [`services::MessageService`] validates input at the
//!   boundary, drives one transaction per mutation, and publishes events
//!   after commit
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use mockable::DefaultClock;
//! use palaver::message::adapters::bus::EventBus;
//! use palaver::message::adapters::memory::InMemoryMessageRepository;
//! use palaver::message::domain::{ChannelId, UserId};
//! use palaver::message::services::MessageService;
//!
//! # tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(async {
//! let repository = InMemoryMessageRepository::new();
//! let channel = ChannelId::new();
//! repository.seed_public_channel(channel);
//!
//! let service = MessageService::new(
//!     Arc::new(repository),
//!     Arc::new(EventBus::new(16)),
//!     Arc::new(DefaultClock),
//! );
//!
//! let message = service
//!     .create(UserId::new(), channel, "hello, palaver")
//!     .await
//!     .expect("message creation should succeed");
//! assert_eq!(message.text(), "hello, palaver");
//! # });
//! ```

pub mod adapters;
pub mod domain;
pub mod error;
pub mod ports;
pub mod services;

#[cfg(test)]
mod tests;
