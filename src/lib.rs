//! Palaver: persistence and consistency core for a multi-channel chat
//! service.
//!
//! The crate owns the transactional message store together with the
//! denormalised structures that must stay consistent with it: the
//! latest-message-per-channel pointer, the per-user unread index, and the
//! per-message reaction counters. Every mutation keeps the primary record
//! and its derived indexes consistent inside a single atomic unit, and
//! announces the committed change to downstream consumers exactly once,
//! strictly after the owning transaction commits.
//!
//! # Architecture
//!
//! Palaver follows hexagonal architecture principles:
//!
//! - **Domain**: Pure business types with no infrastructure dependencies
//! - **Ports**: Abstract trait interfaces for persistence and notification
//! - **Adapters**: Concrete implementations (`PostgreSQL`, in-memory,
//!   broadcast bus)
//! - **Services**: Orchestration of transactional writes and post-commit
//!   event publication
//!
//! # Modules
//!
//! - [`message`]: the message store bounded context — entities, query
//!   surface, derived indexes, and change notification

pub mod message;
