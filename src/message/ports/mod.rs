//! Port trait definitions for the message store.
//!
//! Ports define the abstract interfaces that the domain requires from
//! infrastructure. Adapters implement these ports to connect the store
//! to databases and event transports.

pub mod notifier;
pub mod repository;

pub use notifier::ChangeNotifier;
pub use repository::{DeleteOutcome, MessageRepository, UnreadOutcome, UpdateOutcome};
