//! Application services for the message bounded context.

pub mod store;

pub use store::MessageService;
