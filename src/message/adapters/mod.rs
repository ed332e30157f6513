//! Persistence and notification adapters for the message store.
//!
//! This module provides concrete implementations of the store's ports,
//! following hexagonal architecture principles. Adapters handle all
//! infrastructure concerns while the domain remains pure.
//!
//! # Available adapters
//!
//! - [`memory::InMemoryMessageRepository`]: thread-safe in-memory storage
//!   for testing
//! - [`postgres::PostgresMessageRepository`]: production `PostgreSQL`
//!   persistence using Diesel ORM
//! - [`bus::EventBus`]: single-process broadcast implementation of the
//!   change notifier

pub mod bus;
pub mod memory;
pub mod postgres;
