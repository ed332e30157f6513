//! Unit tests for the message store.
//!
//! Tests are organised by layer: pure domain types, the in-memory
//! repository adapter via its port, and service orchestration including
//! the post-commit event contract.

mod domain_tests;
mod service_tests;
