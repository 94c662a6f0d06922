//! In-memory implementation of the search index provider.
//!
//! Evaluates query plans against JSON documents held in process memory.
//! Used by tests and by the `memory` index backend for local development.

mod matcher;
mod provider;

pub use provider::InMemoryProvider;
