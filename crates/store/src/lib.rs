//! Message store backends for Toolweave.
//!
//! All backends implement `toolweave_core::MessageStore`. Durable storage is
//! left to the hosting runtime; this crate ships the in-memory backend.

pub mod in_memory;

pub use in_memory::InMemoryStore;
