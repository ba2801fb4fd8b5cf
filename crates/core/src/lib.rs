//! # Toolweave Core
//!
//! Domain types, traits, and error definitions for Toolweave.
//! This crate has **zero framework dependencies** — it defines the domain model
//! that all other crates implement against.
//!
//! ## Design Philosophy
//!
//! Every external collaborator (model, tool adapter, message store) is a
//! trait here. Implementations live in their respective crates. This enables:
//! - Swapping implementations via configuration
//! - Easy testing with mock/stub implementations
//! - Clean dependency graph (all crates depend inward on core)

pub mod error;
pub mod message;
pub mod provider;
pub mod store;
pub mod stream;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use error::{Error, ProviderError, Result, StoreError, ToolError, ToolStateError};
pub use message::{
    Approval, ConversationId, FailureKind, Message, MessageMetadata, Part, Role, TextPart,
    ToolFailure, ToolPart, ToolState,
};
pub use provider::{
    ModelEvent, ModelMessage, ModelRole, ModelStream, ModelToolCall, Provider, ProviderRequest,
    ToolChoice, ToolDefinition, Usage,
};
pub use store::MessageStore;
pub use stream::{FinishReason, UiStreamEvent};
pub use tool::{Tool, ToolRegistry};
