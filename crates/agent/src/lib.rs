//! The turn pipeline of Toolweave.
//!
//! A turn flows through five stages:
//!
//! 1. **Sanitize** the persisted history into a model-safe copy
//! 2. **Resolve** tool calls left pending by earlier turns
//! 3. **Gate** whether this turn offers tools to the model at all
//! 4. **Drive** the multi-step model/tool loop, up to a step cap
//! 5. **Merge** resolver and driver events into one outgoing stream
//!
//! [`ChatAgent`] wires the stages to a provider, a tool registry and a
//! message store.

pub mod driver;
pub mod gating;
pub mod merger;
pub mod pipeline;
pub mod prompt;
pub mod resolver;
pub mod sanitizer;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use driver::{DriveOutcome, GenerationDriver};
pub use gating::{GateDecision, ToolGate};
pub use merger::{TurnStream, merge};
pub use pipeline::ChatAgent;
pub use prompt::{DEFAULT_SYSTEM_PROMPT, scheduled_task_message};
pub use resolver::{EventSink, Resolution, attach_decision, resolve};
pub use sanitizer::sanitize;
