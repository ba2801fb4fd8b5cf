//! Outgoing turn events in the AI SDK UI message stream format.
//!
//! Every event serializes to a JSON object tagged by a kebab-case `type`.
//! The gateway writes each one as an SSE `data:` line.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::message::MessageMetadata;

/// Why a turn ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FinishReason {
    /// The model answered without requesting more tools.
    Stop,
    /// The step cap was reached. Not an error.
    StepCap,
    /// A tool needs human confirmation before the turn can continue.
    ToolCalls,
    /// The caller aborted the turn.
    Cancelled,
    /// Model or transport failure.
    Error,
}

impl FinishReason {
    pub fn as_str(self) -> &'static str {
        match self {
            FinishReason::Stop => "stop",
            FinishReason::StepCap => "step-cap",
            FinishReason::ToolCalls => "tool-calls",
            FinishReason::Cancelled => "cancelled",
            FinishReason::Error => "error",
        }
    }
}

impl std::fmt::Display for FinishReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One event on the outgoing response stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum UiStreamEvent {
    /// Opens the turn. Carries the id of the assistant message being built.
    Start {
        #[serde(rename = "messageId")]
        message_id: String,
    },

    StartStep,

    FinishStep,

    TextStart {
        id: String,
    },

    TextDelta {
        id: String,
        delta: String,
    },

    TextEnd {
        id: String,
    },

    ToolInputStart {
        #[serde(rename = "toolCallId")]
        tool_call_id: String,
        #[serde(rename = "toolName")]
        tool_name: String,
    },

    ToolInputDelta {
        #[serde(rename = "toolCallId")]
        tool_call_id: String,
        #[serde(rename = "inputTextDelta")]
        input_text_delta: String,
    },

    ToolInputAvailable {
        #[serde(rename = "toolCallId")]
        tool_call_id: String,
        #[serde(rename = "toolName")]
        tool_name: String,
        input: Value,
    },

    ToolOutputAvailable {
        #[serde(rename = "toolCallId")]
        tool_call_id: String,
        output: Value,
    },

    ToolOutputError {
        #[serde(rename = "toolCallId")]
        tool_call_id: String,
        #[serde(rename = "errorText")]
        error_text: String,
    },

    /// A visible failure indicator. Always followed by `finish`.
    Error {
        #[serde(rename = "errorText")]
        error_text: String,
    },

    /// Closes the turn.
    Finish {
        #[serde(rename = "finishReason")]
        finish_reason: FinishReason,
        #[serde(rename = "messageMetadata")]
        message_metadata: MessageMetadata,
    },
}

impl UiStreamEvent {
    pub fn text_delta(id: impl Into<String>, delta: impl Into<String>) -> Self {
        Self::TextDelta {
            id: id.into(),
            delta: delta.into(),
        }
    }

    pub fn tool_output(tool_call_id: impl Into<String>, output: Value) -> Self {
        Self::ToolOutputAvailable {
            tool_call_id: tool_call_id.into(),
            output,
        }
    }

    pub fn tool_error(tool_call_id: impl Into<String>, error_text: impl Into<String>) -> Self {
        Self::ToolOutputError {
            tool_call_id: tool_call_id.into(),
            error_text: error_text.into(),
        }
    }

    pub fn error(error_text: impl Into<String>) -> Self {
        Self::Error {
            error_text: error_text.into(),
        }
    }

    /// A `finish` event stamped with the current time.
    pub fn finish(finish_reason: FinishReason) -> Self {
        Self::Finish {
            finish_reason,
            message_metadata: MessageMetadata::now(),
        }
    }

    pub fn is_finish(&self) -> bool {
        matches!(self, Self::Finish { .. })
    }

    /// The tool call this event belongs to, if any.
    pub fn tool_call_id(&self) -> Option<&str> {
        match self {
            Self::ToolInputStart { tool_call_id, .. }
            | Self::ToolInputDelta { tool_call_id, .. }
            | Self::ToolInputAvailable { tool_call_id, .. }
            | Self::ToolOutputAvailable { tool_call_id, .. }
            | Self::ToolOutputError { tool_call_id, .. } => Some(tool_call_id),
            _ => None,
        }
    }
}
