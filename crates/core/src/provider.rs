//! Provider trait — the abstraction over LLM backends.
//!
//! A Provider knows how to send one model step to an LLM and hand back a
//! stream of [`ModelEvent`]s. The multi-step tool loop lives in the agent
//! crate; a provider never executes tools.
//!
//! Implementations: OpenAI-compatible endpoints (Workers AI, OpenAI,
//! OpenRouter, Ollama).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use crate::error::ProviderError;

/// Role of a message in model-facing history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelRole {
    System,
    User,
    Assistant,
    /// Tool execution result
    Tool,
}

/// A tool call embedded in an assistant model message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelToolCall {
    /// Unique ID for this tool call
    pub id: String,

    /// Name of the tool to invoke
    pub name: String,

    /// Arguments as JSON string
    pub arguments: String,
}

/// A flat message as the model sees it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMessage {
    pub role: ModelRole,

    pub content: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ModelToolCall>,

    /// If this is a tool result, which tool call it responds to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl ModelMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self::plain(ModelRole::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::plain(ModelRole::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::plain(ModelRole::Assistant, content)
    }

    pub fn tool_result(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: ModelRole::Tool,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: Some(tool_call_id.into()),
        }
    }

    fn plain(role: ModelRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }
}

/// Whether the model may call tools this step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolChoice {
    #[default]
    Auto,
    None,
}

/// Configuration for a provider request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderRequest {
    /// The model to use (e.g., "@cf/meta/llama-3.3-70b-instruct-fp8-fast")
    pub model: String,

    /// The conversation messages, system prompt first
    pub messages: Vec<ModelMessage>,

    /// Temperature (0.0 = deterministic, 1.0 = creative)
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum tokens to generate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// Available tools the model can call
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ToolDefinition>,

    #[serde(default)]
    pub tool_choice: ToolChoice,
}

fn default_temperature() -> f32 {
    0.7
}

/// A tool definition sent to the LLM so it knows what tools it can call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// The tool name
    pub name: String,

    /// Description of what the tool does
    pub description: String,

    /// JSON Schema describing the tool's parameters
    pub parameters: serde_json::Value,
}

/// Token usage information.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

impl Usage {
    pub fn add(&mut self, other: &Usage) {
        self.prompt_tokens += other.prompt_tokens;
        self.completion_tokens += other.completion_tokens;
        self.total_tokens += other.total_tokens;
    }
}

/// One event of a streaming model step.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelEvent {
    /// Partial assistant text.
    TextDelta(String),

    /// A fragment of a tool call's JSON arguments. The first delta for an id
    /// carries the tool name.
    ToolCallDelta {
        tool_call_id: String,
        tool_name: String,
        input_delta: String,
    },

    /// A tool call with complete arguments.
    ToolCall {
        tool_call_id: String,
        tool_name: String,
        input: serde_json::Value,
    },

    /// End of this step.
    Finish { usage: Option<Usage> },
}

/// Receiving half of a model step stream.
pub type ModelStream = mpsc::Receiver<Result<ModelEvent, ProviderError>>;

/// The core Provider trait.
///
/// The agent calls `stream()` once per step without knowing which backend
/// is behind it.
#[async_trait]
pub trait Provider: Send + Sync {
    /// A human-readable name for this provider (e.g., "workers-ai").
    fn name(&self) -> &str;

    /// Send a request and get a stream of model events for one step.
    async fn stream(&self, request: ProviderRequest) -> Result<ModelStream, ProviderError>;

    /// Health check — can we reach the provider?
    async fn health_check(&self) -> Result<bool, ProviderError> {
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_choice_defaults_to_auto() {
        let json = r#"{"model":"m","messages":[]}"#;
        let req: ProviderRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.tool_choice, ToolChoice::Auto);
        assert!((req.temperature - 0.7).abs() < f32::EPSILON);
    }

    #[test]
    fn usage_accumulates() {
        let mut total = Usage::default();
        total.add(&Usage { prompt_tokens: 10, completion_tokens: 5, total_tokens: 15 });
        total.add(&Usage { prompt_tokens: 1, completion_tokens: 2, total_tokens: 3 });
        assert_eq!(total.total_tokens, 18);
        assert_eq!(total.prompt_tokens, 11);
    }

    #[test]
    fn tool_result_message_links_call() {
        let msg = ModelMessage::tool_result("call_1", "42");
        assert_eq!(msg.role, ModelRole::Tool);
        assert_eq!(msg.tool_call_id.as_deref(), Some("call_1"));
    }
}
