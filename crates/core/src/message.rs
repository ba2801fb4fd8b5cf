//! Message and tool part domain types.
//!
//! A conversation is an ordered list of [`Message`]s, each made of [`Part`]s.
//! Tool parts carry an explicit state machine:
//!
//! ```text
//! input-streaming ──► input-available ──► output-available
//!                           │
//!                           └──────────► output-error
//! ```
//!
//! The two `output-*` states are terminal. Every transition goes through a
//! method on [`ToolPart`] that refuses to touch a terminal part.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ToolStateError;

/// Decision text a client submits to approve a confirmation-gated tool call.
pub const APPROVAL_YES: &str = "Yes, confirmed.";

/// Decision text a client submits to reject a confirmation-gated tool call.
pub const APPROVAL_NO: &str = "No, denied.";

/// Output recorded on a tool part whose execution the user rejected.
pub const REJECTION_SENTINEL: &str = "Error: User denied access to tool execution";

/// Unique identifier for a conversation (session).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConversationId(pub String);

impl ConversationId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl Default for ConversationId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConversationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The role of a message sender in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The end user
    User,
    /// The AI assistant
    Assistant,
    /// System instructions
    System,
}

/// Per-message metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageMetadata {
    pub created_at: DateTime<Utc>,
}

impl MessageMetadata {
    pub fn now() -> Self {
        Self {
            created_at: Utc::now(),
        }
    }
}

/// A single message in a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Unique message ID
    pub id: String,

    /// Who sent this message
    pub role: Role,

    /// Ordered content parts
    #[serde(default)]
    pub parts: Vec<Part>,

    pub metadata: MessageMetadata,
}

impl Message {
    fn with_parts(role: Role, parts: Vec<Part>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role,
            parts,
            metadata: MessageMetadata::now(),
        }
    }

    /// Create a new user message with a single text part.
    pub fn user(text: impl Into<String>) -> Self {
        Self::with_parts(Role::User, vec![Part::text(text)])
    }

    /// Create a new system message.
    pub fn system(text: impl Into<String>) -> Self {
        Self::with_parts(Role::System, vec![Part::text(text)])
    }

    /// Create an empty assistant message; the driver fills in parts as they stream.
    pub fn assistant() -> Self {
        Self::with_parts(Role::Assistant, Vec::new())
    }

    /// Create an assistant message from existing parts.
    pub fn assistant_with_parts(parts: Vec<Part>) -> Self {
        Self::with_parts(Role::Assistant, parts)
    }

    /// The first text part, if any.
    pub fn first_text(&self) -> Option<&str> {
        self.parts.iter().find_map(|p| match p {
            Part::Text(t) => Some(t.text.as_str()),
            Part::Tool(_) => None,
        })
    }

    /// All text parts concatenated.
    pub fn text(&self) -> String {
        self.parts
            .iter()
            .filter_map(|p| match p {
                Part::Text(t) => Some(t.text.as_str()),
                Part::Tool(_) => None,
            })
            .collect()
    }

    pub fn tool_parts(&self) -> impl Iterator<Item = &ToolPart> {
        self.parts.iter().filter_map(|p| match p {
            Part::Tool(t) => Some(t),
            Part::Text(_) => None,
        })
    }

    pub fn tool_part_mut(&mut self, tool_call_id: &str) -> Option<&mut ToolPart> {
        self.parts.iter_mut().find_map(|p| match p {
            Part::Tool(t) if t.tool_call_id == tool_call_id => Some(t),
            _ => None,
        })
    }
}

/// One piece of message content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Part {
    Text(TextPart),
    Tool(ToolPart),
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Part::Text(TextPart { text: text.into() })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextPart {
    pub text: String,
}

/// Lifecycle state of a tool call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ToolState {
    /// Arguments are still arriving from the model.
    InputStreaming,
    /// Arguments are complete; executing, awaiting confirmation, or about to execute.
    InputAvailable,
    /// Terminal success.
    OutputAvailable,
    /// Terminal failure.
    OutputError,
}

impl ToolState {
    pub fn is_terminal(self) -> bool {
        matches!(self, ToolState::OutputAvailable | ToolState::OutputError)
    }
}

/// A human decision on a confirmation-gated tool call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Approval {
    Approved,
    Rejected,
}

impl Approval {
    /// Parse the decision text a client submits.
    pub fn from_decision(text: &str) -> Option<Self> {
        match text {
            APPROVAL_YES => Some(Approval::Approved),
            APPROVAL_NO => Some(Approval::Rejected),
            _ => None,
        }
    }
}

impl From<bool> for Approval {
    fn from(approved: bool) -> Self {
        if approved {
            Approval::Approved
        } else {
            Approval::Rejected
        }
    }
}

/// Category of a tool failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    UnknownTool,
    InvalidInput,
    ExecutionFailed,
    Timeout,
}

/// Structured payload of the `output-error` state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl ToolFailure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl From<&crate::error::ToolError> for ToolFailure {
    fn from(err: &crate::error::ToolError) -> Self {
        use crate::error::ToolError;
        let kind = match err {
            ToolError::NotFound(_) => FailureKind::UnknownTool,
            ToolError::InvalidArguments(_) => FailureKind::InvalidInput,
            ToolError::Timeout { .. } => FailureKind::Timeout,
            ToolError::ExecutionFailed { .. } => FailureKind::ExecutionFailed,
        };
        Self::new(kind, err.to_string())
    }
}

/// A tool invocation embedded in an assistant message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolPart {
    pub tool_name: String,
    pub tool_call_id: String,
    pub state: ToolState,
    #[serde(default)]
    pub input: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ToolFailure>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approval: Option<Approval>,
}

impl ToolPart {
    /// A call whose arguments are still streaming in.
    pub fn streaming(tool_call_id: impl Into<String>, tool_name: impl Into<String>) -> Self {
        Self {
            tool_name: tool_name.into(),
            tool_call_id: tool_call_id.into(),
            state: ToolState::InputStreaming,
            input: serde_json::Value::Null,
            output: None,
            error: None,
            approval: None,
        }
    }

    /// A call with complete arguments.
    pub fn available(
        tool_call_id: impl Into<String>,
        tool_name: impl Into<String>,
        input: serde_json::Value,
    ) -> Self {
        Self {
            state: ToolState::InputAvailable,
            input,
            ..Self::streaming(tool_call_id, tool_name)
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    /// Text shown to the model for a terminal part.
    pub fn result_text(&self) -> Option<String> {
        match self.state {
            ToolState::OutputAvailable => self.output.as_ref().map(|o| match o {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            }),
            ToolState::OutputError => self.error.as_ref().map(|e| format!("Error: {}", e.message)),
            _ => None,
        }
    }

    fn guard_terminal(&self) -> Result<(), ToolStateError> {
        if self.is_terminal() {
            return Err(ToolStateError::AlreadyTerminal(self.tool_call_id.clone()));
        }
        Ok(())
    }

    /// `input-streaming` → `input-available`.
    pub fn finish_input(&mut self, input: serde_json::Value) -> Result<(), ToolStateError> {
        self.guard_terminal()?;
        self.input = input;
        self.state = ToolState::InputAvailable;
        Ok(())
    }

    /// `input-available` → `output-available`.
    pub fn complete(&mut self, output: serde_json::Value) -> Result<(), ToolStateError> {
        self.guard_terminal()?;
        if self.state != ToolState::InputAvailable {
            return Err(ToolStateError::InputIncomplete(self.tool_call_id.clone()));
        }
        self.output = Some(output);
        self.state = ToolState::OutputAvailable;
        Ok(())
    }

    /// Any non-terminal state → `output-error`.
    pub fn fail(&mut self, failure: ToolFailure) -> Result<(), ToolStateError> {
        self.guard_terminal()?;
        self.error = Some(failure);
        self.state = ToolState::OutputError;
        Ok(())
    }

    /// Record a human decision; the resolver acts on it on its next pass.
    pub fn attach_approval(&mut self, approval: Approval) -> Result<(), ToolStateError> {
        self.guard_terminal()?;
        if self.state != ToolState::InputAvailable {
            return Err(ToolStateError::InputIncomplete(self.tool_call_id.clone()));
        }
        self.approval = Some(approval);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn create_user_message() {
        let msg = Message::user("Hello, agent!");
        assert_eq!(msg.role, Role::User);
        assert_eq!(msg.first_text(), Some("Hello, agent!"));
        assert_eq!(msg.tool_parts().count(), 0);
    }

    #[test]
    fn tool_part_happy_path() {
        let mut part = ToolPart::streaming("call_1", "getWeatherInformation");
        part.finish_input(json!({"city": "Tokyo"})).unwrap();
        assert_eq!(part.state, ToolState::InputAvailable);

        part.complete(json!("Sunny")).unwrap();
        assert!(part.is_terminal());
        assert_eq!(part.result_text().as_deref(), Some("Sunny"));
    }

    #[test]
    fn terminal_parts_reject_every_transition() {
        let mut part = ToolPart::available("call_1", "getLocalTime", json!({}));
        part.complete(json!("noon")).unwrap();
        let snapshot = part.clone();

        assert!(part.complete(json!("midnight")).is_err());
        assert!(part.fail(ToolFailure::new(FailureKind::ExecutionFailed, "x")).is_err());
        assert!(part.finish_input(json!({"location": "Paris"})).is_err());
        assert!(part.attach_approval(Approval::Approved).is_err());
        assert_eq!(part, snapshot);
    }

    #[test]
    fn cannot_complete_while_streaming() {
        let mut part = ToolPart::streaming("call_2", "generateChart");
        let err = part.complete(json!("chart")).unwrap_err();
        assert_eq!(err, ToolStateError::InputIncomplete("call_2".into()));
    }

    #[test]
    fn failed_part_reports_error_text() {
        let mut part = ToolPart::available("call_3", "getStockData", json!({"symbol": "X"}));
        part.fail(ToolFailure::new(FailureKind::ExecutionFailed, "upstream 500"))
            .unwrap();
        assert_eq!(part.result_text().as_deref(), Some("Error: upstream 500"));
    }

    #[test]
    fn approval_decision_text() {
        assert_eq!(Approval::from_decision(APPROVAL_YES), Some(Approval::Approved));
        assert_eq!(Approval::from_decision(APPROVAL_NO), Some(Approval::Rejected));
        assert_eq!(Approval::from_decision("maybe"), None);
    }

    #[test]
    fn wire_format_uses_camel_case_and_kebab_states() {
        let mut msg = Message::assistant();
        msg.parts.push(Part::Tool(ToolPart::available(
            "call_9",
            "getCountryInfo",
            json!({"country": "Japan"}),
        )));
        let value = serde_json::to_value(&msg).unwrap();
        let part = &value["parts"][0];
        assert_eq!(part["type"], "tool");
        assert_eq!(part["toolCallId"], "call_9");
        assert_eq!(part["state"], "input-available");
        assert!(value["metadata"]["createdAt"].is_string());
    }
}
