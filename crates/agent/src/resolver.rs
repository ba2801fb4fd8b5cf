//! Tool resolver.
//!
//! Walks a (sanitized) conversation and drives every actionable
//! `input-available` tool part to a terminal state. Parts within one message
//! run concurrently; results are written back in document order no matter
//! which finishes first. Each outcome is also pushed to the turn's response
//! stream as it happens.

use std::sync::Arc;

use futures::future::join_all;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use toolweave_core::error::{ToolError, ToolStateError};
use toolweave_core::message::{
    Approval, Message, Part, REJECTION_SENTINEL, ToolFailure, ToolPart, ToolState,
};
use toolweave_core::stream::UiStreamEvent;
use toolweave_core::tool::{Tool, ToolRegistry};
use tracing::{debug, warn};

/// Sending half of a turn's outgoing event stream.
pub type EventSink = mpsc::Sender<UiStreamEvent>;

/// Result of a resolver pass.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub messages: Vec<Message>,
    /// Indices of messages that had at least one part resolved.
    pub changed: Vec<usize>,
}

impl Resolution {
    pub fn changed_messages(&self) -> impl Iterator<Item = &Message> {
        self.changed.iter().map(|&i| &self.messages[i])
    }
}

/// Resolve every actionable tool part in `messages`.
///
/// Parts that are terminal, still streaming, or waiting on a human decision
/// are left alone. Once `cancel` fires, unfinished parts stay as they were.
pub async fn resolve(
    mut messages: Vec<Message>,
    tools: &ToolRegistry,
    sink: &EventSink,
    cancel: &CancellationToken,
) -> Resolution {
    let mut changed = Vec::new();

    for (index, message) in messages.iter_mut().enumerate() {
        if cancel.is_cancelled() {
            break;
        }
        if resolve_message(message, tools, sink, cancel).await > 0 {
            changed.push(index);
        }
    }

    Resolution { messages, changed }
}

/// Resolve the actionable tool parts of a single message concurrently.
/// Returns how many parts reached a terminal state.
pub async fn resolve_message(
    message: &mut Message,
    tools: &ToolRegistry,
    sink: &EventSink,
    cancel: &CancellationToken,
) -> usize {
    let pending: Vec<(usize, ToolPart)> = message
        .parts
        .iter()
        .enumerate()
        .filter_map(|(i, part)| match part {
            Part::Tool(tool) if tool.state == ToolState::InputAvailable => Some((i, tool.clone())),
            _ => None,
        })
        .collect();
    if pending.is_empty() {
        return 0;
    }

    let outcomes = join_all(
        pending
            .into_iter()
            .map(|(i, part)| async move { (i, resolve_part(part, tools, sink, cancel).await) }),
    )
    .await;

    let mut resolved = 0;
    for (i, outcome) in outcomes {
        if let Some(part) = outcome {
            message.parts[i] = Part::Tool(part);
            resolved += 1;
        }
    }
    resolved
}

/// Advance one `input-available` part. Returns the terminal part, or `None`
/// when the part must stay as it is (awaiting confirmation, or cancelled).
pub async fn resolve_part(
    mut part: ToolPart,
    tools: &ToolRegistry,
    sink: &EventSink,
    cancel: &CancellationToken,
) -> Option<ToolPart> {
    if part.state != ToolState::InputAvailable || cancel.is_cancelled() {
        return None;
    }

    let tool = match tools.require(&part.tool_name) {
        Ok(tool) => tool,
        Err(e) => {
            warn!(tool = %part.tool_name, tool_call_id = %part.tool_call_id, "Model called an unknown tool");
            return record_failure(part, ToolFailure::from(&e), sink).await;
        }
    };

    if tool.requires_confirmation() {
        match part.approval {
            None => {
                debug!(tool_call_id = %part.tool_call_id, "Tool call awaiting confirmation");
                return None;
            }
            Some(Approval::Rejected) => {
                debug!(tool_call_id = %part.tool_call_id, "Tool call rejected by user");
                let output = Value::String(REJECTION_SENTINEL.to_string());
                return record_output(part, output, sink).await;
            }
            Some(Approval::Approved) => {}
        }
    }

    debug!(tool = %part.tool_name, tool_call_id = %part.tool_call_id, "Executing tool");
    let result = execute(tool, part.input.clone(), cancel).await?;
    if cancel.is_cancelled() {
        debug!(tool_call_id = %part.tool_call_id, "Discarding tool result of cancelled turn");
        return None;
    }

    match result {
        Ok(output) => record_output(part, output, sink).await,
        Err(e) => {
            warn!(tool = %part.tool_name, error = %e, "Tool execution failed");
            let failure = ToolFailure::from(&e);
            part.fail(failure).ok()?;
            emit_failure(&part, sink).await;
            Some(part)
        }
    }
}

/// Run the tool on its own task so an in-flight call can finish after the
/// turn is cancelled; its result is then dropped.
async fn execute(
    tool: Arc<dyn Tool>,
    input: Value,
    cancel: &CancellationToken,
) -> Option<Result<Value, ToolError>> {
    let name = tool.name().to_string();
    let handle = tokio::spawn(async move { tool.execute(input).await });
    tokio::select! {
        biased;
        _ = cancel.cancelled() => None,
        joined = handle => Some(joined.unwrap_or_else(|e| {
            Err(ToolError::ExecutionFailed {
                tool_name: name,
                reason: format!("tool task aborted: {e}"),
            })
        })),
    }
}

async fn record_output(mut part: ToolPart, output: Value, sink: &EventSink) -> Option<ToolPart> {
    part.complete(output.clone()).ok()?;
    let _ = sink
        .send(UiStreamEvent::tool_output(part.tool_call_id.clone(), output))
        .await;
    Some(part)
}

async fn record_failure(mut part: ToolPart, failure: ToolFailure, sink: &EventSink) -> Option<ToolPart> {
    part.fail(failure).ok()?;
    emit_failure(&part, sink).await;
    Some(part)
}

async fn emit_failure(part: &ToolPart, sink: &EventSink) {
    let text = part
        .error
        .as_ref()
        .map(|e| e.message.clone())
        .unwrap_or_default();
    let _ = sink
        .send(UiStreamEvent::tool_error(part.tool_call_id.clone(), text))
        .await;
}

/// Attach a human decision to the tool part with `tool_call_id`.
///
/// Returns the index of the message that holds the part.
pub fn attach_decision(
    messages: &mut [Message],
    tool_call_id: &str,
    approval: Approval,
) -> Result<usize, ToolStateError> {
    for (index, message) in messages.iter_mut().enumerate() {
        if let Some(part) = message.tool_part_mut(tool_call_id) {
            part.attach_approval(approval)?;
            return Ok(index);
        }
    }
    Err(ToolStateError::NotFound(tool_call_id.to_string()))
}

/// Copy resolved tool parts from `resolved` onto `original`, leaving every
/// other part of `original` as it was.
pub fn merge_resolved(original: &mut Message, resolved: &Message) {
    for part in resolved.tool_parts().filter(|p| p.is_terminal()) {
        if let Some(target) = original.tool_part_mut(&part.tool_call_id) {
            if !target.is_terminal() {
                *target = part.clone();
            }
        }
    }
}
