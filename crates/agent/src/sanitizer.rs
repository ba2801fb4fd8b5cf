//! History sanitizer.
//!
//! Produces the model-facing copy of a conversation. Tool parts the model
//! cannot make sense of (half-streamed arguments, calls still waiting on a
//! human) are dropped from the copy; the persisted record is never touched.

use toolweave_core::message::{Message, Part, ToolState};
use toolweave_core::tool::ToolRegistry;
use tracing::debug;

/// Return a sanitized copy of `messages`.
///
/// A tool part survives when it is terminal, or when it is `input-available`
/// and either runs without confirmation, already carries a decision, or names
/// a tool the registry does not know (the resolver turns those into errors).
/// Messages left without any part are omitted.
pub fn sanitize(messages: &[Message], tools: &ToolRegistry) -> Vec<Message> {
    messages
        .iter()
        .filter_map(|message| {
            let parts: Vec<Part> = message
                .parts
                .iter()
                .filter(|part| keep_part(part, tools))
                .cloned()
                .collect();
            if parts.is_empty() {
                debug!(message_id = %message.id, "Dropping empty message from model history");
                return None;
            }
            Some(Message {
                parts,
                ..message.clone()
            })
        })
        .collect()
}

fn keep_part(part: &Part, tools: &ToolRegistry) -> bool {
    let Part::Tool(tool) = part else {
        return true;
    };
    let keep = match tool.state {
        ToolState::OutputAvailable | ToolState::OutputError => true,
        ToolState::InputStreaming => false,
        ToolState::InputAvailable => match tools.get(&tool.tool_name) {
            Some(t) => !t.requires_confirmation() || tool.approval.is_some(),
            None => true,
        },
    };
    if !keep {
        debug!(
            tool_call_id = %tool.tool_call_id,
            tool = %tool.tool_name,
            state = ?tool.state,
            "Dropping unresolved tool part from model history"
        );
    }
    keep
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{EchoTool, GatedTool, registry};
    use serde_json::json;
    use toolweave_core::message::{Approval, ToolPart};

    fn assistant(parts: Vec<Part>) -> Message {
        Message::assistant_with_parts(parts)
    }

    #[test]
    fn keeps_text_and_terminal_parts() {
        let mut done = ToolPart::available("c1", "echo", json!({}));
        done.complete(json!("ok")).unwrap();
        let history = vec![
            Message::user("hi"),
            assistant(vec![Part::text("checking"), Part::Tool(done)]),
        ];

        let out = sanitize(&history, &registry(vec![EchoTool::arc()]));
        assert_eq!(out, history);
    }

    #[test]
    fn drops_streaming_parts_and_empty_messages() {
        let history = vec![
            Message::user("hi"),
            assistant(vec![Part::Tool(ToolPart::streaming("c1", "echo"))]),
        ];

        let out = sanitize(&history, &registry(vec![EchoTool::arc()]));
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].id, history[0].id);
    }

    #[test]
    fn undecided_confirmation_is_dropped_but_persisted_copy_is_untouched() {
        let pending = ToolPart::available("c1", "gated", json!({}));
        let history = vec![
            Message::user("delete it"),
            assistant(vec![Part::text("Need approval"), Part::Tool(pending)]),
        ];
        let before = history.clone();

        let out = sanitize(&history, &registry(vec![GatedTool::arc()]));

        assert_eq!(out[1].parts, vec![Part::text("Need approval")]);
        assert_eq!(history, before);
        assert_eq!(history[1].tool_parts().count(), 1);
    }

    #[test]
    fn decided_confirmation_is_kept() {
        let mut approved = ToolPart::available("c1", "gated", json!({}));
        approved.attach_approval(Approval::Approved).unwrap();
        let history = vec![assistant(vec![Part::Tool(approved)])];

        let out = sanitize(&history, &registry(vec![GatedTool::arc()]));
        assert_eq!(out[0].tool_parts().count(), 1);
    }

    #[test]
    fn automatic_and_unknown_tools_are_kept_for_resolution() {
        let history = vec![assistant(vec![
            Part::Tool(ToolPart::available("c1", "echo", json!({}))),
            Part::Tool(ToolPart::available("c2", "doesNotExist", json!({}))),
        ])];

        let out = sanitize(&history, &registry(vec![EchoTool::arc()]));
        assert_eq!(out[0].tool_parts().count(), 2);
    }
}
