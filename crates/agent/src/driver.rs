//! Generation driver — the multi-step model/tool loop of one turn.
//!
//! Each step streams one model response. Text and tool-call deltas are
//! forwarded to the turn's event stream and accumulated into a single
//! assistant [`Message`]. When a step ends with tool calls, the tools run
//! through the resolver and the loop goes around again, until the model
//! answers in plain text, a call needs human confirmation, or the step cap is
//! reached.

use std::mem;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use toolweave_core::error::ProviderError;
use toolweave_core::message::{Message, Part, Role, ToolPart, ToolState};
use toolweave_core::provider::{
    ModelEvent, ModelMessage, ModelRole, ModelToolCall, Provider, ProviderRequest, Usage,
};
use toolweave_core::stream::{FinishReason, UiStreamEvent};
use toolweave_core::tool::ToolRegistry;
use tracing::{debug, info, warn};

use crate::gating::GateDecision;
use crate::prompt::DEFAULT_SYSTEM_PROMPT;
use crate::resolver::{EventSink, resolve_message};

/// Default model/tool round-trips per turn.
pub const DEFAULT_MAX_STEPS: u32 = 10;

/// What one drive produced.
#[derive(Debug, Clone)]
pub struct DriveOutcome {
    /// The assistant message, including partial output on failure.
    pub message: Message,
    pub steps: u32,
    pub finish_reason: FinishReason,
    pub usage: Usage,
    pub error: Option<ProviderError>,
}

#[derive(Default)]
struct StepOutput {
    tool_calls: Vec<String>,
    usage: Option<Usage>,
}

enum StepError {
    Cancelled,
    Provider(ProviderError),
}

impl From<ProviderError> for StepError {
    fn from(e: ProviderError) -> Self {
        StepError::Provider(e)
    }
}

/// Drives one model against one tool registry.
pub struct GenerationDriver {
    provider: Arc<dyn Provider>,
    tools: ToolRegistry,
    model: String,
    temperature: f32,
    max_tokens: Option<u32>,
    max_steps: u32,
    system_prompt: String,
}

impl GenerationDriver {
    pub fn new(provider: Arc<dyn Provider>, tools: ToolRegistry, model: impl Into<String>) -> Self {
        Self {
            provider,
            tools,
            model: model.into(),
            temperature: 0.7,
            max_tokens: None,
            max_steps: DEFAULT_MAX_STEPS,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Set the step cap. Values below 1 are raised to 1.
    pub fn with_max_steps(mut self, max_steps: u32) -> Self {
        self.max_steps = max_steps.max(1);
        self
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    pub fn max_steps(&self) -> u32 {
        self.max_steps
    }

    /// Run the loop. Emits everything except the closing `finish` event;
    /// the caller sends that once the outcome has been persisted.
    pub async fn drive(
        &self,
        history: &[Message],
        gate: &GateDecision,
        mut assistant: Message,
        sink: &EventSink,
        cancel: &CancellationToken,
    ) -> DriveOutcome {
        let offered = if gate.enabled {
            self.tools.subset(&gate.tools)
        } else {
            ToolRegistry::new()
        };
        let mut usage = Usage::default();
        let mut error = None;
        let mut steps = 0;

        let finish_reason = loop {
            steps += 1;
            let request = self.request(history, &assistant, gate, &offered);
            debug!(
                step = steps,
                messages = request.messages.len(),
                tools = request.tools.len(),
                "Requesting model step"
            );
            emit(sink, UiStreamEvent::StartStep).await;

            let step = match self.run_step(request, &mut assistant, sink, cancel, steps).await {
                Ok(step) => step,
                Err(StepError::Cancelled) => break FinishReason::Cancelled,
                Err(StepError::Provider(e)) => {
                    warn!(step = steps, error = %e, "Model step failed");
                    emit(sink, UiStreamEvent::error(e.to_string())).await;
                    error = Some(e);
                    break FinishReason::Error;
                }
            };
            if let Some(u) = &step.usage {
                usage.add(u);
            }

            if step.tool_calls.is_empty() {
                emit(sink, UiStreamEvent::FinishStep).await;
                break FinishReason::Stop;
            }

            debug!(step = steps, calls = step.tool_calls.len(), "Resolving tool calls");
            resolve_message(&mut assistant, &self.tools, sink, cancel).await;
            if cancel.is_cancelled() {
                break FinishReason::Cancelled;
            }
            emit(sink, UiStreamEvent::FinishStep).await;

            let awaiting = assistant
                .tool_parts()
                .any(|p| p.state == ToolState::InputAvailable);
            if awaiting {
                debug!(step = steps, "Tool call awaiting confirmation, ending turn");
                break FinishReason::ToolCalls;
            }
            if steps >= self.max_steps {
                info!(steps, "Step cap reached");
                break FinishReason::StepCap;
            }
        };

        info!(
            steps,
            finish_reason = %finish_reason,
            total_tokens = usage.total_tokens,
            "Generation finished"
        );

        DriveOutcome {
            message: assistant,
            steps,
            finish_reason,
            usage,
            error,
        }
    }

    fn request(
        &self,
        history: &[Message],
        assistant: &Message,
        gate: &GateDecision,
        offered: &ToolRegistry,
    ) -> ProviderRequest {
        let mut messages = to_model_messages(&self.system_prompt, history);
        push_model_message(&mut messages, assistant);
        ProviderRequest {
            model: self.model.clone(),
            messages,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            tools: offered.definitions(),
            tool_choice: gate.tool_choice(),
        }
    }

    async fn run_step(
        &self,
        request: ProviderRequest,
        assistant: &mut Message,
        sink: &EventSink,
        cancel: &CancellationToken,
        step: u32,
    ) -> Result<StepOutput, StepError> {
        let mut rx = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(StepError::Cancelled),
            stream = self.provider.stream(request) => stream?,
        };

        // A tool part closes the open text part; later text opens a new one
        // so the stored parts keep stream order.
        let mut text_id = format!("text-{step}");
        let mut text_segments = 0u32;
        let mut text_part: Option<usize> = None;
        let mut output = StepOutput::default();

        let result = loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => break Err(StepError::Cancelled),
                next = rx.recv() => next,
            };
            let event = match next {
                None => break Ok(()),
                Some(Err(e)) => break Err(StepError::Provider(e)),
                Some(Ok(event)) => event,
            };

            match event {
                ModelEvent::TextDelta(delta) => {
                    if delta.is_empty() {
                        continue;
                    }
                    let index = match text_part {
                        Some(i) => i,
                        None => {
                            if text_segments > 0 {
                                text_id = format!("text-{step}-{text_segments}");
                            }
                            text_segments += 1;
                            assistant.parts.push(Part::text(""));
                            emit(sink, UiStreamEvent::TextStart { id: text_id.clone() }).await;
                            let i = assistant.parts.len() - 1;
                            text_part = Some(i);
                            i
                        }
                    };
                    if let Some(Part::Text(t)) = assistant.parts.get_mut(index) {
                        t.text.push_str(&delta);
                    }
                    emit(sink, UiStreamEvent::text_delta(text_id.clone(), delta)).await;
                }
                ModelEvent::ToolCallDelta {
                    tool_call_id,
                    tool_name,
                    input_delta,
                } => {
                    if assistant.tool_part_mut(&tool_call_id).is_none() {
                        close_text(sink, &mut text_part, &text_id).await;
                        assistant
                            .parts
                            .push(Part::Tool(ToolPart::streaming(&tool_call_id, &tool_name)));
                        emit(
                            sink,
                            UiStreamEvent::ToolInputStart {
                                tool_call_id: tool_call_id.clone(),
                                tool_name,
                            },
                        )
                        .await;
                    }
                    if !input_delta.is_empty() {
                        emit(
                            sink,
                            UiStreamEvent::ToolInputDelta {
                                tool_call_id,
                                input_text_delta: input_delta,
                            },
                        )
                        .await;
                    }
                }
                ModelEvent::ToolCall {
                    tool_call_id,
                    tool_name,
                    input,
                } => {
                    match assistant.tool_part_mut(&tool_call_id) {
                        Some(part) => {
                            if let Err(e) = part.finish_input(input.clone()) {
                                warn!(error = %e, "Ignoring repeated tool call");
                                continue;
                            }
                        }
                        None => {
                            close_text(sink, &mut text_part, &text_id).await;
                            emit(
                                sink,
                                UiStreamEvent::ToolInputStart {
                                    tool_call_id: tool_call_id.clone(),
                                    tool_name: tool_name.clone(),
                                },
                            )
                            .await;
                            assistant.parts.push(Part::Tool(ToolPart::available(
                                &tool_call_id,
                                &tool_name,
                                input.clone(),
                            )));
                        }
                    }
                    emit(
                        sink,
                        UiStreamEvent::ToolInputAvailable {
                            tool_call_id: tool_call_id.clone(),
                            tool_name,
                            input,
                        },
                    )
                    .await;
                    output.tool_calls.push(tool_call_id);
                }
                ModelEvent::Finish { usage } => {
                    output.usage = usage;
                    break Ok(());
                }
            }
        };

        close_text(sink, &mut text_part, &text_id).await;
        result.map(|()| output)
    }
}

async fn emit(sink: &EventSink, event: UiStreamEvent) {
    let _ = sink.send(event).await;
}

async fn close_text(sink: &EventSink, text_part: &mut Option<usize>, text_id: &str) {
    if text_part.take().is_some() {
        emit(sink, UiStreamEvent::TextEnd { id: text_id.to_string() }).await;
    }
}

/// Convert persisted history into model-facing messages, system prompt first.
///
/// Text parts become plain content. Each terminal tool part becomes an
/// assistant tool call followed by a tool result message. Non-terminal tool
/// parts are skipped.
pub fn to_model_messages(system_prompt: &str, history: &[Message]) -> Vec<ModelMessage> {
    let mut out = vec![ModelMessage::system(system_prompt)];
    for message in history {
        push_model_message(&mut out, message);
    }
    out
}

fn push_model_message(out: &mut Vec<ModelMessage>, message: &Message) {
    match message.role {
        Role::User | Role::System => {
            let text = message.text();
            if text.is_empty() {
                return;
            }
            out.push(if message.role == Role::User {
                ModelMessage::user(text)
            } else {
                ModelMessage::system(text)
            });
        }
        Role::Assistant => {
            let mut segment = Segment::default();
            for part in &message.parts {
                match part {
                    Part::Text(t) => {
                        if !segment.calls.is_empty() {
                            segment.flush(out);
                        }
                        segment.text.push_str(&t.text);
                    }
                    Part::Tool(tool) => {
                        let Some(result) = tool.result_text() else {
                            continue;
                        };
                        segment.calls.push(ModelToolCall {
                            id: tool.tool_call_id.clone(),
                            name: tool.tool_name.clone(),
                            arguments: tool.input.to_string(),
                        });
                        segment
                            .results
                            .push(ModelMessage::tool_result(&tool.tool_call_id, result));
                    }
                }
            }
            segment.flush(out);
        }
    }
}

#[derive(Default)]
struct Segment {
    text: String,
    calls: Vec<ModelToolCall>,
    results: Vec<ModelMessage>,
}

impl Segment {
    fn flush(&mut self, out: &mut Vec<ModelMessage>) {
        if self.text.is_empty() && self.calls.is_empty() {
            return;
        }
        out.push(ModelMessage {
            role: ModelRole::Assistant,
            content: mem::take(&mut self.text),
            tool_calls: mem::take(&mut self.calls),
            tool_call_id: None,
        });
        out.append(&mut self.results);
    }
}
