//! The turn pipeline.
//!
//! One turn: load history, persist the incoming message, sanitize, resolve
//! pending tool calls, gate, drive the model, persist the assistant message.
//! The caller gets the merged event stream back immediately; the work runs on
//! a spawned task.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use toolweave_config::AppConfig;
use toolweave_core::error::{Error, Result, ToolStateError};
use toolweave_core::message::{Approval, ConversationId, Message};
use toolweave_core::provider::Provider;
use toolweave_core::store::MessageStore;
use toolweave_core::stream::{FinishReason, UiStreamEvent};
use toolweave_core::tool::ToolRegistry;
use tracing::{debug, info, warn};

use crate::driver::GenerationDriver;
use crate::gating::ToolGate;
use crate::merger::{TurnStream, merge};
use crate::prompt::{DEFAULT_SYSTEM_PROMPT, scheduled_task_message};
use crate::resolver::{EventSink, attach_decision, merge_resolved, resolve};
use crate::sanitizer::sanitize;

const CHANNEL_CAPACITY: usize = 64;

/// Orchestrates turns of one conversation store against one model.
pub struct ChatAgent {
    provider: Arc<dyn Provider>,
    tools: Arc<ToolRegistry>,
    store: Arc<dyn MessageStore>,
    gate: Arc<ToolGate>,
    model: String,
    temperature: f32,
    max_tokens: Option<u32>,
    max_steps: u32,
    system_prompt: String,
}

impl ChatAgent {
    pub fn new(
        provider: Arc<dyn Provider>,
        tools: Arc<ToolRegistry>,
        store: Arc<dyn MessageStore>,
        config: &AppConfig,
    ) -> Result<Self> {
        let gate = ToolGate::new(config.agent.tool_keywords.as_slice()).map_err(|e| Error::Config {
            message: format!("invalid tool keyword: {e}"),
        })?;
        Ok(Self {
            provider,
            tools,
            store,
            gate: Arc::new(gate),
            model: config.default_model.clone(),
            temperature: config.default_temperature,
            max_tokens: Some(config.default_max_tokens),
            max_steps: config.agent.max_steps.max(1),
            system_prompt: config
                .agent
                .system_prompt
                .clone()
                .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string()),
        })
    }

    pub fn with_max_steps(mut self, max_steps: u32) -> Self {
        self.max_steps = max_steps.max(1);
        self
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    pub fn with_gate(mut self, gate: ToolGate) -> Self {
        self.gate = Arc::new(gate);
        self
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    pub fn store(&self) -> &Arc<dyn MessageStore> {
        &self.store
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn max_steps(&self) -> u32 {
        self.max_steps
    }

    fn driver(&self) -> GenerationDriver {
        let driver = GenerationDriver::new(self.provider.clone(), (*self.tools).clone(), &self.model)
            .with_temperature(self.temperature)
            .with_max_steps(self.max_steps)
            .with_system_prompt(&self.system_prompt);
        match self.max_tokens {
            Some(max) => driver.with_max_tokens(max),
            None => driver,
        }
    }

    /// Start a turn and return its event stream.
    ///
    /// Store failures while loading history or persisting `incoming` are
    /// returned here, before any stream exists.
    pub async fn run_turn(
        &self,
        conversation_id: &ConversationId,
        incoming: Option<Message>,
        cancel: CancellationToken,
    ) -> Result<TurnStream> {
        let mut history = self.store.get(conversation_id).await?;
        if let Some(message) = incoming {
            self.store.append(conversation_id, message.clone()).await?;
            history.push(message);
        }

        info!(
            conversation_id = %conversation_id,
            history = history.len(),
            provider = self.provider.name(),
            "Processing turn"
        );

        let assistant = Message::assistant();
        let (resolver_tx, resolver_rx) = mpsc::channel(CHANNEL_CAPACITY);
        let (driver_tx, driver_rx) = mpsc::channel(CHANNEL_CAPACITY);
        let stream = merge(assistant.id.clone(), resolver_rx, driver_rx);

        let turn = Turn {
            conversation_id: conversation_id.clone(),
            history,
            tools: self.tools.clone(),
            store: self.store.clone(),
            gate: self.gate.clone(),
            driver: self.driver(),
        };
        tokio::spawn(turn.run(assistant, resolver_tx, driver_tx, cancel));

        Ok(stream)
    }

    /// Record a human decision on a confirmation-gated tool call. Run a turn
    /// with no incoming message afterwards to act on it.
    pub async fn confirm(
        &self,
        conversation_id: &ConversationId,
        tool_call_id: &str,
        approval: Approval,
    ) -> Result<()> {
        let mut history = self.store.get(conversation_id).await?;

        let tool_name = history
            .iter()
            .flat_map(|m| m.tool_parts())
            .find(|p| p.tool_call_id == tool_call_id)
            .map(|p| p.tool_name.clone())
            .ok_or_else(|| ToolStateError::NotFound(tool_call_id.to_string()))?;
        if let Some(tool) = self.tools.get(&tool_name) {
            if !tool.requires_confirmation() {
                return Err(ToolStateError::ConfirmationNotRequired(tool_call_id.to_string()).into());
            }
        }

        let index = attach_decision(&mut history, tool_call_id, approval)?;
        let message = history.swap_remove(index);
        self.store.append(conversation_id, message).await?;

        info!(
            conversation_id = %conversation_id,
            tool_call_id,
            tool = %tool_name,
            approval = ?approval,
            "Recorded tool decision"
        );
        Ok(())
    }

    /// Run a turn for a scheduled task.
    pub async fn schedule(
        &self,
        conversation_id: &ConversationId,
        description: &str,
        cancel: CancellationToken,
    ) -> Result<TurnStream> {
        info!(conversation_id = %conversation_id, task = description, "Running scheduled task");
        self.run_turn(conversation_id, Some(scheduled_task_message(description)), cancel)
            .await
    }
}

/// Everything the spawned task of one turn owns.
struct Turn {
    conversation_id: ConversationId,
    history: Vec<Message>,
    tools: Arc<ToolRegistry>,
    store: Arc<dyn MessageStore>,
    gate: Arc<ToolGate>,
    driver: GenerationDriver,
}

impl Turn {
    async fn run(
        self,
        assistant: Message,
        resolver_tx: EventSink,
        driver_tx: EventSink,
        cancel: CancellationToken,
    ) {
        let sanitized = sanitize(&self.history, &self.tools);
        debug!(
            kept = sanitized.len(),
            persisted = self.history.len(),
            "Sanitized history"
        );

        let resolution = resolve(sanitized, &self.tools, &resolver_tx, &cancel).await;
        drop(resolver_tx);

        if cancel.is_cancelled() {
            info!(conversation_id = %self.conversation_id, "Turn cancelled during resolution");
            finish(&driver_tx, FinishReason::Cancelled).await;
            return;
        }

        for resolved in resolution.changed_messages() {
            if let Err(e) = self.persist_resolved(resolved).await {
                warn!(conversation_id = %self.conversation_id, error = %e, "Failed to persist tool results");
                let _ = driver_tx.send(UiStreamEvent::error(e.to_string())).await;
                finish(&driver_tx, FinishReason::Error).await;
                return;
            }
        }

        let gate = self.gate.evaluate(&resolution.messages, &self.tools);
        debug!(enabled = gate.enabled, matched = ?gate.matched, "Tool gating");

        let outcome = self
            .driver
            .drive(&resolution.messages, &gate, assistant, &driver_tx, &cancel)
            .await;

        let mut reason = outcome.finish_reason;
        if reason != FinishReason::Cancelled && !outcome.message.parts.is_empty() {
            if let Err(e) = self.store.append(&self.conversation_id, outcome.message).await {
                warn!(conversation_id = %self.conversation_id, error = %e, "Failed to persist assistant message");
                let _ = driver_tx.send(UiStreamEvent::error(e.to_string())).await;
                reason = FinishReason::Error;
            }
        }

        info!(
            conversation_id = %self.conversation_id,
            steps = outcome.steps,
            finish_reason = %reason,
            total_tokens = outcome.usage.total_tokens,
            "Turn finished"
        );
        finish(&driver_tx, reason).await;
    }

    /// Write resolved tool parts back onto the persisted message, keeping any
    /// parts the sanitizer left out of the model copy.
    async fn persist_resolved(&self, resolved: &Message) -> Result<()> {
        let mut message = self
            .history
            .iter()
            .find(|m| m.id == resolved.id)
            .cloned()
            .unwrap_or_else(|| resolved.clone());
        merge_resolved(&mut message, resolved);
        self.store.append(&self.conversation_id, message).await?;
        Ok(())
    }
}

async fn finish(sink: &EventSink, reason: FinishReason) {
    let _ = sink.send(UiStreamEvent::finish(reason)).await;
}
