//! Shared test doubles for the agent pipeline tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};
use tokio::sync::mpsc;
use toolweave_core::error::{ProviderError, ToolError};
use toolweave_core::provider::{ModelEvent, ModelStream, Provider, ProviderRequest, Usage};
use toolweave_core::stream::UiStreamEvent;
use toolweave_core::tool::{Tool, ToolRegistry};

pub type Step = Vec<Result<ModelEvent, ProviderError>>;

type Script = Box<dyn Fn(usize) -> Option<Step> + Send + Sync>;

/// A provider that replays one scripted step per `stream` call and records
/// every request it receives.
pub struct ScriptedProvider {
    script: Script,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl ScriptedProvider {
    pub fn new(steps: Vec<Step>) -> Self {
        Self::from_fn(move |call| steps.get(call).cloned())
    }

    pub fn from_fn(script: impl Fn(usize) -> Option<Step> + Send + Sync + 'static) -> Self {
        Self {
            script: Box::new(script),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Requests a fresh `echo` call on every step, forever.
    pub fn endless_tool_calls() -> Self {
        Self::from_fn(|call| Some(tool_step(&format!("call_{call}"), "echo", json!({"n": call}))))
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn stream(&self, request: ProviderRequest) -> Result<ModelStream, ProviderError> {
        let call = {
            let mut requests = self.requests.lock().unwrap();
            requests.push(request);
            requests.len() - 1
        };
        let step = (self.script)(call).unwrap_or_else(|| {
            panic!("ScriptedProvider: no step scripted for call #{call}");
        });
        let (tx, rx) = mpsc::channel(step.len() + 1);
        for event in step {
            tx.try_send(event).unwrap();
        }
        Ok(rx)
    }
}

/// A provider whose requests fail before any event arrives.
pub struct FailingProvider(pub ProviderError);

#[async_trait]
impl Provider for FailingProvider {
    fn name(&self) -> &str {
        "failing"
    }

    async fn stream(&self, _request: ProviderRequest) -> Result<ModelStream, ProviderError> {
        Err(self.0.clone())
    }
}

/// A provider that never answers.
pub struct StalledProvider;

#[async_trait]
impl Provider for StalledProvider {
    fn name(&self) -> &str {
        "stalled"
    }

    async fn stream(&self, _request: ProviderRequest) -> Result<ModelStream, ProviderError> {
        futures::future::pending().await
    }
}

pub fn usage(total: u32) -> Usage {
    Usage {
        prompt_tokens: total - 1,
        completion_tokens: 1,
        total_tokens: total,
    }
}

pub fn text_step(text: &str) -> Step {
    let mut step: Step = text
        .split_inclusive(' ')
        .map(|chunk| Ok(ModelEvent::TextDelta(chunk.to_string())))
        .collect();
    step.push(Ok(ModelEvent::Finish { usage: Some(usage(10)) }));
    step
}

pub fn tool_step(id: &str, name: &str, input: Value) -> Step {
    vec![
        Ok(ModelEvent::ToolCallDelta {
            tool_call_id: id.into(),
            tool_name: name.into(),
            input_delta: input.to_string(),
        }),
        Ok(ModelEvent::ToolCall {
            tool_call_id: id.into(),
            tool_name: name.into(),
            input,
        }),
        Ok(ModelEvent::Finish { usage: Some(usage(5)) }),
    ]
}

pub fn registry(tools: Vec<Arc<dyn Tool>>) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    for tool in tools {
        registry.register(tool);
    }
    registry
}

/// Drain every event currently queued on `rx`.
pub fn drain(rx: &mut mpsc::Receiver<UiStreamEvent>) -> Vec<UiStreamEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

/// Echoes its arguments back.
pub struct EchoTool;

impl EchoTool {
    pub fn arc() -> Arc<dyn Tool> {
        Arc::new(EchoTool)
    }
}

#[async_trait]
impl Tool for EchoTool {
    fn name(&self) -> &str {
        "echo"
    }

    fn description(&self) -> &str {
        "Echo the arguments"
    }

    fn parameters_schema(&self) -> Value {
        json!({"type": "object"})
    }

    async fn execute(&self, arguments: Value) -> Result<Value, ToolError> {
        Ok(json!({ "echo": arguments }))
    }
}

/// A confirmation-gated tool that counts its executions.
#[derive(Default)]
pub struct GatedTool {
    calls: AtomicUsize,
}

impl GatedTool {
    pub fn arc() -> Arc<dyn Tool> {
        Arc::new(GatedTool::default())
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Tool for GatedTool {
    fn name(&self) -> &str {
        "gated"
    }

    fn description(&self) -> &str {
        "Needs a human to say yes"
    }

    fn parameters_schema(&self) -> Value {
        json!({"type": "object"})
    }

    fn requires_confirmation(&self) -> bool {
        true
    }

    async fn execute(&self, _arguments: Value) -> Result<Value, ToolError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(json!("gated done"))
    }
}

/// Sleeps before answering.
pub struct SlowTool {
    name: &'static str,
    delay: Duration,
}

impl SlowTool {
    pub fn arc(name: &'static str, delay_ms: u64) -> Arc<dyn Tool> {
        Arc::new(SlowTool {
            name,
            delay: Duration::from_millis(delay_ms),
        })
    }
}

#[async_trait]
impl Tool for SlowTool {
    fn name(&self) -> &str {
        self.name
    }

    fn description(&self) -> &str {
        "Answers after a delay"
    }

    fn parameters_schema(&self) -> Value {
        json!({"type": "object"})
    }

    async fn execute(&self, _arguments: Value) -> Result<Value, ToolError> {
        tokio::time::sleep(self.delay).await;
        Ok(json!(format!("{} done", self.name)))
    }
}

/// Always fails.
pub struct BrokenTool;

#[async_trait]
impl Tool for BrokenTool {
    fn name(&self) -> &str {
        "broken"
    }

    fn description(&self) -> &str {
        "Always fails"
    }

    fn parameters_schema(&self) -> Value {
        json!({"type": "object"})
    }

    async fn execute(&self, _arguments: Value) -> Result<Value, ToolError> {
        Err(ToolError::ExecutionFailed {
            tool_name: "broken".into(),
            reason: "upstream returned 502".into(),
        })
    }
}
