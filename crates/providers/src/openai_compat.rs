//! OpenAI-compatible provider implementation.
//!
//! Works with: Cloudflare Workers AI (OpenAI endpoint), OpenAI, OpenRouter,
//! Ollama, and any OpenAI-compatible `/chat/completions` endpoint.
//!
//! Only streaming is supported. One `stream()` call is one model step; the
//! SSE body is decoded into [`ModelEvent`]s by [`SseDecoder`].

use async_trait::async_trait;
use futures::StreamExt;
use std::collections::BTreeMap;
use toolweave_core::error::ProviderError;
use toolweave_core::provider::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

/// An OpenAI-compatible LLM provider.
pub struct OpenAiCompatProvider {
    name: String,
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl OpenAiCompatProvider {
    /// Create a new OpenAI-compatible provider.
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            name: name.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            client,
        }
    }

    /// Cloudflare Workers AI through its OpenAI-compatible endpoint.
    pub fn workers_ai(account_id: &str, api_key: impl Into<String>) -> Self {
        Self::new("workers-ai", workers_ai_base_url(account_id), api_key)
    }

    /// Create an OpenRouter provider (convenience constructor).
    pub fn openrouter(api_key: impl Into<String>) -> Self {
        Self::new("openrouter", "https://openrouter.ai/api/v1", api_key)
    }

    /// Create an OpenAI provider (convenience constructor).
    pub fn openai(api_key: impl Into<String>) -> Self {
        Self::new("openai", "https://api.openai.com/v1", api_key)
    }

    /// Create an Ollama provider (convenience constructor).
    pub fn ollama(base_url: Option<&str>) -> Self {
        Self::new(
            "ollama",
            base_url.unwrap_or("http://localhost:11434/v1"),
            "ollama", // Ollama doesn't need a real key
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Convert model messages to OpenAI API format.
    fn to_api_messages(messages: &[ModelMessage]) -> Vec<ApiMessage> {
        messages
            .iter()
            .map(|m| ApiMessage {
                role: match m.role {
                    ModelRole::User => "user".into(),
                    ModelRole::Assistant => "assistant".into(),
                    ModelRole::System => "system".into(),
                    ModelRole::Tool => "tool".into(),
                },
                content: Some(m.content.clone()),
                tool_calls: if m.tool_calls.is_empty() {
                    None
                } else {
                    Some(
                        m.tool_calls
                            .iter()
                            .map(|tc| ApiToolCall {
                                id: tc.id.clone(),
                                r#type: "function".into(),
                                function: ApiFunction {
                                    name: tc.name.clone(),
                                    arguments: tc.arguments.clone(),
                                },
                            })
                            .collect(),
                    )
                },
                tool_call_id: m.tool_call_id.clone(),
            })
            .collect()
    }

    /// Convert tool definitions to OpenAI API format.
    fn to_api_tools(tools: &[ToolDefinition]) -> Vec<ApiToolDefinition> {
        tools
            .iter()
            .map(|t| ApiToolDefinition {
                r#type: "function".into(),
                function: ApiToolFunction {
                    name: t.name.clone(),
                    description: t.description.clone(),
                    parameters: t.parameters.clone(),
                },
            })
            .collect()
    }

    fn request_body(request: &ProviderRequest) -> serde_json::Value {
        let mut body = serde_json::json!({
            "model": request.model,
            "messages": Self::to_api_messages(&request.messages),
            "temperature": request.temperature,
            "stream": true,
            "stream_options": { "include_usage": true },
        });

        if let Some(max_tokens) = request.max_tokens {
            body["max_tokens"] = serde_json::json!(max_tokens);
        }

        if !request.tools.is_empty() {
            body["tools"] = serde_json::json!(Self::to_api_tools(&request.tools));
            body["tool_choice"] = serde_json::json!(match request.tool_choice {
                ToolChoice::Auto => "auto",
                ToolChoice::None => "none",
            });
        }

        body
    }
}

/// Base URL of the Workers AI OpenAI-compatible API for an account.
pub fn workers_ai_base_url(account_id: &str) -> String {
    format!("https://api.cloudflare.com/client/v4/accounts/{account_id}/ai/v1")
}

#[async_trait]
impl Provider for OpenAiCompatProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn health_check(&self) -> std::result::Result<bool, ProviderError> {
        let url = format!("{}/models", self.base_url);
        let response = self
            .client
            .get(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        Ok(response.status().is_success())
    }

    async fn stream(
        &self,
        request: ProviderRequest,
    ) -> std::result::Result<ModelStream, ProviderError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = Self::request_body(&request);

        debug!(
            provider = %self.name,
            model = %request.model,
            tools = request.tools.len(),
            "Sending streaming request"
        );

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .header("Accept", "text/event-stream")
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Timeout(e.to_string())
                } else {
                    ProviderError::Network(e.to_string())
                }
            })?;

        let status = response.status().as_u16();

        if status == 429 {
            return Err(ProviderError::RateLimited {
                retry_after_secs: 5,
            });
        }

        if status == 401 || status == 403 {
            return Err(ProviderError::AuthenticationFailed(
                "Invalid API key or insufficient permissions".into(),
            ));
        }

        if status != 200 {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status, body = %error_body, "Provider streaming error");
            return Err(ProviderError::ApiError {
                status_code: status,
                message: error_body,
            });
        }

        let (tx, rx) = tokio::sync::mpsc::channel(64);
        let provider_name = self.name.clone();

        // Spawn task to read the SSE byte stream and decode events
        tokio::spawn(async move {
            let mut byte_stream = response.bytes_stream();
            let mut decoder = SseDecoder::new(provider_name);

            while let Some(chunk_result) = byte_stream.next().await {
                let bytes = match chunk_result {
                    Ok(b) => b,
                    Err(e) => {
                        let _ = tx
                            .send(Err(ProviderError::StreamInterrupted(e.to_string())))
                            .await;
                        return;
                    }
                };

                for event in decoder.push(&bytes) {
                    if tx.send(Ok(event)).await.is_err() {
                        return; // receiver dropped
                    }
                }

                if decoder.is_done() {
                    return;
                }
            }

            // Stream ended without [DONE]
            for event in decoder.finish() {
                if tx.send(Ok(event)).await.is_err() {
                    return;
                }
            }
        });

        Ok(rx)
    }
}

/// Incremental decoder from an OpenAI SSE body to model events.
///
/// Tool calls are accumulated by index and emitted as complete
/// [`ModelEvent::ToolCall`]s, in index order, right before `Finish`.
pub struct SseDecoder {
    provider: String,
    /// Raw body bytes; only complete lines are decoded, so a character
    /// split across network chunks stays intact.
    buffer: Vec<u8>,
    tool_calls: BTreeMap<u32, ToolCallAccumulator>,
    usage: Option<Usage>,
    done: bool,
}

impl SseDecoder {
    pub fn new(provider: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            buffer: Vec::new(),
            tool_calls: BTreeMap::new(),
            usage: None,
            done: false,
        }
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Feed raw body bytes; returns the events completed by them.
    pub fn push(&mut self, chunk: impl AsRef<[u8]>) -> Vec<ModelEvent> {
        self.buffer.extend_from_slice(chunk.as_ref());
        let mut events = Vec::new();

        while let Some(line_end) = self.buffer.iter().position(|&b| b == b'\n') {
            let raw: Vec<u8> = self.buffer.drain(..=line_end).collect();
            let line = String::from_utf8_lossy(&raw[..line_end]);
            let line = line.trim_end_matches('\r');

            // Skip empty lines and SSE comments
            if line.is_empty() || line.starts_with(':') {
                continue;
            }

            if let Some(data) = line.strip_prefix("data:") {
                events.extend(self.handle_data(data.trim()));
                if self.done {
                    break;
                }
            }
        }

        events
    }

    /// Flush accumulated tool calls and the terminal `Finish`. Idempotent.
    pub fn finish(&mut self) -> Vec<ModelEvent> {
        if self.done {
            return Vec::new();
        }
        self.done = true;

        let mut events: Vec<ModelEvent> = std::mem::take(&mut self.tool_calls)
            .into_values()
            .map(ToolCallAccumulator::into_event)
            .collect();
        events.push(ModelEvent::Finish { usage: self.usage });
        events
    }

    fn handle_data(&mut self, data: &str) -> Vec<ModelEvent> {
        if data == "[DONE]" {
            return self.finish();
        }

        let stream_resp = match serde_json::from_str::<StreamResponse>(data) {
            Ok(r) => r,
            Err(e) => {
                trace!(
                    provider = %self.provider,
                    data = %data,
                    error = %e,
                    "Ignoring unparseable SSE chunk"
                );
                return Vec::new();
            }
        };

        let mut events = Vec::new();

        if let Some(choice) = stream_resp.choices.into_iter().next() {
            if let Some(content) = choice.delta.content.filter(|c| !c.is_empty()) {
                events.push(ModelEvent::TextDelta(content));
            }

            for tc_delta in choice.delta.tool_calls.unwrap_or_default() {
                let acc = self
                    .tool_calls
                    .entry(tc_delta.index)
                    .or_insert_with(|| ToolCallAccumulator {
                        id: tc_delta
                            .id
                            .clone()
                            .unwrap_or_else(|| format!("call_{}", uuid::Uuid::new_v4().simple())),
                        name: String::new(),
                        arguments: String::new(),
                    });

                let mut fragment = String::new();
                if let Some(func) = tc_delta.function {
                    if let Some(name) = func.name.filter(|n| !n.is_empty()) {
                        acc.name = name;
                    }
                    if let Some(args) = func.arguments {
                        acc.arguments.push_str(&args);
                        fragment = args;
                    }
                }

                events.push(ModelEvent::ToolCallDelta {
                    tool_call_id: acc.id.clone(),
                    tool_name: acc.name.clone(),
                    input_delta: fragment,
                });
            }
        }

        // Usage arrives in its own trailing chunk (stream_options)
        if let Some(usage) = stream_resp.usage {
            self.usage = Some(Usage {
                prompt_tokens: usage.prompt_tokens,
                completion_tokens: usage.completion_tokens,
                total_tokens: usage.total_tokens,
            });
        }

        events
    }
}

// --- OpenAI API types (internal) ---

#[derive(Debug, Serialize, Deserialize)]
struct ApiMessage {
    role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<ApiToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiToolCall {
    id: String,
    r#type: String,
    function: ApiFunction,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiFunction {
    name: String,
    arguments: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiToolDefinition {
    r#type: String,
    function: ApiToolFunction,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiToolFunction {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct ApiUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

// --- Streaming SSE types ---

/// A single SSE `data: {...}` chunk from a streaming response.
#[derive(Debug, Deserialize)]
struct StreamResponse {
    #[serde(default)]
    choices: Vec<StreamChoice>,
    #[serde(default)]
    usage: Option<ApiUsage>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    delta: StreamDelta,
    #[serde(default)]
    #[allow(dead_code)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StreamDelta {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<StreamToolCallDelta>>,
}

/// A tool call delta, arriving incrementally across chunks.
#[derive(Debug, Deserialize)]
struct StreamToolCallDelta {
    index: u32,
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    function: Option<StreamFunctionDelta>,
}

#[derive(Debug, Deserialize)]
struct StreamFunctionDelta {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    arguments: Option<String>,
}

/// Accumulates incremental tool call deltas into a complete tool call.
struct ToolCallAccumulator {
    id: String,
    name: String,
    arguments: String,
}

impl ToolCallAccumulator {
    /// Arguments that are not valid JSON are passed through as a string so
    /// the tool can reject them as invalid input.
    fn into_event(self) -> ModelEvent {
        let input = if self.arguments.trim().is_empty() {
            serde_json::json!({})
        } else {
            serde_json::from_str(&self.arguments)
                .unwrap_or(serde_json::Value::String(self.arguments))
        };
        ModelEvent::ToolCall {
            tool_call_id: self.id,
            tool_name: self.name,
            input,
        }
    }
}
