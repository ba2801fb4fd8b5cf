//! HTTP API v1.
//!
//! Endpoints:
//!
//! - `GET    /v1/status`                       — Is a model provider configured?
//! - `GET    /v1/tools`                        — List available tools
//! - `GET    /v1/conversations`                — List conversation ids
//! - `DELETE /v1/conversations`                — Drop every stored conversation
//! - `GET    /v1/conversations/{id}`           — Stored messages of a conversation
//! - `POST   /v1/conversations/{id}/chat`      — Send a message, stream the turn
//! - `POST   /v1/conversations/{id}/confirm`   — Decide on a pending tool call (`approved` or `decision`), stream the turn
//! - `POST   /v1/conversations/{id}/schedule`  — Run a scheduled task, stream the turn
//!
//! Turns stream as SSE, one AI SDK UI message event per `data:` line, closed by
//! `data: [DONE]`. Dropping the connection cancels the turn.

use axum::{
    Router,
    extract::{Path, State},
    http::StatusCode,
    response::sse::{Event as SseEvent, KeepAlive, Sse},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use tokio_stream::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use toolweave_agent::TurnStream;
use toolweave_core::error::{Error, ToolStateError};
use toolweave_core::message::{APPROVAL_NO, APPROVAL_YES, Approval, ConversationId, Message};

use crate::SharedState;

/// Header that tells AI SDK clients which stream protocol is spoken.
const STREAM_PROTOCOL_HEADER: (&str, &str) = ("x-vercel-ai-ui-message-stream", "v1");

// ── Router ────────────────────────────────────────────────────────────────

/// Build the v1 API router. Nest this under "/v1" in the main router.
pub fn v1_router(state: SharedState) -> Router {
    Router::new()
        .route("/status", get(status_handler))
        .route("/tools", get(list_tools_handler))
        .route(
            "/conversations",
            get(list_conversations_handler).delete(clear_conversations_handler),
        )
        .route("/conversations/{id}", get(get_conversation_handler))
        .route("/conversations/{id}/chat", post(chat_handler))
        .route("/conversations/{id}/confirm", post(confirm_handler))
        .route("/conversations/{id}/schedule", post(schedule_handler))
        .with_state(state)
}

// ── DTOs ──────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub success: bool,
    pub provider: String,
    pub model: String,
    pub uptime_secs: i64,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDto {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
    pub requires_confirmation: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ToolListResponse {
    pub tools: Vec<ToolDto>,
    pub count: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ConversationListResponse {
    pub conversations: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ConversationResponse {
    pub id: String,
    pub messages: Vec<Message>,
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmRequest {
    pub tool_call_id: String,
    #[serde(default)]
    pub approved: Option<bool>,
    /// Decision text as chat clients send it: `"Yes, confirmed."` or `"No, denied."`.
    #[serde(default)]
    pub decision: Option<String>,
}

impl ConfirmRequest {
    fn approval(&self) -> Result<Approval, ApiError> {
        match (&self.decision, self.approved) {
            (Some(text), _) => Approval::from_decision(text).ok_or_else(|| {
                api_error(
                    StatusCode::BAD_REQUEST,
                    format!("decision must be {APPROVAL_YES:?} or {APPROVAL_NO:?}"),
                )
            }),
            (None, Some(approved)) => Ok(Approval::from(approved)),
            (None, None) => Err(api_error(
                StatusCode::BAD_REQUEST,
                "either approved or decision is required",
            )),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ScheduleRequest {
    pub description: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, error: impl std::fmt::Display) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: error.to_string(),
        }),
    )
}

fn error_status(err: &Error) -> StatusCode {
    match err {
        Error::ToolState(ToolStateError::NotFound(_)) => StatusCode::NOT_FOUND,
        Error::ToolState(_) => StatusCode::CONFLICT,
        Error::Config { .. } => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl From<Error> for ErrorResponse {
    fn from(err: Error) -> Self {
        Self {
            error: err.to_string(),
        }
    }
}

// ── SSE ───────────────────────────────────────────────────────────────────

/// Wrap a turn stream as an SSE response. The turn's token is cancelled when
/// the response body is dropped, whether the client disconnected or the
/// stream ran to completion.
fn sse_response(stream: TurnStream, cancel: CancellationToken) -> Response {
    let guard = cancel.drop_guard();
    let events = stream.map(move |event| {
        let _keep = &guard;
        let data = serde_json::to_string(&event).unwrap_or_default();
        Ok::<_, Infallible>(SseEvent::default().data(data))
    });
    let done = futures::stream::once(async { Ok(SseEvent::default().data("[DONE]")) });

    (
        [STREAM_PROTOCOL_HEADER],
        Sse::new(events.chain(done)).keep_alive(KeepAlive::default()),
    )
        .into_response()
}

// ── Handlers ──────────────────────────────────────────────────────────────

async fn status_handler(State(state): State<SharedState>) -> Json<StatusResponse> {
    Json(StatusResponse {
        success: state.provider_configured,
        provider: state.agent.provider_name().to_string(),
        model: state.agent.model().to_string(),
        uptime_secs: (chrono::Utc::now() - state.start_time).num_seconds(),
    })
}

async fn list_tools_handler(State(state): State<SharedState>) -> Json<ToolListResponse> {
    let registry = state.agent.tools();
    let tools: Vec<ToolDto> = registry
        .names()
        .into_iter()
        .filter_map(|name| registry.get(name))
        .map(|tool| ToolDto {
            name: tool.name().to_string(),
            description: tool.description().to_string(),
            parameters: tool.parameters_schema(),
            requires_confirmation: tool.requires_confirmation(),
        })
        .collect();
    let count = tools.len();

    Json(ToolListResponse { tools, count })
}

async fn list_conversations_handler(State(state): State<SharedState>) -> Json<ConversationListResponse> {
    let conversations = state
        .store
        .conversations()
        .await
        .into_iter()
        .map(|id| id.0)
        .collect();
    Json(ConversationListResponse { conversations })
}

async fn clear_conversations_handler(State(state): State<SharedState>) -> StatusCode {
    state.store.clear().await;
    info!("Cleared all conversations");
    StatusCode::NO_CONTENT
}

async fn get_conversation_handler(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<ConversationResponse>, ApiError> {
    let conversation = ConversationId(id);
    let messages = state
        .agent
        .store()
        .get(&conversation)
        .await
        .map_err(|e| api_error(StatusCode::INTERNAL_SERVER_ERROR, e))?;
    if messages.is_empty() {
        return Err(api_error(
            StatusCode::NOT_FOUND,
            format!("Conversation not found: {conversation}"),
        ));
    }

    Ok(Json(ConversationResponse {
        id: conversation.0,
        messages,
    }))
}

async fn chat_handler(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Json(payload): Json<ChatRequest>,
) -> Result<Response, ApiError> {
    let message = payload.message.trim();
    if message.is_empty() {
        return Err(api_error(StatusCode::BAD_REQUEST, "message must not be empty"));
    }
    let conversation = ConversationId(id);
    info!(conversation_id = %conversation, message_len = message.len(), "v1 chat request");

    let cancel = CancellationToken::new();
    let stream = state
        .agent
        .run_turn(&conversation, Some(Message::user(message)), cancel.clone())
        .await
        .map_err(turn_error)?;
    Ok(sse_response(stream, cancel))
}

async fn confirm_handler(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Json(payload): Json<ConfirmRequest>,
) -> Result<Response, ApiError> {
    let conversation = ConversationId(id);
    let approval = payload.approval()?;
    info!(
        conversation_id = %conversation,
        tool_call_id = %payload.tool_call_id,
        approval = ?approval,
        "v1 confirm request"
    );

    state
        .agent
        .confirm(&conversation, &payload.tool_call_id, approval)
        .await
        .map_err(turn_error)?;

    let cancel = CancellationToken::new();
    let stream = state
        .agent
        .run_turn(&conversation, None, cancel.clone())
        .await
        .map_err(turn_error)?;
    Ok(sse_response(stream, cancel))
}

async fn schedule_handler(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Json(payload): Json<ScheduleRequest>,
) -> Result<Response, ApiError> {
    let conversation = ConversationId(id);
    let cancel = CancellationToken::new();
    let stream = state
        .agent
        .schedule(&conversation, &payload.description, cancel.clone())
        .await
        .map_err(turn_error)?;
    Ok(sse_response(stream, cancel))
}

fn turn_error(err: Error) -> ApiError {
    let status = error_status(&err);
    if status.is_server_error() {
        warn!(error = %err, "Turn request failed");
    }
    (status, Json(ErrorResponse::from(err)))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::mpsc;
    use tower::ServiceExt;

    use toolweave_agent::ChatAgent;
    use toolweave_config::{AppConfig, ToolsConfig};
    use toolweave_core::error::ProviderError;
    use toolweave_core::message::{Part, ToolPart};
    use toolweave_core::provider::{ModelEvent, ModelStream, Provider, ProviderRequest};
    use toolweave_core::store::MessageStore;
    use toolweave_store::InMemoryStore;

    use crate::GatewayState;

    /// Answers every step with the same text.
    struct MockProvider {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Provider for MockProvider {
        fn name(&self) -> &str {
            "gateway_mock"
        }

        async fn stream(&self, _request: ProviderRequest) -> Result<ModelStream, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let (tx, rx) = mpsc::channel(4);
            tx.send(Ok(ModelEvent::TextDelta("Hey! ".into()))).await.unwrap();
            tx.send(Ok(ModelEvent::TextDelta("What's up?".into()))).await.unwrap();
            tx.send(Ok(ModelEvent::Finish { usage: None })).await.unwrap();
            Ok(rx)
        }
    }

    pub(crate) fn test_state() -> SharedState {
        let config = AppConfig::default();
        let store = InMemoryStore::new();
        let agent = ChatAgent::new(
            Arc::new(MockProvider {
                calls: AtomicUsize::new(0),
            }),
            Arc::new(toolweave_tools::default_registry(&ToolsConfig::default())),
            Arc::new(store.clone()),
            &config,
        )
        .unwrap();
        Arc::new(GatewayState {
            agent: Arc::new(agent),
            store,
            provider_configured: false,
            start_time: chrono::Utc::now(),
        })
    }

    fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    /// The JSON payloads of every `data:` line, `[DONE]` kept as a string.
    async fn sse_data(response: Response) -> Vec<String> {
        let body = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(body.to_vec())
            .unwrap()
            .lines()
            .filter_map(|l| l.strip_prefix("data: ").map(str::to_string))
            .collect()
    }

    #[tokio::test]
    async fn list_tools() {
        let app = v1_router(test_state());

        let req = Request::builder().uri("/tools").body(Body::empty()).unwrap();
        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: ToolListResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(json.count, 8);
        assert!(json.tools.iter().any(|t| t.name == "getWeatherInformation"));
        assert!(json.tools.iter().any(|t| t.name == "generateChart"));
        assert!(json.tools.iter().all(|t| !t.requires_confirmation));
    }

    #[tokio::test]
    async fn status_reports_missing_key() {
        let app = v1_router(test_state());

        let req = Request::builder().uri("/status").body(Body::empty()).unwrap();
        let response = app.oneshot(req).await.unwrap();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let status: StatusResponse = serde_json::from_slice(&body).unwrap();
        assert!(!status.success);
        assert_eq!(status.provider, "gateway_mock");
    }

    #[tokio::test]
    async fn chat_streams_a_turn_and_persists_it() {
        let state = test_state();

        let response = v1_router(state.clone())
            .oneshot(post_json("/conversations/c1/chat", serde_json::json!({"message": "hey"})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["x-vercel-ai-ui-message-stream"], "v1");

        let data = sse_data(response).await;
        assert_eq!(data.last().map(String::as_str), Some("[DONE]"));
        let events: Vec<serde_json::Value> = data[..data.len() - 1]
            .iter()
            .map(|d| serde_json::from_str(d).unwrap())
            .collect();
        assert_eq!(events[0]["type"], "start");
        assert_eq!(events.last().unwrap()["type"], "finish");
        assert_eq!(events.last().unwrap()["finishReason"], "stop");
        assert!(events.iter().any(|e| e["delta"] == "What's up?"));

        let req = Request::builder()
            .uri("/conversations/c1")
            .body(Body::empty())
            .unwrap();
        let response = v1_router(state).oneshot(req).await.unwrap();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let conv: ConversationResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(conv.messages.len(), 2);
        assert_eq!(conv.messages[1].text(), "Hey! What's up?");
    }

    #[tokio::test]
    async fn empty_message_is_rejected() {
        let response = v1_router(test_state())
            .oneshot(post_json("/conversations/c1/chat", serde_json::json!({"message": "  "})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn unknown_conversation_is_not_found() {
        let req = Request::builder()
            .uri("/conversations/nonexistent")
            .body(Body::empty())
            .unwrap();
        let response = v1_router(test_state()).oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn confirm_unknown_call_is_not_found() {
        let response = v1_router(test_state())
            .oneshot(post_json(
                "/conversations/c1/confirm",
                serde_json::json!({"toolCallId": "nope", "approved": true}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn confirm_automatic_tool_conflicts() {
        let state = test_state();
        let pending = Message::assistant_with_parts(vec![Part::Tool(ToolPart::available(
            "call_1",
            "getWeatherInformation",
            serde_json::json!({"city": "Paris"}),
        ))]);
        state.store.append(&ConversationId::from("c1"), pending).await.unwrap();

        let response = v1_router(state)
            .oneshot(post_json(
                "/conversations/c1/confirm",
                serde_json::json!({"toolCallId": "call_1", "approved": true}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn confirm_accepts_decision_text() {
        let state = test_state();
        let pending = Message::assistant_with_parts(vec![Part::Tool(ToolPart::available(
            "call_1",
            "getWeatherInformation",
            serde_json::json!({"city": "Paris"}),
        ))]);
        state.store.append(&ConversationId::from("c1"), pending).await.unwrap();

        // The decision parses and reaches the agent, which refuses an automatic tool.
        let response = v1_router(state.clone())
            .oneshot(post_json(
                "/conversations/c1/confirm",
                serde_json::json!({"toolCallId": "call_1", "decision": APPROVAL_YES}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let response = v1_router(state)
            .oneshot(post_json(
                "/conversations/c1/confirm",
                serde_json::json!({"toolCallId": "call_1", "decision": "sure"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn decision_text_maps_to_approval() {
        let request = |body: serde_json::Value| serde_json::from_value::<ConfirmRequest>(body).unwrap();

        let yes = request(serde_json::json!({"toolCallId": "c", "decision": APPROVAL_YES}));
        assert_eq!(yes.approval().unwrap(), Approval::Approved);
        let no = request(serde_json::json!({"toolCallId": "c", "decision": APPROVAL_NO}));
        assert_eq!(no.approval().unwrap(), Approval::Rejected);
        let flag = request(serde_json::json!({"toolCallId": "c", "approved": false}));
        assert_eq!(flag.approval().unwrap(), Approval::Rejected);
        let neither = request(serde_json::json!({"toolCallId": "c"}));
        assert_eq!(neither.approval().unwrap_err().0, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn schedule_runs_a_synthetic_turn() {
        let state = test_state();
        let response = v1_router(state.clone())
            .oneshot(post_json(
                "/conversations/daily/schedule",
                serde_json::json!({"description": "morning briefing"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        sse_data(response).await;

        let ids = state.store.conversations().await;
        assert_eq!(ids, vec![ConversationId::from("daily")]);
        let history = state.agent.store().get(&ids[0]).await.unwrap();
        assert_eq!(
            history[0].first_text(),
            Some("Running scheduled task: morning briefing")
        );
    }

    #[tokio::test]
    async fn clear_drops_everything() {
        let state = test_state();
        state
            .store
            .append(&ConversationId::from("c1"), Message::user("hi"))
            .await
            .unwrap();

        let req = Request::builder()
            .method("DELETE")
            .uri("/conversations")
            .body(Body::empty())
            .unwrap();
        let response = v1_router(state.clone()).oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert!(state.store.conversations().await.is_empty());
    }
}
