//! `toolweave chat` — Interactive or single-message chat mode.

use std::io::Write;
use std::sync::Arc;

use futures::StreamExt;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use toolweave_agent::{ChatAgent, TurnStream};
use toolweave_config::AppConfig;
use toolweave_core::message::{Approval, ConversationId, Message};
use toolweave_core::stream::{FinishReason, UiStreamEvent};
use toolweave_store::InMemoryStore;

pub async fn run(message: Option<String>) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    if !config.has_api_key() {
        eprintln!();
        eprintln!("  ERROR: No API key configured!");
        eprintln!();
        eprintln!("  Set one of these environment variables:");
        eprintln!("    TOOLWEAVE_API_KEY = '...'");
        eprintln!("    OPENAI_API_KEY    = 'sk-...'");
        eprintln!();
        eprintln!("  Or add it to your config file:");
        eprintln!("    {}", AppConfig::config_dir().join("config.toml").display());
        eprintln!();
        return Err("No API key found. See above for setup instructions.".into());
    }

    let router = toolweave_providers::build_from_config(&config);
    let provider = router.default().ok_or("No default provider configured")?;
    let tools = Arc::new(toolweave_tools::default_registry(&config.tools));
    let tool_count = tools.len();
    let agent = ChatAgent::new(provider, tools, Arc::new(InMemoryStore::new()), &config)?;
    let conversation = ConversationId::new();

    if let Some(msg) = message {
        let outcome = send(&agent, &conversation, Some(Message::user(msg))).await?;
        println!();
        if matches!(outcome.finish_reason, Some(FinishReason::ToolCalls)) {
            eprintln!("  {} tool call(s) need confirmation; use interactive mode", outcome.pending.len());
        }
        return Ok(());
    }

    println!();
    println!("  Toolweave — Interactive Mode");
    println!();
    println!("  Provider:  {}", config.default_provider);
    println!("  Model:     {}", config.default_model);
    println!("  Tools:     {tool_count} registered");
    println!();
    println!("  Type your message and press Enter.");
    println!("  Ctrl+C stops a running reply. Type 'exit' to quit.");
    println!();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    prompt("  You > ")?;

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line == "exit" || line == "quit" {
            break;
        }
        if line.is_empty() {
            prompt("  You > ")?;
            continue;
        }

        print!("\n  Assistant > ");
        let mut outcome = send(&agent, &conversation, Some(Message::user(line))).await?;

        // Calls awaiting a human decision: ask, record, then continue the turn.
        while matches!(outcome.finish_reason, Some(FinishReason::ToolCalls)) && !outcome.pending.is_empty() {
            for (tool_call_id, tool_name) in std::mem::take(&mut outcome.pending) {
                prompt(&format!("\n  Run {tool_name}? [y/N] "))?;
                let answer = lines.next_line().await?.unwrap_or_default();
                let approval = Approval::from(matches!(answer.trim(), "y" | "Y" | "yes"));
                if let Err(e) = agent.confirm(&conversation, &tool_call_id, approval).await {
                    eprintln!("  [Error] {e}");
                }
            }
            print!("\n  Assistant > ");
            outcome = send(&agent, &conversation, None).await?;
        }

        println!("\n");
        prompt("  You > ")?;
    }

    println!();
    println!("  Goodbye!");
    println!();

    Ok(())
}

fn prompt(text: &str) -> std::io::Result<()> {
    print!("{text}");
    std::io::stdout().flush()
}

async fn send(
    agent: &ChatAgent,
    conversation: &ConversationId,
    incoming: Option<Message>,
) -> Result<TurnOutcome, Box<dyn std::error::Error>> {
    let cancel = CancellationToken::new();
    let stream = agent.run_turn(conversation, incoming, cancel.clone()).await?;
    Ok(print_turn(stream, &cancel).await)
}

/// What the terminal needs to know once a turn's stream ends.
#[derive(Debug, Default)]
pub struct TurnOutcome {
    pub finish_reason: Option<FinishReason>,
    /// `(tool_call_id, tool_name)` of calls that got input but no result.
    pub pending: Vec<(String, String)>,
}

impl TurnOutcome {
    pub fn observe(&mut self, event: &UiStreamEvent) {
        match event {
            UiStreamEvent::ToolInputAvailable {
                tool_call_id,
                tool_name,
                ..
            } => self.pending.push((tool_call_id.clone(), tool_name.clone())),
            UiStreamEvent::ToolOutputAvailable { tool_call_id, .. }
            | UiStreamEvent::ToolOutputError { tool_call_id, .. } => {
                self.pending.retain(|(id, _)| id != tool_call_id);
            }
            UiStreamEvent::Finish { finish_reason, .. } => self.finish_reason = Some(*finish_reason),
            _ => {}
        }
    }
}

async fn print_turn(mut stream: TurnStream, cancel: &CancellationToken) -> TurnOutcome {
    let mut outcome = TurnOutcome::default();
    loop {
        let event = tokio::select! {
            event = stream.next() => event,
            _ = tokio::signal::ctrl_c(), if !cancel.is_cancelled() => {
                cancel.cancel();
                continue;
            }
        };
        let Some(event) = event else { break };
        outcome.observe(&event);
        if let Some(text) = render(&event) {
            print!("{text}");
            let _ = std::io::stdout().flush();
        }
    }
    tracing::debug!(finish_reason = ?outcome.finish_reason, pending = outcome.pending.len(), "Turn stream closed");
    outcome
}

/// Terminal rendering of one event. Text deltas print inline, tool events
/// as one-line cards.
pub fn render(event: &UiStreamEvent) -> Option<String> {
    match event {
        UiStreamEvent::TextDelta { delta, .. } => Some(delta.clone()),
        UiStreamEvent::ToolInputAvailable { tool_name, input, .. } => {
            Some(format!("\n  ┌ {tool_name} {input}\n"))
        }
        UiStreamEvent::ToolOutputAvailable { output, .. } => {
            let text = match output {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            Some(format!("  └ {}\n", indent_card(&text)))
        }
        UiStreamEvent::ToolOutputError { error_text, .. } => Some(format!("  └ ✗ {error_text}\n")),
        UiStreamEvent::Error { error_text } => Some(format!("\n  [Error] {error_text}")),
        UiStreamEvent::Finish {
            finish_reason: FinishReason::StepCap,
            ..
        } => Some("\n  [stopped: step limit reached]".into()),
        UiStreamEvent::Finish {
            finish_reason: FinishReason::Cancelled,
            ..
        } => Some("\n  [cancelled]".into()),
        _ => None,
    }
}

fn indent_card(text: &str) -> String {
    text.trim_end().replace('\n', "\n    ")
}
