//! Per-turn tool gating.
//!
//! Tools are offered to the model only when the latest user message looks
//! like it asks for live data. The check is a whole-word, case-insensitive
//! keyword match over the message's first text part.

use regex::{Regex, RegexBuilder};
use toolweave_config::default_tool_keywords;
use toolweave_core::message::{Message, Role};
use toolweave_core::provider::ToolChoice;
use toolweave_core::tool::ToolRegistry;

/// The outcome of gating one turn.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GateDecision {
    pub enabled: bool,
    /// Tool names offered to the model. Empty when disabled.
    pub tools: Vec<String>,
    /// Keywords that matched, lowercased, in first-seen order.
    pub matched: Vec<String>,
}

impl GateDecision {
    pub fn tool_choice(&self) -> ToolChoice {
        if self.enabled {
            ToolChoice::Auto
        } else {
            ToolChoice::None
        }
    }
}

#[derive(Debug, Clone)]
pub struct ToolGate {
    matcher: Option<Regex>,
}

impl ToolGate {
    /// Build a gate from a keyword list. Blank keywords are ignored; a list
    /// with none left never enables tools.
    pub fn new<S: AsRef<str>>(keywords: &[S]) -> Result<Self, regex::Error> {
        let alternatives: Vec<String> = keywords
            .iter()
            .map(|k| k.as_ref().trim())
            .filter(|k| !k.is_empty())
            .map(regex::escape)
            .collect();
        if alternatives.is_empty() {
            return Ok(Self { matcher: None });
        }
        let pattern = format!(r"\b(?:{})\b", alternatives.join("|"));
        let matcher = RegexBuilder::new(&pattern).case_insensitive(true).build()?;
        Ok(Self {
            matcher: Some(matcher),
        })
    }

    /// Keywords found in `text`.
    pub fn matches(&self, text: &str) -> Vec<String> {
        let Some(matcher) = &self.matcher else {
            return Vec::new();
        };
        let mut found: Vec<String> = Vec::new();
        for m in matcher.find_iter(text) {
            let keyword = m.as_str().to_lowercase();
            if !found.contains(&keyword) {
                found.push(keyword);
            }
        }
        found
    }

    /// Decide whether this turn gets tools, from the last user message.
    pub fn evaluate(&self, messages: &[Message], tools: &ToolRegistry) -> GateDecision {
        let text = messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .and_then(Message::first_text)
            .unwrap_or_default();

        let matched = self.matches(text);
        if matched.is_empty() {
            return GateDecision::default();
        }
        GateDecision {
            enabled: true,
            tools: tools.names().into_iter().map(String::from).collect(),
            matched,
        }
    }
}

impl Default for ToolGate {
    fn default() -> Self {
        let keywords = default_tool_keywords();
        // Escaped literals always form a valid pattern.
        Self::new(keywords.as_slice()).unwrap_or(Self { matcher: None })
    }
}
