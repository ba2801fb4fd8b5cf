//! Random fact tool — uselessfacts API with a built-in fallback list.

use async_trait::async_trait;
use rand::Rng;
use serde::Deserialize;
use toolweave_core::error::ToolError;
use toolweave_core::tool::Tool;
use tracing::warn;

use crate::http::HttpClient;
use crate::parse_args;

const NAME: &str = "getRandomFact";
const API: &str = "https://uselessfacts.jsph.pl/api/v2/facts/random?language=en";

pub const FALLBACK_FACTS: &[&str] = &[
    "🐙 Octopuses have three hearts and blue blood!",
    "🌍 The Earth's core is as hot as the surface of the Sun!",
    "🐝 Honey never spoils. Archaeologists have found 3000-year-old honey in Egyptian tombs that's still edible!",
    "🧠 The human brain uses about 20% of the body's energy despite being only 2% of body mass!",
    "🌌 There are more stars in the universe than grains of sand on all of Earth's beaches!",
    "🦒 A giraffe's tongue can be up to 20 inches long and is blue-black in color!",
    "💎 Diamonds rain on Jupiter and Saturn!",
    "🐌 A snail can sleep for three years!",
];

pub struct RandomFactTool {
    http: HttpClient,
}

impl RandomFactTool {
    pub fn new(http: HttpClient) -> Self {
        Self { http }
    }
}

/// The category is accepted for the model's benefit; the upstream API has
/// no category filter.
#[derive(Deserialize)]
struct Input {
    #[serde(default)]
    #[allow(dead_code)]
    category: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct FactResponse {
    pub text: String,
    #[serde(default)]
    pub source: Option<String>,
}

#[async_trait]
impl Tool for RandomFactTool {
    fn name(&self) -> &str {
        NAME
    }

    fn description(&self) -> &str {
        "Get a random interesting fact about science, history, nature, or general knowledge"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "category": {
                    "type": "string",
                    "enum": ["random", "science", "history", "nature"],
                    "description": "Category of fact to retrieve"
                }
            }
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<serde_json::Value, ToolError> {
        let _input: Input = parse_args(arguments)?;

        let text = match self.http.get_json::<FactResponse>(NAME, API).await {
            Ok(fact) => format_fact(&fact),
            Err(e) => {
                warn!(tool = NAME, error = %e, "Facts API failed, using fallback");
                let pick = rand::rng().random_range(0..FALLBACK_FACTS.len());
                format_fallback(FALLBACK_FACTS[pick])
            }
        };
        Ok(serde_json::Value::String(text))
    }
}

pub fn format_fact(fact: &FactResponse) -> String {
    let mut text = format!("💡 **Interesting Fact:**\n\n{}", fact.text);
    if let Some(source) = &fact.source {
        text.push_str(&format!("\n\n📚 Source: {source}"));
    }
    text
}

pub fn format_fallback(fact: &str) -> String {
    format!("💡 **Interesting Fact:**\n\n{fact}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_api_fact_with_source() {
        let fact: FactResponse = serde_json::from_str(
            r#"{"id":"abc","text":"Bananas are berries.","source":"djtech.net","language":"en"}"#,
        )
        .unwrap();
        let text = format_fact(&fact);
        assert!(text.starts_with("💡 **Interesting Fact:**\n\nBananas are berries."));
        assert!(text.ends_with("📚 Source: djtech.net"));
    }

    #[test]
    fn formats_fact_without_source() {
        let fact = FactResponse {
            text: "Cats sleep a lot.".into(),
            source: None,
        };
        assert!(!format_fact(&fact).contains("Source"));
    }

    #[test]
    fn fallback_uses_the_same_header() {
        let text = format_fallback(FALLBACK_FACTS[0]);
        assert_eq!(text, "💡 **Interesting Fact:**\n\n🐙 Octopuses have three hearts and blue blood!");
    }
}
