//! Provider router — selects the correct LLM provider based on config.
//!
//! Handles provider creation and routing requests to the right backend.

use std::collections::HashMap;
use std::sync::Arc;
use toolweave_config::{AppConfig, ProviderConfig};
use toolweave_core::provider::Provider;
use crate::openai_compat::{OpenAiCompatProvider, workers_ai_base_url};

/// Routes LLM requests to the correct provider.
pub struct ProviderRouter {
    providers: HashMap<String, Arc<dyn Provider>>,
    default_provider: String,
}

impl ProviderRouter {
    /// Create a new router with a default provider.
    pub fn new(default_provider: impl Into<String>) -> Self {
        Self {
            providers: HashMap::new(),
            default_provider: default_provider.into(),
        }
    }

    /// Register a provider.
    pub fn register(&mut self, name: impl Into<String>, provider: Arc<dyn Provider>) {
        self.providers.insert(name.into(), provider);
    }

    /// Get the default provider.
    pub fn default(&self) -> Option<Arc<dyn Provider>> {
        self.providers.get(&self.default_provider).cloned()
    }

    pub fn default_name(&self) -> &str {
        &self.default_provider
    }

    /// Get a specific provider by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Provider>> {
        self.providers.get(name).cloned()
    }

    /// List all registered provider names, sorted.
    pub fn list(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.providers.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }
}

/// Build providers from configuration.
pub fn build_from_config(config: &AppConfig) -> ProviderRouter {
    let mut router = ProviderRouter::new(&config.default_provider);

    for (name, provider_config) in &config.providers {
        router.register(name.clone(), build_one(name, provider_config, config));
    }

    // Ensure the default provider exists (even if not explicitly configured)
    if router.get(&config.default_provider).is_none() {
        let provider = build_one(&config.default_provider, &ProviderConfig::default(), config);
        router.register(config.default_provider.clone(), provider);
    }

    router
}

fn build_one(name: &str, provider_config: &ProviderConfig, config: &AppConfig) -> Arc<dyn Provider> {
    let api_key = provider_config
        .api_key
        .clone()
        .or_else(|| config.api_key.clone())
        .unwrap_or_default();

    let base_url = provider_config
        .api_url
        .clone()
        .unwrap_or_else(|| default_base_url(name, provider_config.account_id.as_deref()));

    Arc::new(OpenAiCompatProvider::new(name, base_url, api_key))
}

/// Get the default base URL for well-known providers.
fn default_base_url(provider_name: &str, account_id: Option<&str>) -> String {
    match provider_name {
        "workers-ai" => {
            let account = account_id
                .map(String::from)
                .or_else(|| std::env::var("CLOUDFLARE_ACCOUNT_ID").ok())
                .unwrap_or_default();
            workers_ai_base_url(&account)
        }
        "openrouter" => "https://openrouter.ai/api/v1".into(),
        "openai" => "https://api.openai.com/v1".into(),
        "ollama" => "http://localhost:11434/v1".into(),
        "groq" => "https://api.groq.com/openai/v1".into(),
        "together" => "https://api.together.xyz/v1".into(),
        "vllm" => "http://localhost:8000/v1".into(),
        _ => format!("https://{provider_name}.api.example.com/v1"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn router_register_and_lookup() {
        let mut router = ProviderRouter::new("openrouter");
        let provider = Arc::new(OpenAiCompatProvider::openrouter("sk-test"));
        router.register("openrouter", provider);

        assert!(router.get("openrouter").is_some());
        assert!(router.get("nonexistent").is_none());
        assert!(router.default().is_some());
    }

    #[test]
    fn default_base_urls() {
        assert!(default_base_url("openai", None).contains("api.openai.com"));
        assert!(default_base_url("ollama", None).contains("localhost:11434"));
        assert!(default_base_url("workers-ai", Some("abc")).contains("/accounts/abc/ai/v1"));
    }

    #[test]
    fn build_from_default_config() {
        let config = AppConfig::default();
        let router = build_from_config(&config);
        assert_eq!(router.default_name(), "workers-ai");
        assert!(router.default().is_some());
    }

    #[test]
    fn configured_providers_are_registered() {
        let mut config = AppConfig::default();
        config.providers.insert(
            "ollama".into(),
            ProviderConfig {
                api_url: Some("http://gpu-box:11434/v1".into()),
                ..ProviderConfig::default()
            },
        );
        let router = build_from_config(&config);
        assert_eq!(router.list(), vec!["ollama", "workers-ai"]);
    }
}
