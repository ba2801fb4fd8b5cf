//! Configuration loading, validation, and management for Toolweave.
//!
//! Loads configuration from `~/.toolweave/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.toolweave/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// API key (can be overridden per-provider)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Default LLM provider
    #[serde(default = "default_provider")]
    pub default_provider: String,

    /// Default model
    #[serde(default = "default_model")]
    pub default_model: String,

    /// Default temperature
    #[serde(default = "default_temperature")]
    pub default_temperature: f32,

    /// Default max tokens per model step
    #[serde(default = "default_max_tokens")]
    pub default_max_tokens: u32,

    /// Provider-specific configurations
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,

    /// Gateway configuration
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Turn pipeline settings
    #[serde(default)]
    pub agent: AgentConfig,

    /// Data-source adapter settings
    #[serde(default)]
    pub tools: ToolsConfig,
}

fn default_provider() -> String {
    "workers-ai".into()
}
fn default_model() -> String {
    "@cf/meta/llama-3.3-70b-instruct-fp8-fast".into()
}
fn default_temperature() -> f32 {
    0.7
}
fn default_max_tokens() -> u32 {
    1024
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("default_provider", &self.default_provider)
            .field("default_model", &self.default_model)
            .field("default_temperature", &self.default_temperature)
            .field("default_max_tokens", &self.default_max_tokens)
            .field("providers", &self.providers)
            .field("gateway", &self.gateway)
            .field("agent", &self.agent)
            .field("tools", &self.tools)
            .finish()
    }
}

#[derive(Clone, Default, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    /// Cloudflare account id (Workers AI only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_id: Option<String>,
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .field("account_id", &self.account_id)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_host")]
    pub host: String,
}

fn default_port() -> u16 {
    8787
}
fn default_host() -> String {
    "127.0.0.1".into()
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Model/tool round-trips allowed per turn
    #[serde(default = "default_max_steps")]
    pub max_steps: u32,

    /// Override the built-in system prompt
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,

    /// Intent keywords that enable tools for a turn
    #[serde(default = "default_tool_keywords")]
    pub tool_keywords: Vec<String>,
}

fn default_max_steps() -> u32 {
    10
}

pub fn default_tool_keywords() -> Vec<String> {
    [
        "weather", "time", "fact", "color", "palette", "temperature", "humidity", "nasa",
        "space", "astronomy", "picture", "apod", "stock", "share", "market", "price", "ticker",
        "country", "countries", "population", "currency", "flag", "nation", "chart", "graph",
        "plot", "visualize", "bar", "line", "pie", "data", "about", "info", "information",
        "tell me",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_steps: default_max_steps(),
            system_prompt: None,
            tool_keywords: default_tool_keywords(),
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    #[serde(default = "default_nasa_api_key")]
    pub nasa_api_key: String,

    #[serde(default = "default_stock_api_key")]
    pub stock_api_key: String,

    /// Per-request timeout for adapter HTTP calls
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,
}

fn default_nasa_api_key() -> String {
    "DEMO_KEY".into()
}
fn default_stock_api_key() -> String {
    "demo".into()
}
fn default_http_timeout_secs() -> u64 {
    15
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            nasa_api_key: default_nasa_api_key(),
            stock_api_key: default_stock_api_key(),
            http_timeout_secs: default_http_timeout_secs(),
        }
    }
}

impl std::fmt::Debug for ToolsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolsConfig")
            .field("nasa_api_key", &"[REDACTED]")
            .field("stock_api_key", &"[REDACTED]")
            .field("http_timeout_secs", &self.http_timeout_secs)
            .finish()
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.toolweave/config.toml).
    ///
    /// Environment overrides:
    /// - `TOOLWEAVE_API_KEY` (then `OPENAI_API_KEY`) when no key is configured
    /// - `TOOLWEAVE_PROVIDER`, `TOOLWEAVE_MODEL`
    /// - `TOOLWEAVE_BASE_URL` for the default provider's endpoint
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides through a lookup function.
    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if self.api_key.is_none() {
            self.api_key = lookup("TOOLWEAVE_API_KEY").or_else(|| lookup("OPENAI_API_KEY"));
        }

        if let Some(provider) = lookup("TOOLWEAVE_PROVIDER") {
            self.default_provider = provider;
        }

        if let Some(model) = lookup("TOOLWEAVE_MODEL") {
            self.default_model = model;
        }

        if let Some(url) = lookup("TOOLWEAVE_BASE_URL") {
            self.providers
                .entry(self.default_provider.clone())
                .or_default()
                .api_url = Some(url);
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".toolweave")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_temperature < 0.0 || self.default_temperature > 2.0 {
            return Err(ConfigError::ValidationError(
                "default_temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if self.agent.max_steps == 0 {
            return Err(ConfigError::ValidationError(
                "agent.max_steps must be at least 1".into(),
            ));
        }

        if self.agent.tool_keywords.iter().all(|k| k.trim().is_empty()) {
            return Err(ConfigError::ValidationError(
                "agent.tool_keywords must contain at least one keyword".into(),
            ));
        }

        Ok(())
    }

    /// Check if an API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
            || self
                .providers
                .get(&self.default_provider)
                .is_some_and(|p| p.api_key.is_some())
    }

    /// Generate a default config TOML string (for `onboard` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            default_provider: default_provider(),
            default_model: default_model(),
            default_temperature: default_temperature(),
            default_max_tokens: default_max_tokens(),
            providers: HashMap::new(),
            gateway: GatewayConfig::default(),
            agent: AgentConfig::default(),
            tools: ToolsConfig::default(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
