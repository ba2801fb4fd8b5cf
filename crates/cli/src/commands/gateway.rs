//! `toolweave gateway` — Start the HTTP API server.

use toolweave_config::AppConfig;

pub async fn run(port_override: Option<u16>) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    if let Some(port) = port_override {
        config.gateway.port = port;
    }

    println!("Toolweave Gateway");
    println!("   Listening: http://{}:{}", config.gateway.host, config.gateway.port);
    println!("   Provider:  {} ({})", config.default_provider, config.default_model);
    if !config.has_api_key() {
        println!("   Warning:   no API key configured, /v1/status will report success=false");
    }

    toolweave_gateway::start(config).await?;

    Ok(())
}
