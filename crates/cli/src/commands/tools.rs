//! `toolweave tools` — List the registered tools.

use toolweave_config::AppConfig;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    let registry = toolweave_tools::default_registry(&config.tools);

    println!("Available tools ({}):", registry.len());
    for name in registry.names() {
        let Some(tool) = registry.get(name) else { continue };
        let mode = if tool.requires_confirmation() { "confirm" } else { "auto" };
        println!("  {name:<22} [{mode}]  {}", tool.description());
    }

    Ok(())
}
