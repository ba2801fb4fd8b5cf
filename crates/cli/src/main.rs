//! Toolweave CLI — the main entry point.
//!
//! Commands:
//! - `onboard`  — Write the default config file
//! - `chat`     — Interactive chat or single-message mode
//! - `gateway`  — Start the HTTP/SSE server
//! - `tools`    — List the registered tools

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "toolweave",
    about = "Toolweave — streaming LLM tool-call orchestration",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Write the default configuration
    Onboard,

    /// Chat with the assistant
    Chat {
        /// Send a single message instead of entering interactive mode
        #[arg(short, long)]
        message: Option<String>,
    },

    /// Start the HTTP gateway server
    Gateway {
        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// List available tools
    Tools,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Onboard => commands::onboard::run().await?,
        Commands::Chat { message } => commands::chat::run(message).await?,
        Commands::Gateway { port } => commands::gateway::run(port).await?,
        Commands::Tools => commands::tools::run().await?,
    }

    Ok(())
}
