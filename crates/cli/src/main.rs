//! Verdant CLI entry point.
//!
//! Commands:
//! - `onboard`: Write the default config
//! - `ask`: Route a single message through the orchestrator
//! - `chat`: Interactive session with in-memory history
//! - `classify`: Show the intent, selected images and chosen agent without executing it
//! - `agents`: List the registered agents

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "verdant",
    about = "Verdant garden assistant orchestration core",
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

    /// Send a single message
    Ask {
        /// The user message
        #[arg(short, long)]
        message: String,

        /// Attach an image (repeatable)
        #[arg(long = "image")]
        images: Vec<PathBuf>,

        /// JSON file with the prior conversation (an array of messages)
        #[arg(long)]
        history: Option<PathBuf>,

        /// Id of the agent that handled the previous turn
        #[arg(long)]
        agent: Option<String>,

        /// Print the full response as JSON
        #[arg(long)]
        json: bool,
    },

    /// Interactive chat
    Chat,

    /// Classify a message and show the routing decision
    Classify {
        /// The user message
        #[arg(short, long)]
        message: String,

        /// Attach an image (repeatable)
        #[arg(long = "image")]
        images: Vec<PathBuf>,
    },

    /// List registered agents
    Agents,
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
        Commands::Ask {
            message,
            images,
            history,
            agent,
            json,
        } => commands::ask::run(message, images, history, agent, json).await?,
        Commands::Chat => commands::chat::run().await?,
        Commands::Classify { message, images } => commands::classify::run(message, images).await?,
        Commands::Agents => commands::agents::run().await?,
    }

    Ok(())
}
