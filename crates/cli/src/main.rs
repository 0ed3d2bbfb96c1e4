//! TodoClaw CLI: manage todos in plain language.

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(
    name = "todoclaw",
    about = "TodoClaw: a todo list you talk to",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default config file
    Onboard,

    /// Talk to the agent (single message or interactive)
    Agent {
        /// Single request to process, then exit
        #[arg(short, long)]
        message: Option<String>,
    },

    /// Start the HTTP gateway
    Gateway {
        /// Override the configured port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Print the stored todos without calling the model
    Todos {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show configuration and store status
    Status,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    if cli.json_logs {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .init();
    }

    match cli.command {
        Commands::Onboard => commands::onboard::run().await?,
        Commands::Agent { message } => commands::agent::run(message).await?,
        Commands::Gateway { port } => commands::gateway::run(port).await?,
        Commands::Todos { json } => commands::todos::run(json).await?,
        Commands::Status => commands::status::run().await?,
    }

    Ok(())
}
