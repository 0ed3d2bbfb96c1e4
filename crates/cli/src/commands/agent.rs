//! `todoclaw agent`: one request, or an interactive session on stdin.

use std::io::Write;
use todoclaw_config::AppConfig;
use tokio::io::{AsyncBufReadExt, BufReader};

pub async fn run(message: Option<String>) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    if !config.has_api_key() {
        eprintln!();
        eprintln!("  ERROR: No API key configured!");
        eprintln!();
        eprintln!("  Set one of these environment variables:");
        eprintln!("    GEMINI_API_KEY=...       (default provider)");
        eprintln!("    OPENROUTER_API_KEY=...");
        eprintln!("    OPENAI_API_KEY=...");
        eprintln!("    TODOCLAW_API_KEY=...     (generic)");
        eprintln!();
        eprintln!("  Or add it to your config file:");
        eprintln!("    {}", AppConfig::config_dir().join("config.toml").display());
        eprintln!();
        return Err("No API key found. See above for setup instructions.".into());
    }

    let agent = todoclaw_gateway::build_agent(&config).await?;

    if let Some(msg) = message {
        eprint!("  Thinking...");
        let reply = agent.process_request(&msg).await;
        eprint!("\r              \r");
        println!("{reply}");
        return Ok(());
    }

    println!();
    println!("  TodoClaw, interactive mode");
    println!();
    println!("  Provider:  {}", config.default_provider);
    println!("  Model:     {}", config.default_model);
    println!("  Store:     {}", agent.store().name());
    println!();
    println!("  Tell me what to add, remove or list.");
    println!("  Type 'exit' or Ctrl+C to quit.");
    println!();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("  You > ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if matches!(input, "exit" | "quit") {
            break;
        }

        eprint!("  ...");
        let run = agent.run(input).await;
        eprint!("\r     \r");
        tracing::debug!(
            status = run.status.as_str(),
            iterations = run.iterations,
            "Request handled"
        );
        for line in run.message.lines() {
            println!("  TodoClaw > {line}");
        }
        println!();
    }

    println!();
    println!("  Goodbye!");
    println!();

    Ok(())
}
