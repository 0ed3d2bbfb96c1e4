//! `todoclaw gateway`: start the HTTP API server.

use todoclaw_config::AppConfig;

pub async fn run(port_override: Option<u16>) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    if let Some(port) = port_override {
        config.gateway.port = port;
    }

    println!("TodoClaw Gateway");
    println!("   Listening: {}:{}", config.gateway.host, config.gateway.port);
    println!("   Store:     {}", config.store.backend);
    println!("   Origins:   {}", config.gateway.allowed_origins.join(", "));

    todoclaw_gateway::start(config).await?;

    Ok(())
}
