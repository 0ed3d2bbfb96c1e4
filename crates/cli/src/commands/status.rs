//! `todoclaw status`: show configuration and store health.

use todoclaw_config::AppConfig;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    println!("TodoClaw Status");
    println!("===============");
    println!("  Config dir:     {}", AppConfig::config_dir().display());
    println!("  Provider:       {}", config.default_provider);
    println!("  Model:          {}", config.default_model);
    println!("  Temperature:    {}", config.default_temperature);
    println!("  API key:        {}", if config.has_api_key() { "set" } else { "missing" });
    println!("  Max iterations: {}", config.agent.max_iterations);
    println!("  Store:          {}", config.store.backend);
    println!("  Gateway:        {}:{}", config.gateway.host, config.gateway.port);

    match todoclaw_store::build_from_config(&config.store).await {
        Ok(store) => match store.count().await {
            Ok(n) => println!("  Todos:          {n}"),
            Err(e) => println!("  Todos:          unavailable ({e})"),
        },
        Err(e) => println!("  Todos:          store unreachable ({e})"),
    }

    let config_path = AppConfig::config_dir().join("config.toml");
    if config_path.exists() {
        println!("\n  Config file found");
    } else {
        println!("\n  No config file, run `todoclaw onboard` first");
    }

    Ok(())
}
