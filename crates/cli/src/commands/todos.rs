//! `todoclaw todos`: print the stored todos.

use todoclaw_config::AppConfig;

pub async fn run(json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    let store = todoclaw_store::build_from_config(&config.store).await?;
    let todos = store.list().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&todos)?);
        return Ok(());
    }

    if todos.is_empty() {
        println!("No todos found");
        return Ok(());
    }

    for todo in &todos {
        println!("{:>4}  {}", todo.id, todo.task);
    }

    Ok(())
}
