//! `subserver tools`: List the main server's MCP tools.

use subserver_config::AppConfig;
use subserver_gateway::AppState;

pub async fn run(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let url = config.main_server.url();
    let state = AppState::from_config(config)?;
    let tools = state
        .tools
        .list_tools()
        .await
        .map_err(|e| format!("Cannot list tools from {url}: {e}"))?;

    if tools.is_empty() {
        println!("No tools available from {url}");
        return Ok(());
    }

    println!("{} tools from {url}:", tools.len());
    for tool in &tools {
        let name = tool.name.as_deref().unwrap_or("(unnamed)");
        let description = tool.description.as_deref().unwrap_or_default();
        println!("  {name:<32} {description}");
        let args = tool.argument_keys();
        if !args.is_empty() {
            println!("  {:<32} args: {}", "", args.join(", "));
        }
    }
    Ok(())
}
