//! `subserver serve`: Start the HTTP server.

use subserver_config::AppConfig;

pub async fn run(
    mut config: AppConfig,
    host_override: Option<String>,
    port_override: Option<u16>,
) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(host) = host_override {
        config.server.host = host;
    }
    if let Some(port) = port_override {
        config.server.port = port;
    }

    println!("subserver {}", env!("CARGO_PKG_VERSION"));
    println!("   Listening:   {}:{}", config.server.host, config.server.port);
    println!("   Main server: {}", config.main_server.url());
    println!("   Agent:       {}", if config.agent.enabled { "enabled" } else { "disabled" });
    if !config.api.disabled.is_empty() {
        println!("   Disabled:    {}", config.api.disabled.join(", "));
    }

    subserver_gateway::serve(config).await
}
