//! `subserver ask`: Run the agent once and print the answer.

use subserver_agent::RunConfig;
use subserver_config::AppConfig;
use subserver_core::message::Message;
use subserver_gateway::AppState;

pub async fn run(
    config: AppConfig,
    message: String,
    use_tools: bool,
    model: Option<String>,
    verbose: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let agent = config.agent.clone();
    let state = AppState::from_config(config)?;

    let run_config = RunConfig::builder(state.provider.clone(), state.tools.clone())
        .with_model(model.unwrap_or(agent.default_model.clone()))
        .with_temperature(agent.default_temperature)
        .with_max_tokens(agent.default_max_tokens)
        .with_max_steps(agent.max_steps)
        .with_max_tools(agent.max_tools)
        .with_verbose(agent.verbose || verbose)
        .with_tools_enabled(use_tools)
        .with_timeout(agent.request_timeout())
        .build()?;

    eprint!("  Thinking...");
    let outcome = subserver_agent::run_detailed(&[Message::user(message)], &run_config).await;
    eprint!("\r              \r");

    if verbose {
        for call in &outcome.tool_calls {
            eprintln!(
                "  [tool] {} {} -> {}",
                call.name,
                serde_json::Value::Object(call.arguments.clone()),
                call.observation
            );
        }
        eprintln!("  [{} steps, {:?}]", outcome.steps, outcome.termination);
    }
    println!("{}", outcome.answer);
    Ok(())
}
