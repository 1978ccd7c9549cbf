use company_comparison_agent::{
    agent::ComparisonAgent,
    config::AgentConfig,
    llm::GeminiClient,
    market_data::YahooFinanceProvider,
    models::ConversationHistory,
    tools::ToolRegistry,
};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let query = std::env::args().skip(1).collect::<Vec<_>>().join(" ");
    if query.trim().is_empty() {
        eprintln!("usage: compare <question>");
        eprintln!("example: compare \"How does Tesla compare to Ford?\"");
        std::process::exit(2);
    }

    let config = AgentConfig::from_env()?;

    let model = Arc::new(GeminiClient::new(
        config.api_key.clone(),
        &config.base_url,
        &config.model,
    )?);
    let provider = Arc::new(YahooFinanceProvider::new(&config.market_data_base_url)?);
    let agent = ComparisonAgent::new(model, ToolRegistry::new(provider))
        .with_max_iterations(config.max_iterations);

    info!(query = %query, "Running comparison");

    let (answer, _) = agent.run(ConversationHistory::new(), &query).await;
    println!("{}", answer);

    Ok(())
}
