use company_comparison_agent::{
    a2a::{A2aHandler, WebhookNotifier},
    agent::ComparisonAgent,
    api::start_server,
    config::AgentConfig,
    llm::GeminiClient,
    market_data::YahooFinanceProvider,
    tools::ToolRegistry,
};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenv::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = AgentConfig::from_env()?;

    if config.api_key.is_empty() {
        warn!("GOOGLE_API_KEY not set in .env, model calls will fail");
    }

    info!("Company Comparison Agent - API Server");
    info!("Port: {}", config.port);
    info!("Model: {}", config.model);

    // Create components
    let model = Arc::new(GeminiClient::new(
        config.api_key.clone(),
        &config.base_url,
        &config.model,
    )?);
    let provider = Arc::new(YahooFinanceProvider::new(&config.market_data_base_url)?);
    let registry = ToolRegistry::new(provider);

    let agent = ComparisonAgent::new(model, registry).with_max_iterations(config.max_iterations);
    let handler = Arc::new(A2aHandler::new(Arc::new(agent), WebhookNotifier::new()?));

    info!("Agent initialized, starting API server");

    start_server(handler, config.port).await?;

    Ok(())
}
