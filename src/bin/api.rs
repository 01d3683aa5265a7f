use ledger_chat_assistant::{
    agent::{AssistantConfig, ChatOrchestrator},
    api::{start_server, ApiState},
    completion::CompletionClient,
    config::AppConfig,
    ledger::InMemoryLedger,
    memory::ConversationMemory,
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
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::from_env()?;

    if config.completion.api_key.is_none() {
        warn!("⚠️  COMPLETION_API_KEY not set; chat replies will fall back to the error message");
    }

    info!("🚀 {} - API Server", config.name);
    info!("📍 Port: {}", config.port);
    info!("🤖 Model: {} @ {}", config.completion.model, config.completion.base_url);

    // Create components
    let memory = ConversationMemory::new(config.history_limit);
    let ledger = Arc::new(InMemoryLedger::new());
    let completion = Arc::new(CompletionClient::new(&config.completion)?);

    let assistant = Arc::new(ChatOrchestrator::new(
        memory,
        completion,
        ledger.clone(),
        ledger.clone(),
        AssistantConfig::from(&config),
    ));

    info!("✅ Assistant initialized");
    info!("📡 Starting API server...");

    let state = ApiState {
        assistant,
        ledger,
        max_transactions_in_list: config.max_transactions_in_list,
    };

    start_server(state, config.port).await?;

    Ok(())
}
