use ledger_chat_assistant::{
    agent::{AssistantConfig, ChatOrchestrator},
    completion::CompletionClient,
    config::AppConfig,
    ledger::InMemoryLedger,
    memory::{ConversationMemory, TurnRole},
    models::ChatOutcome,
};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();

    // Logs go to stderr so they don't interleave with the conversation
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = AppConfig::from_env()?;
    info!("{} starting", config.name);

    let ledger = Arc::new(InMemoryLedger::new());
    let assistant = ChatOrchestrator::new(
        ConversationMemory::new(config.history_limit),
        Arc::new(CompletionClient::new(&config.completion)?),
        ledger.clone(),
        ledger.clone(),
        AssistantConfig::from(&config),
    );

    let mut stdout = tokio::io::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    stdout
        .write_all(b"Ledger assistant ready. Commands: /history, /summary, /quit\n")
        .await?;

    loop {
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };

        let output = match line.trim() {
            "" => continue,
            "/quit" | "/exit" => break,
            "/history" => {
                let mut out = String::new();
                for turn in assistant.history().await {
                    let who = match turn.role() {
                        TurnRole::User => "you",
                        TurnRole::Assistant => "assistant",
                    };
                    out.push_str(&format!(
                        "[{}] {}: {}\n",
                        turn.timestamp().format("%H:%M:%S"),
                        who,
                        turn.content()
                    ));
                }
                out
            }
            "/summary" => {
                let summary = ledger.summary().await;
                format!(
                    "Balance: {:.2} | Income: {:.2} | Expenses: {:.2} | Savings rate: {:.1}%\n",
                    summary.balance,
                    summary.monthly_income,
                    summary.monthly_expenses,
                    summary.savings_rate
                )
            }
            message => match assistant.process_message(message).await {
                ChatOutcome::Text { content } => format!("{}\n", content),
                ChatOutcome::Directive { content, directive } => format!(
                    "{}\n  -> {} '{}': {}\n",
                    content, directive.kind, directive.name, directive.description
                ),
            },
        };

        stdout.write_all(output.as_bytes()).await?;
    }

    info!("Goodbye");
    Ok(())
}
