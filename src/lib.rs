pub mod cli;
pub mod completion;
pub mod config;
pub mod connectivity;
pub mod console;
pub mod context;
pub mod controller;
pub mod error;
pub mod history;
pub mod llm;
pub mod models;
pub mod session;
pub mod status;

use cli::Args;
use completion::CompletionClient;
use connectivity::ConnectivitySignal;
use console::{ spawn_connectivity_watcher, Console };
use controller::ConversationController;
use log::info;
use std::error::Error;
use tokio::io::BufReader;

pub async fn run(args: Args) -> Result<(), Box<dyn Error + Send + Sync>> {
    let llm_config = args.llm_config()?;
    let policy = args.retry_policy();

    info!("--- Core Configuration ---");
    info!("Chat LLM Type: {}", llm_config.llm_type);
    info!("Chat Model: {}", llm_config.model());
    info!("Chat Endpoint: {}", llm_config.endpoint());
    info!("API Key Provided: {}", args.api_key.as_deref().map_or(false, |k| !k.trim().is_empty()));
    info!("Max Retries: {}", policy.max_retries);
    info!("Retry Base Delay: {:?}", policy.base_delay);
    info!("Request Timeout: {:?}", llm_config.request_timeout);
    info!("History Store Type: {}", args.history_type);
    info!("Data Directory: {}", args.data_dir.display());
    info!("Start Offline: {}", args.offline);
    info!("-------------------------");

    let settings = config::initialize_settings_store(&args.data_dir, args.api_key.as_deref()).await?;
    let conversations = history::initialize_conversation_store(
        &args.history_type,
        &args.data_dir
    ).await?;
    let transport = llm::chat::new_client(&llm_config)?;
    let client = CompletionClient::new(transport, policy);

    let connectivity = ConnectivitySignal::new(!args.offline);
    let watcher = spawn_connectivity_watcher(&connectivity);

    let mut controller = ConversationController::new(client, conversations, settings, connectivity);
    let mut console = Console::new(&mut controller, tokio::io::stdout());
    console.run(BufReader::new(tokio::io::stdin())).await?;

    watcher.abort();
    info!("Goodbye");
    Ok(())
}
