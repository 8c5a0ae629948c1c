use anyhow::{Context, Result};
use gonggamtoon::core::cancel::CancellationToken;
use gonggamtoon::core::config::Config;
use gonggamtoon::services::llm::create_llm;
use gonggamtoon::services::workflow::GenerationManager;
use log::info;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    // 1. Load Config
    let config = match Config::load() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Error loading config: {}", e);
            eprintln!("Please ensure 'config.yml' exists with valid LLM settings.");
            return Err(e);
        }
    };

    // 2. Initialize LLM
    let llm = create_llm(&config.llm).context("Failed to initialize LLM backend")?;
    let manager = GenerationManager::new(llm, config.llm.retry_policy());

    // 3. Ctrl-C cancels the running attempt
    let token = CancellationToken::new();
    {
        let token = token.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                token.cancel();
            }
        });
    }

    // 4. Generate
    let outcome = match manager.generate(&config.generation, &token).await {
        Ok(outcome) => outcome,
        Err(e) => {
            if let Some(message) = e.user_message() {
                eprintln!("{}", message);
                return Err(e.into());
            }
            info!("Generation cancelled");
            return Ok(());
        }
    };

    info!("Seed: {}", outcome.seed);
    println!("{}", serde_json::to_string_pretty(&outcome.stories)?);
    for (i, prompt) in outcome.prompts.iter().enumerate() {
        println!("\n##### {} / {} #####\n", i + 1, outcome.prompts.len());
        println!("{}", prompt);
    }

    Ok(())
}
