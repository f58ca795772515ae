//! `agentloom chat` — Interactive or single-message chat mode.

use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use agentloom_config::AppConfig;
use agentloom_memory::InMemoryMemoryService;
use agentloom_orchestrator::{HookedAgent, LlmAgent, Runner, SaveToMemoryHook};
use agentloom_providers::{GeminiProvider, RetryPolicy, RetryingProvider};
use agentloom_session::InMemorySessionService;

const ASSISTANT_INSTRUCTION: &str = "You are a helpful assistant. Store the user's name and \
     country with save_user_info when they share them, and retrieve them with get_user_info \
     when relevant. Use recall_memory when the user refers to earlier conversations. When \
     using other tools, check each tool's status field and explain any error clearly.";

fn build_runner(config: &AppConfig, api_key: &str) -> Runner {
    let policy = RetryPolicy {
        attempts: config.retry.attempts,
        exp_base: config.retry.exp_base,
        initial_delay: Duration::from_secs(config.retry.initial_delay_secs),
        retryable_status: config.retry.http_status_codes.clone(),
    };
    let provider = Arc::new(RetryingProvider::new(
        Arc::new(GeminiProvider::new(api_key, &config.model)),
        policy,
    ));

    let agent = LlmAgent::new("assistant", provider)
        .with_description("A general-purpose chat assistant")
        .with_instruction(ASSISTANT_INSTRUCTION)
        .with_tools(Arc::new(agentloom_tools::default_registry()))
        .with_output_key("last_answer");
    let hooked = HookedAgent::new(Arc::new(agent)).with_hook(Arc::new(SaveToMemoryHook));

    Runner::new(
        config.app_name.clone(),
        Arc::new(hooked),
        Arc::new(InMemorySessionService::new()),
    )
    .with_memory(Arc::new(InMemoryMemoryService::new()))
}

pub async fn run(
    message: Option<String>,
    user: &str,
    session: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;

    let api_key = match config.require_api_key() {
        Ok(key) => key.to_string(),
        Err(e) => {
            eprintln!();
            eprintln!("  ERROR: {e}");
            eprintln!();
            eprintln!("  Get a Gemini key at: https://aistudio.google.com/apikey");
            eprintln!();
            return Err(e.into());
        }
    };

    let runner = build_runner(&config, &api_key);

    if let Some(message) = message {
        let answer = runner.run(user, session, &message).await?;
        println!("{answer}");
        return Ok(());
    }

    println!("agentloom chat — model {} (type 'exit' to quit)", config.model);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();
    loop {
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if input == "exit" || input == "quit" {
            break;
        }

        match runner.run(user, session, input).await {
            Ok(answer) => println!("{answer}\n"),
            Err(e) => eprintln!("error: {e}\n"),
        }
    }

    Ok(())
}
