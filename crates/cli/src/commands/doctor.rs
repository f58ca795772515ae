//! `agentloom doctor` — Diagnose configuration problems.

use agentloom_config::AppConfig;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    println!("agentloom doctor");
    println!("================\n");

    let mut issues = 0;

    let config_path = AppConfig::config_dir().join("config.toml");
    if config_path.exists() {
        println!("  ok  config file found at {}", config_path.display());
    } else {
        println!(
            "  --  no config file at {} (defaults apply)",
            config_path.display()
        );
    }

    match AppConfig::load() {
        Ok(config) => {
            println!("  ok  configuration valid");
            println!("  ok  model: {}", config.model);
            println!(
                "  ok  retry: {} attempts, base {}, initial delay {}s",
                config.retry.attempts, config.retry.exp_base, config.retry.initial_delay_secs
            );

            if config.require_api_key().is_ok() {
                println!("  ok  API key configured");
            } else {
                println!(
                    "  !!  no API key — set AGENTLOOM_API_KEY, GOOGLE_API_KEY, or GEMINI_API_KEY"
                );
                issues += 1;
            }
        }
        Err(e) => {
            println!("  !!  configuration invalid: {e}");
            issues += 1;
        }
    }

    println!();
    if issues == 0 {
        println!("No issues found.");
        Ok(())
    } else {
        println!("{issues} issue(s) found.");
        Err(format!("{issues} issue(s) found").into())
    }
}
