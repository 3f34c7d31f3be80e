//! `contextresizer doctor` — Diagnose configuration.

use contextresizer_config::{AppConfig, EmbeddingBackend};

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    println!("🩺 contextresizer Doctor — Configuration Diagnostics");
    println!("===================================================\n");

    let mut issues = 0;

    let config_path = AppConfig::config_dir().join("config.toml");
    if config_path.exists() {
        println!("  ✅ Config file found at {}", config_path.display());
    } else {
        println!("  ℹ️  No config file, using defaults ({})", config_path.display());
    }

    match AppConfig::load() {
        Ok(config) => {
            println!("  ✅ Config valid");

            if config.has_api_key() {
                println!("  ✅ API key configured");
            } else {
                println!(
                    "  ⚠️  No API key configured — set CONTEXTRESIZER_API_KEY or add api_key to config.toml"
                );
                issues += 1;
            }

            println!();
            println!("   Provider:     {}", config.default_provider);
            println!("   Summarizer:   {}", config.summarizer.model);
            match config.embedding.backend {
                EmbeddingBackend::Hashing => println!(
                    "   Ranking:      local hashing ({} dimensions)",
                    config.embedding.dimensions
                ),
                EmbeddingBackend::Provider => {
                    println!("   Ranking:      provider ({})", config.embedding.model)
                }
            }
            println!("   Max tokens:   {}", config.resize.max_tokens);
            println!("   Protected:    {}", config.resize.protected_roles.join(", "));
        }
        Err(e) => {
            println!("  ❌ Config invalid: {e}");
            issues += 1;
        }
    }

    println!();
    if issues == 0 {
        println!("  🎉 All checks passed!");
    } else {
        println!("  ⚠️  {issues} issue(s) found. See above for details.");
    }

    Ok(())
}
