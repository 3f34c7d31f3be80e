//! `contextresizer resize` — Resize a context from a file or stdin.

use clap::ValueEnum;
use contextresizer_config::{AppConfig, EmbeddingBackend};
use contextresizer_core::error::Error;
use contextresizer_core::message::Message;
use contextresizer_providers::build_from_config;
use contextresizer_resize::{ResizePipeline, build_pipeline};
use std::io::Read;
use std::path::PathBuf;

/// How the input is laid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum InputFormat {
    /// One message object per line
    Jsonl,
    /// An OpenAI chat-completion request body with a `messages` array
    Chat,
}

pub struct ResizeArgs {
    pub input: Option<PathBuf>,
    pub max_tokens: Option<f64>,
    pub format: InputFormat,
    pub offline: bool,
}

pub async fn run(args: ResizeArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| Error::Config {
        message: e.to_string(),
    })?;
    if !config.has_api_key() {
        tracing::warn!("No API key configured, over-budget messages will be kept verbatim");
    }

    let max_tokens = args.max_tokens.unwrap_or(config.resize.max_tokens);
    let input = read_input(args.input.as_ref())?;
    let pipeline = prepare(config, args.offline)?;

    let output = match args.format {
        InputFormat::Jsonl => pipeline.resize_context(&input, max_tokens).await?,
        InputFormat::Chat => resize_chat_body(&pipeline, &input, max_tokens).await?,
    };

    if !output.is_empty() {
        println!("{output}");
    }
    Ok(())
}

/// Apply command-line overrides to `config` and wire the pipeline.
fn prepare(mut config: AppConfig, offline: bool) -> contextresizer_core::Result<ResizePipeline> {
    if offline {
        config.embedding.backend = EmbeddingBackend::Hashing;
    }
    config.validate().map_err(|e| Error::Config {
        message: e.to_string(),
    })?;

    let router = build_from_config(&config)?;
    let provider = router.default().ok_or_else(|| Error::Config {
        message: format!("Provider '{}' is not available", config.default_provider),
    })?;
    Ok(build_pipeline(&config, provider))
}

fn read_input(path: Option<&PathBuf>) -> Result<String, Box<dyn std::error::Error>> {
    match path {
        Some(path) => std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read {}: {e}", path.display()).into()),
        None => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            Ok(buf)
        }
    }
}

/// Resize the `messages` array of a chat-completion request body and return
/// the whole body. Every other field is left as it was.
pub async fn resize_chat_body(
    pipeline: &ResizePipeline,
    body: &str,
    max_tokens: f64,
) -> Result<String, Box<dyn std::error::Error>> {
    let mut body: serde_json::Value = serde_json::from_str(body)?;

    let raw = body
        .get_mut("messages")
        .map(serde_json::Value::take)
        .ok_or("Request body has no 'messages' field")?;
    let messages: Vec<Message> = serde_json::from_value(raw)
        .map_err(|e| format!("Invalid 'messages' array: {e}"))?;

    let resized = pipeline.resize(&messages, max_tokens).await?;
    body["messages"] = serde_json::to_value(&resized.messages)?;

    Ok(serde_json::to_string(&body)?)
}
