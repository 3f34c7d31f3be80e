//! Provider router — builds providers from config and looks them up by name.

use crate::openai_compat::OpenAiCompatProvider;
use contextresizer_config::{AppConfig, ProviderConfig};
use contextresizer_core::error::ProviderError;
use contextresizer_core::provider::Provider;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Holds the configured providers and knows which one is the default.
pub struct ProviderRouter {
    providers: HashMap<String, Arc<dyn Provider>>,
    default_provider: String,
}

impl ProviderRouter {
    /// Create a new router with a default provider.
    pub fn new(default_provider: impl Into<String>) -> Self {
        Self {
            providers: HashMap::new(),
            default_provider: default_provider.into(),
        }
    }

    /// Register a provider.
    pub fn register(&mut self, name: impl Into<String>, provider: Arc<dyn Provider>) {
        self.providers.insert(name.into(), provider);
    }

    /// Get the default provider.
    pub fn default(&self) -> Option<Arc<dyn Provider>> {
        self.providers.get(&self.default_provider).cloned()
    }

    /// Get a specific provider by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Provider>> {
        self.providers.get(name).cloned()
    }

    /// List all registered provider names.
    pub fn list(&self) -> Vec<&str> {
        self.providers.keys().map(|s| s.as_str()).collect()
    }
}

/// Build the router from configuration.
///
/// Every `[providers.<name>]` entry is registered, and the default provider
/// is added from well-known URLs if it has no entry of its own. A provider
/// key falls back to the top-level `api_key`.
pub fn build_from_config(config: &AppConfig) -> Result<ProviderRouter, ProviderError> {
    let mut router = ProviderRouter::new(&config.default_provider);
    let timeout = Duration::from_secs(config.request_timeout_secs);

    for (name, entry) in &config.providers {
        let provider = connect(config, name, Some(entry), timeout)?;
        router.register(name.clone(), Arc::new(provider));
    }

    if router.get(&config.default_provider).is_none() {
        let provider = connect(config, &config.default_provider, None, timeout)?;
        router.register(config.default_provider.clone(), Arc::new(provider));
    }

    debug!(providers = ?router.list(), default = %config.default_provider, "Providers registered");
    Ok(router)
}

fn connect(
    config: &AppConfig,
    name: &str,
    entry: Option<&ProviderConfig>,
    timeout: Duration,
) -> Result<OpenAiCompatProvider, ProviderError> {
    let api_key = entry
        .and_then(|e| e.api_key.clone())
        .or_else(|| config.api_key.clone())
        .unwrap_or_default();

    let base_url = entry
        .and_then(|e| e.api_url.clone())
        .or_else(|| well_known_base_url(name).map(str::to_string))
        .ok_or_else(|| {
            ProviderError::NotConfigured(format!(
                "Provider '{name}' needs an api_url in [providers.{name}]"
            ))
        })?;

    OpenAiCompatProvider::with_timeout(name, base_url, api_key, timeout)
}

/// Base URLs of OpenAI-compatible services that need no `api_url`.
fn well_known_base_url(provider_name: &str) -> Option<&'static str> {
    match provider_name {
        "openai" => Some("https://api.openai.com/v1"),
        "openrouter" => Some("https://openrouter.ai/api/v1"),
        "ollama" => Some("http://localhost:11434/v1"),
        "groq" => Some("https://api.groq.com/openai/v1"),
        "together" => Some("https://api.together.xyz/v1"),
        "vllm" => Some("http://localhost:8000/v1"),
        _ => None,
    }
}
