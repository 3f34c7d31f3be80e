//! Configuration loading, validation, and management for contextresizer.
//!
//! Loads configuration from `~/.contextresizer/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.contextresizer/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// API key (can be overridden per-provider)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Provider used for summaries and, when enabled, embeddings
    #[serde(default = "default_provider")]
    pub default_provider: String,

    /// HTTP request timeout for provider calls
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Resizing behaviour
    #[serde(default)]
    pub resize: ResizeConfig,

    /// Summarization service settings
    #[serde(default)]
    pub summarizer: SummarizerConfig,

    /// Similarity backend settings
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    /// Provider-specific configurations
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
}

fn default_provider() -> String {
    "openai".into()
}
fn default_request_timeout_secs() -> u64 {
    120
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("default_provider", &self.default_provider)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("resize", &self.resize)
            .field("summarizer", &self.summarizer)
            .field("embedding", &self.embedding)
            .field("providers", &self.providers)
            .finish()
    }
}

/// How a resizable message finds its rank in the relevance ordering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RankBy {
    /// Look up by content value; identical strings share one rank.
    #[default]
    Content,
    /// Look up by message identity; every message has its own rank.
    Position,
}

/// What to do when the similarity backend fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RankFailurePolicy {
    /// Abort the resize with an error.
    #[default]
    Fail,
    /// Treat the input order as the relevance order.
    OriginalOrder,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResizeConfig {
    /// Token budget used when the caller does not supply one
    #[serde(default = "default_max_tokens")]
    pub max_tokens: f64,

    /// Messages whose budget truncates below this are left as-is
    #[serde(default = "default_min_budget")]
    pub min_budget: usize,

    /// Roles that are never resized
    #[serde(default = "default_protected_roles")]
    pub protected_roles: Vec<String>,

    #[serde(default = "default_chars_per_token")]
    pub chars_per_token: usize,

    /// Maximum concurrent summarization calls per resize
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    #[serde(default)]
    pub rank_by: RankBy,

    #[serde(default)]
    pub on_rank_failure: RankFailurePolicy,
}

fn default_max_tokens() -> f64 {
    1000.0
}
fn default_min_budget() -> usize {
    5
}
fn default_protected_roles() -> Vec<String> {
    vec!["developer".into()]
}
fn default_chars_per_token() -> usize {
    4
}
fn default_concurrency() -> usize {
    4
}

impl Default for ResizeConfig {
    fn default() -> Self {
        Self {
            max_tokens: default_max_tokens(),
            min_budget: default_min_budget(),
            protected_roles: default_protected_roles(),
            chars_per_token: default_chars_per_token(),
            concurrency: default_concurrency(),
            rank_by: RankBy::default(),
            on_rank_failure: RankFailurePolicy::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummarizerConfig {
    #[serde(default = "default_summarizer_model")]
    pub model: String,

    #[serde(default = "default_summarizer_temperature")]
    pub temperature: f32,
}

fn default_summarizer_model() -> String {
    "gpt-4.1-nano".into()
}
fn default_summarizer_temperature() -> f32 {
    0.3
}

impl Default for SummarizerConfig {
    fn default() -> Self {
        Self {
            model: default_summarizer_model(),
            temperature: default_summarizer_temperature(),
        }
    }
}

/// Which embedding backend feeds the similarity index.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmbeddingBackend {
    /// Local feature-hashing embedder, no network access.
    #[default]
    Hashing,
    /// The default provider's `/embeddings` endpoint.
    Provider,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    #[serde(default)]
    pub backend: EmbeddingBackend,

    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// Vector width of the hashing embedder
    #[serde(default = "default_dimensions")]
    pub dimensions: usize,
}

fn default_embedding_model() -> String {
    "text-embedding-3-small".into()
}
fn default_dimensions() -> usize {
    256
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            backend: EmbeddingBackend::default(),
            model: default_embedding_model(),
            dimensions: default_dimensions(),
        }
    }
}

#[derive(Clone, Default, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .finish()
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.contextresizer/config.toml).
    ///
    /// Also checks environment variables for API keys:
    /// - `CONTEXTRESIZER_API_KEY` (highest priority)
    /// - `OPENAI_API_KEY`
    /// - `OPENROUTER_API_KEY`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if self.api_key.is_none() {
            self.api_key = std::env::var("CONTEXTRESIZER_API_KEY")
                .ok()
                .or_else(|| std::env::var("OPENAI_API_KEY").ok())
                .or_else(|| std::env::var("OPENROUTER_API_KEY").ok());
        }

        if let Ok(provider) = std::env::var("CONTEXTRESIZER_PROVIDER") {
            self.default_provider = provider;
        }

        if let Ok(raw) = std::env::var("CONTEXTRESIZER_MAX_TOKENS") {
            self.resize.max_tokens = raw.trim().parse().map_err(|_| {
                ConfigError::ValidationError(format!(
                    "CONTEXTRESIZER_MAX_TOKENS must be a number, got '{raw}'"
                ))
            })?;
        }

        Ok(())
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".contextresizer")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.resize.chars_per_token == 0 {
            return Err(ConfigError::ValidationError(
                "resize.chars_per_token must be > 0".into(),
            ));
        }

        if self.resize.concurrency == 0 {
            return Err(ConfigError::ValidationError(
                "resize.concurrency must be > 0".into(),
            ));
        }

        if self.embedding.dimensions == 0 {
            return Err(ConfigError::ValidationError(
                "embedding.dimensions must be > 0".into(),
            ));
        }

        if self.summarizer.model.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "summarizer.model must not be empty".into(),
            ));
        }

        if !(0.0..=2.0).contains(&self.summarizer.temperature) {
            return Err(ConfigError::ValidationError(
                "summarizer.temperature must be between 0.0 and 2.0".into(),
            ));
        }

        Ok(())
    }

    /// Check if an API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
            || self
                .providers
                .get(&self.default_provider)
                .is_some_and(|p| p.api_key.is_some())
    }

    /// Generate a default config TOML string (for the `config` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            default_provider: default_provider(),
            request_timeout_secs: default_request_timeout_secs(),
            resize: ResizeConfig::default(),
            summarizer: SummarizerConfig::default(),
            embedding: EmbeddingConfig::default(),
            providers: HashMap::new(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
