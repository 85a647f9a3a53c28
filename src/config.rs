use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;

/// Application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub registry: RegistrySettings,
    pub embedding: EmbeddingSettings,
    #[serde(default)]
    pub matching: MatchingSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub workers: Option<usize>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegistrySettings {
    #[serde(default = "default_registry_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    #[serde(default = "default_registry_timeout")]
    pub timeout_secs: u64,
}

fn default_registry_endpoint() -> String {
    "https://clinicaltrials.gov/api/v2/studies".to_string()
}
fn default_page_size() -> u32 {
    100
}
fn default_registry_timeout() -> u64 {
    30
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmbeddingSettings {
    #[serde(default = "default_embedding_endpoint")]
    pub endpoint: String,
    pub api_key: String,
    #[serde(default = "default_embedding_model")]
    pub model: String,
    #[serde(default = "default_cache_size")]
    pub cache_size: u64,
}

fn default_embedding_endpoint() -> String {
    "https://api.openai.com/v1/embeddings".to_string()
}
fn default_embedding_model() -> String {
    "text-embedding-3-small".to_string()
}
fn default_cache_size() -> u64 {
    10_000
}

#[derive(Debug, Clone, Deserialize)]
pub struct MatchingSettings {
    #[serde(default = "default_top_n")]
    pub top_n: usize,
    #[serde(default = "default_relevance_weight")]
    pub relevance_weight: f64,
    #[serde(default = "default_proximity_reference_km")]
    pub proximity_reference_km: f64,
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
    #[serde(default = "default_strategy")]
    pub strategy: String,
    pub timeout_secs: Option<u64>,
}

impl Default for MatchingSettings {
    fn default() -> Self {
        Self {
            top_n: default_top_n(),
            relevance_weight: default_relevance_weight(),
            proximity_reference_km: default_proximity_reference_km(),
            max_concurrency: default_max_concurrency(),
            strategy: default_strategy(),
            timeout_secs: None,
        }
    }
}

fn default_top_n() -> usize {
    10
}
fn default_relevance_weight() -> f64 {
    0.7
}
fn default_proximity_reference_km() -> f64 {
    100.0
}
fn default_max_concurrency() -> usize {
    8
}
fn default_strategy() -> String {
    "blended".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_format() -> String {
    "json".to_string()
}

impl Settings {
    /// Load configuration from file and environment variables
    ///
    /// Configuration is loaded in the following order (later overrides earlier):
    /// 1. Default values in the struct
    /// 2. Configuration file (config/default.toml)
    /// 3. Environment variables (prefixed with TRIALMATCH__)
    pub fn load() -> Result<Self, ConfigError> {
        let mut settings = Config::builder()
            // Add default config file
            .add_source(File::with_name("config/default").required(false))
            // Add local config file (for development overrides)
            .add_source(File::with_name("config/local").required(false))
            // Add environment variables (prefixed with TRIALMATCH__)
            // e.g., TRIALMATCH__SERVER__PORT -> server.port
            .add_source(
                Environment::with_prefix("TRIALMATCH")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        settings = apply_env_overrides(settings)?;

        settings.try_deserialize()
    }

    /// Load configuration from a custom path
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::from(path.as_ref()))
            .add_source(
                Environment::with_prefix("TRIALMATCH")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        settings.try_deserialize()
    }

    pub fn match_config(&self) -> crate::models::MatchConfig {
        crate::models::MatchConfig {
            top_n: self.matching.top_n,
            relevance_weight: self.matching.relevance_weight,
            proximity_reference_km: self.matching.proximity_reference_km,
            max_concurrency: self.matching.max_concurrency,
            strategy: self.matching.ranking_strategy(),
            timeout: self
                .matching
                .timeout_secs
                .map(std::time::Duration::from_secs),
        }
    }
}

impl MatchingSettings {
    pub fn ranking_strategy(&self) -> crate::models::RankingStrategy {
        match self.strategy.as_str() {
            "similarity_only" => crate::models::RankingStrategy::SimilarityOnly,
            "proximity_only" => crate::models::RankingStrategy::ProximityOnly,
            _ => crate::models::RankingStrategy::Blended,
        }
    }
}

/// Apply conventional environment variables that override config values.
/// EMBEDDING_API_KEY (or OPENAI_API_KEY) takes precedence over any file value.
fn apply_env_overrides(settings: Config) -> Result<Config, ConfigError> {
    use std::env;

    let api_key = env::var("EMBEDDING_API_KEY")
        .or_else(|_| env::var("OPENAI_API_KEY"))
        .or_else(|_| env::var("TRIALMATCH_EMBEDDING__API_KEY"))
        .unwrap_or_default();

    let mut builder = Config::builder().add_source(settings);

    if !api_key.is_empty() {
        builder = builder.set_override("embedding.api_key", api_key)?;
    }

    builder.build()
}
