use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::default::Default;
use std::path::Path;

/// Application configuration module
/// This module handles the application configuration including loading,
/// validating and saving configuration settings.
/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    /// Source language code (ISO)
    pub source_language: String,

    /// Target language code (ISO)
    pub target_language: String,

    /// Model backend config
    #[serde(default)]
    pub provider: ProviderConfig,

    /// Translation config
    #[serde(default)]
    pub translation: TranslationConfig,

    /// Terminology config
    #[serde(default)]
    pub terminology: TerminologyConfig,

    /// Output config
    #[serde(default)]
    pub output: OutputConfig,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Model backend configuration (OpenAI-compatible endpoint)
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ProviderConfig {
    /// Model name (e.g. "gpt-4o-mini", or "provider/model" for routers)
    #[serde(default = "default_model")]
    pub model: String,

    /// Embedding model name used for terminology lookups
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,

    /// API key; "${VAR}" is expanded from the environment
    #[serde(default = "String::new")]
    pub api_key: String,

    /// Service endpoint URL
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum tokens in a response
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Maximum number of concurrent requests
    #[serde(default = "default_concurrent_requests")]
    pub concurrent_requests: usize,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Retry attempts for transport-level failures
    #[serde(default = "default_transport_retries")]
    pub transport_retries: usize,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            embedding_model: default_embedding_model(),
            api_key: String::new(),
            endpoint: default_endpoint(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            concurrent_requests: default_concurrent_requests(),
            timeout_secs: default_timeout_secs(),
            transport_retries: default_transport_retries(),
        }
    }
}

impl ProviderConfig {
    /// Resolve the API key, expanding a "${VAR}" placeholder from the environment
    pub fn resolved_api_key(&self) -> Result<String> {
        if self.api_key.starts_with("${") && self.api_key.ends_with('}') {
            let var = &self.api_key[2..self.api_key.len() - 1];
            std::env::var(var).map_err(|_| anyhow!("environment variable {} is not set", var))
        } else {
            Ok(self.api_key.clone())
        }
    }
}

/// How formula notation strings are compared during validation
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum FormulaCompareMode {
    /// Collapse internal whitespace runs and trim before comparing
    #[default]
    Lenient,
    /// Compare notation byte-exact
    Strict,
}

/// Granularity at which a formula mismatch triggers retranslation
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum RetryGranularity {
    /// Retranslate the whole enclosing section
    #[default]
    Section,
    /// Retranslate only the mismatched paragraph
    Paragraph,
}

/// Translation behavior configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TranslationConfig {
    /// Maximum retranslation attempts after the initial one
    #[serde(default = "default_max_retries")]
    pub max_retries: usize,

    /// Retry attempts for an unparseable dependency-analysis response
    #[serde(default = "default_analysis_retries")]
    pub analysis_retries: usize,

    /// Character budget for dependency context injected into a request
    #[serde(default = "default_context_budget_chars")]
    pub context_budget_chars: usize,

    /// Formula comparison mode
    #[serde(default)]
    pub formula_compare: FormulaCompareMode,

    /// Retranslation granularity on formula mismatch
    #[serde(default)]
    pub retry_granularity: RetryGranularity,
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            analysis_retries: default_analysis_retries(),
            context_budget_chars: default_context_budget_chars(),
            formula_compare: FormulaCompareMode::default(),
            retry_granularity: RetryGranularity::default(),
        }
    }
}

/// Terminology store configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TerminologyConfig {
    /// Path to the terminology database; empty selects the default location
    #[serde(default = "String::new")]
    pub database_path: String,

    /// Cosine similarity threshold above which a stored term wins a conflict
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f32,

    /// Nearest neighbours fetched per lookup
    #[serde(default = "default_nearest_terms")]
    pub nearest_terms: usize,

    /// Whether conflicts are resolved automatically or deferred to a resolver
    #[serde(default = "default_auto_mode")]
    pub auto_mode: bool,
}

impl Default for TerminologyConfig {
    fn default() -> Self {
        Self {
            database_path: String::new(),
            similarity_threshold: default_similarity_threshold(),
            nearest_terms: default_nearest_terms(),
            auto_mode: default_auto_mode(),
        }
    }
}

/// Output and marking configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct OutputConfig {
    /// Whether unresolved mismatches are wrapped in a visible marking
    #[serde(default = "default_mark_problematic")]
    pub mark_problematic: bool,

    /// LaTeX color used for the marking span
    #[serde(default = "default_mark_color")]
    pub mark_color: String,

    /// Whether source comments are preserved through parsing
    #[serde(default)]
    pub preserve_comments: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            mark_problematic: default_mark_problematic(),
            mark_color: default_mark_color(),
            preserve_comments: false,
        }
    }
}

/// Log level for the application
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// Convert to the log crate's level filter
    pub fn to_level_filter(&self) -> log::LevelFilter {
        match self {
            Self::Error => log::LevelFilter::Error,
            Self::Warn => log::LevelFilter::Warn,
            Self::Info => log::LevelFilter::Info,
            Self::Debug => log::LevelFilter::Debug,
            Self::Trace => log::LevelFilter::Trace,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            source_language: "ru".to_string(),
            target_language: "en".to_string(),
            provider: ProviderConfig::default(),
            translation: TranslationConfig::default(),
            terminology: TerminologyConfig::default(),
            output: OutputConfig::default(),
            log_level: LogLevel::default(),
        }
    }
}

impl Config {
    /// Load configuration from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;
        let config: Config = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path.as_ref()))?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a JSON file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path.as_ref(), content)
            .with_context(|| format!("Failed to write config file: {:?}", path.as_ref()))?;
        Ok(())
    }

    /// Validate configuration consistency
    pub fn validate(&self) -> Result<()> {
        if self.source_language.is_empty() {
            return Err(anyhow!("source_language must not be empty"));
        }
        if self.target_language.is_empty() {
            return Err(anyhow!("target_language must not be empty"));
        }
        if self.source_language == self.target_language {
            return Err(anyhow!(
                "source and target language must differ: {}",
                self.source_language
            ));
        }
        if !(0.0..=1.0).contains(&self.terminology.similarity_threshold) {
            return Err(anyhow!(
                "similarity_threshold must be within [0, 1], got {}",
                self.terminology.similarity_threshold
            ));
        }
        if self.provider.concurrent_requests == 0 {
            return Err(anyhow!("concurrent_requests must be at least 1"));
        }
        Ok(())
    }

    /// Resolve a language tag to its English display name for prompts
    pub fn language_display_name(tag: &str) -> String {
        isolang::Language::from_639_1(tag)
            .or_else(|| isolang::Language::from_639_3(tag))
            .map(|l| l.to_name().to_string())
            .unwrap_or_else(|| tag.to_string())
    }
}

// Default value functions
fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_embedding_model() -> String {
    "text-embedding-3-large".to_string()
}

fn default_endpoint() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_temperature() -> f32 {
    0.3
}

fn default_max_tokens() -> u32 {
    16000
}

fn default_concurrent_requests() -> usize {
    4
}

fn default_timeout_secs() -> u64 {
    120
}

fn default_transport_retries() -> usize {
    3
}

fn default_max_retries() -> usize {
    2
}

fn default_analysis_retries() -> usize {
    2
}

fn default_context_budget_chars() -> usize {
    6000
}

fn default_similarity_threshold() -> f32 {
    0.85
}

fn default_nearest_terms() -> usize {
    5
}

fn default_auto_mode() -> bool {
    true
}

fn default_mark_problematic() -> bool {
    true
}

fn default_mark_color() -> String {
    "red".to_string()
}
