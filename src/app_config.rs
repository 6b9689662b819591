use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::default::Default;

/// Application configuration module
/// This module handles the application configuration including loading,
/// validating and saving configuration settings.
/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    /// Destination language code (Google style, e.g. "zh-cn", "fr")
    #[serde(default = "default_target_language")]
    pub target_language: String,

    /// Translation backend config
    #[serde(default)]
    pub translation: TranslationConfig,

    /// Chapter scheduling and markup config
    #[serde(default)]
    pub job: JobConfig,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,

    /// Optional file that receives a plain copy of every log line
    #[serde(default)]
    pub log_file: Option<String>,
}

/// Translation provider type
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum TranslationProvider {
    // @provider: Google Translate web endpoint, rotated across domain suffixes
    #[default]
    Google,
    // @provider: Zhipu AI chat-completions API
    Zhipu,
}

impl TranslationProvider {
    // @returns: Capitalized provider name
    pub fn display_name(&self) -> &str {
        match self {
            Self::Google => "Google Translate",
            Self::Zhipu => "Zhipu AI",
        }
    }

    // @returns: Lowercase provider identifier
    pub fn to_lowercase_string(&self) -> String {
        match self {
            Self::Google => "google".to_string(),
            Self::Zhipu => "zhipu".to_string(),
        }
    }
}

impl std::fmt::Display for TranslationProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_lowercase_string())
    }
}

impl std::str::FromStr for TranslationProvider {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "google" => Ok(Self::Google),
            "zhipu" | "zhipuai" => Ok(Self::Zhipu),
            _ => Err(anyhow!("Invalid provider type: {}", s)),
        }
    }
}

/// How a translated fragment is written back into the chapter
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum TranslationMode {
    /// The translation replaces the original text
    #[default]
    Replace,
    /// The original text is kept, followed by the translation in brackets
    Bilingual,
}

impl std::fmt::Display for TranslationMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Replace => write!(f, "replace"),
            Self::Bilingual => write!(f, "bilingual"),
        }
    }
}

impl std::str::FromStr for TranslationMode {
    type Err = anyhow::Error;

    // "1" and "2" are the numeric mode names older configs used
    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "replace" | "1" => Ok(Self::Replace),
            "bilingual" | "2" => Ok(Self::Bilingual),
            _ => Err(anyhow!("Invalid translation mode: {}", s)),
        }
    }
}

/// Provider configuration wrapper
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ProviderConfig {
    // @field: Provider type identifier
    #[serde(rename = "type")]
    pub provider_type: String,

    // @field: Endpoint variants the retry policy rotates through.
    // Google: domain suffixes ("com", "co.jp"); Zhipu: API base URLs
    #[serde(default)]
    pub endpoints: Vec<String>,

    // @field: Model name
    #[serde(default = "String::new")]
    pub model: String,

    // @field: API key
    #[serde(default = "String::new")]
    pub api_key: String,

    // @field: Timeout seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    // @field: Optional HTTP(S) proxy URL
    #[serde(default)]
    pub http_proxy: Option<String>,
}

impl ProviderConfig {
    // @param provider_type: Provider enum
    // @returns: Provider config with defaults
    pub fn new(provider_type: TranslationProvider) -> Self {
        match provider_type {
            TranslationProvider::Google => Self {
                provider_type: "google".to_string(),
                endpoints: default_google_suffixes(),
                model: String::new(),
                api_key: String::new(),
                timeout_secs: default_timeout_secs(),
                http_proxy: None,
            },
            TranslationProvider::Zhipu => Self {
                provider_type: "zhipu".to_string(),
                endpoints: vec![default_zhipu_endpoint()],
                model: default_zhipu_model(),
                api_key: String::new(),
                timeout_secs: default_zhipu_timeout_secs(),
                http_proxy: None,
            },
        }
    }
}

/// Translation service configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TranslationConfig {
    /// Translation provider to use
    #[serde(default)]
    pub provider: TranslationProvider,

    /// Available translation providers
    #[serde(default)]
    pub available_providers: Vec<ProviderConfig>,

    /// Common translation settings
    #[serde(default)]
    pub common: TranslationCommonConfig,
}

/// Retry, rotation and post-processing settings shared by all providers
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TranslationCommonConfig {
    /// Attempts per fragment before it is given up
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// First attempt number that runs against the next endpoint variant.
    /// Earlier attempts retry the endpoint the fragment started on.
    #[serde(default = "default_rotate_from_attempt")]
    pub rotate_from_attempt: u32,

    /// Lower bound of the random wait between attempts
    #[serde(default = "default_backoff_min_ms")]
    pub backoff_min_ms: u64,

    /// Upper bound of the random wait between attempts
    #[serde(default = "default_backoff_max_ms")]
    pub backoff_max_ms: u64,

    /// Optional `source:target` glossary applied to every translation
    #[serde(default)]
    pub glossary_path: Option<String>,

    /// Translate identical fragments only once per run
    #[serde(default = "default_true")]
    pub cache_enabled: bool,
}

impl Default for TranslationCommonConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            rotate_from_attempt: default_rotate_from_attempt(),
            backoff_min_ms: default_backoff_min_ms(),
            backoff_max_ms: default_backoff_max_ms(),
            glossary_path: None,
            cache_enabled: true,
        }
    }
}

/// Chapter scheduling and markup settings
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct JobConfig {
    /// Element names whose direct text is translated
    #[serde(default = "default_tags_to_translate")]
    pub tags_to_translate: Vec<String>,

    /// Replace the original text or keep it next to the translation
    #[serde(default)]
    pub mode: TranslationMode,

    /// Chapters translated at the same time
    #[serde(default = "default_chapter_workers")]
    pub chapter_workers: usize,

    /// Fragment requests in flight per chapter
    #[serde(default = "default_fragment_workers")]
    pub fragment_workers: usize,

    /// Lower bound of the pause a worker takes after each chapter
    #[serde(default = "default_chapter_cooldown_min_ms")]
    pub chapter_cooldown_min_ms: u64,

    /// Upper bound of the pause a worker takes after each chapter
    #[serde(default = "default_chapter_cooldown_max_ms")]
    pub chapter_cooldown_max_ms: u64,

    /// Appended to the archive stem for the working directory and the output archive
    #[serde(default = "default_output_suffix")]
    pub output_suffix: String,

    /// Mark chapters already written in the destination script as completed
    #[serde(default = "default_true")]
    pub skip_translated_chapters: bool,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            tags_to_translate: default_tags_to_translate(),
            mode: TranslationMode::default(),
            chapter_workers: default_chapter_workers(),
            fragment_workers: default_fragment_workers(),
            chapter_cooldown_min_ms: default_chapter_cooldown_min_ms(),
            chapter_cooldown_max_ms: default_chapter_cooldown_max_ms(),
            output_suffix: default_output_suffix(),
            skip_translated_chapters: true,
        }
    }
}

/// Log verbosity level
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
    /// Equivalent `log` crate filter
    pub fn to_level_filter(&self) -> log::LevelFilter {
        match self {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

impl std::str::FromStr for LogLevel {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "error" => Ok(Self::Error),
            "warn" | "warning" => Ok(Self::Warn),
            "info" => Ok(Self::Info),
            "debug" => Ok(Self::Debug),
            "trace" => Ok(Self::Trace),
            _ => Err(anyhow!("Invalid log level: {}", s)),
        }
    }
}

impl Config {
    /// Load a configuration file; missing fields take their defaults
    pub fn from_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow!("Failed to read config file {}: {}", path, e))?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|e| anyhow!("Failed to parse config file {}: {}", path, e))?;
        Ok(config)
    }

    /// Write the configuration as pretty JSON
    pub fn save_to_file(&self, path: &str) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)
            .map_err(|e| anyhow!("Failed to write config file {}: {}", path, e))?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        crate::language_utils::validate_language_code(&self.target_language)?;

        let endpoints = self.translation.get_endpoints();
        if endpoints.is_empty() {
            return Err(anyhow!(
                "At least one endpoint is required for the {} provider",
                self.translation.provider.display_name()
            ));
        }
        if endpoints.iter().any(|e| e.trim().is_empty()) {
            return Err(anyhow!("Endpoint entries must not be empty"));
        }

        if self.translation.provider == TranslationProvider::Zhipu
            && self.translation.get_api_key().is_empty()
        {
            return Err(anyhow!("Translation API key is required for Zhipu AI provider"));
        }

        let common = &self.translation.common;
        if common.max_attempts == 0 {
            return Err(anyhow!("max_attempts must be at least 1"));
        }
        if common.rotate_from_attempt == 0 {
            return Err(anyhow!("rotate_from_attempt must be at least 1"));
        }
        if common.backoff_min_ms > common.backoff_max_ms {
            return Err(anyhow!(
                "backoff_min_ms ({}) must not exceed backoff_max_ms ({})",
                common.backoff_min_ms,
                common.backoff_max_ms
            ));
        }

        if self.job.tags_to_translate.iter().all(|t| t.trim().is_empty()) {
            return Err(anyhow!("tags_to_translate must name at least one element"));
        }
        if self.job.chapter_workers == 0 || self.job.fragment_workers == 0 {
            return Err(anyhow!("chapter_workers and fragment_workers must be at least 1"));
        }
        if self.job.chapter_cooldown_min_ms > self.job.chapter_cooldown_max_ms {
            return Err(anyhow!(
                "chapter_cooldown_min_ms ({}) must not exceed chapter_cooldown_max_ms ({})",
                self.job.chapter_cooldown_min_ms,
                self.job.chapter_cooldown_max_ms
            ));
        }
        if self.job.output_suffix.is_empty() {
            return Err(anyhow!("output_suffix must not be empty"));
        }

        Ok(())
    }
}

/// Default implementation for Config
impl Default for Config {
    fn default() -> Self {
        Config {
            target_language: default_target_language(),
            translation: TranslationConfig::default(),
            job: JobConfig::default(),
            log_level: LogLevel::default(),
            log_file: None,
        }
    }
}

impl TranslationConfig {
    /// Get the active provider configuration from the available_providers array
    pub fn get_active_provider_config(&self) -> Option<&ProviderConfig> {
        self.get_provider_config(&self.provider)
    }

    /// Get a specific provider configuration by type
    pub fn get_provider_config(&self, provider_type: &TranslationProvider) -> Option<&ProviderConfig> {
        let provider_str = provider_type.to_lowercase_string();
        self.available_providers.iter()
            .find(|p| p.provider_type == provider_str)
    }

    /// Endpoint variants of the active provider
    pub fn get_endpoints(&self) -> Vec<String> {
        if let Some(provider_config) = self.get_active_provider_config() {
            if !provider_config.endpoints.is_empty() {
                return provider_config.endpoints.clone();
            }
        }

        match self.provider {
            TranslationProvider::Google => default_google_suffixes(),
            TranslationProvider::Zhipu => vec![default_zhipu_endpoint()],
        }
    }

    /// Get the model for the active provider
    pub fn get_model(&self) -> String {
        if let Some(provider_config) = self.get_active_provider_config() {
            if !provider_config.model.is_empty() {
                return provider_config.model.clone();
            }
        }

        match self.provider {
            TranslationProvider::Google => String::new(),
            TranslationProvider::Zhipu => default_zhipu_model(),
        }
    }

    /// Get the API key for the active provider
    pub fn get_api_key(&self) -> String {
        self.get_active_provider_config()
            .map(|p| p.api_key.clone())
            .unwrap_or_default()
    }

    /// Get the request timeout for the active provider
    pub fn get_timeout_secs(&self) -> u64 {
        match self.get_active_provider_config() {
            Some(provider_config) if provider_config.timeout_secs > 0 => provider_config.timeout_secs,
            _ => match self.provider {
                TranslationProvider::Google => default_timeout_secs(),
                TranslationProvider::Zhipu => default_zhipu_timeout_secs(),
            },
        }
    }

    /// Get the proxy for the active provider
    pub fn get_http_proxy(&self) -> Option<String> {
        self.get_active_provider_config()
            .and_then(|p| p.http_proxy.clone())
            .filter(|p| !p.trim().is_empty())
    }
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            provider: TranslationProvider::default(),
            available_providers: vec![
                ProviderConfig::new(TranslationProvider::Google),
                ProviderConfig::new(TranslationProvider::Zhipu),
            ],
            common: TranslationCommonConfig::default(),
        }
    }
}

fn default_target_language() -> String {
    "zh-cn".to_string()
}

fn default_google_suffixes() -> Vec<String> {
    ["com", "com.hk", "com.tw", "co.jp", "co.uk"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_zhipu_endpoint() -> String {
    "https://open.bigmodel.cn/api/paas/v4".to_string()
}

fn default_zhipu_model() -> String {
    "glm-4-flash".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_zhipu_timeout_secs() -> u64 {
    60
}

fn default_max_attempts() -> u32 {
    5
}

fn default_rotate_from_attempt() -> u32 {
    3
}

fn default_backoff_min_ms() -> u64 {
    2000
}

fn default_backoff_max_ms() -> u64 {
    7000
}

fn default_tags_to_translate() -> Vec<String> {
    ["title", "h1", "h2", "p"].iter().map(|s| s.to_string()).collect()
}

fn default_chapter_workers() -> usize {
    4
}

fn default_fragment_workers() -> usize {
    16
}

fn default_chapter_cooldown_min_ms() -> u64 {
    1000
}

fn default_chapter_cooldown_max_ms() -> u64 {
    5000
}

fn default_output_suffix() -> String {
    "_translated".to_string()
}

fn default_true() -> bool {
    true
}
