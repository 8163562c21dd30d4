//! Configuration system for the market digest pipeline
//!
//! Configuration is a TOML document whose sections all have defaults, so the
//! binary runs without a file. Secrets are never stored in the configuration
//! value itself: each section names the environment variable that holds the
//! credential, and [`Credentials::resolve`] reads them once at startup.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Main pipeline configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PipelineConfig {
    #[serde(default)]
    pub llm: LlmSection,
    #[serde(default)]
    pub search: SearchSection,
    #[serde(default)]
    pub telegram: TelegramSection,
    #[serde(default)]
    pub pipeline: PipelineSection,
}

/// Language model section
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LlmSection {
    /// Provider label, only used for logging (the wire protocol is OpenAI-compatible)
    pub provider: String,
    /// Base URL of the OpenAI-compatible API
    pub base_url: String,
    /// Model identifier
    pub model: String,
    /// Environment variable containing the API key
    pub api_key_env: String,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    /// Client-side request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            provider: "groq".to_string(),
            base_url: "https://api.groq.com/openai/v1".to_string(),
            model: "llama-3.3-70b-versatile".to_string(),
            api_key_env: "GROQ_API_KEY".to_string(),
            temperature: Some(0.7),
            max_tokens: Some(4096),
            timeout_secs: 60,
        }
    }
}

/// News search section. Both providers are optional.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SearchSection {
    pub tavily_api_key_env: String,
    pub tavily_base_url: String,
    pub serper_api_key_env: String,
    pub serper_base_url: String,
    /// Maximum results requested from each provider
    pub max_results: usize,
    /// Per-provider request timeout in seconds
    pub timeout_secs: u64,
    /// Query used when the caller supplies none
    pub default_query: String,
}

impl Default for SearchSection {
    fn default() -> Self {
        Self {
            tavily_api_key_env: "TAVILY_API_KEY".to_string(),
            tavily_base_url: "https://api.tavily.com".to_string(),
            serper_api_key_env: "SERPER_API_KEY".to_string(),
            serper_base_url: "https://google.serper.dev".to_string(),
            max_results: 8,
            timeout_secs: 10,
            default_query: "latest US financial market news".to_string(),
        }
    }
}

/// Telegram delivery section
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TelegramSection {
    pub bot_token_env: String,
    pub chat_id_env: String,
    pub api_base: String,
    pub timeout_secs: u64,
}

impl Default for TelegramSection {
    fn default() -> Self {
        Self {
            bot_token_env: "TELEGRAM_BOT_TOKEN".to_string(),
            chat_id_env: "TELEGRAM_CHAT_ID".to_string(),
            api_base: "https://api.telegram.org".to_string(),
            timeout_secs: 30,
        }
    }
}

/// Stage tuning knobs
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PipelineSection {
    /// Total summarization attempts before the truncation fallback
    pub summary_max_attempts: u32,
    /// Base backoff in milliseconds; attempt `n` waits `base * 2^n`
    pub backoff_base_ms: u64,
    /// Word limit of the fallback summary
    pub summary_word_limit: usize,
    /// Maximum chart send attempts per delivery
    pub max_charts: usize,
    /// Maximum characters per chat message
    pub message_limit: usize,
}

impl Default for PipelineSection {
    fn default() -> Self {
        Self {
            summary_max_attempts: 5,
            backoff_base_ms: 1000,
            summary_word_limit: 200,
            max_charts: 5,
            message_limit: 4000,
        }
    }
}

impl PipelineSection {
    pub fn backoff_base(&self) -> Duration {
        Duration::from_millis(self.backoff_base_ms)
    }
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),
    #[error("Failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("Environment variable not found: {0}")]
    EnvVarNotFound(String),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl PipelineConfig {
    /// Load configuration from a TOML file and validate it
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: PipelineConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check URL fields and numeric limits
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("llm.base_url", &self.llm.base_url),
            ("search.tavily_base_url", &self.search.tavily_base_url),
            ("search.serper_base_url", &self.search.serper_base_url),
            ("telegram.api_base", &self.telegram.api_base),
        ] {
            validate_url(field, value)?;
        }

        if self.llm.model.trim().is_empty() {
            return Err(ConfigError::InvalidConfig(
                "llm.model must not be empty".to_string(),
            ));
        }
        if self.pipeline.summary_max_attempts == 0 {
            return Err(ConfigError::InvalidConfig(
                "pipeline.summary_max_attempts must be at least 1".to_string(),
            ));
        }
        if self.pipeline.message_limit < 100 {
            return Err(ConfigError::InvalidConfig(format!(
                "pipeline.message_limit {} is too small (minimum 100)",
                self.pipeline.message_limit
            )));
        }
        if self.pipeline.summary_word_limit == 0 {
            return Err(ConfigError::InvalidConfig(
                "pipeline.summary_word_limit must be positive".to_string(),
            ));
        }

        Ok(())
    }
}

fn validate_url(field: &str, value: &str) -> Result<(), ConfigError> {
    let parsed = Url::parse(value)
        .map_err(|e| ConfigError::InvalidConfig(format!("{field} '{value}' is not a URL: {e}")))?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        scheme => Err(ConfigError::InvalidConfig(format!(
            "{field} must use http or https, got '{scheme}'"
        ))),
    }
}

/// Secrets resolved from the environment once at startup
#[derive(Clone, PartialEq)]
pub struct Credentials {
    pub llm_api_key: String,
    pub tavily_api_key: Option<String>,
    pub serper_api_key: Option<String>,
    pub telegram_bot_token: String,
    pub telegram_chat_id: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("llm_api_key", &"***")
            .field("tavily_api_key", &self.tavily_api_key.as_ref().map(|_| "***"))
            .field("serper_api_key", &self.serper_api_key.as_ref().map(|_| "***"))
            .field("telegram_bot_token", &"***")
            .field("telegram_chat_id", &self.telegram_chat_id)
            .finish()
    }
}

impl Credentials {
    /// Resolve all credentials named by `config` from the process environment
    pub fn resolve(config: &PipelineConfig) -> Result<Self, ConfigError> {
        Self::resolve_with(config, |name| std::env::var(name).ok())
    }

    /// Resolve credentials through an arbitrary lookup, used by tests
    pub fn resolve_with<F>(config: &PipelineConfig, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &str| {
            lookup(name)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| ConfigError::EnvVarNotFound(name.to_string()))
        };
        let optional = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        Ok(Self {
            llm_api_key: required(&config.llm.api_key_env)?,
            tavily_api_key: optional(&config.search.tavily_api_key_env),
            serper_api_key: optional(&config.search.serper_api_key_env),
            telegram_bot_token: required(&config.telegram.bot_token_env)?,
            telegram_chat_id: required(&config.telegram.chat_id_env)?,
        })
    }

    /// True when at least one live search provider is configured
    pub fn has_search_provider(&self) -> bool {
        self.tavily_api_key.is_some() || self.serper_api_key.is_some()
    }

    /// Credentials for unit tests
    #[cfg(test)]
    pub fn test_credentials() -> Self {
        Self {
            llm_api_key: "test-llm-key".to_string(),
            tavily_api_key: None,
            serper_api_key: None,
            telegram_bot_token: "123:abc".to_string(),
            telegram_chat_id: "42".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults_without_file() {
        let config: PipelineConfig = toml::from_str("").unwrap();
        assert_eq!(config, PipelineConfig::default());
        assert_eq!(config.llm.model, "llama-3.3-70b-versatile");
        assert_eq!(config.search.timeout_secs, 10);
        assert_eq!(config.telegram.timeout_secs, 30);
        assert_eq!(config.pipeline.summary_max_attempts, 5);
        assert_eq!(config.pipeline.message_limit, 4000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_sections_keep_defaults() {
        let config = PipelineConfig::from_toml_str(
            r#"
[llm]
model = "llama-3.1-8b-instant"

[pipeline]
max_charts = 3
"#,
        )
        .unwrap();

        assert_eq!(config.llm.model, "llama-3.1-8b-instant");
        assert_eq!(config.llm.api_key_env, "GROQ_API_KEY");
        assert_eq!(config.pipeline.max_charts, 3);
        assert_eq!(config.pipeline.summary_word_limit, 200);
    }

    #[test]
    fn test_invalid_url_rejected() {
        let result = PipelineConfig::from_toml_str(
            r#"
[telegram]
api_base = "not a url"
"#,
        );
        assert!(matches!(result, Err(ConfigError::InvalidConfig(_))));

        let result = PipelineConfig::from_toml_str(
            r#"
[search]
serper_base_url = "ftp://google.serper.dev"
"#,
        );
        assert!(matches!(result, Err(ConfigError::InvalidConfig(_))));
    }

    #[test]
    fn test_zero_attempts_rejected() {
        let result = PipelineConfig::from_toml_str(
            r#"
[pipeline]
summary_max_attempts = 0
"#,
        );
        assert!(matches!(result, Err(ConfigError::InvalidConfig(_))));
    }

    #[test]
    fn test_credentials_require_model_and_chat() {
        let config = PipelineConfig::default();

        let vars = env(&[("TELEGRAM_BOT_TOKEN", "t"), ("TELEGRAM_CHAT_ID", "1")]);
        let result = Credentials::resolve_with(&config, |k| vars.get(k).cloned());
        assert!(matches!(result, Err(ConfigError::EnvVarNotFound(ref v)) if v == "GROQ_API_KEY"));

        let vars = env(&[("GROQ_API_KEY", "g"), ("TELEGRAM_CHAT_ID", "1")]);
        let result = Credentials::resolve_with(&config, |k| vars.get(k).cloned());
        assert!(
            matches!(result, Err(ConfigError::EnvVarNotFound(ref v)) if v == "TELEGRAM_BOT_TOKEN")
        );
    }

    #[test]
    fn test_credentials_search_keys_optional() {
        let config = PipelineConfig::default();
        let vars = env(&[
            ("GROQ_API_KEY", "g"),
            ("TELEGRAM_BOT_TOKEN", "t"),
            ("TELEGRAM_CHAT_ID", "1"),
            ("SERPER_API_KEY", "  "),
        ]);

        let creds = Credentials::resolve_with(&config, |k| vars.get(k).cloned()).unwrap();
        assert!(creds.tavily_api_key.is_none());
        // Blank values count as missing
        assert!(creds.serper_api_key.is_none());
        assert!(!creds.has_search_provider());
    }

    #[test]
    fn test_credentials_debug_redacts_secrets() {
        let creds = Credentials::test_credentials();
        let debug = format!("{creds:?}");
        assert!(!debug.contains("test-llm-key"));
        assert!(!debug.contains("123:abc"));
        assert!(debug.contains("42"));
    }
}
