//! Error types for the market digest pipeline
//!
//! Each collaborator layer has its own error enum; `PipelineError` is the
//! crate-level error that reaches the orchestrator and the binary.

use crate::config::ConfigError;
use crate::llm::provider::LlmError;
use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

/// Maximum length of an error message leaving the process
const MAX_SANITIZED_LEN: usize = 500;

static SECRET_ASSIGNMENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(password|token|key|secret)[=:]\s*\S+").expect("secret pattern is valid")
});

static BOT_TOKEN_SEGMENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"/bot[0-9]+:[A-Za-z0-9_-]+").expect("bot token pattern is valid")
});

static SENSITIVE_PATH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"/[a-zA-Z0-9._/-]+/(secrets?|\.ssh|\.aws|\.config)/[a-zA-Z0-9._/-]+")
        .expect("path pattern is valid")
});

/// Main error type for pipeline operations
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Initialization failed: {message}")]
    Initialization { message: String },

    #[error("LLM provider error: {0}")]
    Llm(#[from] LlmError),

    #[error("Delivery failed: {0}")]
    Delivery(#[from] DeliveryError),

    #[error("Stage '{stage}' failed: {message}")]
    Stage { stage: String, message: String },
}

impl PipelineError {
    /// Create initialization error
    pub fn initialization<S: Into<String>>(message: S) -> Self {
        Self::Initialization {
            message: message.into(),
        }
    }

    /// Create stage error
    pub fn stage<S: Into<String>, M: Into<String>>(stage: S, message: M) -> Self {
        Self::Stage {
            stage: stage.into(),
            message: message.into(),
        }
    }

    /// True when the primary orchestrator could not be built
    pub fn is_initialization(&self) -> bool {
        matches!(self, Self::Initialization { .. })
    }

    /// Sanitized message safe to log or send to the chat
    pub fn sanitized(&self) -> String {
        sanitize_error_message(&self.to_string())
    }
}

/// Search provider errors
#[derive(Debug, Clone, Error)]
pub enum SearchError {
    #[error("Request failed: {0}")]
    RequestFailed(String),
    #[error("{provider} API error ({status}): {body}")]
    Api {
        provider: String,
        status: u16,
        body: String,
    },
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
    #[error("{0} returned no results")]
    Empty(String),
}

/// Chat endpoint errors
#[derive(Debug, Clone, Error)]
pub enum DeliveryError {
    #[error("Request failed: {0}")]
    RequestFailed(String),
    #[error("Chat API error ({status}): {description}")]
    Api { status: u16, description: String },
    #[error("Invalid chart reference: {0}")]
    InvalidChart(String),
}

/// Redact credentials and private paths, and cap the length
pub fn sanitize_error_message(message: &str) -> String {
    let mut sanitized = BOT_TOKEN_SEGMENT
        .replace_all(message, "/bot***")
        .to_string();

    sanitized = SECRET_ASSIGNMENT
        .replace_all(&sanitized, "${1}=***")
        .to_string();

    sanitized = SENSITIVE_PATH
        .replace_all(&sanitized, "/***REDACTED***/")
        .to_string();

    if sanitized.chars().count() > MAX_SANITIZED_LEN {
        let truncate_suffix = "...[truncated]";
        let keep = MAX_SANITIZED_LEN - truncate_suffix.len();
        sanitized = format!(
            "{}{}",
            sanitized.chars().take(keep).collect::<String>(),
            truncate_suffix
        );
    }

    sanitized
}

/// Result type for pipeline operations
pub type PipelineResult<T> = Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_message_sanitization() {
        let error = PipelineError::stage(
            "delivery",
            "Failed to authenticate: password=secret123 token=abc456",
        );
        let sanitized = error.sanitized();

        assert!(!sanitized.contains("secret123"));
        assert!(!sanitized.contains("abc456"));
        assert!(sanitized.contains("password=***"));
        assert!(sanitized.contains("token=***"));
    }

    #[test]
    fn test_bot_token_redacted_from_urls() {
        let message = "error sending request for url (https://api.telegram.org/bot123456:AAH-x_yz/sendMessage)";
        let sanitized = sanitize_error_message(message);

        assert!(!sanitized.contains("AAH-x_yz"));
        assert!(sanitized.contains("/bot***/sendMessage"));
    }

    #[test]
    fn test_long_message_truncation() {
        let long_message = "x".repeat(600);
        let sanitized = sanitize_error_message(&long_message);

        assert!(sanitized.chars().count() <= 500);
        assert!(sanitized.ends_with("...[truncated]"));
    }

    #[test]
    fn test_multibyte_truncation_does_not_panic() {
        let long_message = "ש".repeat(600);
        let sanitized = sanitize_error_message(&long_message);
        assert_eq!(sanitized.chars().count(), 500);
    }

    #[test]
    fn test_file_path_redaction() {
        let message = "Failed to read /home/user/.ssh/id_rsa";
        let sanitized = sanitize_error_message(message);

        assert!(sanitized.contains("/***REDACTED***/"));
        assert!(!sanitized.contains("/home/user/.ssh/id_rsa"));
    }

    #[test]
    fn test_sanitize_exactly_500_chars() {
        let message = "x".repeat(500);
        let sanitized = sanitize_error_message(&message);
        assert_eq!(sanitized.len(), 500);
        assert!(!sanitized.contains("truncated"));
    }

    #[test]
    fn test_initialization_constructor() {
        let error = PipelineError::initialization("no client");
        assert!(error.is_initialization());
        assert_eq!(error.to_string(), "Initialization failed: no client");

        let error = PipelineError::stage("summarize", "boom");
        assert!(!error.is_initialization());
        assert_eq!(error.to_string(), "Stage 'summarize' failed: boom");
    }

    #[test]
    fn test_delivery_error_conversion() {
        let error: PipelineError = DeliveryError::Api {
            status: 400,
            description: "Bad Request: chat not found".to_string(),
        }
        .into();
        assert!(matches!(error, PipelineError::Delivery(_)));
        assert!(error.to_string().contains("chat not found"));
    }
}
