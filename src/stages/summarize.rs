//! Summarization stage
//!
//! One completion request per attempt, up to `max_attempts` attempts with
//! exponential backoff between them. When every attempt fails the headlines
//! are joined and cut to the word limit instead.

use crate::config::PipelineConfig;
use crate::error::PipelineResult;
use crate::llm::provider::{CompletionRequest, LlmProvider};
use crate::normalize::{self, StageInput};
use crate::stages::Stage;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Returned when there is nothing to summarize
pub const NO_NEWS_SENTINEL: &str = "No news available to summarize.";

const SYSTEM_PROMPT: &str = "You are a financial analyst.";

/// Attempt budget and backoff schedule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// One attempt, no backoff
    pub fn single() -> Self {
        Self {
            max_attempts: 1,
            base_delay: Duration::ZERO,
        }
    }

    /// Wait after failed attempt `attempt` (zero-based): `base * 2^attempt`
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.base_delay
            .saturating_mul(2u32.saturating_pow(attempt))
    }

    /// True if another attempt follows `attempt` (zero-based)
    pub fn has_next(&self, attempt: u32) -> bool {
        attempt + 1 < self.max_attempts
    }
}

pub struct Summarizer {
    llm: Arc<dyn LlmProvider>,
    model: String,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
    retry: RetryPolicy,
    word_limit: usize,
}

impl Summarizer {
    pub fn new(llm: Arc<dyn LlmProvider>, model: impl Into<String>) -> Self {
        Self {
            llm,
            model: model.into(),
            temperature: None,
            max_tokens: None,
            retry: RetryPolicy::default(),
            word_limit: 200,
        }
    }

    pub fn from_config(llm: Arc<dyn LlmProvider>, config: &PipelineConfig) -> Self {
        Self {
            llm,
            model: config.llm.model.clone(),
            temperature: config.llm.temperature,
            max_tokens: config.llm.max_tokens,
            retry: RetryPolicy {
                max_attempts: config.pipeline.summary_max_attempts,
                base_delay: config.pipeline.backoff_base(),
            },
            word_limit: config.pipeline.summary_word_limit,
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_word_limit(mut self, word_limit: usize) -> Self {
        self.word_limit = word_limit;
        self
    }

    /// Summary of `headlines`; never fails
    pub async fn summarize(&self, headlines: impl Into<StageInput>) -> String {
        let headlines = normalize::text_list(&headlines.into());
        if headlines.is_empty() {
            return NO_NEWS_SENTINEL.to_string();
        }

        let prompt = format!(
            "Summarize these points under {} words:\n{}",
            self.word_limit,
            headlines.join("\n")
        );

        for attempt in 0..self.retry.max_attempts {
            let request = CompletionRequest::with_system(&self.model, SYSTEM_PROMPT, &prompt)
                .temperature(self.temperature)
                .max_tokens(self.max_tokens);

            let result = self
                .llm
                .complete(request)
                .await
                .and_then(|response| response.into_text());

            match result {
                Ok(summary) => {
                    info!(
                        attempt = attempt + 1,
                        "Model returned summary ({} chars)",
                        summary.len()
                    );
                    return summary;
                }
                Err(e) => {
                    warn!(
                        "Summarization attempt {}/{} failed: {}",
                        attempt + 1,
                        self.retry.max_attempts,
                        e
                    );
                    if self.retry.has_next(attempt) {
                        let delay = self.retry.delay_after(attempt);
                        info!("Retrying summarization in {:?}", delay);
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }

        warn!("Summarization retries exhausted, using truncated headlines");
        truncate_words(&headlines.join(" "), self.word_limit)
    }
}

#[async_trait]
impl Stage<String> for Summarizer {
    fn name(&self) -> &'static str {
        "summarization"
    }

    async fn run(&self, input: StageInput) -> PipelineResult<String> {
        Ok(self.summarize(input).await)
    }
}

/// First `limit` words plus `...` when `text` is longer, else `text` unchanged
pub fn truncate_words(text: &str, limit: usize) -> String {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.len() > limit {
        format!("{}...", words[..limit].join(" "))
    } else {
        text.to_string()
    }
}
