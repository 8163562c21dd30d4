//! Stand-in provider used when no model client could be built
//!
//! Every call fails with [`LlmError::NotConfigured`], which sends the
//! summarization and translation stages down their fallback paths.

use crate::llm::provider::{CompletionRequest, CompletionResponse, LlmError, LlmProvider};
use async_trait::async_trait;

pub struct DisabledProvider {
    reason: String,
}

impl DisabledProvider {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl LlmProvider for DisabledProvider {
    fn name(&self) -> &str {
        "disabled"
    }

    async fn complete(&self, _request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        Err(LlmError::NotConfigured(self.reason.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_disabled_provider_always_fails() {
        let provider = DisabledProvider::new("client construction failed");
        let request = CompletionRequest::with_system("m", "s", "u");

        let result = provider.complete(request).await;
        assert!(
            matches!(result, Err(LlmError::NotConfigured(ref r)) if r.contains("construction"))
        );
        assert_eq!(provider.name(), "disabled");
    }
}
