//! Mock implementations for testing
//!
//! Provides mock LlmProvider, NewsSource, Messenger and Stage implementations
//! so stages and the orchestrator can be exercised without network access.

use crate::error::{DeliveryError, PipelineError, PipelineResult, SearchError};
use crate::llm::provider::{
    CompletionRequest, CompletionResponse, FinishReason, LlmError, LlmProvider, TokenUsage,
};
use crate::normalize::StageInput;
use crate::search::{NewsSource, SearchHit};
use crate::stages::Stage;
use crate::telegram::{Messenger, ParseMode};
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Mock LLM provider returning scripted outcomes in order
///
/// Once the script is exhausted the last outcome repeats. An empty script
/// always answers "Mock response".
#[derive(Debug, Default)]
pub struct MockLlmProvider {
    pub script: Vec<Result<String, LlmError>>,
    pub calls: Arc<AtomicUsize>,
    pub requests: Arc<Mutex<Vec<CompletionRequest>>>,
}

impl MockLlmProvider {
    pub fn scripted(script: Vec<Result<String, LlmError>>) -> Self {
        Self {
            script,
            ..Default::default()
        }
    }

    pub fn single_response(response: impl Into<String>) -> Self {
        Self::scripted(vec![Ok(response.into())])
    }

    pub fn with_failure() -> Self {
        Self::scripted(vec![Err(LlmError::RequestFailed(
            "Mock LLM failure".to_string(),
        ))])
    }

    /// Fails `failures` times, then answers `response`
    pub fn succeed_after(failures: usize, response: impl Into<String>) -> Self {
        let mut script: Vec<Result<String, LlmError>> = (0..failures)
            .map(|i| Err(LlmError::ApiError(format!("Mock failure {}", i + 1))))
            .collect();
        script.push(Ok(response.into()));
        Self::scripted(script)
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub async fn get_requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().await.clone()
    }
}

#[async_trait]
impl LlmProvider for MockLlmProvider {
    fn name(&self) -> &str {
        "mock"
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().await.push(request);

        let outcome = match self.script.last() {
            None => Ok("Mock response".to_string()),
            Some(last) => self.script.get(call).unwrap_or(last).clone(),
        };

        outcome.map(|content| CompletionResponse {
            content: Some(content),
            model: "mock-model".to_string(),
            usage: TokenUsage {
                prompt_tokens: 10,
                completion_tokens: 5,
                total_tokens: 15,
            },
            finish_reason: FinishReason::Stop,
        })
    }
}

#[derive(Debug, Clone)]
enum SearchOutcome {
    Hits(Vec<SearchHit>),
    Fail,
    Empty,
}

/// Mock news source
#[derive(Debug, Clone)]
pub struct MockNewsSource {
    name: String,
    outcome: SearchOutcome,
    calls: Arc<AtomicUsize>,
    queries: Arc<Mutex<Vec<String>>>,
}

impl MockNewsSource {
    fn with_outcome(name: &str, outcome: SearchOutcome) -> Self {
        Self {
            name: name.to_string(),
            outcome,
            calls: Arc::new(AtomicUsize::new(0)),
            queries: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Answers with `(title, snippet)` hits
    pub fn with_hits(name: &str, hits: &[(&str, &str)]) -> Self {
        let hits = hits
            .iter()
            .map(|(title, snippet)| SearchHit::new(*title, *snippet))
            .collect();
        Self::with_outcome(name, SearchOutcome::Hits(hits))
    }

    pub fn failing(name: &str) -> Self {
        Self::with_outcome(name, SearchOutcome::Fail)
    }

    pub fn empty(name: &str) -> Self {
        Self::with_outcome(name, SearchOutcome::Empty)
    }

    /// Shared call counter, still readable after the source is moved
    pub fn calls(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }

    /// Shared record of received queries
    pub fn queries(&self) -> Arc<Mutex<Vec<String>>> {
        Arc::clone(&self.queries)
    }
}

#[async_trait]
impl NewsSource for MockNewsSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn search(
        &self,
        query: &str,
        _max_results: usize,
    ) -> Result<Vec<SearchHit>, SearchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.queries.lock().await.push(query.to_string());

        match &self.outcome {
            SearchOutcome::Hits(hits) => Ok(hits.clone()),
            SearchOutcome::Fail => Err(SearchError::Api {
                provider: self.name.clone(),
                status: 500,
                body: "Mock search failure".to_string(),
            }),
            SearchOutcome::Empty => Err(SearchError::Empty(self.name.clone())),
        }
    }
}

/// Mock chat endpoint recording every send attempt
#[derive(Debug, Default, Clone)]
pub struct MockMessenger {
    pub messages: Arc<Mutex<Vec<(String, ParseMode)>>>,
    pub photos: Arc<Mutex<Vec<(String, String)>>>,
    pub fail_markdown: bool,
    pub fail_messages: bool,
    pub fail_photos: bool,
    pub failing_photo_urls: HashSet<String>,
}

impl MockMessenger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Markdown sends fail; plain-text sends succeed
    pub fn failing_markdown() -> Self {
        Self {
            fail_markdown: true,
            ..Default::default()
        }
    }

    /// Every text send fails
    pub fn failing_messages() -> Self {
        Self {
            fail_messages: true,
            ..Default::default()
        }
    }

    /// Every send fails
    pub fn with_failure() -> Self {
        Self {
            fail_messages: true,
            fail_photos: true,
            ..Default::default()
        }
    }

    pub fn with_failing_photo(mut self, url: impl Into<String>) -> Self {
        self.failing_photo_urls.insert(url.into());
        self
    }

    pub async fn get_messages(&self) -> Vec<(String, ParseMode)> {
        self.messages.lock().await.clone()
    }

    pub async fn get_photos(&self) -> Vec<(String, String)> {
        self.photos.lock().await.clone()
    }

    /// Total send attempts of either kind
    pub async fn total_calls(&self) -> usize {
        self.messages.lock().await.len() + self.photos.lock().await.len()
    }
}

#[async_trait]
impl Messenger for MockMessenger {
    async fn send_message(&self, text: &str, mode: ParseMode) -> Result<(), DeliveryError> {
        self.messages.lock().await.push((text.to_string(), mode));

        if self.fail_messages || (self.fail_markdown && mode == ParseMode::Markdown) {
            return Err(DeliveryError::Api {
                status: 400,
                description: "Mock message failure".to_string(),
            });
        }
        Ok(())
    }

    async fn send_photo(&self, photo_url: &str, caption: &str) -> Result<(), DeliveryError> {
        self.photos
            .lock()
            .await
            .push((photo_url.to_string(), caption.to_string()));

        if self.fail_photos || self.failing_photo_urls.contains(photo_url) {
            return Err(DeliveryError::Api {
                status: 400,
                description: "Mock photo failure".to_string(),
            });
        }
        Ok(())
    }
}

/// Mock stage returning a fixed value or a fixed error
#[derive(Debug)]
pub struct MockStage<O> {
    name: &'static str,
    outcome: Result<O, String>,
    pub inputs: Arc<Mutex<Vec<StageInput>>>,
}

impl<O: Clone + Send + Sync> MockStage<O> {
    pub fn ok(name: &'static str, value: O) -> Self {
        Self {
            name,
            outcome: Ok(value),
            inputs: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn failing(name: &'static str, message: impl Into<String>) -> Self {
        Self {
            name,
            outcome: Err(message.into()),
            inputs: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub async fn get_inputs(&self) -> Vec<StageInput> {
        self.inputs.lock().await.clone()
    }
}

#[async_trait]
impl<O: Clone + Send + Sync> Stage<O> for MockStage<O> {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn run(&self, input: StageInput) -> PipelineResult<O> {
        self.inputs.lock().await.push(input);
        self.outcome
            .clone()
            .map_err(|message| PipelineError::stage(self.name, message))
    }
}
