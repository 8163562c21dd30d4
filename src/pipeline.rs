//! Pipeline orchestrator
//!
//! [`MarketPipeline`] runs the five stages in dependency order and owns the
//! failure policy: any stage error moves it to `ErrorNotifying`, where one
//! best-effort failure notice is delivered before the original error is
//! returned. [`run_simplified`] is the degraded path used when the primary
//! stage set cannot be built; it runs the same stages without notification.

use crate::config::{Credentials, PipelineConfig};
use crate::error::{PipelineError, PipelineResult};
use crate::llm::provider::LlmProvider;
use crate::llm::providers::{DisabledProvider, OpenAiConfig, OpenAiProvider};
use crate::model::{ChartReference, Headline, PipelineReport, PipelineState, TranslationMap};
use crate::normalize::StageInput;
use crate::stages::{
    ChartGenerator, Deliverer, DeliveryOutcome, NewsRetriever, RetryPolicy, Stage, Summarizer,
    Translator,
};
use crate::telegram::{Messenger, TelegramClient};
use crate::{run_span, stage_span};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn, Instrument};
use uuid::Uuid;

/// The five stages of a run
#[derive(Clone)]
pub struct StageSet {
    pub retrieval: Arc<dyn Stage<Vec<Headline>>>,
    pub summarization: Arc<dyn Stage<String>>,
    pub charts: Arc<dyn Stage<Vec<ChartReference>>>,
    pub translation: Arc<dyn Stage<TranslationMap>>,
    pub delivery: Arc<dyn Stage<DeliveryOutcome>>,
}

impl StageSet {
    /// Live stages backed by the configured model, search and chat clients
    pub fn from_config(config: &PipelineConfig, credentials: &Credentials) -> PipelineResult<Self> {
        let llm = OpenAiProvider::new(OpenAiConfig::from_section(
            &config.llm,
            &credentials.llm_api_key,
        ))
        .map_err(|e| PipelineError::initialization(format!("model client: {e}")))?;

        Self::with_llm(config, credentials, Arc::new(llm))
    }

    /// Stages with the model disabled; summarization and translation run on
    /// their fallbacks while retrieval and delivery stay live. Summarization
    /// makes a single attempt since the disabled model can never succeed.
    pub fn degraded(config: &PipelineConfig, credentials: &Credentials) -> PipelineResult<Self> {
        let llm: Arc<dyn LlmProvider> = Arc::new(DisabledProvider::new(
            "model client unavailable in simplified mode",
        ));
        let mut stages = Self::with_llm(config, credentials, Arc::clone(&llm))?;
        stages.summarization = Arc::new(
            Summarizer::from_config(llm, config).with_retry(RetryPolicy::single()),
        );
        Ok(stages)
    }

    fn with_llm(
        config: &PipelineConfig,
        credentials: &Credentials,
        llm: Arc<dyn LlmProvider>,
    ) -> PipelineResult<Self> {
        let retriever = NewsRetriever::from_config(config, credentials)?;
        let messenger = TelegramClient::new(
            &credentials.telegram_bot_token,
            &credentials.telegram_chat_id,
            &config.telegram.api_base,
            Duration::from_secs(config.telegram.timeout_secs),
        )
        .map_err(|e| PipelineError::initialization(format!("chat client: {e}")))?;

        Ok(Self::with_collaborators(
            config,
            llm,
            retriever,
            Arc::new(messenger),
        ))
    }

    /// Assemble stages from already-built collaborators
    pub fn with_collaborators(
        config: &PipelineConfig,
        llm: Arc<dyn LlmProvider>,
        retriever: NewsRetriever,
        messenger: Arc<dyn Messenger>,
    ) -> Self {
        Self {
            retrieval: Arc::new(retriever),
            summarization: Arc::new(Summarizer::from_config(Arc::clone(&llm), config)),
            charts: Arc::new(ChartGenerator::placeholder()),
            translation: Arc::new(Translator::from_config(llm, config)),
            delivery: Arc::new(Deliverer::from_config(messenger, config)),
        }
    }
}

/// Primary orchestrator
pub struct MarketPipeline {
    stages: StageSet,
    state: PipelineState,
    history: Vec<PipelineState>,
}

impl MarketPipeline {
    pub fn new(stages: StageSet) -> Self {
        Self {
            stages,
            state: PipelineState::Idle,
            history: vec![PipelineState::Idle],
        }
    }

    pub fn from_config(config: &PipelineConfig, credentials: &Credentials) -> PipelineResult<Self> {
        Ok(Self::new(StageSet::from_config(config, credentials)?))
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// Every state entered so far, starting with `Idle`
    pub fn history(&self) -> &[PipelineState] {
        &self.history
    }

    fn transition(&mut self, next: PipelineState) {
        debug!(from = %self.state, to = %next, "State transition");
        self.state = next;
        self.history.push(next);
    }

    /// Run once. On failure a notice is delivered and the original error returned.
    pub async fn run(&mut self, query: impl Into<StageInput>) -> PipelineResult<DeliveryOutcome> {
        let query = query.into();
        let span = run_span!(run_id = %Uuid::new_v4(), mode = "primary");

        async move {
            info!("Pipeline run started");
            let started = Instant::now();

            match self.execute(query).await {
                Ok(outcome) => {
                    self.transition(PipelineState::Done);
                    info!(
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "Pipeline run finished: {}", outcome
                    );
                    Ok(outcome)
                }
                Err(e) => {
                    error!("Pipeline run failed: {}", e.sanitized());
                    self.notify_failure(&e).await;
                    Err(e)
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn execute(&mut self, query: StageInput) -> PipelineResult<DeliveryOutcome> {
        let stages = self.stages.clone();

        self.transition(PipelineState::Retrieving);
        let headlines = run_stage(stages.retrieval.as_ref(), query).await?;

        self.transition(PipelineState::Summarizing);
        let summary = run_stage(stages.summarization.as_ref(), headlines.into()).await?;

        self.transition(PipelineState::ChartingAndTranslating);
        let charts = run_stage(stages.charts.as_ref(), summary.clone().into()).await?;
        let translations = run_stage(stages.translation.as_ref(), summary.clone().into()).await?;

        self.transition(PipelineState::Delivering);
        let report = PipelineReport::new(summary, charts, translations);
        run_stage(stages.delivery.as_ref(), report.into()).await
    }

    /// One best-effort delivery of a failure notice; its own failure is only logged
    async fn notify_failure(&mut self, error: &PipelineError) {
        self.transition(PipelineState::ErrorNotifying);
        let notice = PipelineReport::failure_notice(&error.sanitized());

        match self.stages.delivery.run(notice.into()).await {
            Ok(outcome) => info!("Failure notice delivered: {}", outcome),
            Err(e) => warn!("Failure notice could not be delivered: {}", e.sanitized()),
        }
    }
}

async fn run_stage<O: Send>(stage: &dyn Stage<O>, input: StageInput) -> PipelineResult<O> {
    let span = stage_span!(stage = stage.name());

    async move {
        let started = Instant::now();
        let result = stage.run(input).await;
        let elapsed_ms = started.elapsed().as_millis() as u64;
        match &result {
            Ok(_) => debug!(elapsed_ms, "Stage completed"),
            Err(e) => error!(elapsed_ms, "Stage failed: {}", e.sanitized()),
        }
        result
    }
    .instrument(span)
    .await
}

/// Degraded mode: the same stages in order, no state machine and no failure notice
pub async fn run_simplified(
    stages: &StageSet,
    query: impl Into<StageInput>,
) -> PipelineResult<DeliveryOutcome> {
    let span = run_span!(run_id = %Uuid::new_v4(), mode = "simplified");

    async move {
        info!("Simplified pipeline run started");
        let headlines = run_stage(stages.retrieval.as_ref(), query.into()).await?;
        let summary = run_stage(stages.summarization.as_ref(), headlines.into()).await?;
        let charts = run_stage(stages.charts.as_ref(), summary.clone().into()).await?;
        let translations = run_stage(stages.translation.as_ref(), summary.clone().into()).await?;
        let report = PipelineReport::new(summary, charts, translations);
        run_stage(stages.delivery.as_ref(), report.into()).await
    }
    .instrument(span)
    .await
}

/// Which orchestrator handled a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    Primary,
    Simplified,
}

impl std::fmt::Display for RunMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunMode::Primary => f.write_str("primary"),
            RunMode::Simplified => f.write_str("simplified"),
        }
    }
}

/// Primary mode, falling back to simplified mode only when the primary
/// stage set fails to initialize
pub async fn run_with_fallback(
    config: &PipelineConfig,
    credentials: &Credentials,
    query: impl Into<StageInput>,
) -> (RunMode, PipelineResult<DeliveryOutcome>) {
    let query = query.into();

    match MarketPipeline::from_config(config, credentials) {
        Ok(mut pipeline) => (RunMode::Primary, pipeline.run(query).await),
        Err(e) if e.is_initialization() => {
            warn!(
                "Primary pipeline failed to initialize, using simplified mode: {}",
                e.sanitized()
            );
            let result = match StageSet::degraded(config, credentials) {
                Ok(stages) => run_simplified(&stages, query).await,
                Err(e) => Err(e),
            };
            (RunMode::Simplified, result)
        }
        Err(e) => (RunMode::Primary, Err(e)),
    }
}
