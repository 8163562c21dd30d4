//! Translation stage
//!
//! A single completion request asks for strict JSON with one key per
//! language. Missing keys are backfilled with the source text; any request
//! or parse failure yields the source text under every key.

use crate::config::PipelineConfig;
use crate::error::PipelineResult;
use crate::llm::provider::{CompletionRequest, LlmError, LlmProvider};
use crate::model::{Language, TranslationMap};
use crate::normalize::{self, StageInput};
use crate::stages::Stage;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

const SYSTEM_PROMPT: &str = "You are a professional translator.";

static JSON_OBJECT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)\{.*\}").expect("JSON object pattern is valid"));

pub struct Translator {
    llm: Arc<dyn LlmProvider>,
    model: String,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
}

impl Translator {
    pub fn new(llm: Arc<dyn LlmProvider>, model: impl Into<String>) -> Self {
        Self {
            llm,
            model: model.into(),
            temperature: None,
            max_tokens: None,
        }
    }

    pub fn from_config(llm: Arc<dyn LlmProvider>, config: &PipelineConfig) -> Self {
        Self {
            llm,
            model: config.llm.model.clone(),
            temperature: config.llm.temperature,
            max_tokens: config.llm.max_tokens,
        }
    }

    /// Translations of `summary`; never fails
    pub async fn translate(&self, summary: impl Into<StageInput>) -> TranslationMap {
        let text = normalize::summary(&summary.into());
        if text.trim().is_empty() {
            return TranslationMap::default();
        }

        match self.request_translations(&text).await {
            Ok(translations) => translations,
            Err(e) => {
                warn!("Translation failed, using source text: {}", e);
                TranslationMap::uniform(text)
            }
        }
    }

    async fn request_translations(&self, text: &str) -> Result<TranslationMap, LlmError> {
        let request = CompletionRequest::with_system(&self.model, SYSTEM_PROMPT, build_prompt(text))
            .temperature(self.temperature)
            .max_tokens(self.max_tokens);

        let content = self.llm.complete(request).await?.into_text()?;
        parse_translations(&content, text)
    }
}

#[async_trait]
impl Stage<TranslationMap> for Translator {
    fn name(&self) -> &'static str {
        "translation"
    }

    async fn run(&self, input: StageInput) -> PipelineResult<TranslationMap> {
        Ok(self.translate(input).await)
    }
}

fn build_prompt(text: &str) -> String {
    let keys = Language::ALL
        .iter()
        .map(|lang| format!("\"{}\"", lang.key()))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "Translate the following text into Hindi, Arabic, and Hebrew.\n\
         STRICTLY return valid JSON ONLY. NO extra text, NO explanations.\n\
         The JSON must have exactly these keys: {keys}.\n\n\
         Text:\n{text}\n"
    )
}

/// Extract the JSON object from `content` and backfill absent or null keys
/// with `source`
pub fn parse_translations(content: &str, source: &str) -> Result<TranslationMap, LlmError> {
    let object = JSON_OBJECT
        .find(content)
        .ok_or_else(|| LlmError::InvalidResponse("no JSON object in translation".to_string()))?;

    let decoded: Value = serde_json::from_str(object.as_str())
        .map_err(|e| LlmError::InvalidResponse(format!("translation JSON: {e}")))?;
    let Value::Object(map) = decoded else {
        return Err(LlmError::InvalidResponse(
            "translation JSON is not an object".to_string(),
        ));
    };

    let mut translations = TranslationMap::default();
    for language in Language::ALL {
        let value = match map.get(language.key()) {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Null) | None => {
                debug!(language = language.key(), "Backfilling missing translation");
                source.to_string()
            }
            Some(other) => other.to_string(),
        };
        translations.set(language, value);
    }
    Ok(translations)
}
