//! Data model shared by the pipeline stages

use serde::{Deserialize, Serialize};
use std::fmt;

/// A single news line, `"<title> - <snippet>"` for live results
pub type Headline = String;

/// URL (or opaque reference) of a chart image
pub type ChartReference = String;

/// Target languages of the translation stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Language {
    Hindi,
    Arabic,
    Hebrew,
}

impl Language {
    pub const ALL: [Language; 3] = [Language::Hindi, Language::Arabic, Language::Hebrew];

    /// Key used in JSON payloads and message headings
    pub fn key(self) -> &'static str {
        match self {
            Language::Hindi => "Hindi",
            Language::Arabic => "Arabic",
            Language::Hebrew => "Hebrew",
        }
    }

    /// Language name written in its own script
    pub fn native_name(self) -> &'static str {
        match self {
            Language::Hindi => "हिंदी",
            Language::Arabic => "عربي",
            Language::Hebrew => "עברית",
        }
    }

    /// "Pipeline failed" sentinel sent during error notification
    pub fn failure_sentinel(self) -> &'static str {
        match self {
            Language::Hindi => "दैनिक सारांश विफल हुआ",
            Language::Arabic => "فشل الملخص اليومي",
            Language::Hebrew => "סיכום יומי נכשל",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Translations keyed by the three fixed languages. Every key is always present.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationMap {
    #[serde(rename = "Hindi", default)]
    pub hindi: String,
    #[serde(rename = "Arabic", default)]
    pub arabic: String,
    #[serde(rename = "Hebrew", default)]
    pub hebrew: String,
}

impl TranslationMap {
    /// Same text under every language
    pub fn uniform(text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            hindi: text.clone(),
            arabic: text.clone(),
            hebrew: text,
        }
    }

    /// The localized "failed" sentinels used by error notification
    pub fn failure_sentinels() -> Self {
        Self {
            hindi: Language::Hindi.failure_sentinel().to_string(),
            arabic: Language::Arabic.failure_sentinel().to_string(),
            hebrew: Language::Hebrew.failure_sentinel().to_string(),
        }
    }

    pub fn get(&self, language: Language) -> &str {
        match language {
            Language::Hindi => &self.hindi,
            Language::Arabic => &self.arabic,
            Language::Hebrew => &self.hebrew,
        }
    }

    pub fn set(&mut self, language: Language, text: impl Into<String>) {
        let slot = match language {
            Language::Hindi => &mut self.hindi,
            Language::Arabic => &mut self.arabic,
            Language::Hebrew => &mut self.hebrew,
        };
        *slot = text.into();
    }

    /// Entries in fixed language order
    pub fn iter(&self) -> impl Iterator<Item = (Language, &str)> {
        Language::ALL.into_iter().map(move |lang| (lang, self.get(lang)))
    }

    /// True when every translation is blank
    pub fn is_blank(&self) -> bool {
        self.iter().all(|(_, text)| text.trim().is_empty())
    }
}

/// Aggregate handed to the delivery stage
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineReport {
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub charts: Vec<ChartReference>,
    #[serde(default)]
    pub translations: TranslationMap,
}

/// Characters of the error message kept in a failure notice
pub const NOTICE_ERROR_CHARS: usize = 200;

impl PipelineReport {
    pub fn new(
        summary: impl Into<String>,
        charts: Vec<ChartReference>,
        translations: TranslationMap,
    ) -> Self {
        Self {
            summary: summary.into(),
            charts,
            translations,
        }
    }

    /// Minimal report sent when the pipeline fails; the error text is cut to
    /// [`NOTICE_ERROR_CHARS`] characters
    pub fn failure_notice(error_summary: &str) -> Self {
        let error_summary: String = error_summary.chars().take(NOTICE_ERROR_CHARS).collect();
        Self {
            summary: format!("Daily market summary failed due to technical issue: {error_summary}"),
            charts: Vec::new(),
            translations: TranslationMap::failure_sentinels(),
        }
    }

    /// True when there is nothing worth sending
    pub fn is_empty(&self) -> bool {
        self.summary.trim().is_empty() && self.charts.is_empty() && self.translations.is_blank()
    }
}

/// Orchestrator states. A successful run ends in `Done`, a failed one in
/// `ErrorNotifying`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    Retrieving,
    Summarizing,
    ChartingAndTranslating,
    Delivering,
    ErrorNotifying,
    Done,
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineState::Idle => "idle",
            PipelineState::Retrieving => "retrieving",
            PipelineState::Summarizing => "summarizing",
            PipelineState::ChartingAndTranslating => "charting_and_translating",
            PipelineState::Delivering => "delivering",
            PipelineState::ErrorNotifying => "error_notifying",
            PipelineState::Done => "done",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_translation_map_serializes_with_language_keys() {
        let map = TranslationMap {
            hindi: "a".to_string(),
            arabic: "b".to_string(),
            hebrew: "c".to_string(),
        };
        let json = serde_json::to_value(&map).unwrap();
        assert_eq!(json["Hindi"], "a");
        assert_eq!(json["Arabic"], "b");
        assert_eq!(json["Hebrew"], "c");
    }

    #[test]
    fn test_translation_map_blank() {
        assert!(TranslationMap::default().is_blank());
        assert!(TranslationMap::uniform("  ").is_blank());

        let mut map = TranslationMap::default();
        map.set(Language::Arabic, "نص");
        assert!(!map.is_blank());
        assert_eq!(map.get(Language::Arabic), "نص");
    }

    #[test]
    fn test_failure_notice() {
        let report = PipelineReport::failure_notice("boom");
        assert!(report.summary.ends_with("boom"));
        assert!(report.charts.is_empty());
        assert_eq!(report.translations.hebrew, "סיכום יומי נכשל");
        assert!(!report.is_empty());
    }

    #[test]
    fn test_failure_notice_truncates_long_errors() {
        let error = "x".repeat(450);
        let report = PipelineReport::failure_notice(&error);

        let embedded = report
            .summary
            .strip_prefix("Daily market summary failed due to technical issue: ")
            .unwrap();
        assert_eq!(embedded.chars().count(), NOTICE_ERROR_CHARS);

        let report = PipelineReport::failure_notice(&"é".repeat(201));
        assert!(report.summary.ends_with(&"é".repeat(200)));
    }

    #[test]
    fn test_empty_report() {
        assert!(PipelineReport::default().is_empty());
        let report =
            PipelineReport::new("", vec!["https://x/y.png".to_string()], Default::default());
        assert!(!report.is_empty());
    }
}
