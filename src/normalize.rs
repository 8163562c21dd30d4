//! Input normalization for stage boundaries
//!
//! Stage outputs reach the next stage in one of a closed set of envelopes:
//! a direct JSON value, a keyed mapping (domain keys or a generic `raw`
//! wrapper), or an opaque container that only has a text representation.
//! Every stage runs its input through this module before use, and every
//! function here returns a value of the requested shape without failing.
//!
//! The `recover_*` functions are the best-effort text-to-structure rules used
//! when nothing structured is available. The rule set is deliberately finite:
//! a keyword check for summary-like text, one URL pattern for chart
//! references, and a fixed pattern list per translation language.

use crate::model::{ChartReference, Language, PipelineReport, TranslationMap};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};

/// Keys searched, in order, when a mapping should yield text
const TEXT_KEYS: &[&str] = &["summary", "text", "content", "query", "description"];

/// Keys searched, in order, when a mapping should yield a list of strings
const LIST_KEYS: &[&str] = &["news", "headlines", "description", "results"];

/// Keys that mark a mapping as an already-structured report
const REPORT_KEYS: &[&str] = &["summary", "charts", "translations"];

/// Generic wrapper keys around a task result
const WRAPPER_KEYS: &[&str] = &["raw", "result", "output"];

/// Terms that make an unstructured blob look like a market summary
const SUMMARY_KEYWORDS: &[&str] = &[
    "market",
    "stock",
    "trading",
    "financial",
    "dow",
    "nasdaq",
    "s&p",
    "price",
];

/// Terms that make a nested value look like it carries a report
const REPORT_HINTS: &[&str] = &["summary", "chart", "translation"];

/// Lines kept when recovering a summary from raw text
const RECOVERED_SUMMARY_LINES: usize = 10;

/// Minimum length of a recovered summary line
const RECOVERED_LINE_MIN_CHARS: usize = 20;

static CHART_URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?i)https?://[^\s<>"{}|\\^`\[\]]+(?:\.(?:jpg|jpeg|png|gif|webp|svg)|&text=Chart\d*)"#,
    )
    .expect("chart URL pattern is valid")
});

static TRANSLATION_PATTERNS: Lazy<Vec<(Language, Vec<Regex>)>> = Lazy::new(|| {
    let compile = |patterns: &[&str]| {
        patterns
            .iter()
            .map(|p| Regex::new(p).expect("translation pattern is valid"))
            .collect::<Vec<_>>()
    };
    vec![
        (
            Language::Hindi,
            compile(&[
                r"(?i)hindi[:\s]*([^A-Za-z\n]+)",
                r"हिंदी[:\s]*([^\n]+)",
                r"दैनिक[^A-Za-z\n]*",
            ]),
        ),
        (
            Language::Arabic,
            compile(&[
                r"(?i)arabic[:\s]*([^A-Za-z\n]+)",
                r"عربي[:\s]*([^\n]+)",
                r"يومي[^A-Za-z\n]*",
            ]),
        ),
        (
            Language::Hebrew,
            compile(&[
                r"(?i)hebrew[:\s]*([^A-Za-z\n]+)",
                r"עברית[:\s]*([^\n]+)",
                r"יומי[^A-Za-z\n]*",
            ]),
        ),
    ]
});

/// Raw payload handed from one stage to the next
#[derive(Debug, Clone, PartialEq)]
pub enum StageInput {
    /// Structured value (plain value or keyed mapping)
    Value(Value),
    /// Object-like container known only by its text representation
    Opaque(String),
}

impl StageInput {
    pub fn opaque(text: impl Into<String>) -> Self {
        Self::Opaque(text.into())
    }

    /// Classify into one of the recognized envelope shapes
    fn envelope(&self) -> Envelope<'_> {
        match self {
            StageInput::Value(Value::Object(map)) => Envelope::Keyed(map),
            StageInput::Value(value) => Envelope::Direct(value),
            StageInput::Opaque(text) => Envelope::Opaque(text),
        }
    }
}

impl Default for StageInput {
    fn default() -> Self {
        Self::Value(Value::Null)
    }
}

impl From<Value> for StageInput {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

impl From<String> for StageInput {
    fn from(value: String) -> Self {
        Self::Value(Value::String(value))
    }
}

impl From<&str> for StageInput {
    fn from(value: &str) -> Self {
        Self::Value(Value::String(value.to_string()))
    }
}

impl From<Option<&str>> for StageInput {
    fn from(value: Option<&str>) -> Self {
        value.map(StageInput::from).unwrap_or_default()
    }
}

impl From<Vec<String>> for StageInput {
    fn from(value: Vec<String>) -> Self {
        Self::Value(Value::Array(value.into_iter().map(Value::String).collect()))
    }
}

impl From<TranslationMap> for StageInput {
    fn from(value: TranslationMap) -> Self {
        Self::Value(serde_json::to_value(value).unwrap_or_default())
    }
}

impl From<PipelineReport> for StageInput {
    fn from(value: PipelineReport) -> Self {
        Self::Value(serde_json::to_value(value).unwrap_or_default())
    }
}

/// Envelope shapes recognized at a stage boundary
enum Envelope<'a> {
    Direct(&'a Value),
    Keyed(&'a Map<String, Value>),
    Opaque(&'a str),
}

/// Shape a stage asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    Text,
    TextList,
    SummaryLike,
    ReportLike,
}

/// Output of [`normalize`], always of the requested shape
#[derive(Debug, Clone, PartialEq)]
pub enum Normalized {
    Text(String),
    TextList(Vec<String>),
    Summary(String),
    Report(PipelineReport),
}

impl Normalized {
    pub fn shape(&self) -> Shape {
        match self {
            Normalized::Text(_) => Shape::Text,
            Normalized::TextList(_) => Shape::TextList,
            Normalized::Summary(_) => Shape::SummaryLike,
            Normalized::Report(_) => Shape::ReportLike,
        }
    }
}

/// Normalize `input` into `shape`
pub fn normalize(input: &StageInput, shape: Shape) -> Normalized {
    match shape {
        Shape::Text => Normalized::Text(text(input)),
        Shape::TextList => Normalized::TextList(text_list(input)),
        Shape::SummaryLike => Normalized::Summary(summary(input)),
        Shape::ReportLike => Normalized::Report(report(input)),
    }
}

/// Plain text; opaque containers are taken verbatim
pub fn text(input: &StageInput) -> String {
    match input.envelope() {
        Envelope::Direct(value) => text_from_value(value),
        Envelope::Keyed(map) => text_from_map(map),
        Envelope::Opaque(raw) => raw.to_string(),
    }
}

/// Flat list of non-empty strings
pub fn text_list(input: &StageInput) -> Vec<String> {
    match input.envelope() {
        Envelope::Direct(value) => list_from_value(value),
        Envelope::Keyed(map) => list_from_map(map),
        Envelope::Opaque(raw) => split_lines(raw),
    }
}

/// Summary text; JSON-encoded mappings are decoded and opaque containers
/// are only accepted when they look like market commentary
pub fn summary(input: &StageInput) -> String {
    match input.envelope() {
        Envelope::Direct(value) => summary_from_value(value),
        Envelope::Keyed(map) => text_from_map(map),
        Envelope::Opaque(raw) => recover_summary(raw),
    }
}

/// Report with all three fields present
pub fn report(input: &StageInput) -> PipelineReport {
    match input.envelope() {
        Envelope::Direct(value) => report_from_value(value),
        Envelope::Keyed(map) => report_from_map(map),
        Envelope::Opaque(raw) => recover_report(raw),
    }
}

fn text_from_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(_) | Value::Number(_) => value.to_string(),
        Value::Array(items) => items
            .iter()
            .map(text_from_value)
            .filter(|s| !s.trim().is_empty())
            .collect::<Vec<_>>()
            .join("\n"),
        Value::Object(map) => text_from_map(map),
    }
}

fn text_from_map(map: &Map<String, Value>) -> String {
    for key in TEXT_KEYS {
        match map.get(*key) {
            Some(Value::String(s)) => return s.clone(),
            Some(Value::Object(inner)) => {
                let found = text_from_map(inner);
                if !found.is_empty() {
                    return found;
                }
            }
            _ => {}
        }
    }

    if let Some(s) = map.values().find_map(|v| v.as_str()) {
        return s.to_string();
    }

    match wrapped(map) {
        Some(inner) => text_from_value(inner),
        None => String::new(),
    }
}

fn summary_from_value(value: &Value) -> String {
    match value {
        Value::String(s) => match decode_structured(s) {
            Some(Value::Object(map)) => text_from_map(&map),
            Some(array @ Value::Array(_)) => text_from_value(&array),
            _ => s.clone(),
        },
        other => text_from_value(other),
    }
}

fn list_from_value(value: &Value) -> Vec<String> {
    match value {
        Value::Null => Vec::new(),
        Value::String(s) => list_from_str(s),
        Value::Bool(_) | Value::Number(_) => vec![value.to_string()],
        Value::Array(items) => items
            .iter()
            .map(|item| text_from_value(item).trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
        Value::Object(map) => list_from_map(map),
    }
}

fn list_from_str(s: &str) -> Vec<String> {
    match decode_structured(s) {
        Some(array @ Value::Array(_)) => list_from_value(&array),
        Some(Value::Object(map)) => list_from_map(&map),
        _ => split_lines(s),
    }
}

fn list_from_map(map: &Map<String, Value>) -> Vec<String> {
    for key in LIST_KEYS {
        match map.get(*key) {
            Some(array @ Value::Array(_)) => return list_from_value(array),
            Some(Value::String(s)) if !s.trim().is_empty() => return split_lines(s),
            _ => {}
        }
    }

    if let Some(array) = map.values().find(|v| v.is_array()) {
        return list_from_value(array);
    }

    match wrapped(map) {
        Some(inner) => list_from_value(inner),
        None => Vec::new(),
    }
}

fn report_from_value(value: &Value) -> PipelineReport {
    match value {
        Value::Null => PipelineReport::default(),
        Value::Object(map) => report_from_map(map),
        Value::String(s) => match decode_structured(s) {
            Some(Value::Object(map)) => report_from_map(&map),
            _ => PipelineReport {
                summary: s.clone(),
                ..Default::default()
            },
        },
        Value::Array(_) => recover_report(&text_from_value(value)),
        Value::Bool(_) | Value::Number(_) => PipelineReport {
            summary: value.to_string(),
            ..Default::default()
        },
    }
}

fn report_from_map(map: &Map<String, Value>) -> PipelineReport {
    if REPORT_KEYS.iter().any(|key| map.contains_key(*key)) {
        return PipelineReport {
            summary: map.get("summary").map(summary_from_value).unwrap_or_default(),
            charts: map.get("charts").map(list_from_value).unwrap_or_default(),
            translations: map
                .get("translations")
                .map(translations_from_value)
                .unwrap_or_default(),
        };
    }

    if let Some(inner) = wrapped(map) {
        return report_from_value(inner);
    }

    let nested = map.values().find(|value| {
        if !(value.is_object() || value.is_array() || value.is_string()) {
            return false;
        }
        let lowered = value.to_string().to_lowercase();
        REPORT_HINTS.iter().any(|hint| lowered.contains(hint))
    });
    if let Some(value) = nested {
        return report_from_value(value);
    }

    recover_report(&Value::Object(map.clone()).to_string())
}

fn translations_from_value(value: &Value) -> TranslationMap {
    match value {
        Value::Object(map) => {
            let mut translations = TranslationMap::default();
            for language in Language::ALL {
                let entry = map
                    .get(language.key())
                    .or_else(|| map.get(&language.key().to_lowercase()));
                if let Some(entry) = entry {
                    translations.set(language, text_from_value(entry));
                }
            }
            translations
        }
        Value::String(s) => match decode_structured(s) {
            Some(decoded @ Value::Object(_)) => translations_from_value(&decoded),
            _ => recover_translations(s),
        },
        _ => TranslationMap::default(),
    }
}

fn wrapped(map: &Map<String, Value>) -> Option<&Value> {
    WRAPPER_KEYS.iter().find_map(|key| map.get(*key))
}

/// Decode `s` as JSON when it looks like an object or array
fn decode_structured(s: &str) -> Option<Value> {
    let trimmed = s.trim_start();
    if !(trimmed.starts_with('{') || trimmed.starts_with('[')) {
        return None;
    }
    serde_json::from_str(s).ok()
}

fn split_lines(s: &str) -> Vec<String> {
    s.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Recover all report fields from unstructured text
pub fn recover_report(text: &str) -> PipelineReport {
    PipelineReport {
        summary: recover_summary(text),
        charts: recover_chart_urls(text),
        translations: recover_translations(text),
    }
}

/// Summary lines from text that mentions market terms, empty otherwise
pub fn recover_summary(text: &str) -> String {
    let lowered = text.to_lowercase();
    if !SUMMARY_KEYWORDS.iter().any(|k| lowered.contains(k)) {
        return String::new();
    }

    text.lines()
        .map(str::trim)
        .filter(|line| line.chars().count() > RECOVERED_LINE_MIN_CHARS && !line.starts_with("http"))
        .take(RECOVERED_SUMMARY_LINES)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Image-like URLs, deduplicated in first-seen order
pub fn recover_chart_urls(text: &str) -> Vec<ChartReference> {
    let mut charts: Vec<ChartReference> = Vec::new();
    for m in CHART_URL.find_iter(text) {
        let url = m.as_str();
        if !charts.iter().any(|c| c == url) {
            charts.push(url.to_string());
        }
    }
    charts
}

/// Per-language translation text found by keyword or in-script token
pub fn recover_translations(text: &str) -> TranslationMap {
    let mut translations = TranslationMap::default();

    for (language, patterns) in TRANSLATION_PATTERNS.iter() {
        for pattern in patterns {
            let Some(caps) = pattern.captures(text) else {
                continue;
            };
            let found = caps
                .get(1)
                .or_else(|| caps.get(0))
                .map(|m| clean_fragment(m.as_str()))
                .unwrap_or_default();
            if !found.is_empty() {
                translations.set(*language, found);
                break;
            }
        }
    }

    translations
}

fn clean_fragment(s: &str) -> String {
    s.trim_matches(|c: char| c.is_whitespace() || matches!(c, '"' | '\'' | ',' | ':' | '}' | '{'))
        .to_string()
}
