//! Delivery stage
//!
//! Formats a [`PipelineReport`] into one chat message (split into labeled
//! parts when oversized) and sends the chart references as photos. Only the
//! text send can fail the stage; chart sends are best-effort.

use crate::config::PipelineConfig;
use crate::error::{DeliveryError, PipelineResult};
use crate::model::PipelineReport;
use crate::normalize::{self, StageInput};
use crate::stages::Stage;
use crate::telegram::{Messenger, ParseMode};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::fmt;
use std::sync::Arc;
use tracing::{info, warn};

/// Characters neutralized before user text is embedded in a Markdown message
const MARKDOWN_SPECIALS: &[char] = &[
    '*', '_', '`', '[', ']', '(', ')', '~', '>', '#', '+', '-', '=', '|', '{', '}', '.', '!',
];

/// Room kept free in each chunk for the `Part i/N:` label
const PART_LABEL_RESERVE: usize = 32;

/// India Standard Time, UTC+05:30
const IST_OFFSET_MINUTES: i64 = 5 * 60 + 30;

const EMPTY_MESSAGE: &str = "Empty message";

/// Status of a delivery run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// Report was empty; the endpoint was not contacted
    NothingToSend,
    Delivered { parts: usize, charts_sent: usize },
}

impl fmt::Display for DeliveryOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeliveryOutcome::NothingToSend => write!(f, "No data available to send"),
            DeliveryOutcome::Delivered { charts_sent, .. } => {
                write!(f, "Successfully sent to Telegram! Charts sent: {charts_sent}")
            }
        }
    }
}

pub struct Deliverer {
    messenger: Arc<dyn Messenger>,
    max_charts: usize,
    message_limit: usize,
}

impl Deliverer {
    pub fn new(messenger: Arc<dyn Messenger>) -> Self {
        Self {
            messenger,
            max_charts: 5,
            message_limit: 4000,
        }
    }

    pub fn from_config(messenger: Arc<dyn Messenger>, config: &PipelineConfig) -> Self {
        Self {
            messenger,
            max_charts: config.pipeline.max_charts,
            message_limit: config.pipeline.message_limit,
        }
    }

    pub async fn deliver(&self, report: impl Into<StageInput>) -> PipelineResult<DeliveryOutcome> {
        let report = normalize::report(&report.into());
        if report.is_empty() {
            info!("Report is empty, nothing to deliver");
            return Ok(DeliveryOutcome::NothingToSend);
        }

        let timestamp = ist_timestamp(Utc::now());
        let message = format_message(&report, &timestamp);

        let parts = if message.chars().count() > self.message_limit {
            label_parts(split_message(&message, self.message_limit))
        } else {
            vec![message]
        };

        for part in &parts {
            self.send_text(part).await?;
        }
        info!("Sent summary in {} part(s)", parts.len());

        let charts_sent = self.send_charts(&report.charts, &timestamp).await;
        Ok(DeliveryOutcome::Delivered {
            parts: parts.len(),
            charts_sent,
        })
    }

    /// Markdown first, then once more as plain text
    async fn send_text(&self, text: &str) -> Result<(), DeliveryError> {
        match self.messenger.send_message(text, ParseMode::Markdown).await {
            Ok(()) => Ok(()),
            Err(e) => {
                warn!("Markdown send failed, retrying as plain text: {}", e);
                self.messenger.send_message(text, ParseMode::Plain).await
            }
        }
    }

    /// Returns the number of charts actually sent
    async fn send_charts(&self, charts: &[String], timestamp: &str) -> usize {
        let mut attempts = 0;
        let mut sent = 0;

        for chart in charts {
            if attempts >= self.max_charts {
                break;
            }
            if let Err(e) = validate_chart(chart) {
                warn!("Skipping chart: {}", e);
                continue;
            }

            attempts += 1;
            let caption = format!("📊 Market Chart {attempts}\n{timestamp}");
            match self.messenger.send_photo(chart, &caption).await {
                Ok(()) => sent += 1,
                Err(e) => warn!(chart = attempts, "Failed to send chart: {}", e),
            }
        }

        if charts.len() > attempts {
            info!(
                "Sent {}/{} charts ({} not attempted)",
                sent,
                charts.len(),
                charts.len() - attempts
            );
        }
        sent
    }
}

#[async_trait]
impl Stage<DeliveryOutcome> for Deliverer {
    fn name(&self) -> &'static str {
        "delivery"
    }

    async fn run(&self, input: StageInput) -> PipelineResult<DeliveryOutcome> {
        self.deliver(input).await
    }
}

fn validate_chart(chart: &str) -> Result<(), DeliveryError> {
    if chart.starts_with("http://") || chart.starts_with("https://") {
        Ok(())
    } else {
        Err(DeliveryError::InvalidChart(chart.to_string()))
    }
}

/// Assemble the chat message for `report`
pub fn format_message(report: &PipelineReport, timestamp: &str) -> String {
    let mut lines = vec!["📊 *DAILY MARKET SUMMARY*".to_string(), "=".repeat(30)];

    let summary = report.summary.trim();
    if !summary.is_empty() {
        lines.push(format!("\n📈 *Market Overview:*\n{}", escape_markdown(summary)));
    }

    if !report.translations.is_blank() {
        lines.push("\n🌐 *Translations Available:*".to_string());
        for (language, text) in report.translations.iter() {
            let text = text.trim();
            if !text.is_empty() {
                lines.push(format!("\n🔸 *{}:*\n{}", language, escape_markdown(text)));
            }
        }
    }

    if !report.charts.is_empty() {
        lines.push(format!(
            "\n📊 *Market Charts:* {} charts attached below",
            report.charts.len()
        ));
    }

    lines.push(format!("\n⏰ *Generated:* {timestamp}"));
    lines.push("📱 *Daily Financial Summary Bot*".to_string());
    lines.join("\n")
}

/// Backslash-escape Markdown-sensitive characters
pub fn escape_markdown(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if MARKDOWN_SPECIALS.contains(&c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Greedy line-accumulating split. Every chunk leaves room for a part label
/// within `limit`; only a line longer than that budget is cut mid-line.
pub fn split_message(message: &str, limit: usize) -> Vec<String> {
    let budget = limit.saturating_sub(PART_LABEL_RESERVE).max(1);
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for line in message.split('\n') {
        let line_len = line.chars().count();

        if line_len > budget {
            flush(&mut current, &mut current_len, &mut chunks);
            let chars: Vec<char> = line.chars().collect();
            for piece in chars.chunks(budget) {
                current = piece.iter().collect();
                current_len = piece.len();
                flush(&mut current, &mut current_len, &mut chunks);
            }
            continue;
        }

        if current_len + line_len + 1 > budget {
            flush(&mut current, &mut current_len, &mut chunks);
        }
        current.push_str(line);
        current.push('\n');
        current_len += line_len + 1;
    }
    flush(&mut current, &mut current_len, &mut chunks);

    if chunks.is_empty() {
        chunks.push(EMPTY_MESSAGE.to_string());
    }
    chunks
}

fn flush(current: &mut String, current_len: &mut usize, chunks: &mut Vec<String>) {
    let trimmed = current.trim();
    if !trimmed.is_empty() {
        chunks.push(trimmed.to_string());
    }
    current.clear();
    *current_len = 0;
}

/// Prefix each chunk with `Part i/N:`
pub fn label_parts(chunks: Vec<String>) -> Vec<String> {
    let total = chunks.len();
    chunks
        .into_iter()
        .enumerate()
        .map(|(i, chunk)| format!("Part {}/{}:\n\n{}", i + 1, total, chunk))
        .collect()
}

/// `now` rendered in India Standard Time
pub fn ist_timestamp(now: DateTime<Utc>) -> String {
    (now + Duration::minutes(IST_OFFSET_MINUTES))
        .format("%Y-%m-%d %H:%M IST")
        .to_string()
}
