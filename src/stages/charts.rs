//! Chart stage
//!
//! Chart images come from a [`ChartSource`]. The only source shipped is
//! [`PlaceholderCharts`], which ignores the summary and returns two fixed
//! image URLs.

use crate::error::PipelineResult;
use crate::model::ChartReference;
use crate::normalize::{self, StageInput};
use crate::stages::Stage;
use async_trait::async_trait;
use tracing::debug;

const PLACEHOLDER_BASE: &str = "https://dummyimage.com/600x400/000/fff";

/// Produces chart references for a summary
#[async_trait]
pub trait ChartSource: Send + Sync {
    async fn charts_for(&self, summary: &str) -> Vec<ChartReference>;
}

/// Fixed two-image placeholder source
#[derive(Debug, Clone, Copy, Default)]
pub struct PlaceholderCharts;

#[async_trait]
impl ChartSource for PlaceholderCharts {
    async fn charts_for(&self, _summary: &str) -> Vec<ChartReference> {
        (1..=2)
            .map(|n| format!("{PLACEHOLDER_BASE}&text=Chart{n}"))
            .collect()
    }
}

pub struct ChartGenerator {
    source: Box<dyn ChartSource>,
}

impl ChartGenerator {
    pub fn new(source: Box<dyn ChartSource>) -> Self {
        Self { source }
    }

    pub fn placeholder() -> Self {
        Self::new(Box::new(PlaceholderCharts))
    }

    pub async fn generate(&self, summary: impl Into<StageInput>) -> Vec<ChartReference> {
        let summary = normalize::summary(&summary.into());
        let charts = self.source.charts_for(&summary).await;
        debug!("Generated {} chart references", charts.len());
        charts
    }
}

impl Default for ChartGenerator {
    fn default() -> Self {
        Self::placeholder()
    }
}

#[async_trait]
impl Stage<Vec<ChartReference>> for ChartGenerator {
    fn name(&self) -> &'static str {
        "charts"
    }

    async fn run(&self, input: StageInput) -> PipelineResult<Vec<ChartReference>> {
        Ok(self.generate(input).await)
    }
}
