//! Pipeline stages
//!
//! Every stage accepts a raw [`StageInput`] and normalizes it before use, so
//! no stage depends on the exact envelope its predecessor produced. Stages
//! prefer a degraded output over an error; only delivery can fail.

pub mod charts;
pub mod deliver;
pub mod retrieval;
pub mod summarize;
pub mod translate;

pub use charts::{ChartGenerator, ChartSource, PlaceholderCharts};
pub use deliver::{DeliveryOutcome, Deliverer};
pub use retrieval::NewsRetriever;
pub use summarize::{RetryPolicy, Summarizer};
pub use translate::Translator;

use crate::error::PipelineResult;
use crate::normalize::StageInput;
use async_trait::async_trait;

/// One pipeline unit producing `O`
#[async_trait]
pub trait Stage<O: Send>: Send + Sync {
    /// Stage name used in spans and errors
    fn name(&self) -> &'static str;

    async fn run(&self, input: StageInput) -> PipelineResult<O>;
}
