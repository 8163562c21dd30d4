//! Market Digest
//!
//! A daily financial news pipeline: retrieve market headlines, summarize
//! them with a language model, attach charts, translate the summary into
//! Hindi, Arabic and Hebrew, and deliver the result to a Telegram chat.
//!
//! # Overview
//!
//! - [`stages`] holds the five pipeline stages behind the [`stages::Stage`] seam
//! - [`pipeline`] wires them into the orchestrator and its simplified fallback
//! - [`normalize`] turns whatever a stage produced into the shape the next one needs
//! - [`llm`], [`search`] and [`telegram`] are the external collaborators
//!
//! # Quick Start
//!
//! ```rust
//! use market_digest::normalize::{self, StageInput};
//! use serde_json::json;
//!
//! // Stage outputs arrive in many envelopes; each stage normalizes its input
//! let input = StageInput::from(json!({"news": ["Dow rises 1%", "Oil slips"]}));
//! assert_eq!(normalize::text_list(&input), vec!["Dow rises 1%", "Oil slips"]);
//!
//! let wrapped = StageInput::from(json!({"raw": "{\"summary\": \"Stocks up\"}"}));
//! assert_eq!(normalize::report(&wrapped).summary, "Stocks up");
//! ```

pub mod config;
pub mod error;
pub mod llm;
pub mod model;
pub mod normalize;
pub mod observability;
pub mod pipeline;
pub mod search;
pub mod stages;
pub mod telegram;
pub mod testing;

pub use config::{ConfigError, Credentials, PipelineConfig};
pub use error::{PipelineError, PipelineResult};
pub use model::{ChartReference, Headline, Language, PipelineReport, PipelineState, TranslationMap};
pub use pipeline::{run_simplified, run_with_fallback, MarketPipeline, RunMode, StageSet};
pub use stages::DeliveryOutcome;
