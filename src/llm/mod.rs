//! LLM provider abstraction layer
//!
//! Stages talk to the language model through the [`LlmProvider`] trait; the
//! concrete provider speaks the OpenAI-compatible chat completions protocol.

pub mod provider;
pub mod providers;

pub use provider::*;
pub use providers::*;
