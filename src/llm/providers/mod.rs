//! LLM provider implementations

pub mod disabled;
pub mod openai;

pub use disabled::*;
pub use openai::*;
