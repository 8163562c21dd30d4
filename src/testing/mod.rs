//! Testing utilities and mock implementations
//!
//! Mock collaborators for exercising the pipeline without a language model,
//! search provider or chat endpoint.

pub mod mocks;

pub use mocks::*;
