//! Observability
//!
//! tracing-subscriber initialization and the span macros used by the
//! pipeline.

pub mod logging;

pub use logging::{init_default_logging, init_logging, LogFormat};

pub use logging::{run_span, stage_span};
