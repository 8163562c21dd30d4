//! News search providers
//!
//! The retrieval stage walks a priority-ordered list of [`NewsSource`]s.
//! Each provider is independently fallible; an empty result list is reported
//! as [`SearchError::Empty`] so the caller can fall through to the next one.

pub mod serper;
pub mod tavily;

pub use serper::SerperSource;
pub use tavily::TavilySource;

use crate::error::SearchError;
use async_trait::async_trait;

/// Characters of snippet kept per headline
pub const SNIPPET_MAX_CHARS: usize = 150;

/// One search result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHit {
    pub title: String,
    pub snippet: String,
}

impl SearchHit {
    pub fn new(title: impl Into<String>, snippet: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            snippet: snippet.into(),
        }
    }

    /// `"<title> - <snippet>"` with the snippet cut to [`SNIPPET_MAX_CHARS`]
    pub fn to_headline(&self) -> String {
        let snippet: String = self.snippet.chars().take(SNIPPET_MAX_CHARS).collect();
        format!("{} - {}", self.title, snippet)
    }
}

/// Search provider seam
#[async_trait]
pub trait NewsSource: Send + Sync {
    /// Provider name for logging
    fn name(&self) -> &str;

    /// Search for `query`, returning at most `max_results` hits
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchHit>, SearchError>;
}
