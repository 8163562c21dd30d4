//! Tavily search API provider

use crate::error::SearchError;
use crate::search::{NewsSource, SearchHit};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;

/// Domains the search is restricted to
const FINANCE_DOMAINS: &[&str] = &["finance.yahoo.com", "marketwatch.com", "cnbc.com"];

pub struct TavilySource {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl TavilySource {
    pub fn new(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, SearchError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SearchError::RequestFailed(e.to_string()))?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Build search payload (pure function)
    fn build_search_payload(api_key: &str, query: &str, max_results: usize) -> Value {
        json!({
            "api_key": api_key,
            "query": query,
            "search_depth": "basic",
            "max_results": max_results,
            "include_domains": FINANCE_DOMAINS,
        })
    }

    /// Parse search response (pure function)
    fn parse_search_response(body: &Value) -> Vec<SearchHit> {
        body.get("results")
            .and_then(|r| r.as_array())
            .map(|results| {
                results
                    .iter()
                    .map(|item| {
                        SearchHit::new(
                            item.get("title").and_then(|t| t.as_str()).unwrap_or(""),
                            item.get("content").and_then(|c| c.as_str()).unwrap_or(""),
                        )
                    })
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[async_trait]
impl NewsSource for TavilySource {
    fn name(&self) -> &str {
        "tavily"
    }

    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchHit>, SearchError> {
        let payload = Self::build_search_payload(&self.api_key, query, max_results);

        let response = self
            .client
            .post(format!("{}/search", self.base_url))
            .json(&payload)
            .send()
            .await
            .map_err(|e| SearchError::RequestFailed(format!("Tavily request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(SearchError::Api {
                provider: "Tavily".to_string(),
                status: status.as_u16(),
                body,
            });
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| SearchError::InvalidResponse(format!("Tavily: {e}")))?;

        let hits = Self::parse_search_response(&body);
        if hits.is_empty() {
            return Err(SearchError::Empty("Tavily".to_string()));
        }
        Ok(hits)
    }
}
