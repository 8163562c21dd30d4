//! Serper (Google search) API provider

use crate::error::SearchError;
use crate::search::{NewsSource, SearchHit};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;

/// Appended to every query to bias results towards market news
const QUERY_SUFFIX: &str = " finance stock market";

pub struct SerperSource {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl SerperSource {
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
    fn build_search_payload(query: &str, max_results: usize) -> Value {
        json!({
            "q": format!("{query}{QUERY_SUFFIX}"),
            "num": max_results,
        })
    }

    /// Parse search response (pure function)
    fn parse_search_response(body: &Value) -> Vec<SearchHit> {
        body.get("organic")
            .and_then(|o| o.as_array())
            .map(|organic| {
                organic
                    .iter()
                    .map(|item| {
                        SearchHit::new(
                            item.get("title").and_then(|t| t.as_str()).unwrap_or(""),
                            item.get("snippet").and_then(|s| s.as_str()).unwrap_or(""),
                        )
                    })
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[async_trait]
impl NewsSource for SerperSource {
    fn name(&self) -> &str {
        "serper"
    }

    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchHit>, SearchError> {
        let payload = Self::build_search_payload(query, max_results);

        let response = self
            .client
            .post(format!("{}/search", self.base_url))
            .header("X-API-KEY", &self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| SearchError::RequestFailed(format!("Serper request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(SearchError::Api {
                provider: "Serper".to_string(),
                status: status.as_u16(),
                body,
            });
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| SearchError::InvalidResponse(format!("Serper: {e}")))?;

        let hits = Self::parse_search_response(&body);
        if hits.is_empty() {
            return Err(SearchError::Empty("Serper".to_string()));
        }
        Ok(hits)
    }
}
