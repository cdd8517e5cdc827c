//! Search gateway backed by a SearxNG instance's JSON API.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use sift_core::{Error, SearchGateway};

pub struct SearxngSearch {
    client: Client,
    host: String,
}

impl SearxngSearch {
    /// `host` is the base URL of the SearxNG instance
    /// (e.g., "http://localhost:8080").
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            client: Client::builder()
                .user_agent("sift/0.1.0")
                .timeout(std::time::Duration::from_secs(30))
                .build()
                .unwrap_or_default(),
            host: host.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct SearxngResponse {
    #[serde(default)]
    results: Vec<SearxngResult>,
}

#[derive(Debug, Deserialize)]
struct SearxngResult {
    url: String,
}

/// Engine ordering is preserved; only the first `limit` URLs are returned.
fn result_urls(response: SearxngResponse, limit: usize) -> Vec<String> {
    response
        .results
        .into_iter()
        .map(|r| r.url)
        .take(limit)
        .collect()
}

#[async_trait]
impl SearchGateway for SearxngSearch {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<String>, Error> {
        let url = format!("{}/search", self.host);
        let response = self
            .client
            .get(&url)
            .query(&[("q", query), ("format", "json")])
            .send()
            .await
            .map_err(|e| Error::search(format!("search request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(Error::search(format!(
                "search API error: {}",
                response.status()
            )));
        }

        let parsed: SearxngResponse = response
            .json()
            .await
            .map_err(|e| Error::search(format!("failed to parse search response: {}", e)))?;

        let urls = result_urls(parsed, limit);
        debug!(query = %query, count = urls.len(), "Search results");
        Ok(urls)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_urls_ordered_and_limited() {
        let body = r#"{
            "query": "rust",
            "results": [
                {"url": "https://a.example", "title": "A"},
                {"url": "https://b.example", "title": "B"},
                {"url": "https://c.example", "title": "C"},
                {"url": "https://d.example", "title": "D"}
            ]
        }"#;
        let parsed: SearxngResponse = serde_json::from_str(body).unwrap();
        let urls = result_urls(parsed, 3);
        assert_eq!(
            urls,
            vec!["https://a.example", "https://b.example", "https://c.example"]
        );
    }

    #[test]
    fn test_empty_results() {
        let parsed: SearxngResponse = serde_json::from_str(r#"{"results": []}"#).unwrap();
        assert!(result_urls(parsed, 3).is_empty());
    }

    #[test]
    fn test_missing_results_field() {
        let parsed: SearxngResponse = serde_json::from_str("{}").unwrap();
        assert!(result_urls(parsed, 3).is_empty());
    }
}
