//! External web capabilities the pipeline depends on.
//!
//! Both are injected as trait objects so the orchestrator can be exercised
//! in tests without network access. Implementations live in `sift-web`.

use async_trait::async_trait;

use crate::error::Error;

/// A search engine returning candidate URLs for a query, best first.
#[async_trait]
pub trait SearchGateway: Send + Sync {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<String>, Error>;
}

/// Retrieves the normalized text content of a URL.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<String, Error>;
}
