//! Test utilities shared across the workspace.
//! Only compiled when running tests or with the `testing` feature.

use async_trait::async_trait;
use std::sync::Mutex;

use crate::capability::{PageFetcher, SearchGateway};
use crate::error::Error;
use crate::message::{Message, Usage};
use crate::provider::{CompletionRequest, CompletionResponse, Provider};

/// A mock provider that returns pre-configured responses.
pub struct MockProvider {
    responses: Mutex<Vec<Result<CompletionResponse, Error>>>,
    /// Captured requests (for assertion).
    pub captured_requests: Mutex<Vec<CompletionRequest>>,
    pub name: String,
    pub default_model: Option<String>,
}

impl MockProvider {
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(Vec::new()),
            captured_requests: Mutex::new(Vec::new()),
            name: "mock".to_string(),
            default_model: None,
        }
    }

    /// Queue a response to be returned by the next complete() call.
    /// Responses are returned in FIFO order (first queued = first returned).
    pub fn queue_response(&self, content: &str) {
        self.queue_response_with_usage(content, Usage::new(0, 0));
    }

    /// Queue a response with explicit usage counts.
    pub fn queue_response_with_usage(&self, content: &str, usage: Usage) {
        let response = CompletionResponse {
            message: Message::assistant(content),
            usage,
            model: "mock-model".to_string(),
        };
        self.responses.lock().unwrap().insert(0, Ok(response));
    }

    /// Queue an error to be returned by the next complete() call.
    pub fn queue_error(&self, error: Error) {
        self.responses.lock().unwrap().insert(0, Err(error));
    }

    /// Get the number of captured requests.
    pub fn request_count(&self) -> usize {
        self.captured_requests.lock().unwrap().len()
    }

    /// Get the last captured request.
    pub fn last_request(&self) -> Option<CompletionRequest> {
        self.captured_requests.lock().unwrap().last().cloned()
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Provider for MockProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn default_model(&self) -> Option<&str> {
        self.default_model.as_deref()
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, Error> {
        self.captured_requests.lock().unwrap().push(request);
        match self.responses.lock().unwrap().pop() {
            Some(response) => response,
            None => Err(Error::Unknown("No mock response queued".to_string())),
        }
    }
}

/// A mock search gateway returning a fixed URL list.
pub struct MockSearch {
    results: Mutex<Vec<Result<Vec<String>, Error>>>,
    pub captured_queries: Mutex<Vec<(String, usize)>>,
}

impl MockSearch {
    pub fn new() -> Self {
        Self {
            results: Mutex::new(Vec::new()),
            captured_queries: Mutex::new(Vec::new()),
        }
    }

    /// Queue a URL list for the next search() call (FIFO).
    pub fn queue_results(&self, urls: &[&str]) {
        self.results
            .lock()
            .unwrap()
            .insert(0, Ok(urls.iter().map(|s| s.to_string()).collect()));
    }

    pub fn queue_error(&self, error: Error) {
        self.results.lock().unwrap().insert(0, Err(error));
    }

    pub fn query_count(&self) -> usize {
        self.captured_queries.lock().unwrap().len()
    }
}

impl Default for MockSearch {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SearchGateway for MockSearch {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<String>, Error> {
        self.captured_queries
            .lock()
            .unwrap()
            .push((query.to_string(), limit));
        match self.results.lock().unwrap().pop() {
            Some(result) => result,
            None => Err(Error::search("No mock search result queued".to_string())),
        }
    }
}

/// A mock fetcher that maps every URL to a canned page body.
pub struct MockFetcher {
    pub content: String,
    pub fail: bool,
    pub captured_urls: Mutex<Vec<String>>,
}

impl MockFetcher {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            fail: false,
            captured_urls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            content: String::new(),
            fail: true,
            captured_urls: Mutex::new(Vec::new()),
        }
    }

    pub fn fetch_count(&self) -> usize {
        self.captured_urls.lock().unwrap().len()
    }
}

#[async_trait]
impl PageFetcher for MockFetcher {
    async fn fetch(&self, url: &str) -> Result<String, Error> {
        self.captured_urls.lock().unwrap().push(url.to_string());
        if self.fail {
            Err(Error::fetch(url, "mock fetch failure"))
        } else {
            Ok(self.content.clone())
        }
    }
}
