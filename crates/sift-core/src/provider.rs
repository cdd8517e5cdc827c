use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::message::{Message, Usage};

/// A system-context segment, optionally marked for provider-side prompt
/// caching. Large page content goes into a cached segment so repeated
/// analysis calls only pay the cache-read rate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemSegment {
    pub text: String,
    #[serde(default)]
    pub cache: bool,
}

impl SystemSegment {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            cache: false,
        }
    }

    pub fn cached(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            cache: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionRequest {
    pub messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub system: Vec<SystemSegment>,
}

impl CompletionRequest {
    pub fn new(messages: Vec<Message>) -> Self {
        Self {
            messages,
            model: None,
            max_tokens: None,
            system: Vec::new(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_system(mut self, system: Vec<SystemSegment>) -> Self {
        self.system = system;
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionResponse {
    /// The assistant's response message.
    pub message: Message,
    pub usage: Usage,
    pub model: String,
}

impl CompletionResponse {
    /// The response body as plain text.
    pub fn text(&self) -> &str {
        &self.message.content
    }
}

#[async_trait]
pub trait Provider: Send + Sync {
    fn name(&self) -> &str;

    /// Get the default model, if one is configured.
    /// Returns None if no default model is set (API will use its own default).
    fn default_model(&self) -> Option<&str>;

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, Error>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_completion_request_builder() {
        let request = CompletionRequest::new(vec![Message::user("Hello")])
            .with_model("claude-3-haiku-20240307")
            .with_max_tokens(1000)
            .with_system(vec![SystemSegment::text("You are helpful.")]);

        assert_eq!(request.model, Some("claude-3-haiku-20240307".to_string()));
        assert_eq!(request.max_tokens, Some(1000));
        assert_eq!(request.system.len(), 1);
        assert!(!request.system[0].cache);
    }

    #[test]
    fn test_cached_segment() {
        let segment = SystemSegment::cached("page content");
        assert!(segment.cache);
        assert_eq!(segment.text, "page content");
    }
}
