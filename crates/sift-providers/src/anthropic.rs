use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, trace};

use sift_core::{
    CompletionRequest, CompletionResponse, Error, Message, Provider, Role, SystemSegment, Usage,
};

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com/v1";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_MAX_TOKENS: u32 = 4096;

pub struct AnthropicProvider {
    client: Client,
    api_key: String,
    base_url: String,
    default_model: Option<String>,
}

impl AnthropicProvider {
    pub fn new(api_key: impl Into<String>) -> Self {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| Client::new());
        Self {
            client,
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            default_model: None,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_default_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = Some(model.into());
        self
    }

    fn build_request(&self, request: &CompletionRequest) -> AnthropicRequest {
        let model = request
            .model
            .clone()
            .or_else(|| self.default_model.clone());

        // System segments become system content blocks; segments marked
        // cacheable get an ephemeral cache_control breakpoint.
        let mut system_blocks: Vec<AnthropicSystemBlock> = request
            .system
            .iter()
            .map(AnthropicSystemBlock::from_segment)
            .collect();

        let mut messages: Vec<AnthropicMessage> = Vec::new();

        for msg in &request.messages {
            match msg.role {
                // System messages in the history fold into the system blocks
                Role::System => {
                    if !msg.content.is_empty() {
                        system_blocks
                            .push(AnthropicSystemBlock::from_segment(&SystemSegment::text(
                                msg.content.clone(),
                            )));
                    }
                }
                Role::User => messages.push(AnthropicMessage {
                    role: "user".to_string(),
                    content: msg.content.clone(),
                }),
                Role::Assistant => messages.push(AnthropicMessage {
                    role: "assistant".to_string(),
                    content: msg.content.clone(),
                }),
            }
        }

        // Merge adjacent same-role messages (Anthropic requires strict alternation)
        messages = merge_adjacent_messages(messages);

        let system = if system_blocks.is_empty() {
            None
        } else {
            Some(system_blocks)
        };

        // max_tokens is required by Anthropic
        let max_tokens = request.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS);

        AnthropicRequest {
            model,
            messages,
            system,
            max_tokens,
        }
    }

    fn parse_response(&self, response: AnthropicResponse) -> Result<CompletionResponse, Error> {
        let mut content_text = String::new();

        for block in &response.content {
            if !content_text.is_empty() {
                content_text.push('\n');
            }
            content_text.push_str(&block.text);
        }

        let usage = Usage::new(response.usage.input_tokens, response.usage.output_tokens)
            .with_cache(
                response.usage.cache_read_input_tokens.unwrap_or(0),
                response.usage.cache_creation_input_tokens.unwrap_or(0),
            );

        Ok(CompletionResponse {
            message: Message::assistant(content_text),
            usage,
            model: response.model,
        })
    }

    fn parse_error(&self, status: u16, body: &str) -> Error {
        #[derive(Deserialize)]
        struct ErrorResponse {
            error: ErrorDetail,
        }

        #[derive(Deserialize)]
        struct ErrorDetail {
            message: String,
            #[serde(rename = "type")]
            #[allow(dead_code)]
            error_type: Option<String>,
        }

        if let Ok(err) = serde_json::from_str::<ErrorResponse>(body) {
            match status {
                401 => Error::auth(err.error.message),
                429 => Error::rate_limit(err.error.message),
                400 => Error::invalid_request(err.error.message),
                _ => Error::api(status, err.error.message),
            }
        } else {
            Error::api(status, body.to_string())
        }
    }
}

/// Merge adjacent messages with the same role (Anthropic requires strict alternation)
fn merge_adjacent_messages(messages: Vec<AnthropicMessage>) -> Vec<AnthropicMessage> {
    let mut merged: Vec<AnthropicMessage> = Vec::new();

    for msg in messages {
        if let Some(last) = merged.last_mut() {
            if last.role == msg.role {
                last.content.push_str("\n\n");
                last.content.push_str(&msg.content);
                continue;
            }
        }
        merged.push(msg);
    }

    merged
}

#[async_trait]
impl Provider for AnthropicProvider {
    fn name(&self) -> &str {
        "anthropic"
    }

    fn default_model(&self) -> Option<&str> {
        self.default_model.as_deref()
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, Error> {
        let api_request = self.build_request(&request);

        debug!(
            model = ?api_request.model,
            message_count = api_request.messages.len(),
            system_blocks = api_request.system.as_ref().map(|s| s.len()).unwrap_or(0),
            "Anthropic request"
        );
        trace!(request = %serde_json::to_string(&api_request).unwrap_or_default(), "Anthropic request payload");

        let response = self
            .client
            .post(format!("{}/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("Content-Type", "application/json")
            .json(&api_request)
            .send()
            .await
            .map_err(|e| Error::network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            error!(status = status.as_u16(), body = %error_text, "Anthropic request failed");
            return Err(self.parse_error(status.as_u16(), &error_text));
        }

        let response_text = response
            .text()
            .await
            .map_err(|e| Error::serialization(e.to_string()))?;

        trace!(response = %response_text, "Anthropic response payload");

        let api_response: AnthropicResponse = serde_json::from_str(&response_text)
            .map_err(|e| Error::serialization(e.to_string()))?;

        let parsed = self.parse_response(api_response)?;

        debug!(
            model = %parsed.model,
            content_len = parsed.message.content.len(),
            input_tokens = parsed.usage.input_tokens,
            output_tokens = parsed.usage.output_tokens,
            cache_read_tokens = parsed.usage.cache_read_tokens,
            cache_write_tokens = parsed.usage.cache_write_tokens,
            "Anthropic response"
        );

        Ok(parsed)
    }
}

// ── Anthropic API types ──────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct AnthropicRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<String>,
    messages: Vec<AnthropicMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<Vec<AnthropicSystemBlock>>,
    max_tokens: u32,
}

#[derive(Debug, Serialize, Deserialize)]
struct AnthropicMessage {
    role: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct AnthropicSystemBlock {
    #[serde(rename = "type")]
    block_type: &'static str,
    text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    cache_control: Option<CacheControl>,
}

impl AnthropicSystemBlock {
    fn from_segment(segment: &SystemSegment) -> Self {
        Self {
            block_type: "text",
            text: segment.text.clone(),
            cache_control: segment.cache.then_some(CacheControl {
                control_type: "ephemeral",
            }),
        }
    }
}

#[derive(Debug, Serialize)]
struct CacheControl {
    #[serde(rename = "type")]
    control_type: &'static str,
}

// ── Response types ───────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    model: String,
    content: Vec<AnthropicContentBlock>,
    usage: AnthropicUsage,
}

#[derive(Debug, Deserialize)]
struct AnthropicContentBlock {
    text: String,
}

#[derive(Debug, Deserialize)]
struct AnthropicUsage {
    input_tokens: u32,
    output_tokens: u32,
    #[serde(default)]
    cache_read_input_tokens: Option<u32>,
    #[serde(default)]
    cache_creation_input_tokens: Option<u32>,
}

// ── Tests ────────────────────────────────────────────────────────────────────
