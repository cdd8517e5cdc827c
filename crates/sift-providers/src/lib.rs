//! sift-providers: LLM provider implementations for sift

pub mod anthropic;

pub use anthropic::AnthropicProvider;
