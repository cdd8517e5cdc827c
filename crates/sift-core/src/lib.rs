//! sift-core: Core types and traits for sift
//!
//! This crate provides the foundational types and traits used throughout
//! the sift chat-relay bot: messages, LLM provider and web capability
//! interfaces, the error taxonomy, and the token cost model.

pub mod capability;
pub mod cost;
pub mod error;
pub mod message;
pub mod provider;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use capability::{PageFetcher, SearchGateway};
pub use cost::{PriceTable, UsageCost};
pub use error::Error;
pub use message::{Message, Role, Usage};
pub use provider::{CompletionRequest, CompletionResponse, Provider, SystemSegment};

pub type Result<T> = std::result::Result<T, Error>;
