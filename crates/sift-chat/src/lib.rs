//! sift-chat: The search-augmented conversation pipeline.
//!
//! Given a user message, the orchestrator decides whether live web
//! information is needed, fans out to the search gateway and page analyzer,
//! and answers from the augmented per-user conversation history. Every
//! external call failure degrades to a local fallback value; the transport
//! never sees an error.

pub mod analyzer;
pub mod auth;
pub mod crawl;
pub mod history;
pub mod orchestrator;

pub use analyzer::{ContentAnalyzer, PageAnalysis};
pub use auth::AuthPolicy;
pub use crawl::{CrawlResult, PageAnalyst};
pub use history::{HistoryStore, InMemoryHistory};
pub use orchestrator::{Orchestrator, OrchestratorConfig};
