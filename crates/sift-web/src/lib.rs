//! sift-web: Web adapters for sift
//!
//! Implementations of the `sift-core` web capability traits: an HTML page
//! fetcher with text extraction and a SearxNG-backed search gateway.

pub mod fetch;
pub mod search;

pub use fetch::HttpFetcher;
pub use search::SearxngSearch;
