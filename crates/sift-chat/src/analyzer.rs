//! Turns raw page text into a structured judgment via one LLM call.
//!
//! The page content goes into a cacheable system segment so re-analysis of
//! the same page within the cache window only pays the cache-read rate.

use std::sync::Arc;

use serde::Deserialize;
use tracing::{debug, warn};

use sift_core::{
    CompletionRequest, Error, Message, PriceTable, Provider, SystemSegment, Usage, UsageCost,
};

const ANALYSIS_INSTRUCTION: &str = "Analyze web content: provide a summary (if there's real-time data, include it), sentiment analysis, and list of key topics.";
const FORMAT_INSTRUCTION: &str =
    "Format your response as JSON with keys: summary, sentiment, key_topics.";

const ERROR_SUMMARY: &str = "Error occurred during analysis.";
const ERROR_SENTIMENT: &str = "Unknown";

/// Structured result of analyzing one page's text.
#[derive(Debug, Clone)]
pub struct PageAnalysis {
    pub summary: String,
    pub sentiment: String,
    pub key_topics: Vec<String>,
    pub usage: Usage,
    pub cost: UsageCost,
}

impl PageAnalysis {
    /// Sentinel returned when the analysis call fails in any way.
    fn error() -> Self {
        Self {
            summary: ERROR_SUMMARY.to_string(),
            sentiment: ERROR_SENTIMENT.to_string(),
            key_topics: vec!["Error".to_string()],
            usage: Usage::default(),
            cost: UsageCost::default(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct AnalysisJson {
    summary: String,
    sentiment: String,
    key_topics: Vec<String>,
}

pub struct ContentAnalyzer {
    provider: Arc<dyn Provider>,
    model: String,
    max_tokens: u32,
    prices: PriceTable,
}

impl ContentAnalyzer {
    pub fn new(
        provider: Arc<dyn Provider>,
        model: impl Into<String>,
        max_tokens: u32,
        prices: PriceTable,
    ) -> Self {
        Self {
            provider,
            model: model.into(),
            max_tokens,
            prices,
        }
    }

    /// Analyze page text. Never fails: any provider or parse error is
    /// converted into a sentinel result with zeroed usage and cost, so
    /// callers always receive a well-formed analysis.
    pub async fn analyze(&self, content: &str) -> PageAnalysis {
        match self.try_analyze(content).await {
            Ok(analysis) => analysis,
            Err(e) => {
                warn!(error = %e, content_len = content.len(), "Content analysis failed");
                PageAnalysis::error()
            }
        }
    }

    async fn try_analyze(&self, content: &str) -> Result<PageAnalysis, Error> {
        let request = CompletionRequest::new(vec![Message::user(FORMAT_INSTRUCTION)])
            .with_model(&self.model)
            .with_max_tokens(self.max_tokens)
            .with_system(vec![
                SystemSegment::text(ANALYSIS_INSTRUCTION),
                SystemSegment::cached(content),
            ]);

        let response = self.provider.complete(request).await?;
        let parsed: AnalysisJson = serde_json::from_str(response.text().trim())?;
        let cost = UsageCost::compute(&response.usage, &self.prices);

        debug!(
            summary_len = parsed.summary.len(),
            topics = parsed.key_topics.len(),
            cost_total = cost.cost_total,
            "Content analysis complete"
        );

        Ok(PageAnalysis {
            summary: parsed.summary,
            sentiment: parsed.sentiment,
            key_topics: parsed.key_topics,
            usage: response.usage,
            cost,
        })
    }
}
