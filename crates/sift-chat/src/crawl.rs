//! Fetch-then-analyze combinator producing one `CrawlResult` per URL.

use std::sync::Arc;

use tracing::info;

use sift_core::{Error, PageFetcher, Usage, UsageCost};

use crate::analyzer::ContentAnalyzer;

/// Immutable record of one analyzed page. Produced once per URL; results
/// are never cached or deduplicated across calls.
#[derive(Debug, Clone)]
pub struct CrawlResult {
    pub url: String,
    pub content: String,
    pub summary: String,
    pub sentiment: String,
    pub key_topics: Vec<String>,
    pub usage: Usage,
    pub cost: UsageCost,
}

impl CrawlResult {
    /// Human-readable single-page report, used by the analyze command.
    pub fn report(&self) -> String {
        format!(
            "Analysis of {}:\nSummary: {}\nSentiment: {}\nKey Topics: {}\nTotal Cost: ${:.6}",
            self.url,
            self.summary,
            self.sentiment,
            self.key_topics.join(", "),
            self.cost.cost_total
        )
    }

    /// The block this result contributes to an augmented conversation
    /// message.
    pub fn context_block(&self) -> String {
        format!(
            "URL: {}\nSummary: {}\nSentiment: {}\nKey Topics: {}",
            self.url,
            self.summary,
            self.sentiment,
            self.key_topics.join(", ")
        )
    }
}

pub struct PageAnalyst {
    fetcher: Arc<dyn PageFetcher>,
    analyzer: ContentAnalyzer,
}

impl PageAnalyst {
    pub fn new(fetcher: Arc<dyn PageFetcher>, analyzer: ContentAnalyzer) -> Self {
        Self { fetcher, analyzer }
    }

    /// Fetch a URL and analyze its text. Fetch failures propagate; the
    /// analysis itself never fails (sentinel result instead).
    pub async fn analyze_url(&self, url: &str) -> Result<CrawlResult, Error> {
        let content = self.fetcher.fetch(url).await?;
        let analysis = self.analyzer.analyze(&content).await;

        info!(
            url = %url,
            content_len = content.len(),
            cost_total = analysis.cost.cost_total,
            "Analyzed page"
        );

        Ok(CrawlResult {
            url: url.to_string(),
            content,
            summary: analysis.summary,
            sentiment: analysis.sentiment,
            key_topics: analysis.key_topics,
            usage: analysis.usage,
            cost: analysis.cost,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sift_core::testing::{MockFetcher, MockProvider};
    use sift_core::PriceTable;

    fn analyst(fetcher: Arc<MockFetcher>, provider: Arc<MockProvider>) -> PageAnalyst {
        let analyzer = ContentAnalyzer::new(
            provider,
            "claude-3-haiku-20240307",
            1000,
            PriceTable::new(0.25, 1.25, 0.03, 0.30),
        );
        PageAnalyst::new(fetcher, analyzer)
    }

    #[tokio::test]
    async fn test_analyze_url() {
        let fetcher = Arc::new(MockFetcher::new("page body"));
        let provider = Arc::new(MockProvider::new());
        provider.queue_response(
            r#"{"summary": "About things.", "sentiment": "Neutral", "key_topics": ["things"]}"#,
        );

        let result = analyst(fetcher, provider)
            .analyze_url("https://example.com")
            .await
            .unwrap();
        assert_eq!(result.url, "https://example.com");
        assert_eq!(result.content, "page body");
        assert_eq!(result.summary, "About things.");
    }

    #[tokio::test]
    async fn test_fetch_failure_propagates() {
        let fetcher = Arc::new(MockFetcher::failing());
        let provider = Arc::new(MockProvider::new());

        let err = analyst(fetcher, provider.clone())
            .analyze_url("https://example.com")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Fetch { .. }));
        // Analysis never ran
        assert_eq!(provider.request_count(), 0);
    }

    #[test]
    fn test_report_format() {
        let result = CrawlResult {
            url: "https://example.com".to_string(),
            content: String::new(),
            summary: "Short.".to_string(),
            sentiment: "Positive".to_string(),
            key_topics: vec!["a".to_string(), "b".to_string()],
            usage: Usage::default(),
            cost: UsageCost {
                cost_total: 0.001234,
                ..UsageCost::default()
            },
        };
        let report = result.report();
        assert!(report.starts_with("Analysis of https://example.com:"));
        assert!(report.contains("Key Topics: a, b"));
        assert!(report.contains("Total Cost: $0.001234"));
    }
}
