//! The central conversation pipeline.
//!
//! Per message: decide whether live web information is needed, gather and
//! analyze candidate pages, append the augmented turn to the user's
//! history, and answer from the full accumulated history. Every external
//! failure is caught at its call site and degraded to a fallback value;
//! nothing propagates to the transport.

use std::sync::Arc;

use chrono::Utc;
use futures::future::join_all;
use tracing::{error, info, warn};

use sift_core::{
    CompletionRequest, Error, Message, PriceTable, Provider, SearchGateway, SystemSegment,
    UsageCost,
};

use crate::crawl::{CrawlResult, PageAnalyst};
use crate::history::HistoryStore;

/// Hard ceiling on candidate URLs per query, regardless of configuration.
pub const MAX_SEARCH_RESULTS: usize = 5;

const DECISION_SYSTEM_PROMPT: &str =
    "You are an AI assistant tasked with determining if a web search is needed.";

const APOLOGY: &str = "I'm sorry, but I encountered an error while processing your request. Please try again later.";
const HISTORY_CLEARED: &str = "Conversation history cleared.";
const HISTORY_NOT_FOUND: &str = "No conversation history found.";

#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub decision_model: String,
    pub decision_max_tokens: u32,
    pub answer_model: String,
    pub answer_max_tokens: u32,
    /// Candidate URLs per query; clamped to [`MAX_SEARCH_RESULTS`].
    pub max_search_results: usize,
    /// What a failed search-necessity call resolves to. Defaults to true
    /// (fail open): unnecessary work is preferred over a stale answer.
    pub search_on_decision_error: bool,
    pub decision_prices: PriceTable,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            decision_model: "claude-3-haiku-20240307".to_string(),
            decision_max_tokens: 1000,
            answer_model: "claude-3-5-sonnet-20240620".to_string(),
            answer_max_tokens: 4000,
            max_search_results: 3,
            search_on_decision_error: true,
            decision_prices: PriceTable::new(0.25, 1.25, 0.03, 0.30),
        }
    }
}

pub struct Orchestrator {
    provider: Arc<dyn Provider>,
    search: Arc<dyn SearchGateway>,
    analyst: PageAnalyst,
    history: Arc<dyn HistoryStore>,
    config: OrchestratorConfig,
}

/// Header prefixed to every model-bound message so answers are time-aware.
pub fn time_header() -> String {
    format!(
        "Current date and time: {} UTC",
        Utc::now().format("%Y-%m-%d %H:%M:%S")
    )
}

impl Orchestrator {
    pub fn new(
        provider: Arc<dyn Provider>,
        search: Arc<dyn SearchGateway>,
        analyst: PageAnalyst,
        history: Arc<dyn HistoryStore>,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            provider,
            search,
            analyst,
            history,
            config,
        }
    }

    /// Handle one user message and produce the reply text. Never fails;
    /// the worst case is the fixed apology string.
    pub async fn respond(&self, user_id: &str, message: &str) -> String {
        info!(user_id = %user_id, len = message.len(), "Received message");

        let header = time_header();
        let search_needed = self.decide_search(&header, message).await;
        info!(search_needed, "Search decision");

        let full_message = if search_needed {
            match self.gather_context(message).await {
                Ok(combined_info) => format!(
                    "{}\n\nHere is some relevant information I found:\n\n{}\n\nBased on this information, please answer the following user query: {}",
                    header, combined_info, message
                ),
                Err(e) => {
                    warn!(error = %e, "Web analysis failed, degrading to original message");
                    format!(
                        "{}\n\nAn error occurred during the web analysis. User query: {}",
                        header, message
                    )
                }
            }
        } else {
            format!("{}\n\n{}", header, message)
        };

        self.history
            .append(user_id, Message::user(full_message))
            .await;
        let messages = self.history.snapshot(user_id).await;

        let request = CompletionRequest::new(messages)
            .with_model(&self.config.answer_model)
            .with_max_tokens(self.config.answer_max_tokens);

        match self.provider.complete(request).await {
            Ok(response) => {
                let reply = response.message.content.clone();
                self.history
                    .append(user_id, Message::assistant(reply.clone()))
                    .await;
                info!(user_id = %user_id, reply_len = reply.len(), "Answer complete");
                reply
            }
            Err(e) => {
                // History keeps the user turn but no synthetic assistant turn
                error!(error = %e, "Answer call failed");
                APOLOGY.to_string()
            }
        }
    }

    /// Ask the decision model whether the query needs live information.
    /// Only an exact (case-insensitive) "yes" counts.
    async fn decide_search(&self, header: &str, message: &str) -> bool {
        let prompt = format!(
            "{header}\n\nDetermine if a web search is needed to answer this query: \"{message}\"\n\
             Your task is to decide whether current, real-time information from the internet is necessary to provide an accurate and complete answer.\n\
             Respond with ONLY 'Yes' or 'No'.\n\
             'Yes' if a search is needed (e.g., for current events, rapidly changing information, or specific facts you're unsure about).\n\
             'No' if you can confidently answer based on your existing knowledge."
        );

        let request = CompletionRequest::new(vec![Message::user(prompt)])
            .with_model(&self.config.decision_model)
            .with_max_tokens(self.config.decision_max_tokens)
            .with_system(vec![SystemSegment::text(DECISION_SYSTEM_PROMPT)]);

        match self.provider.complete(request).await {
            Ok(response) => {
                let cost = UsageCost::compute(&response.usage, &self.config.decision_prices);
                info!(cost_total = cost.cost_total, "Decision call cost");
                response.text().trim().eq_ignore_ascii_case("yes")
            }
            Err(e) => {
                warn!(
                    error = %e,
                    default = self.config.search_on_decision_error,
                    "Search decision failed, using default"
                );
                self.config.search_on_decision_error
            }
        }
    }

    /// Search for candidate URLs and analyze them concurrently, preserving
    /// result order in the assembled block.
    async fn gather_context(&self, message: &str) -> Result<String, Error> {
        let limit = self.config.max_search_results.min(MAX_SEARCH_RESULTS);
        let urls = self.search.search(message, limit).await?;

        let results: Vec<CrawlResult> =
            join_all(urls.iter().map(|url| self.analyst.analyze_url(url)))
                .await
                .into_iter()
                .collect::<Result<_, _>>()?;

        Ok(results
            .iter()
            .map(CrawlResult::context_block)
            .collect::<Vec<_>>()
            .join("\n\n"))
    }

    /// Reset the user's history. Idempotent.
    pub async fn clear_history(&self, user_id: &str) -> String {
        if self.history.clear(user_id).await {
            info!(user_id = %user_id, "Cleared conversation history");
            HISTORY_CLEARED.to_string()
        } else {
            HISTORY_NOT_FOUND.to_string()
        }
    }

    /// Analyze a single page outside the conversation flow. On failure
    /// returns an error-describing string rather than an error.
    pub async fn analyze_page(&self, url: &str) -> String {
        match self.analyst.analyze_url(url).await {
            Ok(result) => result.report(),
            Err(e) => format!("Error analyzing webpage: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sift_core::testing::{MockFetcher, MockProvider, MockSearch};
    use sift_core::Role;

    use crate::analyzer::ContentAnalyzer;
    use crate::history::InMemoryHistory;

    const ANALYSIS_JSON: &str =
        r#"{"summary": "A page.", "sentiment": "Neutral", "key_topics": ["news"]}"#;

    struct Fixture {
        provider: Arc<MockProvider>,
        search: Arc<MockSearch>,
        fetcher: Arc<MockFetcher>,
        history: Arc<InMemoryHistory>,
        orchestrator: Orchestrator,
    }

    fn fixture_with_config(config: OrchestratorConfig) -> Fixture {
        let provider = Arc::new(MockProvider::new());
        let search = Arc::new(MockSearch::new());
        let fetcher = Arc::new(MockFetcher::new("page body"));
        let history = Arc::new(InMemoryHistory::new(10));

        let analyzer = ContentAnalyzer::new(
            provider.clone(),
            "claude-3-haiku-20240307",
            1000,
            PriceTable::new(0.25, 1.25, 0.03, 0.30),
        );
        let orchestrator = Orchestrator::new(
            provider.clone(),
            search.clone(),
            PageAnalyst::new(fetcher.clone(), analyzer),
            history.clone(),
            config,
        );

        Fixture {
            provider,
            search,
            fetcher,
            history,
            orchestrator,
        }
    }

    fn fixture() -> Fixture {
        fixture_with_config(OrchestratorConfig::default())
    }

    #[tokio::test]
    async fn test_no_search_path_message_shape() {
        let f = fixture();
        f.provider.queue_response("No");
        f.provider.queue_response("4");

        let reply = f.orchestrator.respond("alice", "What is 2+2?").await;
        assert_eq!(reply, "4");

        // No search or fetch calls occurred
        assert_eq!(f.search.query_count(), 0);
        assert_eq!(f.fetcher.fetch_count(), 0);

        // Final call received exactly <header>\n\n<original message>
        let request = f.provider.last_request().unwrap();
        assert_eq!(request.messages.len(), 1);
        let content = &request.messages[0].content;
        assert!(content.starts_with("Current date and time: "));
        let (header, rest) = content.split_once("\n\n").unwrap();
        assert!(header.ends_with(" UTC"));
        assert_eq!(rest, "What is 2+2?");
    }

    #[tokio::test]
    async fn test_search_path_end_to_end() {
        let f = fixture();
        f.provider.queue_response("Yes");
        f.search
            .queue_results(&["https://a.example", "https://b.example", "https://c.example"]);
        f.provider.queue_response(
            r#"{"summary": "First page.", "sentiment": "Positive", "key_topics": ["a"]}"#,
        );
        f.provider.queue_response(
            r#"{"summary": "Second page.", "sentiment": "Neutral", "key_topics": ["b"]}"#,
        );
        f.provider.queue_response(
            r#"{"summary": "Third page.", "sentiment": "Negative", "key_topics": ["c"]}"#,
        );
        f.provider.queue_response("Sunny, 24C.");

        let reply = f
            .orchestrator
            .respond("alice", "What's the weather in Paris right now?")
            .await;
        assert_eq!(reply, "Sunny, 24C.");
        assert_eq!(f.fetcher.fetch_count(), 3);

        // The final request contains all three summaries
        let request = f.provider.last_request().unwrap();
        let content = &request.messages[0].content;
        assert!(content.contains("Here is some relevant information I found:"));
        assert!(content.contains("First page."));
        assert!(content.contains("Second page."));
        assert!(content.contains("Third page."));
        assert!(content.contains("URL: https://a.example"));
        assert!(content.ends_with(
            "Based on this information, please answer the following user query: What's the weather in Paris right now?"
        ));

        // The reply was appended as the assistant turn
        let turns = f.history.snapshot("alice").await;
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[1].role, Role::Assistant);
        assert_eq!(turns[1].content, "Sunny, 24C.");
    }

    #[tokio::test]
    async fn test_decision_error_fails_open() {
        let f = fixture();
        f.provider.queue_error(Error::network("decision down"));
        f.search.queue_results(&["https://a.example"]);
        f.provider.queue_response(ANALYSIS_JSON);
        f.provider.queue_response("Answer.");

        let reply = f.orchestrator.respond("alice", "anything").await;
        assert_eq!(reply, "Answer.");
        // Search was performed despite the decision failure
        assert_eq!(f.search.query_count(), 1);
    }

    #[tokio::test]
    async fn test_decision_error_fail_closed_when_configured() {
        let config = OrchestratorConfig {
            search_on_decision_error: false,
            ..OrchestratorConfig::default()
        };
        let f = fixture_with_config(config);
        f.provider.queue_error(Error::network("decision down"));
        f.provider.queue_response("Answer.");

        let reply = f.orchestrator.respond("alice", "anything").await;
        assert_eq!(reply, "Answer.");
        assert_eq!(f.search.query_count(), 0);

        let request = f.provider.last_request().unwrap();
        assert!(request.messages[0].content.ends_with("\n\nanything"));
    }

    #[tokio::test]
    async fn test_only_exact_yes_triggers_search() {
        for (decision, expect_search) in [("YES", true), ("yes", true), ("Yes.", false)] {
            let f = fixture();
            f.provider.queue_response(decision);
            if expect_search {
                f.search.queue_results(&[]);
            }
            f.provider.queue_response("Answer.");

            f.orchestrator.respond("alice", "hm").await;
            assert_eq!(f.search.query_count(), usize::from(expect_search), "{decision}");
        }
    }

    #[tokio::test]
    async fn test_search_failure_degrades_to_notice() {
        let f = fixture();
        f.provider.queue_response("Yes");
        f.search.queue_error(Error::search("engine down"));
        f.provider.queue_response("Best effort answer.");

        let reply = f.orchestrator.respond("alice", "latest news?").await;
        assert_eq!(reply, "Best effort answer.");

        let request = f.provider.last_request().unwrap();
        assert!(request.messages[0].content.contains(
            "An error occurred during the web analysis. User query: latest news?"
        ));
    }

    #[tokio::test]
    async fn test_fetch_failure_degrades_to_notice() {
        let provider = Arc::new(MockProvider::new());
        let search = Arc::new(MockSearch::new());
        let fetcher = Arc::new(MockFetcher::failing());
        let history = Arc::new(InMemoryHistory::new(10));
        let analyzer = ContentAnalyzer::new(
            provider.clone(),
            "claude-3-haiku-20240307",
            1000,
            PriceTable::new(0.25, 1.25, 0.03, 0.30),
        );
        let orchestrator = Orchestrator::new(
            provider.clone(),
            search.clone(),
            PageAnalyst::new(fetcher, analyzer),
            history,
            OrchestratorConfig::default(),
        );

        provider.queue_response("Yes");
        search.queue_results(&["https://a.example"]);
        provider.queue_response("Best effort answer.");

        let reply = orchestrator.respond("alice", "latest news?").await;
        assert_eq!(reply, "Best effort answer.");
        let request = provider.last_request().unwrap();
        assert!(request.messages[0]
            .content
            .contains("An error occurred during the web analysis."));
    }

    #[tokio::test]
    async fn test_answer_failure_returns_apology_without_assistant_turn() {
        let f = fixture();
        f.provider.queue_response("No");
        f.provider.queue_error(Error::api(500, "overloaded"));

        let reply = f.orchestrator.respond("alice", "hello").await;
        assert_eq!(reply, APOLOGY);

        let turns = f.history.snapshot("alice").await;
        assert_eq!(turns.len(), 1);
        assert_eq!(turns[0].role, Role::User);
    }

    #[tokio::test]
    async fn test_history_accumulates_across_turns() {
        let f = fixture();
        f.provider.queue_response("No");
        f.provider.queue_response("First reply.");
        f.orchestrator.respond("alice", "first").await;

        f.provider.queue_response("No");
        f.provider.queue_response("Second reply.");
        f.orchestrator.respond("alice", "second").await;

        // The final call carried the entire accumulated history
        let request = f.provider.last_request().unwrap();
        assert_eq!(request.messages.len(), 3);
        assert_eq!(request.messages[1].content, "First reply.");

        let turns = f.history.snapshot("alice").await;
        assert_eq!(turns.len(), 4);
    }

    #[tokio::test]
    async fn test_clear_history() {
        let f = fixture();
        assert_eq!(
            f.orchestrator.clear_history("alice").await,
            "No conversation history found."
        );

        f.provider.queue_response("No");
        f.provider.queue_response("Hi.");
        f.orchestrator.respond("alice", "hello").await;

        assert_eq!(
            f.orchestrator.clear_history("alice").await,
            "Conversation history cleared."
        );
        assert_eq!(
            f.orchestrator.clear_history("alice").await,
            "No conversation history found."
        );
    }

    #[tokio::test]
    async fn test_search_limit_clamped() {
        let config = OrchestratorConfig {
            max_search_results: 20,
            ..OrchestratorConfig::default()
        };
        let f = fixture_with_config(config);
        f.provider.queue_response("Yes");
        f.search.queue_results(&[]);
        f.provider.queue_response("Answer.");

        f.orchestrator.respond("alice", "hm").await;
        let (_, limit) = f.search.captured_queries.lock().unwrap()[0].clone();
        assert_eq!(limit, MAX_SEARCH_RESULTS);
    }

    #[tokio::test]
    async fn test_analyze_page_is_uncached() {
        let f = fixture();
        f.provider.queue_response(ANALYSIS_JSON);
        f.provider.queue_response(ANALYSIS_JSON);

        let first = f.orchestrator.analyze_page("https://a.example").await;
        let second = f.orchestrator.analyze_page("https://a.example").await;
        assert!(first.starts_with("Analysis of https://a.example:"));
        assert_eq!(first, second);

        // Each call issued its own fetch + analyze cycle
        assert_eq!(f.fetcher.fetch_count(), 2);
        assert_eq!(f.provider.request_count(), 2);
    }

    #[tokio::test]
    async fn test_analyze_page_fetch_error_string() {
        let provider = Arc::new(MockProvider::new());
        let analyzer = ContentAnalyzer::new(
            provider.clone(),
            "claude-3-haiku-20240307",
            1000,
            PriceTable::new(0.25, 1.25, 0.03, 0.30),
        );
        let orchestrator = Orchestrator::new(
            provider,
            Arc::new(MockSearch::new()),
            PageAnalyst::new(Arc::new(MockFetcher::failing()), analyzer),
            Arc::new(InMemoryHistory::new(10)),
            OrchestratorConfig::default(),
        );

        let report = orchestrator.analyze_page("https://a.example").await;
        assert!(report.starts_with("Error analyzing webpage:"));
    }
}
