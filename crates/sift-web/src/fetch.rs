//! Fetches a URL and reduces it to readable text for analysis.

use async_trait::async_trait;
use reqwest::Client;
use scraper::{Html, Selector};
use tracing::debug;

use sift_core::{Error, PageFetcher};

/// Pages longer than this are cut before analysis; the analysis model's
/// context is finite and the tail of a page rarely changes the summary.
const MAX_CONTENT_LEN: usize = 50000;

pub struct HttpFetcher {
    client: Client,
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpFetcher {
    pub fn new() -> Self {
        Self {
            client: Client::builder()
                .user_agent("sift/0.1.0")
                .timeout(std::time::Duration::from_secs(30))
                .build()
                .unwrap_or_default(),
        }
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<String, Error> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::fetch(url, format!("request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(Error::fetch(url, format!("HTTP error {}", response.status())));
        }

        let html = response
            .text()
            .await
            .map_err(|e| Error::fetch(url, format!("failed to read response: {}", e)))?;

        let text = extract_page_text(&html);
        debug!(url = %url, chars = text.len(), "Fetched page");

        if text.is_empty() {
            return Err(Error::fetch(url, "no text content found on page"));
        }

        Ok(truncate_content(text))
    }
}

/// Cut overlong pages at `MAX_CONTENT_LEN`, backing off to the nearest
/// char boundary so multi-byte characters are never split.
fn truncate_content(text: String) -> String {
    if text.len() <= MAX_CONTENT_LEN {
        return text;
    }
    let mut end = MAX_CONTENT_LEN;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    text[..end].to_string()
}

/// Extract readable text from an HTML document: prefer main-content
/// containers, fall back to the whole body.
fn extract_page_text(html: &str) -> String {
    let document = Html::parse_document(html);

    let main_selector = Selector::parse("main, article, .content, #content, .post, .entry").ok();
    let body_selector = Selector::parse("body").ok();

    let text = if let Some(selector) = main_selector {
        let main_content: Vec<_> = document.select(&selector).collect();
        if !main_content.is_empty() {
            main_content
                .into_iter()
                .map(|el| extract_text(&el))
                .collect::<Vec<_>>()
                .join("\n\n")
        } else if let Some(body_sel) = body_selector {
            document
                .select(&body_sel)
                .map(|el| extract_text(&el))
                .collect::<Vec<_>>()
                .join("\n\n")
        } else {
            extract_text(&document.root_element())
        }
    } else {
        extract_text(&document.root_element())
    };

    clean_text(&text)
}

/// Extract text from an HTML element, filtering out scripts and styles
fn extract_text(element: &scraper::ElementRef) -> String {
    let mut text = String::new();

    for node in element.descendants() {
        let Some(t) = node.value().as_text() else {
            continue;
        };

        // Drop text anywhere inside script, style, nav, footer, header
        // elements; checking ancestors prunes the whole subtree.
        let in_skipped = node.ancestors().any(|ancestor| {
            ancestor
                .value()
                .as_element()
                .is_some_and(|el| is_skipped_tag(el.name()))
        });
        if in_skipped {
            continue;
        }

        let trimmed = t.trim();
        if !trimmed.is_empty() {
            if !text.is_empty() && !text.ends_with(' ') && !text.ends_with('\n') {
                text.push(' ');
            }
            text.push_str(trimmed);
        }
    }

    text
}

fn is_skipped_tag(tag: &str) -> bool {
    matches!(
        tag,
        "script" | "style" | "nav" | "footer" | "header" | "aside" | "noscript"
    )
}

/// Clean up extracted text
fn clean_text(text: &str) -> String {
    // Collapse multiple whitespace/newlines
    let mut result = String::new();
    let mut prev_was_whitespace = false;
    let mut newline_count = 0;

    for ch in text.chars() {
        if ch == '\n' {
            newline_count += 1;
            if newline_count <= 2 {
                result.push('\n');
            }
            prev_was_whitespace = true;
        } else if ch.is_whitespace() {
            if !prev_was_whitespace {
                result.push(' ');
                prev_was_whitespace = true;
            }
            newline_count = 0;
        } else {
            result.push(ch);
            prev_was_whitespace = false;
            newline_count = 0;
        }
    }

    result.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_text() {
        let input = "  Hello   world  \n\n\n\n  Test  ";
        let cleaned = clean_text(input);
        assert!(cleaned.contains("Hello"));
        assert!(cleaned.contains("world"));
        assert!(cleaned.contains("Test"));
        assert!(!cleaned.contains("    ")); // No excessive spaces
    }

    #[test]
    fn test_extract_text_skips_scripts() {
        let html = Html::parse_document(
            "<html><body><p>Hello</p><script>evil()</script><p>World</p></body></html>",
        );
        let text = extract_text(&html.root_element());
        assert!(text.contains("Hello"));
        assert!(text.contains("World"));
        assert!(!text.contains("evil"));
    }

    #[test]
    fn test_extract_page_text_prefers_main() {
        let html = "<html><body>\
            <nav>Menu Menu Menu</nav>\
            <main><p>The actual story.</p></main>\
            <footer>Copyright</footer>\
            </body></html>";
        let text = extract_page_text(html);
        assert!(text.contains("The actual story."));
        assert!(!text.contains("Menu"));
        assert!(!text.contains("Copyright"));
    }

    #[test]
    fn test_extract_text_skips_nested_chrome() {
        let html = Html::parse_document(
            "<html><body><nav><ul><li>Home</li><li>About</li></ul></nav>\
             <p>Story.</p><footer><div><span>Copyright</span></div></footer></body></html>",
        );
        let text = extract_text(&html.root_element());
        assert_eq!(text, "Story.");
    }

    #[test]
    fn test_extract_page_text_falls_back_to_body() {
        let html = "<html><body><p>No main container here.</p>\
            <script>evil()</script><nav>Menu</nav></body></html>";
        let text = extract_page_text(html);
        assert!(text.contains("No main container here."));
        // Script and nav subtrees stay out of the body-fallback path too
        assert!(!text.contains("evil"));
        assert!(!text.contains("Menu"));
    }

    #[test]
    fn test_truncate_short_content_untouched() {
        let text = "short page".to_string();
        assert_eq!(truncate_content(text), "short page");
    }

    #[test]
    fn test_truncate_backs_off_multibyte_boundary() {
        // 'é' is two bytes and straddles the cut point
        let mut text = "a".repeat(MAX_CONTENT_LEN - 1);
        text.push('é');
        text.push_str(&"b".repeat(100));

        let truncated = truncate_content(text);
        assert!(truncated.len() <= MAX_CONTENT_LEN);
        assert_eq!(truncated.len(), MAX_CONTENT_LEN - 1);
        assert!(truncated.chars().all(|c| c == 'a'));
    }

    #[test]
    fn test_truncate_multibyte_heavy_content() {
        // Three bytes per char; the cut point is never a char boundary
        let text = "日".repeat(20_000);
        let truncated = truncate_content(text);
        assert!(truncated.len() <= MAX_CONTENT_LEN);
        assert_eq!(truncated.len() % 3, 0);
        assert!(truncated.chars().all(|c| c == '日'));
    }
}
