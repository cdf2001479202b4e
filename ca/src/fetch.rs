//! Web content fetcher for card links
//!
//! Pages are fetched only from a card's own `links`, stripped of page chrome,
//! converted to text and truncated.

use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use cardrank::Card;
use regex::Regex;
use reqwest::Client;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::FetchConfig;

/// Elements removed before conversion
const NOISE_TAGS: &[&str] = &["script", "style", "nav", "footer", "header", "aside"];

/// Bytes read from a response; the rest of the body is never downloaded
const MAX_BODY_BYTES: usize = 2_000_000;

static NOISE: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    NOISE_TAGS
        .iter()
        .filter_map(|tag| Regex::new(&format!(r"(?is)<{tag}\b[^>]*>.*?</{tag}\s*>")).ok())
        .collect()
});

static WHITESPACE: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"\s+").ok());

/// Errors fetching a card page
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("link is not associated with card {0}")]
    LinkNotOwned(String),

    #[error("URL must start with http:// or https://: {0}")]
    InvalidUrl(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP status {0}")]
    Status(u16),

    #[error("page has no readable content")]
    Empty,
}

/// Source of page text
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetch `url` and return at most `max_chars` characters of readable text
    async fn fetch_text(&self, url: &str, max_chars: usize) -> Result<String, FetchError>;
}

/// HTTP fetcher with a browser user agent and a fixed timeout
pub struct WebFetcher {
    http: Client,
}

impl WebFetcher {
    pub fn from_config(config: &FetchConfig) -> Result<Self, FetchError> {
        debug!(timeout_ms = config.timeout_ms, "WebFetcher::from_config: called");
        let http = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .user_agent(config.user_agent.clone())
            .build()?;
        Ok(Self { http })
    }
}

#[async_trait]
impl PageFetcher for WebFetcher {
    async fn fetch_text(&self, url: &str, max_chars: usize) -> Result<String, FetchError> {
        debug!(%url, max_chars, "fetch_text: called");
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(FetchError::InvalidUrl(url.to_string()));
        }

        let mut response = self.http.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            debug!(%status, "fetch_text: HTTP error status");
            return Err(FetchError::Status(status.as_u16()));
        }

        let is_html = response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .is_none_or(|ct| ct.contains("html"));

        let mut raw = Vec::new();
        while let Some(chunk) = response.chunk().await? {
            if append_capped(&mut raw, &chunk, MAX_BODY_BYTES) {
                debug!(cap = MAX_BODY_BYTES, "fetch_text: body cap reached, stopping read");
                break;
            }
        }
        let body = String::from_utf8_lossy(&raw);

        let text = if is_html { html_to_text(&body) } else { collapse_whitespace(&body) };
        if text.is_empty() {
            return Err(FetchError::Empty);
        }
        Ok(truncate_chars(&text, max_chars))
    }
}

/// Append `chunk` to `buf` without letting it grow past `cap` bytes;
/// returns true once the cap is reached
pub fn append_capped(buf: &mut Vec<u8>, chunk: &[u8], cap: usize) -> bool {
    let room = cap.saturating_sub(buf.len());
    buf.extend_from_slice(&chunk[..chunk.len().min(room)]);
    buf.len() >= cap
}

/// Readable text from an HTML page
pub fn html_to_text(html: &str) -> String {
    let mut cleaned = html.to_string();
    for pattern in NOISE.iter() {
        cleaned = pattern.replace_all(&cleaned, " ").into_owned();
    }
    let markdown = html2md::rewrite_html(&cleaned, false);
    collapse_whitespace(&markdown)
}

/// Join all whitespace runs into single spaces
pub fn collapse_whitespace(text: &str) -> String {
    match WHITESPACE.as_ref() {
        Some(ws) => ws.replace_all(text.trim(), " ").into_owned(),
        None => text.split_whitespace().collect::<Vec<_>>().join(" "),
    }
}

/// First `max_chars` characters, never splitting a character
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

/// Fetch one of the card's own links
///
/// URLs that are not in the card's `links` are refused without a request.
pub async fn fetch_card_link(
    fetcher: &dyn PageFetcher,
    card: &Card,
    url: &str,
    max_chars: usize,
) -> Result<String, FetchError> {
    if !card.owns_link(url) {
        warn!(card = %card.name, %url, "fetch_card_link: refusing foreign link");
        return Err(FetchError::LinkNotOwned(card.name.clone()));
    }
    fetcher.fetch_text(url, max_chars).await
}

/// Text from up to `max_links` of the card's pages, official pages first
///
/// Failed pages are skipped; `None` when nothing could be read.
pub async fn fetch_card_pages(
    fetcher: &dyn PageFetcher,
    card: &Card,
    max_links: usize,
    link_chars: usize,
) -> Option<String> {
    debug!(card = %card.name, max_links, "fetch_card_pages: called");
    let mut sections = Vec::new();
    for link in card.links_by_priority().into_iter().take(max_links) {
        match fetcher.fetch_text(&link.uri, link_chars).await {
            Ok(text) => sections.push(format!("From {}:\n{}", display_title(&link.title, &link.uri), text)),
            Err(e) => debug!(uri = %link.uri, error = %e, "fetch_card_pages: skipping link"),
        }
    }

    if sections.is_empty() { None } else { Some(sections.join("\n\n")) }
}

fn display_title<'a>(title: &'a str, uri: &'a str) -> &'a str {
    if title.is_empty() { uri } else { title }
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// In-memory fetcher keyed by URL; records every request
    #[derive(Default)]
    pub struct MockFetcher {
        pages: HashMap<String, String>,
        requested: Mutex<Vec<String>>,
    }

    impl MockFetcher {
        pub fn with_page(mut self, url: &str, text: &str) -> Self {
            self.pages.insert(url.to_string(), text.to_string());
            self
        }

        pub fn requested(&self) -> Vec<String> {
            self.requested.lock().map(|r| r.clone()).unwrap_or_default()
        }
    }

    #[async_trait]
    impl PageFetcher for MockFetcher {
        async fn fetch_text(&self, url: &str, max_chars: usize) -> Result<String, FetchError> {
            if let Ok(mut requested) = self.requested.lock() {
                requested.push(url.to_string());
            }
            self.pages
                .get(url)
                .map(|text| truncate_chars(text, max_chars))
                .ok_or(FetchError::Status(404))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::mock::MockFetcher;
    use super::*;
    use cardrank::Link;

    fn card_with_links() -> Card {
        let mut card = Card::new("Regalia", "HDFC Bank");
        card.links = vec![
            Link {
                title: "Blog review".into(),
                uri: "https://blog.example/regalia".into(),
            },
            Link {
                title: "HDFC Bank Regalia".into(),
                uri: "https://hdfcbank.com/regalia".into(),
            },
            Link {
                title: "Forum".into(),
                uri: "https://forum.example/regalia".into(),
            },
        ];
        card
    }

    #[test]
    fn test_html_to_text_strips_noise() {
        let html = r#"<html><head><style>body { color: red }</style><script>var x = 1;</script></head>
            <body><nav>Home | Cards</nav><header>Banner</header>
            <main><p>Annual   fee:
            Rs. 2,500</p></main><aside>Ads</aside><footer>Copyright</footer></body></html>"#;

        let text = html_to_text(html);
        assert!(text.contains("Annual fee: Rs. 2,500"));
        for noise in ["color: red", "var x", "Home | Cards", "Banner", "Ads", "Copyright"] {
            assert!(!text.contains(noise), "{noise} was not stripped: {text}");
        }
    }

    #[test]
    fn test_truncate_chars_respects_boundaries() {
        assert_eq!(truncate_chars("₹₹₹₹", 2), "₹₹");
        assert_eq!(truncate_chars("short", 50), "short");
        assert_eq!(truncate_chars("", 3), "");
    }

    #[test]
    fn test_append_capped_stops_at_cap() {
        let mut buf = Vec::new();
        assert!(!append_capped(&mut buf, b"hello ", 10));
        assert!(append_capped(&mut buf, b"world!", 10));
        assert_eq!(buf, b"hello worl");

        // Further chunks add nothing
        assert!(append_capped(&mut buf, b"more", 10));
        assert_eq!(buf.len(), 10);
    }

    #[test]
    fn test_collapse_whitespace() {
        assert_eq!(collapse_whitespace("  a \n\t b  c "), "a b c");
    }

    #[tokio::test]
    async fn test_fetch_card_link_refuses_foreign_url() {
        let fetcher = MockFetcher::default().with_page("https://evil.example", "nope");
        let card = card_with_links();

        let result = fetch_card_link(&fetcher, &card, "https://evil.example", 100).await;
        assert!(matches!(result, Err(FetchError::LinkNotOwned(_))));
        assert!(fetcher.requested().is_empty());
    }

    #[tokio::test]
    async fn test_fetch_card_link_owned() {
        let fetcher = MockFetcher::default().with_page("https://hdfcbank.com/regalia", "Lounge access");
        let card = card_with_links();
        let text = fetch_card_link(&fetcher, &card, "https://hdfcbank.com/regalia", 100)
            .await
            .unwrap();
        assert_eq!(text, "Lounge access");
    }

    #[tokio::test]
    async fn test_fetch_card_pages_official_first_and_limited() {
        let fetcher = MockFetcher::default()
            .with_page("https://hdfcbank.com/regalia", "Official text")
            .with_page("https://blog.example/regalia", "Blog text that is long");
        let card = card_with_links();

        let content = fetch_card_pages(&fetcher, &card, 2, 9).await.unwrap();
        assert_eq!(
            fetcher.requested(),
            vec!["https://hdfcbank.com/regalia", "https://blog.example/regalia"]
        );
        assert!(content.starts_with("From HDFC Bank Regalia:\nOfficial "));
        assert!(content.contains("From Blog review:\nBlog text"));
        assert!(!content.contains("that is long"));
    }

    #[tokio::test]
    async fn test_fetch_card_pages_none_when_all_fail() {
        let fetcher = MockFetcher::default();
        assert!(fetch_card_pages(&fetcher, &card_with_links(), 3, 100).await.is_none());
    }

    #[tokio::test]
    async fn test_invalid_url_rejected() {
        let fetcher = WebFetcher::from_config(&FetchConfig::default()).unwrap();
        let result = fetcher.fetch_text("ftp://example.com", 100).await;
        assert!(matches!(result, Err(FetchError::InvalidUrl(_))));
    }
}
