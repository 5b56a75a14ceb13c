use std::time::Duration;

use once_cell::sync::Lazy;
use reqwest::blocking::Client;
use scraper::{Html, Node, Selector};
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::AppConfig;

/// Shown to the user for any fetch failure, whatever the cause. Parser
/// warnings never use this text.
pub const FETCH_FAILED_MESSAGE: &str =
    "URLから告知を取得できませんでした。本文を貼り付けて解析してください。";

const SKIPPED_ELEMENTS: &[&str] = &["script", "style", "noscript", "template", "head"];
const BLOCK_ELEMENTS: &[&str] = &[
    "p", "div", "br", "li", "ul", "ol", "tr", "table", "section", "article", "header",
    "footer", "h1", "h2", "h3", "h4", "h5", "h6", "dt", "dd", "blockquote", "pre",
];

static OG_DESCRIPTION_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(r#"meta[property="og:description"], meta[name="description"]"#)
        .expect("og description selector")
});

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    #[error("http error: {0}")]
    Http(String),
    #[error("non-success status {status} for {url}")]
    Status { status: u16, url: String },
    #[error("no readable text at {0}")]
    Empty(String),
}

impl FetchError {
    pub fn user_message(&self) -> &'static str {
        FETCH_FAILED_MESSAGE
    }
}

pub struct Fetcher {
    client: Client,
}

impl Fetcher {
    pub fn new(config: &AppConfig) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.fetch_timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|err| FetchError::Http(err.to_string()))?;
        Ok(Self { client })
    }

    /// Downloads `url` and reduces it to announcement text.
    pub fn fetch_text(&self, url: &str) -> Result<String, FetchError> {
        let parsed = reqwest::Url::parse(url).map_err(|_| FetchError::InvalidUrl(url.to_string()))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(FetchError::InvalidUrl(url.to_string()));
        }

        let response = self.client.get(parsed).send().map_err(|err| {
            warn!("request failed for {url}: {err}");
            FetchError::Http(err.to_string())
        })?;
        let status = response.status();
        if !status.is_success() {
            warn!("non-success status {status} for {url}");
            return Err(FetchError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        let html = response
            .text()
            .map_err(|err| FetchError::Http(err.to_string()))?;

        let text = html_to_text(&html);
        debug!(url, bytes = html.len(), lines = text.lines().count(), "fetched announcement");
        if text.trim().is_empty() {
            return Err(FetchError::Empty(url.to_string()));
        }
        Ok(text)
    }
}

/// Visible text of a page, one block element per line. Falls back to the
/// page description when the body carries no text (typical for social posts).
pub fn html_to_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let mut raw = String::new();

    for node in document.root_element().descendants() {
        match node.value() {
            Node::Element(element) if BLOCK_ELEMENTS.contains(&element.name()) => raw.push('\n'),
            Node::Text(text) => {
                let hidden = node.ancestors().any(|ancestor| {
                    ancestor
                        .value()
                        .as_element()
                        .is_some_and(|el| SKIPPED_ELEMENTS.contains(&el.name()))
                });
                if !hidden {
                    raw.push_str(text);
                }
            }
            _ => {}
        }
    }

    let body = raw
        .lines()
        .map(clean_text)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n");
    if !body.is_empty() {
        return body;
    }

    document
        .select(&OG_DESCRIPTION_SELECTOR)
        .find_map(|meta| meta.value().attr("content"))
        .map(|content| content.trim().to_string())
        .unwrap_or_default()
}

pub fn clean_text(input: &str) -> String {
    input.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsing::{WARN_NO_MILESTONES, WARN_NO_SHOW_TIMES, WARN_NO_TITLE, WARN_NO_VENUE};

    const SAMPLE_HTML: &str = r#"
    <html>
      <head><title>ignored</title><style>.x { color: red }</style></head>
      <body>
        <h1>SPRING LIVE 2026</h1>
        <script>var date = "2099/1/1";</script>
        <div class="info">
          <p>会場：<strong>日本武道館</strong></p>
          <p>2026年5月10日(日)<br>開場17:00   開演18:00</p>
        </div>
      </body>
    </html>
    "#;

    #[test]
    fn strips_markup_into_lines() {
        let text = html_to_text(SAMPLE_HTML);
        assert_eq!(
            text,
            "SPRING LIVE 2026\n会場：日本武道館\n2026年5月10日(日)\n開場17:00 開演18:00"
        );
    }

    #[test]
    fn falls_back_to_page_description() {
        let html = r#"<html><head>
            <meta property="og:description" content="FC先行 3/1〜3/5">
            </head><body></body></html>"#;
        assert_eq!(html_to_text(html), "FC先行 3/1〜3/5");
    }

    #[test]
    fn rejects_non_http_urls_without_network() {
        let fetcher = Fetcher::new(&AppConfig::default()).expect("client");
        let err = fetcher.fetch_text("file:///etc/passwd").expect_err("scheme");
        assert!(matches!(err, FetchError::InvalidUrl(_)));
        let err = fetcher.fetch_text("not a url").expect_err("parse");
        assert!(matches!(err, FetchError::InvalidUrl(_)));
    }

    #[test]
    fn user_message_is_distinct_from_parser_warnings() {
        let message = FetchError::Http("timeout".to_string()).user_message();
        for warning in [WARN_NO_TITLE, WARN_NO_VENUE, WARN_NO_SHOW_TIMES, WARN_NO_MILESTONES] {
            assert_ne!(message, warning);
        }
        assert_eq!(
            FetchError::Empty("https://example.com".to_string()).user_message(),
            message
        );
    }
}
