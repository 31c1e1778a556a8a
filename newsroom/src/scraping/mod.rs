//! Source adapters: one implementation per page format, each turning a source page into
//! [`RawArticle`]s.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE};
use reqwest::Client;
use std::time::Duration;

use crate::error::SourceFetchError;
use crate::model::RawArticle;

pub mod feed;
pub mod html;
pub mod registry;

pub use feed::FeedAdapter;
pub use html::HtmlListAdapter;
pub use registry::build_adapters;

pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (compatible; Newsroom/0.1; +https://github.com/taophp/newsroom)";

const ACCEPT_VALUE: &str =
    "text/html,application/xhtml+xml,application/rss+xml,application/atom+xml;q=0.9,*/*;q=0.8";

/// Static description of a source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDescriptor {
    pub name: String,
    /// Canonical category name
    pub category: String,
    pub url: String,
}

/// Capability every source implements.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    fn descriptor(&self) -> &SourceDescriptor;

    /// Fetch the source page and parse it into raw articles.
    /// Zero parsed articles is reported as [`SourceFetchError::Empty`].
    async fn fetch_and_parse(&self, client: &Client) -> Result<Vec<RawArticle>, SourceFetchError>;

    fn name(&self) -> &str {
        &self.descriptor().name
    }
}

/// Builds the shared HTTP client carrying the fixed header set.
pub fn build_client(timeout_secs: u64, user_agent: Option<&str>) -> Result<Client> {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_VALUE));
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));

    Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .user_agent(user_agent.unwrap_or(DEFAULT_USER_AGENT))
        .default_headers(headers)
        .gzip(true)
        .build()
        .context("failed to build reqwest client")
}

/// GET a source page as text.
pub async fn fetch_page(client: &Client, source: &SourceDescriptor) -> Result<String, SourceFetchError> {
    let http = |error| SourceFetchError::Http {
        source_name: source.name.clone(),
        error,
    };

    let response = client.get(&source.url).send().await.map_err(http)?;
    let status = response.status();
    if !status.is_success() {
        return Err(SourceFetchError::Status {
            source_name: source.name.clone(),
            status: status.as_u16(),
        });
    }
    response.text().await.map_err(http)
}

/// Collapses runs of whitespace into single spaces and trims.
pub(crate) fn clean_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Text content of an HTML fragment, whitespace-collapsed.
pub(crate) fn strip_html(fragment: &str) -> String {
    if !fragment.contains('<') {
        return clean_text(fragment);
    }
    let doc = scraper::Html::parse_fragment(fragment);
    clean_text(&doc.root_element().text().collect::<Vec<_>>().join(" "))
}
