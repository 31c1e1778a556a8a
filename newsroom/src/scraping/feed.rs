use async_trait::async_trait;
use chrono::{DateTime, Utc};
use feed_rs::parser;
use reqwest::Client;

use super::{fetch_page, strip_html, clean_text, SourceAdapter, SourceDescriptor};
use crate::error::SourceFetchError;
use crate::model::RawArticle;

/// RSS / Atom source.
pub struct FeedAdapter {
    descriptor: SourceDescriptor,
}

impl FeedAdapter {
    pub fn new(descriptor: SourceDescriptor) -> Self {
        Self { descriptor }
    }

    /// Parses a feed document. Entries without a title or link are skipped.
    pub fn parse(&self, body: &[u8], scraped_at: DateTime<Utc>) -> Result<Vec<RawArticle>, SourceFetchError> {
        let feed = parser::parse(body).map_err(|e| SourceFetchError::Parse {
            source_name: self.descriptor.name.clone(),
            message: e.to_string(),
        })?;

        let articles = feed
            .entries
            .into_iter()
            .filter_map(|entry| {
                let title = entry.title.map(|t| strip_html(&t.content)).unwrap_or_default();
                let link = entry.links.first().map(|l| l.href.trim().to_string()).unwrap_or_default();
                if title.is_empty() || link.is_empty() {
                    tracing::debug!(source = %self.descriptor.name, "skipping feed entry without title or link");
                    return None;
                }

                let summary = entry
                    .summary
                    .map(|s| s.content)
                    .or_else(|| entry.content.and_then(|c| c.body))
                    .map(|s| strip_html(&s))
                    .unwrap_or_default();

                let published_at = entry
                    .published
                    .or(entry.updated)
                    .map(|d| d.to_rfc3339())
                    .unwrap_or_default();

                Some(RawArticle {
                    title: clean_text(&title),
                    link,
                    summary,
                    source: self.descriptor.name.clone(),
                    category: self.descriptor.category.clone(),
                    published_at,
                    scraped_at,
                })
            })
            .collect();

        Ok(articles)
    }
}

#[async_trait]
impl SourceAdapter for FeedAdapter {
    fn descriptor(&self) -> &SourceDescriptor {
        &self.descriptor
    }

    async fn fetch_and_parse(&self, client: &Client) -> Result<Vec<RawArticle>, SourceFetchError> {
        let body = fetch_page(client, &self.descriptor).await?;
        let scraped_at = Utc::now();
        let articles = self.parse(body.as_bytes(), scraped_at)?;
        if articles.is_empty() {
            return Err(SourceFetchError::Empty {
                source_name: self.descriptor.name.clone(),
            });
        }
        Ok(articles)
    }
}
