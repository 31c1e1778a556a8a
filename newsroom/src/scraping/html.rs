use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use super::{clean_text, fetch_page, SourceAdapter, SourceDescriptor};
use crate::error::SourceFetchError;
use crate::model::RawArticle;

/// CSS selectors describing one listing page layout.
#[derive(Debug, Clone, Default)]
pub struct ListingSelectors {
    pub item: String,
    pub title: String,
    /// Element carrying the `href`; defaults to the title element
    pub link: Option<String>,
    pub summary: Option<String>,
    /// `datetime` attribute is preferred over text content
    pub date: Option<String>,
}

/// HTML listing page scraped with CSS selectors.
pub struct HtmlListAdapter {
    descriptor: SourceDescriptor,
    base: Url,
    item: Selector,
    title: Selector,
    link: Option<Selector>,
    summary: Option<Selector>,
    date: Option<Selector>,
}

fn parse_selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| anyhow!("invalid selector {:?}: {}", css, e))
}

impl HtmlListAdapter {
    pub fn new(descriptor: SourceDescriptor, selectors: &ListingSelectors) -> Result<Self> {
        let base = Url::parse(&descriptor.url)
            .with_context(|| format!("invalid URL for source {}", descriptor.name))?;
        Ok(Self {
            base,
            item: parse_selector(&selectors.item)?,
            title: parse_selector(&selectors.title)?,
            link: selectors.link.as_deref().map(parse_selector).transpose()?,
            summary: selectors.summary.as_deref().map(parse_selector).transpose()?,
            date: selectors.date.as_deref().map(parse_selector).transpose()?,
            descriptor,
        })
    }

    /// Parses a listing page. Items without a title or a resolvable link are skipped.
    pub fn parse(&self, page: &str, scraped_at: DateTime<Utc>) -> Vec<RawArticle> {
        let document = Html::parse_document(page);

        document
            .select(&self.item)
            .filter_map(|item| self.parse_item(item, scraped_at))
            .collect()
    }

    fn parse_item(&self, item: ElementRef<'_>, scraped_at: DateTime<Utc>) -> Option<RawArticle> {
        let title_el = item.select(&self.title).next()?;
        let title = clean_text(&title_el.text().collect::<Vec<_>>().join(" "));
        if title.is_empty() {
            return None;
        }

        let link_el = match &self.link {
            Some(sel) => item.select(sel).next(),
            None => Some(title_el),
        };
        let href = link_el
            .and_then(|el| el.value().attr("href"))
            .or_else(|| item.value().attr("href"))?;
        let link = self.base.join(href.trim()).ok()?.to_string();

        let summary = self
            .summary
            .as_ref()
            .and_then(|sel| item.select(sel).next())
            .map(|el| clean_text(&el.text().collect::<Vec<_>>().join(" ")))
            .unwrap_or_default();

        let published_at = self
            .date
            .as_ref()
            .and_then(|sel| item.select(sel).next())
            .map(|el| match el.value().attr("datetime") {
                Some(dt) => dt.trim().to_string(),
                None => clean_text(&el.text().collect::<String>()),
            })
            .unwrap_or_default();

        Some(RawArticle {
            title,
            link,
            summary,
            source: self.descriptor.name.clone(),
            category: self.descriptor.category.clone(),
            published_at,
            scraped_at,
        })
    }
}

#[async_trait]
impl SourceAdapter for HtmlListAdapter {
    fn descriptor(&self) -> &SourceDescriptor {
        &self.descriptor
    }

    async fn fetch_and_parse(&self, client: &Client) -> Result<Vec<RawArticle>, SourceFetchError> {
        let page = fetch_page(client, &self.descriptor).await?;
        let articles = self.parse(&page, Utc::now());
        if articles.is_empty() {
            return Err(SourceFetchError::Empty {
                source_name: self.descriptor.name.clone(),
            });
        }
        Ok(articles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn adapter(selectors: ListingSelectors) -> HtmlListAdapter {
        HtmlListAdapter::new(
            SourceDescriptor {
                name: "Example Security".to_string(),
                category: "Security".to_string(),
                url: "https://security.example.com/news/".to_string(),
            },
            &selectors,
        )
        .expect("adapter")
    }

    #[test]
    fn rejects_invalid_selector() {
        let result = HtmlListAdapter::new(
            SourceDescriptor {
                name: "Broken".to_string(),
                category: "News".to_string(),
                url: "https://example.com".to_string(),
            },
            &ListingSelectors {
                item: "div[".to_string(),
                title: "h2".to_string(),
                ..Default::default()
            },
        );
        assert!(result.is_err());
    }

    #[test]
    fn title_element_is_default_link() {
        let page = r#"
            <ul>
              <li class="story"><a href="https://other.example.org/x">  Outside   link </a></li>
              <li class="story"><span>no link here</span></li>
            </ul>
        "#;
        let a = adapter(ListingSelectors {
            item: "li.story".to_string(),
            title: "a".to_string(),
            ..Default::default()
        });

        let articles = a.parse(page, Utc::now());
        assert_eq!(articles.len(), 1);
        assert_eq!(articles[0].title, "Outside link");
        assert_eq!(articles[0].link, "https://other.example.org/x");
        assert!(articles[0].summary.is_empty());
    }
}
