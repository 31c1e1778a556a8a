use anyhow::{bail, Result};
use common::{SourceConfig, SourceKind};
use std::sync::Arc;

use super::html::ListingSelectors;
use super::{FeedAdapter, HtmlListAdapter, SourceAdapter, SourceDescriptor};
use crate::model::resolve_category;

/// Builds the adapter list from configuration, in configuration order.
/// Disabled sources are skipped.
pub fn build_adapters(sources: &[SourceConfig]) -> Result<Vec<Arc<dyn SourceAdapter>>> {
    let mut adapters: Vec<Arc<dyn SourceAdapter>> = Vec::with_capacity(sources.len());

    for source in sources.iter().filter(|s| s.is_enabled()) {
        if source.name.trim().is_empty() {
            bail!("source with URL {} has no name", source.url);
        }
        let descriptor = SourceDescriptor {
            name: source.name.trim().to_string(),
            category: resolve_category(&source.category),
            url: source.url.clone(),
        };

        match source.kind {
            SourceKind::Feed => adapters.push(Arc::new(FeedAdapter::new(descriptor))),
            SourceKind::Html => {
                let (Some(item), Some(title)) = (&source.item_selector, &source.title_selector) else {
                    bail!("html source {} needs item_selector and title_selector", source.name);
                };
                let selectors = ListingSelectors {
                    item: item.clone(),
                    title: title.clone(),
                    link: source.link_selector.clone(),
                    summary: source.summary_selector.clone(),
                    date: source.date_selector.clone(),
                };
                adapters.push(Arc::new(HtmlListAdapter::new(descriptor, &selectors)?));
            }
        }
    }

    Ok(adapters)
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::Config;

    #[test]
    fn builds_adapters_in_order_and_skips_disabled() {
        let cfg: Config = toml::from_str(
            r#"
            [[sources]]
            name = "Hacker News"
            category = "news"
            url = "https://hnrss.org/frontpage"
            kind = "feed"

            [[sources]]
            name = "Paused"
            category = "tech"
            url = "https://example.com/rss"
            kind = "feed"
            enabled = false

            [[sources]]
            name = "Example Security"
            category = "sec"
            url = "https://security.example.com/"
            kind = "html"
            item_selector = "article"
            title_selector = "h2 a"
            "#,
        )
        .expect("config");

        let adapters = build_adapters(&cfg.sources).expect("adapters");
        let names: Vec<&str> = adapters.iter().map(|a| a.name()).collect();
        assert_eq!(names, vec!["Hacker News", "Example Security"]);
        assert_eq!(adapters[0].descriptor().category, "News");
        assert_eq!(adapters[1].descriptor().category, "Security");
    }

    #[test]
    fn html_source_requires_selectors() {
        let cfg: Config = toml::from_str(
            r#"
            [[sources]]
            name = "Bare"
            category = "news"
            url = "https://example.com/"
            kind = "html"
            "#,
        )
        .expect("config");

        assert!(build_adapters(&cfg.sources).is_err());
    }
}
