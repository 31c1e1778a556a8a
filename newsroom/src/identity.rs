use sha2::{Digest, Sha256};
use std::collections::HashSet;
use tracing::debug;

use crate::model::{Article, RawArticle};

/// Length of an article id in hex characters.
pub const ID_LEN: usize = 16;

/// Stable content id over title, source and link.
///
/// Ids are persisted by clients (saved/read flags), so the input framing must never change:
/// fields are joined with a unit separator to keep `("ab", "c")` and `("a", "bc")` apart.
pub fn article_id(title: &str, source: &str, link: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(title.as_bytes());
    hasher.update([0x1f]);
    hasher.update(source.as_bytes());
    hasher.update([0x1f]);
    hasher.update(link.as_bytes());
    let mut id = hex::encode(hasher.finalize());
    id.truncate(ID_LEN);
    id
}

/// Wraps raw articles with their ids. Repeats of an id (a feed listing the same item twice) are
/// dropped, keeping the first occurrence.
pub fn assign_ids(raw: Vec<RawArticle>) -> Vec<Article> {
    let mut seen = HashSet::new();
    raw.into_iter()
        .filter_map(|r| {
            let id = article_id(&r.title, &r.source, &r.link);
            if !seen.insert(id.clone()) {
                debug!(id = %id, source = %r.source, "dropping repeated item");
                return None;
            }
            Some(Article::from_raw(r, id))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_is_deterministic() {
        let a = article_id("Rust 2.0 released", "Hacker News", "https://example.com/rust");
        let b = article_id("Rust 2.0 released", "Hacker News", "https://example.com/rust");
        assert_eq!(a, b);
        assert_eq!(a.len(), ID_LEN);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn id_changes_with_link() {
        let a = article_id("Weekly roundup", "Lobsters", "https://example.com/1");
        let b = article_id("Weekly roundup", "Lobsters", "https://example.com/2");
        assert_ne!(a, b);
    }

    #[test]
    fn repeated_items_collapse_to_one_article() {
        let raw = RawArticle {
            title: "Kernel 6.10 released".to_string(),
            link: "https://lwn.example/1".to_string(),
            summary: String::new(),
            source: "LWN".to_string(),
            category: "Development".to_string(),
            published_at: String::new(),
            scraped_at: chrono::Utc::now(),
        };
        let other = RawArticle {
            title: "Stocks close higher".to_string(),
            link: "https://lwn.example/2".to_string(),
            ..raw.clone()
        };

        let articles = assign_ids(vec![raw.clone(), other, raw]);

        assert_eq!(articles.len(), 2);
        assert_eq!(articles[0].title, "Kernel 6.10 released");
        assert_eq!(articles[1].title, "Stocks close higher");
        assert_ne!(articles[0].id, articles[1].id);
    }

    #[test]
    fn field_boundaries_matter() {
        assert_ne!(article_id("ab", "c", "x"), article_id("a", "bc", "x"));
    }
}
