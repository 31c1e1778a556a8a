//! Read-only querying over the canonical article set.
//!
//! Keyword mode is a pure boolean filter that keeps the input order. Semantic mode applies the
//! operators of the query as a filter, then ranks the survivors with a [`RelevanceScorer`].

pub mod grammar;
pub mod scoring;

use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use tracing::debug;

use crate::model::Article;
pub use grammar::{parse_query, ParsedQuery};
pub use scoring::{KeywordOverlapScorer, Relevance, RelevanceScorer};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SearchMode {
    #[default]
    Keyword,
    Semantic,
}

impl FromStr for SearchMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "keyword" => Ok(SearchMode::Keyword),
            "semantic" => Ok(SearchMode::Semantic),
            other => Err(format!("unknown search mode: {}", other)),
        }
    }
}

impl fmt::Display for SearchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchMode::Keyword => write!(f, "keyword"),
            SearchMode::Semantic => write!(f, "semantic"),
        }
    }
}

/// One result row. `score` is set only by ranked lookups.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchHit {
    pub article: Article,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<u32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub matches: Vec<String>,
}

impl SearchHit {
    fn plain(article: &Article) -> Self {
        Self {
            article: article.clone(),
            score: None,
            matches: Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SearchOptions {
    pub semantic_min_score: u32,
    pub similar_min_score: u32,
    pub similar_limit: usize,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            semantic_min_score: 20,
            similar_min_score: 30,
            similar_limit: 8,
        }
    }
}

impl From<&common::SearchConfig> for SearchOptions {
    fn from(cfg: &common::SearchConfig) -> Self {
        let defaults = Self::default();
        Self {
            semantic_min_score: cfg.semantic_min_score.unwrap_or(defaults.semantic_min_score),
            similar_min_score: cfg.similar_min_score.unwrap_or(defaults.similar_min_score),
            similar_limit: cfg.similar_limit.unwrap_or(defaults.similar_limit),
        }
    }
}

pub struct QueryEngine {
    scorer: Box<dyn RelevanceScorer>,
    options: SearchOptions,
}

impl Default for QueryEngine {
    fn default() -> Self {
        Self::new(SearchOptions::default())
    }
}

impl QueryEngine {
    pub fn new(options: SearchOptions) -> Self {
        Self::with_scorer(options, Box::new(KeywordOverlapScorer::default()))
    }

    pub fn with_scorer(options: SearchOptions, scorer: Box<dyn RelevanceScorer>) -> Self {
        Self { scorer, options }
    }

    pub fn options(&self) -> &SearchOptions {
        &self.options
    }

    /// Filters (and in semantic mode ranks) `articles` for a raw query string.
    /// A blank query returns every article unchanged.
    pub fn apply_query(&self, raw: &str, articles: &[Article], mode: SearchMode) -> Vec<SearchHit> {
        let parsed = parse_query(raw);
        if parsed.is_empty() {
            return articles.iter().map(SearchHit::plain).collect();
        }
        debug!(query = raw, mode = %mode, operators = parsed.has_operators, "applying query");

        match mode {
            SearchMode::Keyword => articles
                .iter()
                .filter(|a| parsed.matches(a))
                .map(SearchHit::plain)
                .collect(),
            SearchMode::Semantic => self.rank(&parsed, articles),
        }
    }

    fn rank(&self, parsed: &ParsedQuery, articles: &[Article]) -> Vec<SearchHit> {
        let text = parsed.positive_text();

        // Nothing scorable (operators only, or single-letter terms): fall back to the boolean filter
        if scoring::keywords(&text).is_empty() {
            return articles
                .iter()
                .filter(|a| parsed.matches(a))
                .map(SearchHit::plain)
                .collect();
        }

        let mut hits: Vec<SearchHit> = articles
            .iter()
            .filter(|a| parsed.matches_operators(a))
            .filter_map(|article| {
                let relevance = self.scorer.score(&text, article);
                (relevance.score >= self.options.semantic_min_score).then(|| SearchHit {
                    article: article.clone(),
                    score: Some(relevance.score),
                    matches: relevance.matches,
                })
            })
            .collect();
        hits.sort_by(|a, b| b.score.cmp(&a.score));
        hits
    }

    /// Articles related to `reference`, best first. The reference itself is never returned.
    pub fn find_similar(&self, reference: &Article, candidates: &[Article], limit: Option<usize>) -> Vec<SearchHit> {
        let limit = limit.unwrap_or(self.options.similar_limit);

        let mut hits: Vec<SearchHit> = candidates
            .iter()
            .filter(|c| c.id != reference.id)
            .filter_map(|candidate| {
                let relevance = self.scorer.score(&reference.title, candidate);
                (relevance.score >= self.options.similar_min_score).then(|| SearchHit {
                    article: candidate.clone(),
                    score: Some(relevance.score),
                    matches: relevance.matches,
                })
            })
            .collect();
        hits.sort_by(|a, b| b.score.cmp(&a.score));
        hits.truncate(limit);
        hits
    }
}

/// [`QueryEngine::apply_query`] with default options.
pub fn apply_query(raw: &str, articles: &[Article], mode: SearchMode) -> Vec<SearchHit> {
    QueryEngine::default().apply_query(raw, articles, mode)
}

/// [`QueryEngine::find_similar`] with default options.
pub fn find_similar(reference: &Article, candidates: &[Article], limit: usize) -> Vec<SearchHit> {
    QueryEngine::default().find_similar(reference, candidates, Some(limit))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::RawArticle;
    use chrono::Utc;

    fn article(id: &str, title: &str, summary: &str, category: &str) -> Article {
        Article::from_raw(
            RawArticle {
                title: title.to_string(),
                link: format!("https://example.com/{}", id),
                summary: summary.to_string(),
                source: "Example".to_string(),
                category: category.to_string(),
                published_at: String::new(),
                scraped_at: Utc::now(),
            },
            id.to_string(),
        )
    }

    fn ids(hits: &[SearchHit]) -> Vec<&str> {
        hits.iter().map(|h| h.article.id.as_str()).collect()
    }

    fn corpus() -> Vec<Article> {
        vec![
            article("1", "AI startup raises funding", "New model training cluster", "AI"),
            article("2", "AI vendor suffers data breach", "Customer records exposed", "Security"),
            article("3", "Zero day in browser exploited", "Patch released", "Security"),
            article("4", "Quarterly earnings beat estimates", "Markets rally", "Business"),
            article("5", "Election results announced", "Turnout was high", "News"),
        ]
    }

    #[test]
    fn mode_parses_case_insensitively() {
        assert_eq!("Semantic".parse::<SearchMode>(), Ok(SearchMode::Semantic));
        assert_eq!("keyword".parse::<SearchMode>(), Ok(SearchMode::Keyword));
        assert!("fuzzy".parse::<SearchMode>().is_err());
        assert_eq!(SearchMode::default(), SearchMode::Keyword);
    }

    #[test]
    fn keyword_mode_filters_and_keeps_order() {
        let articles = corpus();
        let hits = apply_query("ai -breach", &articles, SearchMode::Keyword);
        assert_eq!(ids(&hits), vec!["1"]);
        assert!(hits[0].score.is_none());

        let hits = apply_query("\"zero day\"", &articles, SearchMode::Keyword);
        assert_eq!(ids(&hits), vec!["3"]);

        let hits = apply_query("category:news", &articles, SearchMode::Keyword);
        assert_eq!(ids(&hits), vec!["5"]);

        let hits = apply_query("category:sec", &articles, SearchMode::Keyword);
        assert_eq!(ids(&hits), vec!["2", "3"]);
    }

    #[test]
    fn blank_query_returns_everything() {
        let articles = corpus();
        assert_eq!(apply_query("   ", &articles, SearchMode::Semantic).len(), articles.len());
    }

    #[test]
    fn semantic_mode_ranks_and_drops_weak_matches() {
        let articles = vec![
            article("summary-only", "Weekly roundup", "Notes on rust tooling", "Development"),
            article("title", "Rust compiler speeds up", "", "Development"),
            article("none", "Gardening tips", "", "News"),
        ];

        let hits = apply_query("rust compiler", &articles, SearchMode::Semantic);
        assert_eq!(ids(&hits), vec!["title"]);
        assert_eq!(hits[0].score, Some(90));
        assert_eq!(hits[0].matches, vec!["rust", "compiler"]);
    }

    #[test]
    fn semantic_mode_respects_operators() {
        let articles = corpus();
        let hits = apply_query("ai -breach", &articles, SearchMode::Semantic);
        assert_eq!(ids(&hits), vec!["1"]);
        assert!(hits[0].score.unwrap_or_default() >= 20);
    }

    #[test]
    fn semantic_mode_without_keywords_only_filters() {
        let articles = corpus();
        let hits = apply_query("category:security", &articles, SearchMode::Semantic);
        assert_eq!(ids(&hits), vec!["2", "3"]);
        assert!(hits.iter().all(|h| h.score.is_none()));
    }

    #[test]
    fn semantic_mode_with_unscorable_terms_still_filters() {
        let articles = corpus();
        let semantic = apply_query("z", &articles, SearchMode::Semantic);
        let keyword = apply_query("z", &articles, SearchMode::Keyword);
        assert_eq!(ids(&semantic), vec!["3"]);
        assert_eq!(ids(&semantic), ids(&keyword));
        assert!(semantic[0].score.is_none());
    }

    #[test]
    fn find_similar_excludes_reference_and_applies_threshold() {
        let reference = article("ref", "OpenAI releases GPT-5 model", "", "AI");
        let candidates = vec![
            reference.clone(),
            article("close", "GPT-5 model benchmarks leaked", "", "AI"),
            article("weak", "OpenAI hires new CFO", "", "Business"),
            article("unrelated", "Rust 1.80 released", "", "Development"),
        ];

        let hits = find_similar(&reference, &candidates, 8);
        assert_eq!(ids(&hits), vec!["close"]);
        assert_eq!(hits[0].score, Some(38));
    }

    #[test]
    fn find_similar_limits_results() {
        let reference = article("ref", "Kernel scheduler rewrite", "", "Development");
        let candidates: Vec<Article> = (0..5)
            .map(|i| article(&i.to_string(), "Kernel scheduler rewrite lands", "", "Development"))
            .collect();

        assert_eq!(find_similar(&reference, &candidates, 3).len(), 3);
    }

    #[test]
    fn options_come_from_config() {
        let cfg = common::SearchConfig {
            default_mode: None,
            semantic_min_score: Some(50),
            similar_min_score: None,
            similar_limit: Some(3),
        };
        let options = SearchOptions::from(&cfg);
        assert_eq!(options.semantic_min_score, 50);
        assert_eq!(options.similar_min_score, 30);
        assert_eq!(options.similar_limit, 3);
    }
}
