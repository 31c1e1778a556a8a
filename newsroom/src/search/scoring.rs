use crate::dedup::normalize_title;
use crate::model::Article;

/// Relevance of one article for a query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Relevance {
    /// 0..=100
    pub score: u32,
    /// Query keywords found in the article, in query order
    pub matches: Vec<String>,
}

/// Pluggable relevance function used by semantic search and related-article lookup.
pub trait RelevanceScorer: Send + Sync {
    fn score(&self, query: &str, article: &Article) -> Relevance;
}

/// Weighted keyword overlap between the query and an article.
///
/// A keyword found in the title counts `title_weight`, in the summary `summary_weight`; the sum is
/// scaled to 100. When the whole query shows up contiguously in the title a bonus is added.
#[derive(Debug, Clone)]
pub struct KeywordOverlapScorer {
    pub title_weight: u32,
    pub summary_weight: u32,
    pub phrase_bonus: u32,
}

impl Default for KeywordOverlapScorer {
    fn default() -> Self {
        Self {
            title_weight: 3,
            summary_weight: 1,
            phrase_bonus: 15,
        }
    }
}

/// Distinct query keywords: normalized, stop words and single characters dropped.
pub fn keywords(text: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for word in normalize_title(text).split_whitespace() {
        if word.chars().count() < 2 || out.iter().any(|w| w == word) {
            continue;
        }
        out.push(word.to_string());
    }
    out
}

/// Whole-token match, with prefix matching for words of four or more characters so that
/// "release" and "releases" agree.
fn token_hit(term: &str, tokens: &[&str]) -> bool {
    tokens.iter().any(|token| {
        *token == term
            || (term.len() >= 4 && token.starts_with(term))
            || (token.len() >= 4 && term.starts_with(token))
    })
}

impl RelevanceScorer for KeywordOverlapScorer {
    fn score(&self, query: &str, article: &Article) -> Relevance {
        let terms = keywords(query);
        let per_term = self.title_weight + self.summary_weight;
        if terms.is_empty() || per_term == 0 {
            return Relevance::default();
        }

        let title = normalize_title(&article.title);
        let summary = normalize_title(&article.summary);
        let title_tokens: Vec<&str> = title.split_whitespace().collect();
        let summary_tokens: Vec<&str> = summary.split_whitespace().collect();

        let mut points = 0u32;
        let mut matches = Vec::new();
        for term in &terms {
            let mut hit = false;
            if token_hit(term, &title_tokens) {
                points += self.title_weight;
                hit = true;
            }
            if token_hit(term, &summary_tokens) {
                points += self.summary_weight;
                hit = true;
            }
            if hit {
                matches.push(term.clone());
            }
        }

        let max = per_term * terms.len() as u32;
        let mut score = ((points as f64 / max as f64) * 100.0).round() as u32;
        if terms.len() > 1 && title.contains(&terms.join(" ")) {
            score += self.phrase_bonus;
        }

        Relevance {
            score: score.min(100),
            matches,
        }
    }
}
