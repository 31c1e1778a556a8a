//! Clusters near-duplicate coverage of the same story and keeps one canonical article per
//! cluster.
//!
//! Two articles belong together when their normalized titles are similar enough *and* they were
//! scraped within the proximity window. Clustering is the transitive closure of that relation
//! (union–find), so chains A~B~C end up in one cluster even when A and C alone would not match.
//!
//! Candidate pairs are visited in scrape-time order and the inner loop stops as soon as the time
//! gap exceeds the window. This bounds the pairwise pass to articles that could match anyway; it
//! does not change which pairs merge.

use chrono::Duration;
use std::collections::{HashMap, HashSet};
use tracing::{error, info};

use crate::error::DeduplicationError;
use crate::model::Article;

const STOP_WORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "by", "for", "from", "has", "have", "in", "into",
    "is", "it", "its", "of", "on", "or", "over", "that", "the", "this", "to", "was", "were",
    "will", "with",
];

#[derive(Debug, Clone)]
pub struct DedupConfig {
    /// Minimum normalized title similarity, in [0, 1]
    pub title_similarity_threshold: f64,
    pub time_proximity: Duration,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            title_similarity_threshold: 0.75,
            time_proximity: Duration::hours(6),
        }
    }
}

impl From<&common::DedupConfig> for DedupConfig {
    fn from(cfg: &common::DedupConfig) -> Self {
        let defaults = Self::default();
        Self {
            title_similarity_threshold: cfg
                .title_similarity_threshold
                .unwrap_or(defaults.title_similarity_threshold),
            time_proximity: cfg
                .time_proximity_hours
                .map(Duration::hours)
                .unwrap_or(defaults.time_proximity),
        }
    }
}

/// Scores two normalized titles in [0, 1].
pub trait SimilarityStrategy: Send + Sync {
    fn similarity(&self, left: &str, right: &str) -> Result<f64, DeduplicationError>;
}

/// Default strategy: the better of token-set Dice and character-bigram Dice.
///
/// Token overlap catches reworded headlines; bigrams catch small spelling and inflection changes
/// ("release" / "releases").
#[derive(Debug, Clone, Copy, Default)]
pub struct TitleSimilarity;

impl SimilarityStrategy for TitleSimilarity {
    fn similarity(&self, left: &str, right: &str) -> Result<f64, DeduplicationError> {
        if left.is_empty() || right.is_empty() {
            return Ok(0.0);
        }
        let tokens = token_dice(left, right);
        let bigrams = strsim::sorensen_dice(left, right);
        Ok(tokens.max(bigrams))
    }
}

fn token_dice(left: &str, right: &str) -> f64 {
    let a: HashSet<&str> = left.split_whitespace().collect();
    let b: HashSet<&str> = right.split_whitespace().collect();
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let shared = a.intersection(&b).count();
    (2 * shared) as f64 / (a.len() + b.len()) as f64
}

/// Lower-case, punctuation to spaces, stop words dropped, whitespace collapsed.
pub fn normalize_title(title: &str) -> String {
    let lowered: String = title
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();

    lowered
        .split_whitespace()
        .filter(|w| !STOP_WORDS.contains(w))
        .collect::<Vec<_>>()
        .join(" ")
}

struct UnionFind {
    parent: Vec<usize>,
}

impl UnionFind {
    fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
        }
    }

    fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }

    fn union(&mut self, a: usize, b: usize) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra != rb {
            self.parent[rb.max(ra)] = ra.min(rb);
        }
    }
}

#[derive(Debug, Clone)]
pub struct DedupOutcome {
    /// One canonical article per cluster, newest scrape first
    pub articles: Vec<Article>,
    /// Non-canonical members, flagged `is_duplicate`
    pub suppressed: Vec<Article>,
    pub clusters: usize,
    /// Similarity failed and deduplication was skipped for this run
    pub fail_open: bool,
}

pub struct DedupEngine {
    config: DedupConfig,
    strategy: Box<dyn SimilarityStrategy>,
}

impl DedupEngine {
    pub fn new(config: DedupConfig) -> Self {
        Self::with_strategy(config, Box::new(TitleSimilarity))
    }

    pub fn with_strategy(config: DedupConfig, strategy: Box<dyn SimilarityStrategy>) -> Self {
        Self { config, strategy }
    }

    pub fn config(&self) -> &DedupConfig {
        &self.config
    }

    /// Partitions `articles` into clusters of indices. Every index appears in exactly one cluster;
    /// clusters are ordered by their first member's position in the input.
    pub fn cluster(&self, articles: &[Article]) -> Result<Vec<Vec<usize>>, DeduplicationError> {
        let n = articles.len();
        let normalized: Vec<String> = articles.iter().map(|a| normalize_title(&a.title)).collect();

        let mut order: Vec<usize> = (0..n).collect();
        order.sort_by_key(|&i| articles[i].scraped_at);

        let mut sets = UnionFind::new(n);
        for (pos, &i) in order.iter().enumerate() {
            for &j in &order[pos + 1..] {
                if articles[j].scraped_at - articles[i].scraped_at > self.config.time_proximity {
                    break;
                }
                if sets.find(i) == sets.find(j) {
                    continue;
                }
                let score = self.strategy.similarity(&normalized[i], &normalized[j])?;
                if !score.is_finite() || !(0.0..=1.0).contains(&score) {
                    return Err(DeduplicationError::InvalidScore {
                        left: articles[i].title.clone(),
                        right: articles[j].title.clone(),
                        score,
                    });
                }
                if score >= self.config.title_similarity_threshold {
                    sets.union(i, j);
                }
            }
        }

        let mut by_root: HashMap<usize, usize> = HashMap::new();
        let mut clusters: Vec<Vec<usize>> = Vec::new();
        for i in 0..n {
            let root = sets.find(i);
            let slot = *by_root.entry(root).or_insert_with(|| {
                clusters.push(Vec::new());
                clusters.len() - 1
            });
            clusters[slot].push(i);
        }
        Ok(clusters)
    }

    /// Clusters the batch and folds each cluster into its canonical article.
    ///
    /// Never fails: if similarity scoring errors, deduplication is skipped for the whole run and
    /// every article is returned as its own canonical.
    pub fn deduplicate(&self, articles: Vec<Article>) -> DedupOutcome {
        let clusters = match self.cluster(&articles) {
            Ok(clusters) => clusters,
            Err(e) => {
                error!(error = %e, articles = articles.len(), "deduplication failed; fail-open: deduplication disabled for this run");
                let mut outcome = passthrough(articles);
                outcome.fail_open = true;
                return outcome;
            }
        };

        let input_len = articles.len();
        let mut slots: Vec<Option<Article>> = articles.into_iter().map(Some).collect();
        let mut canonicals: Vec<(usize, Article)> = Vec::with_capacity(clusters.len());
        let mut suppressed = Vec::new();

        for cluster in &clusters {
            let members: Vec<Article> = cluster.iter().filter_map(|&i| slots[i].take()).collect();
            let (canonical, rest) = fold_cluster(members);
            canonicals.push((cluster[0], canonical));
            suppressed.extend(rest);
        }

        canonicals.sort_by_key(|(first, _)| *first);
        let mut articles: Vec<Article> = canonicals.into_iter().map(|(_, a)| a).collect();
        articles.sort_by(|a, b| b.scraped_at.cmp(&a.scraped_at));

        info!(
            input = input_len,
            clusters = clusters.len(),
            folded = suppressed.len(),
            "deduplication complete"
        );

        DedupOutcome {
            clusters: clusters.len(),
            articles,
            suppressed,
            fail_open: false,
        }
    }
}

impl Default for DedupEngine {
    fn default() -> Self {
        Self::new(DedupConfig::default())
    }
}

/// Every article as its own cluster, with cluster fields reset.
pub fn passthrough(mut articles: Vec<Article>) -> DedupOutcome {
    for article in &mut articles {
        article.reset_cluster();
    }
    articles.sort_by(|a, b| b.scraped_at.cmp(&a.scraped_at));
    DedupOutcome {
        clusters: articles.len(),
        articles,
        suppressed: Vec::new(),
        fail_open: false,
    }
}

/// Picks the canonical member (earliest scrape, then source name, then link) and folds the rest
/// into it. Cluster information the members already carry is merged, which keeps re-runs stable.
fn fold_cluster(mut members: Vec<Article>) -> (Article, Vec<Article>) {
    members.sort_by(|a, b| {
        a.scraped_at
            .cmp(&b.scraped_at)
            .then_with(|| a.source.cmp(&b.source))
            .then_with(|| a.link.cmp(&b.link))
    });
    let mut canonical = members.remove(0);

    let mut duplicates = std::mem::take(&mut canonical.duplicates);
    let mut all_sources = vec![canonical.source.clone()];
    all_sources.append(&mut canonical.all_sources);

    for member in &mut members {
        duplicates.push(member.as_duplicate_ref());
        duplicates.extend(member.duplicates.iter().cloned());
        all_sources.push(member.source.clone());
        all_sources.extend(member.all_sources.iter().cloned());
        member.is_duplicate = true;
    }

    let mut seen_ids = HashSet::new();
    duplicates.retain(|d| d.id != canonical.id && seen_ids.insert(d.id.clone()));
    let mut seen_sources = HashSet::new();
    all_sources.retain(|s| seen_sources.insert(s.clone()));

    canonical.duplicate_count = duplicates.len();
    canonical.duplicates = duplicates;
    canonical.all_sources = all_sources;
    canonical.is_duplicate = false;

    (canonical, members)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::article_id;
    use chrono::{DateTime, TimeZone, Utc};

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 10, hour, minute, 0).unwrap()
    }

    fn article(title: &str, source: &str, scraped_at: DateTime<Utc>) -> Article {
        let link = format!("https://{}.example.com/{}", source.to_lowercase(), title.len());
        let mut a = Article::from_raw(
            crate::model::RawArticle {
                title: title.to_string(),
                link: link.clone(),
                summary: String::new(),
                source: source.to_string(),
                category: "News".to_string(),
                published_at: String::new(),
                scraped_at,
            },
            String::new(),
        );
        a.id = article_id(title, source, &link);
        a
    }

    struct PairTable(Vec<(&'static str, &'static str)>);

    impl SimilarityStrategy for PairTable {
        fn similarity(&self, left: &str, right: &str) -> Result<f64, DeduplicationError> {
            let hit = self
                .0
                .iter()
                .any(|(a, b)| (*a == left && *b == right) || (*a == right && *b == left));
            Ok(if hit { 1.0 } else { 0.0 })
        }
    }

    struct Failing;

    impl SimilarityStrategy for Failing {
        fn similarity(&self, _: &str, _: &str) -> Result<f64, DeduplicationError> {
            Err(DeduplicationError::Similarity("malformed title".to_string()))
        }
    }

    struct NotANumber;

    impl SimilarityStrategy for NotANumber {
        fn similarity(&self, _: &str, _: &str) -> Result<f64, DeduplicationError> {
            Ok(f64::NAN)
        }
    }

    #[test]
    fn normalization_drops_case_punctuation_and_stop_words() {
        assert_eq!(
            normalize_title("The OpenAI Releases GPT-5 to the Public!"),
            "openai releases gpt 5 public"
        );
        assert_eq!(normalize_title("  ...  "), "");
    }

    #[test]
    fn title_similarity_bounds() {
        let s = TitleSimilarity;
        assert_eq!(s.similarity("rust compiler", "rust compiler").unwrap(), 1.0);
        assert_eq!(s.similarity("", "rust").unwrap(), 0.0);
        let unrelated = s
            .similarity(
                &normalize_title("Kernel maintainers debate scheduler patch"),
                &normalize_title("Bitcoin price surges past record high"),
            )
            .unwrap();
        assert!(unrelated < 0.75, "unrelated titles scored {unrelated}");
    }

    #[test]
    fn near_identical_titles_within_window_merge() {
        let engine = DedupEngine::default();
        let outcome = engine.deduplicate(vec![
            article("OpenAI releases GPT-5 model to the public", "Verge", at(9, 0)),
            article("OpenAI releases GPT-5 model for the public", "Wired", at(10, 0)),
            article("OpenAI releases new GPT-5 model to public", "Ars", at(10, 30)),
        ]);

        assert_eq!(outcome.articles.len(), 1);
        assert_eq!(outcome.suppressed.len(), 2);
        let canonical = &outcome.articles[0];
        assert_eq!(canonical.source, "Verge");
        assert_eq!(canonical.duplicate_count, 2);
        assert!(!canonical.is_duplicate);
        assert!(outcome.suppressed.iter().all(|a| a.is_duplicate));
        for source in ["Verge", "Wired", "Ars"] {
            assert!(canonical.all_sources.iter().any(|s| s == source));
        }
    }

    #[test]
    fn similar_titles_outside_window_stay_separate() {
        let engine = DedupEngine::default();
        let outcome = engine.deduplicate(vec![
            article("Major outage hits cloud provider", "Alpha", at(1, 0)),
            article("Major outage hits cloud provider", "Beta", at(8, 0)),
        ]);
        assert_eq!(outcome.articles.len(), 2);
        assert!(outcome.articles.iter().all(|a| a.duplicate_count == 0));
    }

    #[test]
    fn dissimilar_titles_in_window_stay_separate() {
        let engine = DedupEngine::default();
        let outcome = engine.deduplicate(vec![
            article("Kernel maintainers debate scheduler patch", "Alpha", at(9, 0)),
            article("Bitcoin price surges past record high", "Beta", at(9, 10)),
        ]);
        assert_eq!(outcome.clusters, 2);
    }

    #[test]
    fn clustering_is_transitive() {
        let engine = DedupEngine::with_strategy(
            DedupConfig::default(),
            Box::new(PairTable(vec![("alpha", "bravo"), ("bravo", "charlie")])),
        );
        let articles = vec![
            article("Alpha", "One", at(9, 0)),
            article("Charlie", "Three", at(9, 20)),
            article("Bravo", "Two", at(9, 10)),
        ];

        let clusters = engine.cluster(&articles).expect("cluster");
        assert_eq!(clusters, vec![vec![0, 1, 2]]);
    }

    #[test]
    fn canonical_ties_break_on_source_name() {
        let engine = DedupEngine::default();
        let outcome = engine.deduplicate(vec![
            article("Same headline everywhere", "Zeta", at(9, 0)),
            article("Same headline everywhere", "Alpha", at(9, 0)),
        ]);
        assert_eq!(outcome.articles[0].source, "Alpha");
        assert_eq!(outcome.articles[0].all_sources, vec!["Alpha".to_string(), "Zeta".to_string()]);
    }

    #[test]
    fn canonical_never_lists_itself() {
        let engine = DedupEngine::default();
        let outcome = engine.deduplicate(vec![
            article("Same headline everywhere", "Alpha", at(9, 0)),
            article("Same headline everywhere", "Beta", at(9, 5)),
        ]);
        let canonical = &outcome.articles[0];
        assert!(canonical.duplicates.iter().all(|d| d.id != canonical.id));
        assert!(canonical.all_sources.contains(&canonical.source));
        assert_eq!(canonical.duplicates[0].source, "Beta");
    }

    #[test]
    fn rerun_on_output_is_a_no_op() {
        let engine = DedupEngine::default();
        let first = engine.deduplicate(vec![
            article("OpenAI releases GPT-5 model to the public", "Verge", at(9, 0)),
            article("OpenAI releases GPT-5 model for the public", "Wired", at(10, 0)),
            article("Kernel maintainers debate scheduler patch", "LWN", at(9, 30)),
            article("Bitcoin price surges past record high", "Coindesk", at(11, 0)),
        ]);

        let second = engine.deduplicate(first.articles.clone());
        assert_eq!(second.articles, first.articles);
        assert!(second.suppressed.is_empty());
    }

    #[test]
    fn similarity_error_fails_open() {
        let engine = DedupEngine::with_strategy(DedupConfig::default(), Box::new(Failing));
        let outcome = engine.deduplicate(vec![
            article("Same headline everywhere", "Alpha", at(9, 0)),
            article("Same headline everywhere", "Beta", at(9, 5)),
        ]);

        assert!(outcome.fail_open);
        assert_eq!(outcome.articles.len(), 2);
        assert!(outcome.articles.iter().all(|a| !a.is_duplicate && a.duplicate_count == 0));
        assert!(outcome.suppressed.is_empty());
    }

    #[test]
    fn invalid_score_fails_open() {
        let engine = DedupEngine::with_strategy(DedupConfig::default(), Box::new(NotANumber));
        let articles = vec![
            article("One", "Alpha", at(9, 0)),
            article("Two", "Beta", at(9, 5)),
        ];
        assert!(matches!(
            engine.cluster(&articles),
            Err(DeduplicationError::InvalidScore { .. })
        ));
        assert!(engine.deduplicate(articles).fail_open);
    }

    #[test]
    fn config_from_file_section() {
        let cfg = common::DedupConfig {
            enabled: None,
            title_similarity_threshold: Some(0.9),
            time_proximity_hours: None,
        };
        let dedup = DedupConfig::from(&cfg);
        assert_eq!(dedup.title_similarity_threshold, 0.9);
        assert_eq!(dedup.time_proximity, Duration::hours(6));
    }
}
