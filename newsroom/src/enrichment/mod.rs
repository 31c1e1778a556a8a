//! AI summaries for articles.
//!
//! Two entry points with different failure contracts:
//! - [`EnrichmentService::generate_summary`] is a requested action and reports every failure.
//! - [`EnrichmentService::generate_batch_summaries`] is best effort. It never fails and returns
//!   un-enriched articles where generation did not work.
//!
//! Every provider call goes through one [`SerialScheduler`], so at most one request is in flight
//! and consecutive requests are spaced out. Summaries are cached in memory for the life of the
//! process, keyed by source and title.

pub mod prompt;
pub mod scheduler;

use anyhow::anyhow;
use chrono::Utc;
use serde::Serialize;
use std::cmp::Reverse;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::error::EnrichmentError;
use crate::llm::{LlmProvider, LlmRequest, RemoteLlmProvider};
use crate::model::{AiSummary, Article};
pub use prompt::{build_prompt, parse_summary_response, ParsedSummary};
pub use scheduler::SerialScheduler;

const SAMPLE_KEYS: usize = 5;

#[derive(Debug, Clone, PartialEq)]
pub struct SummaryResult {
    pub summary: AiSummary,
    /// Served from the cache without calling the provider
    pub cached: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    pub size: usize,
    pub sample_keys: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct BatchOptions {
    pub max_articles: usize,
    /// Articles with at least this many duplicates are treated as trending
    pub min_duplicate_count: usize,
    /// Minimum gap between two provider calls
    pub delay: Duration,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            max_articles: 20,
            min_duplicate_count: 1,
            delay: Duration::from_millis(1000),
        }
    }
}

impl From<&common::EnrichmentConfig> for BatchOptions {
    fn from(cfg: &common::EnrichmentConfig) -> Self {
        let defaults = Self::default();
        Self {
            max_articles: cfg.max_articles.unwrap_or(defaults.max_articles),
            min_duplicate_count: cfg.min_duplicate_count.unwrap_or(defaults.min_duplicate_count),
            delay: cfg.delay_ms.map(Duration::from_millis).unwrap_or(defaults.delay),
        }
    }
}

/// Cache key for an article: normalized source and title.
pub fn cache_key(source: &str, title: &str) -> String {
    fn norm(s: &str) -> String {
        s.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase()
    }
    format!("{}::{}", norm(source), norm(title))
}

/// Builds the configured LLM provider, if any.
///
/// `adapter = "none"`, a missing `[llm]` section or an unset API key all mean "no provider".
pub fn provider_from_config(cfg: Option<&common::LlmConfig>) -> anyhow::Result<Option<Arc<dyn LlmProvider>>> {
    let Some(cfg) = cfg else {
        return Ok(None);
    };
    match cfg.adapter.as_deref().unwrap_or("none") {
        "none" => Ok(None),
        "remote" => {
            let remote = cfg
                .remote
                .as_ref()
                .ok_or_else(|| anyhow!("llm.adapter = \"remote\" needs an [llm.remote] section"))?;
            match RemoteLlmProvider::from_config(remote)? {
                Some(provider) => {
                    info!(model = provider.model(), "LLM provider initialized");
                    let provider: Arc<dyn LlmProvider> = Arc::new(provider);
                    Ok(Some(provider))
                }
                None => {
                    warn!("LLM API key not set; AI summaries disabled");
                    Ok(None)
                }
            }
        }
        other => Err(anyhow!("Unknown LLM adapter type: {}", other)),
    }
}

pub struct EnrichmentService {
    provider: Option<Arc<dyn LlmProvider>>,
    cache: RwLock<HashMap<String, AiSummary>>,
    scheduler: SerialScheduler,
}

impl EnrichmentService {
    /// `spacing` is the minimum gap between provider calls made outside a batch.
    pub fn new(provider: Option<Arc<dyn LlmProvider>>, spacing: Duration) -> Self {
        Self {
            provider,
            cache: RwLock::new(HashMap::new()),
            scheduler: SerialScheduler::new(spacing),
        }
    }

    pub fn from_config(config: &common::Config) -> anyhow::Result<Self> {
        let provider = provider_from_config(config.llm.as_ref())?;
        let spacing = config
            .enrichment
            .as_ref()
            .map(BatchOptions::from)
            .unwrap_or_default()
            .delay;
        Ok(Self::new(provider, spacing))
    }

    pub fn is_available(&self) -> bool {
        self.provider.is_some()
    }

    /// Summarizes one article, serving from the cache when possible.
    pub async fn generate_summary(&self, article: &Article) -> Result<SummaryResult, EnrichmentError> {
        self.summarize_spaced(article, self.scheduler.spacing()).await
    }

    async fn summarize_spaced(&self, article: &Article, spacing: Duration) -> Result<SummaryResult, EnrichmentError> {
        let key = cache_key(&article.source, &article.title);
        if let Some(summary) = self.cache.read().await.get(&key) {
            debug!(key = %key, "summary cache hit");
            return Ok(SummaryResult {
                summary: summary.clone(),
                cached: true,
            });
        }

        let provider = self
            .provider
            .as_ref()
            .ok_or_else(|| EnrichmentError::Unavailable("no LLM provider configured".to_string()))?;

        let request = LlmRequest {
            prompt: build_prompt(article),
            max_tokens: None,
            temperature: Some(0.3),
            timeout_seconds: None,
        };

        // Lookup, call and insert all happen under the scheduler so concurrent requests for the
        // same key reach the provider once.
        let task = async {
            if let Some(summary) = self.cache.read().await.get(&key).cloned() {
                debug!(key = %key, "summary filled while queued");
                return Ok(SummaryResult {
                    summary,
                    cached: true,
                });
            }

            let response = provider
                .generate(request)
                .await
                .map_err(|error| EnrichmentError::Generation {
                    title: article.title.clone(),
                    error,
                })?;

            let parsed = parse_summary_response(&response.content).ok_or_else(|| EnrichmentError::Generation {
                title: article.title.clone(),
                error: anyhow!("response had no usable overview"),
            })?;

            let summary = AiSummary {
                overview: parsed.overview,
                key_points: parsed.key_points,
                generated_at: Utc::now(),
            };
            info!(
                source = %article.source,
                title = %article.title,
                key_points = summary.key_points.len(),
                tokens = response.usage.total_tokens,
                "summary generated"
            );

            self.cache.write().await.insert(key.clone(), summary.clone());
            Ok::<SummaryResult, EnrichmentError>(SummaryResult {
                summary,
                cached: false,
            })
        };
        self.scheduler.run_spaced(spacing, task).await
    }

    /// Summarizes a prioritized subset of `articles`.
    ///
    /// Trending articles come first (most duplicates, then newest), then the newest of the rest,
    /// up to `max_articles`. Articles that already carry a summary are skipped. The output has the
    /// same order and length as the input; failed articles come back unchanged.
    pub async fn generate_batch_summaries(&self, mut articles: Vec<Article>, options: &BatchOptions) -> Vec<Article> {
        if self.provider.is_none() {
            info!("AI service unavailable; batch enrichment skipped");
            return articles;
        }

        let selected = select_candidates(&articles, options);
        info!(selected = selected.len(), total = articles.len(), "batch enrichment starting");

        let mut enriched = 0usize;
        let mut failed = 0usize;
        for index in selected {
            match self.summarize_spaced(&articles[index], options.delay).await {
                Ok(result) => {
                    articles[index].ai_summary = Some(result.summary);
                    enriched += 1;
                }
                Err(e) => {
                    warn!(id = %articles[index].id, error = %e, "summary failed; keeping article un-enriched");
                    failed += 1;
                }
            }
        }

        info!(enriched, failed, "batch enrichment complete");
        articles
    }

    pub async fn clear_cache(&self) {
        let mut cache = self.cache.write().await;
        let dropped = cache.len();
        cache.clear();
        info!(dropped, "summary cache cleared");
    }

    pub async fn cache_stats(&self) -> CacheStats {
        let cache = self.cache.read().await;
        let mut keys: Vec<&String> = cache.keys().collect();
        keys.sort();
        CacheStats {
            size: cache.len(),
            sample_keys: keys.into_iter().take(SAMPLE_KEYS).cloned().collect(),
        }
    }
}

/// Indices to enrich, in priority order.
fn select_candidates(articles: &[Article], options: &BatchOptions) -> Vec<usize> {
    let mut candidates: Vec<usize> = (0..articles.len())
        .filter(|&i| articles[i].ai_summary.is_none())
        .collect();

    candidates.sort_by_key(|&i| {
        let a = &articles[i];
        let trending = a.duplicate_count >= options.min_duplicate_count;
        let weight = if trending { a.duplicate_count } else { 0 };
        (Reverse(trending), Reverse(weight), Reverse(a.scraped_at))
    });
    candidates.truncate(options.max_articles);
    candidates
}
