//! Refresh pipeline: orchestrate, assign ids, deduplicate. Plus the shared in-memory article set
//! that refreshes publish into.

use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tracing::{info, warn};

use crate::dedup::{passthrough, DedupConfig, DedupEngine};
use crate::error::{AggregateIngestionError, RefreshError};
use crate::identity::assign_ids;
use crate::ingestion::{fetch_all, FetchOptions, IngestionReport};
use crate::model::Article;
use crate::scraping::SourceAdapter;

#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub fetch: FetchOptions,
    /// `None` disables clustering
    pub dedup: Option<DedupConfig>,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            fetch: FetchOptions::default(),
            dedup: Some(DedupConfig::default()),
        }
    }
}

impl PipelineOptions {
    pub fn from_config(config: &common::Config) -> Self {
        let dedup = config.dedup_enabled().then(|| {
            config
                .dedup
                .as_ref()
                .map(DedupConfig::from)
                .unwrap_or_default()
        });
        Self {
            fetch: FetchOptions {
                timeout: Duration::from_secs(config.fetch_timeout_seconds()),
                max_concurrency: config.max_concurrency(),
            },
            dedup,
        }
    }
}

#[derive(Debug)]
pub struct IngestionOutput {
    /// Canonical articles, newest scrape first
    pub articles: Vec<Article>,
    /// Cluster members folded into a canonical article
    pub suppressed: Vec<Article>,
    pub report: IngestionReport,
    pub dedup_fail_open: bool,
}

/// One full refresh. Fails only when every source fails.
pub async fn ingest_all(
    adapters: &[Arc<dyn SourceAdapter>],
    client: &Client,
    options: &PipelineOptions,
) -> Result<IngestionOutput, AggregateIngestionError> {
    let fetched = fetch_all(adapters, client, &options.fetch).await?;
    let articles = assign_ids(fetched.articles);

    let outcome = match &options.dedup {
        Some(config) => DedupEngine::new(config.clone()).deduplicate(articles),
        None => passthrough(articles),
    };

    info!(
        canonical = outcome.articles.len(),
        suppressed = outcome.suppressed.len(),
        degraded = fetched.report.is_degraded(),
        "refresh ready"
    );

    Ok(IngestionOutput {
        articles: outcome.articles,
        suppressed: outcome.suppressed,
        report: fetched.report,
        dedup_fail_open: outcome.fail_open,
    })
}

/// The current canonical article set shared between refreshes and readers.
///
/// At most one refresh runs at a time; an overlapping trigger is rejected rather than queued.
/// A failed refresh leaves the previous set in place.
pub struct ArticleStore {
    adapters: Vec<Arc<dyn SourceAdapter>>,
    client: Client,
    options: PipelineOptions,
    current: RwLock<Arc<Vec<Article>>>,
    refresh_guard: Mutex<()>,
}

impl ArticleStore {
    pub fn new(adapters: Vec<Arc<dyn SourceAdapter>>, client: Client, options: PipelineOptions) -> Self {
        Self {
            adapters,
            client,
            options,
            current: RwLock::new(Arc::new(Vec::new())),
            refresh_guard: Mutex::new(()),
        }
    }

    pub async fn snapshot(&self) -> Arc<Vec<Article>> {
        Arc::clone(&*self.current.read().await)
    }

    pub async fn find(&self, id: &str) -> Option<Article> {
        self.current.read().await.iter().find(|a| a.id == id).cloned()
    }

    pub async fn refresh(&self) -> Result<IngestionOutput, RefreshError> {
        let Ok(_guard) = self.refresh_guard.try_lock() else {
            warn!("refresh requested while another is running; rejected");
            return Err(RefreshError::InProgress);
        };

        let output = ingest_all(&self.adapters, &self.client, &self.options).await?;
        *self.current.write().await = Arc::new(output.articles.clone());
        Ok(output)
    }

    /// Copies summaries from `enriched` onto the matching articles of the current set.
    /// Returns how many articles were updated.
    pub async fn attach_summaries(&self, enriched: &[Article]) -> usize {
        let mut current = self.current.write().await;
        let mut articles: Vec<Article> = current.as_ref().clone();
        let mut updated = 0;
        for article in articles.iter_mut().filter(|a| a.ai_summary.is_none()) {
            if let Some(summary) = enriched
                .iter()
                .find(|e| e.id == article.id)
                .and_then(|e| e.ai_summary.clone())
            {
                article.ai_summary = Some(summary);
                updated += 1;
            }
        }
        *current = Arc::new(articles);
        updated
    }
}
