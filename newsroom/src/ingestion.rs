//! Fetches every configured source concurrently and merges the results.
//!
//! Each source runs in its own task under its own timeout; a bounded semaphore caps in-flight
//! fetches. Workers report over a channel to a single collector, so no collection is shared
//! between tasks.

use reqwest::Client;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, Semaphore};
use tracing::{error, info, warn};

use crate::error::{AggregateIngestionError, SourceFailure, SourceFetchError};
use crate::model::RawArticle;
use crate::scraping::SourceAdapter;

#[derive(Debug, Clone)]
pub struct FetchOptions {
    /// Per-source timeout
    pub timeout: Duration,
    /// Upper cap on concurrent fetches
    pub max_concurrency: usize,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            max_concurrency: 8,
        }
    }
}

/// Outcome of one source for a refresh.
#[derive(Debug, Clone)]
pub struct SourceOutcome {
    pub source: String,
    pub articles: usize,
    pub error: Option<String>,
    pub elapsed: Duration,
}

#[derive(Debug, Clone, Default)]
pub struct IngestionReport {
    pub outcomes: Vec<SourceOutcome>,
}

impl IngestionReport {
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.error.is_none()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }

    /// Some sources failed but the refresh still produced articles.
    pub fn is_degraded(&self) -> bool {
        self.failed() > 0 && self.succeeded() > 0
    }
}

#[derive(Debug)]
pub struct FetchResult {
    /// Merged articles, newest scrape first; ties keep source order
    pub articles: Vec<RawArticle>,
    pub report: IngestionReport,
}

struct WorkerReport {
    index: usize,
    result: Result<Vec<RawArticle>, SourceFetchError>,
    elapsed: Duration,
}

/// Runs all adapters and merges their output.
///
/// Individual source failures are logged and excluded. Only when every source fails is an
/// [`AggregateIngestionError`] returned.
pub async fn fetch_all(
    adapters: &[Arc<dyn SourceAdapter>],
    client: &Client,
    options: &FetchOptions,
) -> Result<FetchResult, AggregateIngestionError> {
    if adapters.is_empty() {
        error!("ingestion: no sources configured");
        return Err(AggregateIngestionError { failures: Vec::new() });
    }

    let workers = adapters.len().min(options.max_concurrency).max(1);
    let semaphore = Arc::new(Semaphore::new(workers));
    let (tx, mut rx) = mpsc::channel::<WorkerReport>(adapters.len());

    for (index, adapter) in adapters.iter().enumerate() {
        let adapter = Arc::clone(adapter);
        let client = client.clone();
        let semaphore = Arc::clone(&semaphore);
        let tx = tx.clone();
        let timeout = options.timeout;

        tokio::spawn(async move {
            let Ok(_permit) = semaphore.acquire_owned().await else {
                return;
            };
            let started = Instant::now();
            let result = match tokio::time::timeout(timeout, adapter.fetch_and_parse(&client)).await {
                Ok(result) => result,
                Err(_) => Err(SourceFetchError::Timeout {
                    source_name: adapter.name().to_string(),
                    seconds: timeout.as_secs(),
                }),
            };
            let _ = tx
                .send(WorkerReport {
                    index,
                    result,
                    elapsed: started.elapsed(),
                })
                .await;
        });
    }
    drop(tx);

    let mut slots: Vec<Option<WorkerReport>> = (0..adapters.len()).map(|_| None).collect();
    while let Some(report) = rx.recv().await {
        let index = report.index;
        slots[index] = Some(report);
    }

    let mut merged = Vec::new();
    let mut failures = Vec::new();
    let mut report = IngestionReport::default();

    for (adapter, slot) in adapters.iter().zip(slots) {
        let name = adapter.name().to_string();
        let (result, elapsed) = match slot {
            Some(r) => (r.result, r.elapsed),
            None => (
                Err(SourceFetchError::Worker {
                    source_name: name.clone(),
                    message: "worker exited without reporting".to_string(),
                }),
                Duration::ZERO,
            ),
        };
        let result = match result {
            Ok(articles) if articles.is_empty() => Err(SourceFetchError::Empty {
                source_name: name.clone(),
            }),
            other => other,
        };

        match result {
            Ok(articles) => {
                info!(
                    source = %name,
                    count = articles.len(),
                    elapsed_ms = elapsed.as_millis() as u64,
                    "source fetched"
                );
                report.outcomes.push(SourceOutcome {
                    source: name,
                    articles: articles.len(),
                    error: None,
                    elapsed,
                });
                merged.extend(articles);
            }
            Err(e) => {
                warn!(source = %name, error = %e, "source failed, excluding from refresh");
                report.outcomes.push(SourceOutcome {
                    source: name.clone(),
                    articles: 0,
                    error: Some(e.to_string()),
                    elapsed,
                });
                failures.push(SourceFailure {
                    source: name,
                    reason: e.to_string(),
                });
            }
        }
    }

    if report.succeeded() == 0 {
        let err = AggregateIngestionError { failures };
        error!(error = %err, "ingestion failed for every source");
        return Err(err);
    }

    // Stable: equal timestamps keep source order
    merged.sort_by(|a, b| b.scraped_at.cmp(&a.scraped_at));

    info!(
        articles = merged.len(),
        succeeded = report.succeeded(),
        failed = report.failed(),
        "ingestion complete"
    );
    Ok(FetchResult {
        articles: merged,
        report,
    })
}
