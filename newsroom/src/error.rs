use thiserror::Error;

/// A single source could not be fetched or parsed. Recovered by the orchestrator.
#[derive(Error, Debug)]
pub enum SourceFetchError {
    #[error("{source_name}: HTTP error: {error}")]
    Http {
        source_name: String,
        #[source]
        error: reqwest::Error,
    },

    #[error("{source_name}: unexpected status {status}")]
    Status { source_name: String, status: u16 },

    #[error("{source_name}: timed out after {seconds}s")]
    Timeout { source_name: String, seconds: u64 },

    #[error("{source_name}: failed to parse page: {message}")]
    Parse { source_name: String, message: String },

    #[error("{source_name}: page contained no articles")]
    Empty { source_name: String },

    #[error("{source_name}: worker aborted: {message}")]
    Worker { source_name: String, message: String },
}

impl SourceFetchError {
    pub fn source_name(&self) -> &str {
        match self {
            SourceFetchError::Http { source_name, .. }
            | SourceFetchError::Status { source_name, .. }
            | SourceFetchError::Timeout { source_name, .. }
            | SourceFetchError::Parse { source_name, .. }
            | SourceFetchError::Empty { source_name }
            | SourceFetchError::Worker { source_name, .. } => source_name,
        }
    }
}

/// Per-source failure recorded for an aggregate report.
#[derive(Debug, Clone)]
pub struct SourceFailure {
    pub source: String,
    pub reason: String,
}

/// Every source failed; the refresh cannot produce a result.
#[derive(Error, Debug)]
#[error(
    "no sources available: all {} source(s) failed; check network connectivity and source availability",
    .failures.len()
)]
pub struct AggregateIngestionError {
    pub failures: Vec<SourceFailure>,
}

/// Raised by a similarity strategy; the dedup engine fails open on it.
#[derive(Error, Debug)]
pub enum DeduplicationError {
    #[error("similarity score {score} for {left:?} / {right:?} is outside [0, 1]")]
    InvalidScore { left: String, right: String, score: f64 },

    #[error("similarity computation failed: {0}")]
    Similarity(String),
}

#[derive(Error, Debug)]
pub enum EnrichmentError {
    #[error("AI service unavailable: {0}")]
    Unavailable(String),

    #[error("summary generation failed for {title:?}: {error:#}")]
    Generation {
        title: String,
        #[source]
        error: anyhow::Error,
    },
}

#[derive(Error, Debug)]
pub enum RefreshError {
    #[error("a refresh is already in progress")]
    InProgress,

    #[error(transparent)]
    Ingestion(#[from] AggregateIngestionError),
}
