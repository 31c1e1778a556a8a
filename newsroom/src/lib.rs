// Library interface for newsroom modules
// This allows tests and the binaries to import modules

pub mod model;
pub mod error;
pub mod identity;
pub mod scraping;
pub mod ingestion;
pub mod dedup;
pub mod search;
pub mod llm;
pub mod enrichment;
pub mod pipeline;

pub use error::{AggregateIngestionError, DeduplicationError, EnrichmentError, RefreshError, SourceFetchError};
pub use model::{AiSummary, Article, DuplicateRef, RawArticle};
pub use pipeline::{ingest_all, ArticleStore, IngestionOutput, PipelineOptions};
