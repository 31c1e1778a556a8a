/*
newsroom - command line entry point.
Loads configuration, builds the source adapters and runs one of the pipeline commands.
*/

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use common::Config;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::select;
use tokio::sync::Notify;
use tokio::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use newsroom::enrichment::{BatchOptions, EnrichmentService};
use newsroom::error::RefreshError;
use newsroom::model::Article;
use newsroom::pipeline::{ArticleStore, PipelineOptions};
use newsroom::scraping::{build_adapters, build_client};
use newsroom::search::{QueryEngine, SearchHit, SearchMode, SearchOptions};

#[derive(Parser, Debug)]
#[command(name = "newsroom", about = "Multi-source news aggregation, deduplication and search")]
struct Args {
    /// Path to config.toml
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Override log level (info, debug, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Refresh all sources once and print the canonical article set
    Ingest {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Refresh, then filter articles with a query
    Search {
        query: String,
        /// keyword or semantic (defaults to search.default_mode)
        #[arg(long)]
        mode: Option<SearchMode>,
    },
    /// Refresh, then list articles related to the one with this id
    Similar {
        id: String,
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Refresh, then generate AI summaries
    Summarize {
        /// Enrich a prioritized batch instead of one article
        #[arg(long)]
        batch: bool,
        /// Article to summarize (defaults to the newest)
        #[arg(long)]
        id: Option<String>,
    },
    /// Refresh periodically until Ctrl-C
    Watch {
        #[arg(long, default_value_t = 900)]
        interval: u64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging
    let filter = EnvFilter::try_new(&args.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    let config = load_config(args.config).await?;

    let adapters = build_adapters(&config.sources).context("invalid source configuration")?;
    info!(sources = adapters.len(), "source adapters ready");

    let client = build_client(config.fetch_timeout_seconds(), config.user_agent())?;
    let store = Arc::new(ArticleStore::new(adapters, client, PipelineOptions::from_config(&config)));

    let search_cfg = config.search.clone().unwrap_or_default();
    let engine = QueryEngine::new(SearchOptions::from(&search_cfg));

    match args.command {
        Command::Ingest { json } => {
            let output = store.refresh().await?;
            if output.dedup_fail_open {
                warn!("duplicates were not merged in this run");
            }
            if json {
                println!("{}", serde_json::to_string_pretty(&output.articles)?);
            } else {
                print_articles(&output.articles);
                println!(
                    "\n{} articles ({} duplicates folded), {}/{} sources ok",
                    output.articles.len(),
                    output.suppressed.len(),
                    output.report.succeeded(),
                    output.report.outcomes.len()
                );
            }
        }
        Command::Search { query, mode } => {
            let mode = match mode {
                Some(m) => m,
                None => search_cfg
                    .default_mode
                    .as_deref()
                    .map(str::parse)
                    .transpose()
                    .map_err(anyhow::Error::msg)?
                    .unwrap_or_default(),
            };
            store.refresh().await?;
            let articles = store.snapshot().await;
            let hits = engine.apply_query(&query, &articles, mode);
            print_hits(&hits);
            println!("\n{} of {} articles match ({} mode)", hits.len(), articles.len(), mode);
        }
        Command::Similar { id, limit } => {
            store.refresh().await?;
            let articles = store.snapshot().await;
            let reference = articles
                .iter()
                .find(|a| a.id == id)
                .with_context(|| format!("no article with id {}", id))?;
            println!("Related to: {}\n", reference.title);
            print_hits(&engine.find_similar(reference, &articles, limit));
        }
        Command::Summarize { batch, id } => {
            let service = EnrichmentService::from_config(&config)?;
            store.refresh().await?;
            let articles = store.snapshot().await;

            if batch {
                let options = config.enrichment.as_ref().map(BatchOptions::from).unwrap_or_default();
                let enriched = service.generate_batch_summaries(articles.as_ref().clone(), &options).await;
                let updated = store.attach_summaries(&enriched).await;
                print_articles(enriched.iter().filter(|a| a.ai_summary.is_some()));
                println!("\n{} articles summarized", updated);
            } else {
                let article = match &id {
                    Some(id) => articles.iter().find(|a| &a.id == id),
                    None => articles.first(),
                }
                .context("no article to summarize")?;
                let result = service.generate_summary(article).await?;
                println!("{}\n\n{}", article.title, result.summary.overview);
                for point in &result.summary.key_points {
                    println!("  - {}", point);
                }
            }

            let stats = service.cache_stats().await;
            info!(size = stats.size, sample = ?stats.sample_keys, "summary cache");
        }
        Command::Watch { interval } => run_watch(store, Duration::from_secs(interval.max(1))).await?,
    }

    Ok(())
}

async fn load_config(explicit: Option<PathBuf>) -> Result<Config> {
    let default_path = PathBuf::from("config.default.toml");

    let override_path = if let Some(p) = explicit {
        if !p.exists() {
            error!(path = ?p, "specified config file not found");
            return Err(anyhow::anyhow!("Config file not found: {}", p.display()));
        }
        Some(p)
    } else {
        let p = PathBuf::from("config.toml");
        if p.exists() {
            Some(p)
        } else {
            None
        }
    };

    let config = Config::load_with_defaults(
        if default_path.exists() { Some(default_path.as_path()) } else { None },
        override_path.as_deref(),
    )
    .await
    .map_err(|e| {
        error!(%e, "failed to load configuration");
        e
    })?;
    info!(default_file = ?default_path, override_file = ?override_path, "configuration loaded");
    Ok(config)
}

/// Refresh loop. Runs until Ctrl-C; an in-flight refresh is allowed to finish.
async fn run_watch(store: Arc<ArticleStore>, interval: Duration) -> Result<()> {
    let shutdown_notify = Arc::new(Notify::new());

    let worker = {
        let store = Arc::clone(&store);
        let shutdown = Arc::clone(&shutdown_notify);
        tokio::spawn(async move {
            loop {
                match store.refresh().await {
                    Ok(output) => info!(
                        articles = output.articles.len(),
                        failed_sources = output.report.failed(),
                        "watch: refresh complete"
                    ),
                    Err(RefreshError::InProgress) => warn!("watch: previous refresh still running"),
                    Err(e) => error!(%e, "watch: refresh failed; keeping previous articles"),
                }

                select! {
                    _ = tokio::time::sleep(interval) => {}
                    _ = shutdown.notified() => {
                        info!("watch: shutdown requested, exiting loop");
                        break;
                    }
                }
            }
        })
    };

    tokio::signal::ctrl_c().await.context("failed to listen for ctrl-c")?;
    info!("ctrl-c received, stopping watch loop");
    shutdown_notify.notify_one();

    if let Err(join_err) = worker.await {
        error!(%join_err, "watch task panicked");
    }
    info!("Shutdown complete");
    Ok(())
}

fn print_articles<'a>(articles: impl IntoIterator<Item = &'a Article>) {
    for article in articles {
        let sources = if article.duplicate_count > 0 {
            format!(" [+{}: {}]", article.duplicate_count, article.all_sources.join(", "))
        } else {
            String::new()
        };
        println!(
            "{}  {:<12} {:<16} {}{}",
            article.id,
            article.category,
            article.source,
            article.title,
            sources
        );
        if let Some(summary) = &article.ai_summary {
            println!("                  > {}", summary.overview);
        }
    }
}

fn print_hits(hits: &[SearchHit]) {
    for hit in hits {
        let score = hit.score.map(|s| format!("{:>3}", s)).unwrap_or_else(|| "  -".to_string());
        println!("{}  {}  {}  {}", score, hit.article.id, hit.article.source, hit.article.title);
    }
}
