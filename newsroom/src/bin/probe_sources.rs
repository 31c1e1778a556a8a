// Fetches every configured source once and reports what each adapter parsed.
// Usage: probe_sources [config.toml]

use std::path::PathBuf;

use common::Config;
use newsroom::ingestion::{fetch_all, FetchOptions};
use newsroom::scraping::{build_adapters, build_client};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let override_path = std::env::args().nth(1).map(PathBuf::from);
    let default_path = PathBuf::from("config.default.toml");
    let config = Config::load_with_defaults(
        if default_path.exists() { Some(default_path.as_path()) } else { None },
        override_path.as_deref(),
    )
    .await?;

    let adapters = build_adapters(&config.sources)?;
    let client = build_client(config.fetch_timeout_seconds(), config.user_agent())?;
    let options = FetchOptions {
        timeout: std::time::Duration::from_secs(config.fetch_timeout_seconds()),
        max_concurrency: config.max_concurrency(),
    };

    println!("\n{}", "=".repeat(60));
    println!("Probing {} sources", adapters.len());
    println!("{}", "=".repeat(60));

    match fetch_all(&adapters, &client, &options).await {
        Ok(result) => {
            for outcome in &result.report.outcomes {
                match &outcome.error {
                    None => println!(
                        "✓ {:<24} {:>4} articles in {} ms",
                        outcome.source,
                        outcome.articles,
                        outcome.elapsed.as_millis()
                    ),
                    Some(e) => println!("✗ {:<24} {}", outcome.source, e),
                }
            }

            println!("\n  First 5 articles:");
            for (i, article) in result.articles.iter().take(5).enumerate() {
                println!("    {}. [{}] {}", i + 1, article.source, article.title);
                println!("       URL: {}", article.link);
                println!("       Summary: {} chars", article.summary.len());
            }
        }
        Err(e) => {
            println!("✗ Failed: {}", e);
            for failure in &e.failures {
                println!("    {}: {}", failure.source, failure.reason);
            }
        }
    }

    Ok(())
}
