// Sends one summary request through the configured LLM provider and prints the parsed result.
// Usage: probe_llm [config.toml]

use std::path::PathBuf;

use chrono::Utc;
use common::Config;
use newsroom::enrichment::EnrichmentService;
use newsroom::model::{Article, RawArticle};

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

    let service = EnrichmentService::from_config(&config)?;
    if !service.is_available() {
        anyhow::bail!("No LLM provider configured: set [llm] adapter = \"remote\" and export the API key variable");
    }

    let remote = config.llm.as_ref().and_then(|llm| llm.remote.as_ref());
    println!("\n{}", "=".repeat(60));
    println!("Testing LLM Provider");
    println!(
        "Base URL: {}",
        remote.and_then(|r| r.api_url.as_deref()).unwrap_or("(unset)")
    );
    println!("Model: {}", remote.and_then(|r| r.model.as_deref()).unwrap_or("(default)"));
    println!("{}", "=".repeat(60));

    let article = Article::from_raw(
        RawArticle {
            title: "Rust 1.80 stabilizes LazyCell and LazyLock".to_string(),
            link: "https://blog.rust-lang.org/2024/07/25/Rust-1.80.0.html".to_string(),
            summary: "The Rust team released 1.80, stabilizing lazy initialization types in the \
                      standard library, exclusive ranges in patterns and new Cargo checks."
                .to_string(),
            source: "Rust Blog".to_string(),
            category: "Development".to_string(),
            published_at: String::new(),
            scraped_at: Utc::now(),
        },
        "probe".to_string(),
    );

    for attempt in 1..=2 {
        println!("\n[Request {}] Summarizing article...", attempt);
        match service.generate_summary(&article).await {
            Ok(result) => {
                println!("✓ Success! (cached: {})", result.cached);
                println!("  Overview: {}", result.summary.overview);
                for (i, point) in result.summary.key_points.iter().enumerate() {
                    println!("    {}. {}", i + 1, point);
                }
            }
            Err(e) => eprintln!("✗ Failed: {}", e),
        }
    }

    println!("\n{}", "=".repeat(60));
    println!("Cache: {:?}", service.cache_stats().await);
    println!("{}", "=".repeat(60));
    Ok(())
}
