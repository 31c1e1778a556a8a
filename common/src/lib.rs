/*!
common/src/lib.rs

Shared configuration types for Newsroom.

This file provides:
- Config data structures (deserialized from TOML)
- An async loader that merges a default file with an optional override file
*/

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Politeness / fetching configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PolitenessConfig {
    pub fetch_timeout_seconds: Option<u64>,
    /// Upper cap of concurrent source fetches
    pub max_concurrency: Option<usize>,
    pub user_agent: Option<String>,
}

/// How a source page is turned into articles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// RSS or Atom feed
    Feed,
    /// HTML listing page scraped with CSS selectors
    Html,
}

/// One configured news source
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    pub name: String,
    /// Short tag ("tech") or canonical category name ("Technology")
    pub category: String,
    pub url: String,
    pub kind: SourceKind,
    pub item_selector: Option<String>,
    pub title_selector: Option<String>,
    pub link_selector: Option<String>,
    pub summary_selector: Option<String>,
    pub date_selector: Option<String>,
    pub enabled: Option<bool>,
}

impl SourceConfig {
    pub fn is_enabled(&self) -> bool {
        self.enabled.unwrap_or(true)
    }
}

/// Duplicate clustering knobs
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DedupConfig {
    pub enabled: Option<bool>,
    pub title_similarity_threshold: Option<f64>,
    pub time_proximity_hours: Option<i64>,
}

/// Search defaults
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchConfig {
    /// "keyword" or "semantic"
    pub default_mode: Option<String>,
    pub semantic_min_score: Option<u32>,
    pub similar_min_score: Option<u32>,
    pub similar_limit: Option<usize>,
}

/// Batch summary generation limits
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EnrichmentConfig {
    pub max_articles: Option<usize>,
    /// Minimum duplicate count for an article to be considered trending
    pub min_duplicate_count: Option<usize>,
    pub delay_ms: Option<u64>,
}

/// Remote LLM config (used if `llm.adapter = "remote"`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteLlmConfig {
    pub api_url: Option<String>,
    pub api_key_env: Option<String>,
    pub model: Option<String>,
    pub timeout_seconds: Option<u64>,
    pub max_tokens: Option<usize>,
}

/// LLM top-level config
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    pub adapter: Option<String>, // "remote", "none"
    pub remote: Option<RemoteLlmConfig>,
}

/// Top-level application configuration (deserialized from config.toml)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub sources: Vec<SourceConfig>,
    pub politeness: Option<PolitenessConfig>,
    pub dedup: Option<DedupConfig>,
    pub search: Option<SearchConfig>,
    pub enrichment: Option<EnrichmentConfig>,
    pub llm: Option<LlmConfig>,
}

impl Config {
    /// Load configuration from a TOML file asynchronously.
    ///
    /// Example:
    ///   let cfg = Config::from_file("config.toml").await?;
    pub async fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let data = tokio::fs::read_to_string(path.as_ref())
            .await
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;
        let cfg: Config = toml::from_str(&data).context("Failed to parse TOML configuration")?;
        Ok(cfg)
    }

    /// Load configuration with an optional default file and an optional override file.
    /// If both are present, they are merged (override takes precedence).
    pub async fn load_with_defaults(default_path: Option<&Path>, override_path: Option<&Path>) -> Result<Self> {
        let mut config_value = toml::Value::Table(toml::map::Map::new());

        for (path, label) in [(default_path, "default"), (override_path, "override")] {
            let Some(path) = path else { continue };
            if !path.exists() {
                continue;
            }
            let data = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read {} config: {}", label, path.display()))?;
            let val: toml::Value = toml::from_str(&data)
                .with_context(|| format!("Failed to parse {} configuration", label))?;
            merge_toml(&mut config_value, val);
        }

        let cfg: Config = config_value.try_into().context("Failed to parse merged configuration")?;
        Ok(cfg)
    }

    pub fn fetch_timeout_seconds(&self) -> u64 {
        self.politeness
            .as_ref()
            .and_then(|p| p.fetch_timeout_seconds)
            .unwrap_or(10)
    }

    pub fn max_concurrency(&self) -> usize {
        self.politeness
            .as_ref()
            .and_then(|p| p.max_concurrency)
            .unwrap_or(8)
            .max(1)
    }

    pub fn user_agent(&self) -> Option<&str> {
        self.politeness.as_ref().and_then(|p| p.user_agent.as_deref())
    }

    pub fn dedup_enabled(&self) -> bool {
        self.dedup.as_ref().and_then(|d| d.enabled).unwrap_or(true)
    }
}

fn merge_toml(a: &mut toml::Value, b: toml::Value) {
    match (a, b) {
        (toml::Value::Table(a_map), toml::Value::Table(b_map)) => {
            for (k, v) in b_map {
                if let Some(a_val) = a_map.get_mut(&k) {
                    merge_toml(a_val, v);
                } else {
                    a_map.insert(k, v);
                }
            }
        }
        (a_val, b_val) => *a_val = b_val,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const BASE: &str = r#"
        [politeness]
        fetch_timeout_seconds = 10
        max_concurrency = 4

        [[sources]]
        name = "Hacker News"
        category = "news"
        url = "https://hnrss.org/frontpage"
        kind = "feed"

        [dedup]
        title_similarity_threshold = 0.75
        time_proximity_hours = 6

        [llm]
        adapter = "remote"

        [llm.remote]
        api_key_env = "OPENAI_API_KEY"
        model = "gpt-4o-mini"
    "#;

    #[test]
    fn config_from_string() {
        let cfg: Config = toml::from_str(BASE).expect("parse config");
        assert_eq!(cfg.sources.len(), 1);
        assert_eq!(cfg.sources[0].kind, SourceKind::Feed);
        assert!(cfg.sources[0].is_enabled());
        assert_eq!(cfg.fetch_timeout_seconds(), 10);
        assert_eq!(cfg.max_concurrency(), 4);
        assert!(cfg.dedup_enabled());
        assert!(cfg.search.is_none());
    }

    #[test]
    fn missing_sections_use_defaults() {
        let cfg: Config = toml::from_str("").expect("parse empty config");
        assert!(cfg.sources.is_empty());
        assert_eq!(cfg.fetch_timeout_seconds(), 10);
        assert_eq!(cfg.max_concurrency(), 8);
        assert_eq!(cfg.user_agent(), None);
    }

    #[tokio::test]
    async fn override_file_wins_over_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let default_path = dir.path().join("config.default.toml");
        let override_path = dir.path().join("config.toml");
        fs::write(&default_path, BASE).expect("write default");
        fs::write(
            &override_path,
            r#"
            [dedup]
            enabled = false

            [llm.remote]
            model = "llama3"
            "#,
        )
        .expect("write override");

        let cfg = Config::load_with_defaults(Some(&default_path), Some(&override_path))
            .await
            .expect("load config");

        assert!(!cfg.dedup_enabled());
        // Tables merge key-wise, so untouched keys survive
        let dedup = cfg.dedup.expect("dedup section");
        assert_eq!(dedup.time_proximity_hours, Some(6));
        let remote = cfg.llm.and_then(|l| l.remote).expect("remote section");
        assert_eq!(remote.model.as_deref(), Some("llama3"));
        assert_eq!(remote.api_key_env.as_deref(), Some("OPENAI_API_KEY"));
        assert_eq!(cfg.sources.len(), 1);
    }

    #[tokio::test]
    async fn absent_files_are_skipped() {
        let dir = tempfile::tempdir().expect("tempdir");
        let missing = dir.path().join("nope.toml");
        let cfg = Config::load_with_defaults(Some(&missing), None)
            .await
            .expect("load config");
        assert!(cfg.sources.is_empty());
    }
}
