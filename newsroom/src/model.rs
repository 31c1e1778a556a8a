use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Article as produced by a source adapter, before identity and clustering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawArticle {
    pub title: String,
    pub link: String,
    pub summary: String,
    pub source: String,
    pub category: String,
    /// Publication date as advertised by the source; often imprecise or missing
    pub published_at: String,
    /// Process clock at fetch time; the authoritative timestamp for ordering
    pub scraped_at: DateTime<Utc>,
}

/// Another member of an article's duplicate cluster, kept for disclosure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DuplicateRef {
    pub id: String,
    pub source: String,
    pub title: String,
    pub link: String,
    pub scraped_at: DateTime<Utc>,
}

/// Structured machine-generated summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiSummary {
    /// At most 30 words
    pub overview: String,
    /// Zero to four bullet points
    pub key_points: Vec<String>,
    pub generated_at: DateTime<Utc>,
}

/// The pipeline's canonical unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    pub id: String,
    pub title: String,
    pub link: String,
    pub summary: String,
    pub source: String,
    pub category: String,
    pub published_at: String,
    pub scraped_at: DateTime<Utc>,
    pub is_duplicate: bool,
    pub duplicate_count: usize,
    pub duplicates: Vec<DuplicateRef>,
    pub all_sources: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ai_summary: Option<AiSummary>,
}

impl Article {
    /// Wraps a raw article as a standalone (cluster of one) article.
    pub fn from_raw(raw: RawArticle, id: String) -> Self {
        Self {
            id,
            all_sources: vec![raw.source.clone()],
            title: raw.title,
            link: raw.link,
            summary: raw.summary,
            source: raw.source,
            category: raw.category,
            published_at: raw.published_at,
            scraped_at: raw.scraped_at,
            is_duplicate: false,
            duplicate_count: 0,
            duplicates: Vec::new(),
            ai_summary: None,
        }
    }

    pub fn as_duplicate_ref(&self) -> DuplicateRef {
        DuplicateRef {
            id: self.id.clone(),
            source: self.source.clone(),
            title: self.title.clone(),
            link: self.link.clone(),
            scraped_at: self.scraped_at,
        }
    }

    /// Drops any cluster information, leaving the article as its own cluster.
    pub fn reset_cluster(&mut self) {
        self.is_duplicate = false;
        self.duplicate_count = 0;
        self.duplicates.clear();
        self.all_sources = vec![self.source.clone()];
    }
}

const CATEGORY_TAGS: &[(&str, &str)] = &[
    ("news", "News"),
    ("tech", "Technology"),
    ("technology", "Technology"),
    ("security", "Security"),
    ("sec", "Security"),
    ("ai", "AI"),
    ("ml", "AI"),
    ("dev", "Development"),
    ("programming", "Development"),
    ("science", "Science"),
    ("business", "Business"),
    ("finance", "Business"),
    ("world", "World"),
];

/// Maps a short category tag to its canonical name.
pub fn canonical_category(tag: &str) -> Option<&'static str> {
    let tag = tag.trim().to_lowercase();
    CATEGORY_TAGS
        .iter()
        .find(|(short, canonical)| *short == tag || canonical.to_lowercase() == tag)
        .map(|(_, canonical)| *canonical)
}

/// Canonical name when the tag is known, the input verbatim otherwise.
pub fn resolve_category(tag: &str) -> String {
    canonical_category(tag)
        .map(str::to_string)
        .unwrap_or_else(|| tag.trim().to_string())
}
