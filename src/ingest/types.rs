// src/ingest/types.rs
use anyhow::Result;
use serde::{Deserialize, Serialize};

/// One news article as returned by a search provider. Missing text fields are empty.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RawArticle {
    #[serde(default)]
    pub title: String,
    #[serde(default, alias = "seendescription")]
    pub description: String,
    /// Article body (GNews returns a truncated body here).
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub url: String,
    #[serde(default, alias = "publishedAt", alias = "seendate")]
    pub published_at: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
}

#[async_trait::async_trait]
pub trait NewsFetcher: Send + Sync {
    async fn fetch_articles(&self, query: &str, max_records: u32) -> Result<Vec<RawArticle>>;
    fn name(&self) -> &'static str;
}
