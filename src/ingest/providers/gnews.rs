// src/ingest/providers/gnews.rs
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use metrics::{counter, histogram};
use serde::Deserialize;
use std::time::Duration;

use crate::config::FetchConfig;
use crate::ingest::clean_text;
use crate::ingest::types::{NewsFetcher, RawArticle};

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    articles: Vec<Item>,
}

#[derive(Debug, Deserialize)]
struct Item {
    title: Option<String>,
    description: Option<String>,
    content: Option<String>,
    url: Option<String>,
    #[serde(rename = "publishedAt")]
    published_at: Option<String>,
    source: Option<ItemSource>,
}

#[derive(Debug, Deserialize)]
struct ItemSource {
    name: Option<String>,
}

/// GNews search API client (full article content, keyed by API token).
pub struct GNewsFetcher {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    language: String,
}

impl GNewsFetcher {
    pub fn new(cfg: &FetchConfig, api_key: String) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()
            .context("building gnews http client")?;
        Ok(Self {
            client,
            base_url: cfg.gnews_base_url.clone(),
            api_key,
            language: cfg.language.clone(),
        })
    }

    pub(crate) fn parse_articles(body: &str) -> Result<Vec<RawArticle>> {
        let t0 = std::time::Instant::now();
        let resp: SearchResponse = serde_json::from_str(body).context("parsing gnews json")?;

        let out: Vec<RawArticle> = resp
            .articles
            .into_iter()
            .map(|it| RawArticle {
                title: clean_text(it.title.as_deref().unwrap_or_default()),
                description: clean_text(it.description.as_deref().unwrap_or_default()),
                content: it.content.unwrap_or_default(),
                url: it.url.unwrap_or_default(),
                published_at: it.published_at,
                source: it.source.and_then(|s| s.name),
            })
            .collect();

        let ms = t0.elapsed().as_secs_f64() * 1_000.0;
        histogram!("deals_fetch_parse_ms").record(ms);
        counter!("deals_articles_fetched_total").increment(out.len() as u64);
        Ok(out)
    }
}

#[async_trait]
impl NewsFetcher for GNewsFetcher {
    async fn fetch_articles(&self, query: &str, max_records: u32) -> Result<Vec<RawArticle>> {
        let max = max_records.to_string();
        let resp = self
            .client
            .get(&self.base_url)
            .query(&[
                ("q", query),
                ("lang", self.language.as_str()),
                ("max", max.as_str()),
                ("token", self.api_key.as_str()),
            ])
            .send()
            .await
            .context("gnews http get()")?;

        let status = resp.status();
        if !status.is_success() {
            bail!("gnews returned status {status}");
        }
        let body = resp.text().await.context("gnews http .text()")?;
        Self::parse_articles(&body)
    }

    fn name(&self) -> &'static str {
        "GNews"
    }
}
