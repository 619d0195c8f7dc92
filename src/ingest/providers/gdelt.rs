// src/ingest/providers/gdelt.rs
use anyhow::{Context, Result};
use async_trait::async_trait;
use metrics::counter;
use reqwest::StatusCode;
use serde::Deserialize;
use std::time::Duration;
use tracing::warn;

use crate::config::FetchConfig;
use crate::ingest::clean_text;
use crate::ingest::types::{NewsFetcher, RawArticle};

#[derive(Debug, Deserialize)]
struct ArtList {
    #[serde(default)]
    articles: Vec<Item>,
}

#[derive(Debug, Deserialize)]
struct Item {
    title: Option<String>,
    url: Option<String>,
    seendate: Option<String>,
    domain: Option<String>,
}

/// GDELT DOC 2.0 `artlist` client with retry on rate limiting, bad status and
/// non-JSON bodies. Exhausted retries degrade to an empty result.
pub struct GdeltFetcher {
    client: reqwest::Client,
    base_url: String,
    max_retries: u32,
    wait: Duration,
}

impl GdeltFetcher {
    pub fn new(cfg: &FetchConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()
            .context("building gdelt http client")?;
        Ok(Self {
            client,
            base_url: cfg.gdelt_base_url.clone(),
            max_retries: cfg.max_retries,
            wait: Duration::from_secs(cfg.wait_seconds),
        })
    }

    fn to_articles(list: ArtList) -> Vec<RawArticle> {
        list.articles
            .into_iter()
            .map(|it| RawArticle {
                title: clean_text(it.title.as_deref().unwrap_or_default()),
                url: it.url.unwrap_or_default(),
                published_at: it.seendate,
                source: it.domain,
                ..Default::default()
            })
            .collect()
    }

    async fn backoff(&self) {
        if !self.wait.is_zero() {
            tokio::time::sleep(self.wait).await;
        }
    }
}

#[async_trait]
impl NewsFetcher for GdeltFetcher {
    async fn fetch_articles(&self, query: &str, max_records: u32) -> Result<Vec<RawArticle>> {
        let max = max_records.to_string();
        let params = [
            ("query", query),
            ("mode", "artlist"),
            ("format", "json"),
            ("maxrecords", max.as_str()),
            ("trans", "fulltext"),
        ];

        for attempt in 1..=self.max_retries {
            let resp = match self.client.get(&self.base_url).query(&params).send().await {
                Ok(r) => r,
                Err(e) => {
                    warn!(target: "ingest", attempt, error = %e, "gdelt request failed");
                    self.backoff().await;
                    continue;
                }
            };

            match resp.status() {
                StatusCode::OK => {}
                StatusCode::TOO_MANY_REQUESTS => {
                    warn!(target: "ingest", attempt, "gdelt rate limit hit, waiting");
                    self.backoff().await;
                    continue;
                }
                other => {
                    warn!(target: "ingest", attempt, status = %other, "gdelt returned error status");
                    self.backoff().await;
                    continue;
                }
            }

            let body = match resp.text().await {
                Ok(b) => b,
                Err(e) => {
                    warn!(target: "ingest", attempt, error = %e, "gdelt body read failed");
                    self.backoff().await;
                    continue;
                }
            };

            match serde_json::from_str::<ArtList>(&body) {
                Ok(list) => {
                    let out = Self::to_articles(list);
                    counter!("deals_articles_fetched_total").increment(out.len() as u64);
                    return Ok(out);
                }
                Err(_) => {
                    warn!(target: "ingest", attempt, "gdelt returned non-JSON response, retrying");
                    self.backoff().await;
                }
            }
        }

        warn!(target: "ingest", %query, "gdelt max retries exceeded, returning empty list");
        counter!("deals_provider_errors_total").increment(1);
        Ok(Vec::new())
    }

    fn name(&self) -> &'static str {
        "GDELT"
    }
}
