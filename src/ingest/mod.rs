// src/ingest/mod.rs
pub mod providers;
pub mod types;

use crate::ingest::types::{NewsFetcher, RawArticle};
use metrics::counter;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

static RE_TAGS: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)</?[^>]+>").expect("tag regex"));
static RE_WS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("whitespace regex"));

/// Clean provider text: decode HTML entities, strip tags, collapse whitespace.
pub fn clean_text(s: &str) -> String {
    let decoded = html_escape::decode_html_entities(s);
    let untagged = RE_TAGS.replace_all(&decoded, " ");
    RE_WS.replace_all(&untagged, " ").trim().to_string()
}

/// Runs several queries against one fetcher and merges the results,
/// dropping articles without a URL or with a URL already collected.
pub struct MultiQueryFetcher<'a> {
    fetcher: &'a dyn NewsFetcher,
}

impl<'a> MultiQueryFetcher<'a> {
    pub fn new(fetcher: &'a dyn NewsFetcher) -> Self {
        Self { fetcher }
    }

    /// A failing query is logged and contributes nothing; it never aborts the batch.
    pub async fn fetch_from_queries(
        &self,
        queries: &[String],
        max_per_query: u32,
    ) -> Vec<RawArticle> {
        let mut all = Vec::new();
        let mut seen_urls: HashSet<String> = HashSet::new();

        for query in queries {
            let articles = match self.fetcher.fetch_articles(query, max_per_query).await {
                Ok(v) => v,
                Err(e) => {
                    tracing::warn!(
                        target: "ingest",
                        error = ?e,
                        provider = self.fetcher.name(),
                        %query,
                        "provider error"
                    );
                    counter!("deals_provider_errors_total").increment(1);
                    continue;
                }
            };

            let mut kept = 0usize;
            for article in articles {
                if article.url.is_empty() || !seen_urls.insert(article.url.clone()) {
                    continue;
                }
                all.push(article);
                kept += 1;
            }
            tracing::debug!(target: "ingest", %query, kept, "query fetched");
        }

        all
    }
}
