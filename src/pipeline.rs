// src/pipeline.rs
//! Orchestration: fetch → keyword filter → classify → extract → normalize →
//! score → dedup → persist.
//!
//! Articles are processed sequentially. A failure in any per-article stage drops
//! that article only; writer failures are recorded in the report. Nothing here
//! aborts a run.

use chrono::{DateTime, Utc};
use metrics::{counter, gauge, histogram};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::classify::{ClassifiedArticle, DealClassifier, KeywordEngine};
use crate::config::PipelineConfig;
use crate::deal::StructuredDeal;
use crate::dedup::deduplicate;
use crate::extract::{clean_llm_output, JsonStrategy, LlmOracle};
use crate::ingest::types::{NewsFetcher, RawArticle};
use crate::ingest::MultiQueryFetcher;
use crate::metrics::ensure_metrics_described;
use crate::storage::{StorageWriter, WriteReport};

/// Why a single article produced no deal.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ArticleError {
    #[error("article has no content")]
    EmptyContent,
    #[error("llm oracle failed: {0}")]
    Oracle(String),
    #[error("llm output contained no usable JSON object")]
    Unparseable,
}

/// Result of one writer for the run's final batch.
#[derive(Debug)]
pub struct WriterOutcome {
    pub writer: &'static str,
    pub result: Result<WriteReport, String>,
}

#[derive(Debug, Default)]
pub struct PipelineReport {
    pub fetched: usize,
    pub after_keyword_filter: usize,
    pub classified: usize,
    pub skipped_empty: usize,
    pub oracle_failures: usize,
    pub parse_failures: usize,
    pub extracted: usize,
    pub deals: Vec<StructuredDeal>,
    pub writes: Vec<WriterOutcome>,
}

impl PipelineReport {
    pub fn dedup_removed(&self) -> usize {
        self.extracted.saturating_sub(self.deals.len())
    }
}

pub struct Pipeline {
    fetcher: Box<dyn NewsFetcher>,
    oracle: Box<dyn LlmOracle>,
    classifier: DealClassifier,
    keyword_engine: Option<KeywordEngine>,
    writers: Vec<Box<dyn StorageWriter>>,
    json_strategy: JsonStrategy,
    max_per_query: u32,
}

impl Pipeline {
    pub fn new(
        fetcher: Box<dyn NewsFetcher>,
        oracle: Box<dyn LlmOracle>,
        classifier: DealClassifier,
    ) -> Self {
        Self {
            fetcher,
            oracle,
            classifier,
            keyword_engine: None,
            writers: Vec::new(),
            json_strategy: JsonStrategy::default(),
            max_per_query: 5,
        }
    }

    /// Wire the classifier, keyword filter and extraction settings from config.
    pub fn from_config(
        cfg: &PipelineConfig,
        fetcher: Box<dyn NewsFetcher>,
        oracle: Box<dyn LlmOracle>,
    ) -> Self {
        let mut p = Self::new(fetcher, oracle, DealClassifier::from_config(&cfg.classifier))
            .with_json_strategy(cfg.llm.json_strategy)
            .with_max_per_query(cfg.fetch.max_per_query);
        if cfg.keyword_filter.enabled {
            p = p.with_keyword_filter(KeywordEngine::from_config(&cfg.keyword_filter));
        }
        p
    }

    pub fn with_keyword_filter(mut self, engine: KeywordEngine) -> Self {
        self.keyword_engine = Some(engine);
        self
    }

    pub fn with_writer(mut self, writer: Box<dyn StorageWriter>) -> Self {
        self.writers.push(writer);
        self
    }

    pub fn with_json_strategy(mut self, strategy: JsonStrategy) -> Self {
        self.json_strategy = strategy;
        self
    }

    pub fn with_max_per_query(mut self, n: u32) -> Self {
        self.max_per_query = n;
        self
    }

    pub fn writer_names(&self) -> Vec<&'static str> {
        self.writers.iter().map(|w| w.name()).collect()
    }

    /// Full run: multi-query fetch, then everything downstream.
    pub async fn run(&self, queries: &[String]) -> PipelineReport {
        ensure_metrics_described();
        let run_ts = Utc::now();

        let raw = MultiQueryFetcher::new(self.fetcher.as_ref())
            .fetch_from_queries(queries, self.max_per_query)
            .await;
        info!(target: "pipeline", fetched = raw.len(), provider = self.fetcher.name(), "raw fetched from multi-query");

        self.run_with_articles(raw, run_ts).await
    }

    /// Everything after fetch. `run_ts` is stamped on every deal of this run.
    pub async fn run_with_articles(
        &self,
        raw: Vec<RawArticle>,
        run_ts: DateTime<Utc>,
    ) -> PipelineReport {
        ensure_metrics_described();
        let mut report = PipelineReport {
            fetched: raw.len(),
            ..Default::default()
        };

        let filtered = match &self.keyword_engine {
            Some(engine) => engine.filter_articles(raw),
            None => raw,
        };
        report.after_keyword_filter = filtered.len();
        info!(target: "pipeline", kept = filtered.len(), "after keyword filter");

        let deal_articles = self.classifier.filter_deal_articles(filtered);
        report.classified = deal_articles.len();
        counter!("deals_articles_classified_total").increment(deal_articles.len() as u64);
        info!(target: "pipeline", confirmed = deal_articles.len(), threshold = self.classifier.threshold(), "confirmed deal articles");

        let mut structured = Vec::with_capacity(deal_articles.len());
        for article in &deal_articles {
            match self.process_article(article, run_ts).await {
                Ok(deal) => structured.push(deal),
                Err(ArticleError::EmptyContent) => report.skipped_empty += 1,
                Err(e @ ArticleError::Oracle(_)) => {
                    warn!(target: "pipeline", url = %article.article.url, error = %e, "article dropped");
                    counter!("deals_oracle_errors_total").increment(1);
                    report.oracle_failures += 1;
                }
                Err(e @ ArticleError::Unparseable) => {
                    warn!(target: "pipeline", url = %article.article.url, error = %e, "article dropped");
                    counter!("deals_parse_failures_total").increment(1);
                    report.parse_failures += 1;
                }
            }
        }
        report.extracted = structured.len();
        counter!("deals_extracted_total").increment(structured.len() as u64);

        report.deals = deduplicate(structured);
        counter!("deals_dedup_removed_total").increment(report.dedup_removed() as u64);
        info!(
            target: "pipeline",
            extracted = report.extracted,
            unique = report.deals.len(),
            "structured deals after deduplication"
        );

        report.writes = self.persist(&report.deals).await;

        gauge!("deals_pipeline_last_run_ts").set(run_ts.timestamp().max(0) as f64);
        report
    }

    /// One article through oracle → cleaner → normalizer → scorer.
    pub async fn process_article(
        &self,
        article: &ClassifiedArticle,
        run_ts: DateTime<Utc>,
    ) -> Result<StructuredDeal, ArticleError> {
        let text = article.article.content.as_str();
        if text.trim().is_empty() {
            debug!(target: "pipeline", url = %article.article.url, "skipping article without content");
            return Err(ArticleError::EmptyContent);
        }

        let t0 = std::time::Instant::now();
        let raw_output = self
            .oracle
            .complete(text)
            .await
            .map_err(|e| ArticleError::Oracle(format!("{e:#}")))?;
        histogram!("deals_oracle_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);

        let fields =
            clean_llm_output(&raw_output, self.json_strategy).ok_or(ArticleError::Unparseable)?;
        let deal = StructuredDeal::assemble(fields, article.article.url.clone(), run_ts);
        debug!(
            target: "pipeline",
            url = %deal.source_url(),
            confidence = deal.confidence,
            value = ?deal.deal_value_normalized,
            ingested_at = %deal.ingestion_timestamp_iso(),
            "deal extracted"
        );
        Ok(deal)
    }

    async fn persist(&self, deals: &[StructuredDeal]) -> Vec<WriterOutcome> {
        let mut outcomes = Vec::with_capacity(self.writers.len());
        for w in &self.writers {
            let result = match w.save_structured_deals(deals).await {
                Ok(r) => {
                    counter!("deals_persisted_total").increment(r.written as u64);
                    info!(
                        target: "storage",
                        writer = w.name(),
                        written = r.written,
                        skipped = r.skipped_duplicates,
                        failed = r.failed,
                        "stored deals"
                    );
                    Ok(r)
                }
                Err(e) => {
                    warn!(target: "storage", writer = w.name(), error = ?e, "storage write failed");
                    Err(format!("{e:#}"))
                }
            };
            outcomes.push(WriterOutcome {
                writer: w.name(),
                result,
            });
        }
        outcomes
    }
}
