// src/bootstrap.rs
//! Build a ready-to-run `Pipeline` from configuration.
//!
//! Anything that cannot be built from the config (missing API key, bad HTTP
//! client settings, unusable cache dir) is a configuration error. A storage
//! backend that fails to open only disables that writer.

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::config::{FetchProvider, PipelineConfig};
use crate::extract::{CachingOracle, LlmOracle, OllamaOracle};
use crate::ingest::providers::{GNewsFetcher, GdeltFetcher};
use crate::ingest::types::NewsFetcher;
use crate::pipeline::Pipeline;
use crate::storage::{CsvStorageWriter, SqliteStorageWriter, StorageWriter};

pub fn build_fetcher(cfg: &PipelineConfig) -> Result<Box<dyn NewsFetcher>> {
    Ok(match cfg.fetch.provider {
        FetchProvider::Gnews => {
            let key = cfg.resolve_api_key().context("gnews api key")?;
            Box::new(GNewsFetcher::new(&cfg.fetch, key)?)
        }
        FetchProvider::Gdelt => Box::new(GdeltFetcher::new(&cfg.fetch)?),
    })
}

pub fn build_oracle(cfg: &PipelineConfig) -> Result<Box<dyn LlmOracle>> {
    let ollama = OllamaOracle::new(&cfg.llm)?;
    Ok(match &cfg.llm.cache_dir {
        Some(dir) => Box::new(CachingOracle::new(ollama, dir.clone(), cfg.llm.daily_limit)?),
        None => Box::new(ollama),
    })
}

pub async fn build_writers(cfg: &PipelineConfig) -> Vec<Box<dyn StorageWriter>> {
    let mut writers: Vec<Box<dyn StorageWriter>> = Vec::new();
    if let Some(path) = &cfg.storage.csv_path {
        writers.push(Box::new(CsvStorageWriter::new(path.clone())));
    }
    if let Some(path) = &cfg.storage.sqlite_path {
        match SqliteStorageWriter::open(path).await {
            Ok(db) => writers.push(Box::new(db)),
            Err(e) => {
                warn!(target: "storage", path = %path.display(), error = ?e, "sqlite writer disabled")
            }
        }
    }
    writers
}

pub async fn build_pipeline(cfg: &PipelineConfig) -> Result<Pipeline> {
    let mut pipeline = Pipeline::from_config(cfg, build_fetcher(cfg)?, build_oracle(cfg)?);
    for w in build_writers(cfg).await {
        pipeline = pipeline.with_writer(w);
    }
    info!(
        target: "pipeline",
        provider = ?cfg.fetch.provider,
        writers = ?pipeline.writer_names(),
        "pipeline built"
    );
    Ok(pipeline)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ENV_GNEWS_API_KEY;

    fn cfg_in(dir: &std::path::Path) -> PipelineConfig {
        let mut cfg = PipelineConfig::default();
        cfg.storage.csv_path = Some(dir.join("deals.csv"));
        cfg.storage.sqlite_path = Some(dir.join("deals.db"));
        cfg
    }

    #[serial_test::serial]
    #[tokio::test]
    async fn missing_gnews_key_is_a_config_error() {
        std::env::remove_var(ENV_GNEWS_API_KEY);
        let dir = tempfile::tempdir().unwrap();
        let err = build_pipeline(&cfg_in(dir.path())).await.err().unwrap();
        assert!(format!("{err:#}").contains(ENV_GNEWS_API_KEY));

        std::env::set_var(ENV_GNEWS_API_KEY, "k");
        let p = build_pipeline(&cfg_in(dir.path())).await.unwrap();
        std::env::remove_var(ENV_GNEWS_API_KEY);
        assert_eq!(p.writer_names(), vec!["csv", "sqlite"]);
    }

    #[tokio::test]
    async fn gdelt_needs_no_key_and_bad_sqlite_only_drops_that_writer() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = cfg_in(dir.path());
        cfg.fetch.provider = FetchProvider::Gdelt;
        cfg.storage.sqlite_path = Some(dir.path().join("missing-dir").join("deals.db"));

        let p = build_pipeline(&cfg).await.unwrap();
        assert_eq!(p.writer_names(), vec!["csv"]);
    }

    #[tokio::test]
    async fn unusable_cache_dir_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, "x").unwrap();

        let mut cfg = cfg_in(dir.path());
        cfg.llm.cache_dir = Some(blocker.join("cache"));
        assert!(build_oracle(&cfg).is_err());
    }
}
