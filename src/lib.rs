// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod bootstrap;
pub mod classify;
pub mod config;
pub mod confidence;
pub mod deal;
pub mod dedup;
pub mod extract;
pub mod ingest;
pub mod metrics;
pub mod normalize;
pub mod pipeline;
pub mod storage;

// ---- Re-exports for stable public API ----
pub use crate::classify::{ClassifiedArticle, DealClassifier, KeywordEngine};
pub use crate::config::PipelineConfig;
pub use crate::deal::{DealValue, ExtractedFields, StructuredDeal};
pub use crate::extract::LlmOracle;
pub use crate::ingest::types::{NewsFetcher, RawArticle};
pub use crate::pipeline::{ArticleError, Pipeline, PipelineReport};
pub use crate::storage::StorageWriter;
