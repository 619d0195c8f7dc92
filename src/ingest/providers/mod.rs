// src/ingest/providers/mod.rs
pub mod gdelt;
pub mod gnews;

pub use gdelt::GdeltFetcher;
pub use gnews::GNewsFetcher;
