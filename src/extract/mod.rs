// src/extract/mod.rs
//! Extraction stage: LLM oracle plus the output cleaner.

pub mod cleaner;
pub mod oracle;

pub use cleaner::{
    clean_llm_output, extract_json, extract_with, normalize_fields, scan_first_object,
    JsonObject, JsonStrategy,
};
pub use oracle::{build_prompt, CachingOracle, LlmOracle, OllamaOracle};
