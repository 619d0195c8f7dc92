// src/classify/mod.rs
//! Article filtering before extraction: grouped keyword pre-filter and the
//! additive deal classifier.

pub mod classifier;
pub mod keywords;

pub use classifier::{ClassifiedArticle, DealClassifier};
pub use keywords::KeywordEngine;
