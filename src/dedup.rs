// src/dedup.rs
//! Merge duplicate reports of the same deal coming from multiple sources.
//!
//! Two deals are the same when buyer, seller (lowercased, trimmed) and the
//! normalized deal value agree. A zero value counts as no value. Deals missing
//! all three share the signature `"||"` and collapse into the first one seen.

use std::collections::HashSet;

use crate::deal::StructuredDeal;

/// Derived dedup key. Never persisted.
pub fn deal_signature(deal: &StructuredDeal) -> String {
    let buyer = deal
        .fields
        .buyer
        .as_deref()
        .unwrap_or_default()
        .trim()
        .to_lowercase();
    let seller = deal
        .fields
        .seller
        .as_deref()
        .unwrap_or_default()
        .trim()
        .to_lowercase();
    let value = deal
        .deal_value_normalized
        .filter(|v| *v != 0)
        .map(|v| v.to_string())
        .unwrap_or_default();
    format!("{buyer}|{seller}|{value}")
}

/// Incremental form: remembers signatures across `insert` calls.
#[derive(Debug, Default)]
pub struct DealDeduplicator {
    seen: HashSet<String>,
}

impl DealDeduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if the deal's signature had not been seen yet.
    pub fn insert(&mut self, deal: &StructuredDeal) -> bool {
        self.seen.insert(deal_signature(deal))
    }
}

/// Keep the first deal per signature, preserving input order.
pub fn deduplicate(deals: Vec<StructuredDeal>) -> Vec<StructuredDeal> {
    let mut dedup = DealDeduplicator::new();
    deals.into_iter().filter(|d| dedup.insert(d)).collect()
}
