// src/storage/mod.rs
//! Persistence backends. Both share the same eight-column row and treat
//! `source_url` as the natural key: a URL already stored is skipped.

pub mod csv;
pub mod sqlite;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::deal::StructuredDeal;

pub use self::csv::CsvStorageWriter;
pub use self::sqlite::SqliteStorageWriter;

/// Column order shared by the CSV header and the SQLite table.
pub const FIELDNAMES: [&str; 8] = [
    "buyer",
    "seller",
    "product",
    "quantity",
    "deal_value",
    "currency",
    "deal_date",
    "source_url",
];

/// The persisted projection of a `StructuredDeal`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct DealRow {
    pub buyer: Option<String>,
    pub seller: Option<String>,
    pub product: Option<String>,
    pub quantity: Option<String>,
    pub deal_value: Option<String>,
    pub currency: Option<String>,
    pub deal_date: Option<String>,
    pub source_url: String,
}

impl From<&StructuredDeal> for DealRow {
    fn from(d: &StructuredDeal) -> Self {
        let f = &d.fields;
        Self {
            buyer: f.buyer.clone(),
            seller: f.seller.clone(),
            product: f.product.clone(),
            quantity: f.quantity.clone(),
            deal_value: f.deal_value.as_ref().map(|v| v.to_string()),
            currency: f.currency.clone(),
            deal_date: f.deal_date.clone(),
            source_url: d.source_url().to_string(),
        }
    }
}

/// Outcome of one batch write.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct WriteReport {
    pub written: usize,
    pub skipped_duplicates: usize,
    pub failed: usize,
}

#[async_trait::async_trait]
pub trait StorageWriter: Send + Sync {
    /// Persist a batch. Per-row failures are counted in the report; an `Err` means
    /// the whole batch could not be written.
    async fn save_structured_deals(&self, deals: &[StructuredDeal]) -> Result<WriteReport>;
    fn name(&self) -> &'static str;
}
