// src/storage/sqlite.rs
//! SQLite backend. `source_url` is `UNIQUE`; rows are inserted with
//! `INSERT OR IGNORE` inside a single transaction per batch.

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use tracing::warn;

use super::{DealRow, StorageWriter, WriteReport};
use crate::deal::StructuredDeal;

pub struct SqliteStorageWriter {
    pool: SqlitePool,
}

impl SqliteStorageWriter {
    /// Open (creating if needed) the database file and ensure the table exists.
    pub async fn open(path: &Path) -> Result<Self> {
        let opts = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(opts)
            .await
            .with_context(|| format!("opening sqlite database {}", path.display()))?;

        let store = Self { pool };
        store.run_migrations().await?;
        Ok(store)
    }

    async fn run_migrations(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS deals (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                buyer TEXT,
                seller TEXT,
                product TEXT,
                quantity TEXT,
                deal_value TEXT,
                currency TEXT,
                deal_date TEXT,
                source_url TEXT UNIQUE
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .context("creating deals table")?;
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn count(&self) -> Result<i64> {
        let n: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM deals")
            .fetch_one(&self.pool)
            .await
            .context("counting deals")?;
        Ok(n)
    }

    pub async fn load_rows(&self) -> Result<Vec<DealRow>> {
        let rows = sqlx::query_as::<_, DealRow>(
            r#"
            SELECT buyer, seller, product, quantity, deal_value, currency, deal_date, source_url
            FROM deals
            ORDER BY id
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .context("loading deals")?;
        Ok(rows)
    }
}

#[async_trait]
impl StorageWriter for SqliteStorageWriter {
    async fn save_structured_deals(&self, deals: &[StructuredDeal]) -> Result<WriteReport> {
        let mut tx = self.pool.begin().await.context("starting transaction")?;
        let mut report = WriteReport::default();

        for deal in deals {
            let row = DealRow::from(deal);
            let res = sqlx::query(
                r#"
                INSERT OR IGNORE INTO deals (
                    buyer, seller, product, quantity, deal_value, currency, deal_date, source_url
                )
                VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&row.buyer)
            .bind(&row.seller)
            .bind(&row.product)
            .bind(&row.quantity)
            .bind(&row.deal_value)
            .bind(&row.currency)
            .bind(&row.deal_date)
            .bind(&row.source_url)
            .execute(&mut *tx)
            .await;

            match res {
                Ok(done) if done.rows_affected() == 0 => report.skipped_duplicates += 1,
                Ok(_) => report.written += 1,
                Err(e) => {
                    warn!(target: "storage", url = %row.source_url, error = %e, "failed inserting deal");
                    report.failed += 1;
                }
            }
        }

        tx.commit().await.context("committing deals")?;
        Ok(report)
    }

    fn name(&self) -> &'static str {
        "sqlite"
    }
}
