// src/storage/csv.rs
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::collections::HashSet;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use tracing::warn;

use super::{DealRow, StorageWriter, WriteReport, FIELDNAMES};
use crate::deal::StructuredDeal;

/// Append-only CSV file with a fixed header.
pub struct CsvStorageWriter {
    path: PathBuf,
}

impl CsvStorageWriter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Source URLs already in the file. An unreadable file is logged and treated as empty.
    pub fn existing_urls(&self) -> HashSet<String> {
        let has_content = std::fs::metadata(&self.path)
            .map(|m| m.len() > 0)
            .unwrap_or(false);
        if !has_content {
            return HashSet::new();
        }
        match read_urls(&self.path) {
            Ok(urls) => urls,
            Err(e) => {
                warn!(target: "storage", path = %self.path.display(), error = ?e, "failed to read csv file");
                HashSet::new()
            }
        }
    }

    /// All rows currently stored.
    pub fn load_rows(&self) -> Result<Vec<DealRow>> {
        let mut rdr = csv::Reader::from_path(&self.path)
            .with_context(|| format!("opening {}", self.path.display()))?;
        let mut out = Vec::new();
        for row in rdr.deserialize() {
            out.push(row.context("decoding csv row")?);
        }
        Ok(out)
    }

    fn append(&self, deals: &[StructuredDeal]) -> Result<WriteReport> {
        let mut seen = self.existing_urls();
        let is_new = std::fs::metadata(&self.path)
            .map(|m| m.len() == 0)
            .unwrap_or(true);

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("opening {} for append", self.path.display()))?;
        let mut wtr = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);

        if is_new {
            wtr.write_record(FIELDNAMES).context("writing csv header")?;
        }

        let mut report = WriteReport::default();
        for deal in deals {
            let row = DealRow::from(deal);
            if !seen.insert(row.source_url.clone()) {
                report.skipped_duplicates += 1;
                continue;
            }
            match wtr.serialize(&row) {
                Ok(()) => report.written += 1,
                Err(e) => {
                    warn!(target: "storage", url = %row.source_url, error = %e, "failed writing csv row");
                    report.failed += 1;
                }
            }
        }
        wtr.flush().context("flushing csv writer")?;
        Ok(report)
    }
}

fn read_urls(path: &Path) -> Result<HashSet<String>> {
    let mut rdr = csv::Reader::from_path(path)?;
    let idx = rdr
        .headers()?
        .iter()
        .position(|h| h == "source_url")
        .context("csv header has no source_url column")?;
    let mut urls = HashSet::new();
    for rec in rdr.records() {
        if let Some(url) = rec?.get(idx) {
            urls.insert(url.to_string());
        }
    }
    Ok(urls)
}

#[async_trait]
impl StorageWriter for CsvStorageWriter {
    async fn save_structured_deals(&self, deals: &[StructuredDeal]) -> Result<WriteReport> {
        self.append(deals)
    }

    fn name(&self) -> &'static str {
        "csv"
    }
}
