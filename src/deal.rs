// src/deal.rs
//! Deal records produced by the extraction chain.
//!
//! `ExtractedFields` is what survives the LLM output cleaner; `StructuredDeal`
//! adds the normalized numbers, the confidence score and the provenance fields
//! and is the unit handed to storage.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::confidence::calculate_confidence;
use crate::normalize::{normalize_deal_value, normalize_quantity};

/// The model returns deal values either as free text ("€140 million") or as a bare number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DealValue {
    Amount(f64),
    Text(String),
}

impl DealValue {
    /// Mirrors the "is this field populated" notion used by the scorer:
    /// blank text and a zero amount count as absent.
    pub fn is_present(&self) -> bool {
        match self {
            DealValue::Amount(n) => *n != 0.0,
            DealValue::Text(s) => !s.trim().is_empty(),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            DealValue::Text(s) => Some(s.as_str()),
            DealValue::Amount(_) => None,
        }
    }
}

impl fmt::Display for DealValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DealValue::Text(s) => f.write_str(s),
            DealValue::Amount(n) if n.fract() == 0.0 && n.abs() < 1e15 => {
                write!(f, "{}", *n as i64)
            }
            DealValue::Amount(n) => write!(f, "{n}"),
        }
    }
}

/// Fields parsed out of one LLM response, after repair rules.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractedFields {
    pub buyer: Option<String>,
    pub seller: Option<String>,
    pub product: Option<String>,
    pub quantity: Option<String>,
    pub deal_value: Option<DealValue>,
    pub currency: Option<String>,
    pub deal_date: Option<String>,
    /// One-line summary requested from the model; only read by the confidence scorer.
    pub summary: Option<String>,
}

/// A normalized, scored deal with provenance. Only constructible with a source URL
/// and an ingestion timestamp, so both are always set before persistence.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StructuredDeal {
    #[serde(flatten)]
    pub fields: ExtractedFields,
    pub deal_value_normalized: Option<u64>,
    pub quantity_normalized: Option<u64>,
    pub confidence: f64,
    source_url: String,
    ingestion_timestamp: DateTime<Utc>,
}

impl StructuredDeal {
    /// Normalize value/quantity, score confidence and attach provenance.
    pub fn assemble(
        fields: ExtractedFields,
        source_url: impl Into<String>,
        ingestion_timestamp: DateTime<Utc>,
    ) -> Self {
        let deal_value_normalized = normalize_deal_value(fields.deal_value.as_ref());
        let quantity_normalized = normalize_quantity(fields.quantity.as_deref());
        let confidence = calculate_confidence(&fields);
        Self {
            fields,
            deal_value_normalized,
            quantity_normalized,
            confidence,
            source_url: source_url.into(),
            ingestion_timestamp,
        }
    }

    pub fn source_url(&self) -> &str {
        &self.source_url
    }

    pub fn ingestion_timestamp(&self) -> DateTime<Utc> {
        self.ingestion_timestamp
    }

    pub fn ingestion_timestamp_iso(&self) -> String {
        self.ingestion_timestamp
            .to_rfc3339_opts(SecondsFormat::Secs, true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deal_value_deserializes_text_or_number() {
        let t: DealValue = serde_json::from_str(r#""€140 million""#).unwrap();
        assert_eq!(t, DealValue::Text("€140 million".into()));
        let n: DealValue = serde_json::from_str("140000000").unwrap();
        assert_eq!(n, DealValue::Amount(140_000_000.0));
    }

    #[test]
    fn amount_display_drops_trailing_fraction() {
        assert_eq!(DealValue::Amount(165_000_000.0).to_string(), "165000000");
        assert_eq!(DealValue::Amount(2.5).to_string(), "2.5");
    }

    #[test]
    fn assemble_fills_normalized_fields_and_provenance() {
        let fields = ExtractedFields {
            buyer: Some("Ministry of Defence".into()),
            seller: Some("Saab".into()),
            quantity: Some("12".into()),
            deal_value: Some(DealValue::Text("€140 million".into())),
            ..Default::default()
        };
        let ts = DateTime::parse_from_rfc3339("2024-05-01T10:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let deal = StructuredDeal::assemble(fields, "https://example.test/a", ts);
        assert_eq!(deal.deal_value_normalized, Some(140_000_000));
        assert_eq!(deal.quantity_normalized, Some(12));
        assert_eq!(deal.confidence, 0.9);
        assert_eq!(deal.source_url(), "https://example.test/a");
        assert_eq!(deal.ingestion_timestamp_iso(), "2024-05-01T10:00:00Z");
    }
}
