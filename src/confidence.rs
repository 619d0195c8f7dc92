// src/confidence.rs
//! Heuristic confidence for an extracted deal.
//!
//! Base 0.3, plus boosts for the presence of strong real-world signals:
//! deal value and quantity (+0.2 each), buyer and seller (+0.1 each),
//! product (+0.05) and a decimal digit (any script) anywhere in the summary
//! (+0.05).
//! Clamped to 1.0 and rounded to two decimals.

use crate::deal::ExtractedFields;
use crate::normalize::is_decimal_digit;

const BASE: f64 = 0.3;
const W_VALUE: f64 = 0.2;
const W_QUANTITY: f64 = 0.2;
const W_BUYER: f64 = 0.1;
const W_SELLER: f64 = 0.1;
const W_PRODUCT: f64 = 0.05;
const W_SUMMARY_DIGIT: f64 = 0.05;

fn present(field: &Option<String>) -> bool {
    field.as_deref().is_some_and(|s| !s.trim().is_empty())
}

pub fn calculate_confidence(fields: &ExtractedFields) -> f64 {
    let mut score = BASE;

    if fields.deal_value.as_ref().is_some_and(|v| v.is_present()) {
        score += W_VALUE;
    }
    if present(&fields.quantity) {
        score += W_QUANTITY;
    }
    if present(&fields.buyer) {
        score += W_BUYER;
    }
    if present(&fields.seller) {
        score += W_SELLER;
    }
    if present(&fields.product) {
        score += W_PRODUCT;
    }
    if fields
        .summary
        .as_deref()
        .is_some_and(|s| s.chars().any(is_decimal_digit))
    {
        score += W_SUMMARY_DIGIT;
    }

    round2(score.min(1.0))
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deal::DealValue;

    fn full() -> ExtractedFields {
        ExtractedFields {
            buyer: Some("Indian Army".into()),
            seller: Some("Enord".into()),
            product: Some("VR drone simulators".into()),
            quantity: Some("700".into()),
            deal_value: Some(DealValue::Text("multi-crore".into())),
            currency: Some("INR".into()),
            deal_date: None,
            summary: Some("Enord to supply 700 simulators".into()),
        }
    }

    #[test]
    fn empty_record_gets_base_score() {
        assert_eq!(calculate_confidence(&ExtractedFields::default()), 0.3);
    }

    #[test]
    fn all_signals_clamp_to_one() {
        assert_eq!(calculate_confidence(&full()), 1.0);
    }

    #[test]
    fn individual_boosts() {
        let only_value = ExtractedFields {
            deal_value: Some(DealValue::Amount(5.0)),
            ..Default::default()
        };
        assert_eq!(calculate_confidence(&only_value), 0.5);

        let product_and_summary = ExtractedFields {
            product: Some("radar".into()),
            summary: Some("Order for 12 radars".into()),
            ..Default::default()
        };
        assert_eq!(calculate_confidence(&product_and_summary), 0.4);
    }

    #[test]
    fn summary_without_digits_adds_nothing() {
        let f = ExtractedFields {
            summary: Some("No numbers here".into()),
            ..Default::default()
        };
        assert_eq!(calculate_confidence(&f), 0.3);
    }

    #[test]
    fn devanagari_digits_in_summary_count() {
        let f = ExtractedFields {
            summary: Some("सेना ने ७०० ड्रोन खरीदे".into()),
            ..Default::default()
        };
        assert_eq!(calculate_confidence(&f), 0.35);
    }

    #[test]
    fn monotonic_as_fields_are_populated() {
        let target = full();
        let steps: [fn(&mut ExtractedFields, &ExtractedFields); 6] = [
            |f, t| f.product = t.product.clone(),
            |f, t| f.buyer = t.buyer.clone(),
            |f, t| f.seller = t.seller.clone(),
            |f, t| f.quantity = t.quantity.clone(),
            |f, t| f.deal_value = t.deal_value.clone(),
            |f, t| f.summary = t.summary.clone(),
        ];

        let mut f = ExtractedFields::default();
        let mut prev = calculate_confidence(&f);
        for step in steps {
            step(&mut f, &target);
            let next = calculate_confidence(&f);
            assert!(next >= prev, "{next} < {prev}");
            assert!((0.0..=1.0).contains(&next));
            prev = next;
        }
        assert_eq!(prev, 1.0);
    }
}
