// src/extract/cleaner.rs
//! Recover a JSON object from free-form model output and repair common
//! extraction mistakes.
//!
//! Two recovery strategies exist:
//! - `BraceSpan`: parse everything between the first `{` and the last `}`.
//!   Breaks when the prose around the object contains braces, or when the model
//!   emits more than one object.
//! - `Scan`: try `BraceSpan` first, then walk every `{` and stream-parse from
//!   there, returning the first complete top-level object.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::debug;

use crate::deal::{DealValue, ExtractedFields};

/// Known model default for "date unknown".
const HALLUCINATED_DATE: &str = "2021-01-01";

static RE_DIGITS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+").expect("digits regex"));

pub type JsonObject = Map<String, Value>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JsonStrategy {
    #[default]
    BraceSpan,
    Scan,
}

/// First `{` to last `}`, inclusive. `None` when either is missing, out of order,
/// not valid JSON, or not an object.
pub fn extract_json(raw: &str) -> Option<JsonObject> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    if end < start {
        return None;
    }
    match serde_json::from_str::<Value>(&raw[start..=end]) {
        Ok(Value::Object(map)) => Some(map),
        Ok(_) => None,
        Err(e) => {
            debug!(target: "extract", error = %e, "json extraction failed");
            None
        }
    }
}

/// First syntactically valid top-level object anywhere in `raw`.
pub fn scan_first_object(raw: &str) -> Option<JsonObject> {
    for (idx, _) in raw.match_indices('{') {
        let mut stream = serde_json::Deserializer::from_str(&raw[idx..]).into_iter::<Value>();
        if let Some(Ok(Value::Object(map))) = stream.next() {
            return Some(map);
        }
    }
    None
}

pub fn extract_with(raw: &str, strategy: JsonStrategy) -> Option<JsonObject> {
    match strategy {
        JsonStrategy::BraceSpan => extract_json(raw),
        JsonStrategy::Scan => extract_json(raw).or_else(|| scan_first_object(raw)),
    }
}

/// Read a string-ish field. Numbers and booleans are stringified; blank strings,
/// nulls, arrays and objects count as absent.
fn text_field(obj: &JsonObject, key: &str) -> Option<String> {
    match obj.get(key)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn value_field(obj: &JsonObject, key: &str) -> Option<DealValue> {
    match obj.get(key)? {
        Value::Number(n) => n.as_f64().map(DealValue::Amount),
        Value::String(s) if !s.trim().is_empty() => Some(DealValue::Text(s.clone())),
        _ => None,
    }
}

/// Apply the repair rules, in order:
/// 1. swap buyer/seller when the buyer names an army
/// 2. currency words → ISO codes
/// 3. quantity → first digit run
/// 4. drop textual deal values without "crore"/"million"
/// 5. drop the hallucinated default date
pub fn normalize_fields(parsed: Option<JsonObject>) -> Option<ExtractedFields> {
    let obj = parsed?;

    let mut buyer = text_field(&obj, "buyer");
    let mut seller = text_field(&obj, "seller");
    let product = text_field(&obj, "product");
    let mut quantity = text_field(&obj, "quantity");
    let mut deal_value = value_field(&obj, "deal_value");
    let mut currency = text_field(&obj, "currency");
    let mut deal_date = text_field(&obj, "deal_date");
    let summary = text_field(&obj, "summary");

    // Models tend to put the military end-user in the buyer slot.
    if buyer
        .as_deref()
        .is_some_and(|b| b.to_lowercase().contains("army"))
    {
        std::mem::swap(&mut buyer, &mut seller);
    }

    if let Some(c) = currency.as_deref() {
        let lc = c.to_lowercase();
        if lc.contains("rupee") {
            currency = Some("INR".to_string());
        } else if lc.contains("dollar") {
            currency = Some("USD".to_string());
        }
    }

    if let Some(q) = quantity.take() {
        quantity = RE_DIGITS.find(&q).map(|m| m.as_str().to_string());
    }

    let implausible = deal_value
        .as_ref()
        .and_then(DealValue::as_text)
        .is_some_and(|text| {
            let lc = text.to_lowercase();
            !lc.contains("crore") && !lc.contains("million")
        });
    if implausible {
        deal_value = None;
    }

    if deal_date.as_deref() == Some(HALLUCINATED_DATE) {
        deal_date = None;
    }

    Some(ExtractedFields {
        buyer,
        seller,
        product,
        quantity,
        deal_value,
        currency,
        deal_date,
        summary,
    })
}

/// Raw model text → repaired fields, or `None` when no object can be recovered.
pub fn clean_llm_output(raw: &str, strategy: JsonStrategy) -> Option<ExtractedFields> {
    normalize_fields(extract_with(raw, strategy))
}
