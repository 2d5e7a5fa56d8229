use crate::domain::model::{LunchRecord, MenuItem};
use crate::utils::error::{MenuError, Result};
use serde_json::Value;

/// Maps a `200` body into menu items, keeping response order.
///
/// Malformed JSON or a top level other than an array is an error. Elements
/// that lack a `name` or `priceStudent` are skipped, so an `Ok` result may be
/// partial.
pub fn parse_menu(body: &[u8]) -> Result<Vec<MenuItem>> {
    let entries = match serde_json::from_slice::<Value>(body)? {
        Value::Array(entries) => entries,
        other => {
            return Err(MenuError::UnexpectedPayload {
                message: format!("expected a JSON array, got {}", json_kind(&other)),
            })
        }
    };

    let total = entries.len();
    let items: Vec<MenuItem> = entries
        .into_iter()
        .enumerate()
        .filter_map(|(index, entry)| match serde_json::from_value::<LunchRecord>(entry) {
            Ok(record) => Some(MenuItem::from_record(record)),
            Err(e) => {
                tracing::warn!("Skipping menu entry {}: {}", index, e);
                None
            }
        })
        .collect();

    if items.len() < total {
        tracing::warn!("Parsed {} of {} menu entries", items.len(), total);
    } else {
        tracing::debug!("Parsed {} menu entries", total);
    }

    Ok(items)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Demo menu shown when no API key is configured.
pub fn sample_menu() -> Vec<MenuItem> {
    let records = [
        (
            "Spaghetti Bolognese",
            "2.55 €",
            vec!["http://abload.de/img/spaghetti-bolognese-dfdp11.jpg"],
        ),
        ("Pizza Salami", "1.90 €", vec![]),
        (
            "Wiener Schnitzel",
            "3.39 €",
            vec!["http://abload.de/img/wiener-schnitzel02sjpx3.jpg"],
        ),
    ];

    records
        .into_iter()
        .map(|(name, price, images)| {
            MenuItem::from_record(LunchRecord {
                name: name.to_string(),
                additives: vec!["a".to_string(), "b".to_string(), "c".to_string()],
                price_student: price.to_string(),
                images: images.into_iter().map(str::to_string).collect(),
            })
        })
        .collect()
}
