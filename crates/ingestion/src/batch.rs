//! Decoding record batches handed over by collaborators.
//!
//! The top level must be an array; anything else is fatal. Individual
//! elements that fail to decode are skipped so one bad record never aborts
//! the batch.

use econ_core::{Error, Record, Result};
use serde_json::Value;
use tracing::warn;

/// Decode a JSON array of records.
pub fn parse_records(json: &str) -> Result<Vec<Record>> {
    let value: Value = serde_json::from_str(json)?;
    parse_records_value(value)
}

/// Decode an already-parsed JSON value holding an array of records.
pub fn parse_records_value(value: Value) -> Result<Vec<Record>> {
    let items = match value {
        Value::Array(items) => items,
        other => {
            return Err(Error::invalid_input(format!(
                "expected an array of records, found {}",
                json_kind(&other)
            )))
        }
    };

    let mut records = Vec::with_capacity(items.len());
    for (index, item) in items.into_iter().enumerate() {
        match serde_json::from_value::<Record>(item) {
            Ok(record) => records.push(record),
            Err(e) => warn!(index, error = %e, "skipping malformed record"),
        }
    }

    Ok(records)
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_batch() {
        let json = r#"[
            {"id": "a", "name": "GDP", "value": 100.0, "explicitCurrency": "USD"},
            {"id": "b", "name": "GDP", "value": 2.5e3, "unit": "EUR Million"}
        ]"#;

        let records = parse_records(json).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].explicit_currency.as_deref(), Some("USD"));
        assert_eq!(records[1].unit.as_deref(), Some("EUR Million"));
    }

    #[test]
    fn test_non_array_is_fatal() {
        let err = parse_records(r#"{"id": "a", "value": 1}"#).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
        assert!(err.to_string().contains("an object"));

        let err = parse_records("not json").unwrap_err();
        assert!(matches!(err, Error::Json(_)));
    }

    #[test]
    fn test_malformed_records_skipped() {
        let json = r#"[
            {"id": "a", "value": 1.0},
            {"id": "b", "value": "one hundred"},
            {"value": 3.0},
            42,
            {"id": "e", "value": 5.0}
        ]"#;

        let records = parse_records(json).unwrap();
        let ids: Vec<&str> = records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "e"]);
        // A bad value is not a bad record.
        assert!(records[1].value.is_nan());
    }
}
