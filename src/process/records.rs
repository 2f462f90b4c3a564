// src/process/records.rs

use serde_json::{Map, Value};

use crate::error::PeriodError;

/// One JSON object from an OData `value` array, keys in API order.
pub type Record = Map<String, Value>;

/// Decode an OData envelope `{"value": [{...}, ...]}`.
///
/// A missing `value` key yields zero records; anything that is not an object
/// envelope holding an array of objects is malformed.
pub fn decode_json_records(bytes: &[u8]) -> Result<Vec<Record>, PeriodError> {
    let doc: Value = serde_json::from_slice(bytes)
        .map_err(|e| PeriodError::MalformedPayload(format!("invalid JSON: {}", e)))?;

    let Value::Object(mut envelope) = doc else {
        return Err(PeriodError::MalformedPayload(
            "expected a JSON object envelope".to_string(),
        ));
    };

    let items = match envelope.remove("value") {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::Array(items)) => items,
        Some(other) => {
            return Err(PeriodError::MalformedPayload(format!(
                "`value` is {}, expected an array",
                json_kind(&other)
            )))
        }
    };

    items
        .into_iter()
        .enumerate()
        .map(|(i, item)| match item {
            Value::Object(record) => Ok(record),
            other => Err(PeriodError::MalformedPayload(format!(
                "`value[{}]` is {}, expected an object",
                i,
                json_kind(&other)
            ))),
        })
        .collect()
}

/// Text written to a table cell for a JSON value.
pub fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        nested => nested.to_string(),
    }
}

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
