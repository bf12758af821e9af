//! Pulling record lists out of provider payload envelopes.

use serde_json::Value;

use super::CatalogError;

/// Walk `keys` through nested objects and return the array found there.
///
/// Every intermediate value must be an object; a missing final key reads as
/// an empty list, while a final value that is present but not an array is a
/// malformed payload.
///
/// # Errors
///
/// Returns [`CatalogError::MalformedPayload`] naming the offending key.
pub fn list_at(payload: &Value, keys: &[&str]) -> Result<Vec<Value>, CatalogError> {
    let Some((last, parents)) = keys.split_last() else {
        return as_list(payload, "<root>");
    };

    let mut cur = payload;
    let mut walked = String::new();
    for key in parents {
        if !walked.is_empty() {
            walked.push('.');
        }
        walked.push_str(key);
        cur = match cur.get(*key) {
            Some(v) if v.is_object() => v,
            Some(_) => {
                return Err(CatalogError::MalformedPayload(format!(
                    "'{walked}' is not an object"
                )))
            }
            None => {
                return Err(CatalogError::MalformedPayload(format!("'{walked}' is missing")))
            }
        };
    }

    if !cur.is_object() {
        return Err(CatalogError::MalformedPayload(
            "payload is not an object".into(),
        ));
    }
    match cur.get(*last) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(v) => as_list(v, last),
    }
}

fn as_list(v: &Value, name: &str) -> Result<Vec<Value>, CatalogError> {
    match v {
        Value::Array(items) => Ok(items.clone()),
        other => Err(CatalogError::MalformedPayload(format!(
            "expected list for '{name}', got {}",
            type_name(other)
        ))),
    }
}

fn type_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "object",
    }
}
