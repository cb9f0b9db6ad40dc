use serde_json::{Map, Value};

use super::bars::InfoMap;

/// Yahoo wraps many numbers as `{"raw": 1.5, "fmt": "1.50"}`; keep the raw value.
pub fn unwrap_raw(value: &Value) -> Value {
    match value {
        Value::Object(map) if map.contains_key("raw") => map["raw"].clone(),
        Value::Object(map) if map.is_empty() => Value::Null,
        other => other.clone(),
    }
}

/// Flatten profile modules (`assetProfile`, `price`, ...) into a single mapping.
/// Later modules do not overwrite keys already present.
pub fn flatten_modules(result: &Map<String, Value>) -> InfoMap {
    let mut info = InfoMap::new();
    for module in result.values() {
        let Some(fields) = module.as_object() else {
            continue;
        };
        for (key, value) in fields {
            let value = unwrap_raw(value);
            if value.is_null() || info.contains_key(key) {
                continue;
            }
            info.insert(key.clone(), value);
        }
    }
    info
}

/// Accepts numbers and numeric strings.
pub fn json_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        Value::Object(map) => map.get("raw").and_then(json_f64),
        _ => None,
    }
}

pub fn json_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// First non-null value among `keys`.
pub fn first_of<'a>(object: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|key| object.get(*key))
        .find(|value| !value.is_null())
}

/// Pull a Yahoo `{"code": .., "description": ..}` error object out of any envelope.
pub fn error_description(root: &Value) -> Option<String> {
    let error = root
        .as_object()?
        .values()
        .find_map(|envelope| envelope.get("error").filter(|e| !e.is_null()))?;

    let code = error.get("code").and_then(json_string);
    let description = error.get("description").and_then(json_string);
    match (code, description) {
        (Some(code), Some(description)) => Some(format!("{code}: {description}")),
        (Some(code), None) => Some(code),
        (None, Some(description)) => Some(description),
        (None, None) => None,
    }
}
