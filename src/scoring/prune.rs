use serde_json::{Map, Value};

/// Recursively drop keys whose value is numerically zero, and mappings left
/// empty afterwards. Non-numeric falsy values (`false`, `""`, `[]`) are kept.
pub fn prune_zeros(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(prune_map(map)),
        other => other.clone(),
    }
}

fn prune_map(map: &Map<String, Value>) -> Map<String, Value> {
    let mut out = Map::new();
    for (key, value) in map {
        if is_zero(value) {
            continue;
        }
        let cleaned = prune_zeros(value);
        if matches!(&cleaned, Value::Object(inner) if inner.is_empty()) {
            continue;
        }
        out.insert(key.clone(), cleaned);
    }
    out
}

fn is_zero(value: &Value) -> bool {
    match value {
        Value::Number(n) => n.as_f64() == Some(0.0),
        _ => false,
    }
}
