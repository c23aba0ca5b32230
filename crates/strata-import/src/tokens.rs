//! Design tokens to host variables.

use std::collections::{BTreeMap, HashMap};

use serde_json::Value;
use strata_style::parse_color;
use tracing::{debug, warn};

use crate::host::{VariableId, VariableStore, VariableValue};

pub const TOKEN_COLLECTION: &str = "Tokens";

/// Classifies one token value: parseable colors become COLOR, numbers and
/// `px` lengths FLOAT, any other scalar STRING. `{"value": ..}` and
/// `{"$value": ..}` wrappers are unwrapped; null, arrays and other objects
/// are not representable.
pub fn token_value(value: &Value) -> Option<VariableValue> {
    match value {
        Value::Number(n) => n.as_f64().map(VariableValue::Float),
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return None;
            }
            if let Some(color) = parse_color(trimmed) {
                return Some(VariableValue::Color(color));
            }
            let numeric = trimmed.strip_suffix("px").unwrap_or(trimmed).trim();
            match numeric.parse::<f64>() {
                Ok(n) if n.is_finite() => Some(VariableValue::Float(n)),
                _ => Some(VariableValue::String(trimmed.to_string())),
            }
        }
        Value::Bool(b) => Some(VariableValue::String(b.to_string())),
        Value::Object(map) => map.get("value").or_else(|| map.get("$value")).and_then(token_value),
        Value::Null | Value::Array(_) => None,
    }
}

/// Explicit tokens override implicit ones of the same name.
pub fn merge_tokens(
    explicit: &BTreeMap<String, Value>,
    implicit: &BTreeMap<String, Value>,
) -> BTreeMap<String, VariableValue> {
    let mut merged = BTreeMap::new();
    for (name, raw) in implicit.iter().chain(explicit.iter()) {
        match token_value(raw) {
            Some(value) => {
                merged.insert(name.clone(), value);
            }
            None => debug!(token = %name, "token value not representable, skipped"),
        }
    }
    merged
}

/// Creates a variable per token, skipping names already created this
/// session. Returns the number of new variables.
pub fn materialize_tokens<V: VariableStore>(
    store: &mut V,
    cache: &mut HashMap<String, VariableId>,
    explicit: &BTreeMap<String, Value>,
    implicit: &BTreeMap<String, Value>,
) -> usize {
    let mut created = 0;
    for (name, value) in merge_tokens(explicit, implicit) {
        if cache.contains_key(&name) {
            continue;
        }
        match store.create_variable(TOKEN_COLLECTION, &name, &value) {
            Ok(id) => {
                cache.insert(name, id);
                created += 1;
            }
            Err(err) => warn!(token = %name, error = %err, "variable creation failed"),
        }
    }
    created
}
