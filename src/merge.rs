use serde_json::{Map, Value};

/// Deep-merge `over` on top of `base`.
///
/// Two objects merge key by key, recursing into keys present in both. Any
/// other pairing (arrays, scalars, an object against a non-object) takes
/// `over` as a whole.
pub fn deep_merge(base: &Value, over: &Value) -> Value {
    match (base, over) {
        (Value::Object(base), Value::Object(over)) => Value::Object(merge_maps(base, over)),
        (_, over) => over.clone(),
    }
}

pub(crate) fn merge_maps(base: &Map<String, Value>, over: &Map<String, Value>) -> Map<String, Value> {
    let mut merged = base.clone();
    for (key, value) in over {
        let next = match merged.get(key) {
            Some(existing) => deep_merge(existing, value),
            None => value.clone(),
        };
        merged.insert(key.clone(), next);
    }
    merged
}
