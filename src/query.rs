//! Query string serialization.

use std::sync::Arc;

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde_json::{Map, Value};

/// Query parameters, in insertion order.
pub type Params = Map<String, Value>;

/// A custom serializer replacing the built-in `key=value` encoding.
pub type ParamsSerializer = Arc<dyn Fn(&Params) -> String + Send + Sync>;

// encodeURIComponent's reserved set, minus the characters query strings
// conventionally leave readable.
const QUERY: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')')
    .remove(b'@')
    .remove(b':')
    .remove(b'$')
    .remove(b',')
    .remove(b'[')
    .remove(b']');

/// Percent-encode a query key or value. Spaces become `+`.
pub fn encode(input: &str) -> String {
    utf8_percent_encode(input, QUERY)
        .to_string()
        .replace("%20", "+")
}

fn scalar(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(_) | Value::Number(_) => Some(value.to_string()),
        // nested documents travel as JSON text
        Value::Array(_) | Value::Object(_) => Some(value.to_string()),
    }
}

/// Serialize params as `key=value` pairs joined by `&`.
///
/// Null values are skipped, arrays repeat their key once per element, and
/// nested objects are sent as JSON text.
pub fn serialize(params: &Params) -> String {
    let mut pairs = Vec::new();
    for (key, value) in params {
        let values: Vec<&Value> = match value {
            Value::Array(items) => items.iter().collect(),
            other => vec![other],
        };
        for value in values {
            if let Some(value) = scalar(value) {
                pairs.push(format!("{}={}", encode(key), encode(&value)));
            }
        }
    }
    pairs.join("&")
}

/// Append `params` to `url`.
///
/// Existing query pairs are kept and new ones appended after them. The
/// fragment is stripped only when there is something to append; with no
/// serialized params `url` is returned untouched.
pub fn build_url(url: &str, params: Option<&Params>, serializer: Option<&ParamsSerializer>) -> String {
    let params = match params {
        Some(params) => params,
        None => return url.to_owned(),
    };

    let serialized = match serializer {
        Some(serializer) => serializer(params),
        None => serialize(params),
    };
    if serialized.is_empty() {
        return url.to_owned();
    }

    let base = match url.find('#') {
        Some(idx) => &url[..idx],
        None => url,
    };

    let sep = if base.ends_with('?') || base.ends_with('&') {
        ""
    } else if base.contains('?') {
        "&"
    } else {
        "?"
    };

    format!("{base}{sep}{serialized}")
}
