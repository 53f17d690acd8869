//! Request and response body transforms.

use std::sync::Arc;

use crate::body::Body;
use crate::header::Headers;

/// A pure body transform, given the finalized headers of its side.
pub type Transformer = Arc<dyn Fn(Option<Body>, &Headers) -> Option<Body> + Send + Sync>;

/// Wrap a closure as a [`Transformer`].
pub fn transformer<F>(f: F) -> Transformer
where
    F: Fn(Option<Body>, &Headers) -> Option<Body> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Run `data` through each transform in order.
pub fn apply(data: Option<Body>, headers: &Headers, fns: &[Transformer]) -> Option<Body> {
    fns.iter().fold(data, |data, f| f(data, headers))
}

/// Serialize JSON documents to text. Other bodies pass through.
pub fn json_request() -> Transformer {
    transformer(|data, _headers| match data {
        Some(Body::Json(value)) => Some(Body::Text(value.to_string())),
        other => other,
    })
}

/// Parse text bodies that hold JSON. Anything else passes through.
pub fn json_response() -> Transformer {
    transformer(|data, _headers| match data {
        Some(Body::Text(text)) => match serde_json::from_str(&text) {
            Ok(value) => Some(Body::Json(value)),
            Err(_) => Some(Body::Text(text)),
        },
        other => other,
    })
}
