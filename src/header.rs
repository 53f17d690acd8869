//! Header groups and their normalization.
//!
//! Headers are configured as [`RawHeaders`]: a `common` group, one group per
//! [`Method`], and ungrouped entries. Just before a request is resolved the
//! groups are flattened into a single [`Headers`] mapping for the request's
//! method, and the raw groups are never seen again.

use std::collections::HashMap;
use std::fmt;

use http::{HeaderName, HeaderValue, Method};
use log::{trace, warn};

use crate::body::Body;

/// The `Content-Type` header name, in the casing this crate writes it.
pub const CONTENT_TYPE: &str = "Content-Type";
/// The `Authorization` header name, in the casing this crate writes it.
pub const AUTHORIZATION: &str = "Authorization";
/// The `Accept` header name, in the casing this crate writes it.
pub const ACCEPT: &str = "Accept";

pub(crate) const JSON_CONTENT_TYPE: &str = "application/json;charset=utf-8";

/// A flat, ordered header mapping with case-insensitive names.
///
/// The first casing seen for a name is kept; later inserts under a
/// differently-cased name only replace the value.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: Vec<(String, String)>,
}

impl Headers {
    /// Create an empty mapping.
    pub fn new() -> Headers {
        Headers::default()
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|(n, _)| n.eq_ignore_ascii_case(name))
    }

    /// Get a value by name, ignoring case.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.position(name).map(|i| self.entries[i].1.as_str())
    }

    /// Returns true if a header with this name exists, ignoring case.
    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    /// Insert a header, returning the previous value if the name was present.
    pub fn insert<N, V>(&mut self, name: N, value: V) -> Option<String>
    where
        N: Into<String>,
        V: Into<String>,
    {
        let name = name.into();
        let value = value.into();
        match self.position(&name) {
            Some(i) => Some(std::mem::replace(&mut self.entries[i].1, value)),
            None => {
                self.entries.push((name, value));
                None
            }
        }
    }

    /// Remove a header by name, ignoring case.
    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.position(name).map(|i| self.entries.remove(i).1)
    }

    /// Insert every entry of `other`, overwriting on name collisions.
    pub fn extend(&mut self, other: &Headers) {
        for (name, value) in other.iter() {
            self.insert(name, value);
        }
    }

    /// Iterate over `(name, value)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// The number of distinct header names.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if there are no headers.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for Headers {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<N, V> FromIterator<(N, V)> for Headers
where
    N: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (N, V)>>(iter: I) -> Self {
        let mut headers = Headers::new();
        for (name, value) in iter {
            headers.insert(name, value);
        }
        headers
    }
}

/// Headers as they are configured: grouped by method, before flattening.
#[derive(Clone, Debug, Default)]
pub struct RawHeaders {
    common: Headers,
    methods: HashMap<Method, Headers>,
    ungrouped: Headers,
}

impl RawHeaders {
    /// Create an empty set of groups.
    pub fn new() -> RawHeaders {
        RawHeaders::default()
    }

    /// Headers sent with every method.
    pub fn common(&self) -> &Headers {
        &self.common
    }

    /// Get a mutable reference to the `common` group.
    pub fn common_mut(&mut self) -> &mut Headers {
        &mut self.common
    }

    /// Headers sent only with `method`, if any were configured.
    pub fn method(&self, method: &Method) -> Option<&Headers> {
        self.methods.get(method)
    }

    /// Get a mutable reference to the group for `method`, creating it if needed.
    pub fn method_mut(&mut self, method: Method) -> &mut Headers {
        self.methods.entry(method).or_default()
    }

    /// Headers set directly on a request, outside of any group.
    pub fn ungrouped(&self) -> &Headers {
        &self.ungrouped
    }

    /// Get a mutable reference to the ungrouped headers.
    pub fn ungrouped_mut(&mut self) -> &mut Headers {
        &mut self.ungrouped
    }

    /// Layer `other` over `self`, group by group.
    pub(crate) fn merge(&self, other: &RawHeaders) -> RawHeaders {
        let mut merged = self.clone();
        merged.common.extend(&other.common);
        for (method, group) in &other.methods {
            merged.method_mut(method.clone()).extend(group);
        }
        merged.ungrouped.extend(&other.ungrouped);
        merged
    }
}

/// Flatten header groups for `method`.
///
/// Precedence is `common`, then the method's group, then ungrouped entries.
/// Names keep the casing of the highest-priority group that first used
/// them, so `common` casing wins any collision.
pub fn flatten(raw: &RawHeaders, method: &Method) -> Headers {
    let mut flat = raw.common.clone();
    if let Some(group) = raw.methods.get(method) {
        flat.extend(group);
    }
    flat.extend(&raw.ungrouped);
    flat
}

/// Drop a `Content-Type` that must not be sent with this body.
///
/// A bodyless request never sends one, and a multipart form leaves it to the
/// transport so a boundary can be attached.
pub(crate) fn strip_content_type(headers: &mut Headers, data: Option<&Body>) {
    match data {
        None => {
            if headers.remove(CONTENT_TYPE).is_some() {
                trace!("dropping Content-Type for bodyless request");
            }
        }
        Some(Body::Form(_)) => {
            if headers.remove(CONTENT_TYPE).is_some() {
                trace!("dropping Content-Type for multipart form");
            }
        }
        Some(_) => (),
    }
}

/// Default a JSON `Content-Type` for JSON documents.
///
/// Only the ungrouped entries are consulted, so an inferred JSON type takes
/// precedence over per-method defaults such as urlencoded `POST`s.
pub(crate) fn infer_content_type(raw: &mut RawHeaders, data: Option<&Body>) {
    if let Some(Body::Json(value)) = data {
        if (value.is_object() || value.is_array()) && !raw.ungrouped.contains(CONTENT_TYPE) {
            raw.ungrouped.insert(CONTENT_TYPE, JSON_CONTENT_TYPE);
        }
    }
}

/// Keep only headers that can legally be sent on the wire.
pub(crate) fn sanitize(headers: Headers) -> Headers {
    headers
        .entries
        .into_iter()
        .filter(|(name, value)| {
            let ok = HeaderName::from_bytes(name.as_bytes()).is_ok()
                && HeaderValue::from_str(value).is_ok();
            if !ok {
                warn!("dropping invalid header {name:?}");
            }
            ok
        })
        .collect()
}

/// Parse a raw header block of `name: value` lines.
///
/// Lines without a name are skipped; repeated names keep the last value.
pub fn parse_headers(raw: &str) -> Headers {
    let mut headers = Headers::new();
    for line in raw.split("\r\n").flat_map(|l| l.split('\n')) {
        let (name, value) = match line.split_once(':') {
            Some((name, value)) => (name.trim(), value.trim()),
            None => (line.trim(), ""),
        };
        if name.is_empty() {
            continue;
        }
        headers.insert(name, value);
    }
    headers
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn method_group_overrides_common() {
        let mut raw = RawHeaders::new();
        raw.common_mut().insert("X", "1");
        raw.method_mut(Method::POST).insert("X", "2");

        let expected: Headers = [("X", "2")].into_iter().collect();
        assert_eq!(flatten(&raw, &Method::POST), expected);
    }

    #[test]
    fn other_method_groups_are_dropped() {
        let mut raw = RawHeaders::new();
        raw.common_mut().insert("Accept", "*/*");
        raw.method_mut(Method::POST).insert("X-Post", "yes");
        raw.method_mut(Method::GET).insert("X-Get", "yes");

        let flat = flatten(&raw, &Method::GET);
        assert_eq!(flat.get("x-get"), Some("yes"));
        assert!(!flat.contains("X-Post"));
        assert_eq!(flat.len(), 2);
    }

    #[test]
    fn ungrouped_overrides_everything_with_common_casing() {
        let mut raw = RawHeaders::new();
        raw.common_mut().insert("Content-Type", "text/plain");
        raw.method_mut(Method::PUT)
            .insert("CONTENT-TYPE", "application/x-www-form-urlencoded");
        raw.ungrouped_mut().insert("content-type", "application/json");

        let flat = flatten(&raw, &Method::PUT);
        let entries: Vec<_> = flat.iter().collect();
        assert_eq!(entries, vec![("Content-Type", "application/json")]);
    }

    #[test]
    fn casing_kept_as_given_without_collision() {
        let mut raw = RawHeaders::new();
        raw.method_mut(Method::GET).insert("x-Trace-id", "abc");

        let flat = flatten(&raw, &Method::GET);
        assert_eq!(flat.iter().next(), Some(("x-Trace-id", "abc")));
    }

    #[test]
    fn bodyless_request_has_no_content_type() {
        let mut headers: Headers = [("content-type", "application/json"), ("Accept", "*/*")]
            .into_iter()
            .collect();
        strip_content_type(&mut headers, None);
        assert!(!headers.contains(CONTENT_TYPE));
        assert!(headers.contains(ACCEPT));
    }

    #[test]
    fn form_body_drops_content_type() {
        let mut headers: Headers = [(CONTENT_TYPE, "multipart/form-data")].into_iter().collect();
        let form = Body::Form(crate::multipart::Form::new().text("a", "b"));
        strip_content_type(&mut headers, Some(&form));
        assert!(headers.is_empty());

        let mut headers: Headers = [(CONTENT_TYPE, "text/plain")].into_iter().collect();
        strip_content_type(&mut headers, Some(&Body::from("hi")));
        assert_eq!(headers.get(CONTENT_TYPE), Some("text/plain"));
    }

    #[test]
    fn json_objects_infer_content_type() {
        let mut raw = RawHeaders::new();
        raw.method_mut(Method::POST)
            .insert(CONTENT_TYPE, "application/x-www-form-urlencoded");
        let data = Body::Json(serde_json::json!({ "a": 1 }));
        infer_content_type(&mut raw, Some(&data));

        let flat = flatten(&raw, &Method::POST);
        assert_eq!(flat.get(CONTENT_TYPE), Some(JSON_CONTENT_TYPE));
    }

    #[test]
    fn json_inference_respects_explicit_type() {
        let mut raw = RawHeaders::new();
        raw.ungrouped_mut().insert("content-type", "application/vnd.api+json");
        let data = Body::Json(serde_json::json!([1, 2]));
        infer_content_type(&mut raw, Some(&data));
        assert_eq!(raw.ungrouped().get(CONTENT_TYPE), Some("application/vnd.api+json"));

        let mut raw = RawHeaders::new();
        infer_content_type(&mut raw, Some(&Body::Json(serde_json::json!("scalar"))));
        assert!(raw.ungrouped().is_empty());
    }

    #[test]
    fn sanitize_drops_invalid_entries() {
        let headers: Headers = [("Good", "yes"), ("Bad Name", "x"), ("X-Ctl", "a\nb")]
            .into_iter()
            .collect();
        let clean = sanitize(headers);
        assert_eq!(clean.len(), 1);
        assert_eq!(clean.get("good"), Some("yes"));
    }

    #[test]
    fn parse_raw_header_block() {
        let raw = "connection: keep-alive\r\n\
                   content-type: application/json; charset=utf-8\r\n\
                   date: Mon, 09 Sep 2024 06:14:30 GMT\r\n\
                   \r\n";
        let headers = parse_headers(raw);
        assert_eq!(headers.len(), 3);
        assert_eq!(headers.get("Content-Type"), Some("application/json; charset=utf-8"));
        assert_eq!(headers.get("date"), Some("Mon, 09 Sep 2024 06:14:30 GMT"));
    }

    #[test]
    fn merge_layers_group_by_group() {
        let mut base = RawHeaders::new();
        base.common_mut().insert("Accept", "*/*");
        base.method_mut(Method::POST).insert("X", "base");

        let mut over = RawHeaders::new();
        over.method_mut(Method::POST).insert("x", "over");
        over.ungrouped_mut().insert("Y", "1");

        let merged = base.merge(&over);
        assert_eq!(merged.common().get("accept"), Some("*/*"));
        assert_eq!(merged.method(&Method::POST).unwrap().get("X"), Some("over"));
        assert_eq!(merged.ungrouped().get("y"), Some("1"));
    }
}
