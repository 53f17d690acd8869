//! Same-origin checks.

use url::Url;

/// Decides whether a request url shares the client's origin.
pub trait OriginPolicy: Send + Sync {
    /// Returns true if `url` is same-origin.
    fn is_same_origin(&self, url: &str) -> bool;
}

/// Compares scheme, host and port against a base url.
///
/// Relative urls are resolved against the base first, so they are always
/// same-origin.
#[derive(Clone, Debug)]
pub struct SameOrigin {
    base: Url,
}

impl SameOrigin {
    /// A policy for pages served from `base`.
    pub fn new(base: Url) -> SameOrigin {
        SameOrigin { base }
    }

    /// Parse `base` and build a policy for it.
    pub fn parse(base: &str) -> crate::Result<SameOrigin> {
        Url::parse(base)
            .map(SameOrigin::new)
            .map_err(|e| crate::error::config(format!("invalid origin {base:?}")).with_source(e))
    }
}

impl OriginPolicy for SameOrigin {
    fn is_same_origin(&self, url: &str) -> bool {
        match self.base.join(url) {
            Ok(resolved) => resolved.origin() == self.base.origin(),
            Err(_) => false,
        }
    }
}
