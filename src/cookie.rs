//! Cookie access for XSRF protection.
//!
//! The dispatcher never stores cookies. It only reads one, the XSRF token,
//! through a [`CookieStore`] configured on the client.

use std::collections::HashMap;
use std::fmt;
use std::sync::RwLock;

/// Read access to the cookies visible to the client.
pub trait CookieStore: Send + Sync {
    /// The value of the cookie called `name`, if set.
    fn read(&self, name: &str) -> Option<String>;
}

/// A simple in-memory cookie store.
///
/// Cookies are keyed by name alone. Domain and path attributes are
/// ignored, so the jar models the cookies visible to a single origin. A
/// later cookie with the same name replaces the earlier one, even when the
/// two came from different sites. Use a custom [`CookieStore`] when cookies
/// from several origins have to coexist.
#[derive(Default)]
pub struct Jar(RwLock<HashMap<String, String>>);

impl Jar {
    /// An empty jar.
    pub fn new() -> Jar {
        Jar::default()
    }

    /// Set a cookie.
    pub fn add(&self, name: impl Into<String>, value: impl Into<String>) {
        self.0
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(name.into(), value.into());
    }

    /// Add every cookie in a `Cookie`-header style string, such as
    /// `"a=1; XSRF-TOKEN=abc"`. Malformed pairs are skipped.
    #[cfg(feature = "cookies")]
    pub fn add_cookie_str(&self, cookies: &str) {
        for cookie in cookie_crate::Cookie::split_parse(cookies).flatten() {
            self.add(cookie.name(), cookie.value());
        }
    }
}

impl CookieStore for Jar {
    fn read(&self, name: &str) -> Option<String> {
        self.0
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(name)
            .cloned()
    }
}

impl fmt::Debug for Jar {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let len = self.0.read().map(|m| m.len()).unwrap_or_default();
        f.debug_struct("Jar").field("cookies", &len).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jar_reads_what_was_added() {
        let jar = Jar::new();
        assert_eq!(jar.read("XSRF-TOKEN"), None);
        jar.add("XSRF-TOKEN", "abc");
        jar.add("XSRF-TOKEN", "def");
        assert_eq!(jar.read("XSRF-TOKEN"), Some("def".into()));
    }

    #[cfg(feature = "cookies")]
    #[test]
    fn jar_parses_cookie_strings() {
        let jar = Jar::new();
        jar.add_cookie_str("a=1; XSRF-TOKEN=abc123; b=two");
        assert_eq!(jar.read("a"), Some("1".into()));
        assert_eq!(jar.read("XSRF-TOKEN"), Some("abc123".into()));
        assert_eq!(jar.read("b"), Some("two".into()));
    }
}
