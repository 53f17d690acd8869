//! Layered request configuration.
//!
//! A request is described by three [`Config`] layers: the global defaults,
//! the client's instance config, and the per-call config. [`resolve`] merges
//! them, later layers winning, and produces the one [`RequestConfig`] the
//! dispatcher consumes.
//!
//! Merge rules:
//!
//! - scalar options (url, method, timeout, ...) take the latest layer that set them;
//! - lists (transforms) are replaced as a whole;
//! - params are deep-merged;
//! - headers are merged group by group, with case-insensitive names.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use http::Method;
use log::trace;
use serde_json::Value;

use crate::body::{Body, ResponseType};
use crate::cancel::CancelToken;
use crate::error;
use crate::header::{self, Headers, RawHeaders};
use crate::merge;
use crate::query::{self, Params, ParamsSerializer};
use crate::transform::{self, Transformer};
use crate::transport::{Progress, ProgressFn};

/// A success predicate over response status codes.
pub type ValidateStatus = Arc<dyn Fn(u16) -> bool + Send + Sync>;

/// Basic-auth credentials.
#[derive(Clone, PartialEq, Eq)]
pub struct Auth {
    username: String,
    password: String,
}

impl Auth {
    /// Credentials for `username` and `password`.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Auth {
        Auth {
            username: username.into(),
            password: password.into(),
        }
    }

    /// The username.
    pub fn username(&self) -> &str {
        &self.username
    }

    /// The password.
    pub fn password(&self) -> &str {
        &self.password
    }
}

impl fmt::Debug for Auth {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Auth")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// One layer of request configuration. Every field is optional.
#[derive(Clone, Default)]
pub struct Config {
    url: Option<String>,
    method: Option<Method>,
    headers: RawHeaders,
    params: Option<Params>,
    params_serializer: Option<ParamsSerializer>,
    data: Option<Body>,
    timeout: Option<Duration>,
    with_credentials: Option<bool>,
    xsrf_cookie_name: Option<String>,
    xsrf_header_name: Option<String>,
    auth: Option<Auth>,
    response_type: Option<ResponseType>,
    validate_status: Option<ValidateStatus>,
    transform_request: Option<Vec<Transformer>>,
    transform_response: Option<Vec<Transformer>>,
    cancel_token: Option<CancelToken>,
    on_upload_progress: Option<ProgressFn>,
    on_download_progress: Option<ProgressFn>,
}

impl Config {
    /// An empty layer.
    pub fn new() -> Config {
        Config::default()
    }

    /// The global defaults layer.
    ///
    /// - `Accept: application/json, text/plain, */*` for every method;
    /// - `Content-Type: application/x-www-form-urlencoded` for `POST`, `PUT` and `PATCH`;
    /// - no timeout;
    /// - XSRF cookie `XSRF-TOKEN` sent as `X-XSRF-TOKEN`;
    /// - JSON request and response transforms;
    /// - only `2xx` statuses count as success.
    pub fn defaults() -> Config {
        let mut headers = RawHeaders::new();
        headers
            .common_mut()
            .insert(header::ACCEPT, "application/json, text/plain, */*");
        for method in [Method::POST, Method::PUT, Method::PATCH] {
            headers
                .method_mut(method)
                .insert(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
        }

        Config {
            method: Some(Method::GET),
            headers,
            timeout: Some(Duration::ZERO),
            with_credentials: Some(false),
            xsrf_cookie_name: Some("XSRF-TOKEN".into()),
            xsrf_header_name: Some("X-XSRF-TOKEN".into()),
            response_type: Some(ResponseType::Text),
            validate_status: Some(Arc::new(|status| (200..300).contains(&status))),
            transform_request: Some(vec![transform::json_request()]),
            transform_response: Some(vec![transform::json_response()]),
            ..Config::default()
        }
    }

    /// Set the URL.
    pub fn url(mut self, url: impl Into<String>) -> Config {
        self.url = Some(url.into());
        self
    }

    /// Set the method.
    pub fn method(mut self, method: Method) -> Config {
        self.method = Some(method);
        self
    }

    /// Add an ungrouped header.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Config {
        self.headers.ungrouped_mut().insert(name, value);
        self
    }

    /// Add a header to the `common` group.
    pub fn common_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Config {
        self.headers.common_mut().insert(name, value);
        self
    }

    /// Add a header sent only with `method`.
    pub fn method_header(
        mut self,
        method: Method,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Config {
        self.headers.method_mut(method).insert(name, value);
        self
    }

    /// Get a mutable reference to the header groups.
    pub fn headers_mut(&mut self) -> &mut RawHeaders {
        &mut self.headers
    }

    /// Add a query parameter. Arrays repeat the key once per element.
    pub fn param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Config {
        self.params
            .get_or_insert_with(Params::new)
            .insert(key.into(), value.into());
        self
    }

    /// Merge a set of query parameters into this layer.
    pub fn params(mut self, params: Params) -> Config {
        self.params = Some(match self.params.take() {
            Some(existing) => merge::merge_maps(&existing, &params),
            None => params,
        });
        self
    }

    /// Replace the built-in query serialization.
    pub fn params_serializer<F>(mut self, serializer: F) -> Config
    where
        F: Fn(&Params) -> String + Send + Sync + 'static,
    {
        self.params_serializer = Some(Arc::new(serializer));
        self
    }

    /// Set the request body.
    pub fn data(mut self, data: impl Into<Body>) -> Config {
        self.data = Some(data.into());
        self
    }

    /// Set the timeout. A zero duration disables it.
    pub fn timeout(mut self, timeout: Duration) -> Config {
        self.timeout = Some(timeout);
        self
    }

    /// Send credentials on cross-site requests.
    pub fn with_credentials(mut self, enabled: bool) -> Config {
        self.with_credentials = Some(enabled);
        self
    }

    /// The cookie holding the XSRF token.
    pub fn xsrf_cookie_name(mut self, name: impl Into<String>) -> Config {
        self.xsrf_cookie_name = Some(name.into());
        self
    }

    /// The header the XSRF token is sent under.
    pub fn xsrf_header_name(mut self, name: impl Into<String>) -> Config {
        self.xsrf_header_name = Some(name.into());
        self
    }

    /// Enable HTTP basic authentication.
    pub fn basic_auth(mut self, username: impl Into<String>, password: impl Into<String>) -> Config {
        self.auth = Some(Auth::new(username, password));
        self
    }

    /// How the transport should return the response body.
    pub fn response_type(mut self, response_type: ResponseType) -> Config {
        self.response_type = Some(response_type);
        self
    }

    /// Decide which statuses count as success.
    pub fn validate_status<F>(mut self, predicate: F) -> Config
    where
        F: Fn(u16) -> bool + Send + Sync + 'static,
    {
        self.validate_status = Some(Arc::new(predicate));
        self
    }

    /// Replace the request transforms.
    pub fn transform_request(mut self, fns: Vec<Transformer>) -> Config {
        self.transform_request = Some(fns);
        self
    }

    /// Replace the response transforms.
    pub fn transform_response(mut self, fns: Vec<Transformer>) -> Config {
        self.transform_response = Some(fns);
        self
    }

    /// Attach a cancellation token.
    pub fn cancel_token(mut self, token: CancelToken) -> Config {
        self.cancel_token = Some(token);
        self
    }

    /// Observe upload progress.
    pub fn on_upload_progress<F>(mut self, f: F) -> Config
    where
        F: Fn(Progress) + Send + Sync + 'static,
    {
        self.on_upload_progress = Some(Arc::new(f));
        self
    }

    /// Observe download progress.
    pub fn on_download_progress<F>(mut self, f: F) -> Config
    where
        F: Fn(Progress) + Send + Sync + 'static,
    {
        self.on_download_progress = Some(Arc::new(f));
        self
    }

    /// Layer `other` on top of `self`.
    pub fn merge(&self, other: &Config) -> Config {
        let params = match (&self.params, &other.params) {
            (Some(base), Some(over)) => Some(merge::merge_maps(base, over)),
            (base, over) => over.clone().or_else(|| base.clone()),
        };

        Config {
            url: other.url.clone().or_else(|| self.url.clone()),
            method: other.method.clone().or_else(|| self.method.clone()),
            headers: self.headers.merge(&other.headers),
            params,
            params_serializer: pick(&self.params_serializer, &other.params_serializer),
            data: pick(&self.data, &other.data),
            timeout: other.timeout.or(self.timeout),
            with_credentials: other.with_credentials.or(self.with_credentials),
            xsrf_cookie_name: pick(&self.xsrf_cookie_name, &other.xsrf_cookie_name),
            xsrf_header_name: pick(&self.xsrf_header_name, &other.xsrf_header_name),
            auth: pick(&self.auth, &other.auth),
            response_type: other.response_type.or(self.response_type),
            validate_status: pick(&self.validate_status, &other.validate_status),
            transform_request: pick(&self.transform_request, &other.transform_request),
            transform_response: pick(&self.transform_response, &other.transform_response),
            cancel_token: pick(&self.cancel_token, &other.cancel_token),
            on_upload_progress: pick(&self.on_upload_progress, &other.on_upload_progress),
            on_download_progress: pick(&self.on_download_progress, &other.on_download_progress),
        }
    }
}

fn pick<T: Clone>(base: &Option<T>, over: &Option<T>) -> Option<T> {
    over.as_ref().or(base.as_ref()).cloned()
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Config")
            .field("url", &self.url)
            .field("method", &self.method)
            .field("headers", &self.headers)
            .field("params", &self.params)
            .field("data", &self.data)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// A fully resolved request, ready for the interceptors and the transport.
#[derive(Clone)]
pub struct RequestConfig {
    url: String,
    method: Method,
    headers: Headers,
    data: Option<Body>,
    timeout: Option<Duration>,
    with_credentials: bool,
    xsrf_cookie_name: Option<String>,
    xsrf_header_name: Option<String>,
    auth: Option<Auth>,
    response_type: ResponseType,
    validate_status: Option<ValidateStatus>,
    pub(crate) transform_request: Vec<Transformer>,
    pub(crate) transform_response: Vec<Transformer>,
    cancel_token: Option<CancelToken>,
    pub(crate) on_upload_progress: Option<ProgressFn>,
    pub(crate) on_download_progress: Option<ProgressFn>,
}

impl RequestConfig {
    /// Get the url, with params already applied.
    #[inline]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Get a mutable reference to the url.
    #[inline]
    pub fn url_mut(&mut self) -> &mut String {
        &mut self.url
    }

    /// Get the method.
    #[inline]
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Get a mutable reference to the method.
    #[inline]
    pub fn method_mut(&mut self) -> &mut Method {
        &mut self.method
    }

    /// Get the flattened headers.
    #[inline]
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Get a mutable reference to the headers.
    #[inline]
    pub fn headers_mut(&mut self) -> &mut Headers {
        &mut self.headers
    }

    /// Get the body.
    #[inline]
    pub fn data(&self) -> Option<&Body> {
        self.data.as_ref()
    }

    /// Get a mutable reference to the body.
    #[inline]
    pub fn data_mut(&mut self) -> &mut Option<Body> {
        &mut self.data
    }

    /// Get the timeout, if one is enabled.
    #[inline]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Get a mutable reference to the timeout.
    #[inline]
    pub fn timeout_mut(&mut self) -> &mut Option<Duration> {
        &mut self.timeout
    }

    /// Whether credentials are sent on cross-site requests.
    pub fn with_credentials(&self) -> bool {
        self.with_credentials
    }

    /// The cookie holding the XSRF token.
    pub fn xsrf_cookie_name(&self) -> Option<&str> {
        self.xsrf_cookie_name.as_deref()
    }

    /// The header the XSRF token is sent under.
    pub fn xsrf_header_name(&self) -> Option<&str> {
        self.xsrf_header_name.as_deref()
    }

    /// Basic-auth credentials, if configured.
    pub fn auth(&self) -> Option<&Auth> {
        self.auth.as_ref()
    }

    /// How the response body is returned.
    pub fn response_type(&self) -> ResponseType {
        self.response_type
    }

    /// The cancellation token, if any.
    pub fn cancel_token(&self) -> Option<&CancelToken> {
        self.cancel_token.as_ref()
    }

    /// Apply the status predicate. Without one, every status succeeds.
    pub fn validate_status(&self, status: u16) -> bool {
        match self.validate_status {
            Some(ref predicate) => predicate(status),
            None => true,
        }
    }
}

impl fmt::Debug for RequestConfig {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("RequestConfig")
            .field("method", &self.method)
            .field("url", &self.url)
            .field("headers", &self.headers)
            .field("data", &self.data)
            .field("timeout", &self.timeout)
            .field("with_credentials", &self.with_credentials)
            .field("auth", &self.auth)
            .finish()
    }
}

fn is_recognized(method: &Method) -> bool {
    [
        Method::GET,
        Method::POST,
        Method::PUT,
        Method::PATCH,
        Method::DELETE,
        Method::HEAD,
        Method::OPTIONS,
    ]
    .contains(method)
}

/// Check the fields every request must have before it reaches a transport.
pub(crate) fn validate(url: &str, method: &Method) -> crate::Result<()> {
    if url.is_empty() {
        return Err(error::config("Request url is required"));
    }
    if !is_recognized(method) {
        return Err(error::config(format!("Unsupported request method {method}")));
    }
    Ok(())
}

/// Merge `defaults`, `instance` and `call`, in that order, into one request.
///
/// Headers are flattened for the resolved method and params are appended to
/// the url. Fails with a config error if the url is empty or the method is
/// not one of `GET`, `POST`, `PUT`, `PATCH`, `DELETE`, `HEAD` or `OPTIONS`.
pub fn resolve(defaults: &Config, instance: &Config, call: &Config) -> crate::Result<RequestConfig> {
    let merged = defaults.merge(instance).merge(call);

    let url = merged.url.unwrap_or_default();
    let method = merged.method.unwrap_or(Method::GET);
    validate(&url, &method)?;

    let mut raw = merged.headers;
    header::infer_content_type(&mut raw, merged.data.as_ref());
    let mut headers = header::flatten(&raw, &method);
    header::strip_content_type(&mut headers, merged.data.as_ref());

    let url = query::build_url(
        &url,
        merged.params.as_ref(),
        merged.params_serializer.as_ref(),
    );

    trace!("resolved {method} {url}");

    Ok(RequestConfig {
        url,
        method,
        headers,
        data: merged.data,
        timeout: merged.timeout.filter(|t| !t.is_zero()),
        with_credentials: merged.with_credentials.unwrap_or(false),
        xsrf_cookie_name: merged.xsrf_cookie_name,
        xsrf_header_name: merged.xsrf_header_name,
        auth: merged.auth,
        response_type: merged.response_type.unwrap_or_default(),
        validate_status: merged.validate_status,
        transform_request: merged.transform_request.unwrap_or_default(),
        transform_response: merged.transform_response.unwrap_or_default(),
        cancel_token: merged.cancel_token,
        on_upload_progress: merged.on_upload_progress,
        on_download_progress: merged.on_download_progress,
    })
}
