use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use http::Method;
use serde::Serialize;
use serde_json::Value;

use crate::body::{Body, ResponseType};
use crate::cancel::CancelToken;
use crate::config::{self, Config, RequestConfig};
use crate::cookie::CookieStore;
use crate::dispatch;
use crate::error::{self, Error};
use crate::interceptor::Interceptors;
use crate::multipart::Form;
use crate::origin::{OriginPolicy, SameOrigin};
use crate::response::Response;
use crate::transform::Transformer;
use crate::transport::{Progress, Transport};

/// A `Client` to dispatch requests with.
///
/// The client holds the instance config layer, the interceptor chains and
/// the transport. Cloning is cheap and every clone shares the same
/// interceptors.
///
/// # Examples
///
/// ```no_run
/// # async fn run(transport: impl dispatchr::Transport + 'static) -> dispatchr::Result<()> {
/// let client = dispatchr::Client::new(transport);
/// let res = client.get("/user").param("id", 12345).send().await?;
/// println!("{}", res.status());
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientRef>,
}

pub(crate) struct ClientRef {
    pub(crate) defaults: Config,
    pub(crate) instance: Config,
    pub(crate) interceptors: Interceptors,
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) cookie_store: Option<Arc<dyn CookieStore>>,
    pub(crate) origin: Option<Arc<dyn OriginPolicy>>,
}

/// A `ClientBuilder` can be used to create a `Client` with custom configuration.
///
/// ```
/// # fn run(transport: impl dispatchr::Transport + 'static) -> dispatchr::Result<()> {
/// use std::time::Duration;
///
/// let client = dispatchr::Client::builder()
///     .transport(transport)
///     .timeout(Duration::from_secs(10))
///     .default_header("X-Requested-With", "XMLHttpRequest")
///     .build()?;
/// # drop(client);
/// # Ok(())
/// # }
/// ```
#[must_use]
pub struct ClientBuilder {
    defaults: Config,
    instance: Config,
    transport: Option<Arc<dyn Transport>>,
    cookie_store: Option<Arc<dyn CookieStore>>,
    origin: Option<Arc<dyn OriginPolicy>>,
    err: Option<Error>,
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ClientBuilder {
    /// Constructs a new `ClientBuilder` over the global defaults.
    pub fn new() -> ClientBuilder {
        ClientBuilder {
            defaults: Config::defaults(),
            instance: Config::new(),
            transport: None,
            cookie_store: None,
            origin: None,
            err: None,
        }
    }

    /// Returns a `Client` that uses this `ClientBuilder` configuration.
    ///
    /// # Errors
    ///
    /// Fails with a config error if no transport was set, or if an earlier
    /// builder call failed.
    pub fn build(self) -> crate::Result<Client> {
        if let Some(err) = self.err {
            return Err(err);
        }
        let transport = self
            .transport
            .ok_or_else(|| error::config("Client requires a transport"))?;

        Ok(Client {
            inner: Arc::new(ClientRef {
                defaults: self.defaults,
                instance: self.instance,
                interceptors: Interceptors::new(),
                transport,
                cookie_store: self.cookie_store,
                origin: self.origin,
            }),
        })
    }

    /// Set the transport requests are sent through.
    pub fn transport<T: Transport + 'static>(mut self, transport: T) -> ClientBuilder {
        self.transport = Some(Arc::new(transport));
        self
    }

    /// Replace the instance config layer.
    pub fn config(mut self, config: Config) -> ClientBuilder {
        self.instance = config;
        self
    }

    /// Replace the defaults layer. [`Config::defaults`] is used otherwise.
    pub fn defaults(mut self, config: Config) -> ClientBuilder {
        self.defaults = config;
        self
    }

    /// Set a base url every request inherits unless it sets its own.
    pub fn url(mut self, url: impl Into<String>) -> ClientBuilder {
        self.instance = self.instance.url(url);
        self
    }

    /// Set the timeout for every request. Zero disables it.
    pub fn timeout(mut self, timeout: Duration) -> ClientBuilder {
        self.instance = self.instance.timeout(timeout);
        self
    }

    /// Add a header sent with every request, whatever the method.
    pub fn default_header(mut self, name: impl Into<String>, value: impl Into<String>) -> ClientBuilder {
        self.instance = self.instance.common_header(name, value);
        self
    }

    /// Read XSRF tokens from `store`.
    pub fn cookie_store<C: CookieStore + 'static>(mut self, store: Arc<C>) -> ClientBuilder {
        self.cookie_store = Some(store);
        self
    }

    /// Treat urls sharing `base`'s origin as same-origin for XSRF.
    pub fn same_origin(mut self, base: &str) -> ClientBuilder {
        match SameOrigin::parse(base) {
            Ok(policy) => self.origin = Some(Arc::new(policy)),
            Err(err) => self.err = Some(err),
        }
        self
    }

    /// Use a custom same-origin policy.
    pub fn origin_policy<P: OriginPolicy + 'static>(mut self, policy: P) -> ClientBuilder {
        self.origin = Some(Arc::new(policy));
        self
    }
}

impl fmt::Debug for ClientBuilder {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("ClientBuilder")
            .field("instance", &self.instance)
            .field("transport", &self.transport.is_some())
            .finish()
    }
}

impl Client {
    /// Constructs a new `Client` over `transport` with the default config.
    pub fn new<T: Transport + 'static>(transport: T) -> Client {
        Client {
            inner: Arc::new(ClientRef {
                defaults: Config::defaults(),
                instance: Config::new(),
                interceptors: Interceptors::new(),
                transport: Arc::new(transport),
                cookie_store: None,
                origin: None,
            }),
        }
    }

    /// Creates a `ClientBuilder` to configure a `Client`.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// The request and response interceptor chains.
    pub fn interceptors(&self) -> &Interceptors {
        &self.inner.interceptors
    }

    /// The instance config layer.
    pub fn config(&self) -> &Config {
        &self.inner.instance
    }

    /// Start building a request with `method` to `url`.
    pub fn request(&self, method: Method, url: impl Into<String>) -> RequestBuilder {
        RequestBuilder::new(self.clone(), Config::new().method(method).url(url))
    }

    /// Convenience method to make a `GET` request to a url.
    pub fn get(&self, url: impl Into<String>) -> RequestBuilder {
        self.request(Method::GET, url)
    }

    /// Convenience method to make a `POST` request to a url.
    pub fn post(&self, url: impl Into<String>) -> RequestBuilder {
        self.request(Method::POST, url)
    }

    /// Convenience method to make a `PUT` request to a url.
    pub fn put(&self, url: impl Into<String>) -> RequestBuilder {
        self.request(Method::PUT, url)
    }

    /// Convenience method to make a `PATCH` request to a url.
    pub fn patch(&self, url: impl Into<String>) -> RequestBuilder {
        self.request(Method::PATCH, url)
    }

    /// Convenience method to make a `DELETE` request to a url.
    pub fn delete(&self, url: impl Into<String>) -> RequestBuilder {
        self.request(Method::DELETE, url)
    }

    /// Convenience method to make a `HEAD` request to a url.
    pub fn head(&self, url: impl Into<String>) -> RequestBuilder {
        self.request(Method::HEAD, url)
    }

    /// Convenience method to make an `OPTIONS` request to a url.
    pub fn options(&self, url: impl Into<String>) -> RequestBuilder {
        self.request(Method::OPTIONS, url)
    }

    /// Dispatch a request described by a per-call `config`.
    ///
    /// The config is layered over the client's defaults and instance config,
    /// then passed through the request interceptors, the transport and the
    /// response interceptors.
    pub fn dispatch(&self, config: Config) -> Pending {
        Pending::new(dispatch::dispatch(self.inner.clone(), config).boxed())
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Client")
            .field("instance", &self.inner.instance)
            .field("interceptors", &self.inner.interceptors)
            .finish()
    }
}

/// A builder to construct the per-call config of a request.
#[must_use = "RequestBuilder does nothing until you 'send' it"]
pub struct RequestBuilder {
    client: Client,
    config: crate::Result<Config>,
}

impl RequestBuilder {
    pub(crate) fn new(client: Client, config: Config) -> RequestBuilder {
        RequestBuilder {
            client,
            config: Ok(config),
        }
    }

    fn map(mut self, f: impl FnOnce(Config) -> Config) -> RequestBuilder {
        self.config = self.config.map(f);
        self
    }

    fn try_map(mut self, f: impl FnOnce(Config) -> crate::Result<Config>) -> RequestBuilder {
        self.config = self.config.and_then(f);
        self
    }

    /// Add a header to this request.
    pub fn header(self, name: impl Into<String>, value: impl Into<String>) -> RequestBuilder {
        let (name, value) = (name.into(), value.into());
        self.map(|c| c.header(name, value))
    }

    /// Add a query parameter.
    pub fn param(self, key: impl Into<String>, value: impl Into<Value>) -> RequestBuilder {
        let (key, value) = (key.into(), value.into());
        self.map(|c| c.param(key, value))
    }

    /// Modify the query string of the URL.
    ///
    /// `query` must serialize to a map, such as a struct or
    /// `&[("key", "value")]` pairs.
    ///
    /// # Errors
    ///
    /// Sending fails with a config error if `query` cannot be serialized
    /// into a map.
    pub fn query<T: Serialize + ?Sized>(self, query: &T) -> RequestBuilder {
        let params = match serde_json::to_value(query) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(Value::Array(pairs)) => pairs_to_params(pairs),
            Ok(other) => Err(error::config(format!("query must be a map, got {other}"))),
            Err(err) => Err(error::config("query could not be serialized").with_source(err)),
        };
        self.try_map(|c| params.map(|p| c.params(p)))
    }

    /// Send a JSON body.
    ///
    /// # Errors
    ///
    /// Sending fails with a config error if `json` cannot be serialized.
    pub fn json<T: Serialize + ?Sized>(self, json: &T) -> RequestBuilder {
        let value = serde_json::to_value(json)
            .map_err(|err| error::config("body could not be serialized").with_source(err));
        self.try_map(|c| value.map(|v| c.data(v)))
    }

    /// Set the request body.
    pub fn body(self, body: impl Into<Body>) -> RequestBuilder {
        let body = body.into();
        self.map(|c| c.data(body))
    }

    /// Send a multipart form. The transport picks the `Content-Type`.
    pub fn multipart(self, form: Form) -> RequestBuilder {
        self.map(|c| c.data(form))
    }

    /// Set a timeout for this request. Zero disables it.
    pub fn timeout(self, timeout: Duration) -> RequestBuilder {
        self.map(|c| c.timeout(timeout))
    }

    /// Enable HTTP basic authentication.
    pub fn basic_auth(self, username: impl Into<String>, password: impl Into<String>) -> RequestBuilder {
        let (username, password) = (username.into(), password.into());
        self.map(|c| c.basic_auth(username, password))
    }

    /// Send credentials on cross-site requests.
    pub fn with_credentials(self, enabled: bool) -> RequestBuilder {
        self.map(|c| c.with_credentials(enabled))
    }

    /// How the transport should return the response body.
    pub fn response_type(self, response_type: ResponseType) -> RequestBuilder {
        self.map(|c| c.response_type(response_type))
    }

    /// Decide which statuses count as success.
    pub fn validate_status<F>(self, predicate: F) -> RequestBuilder
    where
        F: Fn(u16) -> bool + Send + Sync + 'static,
    {
        self.map(|c| c.validate_status(predicate))
    }

    /// Replace the request transforms.
    pub fn transform_request(self, fns: Vec<Transformer>) -> RequestBuilder {
        self.map(|c| c.transform_request(fns))
    }

    /// Replace the response transforms.
    pub fn transform_response(self, fns: Vec<Transformer>) -> RequestBuilder {
        self.map(|c| c.transform_response(fns))
    }

    /// Attach a cancellation token.
    pub fn cancel_token(self, token: CancelToken) -> RequestBuilder {
        self.map(|c| c.cancel_token(token))
    }

    /// Observe upload progress.
    pub fn on_upload_progress<F>(self, f: F) -> RequestBuilder
    where
        F: Fn(Progress) + Send + Sync + 'static,
    {
        self.map(|c| c.on_upload_progress(f))
    }

    /// Observe download progress.
    pub fn on_download_progress<F>(self, f: F) -> RequestBuilder
    where
        F: Fn(Progress) + Send + Sync + 'static,
    {
        self.map(|c| c.on_download_progress(f))
    }

    /// Resolve this request against the client's layers without sending it.
    pub fn build(self) -> crate::Result<RequestConfig> {
        let inner = &self.client.inner;
        config::resolve(&inner.defaults, &inner.instance, &self.config?)
    }

    /// Constructs the request and sends it, returning a future of the
    /// [`Response`].
    ///
    /// # Errors
    ///
    /// The future fails if the config is invalid, the transport fails or
    /// times out, the status is rejected, or the request is cancelled.
    pub fn send(self) -> Pending {
        match self.config {
            Ok(config) => self.client.dispatch(config),
            Err(err) => Pending::error(err),
        }
    }
}

impl fmt::Debug for RequestBuilder {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.config {
            Ok(ref config) => f.debug_tuple("RequestBuilder").field(config).finish(),
            Err(ref err) => f.debug_tuple("RequestBuilder").field(err).finish(),
        }
    }
}

fn pairs_to_params(pairs: Vec<Value>) -> crate::Result<crate::query::Params> {
    let mut params = crate::query::Params::new();
    for pair in pairs {
        match pair {
            Value::Array(mut kv) if kv.len() == 2 => {
                let value = kv.pop().unwrap_or(Value::Null);
                match kv.pop() {
                    Some(Value::String(key)) => {
                        params.insert(key, value);
                    }
                    _ => return Err(error::config("query keys must be strings")),
                }
            }
            other => return Err(error::config(format!("query pair expected, got {other}"))),
        }
    }
    Ok(params)
}

/// A pending response.
#[must_use = "futures do nothing unless polled"]
pub struct Pending {
    inner: PendingInner,
}

enum PendingInner {
    Request(BoxFuture<'static, crate::Result<Response>>),
    Error(Option<Error>),
}

impl Pending {
    fn new(fut: BoxFuture<'static, crate::Result<Response>>) -> Pending {
        Pending {
            inner: PendingInner::Request(fut),
        }
    }

    fn error(err: Error) -> Pending {
        Pending {
            inner: PendingInner::Error(Some(err)),
        }
    }
}

impl Future for Pending {
    type Output = crate::Result<Response>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match self.get_mut().inner {
            PendingInner::Request(ref mut fut) => fut.as_mut().poll(cx),
            PendingInner::Error(ref mut err) => match err.take() {
                Some(err) => Poll::Ready(Err(err)),
                None => Poll::Pending,
            },
        }
    }
}

impl fmt::Debug for Pending {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.inner {
            PendingInner::Request(_) => f.debug_struct("Pending").finish_non_exhaustive(),
            PendingInner::Error(ref err) => f.debug_struct("Pending").field("error", err).finish(),
        }
    }
}
