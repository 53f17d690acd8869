use std::error::Error as StdError;
use std::fmt;

use crate::cancel::Cancel;
use crate::config::RequestConfig;
use crate::response::Response;
use crate::transport::RawHandle;

/// A `Result` alias where the `Err` case is `dispatchr::Error`.
pub type Result<T> = std::result::Result<T, Error>;

pub(crate) type BoxError = Box<dyn StdError + Send + Sync>;

/// The Errors that may occur when dispatching a request.
///
/// Every error built after a config has been resolved carries that config,
/// so interceptors and callers can see exactly what was sent. Errors caused by
/// a [`CancelToken`](crate::CancelToken) carry only the cancellation reason.
pub struct Error {
    inner: Box<Inner>,
}

struct Inner {
    code: Code,
    message: String,
    config: Option<RequestConfig>,
    request: Option<RawHandle>,
    response: Option<Response>,
    cancel: Option<Cancel>,
    source: Option<BoxError>,
}

/// The symbolic classification of an [`Error`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Code {
    /// A required config field was missing or invalid.
    Config,
    /// The transport failed without producing a response.
    Network,
    /// The transport gave up waiting for a response.
    Timeout,
    /// A response arrived, but the status predicate rejected it.
    Status,
    /// The request was cancelled through its token.
    Cancelled,
}

impl Code {
    /// The wire-compatible string form of this code.
    ///
    /// Timeouts are reported as `"ECONNABORTED"`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Code::Config => "ERR_BAD_OPTION",
            Code::Network => "ERR_NETWORK",
            Code::Timeout => "ECONNABORTED",
            Code::Status => "ERR_BAD_RESPONSE",
            Code::Cancelled => "ERR_CANCELED",
        }
    }
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Error {
    fn new(code: Code, message: impl Into<String>) -> Error {
        Error {
            inner: Box::new(Inner {
                code,
                message: message.into(),
                config: None,
                request: None,
                response: None,
                cancel: None,
                source: None,
            }),
        }
    }

    /// Build an error the way the dispatcher does.
    ///
    /// Response interceptors can use this to re-classify a failure, for
    /// example turning a rejected `404` into a network error.
    pub fn classify(
        code: Code,
        message: impl Into<String>,
        config: RequestConfig,
        request: Option<RawHandle>,
        response: Option<Response>,
    ) -> Error {
        let mut err = Error::new(code, message);
        err.inner.config = Some(config);
        err.inner.request = request;
        err.inner.response = response;
        err
    }

    pub(crate) fn with_source<E: Into<BoxError>>(mut self, source: E) -> Error {
        self.inner.source = Some(source.into());
        self
    }

    /// The symbolic code of this error.
    pub fn code(&self) -> Code {
        self.inner.code
    }

    /// The human readable message, without the code prefix.
    pub fn message(&self) -> &str {
        &self.inner.message
    }

    /// The resolved config that produced this error, if resolution succeeded.
    pub fn config(&self) -> Option<&RequestConfig> {
        self.inner.config.as_ref()
    }

    /// The transport's handle for the failed request, if it exposed one.
    pub fn request(&self) -> Option<&RawHandle> {
        self.inner.request.as_ref()
    }

    /// The response, if one was received before failing.
    pub fn response(&self) -> Option<&Response> {
        self.inner.response.as_ref()
    }

    /// Take the response out of this error.
    pub fn into_response(self) -> Option<Response> {
        self.inner.response
    }

    /// The response status, if a response was received.
    pub fn status(&self) -> Option<u16> {
        self.inner.response.as_ref().map(Response::status)
    }

    /// The reason passed to [`CancelToken::cancel`](crate::CancelToken::cancel),
    /// if this error is a cancellation.
    pub fn cancel_reason(&self) -> Option<&Cancel> {
        self.inner.cancel.as_ref()
    }

    /// Returns true if the config was invalid.
    pub fn is_config(&self) -> bool {
        self.inner.code == Code::Config
    }

    /// Returns true if the transport failed without a response.
    pub fn is_network(&self) -> bool {
        self.inner.code == Code::Network
    }

    /// Returns true if the transport timed out.
    pub fn is_timeout(&self) -> bool {
        self.inner.code == Code::Timeout
    }

    /// Returns true if the status predicate rejected the response.
    pub fn is_status(&self) -> bool {
        self.inner.code == Code::Status
    }

    /// Returns true if the request was cancelled.
    pub fn is_cancel(&self) -> bool {
        self.inner.code == Code::Cancelled
    }
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut builder = f.debug_struct("dispatchr::Error");

        builder.field("code", &self.inner.code);
        builder.field("message", &self.inner.message);

        if let Some(ref config) = self.inner.config {
            builder.field("url", &config.url());
        }
        if let Some(status) = self.status() {
            builder.field("status", &status);
        }
        if let Some(ref source) = self.inner.source {
            builder.field("source", source);
        }

        builder.finish()
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.inner.message)?;

        if let Some(ref config) = self.inner.config {
            write!(f, " for url ({})", config.url())?;
        }

        Ok(())
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.inner.source.as_ref().map(|e| &**e as _)
    }
}

// constructors

pub(crate) fn config(message: impl Into<String>) -> Error {
    Error::new(Code::Config, message)
}

pub(crate) fn network(config: RequestConfig, request: Option<RawHandle>) -> Error {
    Error::classify(Code::Network, "Network Error", config, request, None)
}

pub(crate) fn dropped(config: RequestConfig, request: Option<RawHandle>) -> Error {
    network(config, request).with_source(Dropped)
}

pub(crate) fn timeout(config: RequestConfig, request: Option<RawHandle>) -> Error {
    let millis = config.timeout().map(|t| t.as_millis()).unwrap_or(0);
    let message = format!("Timeout of {millis} ms exceeded");
    Error::classify(Code::Timeout, message, config, request, None)
}

pub(crate) fn status(response: Response) -> Error {
    let message = format!("Request failed with status code {}", response.status());
    let config = response.config().clone();
    let request = response.raw_handle().cloned();
    Error::classify(Code::Status, message, config, request, Some(response))
}

pub(crate) fn cancelled(reason: Cancel) -> Error {
    let mut err = Error::new(Code::Cancelled, reason.to_string());
    err.inner.cancel = Some(reason);
    err
}

#[derive(Debug)]
pub(crate) struct Dropped;

impl fmt::Display for Dropped {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("transport dropped the request without settling it")
    }
}

impl StdError for Dropped {}
