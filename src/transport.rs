//! The transport boundary.
//!
//! The pipeline never touches the network itself. A [`Transport`] hands out
//! one [`Connection`] per request; the dispatcher drives it through
//! `open`, `set_request_header`, `configure` and `send`, and the connection
//! reports back through the [`Notifier`] it was given.
//!
//! Exactly one terminal notification ([`complete`], [`error`] or
//! [`timeout`]) is honored per request. Anything after the first, or after
//! the request was aborted, is ignored.
//!
//! [`complete`]: Notifier::complete
//! [`error`]: Notifier::error
//! [`timeout`]: Notifier::timeout

use std::any::Any;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::time::Duration;

use bytes::Bytes;
use http::Method;
use log::trace;
use tokio::sync::oneshot;

use crate::body::{Body, ResponseType};
use crate::cancel::Cancel;

/// Opens connections for requests.
pub trait Transport: Send + Sync {
    /// Create a fresh, unopened connection for one request.
    fn connect(&self) -> Box<dyn Connection>;
}

/// A single request exchange, driven by the dispatcher.
pub trait Connection: Send {
    /// Set the method and url.
    fn open(&mut self, method: &Method, url: &str);

    /// Add one finalized request header.
    fn set_request_header(&mut self, name: &str, value: &str);

    /// Apply per-request options.
    fn configure(&mut self, options: &Options);

    /// Start the exchange. The outcome is reported through `notifier`.
    fn send(&mut self, body: Option<Body>, notifier: Notifier);

    /// Stop the exchange. Called at most once, and only after `send`.
    fn abort(&mut self);

    /// An opaque handle to the underlying request, for errors and responses.
    fn handle(&self) -> Option<RawHandle> {
        None
    }
}

/// Per-request options passed to [`Connection::configure`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Options {
    /// How the body should be returned.
    pub response_type: ResponseType,
    /// When to give up and notify a timeout. `None` waits forever.
    pub timeout: Option<Duration>,
    /// Whether cross-site credentials are sent.
    pub with_credentials: bool,
}

/// An opaque, shareable handle to a transport's own request object.
#[derive(Clone)]
pub struct RawHandle(Arc<dyn Any + Send + Sync>);

impl RawHandle {
    /// Wrap a transport value.
    pub fn new<T: Any + Send + Sync>(value: T) -> RawHandle {
        RawHandle(Arc::new(value))
    }

    /// Get the wrapped value, if it is a `T`.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.downcast_ref()
    }
}

impl fmt::Debug for RawHandle {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("RawHandle")
    }
}

/// What a transport received.
#[derive(Clone, Debug)]
pub struct RawResponse {
    pub(crate) status: u16,
    pub(crate) status_text: String,
    pub(crate) headers: String,
    pub(crate) body: Bytes,
    pub(crate) handle: Option<RawHandle>,
}

impl RawResponse {
    /// A response with `status` and nothing else.
    pub fn new(status: u16) -> RawResponse {
        RawResponse {
            status,
            status_text: String::new(),
            headers: String::new(),
            body: Bytes::new(),
            handle: None,
        }
    }

    /// Set the reason phrase.
    pub fn status_text(mut self, text: impl Into<String>) -> RawResponse {
        self.status_text = text.into();
        self
    }

    /// Set the raw header block, as `name: value` lines separated by CRLF.
    pub fn headers(mut self, raw: impl Into<String>) -> RawResponse {
        self.headers = raw.into();
        self
    }

    /// Set the body bytes.
    pub fn body(mut self, body: impl Into<Bytes>) -> RawResponse {
        self.body = body.into();
        self
    }

    /// Attach the transport's handle.
    pub fn handle(mut self, handle: RawHandle) -> RawResponse {
        self.handle = Some(handle);
        self
    }
}

/// Bytes moved so far, and the total if known.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Progress {
    /// Bytes transferred so far.
    pub loaded: u64,
    /// Total bytes expected, if known.
    pub total: Option<u64>,
}

/// A progress observer.
pub type ProgressFn = Arc<dyn Fn(Progress) + Send + Sync>;

/// The first thing that ended a request.
#[derive(Debug)]
pub(crate) enum Settled {
    Complete(RawResponse),
    Error,
    Timeout,
    Cancelled(Cancel),
}

/// The connection's way of reporting back to the dispatcher.
///
/// Cloning is cheap; every clone reports into the same request.
#[derive(Clone)]
pub struct Notifier {
    shared: Arc<Shared>,
}

struct Shared {
    settle: Mutex<Option<oneshot::Sender<Settled>>>,
    closed: AtomicBool,
    upload: Option<ProgressFn>,
    download: Option<ProgressFn>,
}

impl Notifier {
    pub(crate) fn new(
        upload: Option<ProgressFn>,
        download: Option<ProgressFn>,
    ) -> (Notifier, oneshot::Receiver<Settled>) {
        let (tx, rx) = oneshot::channel();
        let notifier = Notifier {
            shared: Arc::new(Shared {
                settle: Mutex::new(Some(tx)),
                closed: AtomicBool::new(false),
                upload,
                download,
            }),
        };
        (notifier, rx)
    }

    /// Settle the request, returning false if it was already settled.
    pub(crate) fn settle(&self, outcome: Settled) -> bool {
        let tx = self
            .shared
            .settle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        match tx {
            Some(tx) => {
                self.shared.closed.store(true, Ordering::Release);
                let _ = tx.send(outcome);
                true
            }
            None => {
                trace!("ignoring notification for settled request: {outcome:?}");
                false
            }
        }
    }

    /// Report a received response.
    pub fn complete(&self, response: RawResponse) {
        self.settle(Settled::Complete(response));
    }

    /// Report a failure with no response.
    pub fn error(&self) {
        self.settle(Settled::Error);
    }

    /// Report that the configured timeout elapsed.
    pub fn timeout(&self) {
        self.settle(Settled::Timeout);
    }

    /// Report upload progress.
    pub fn upload_progress(&self, loaded: u64, total: Option<u64>) {
        if let Some(ref f) = self.shared.upload {
            if !self.is_closed() {
                f(Progress { loaded, total });
            }
        }
    }

    /// Report download progress.
    pub fn download_progress(&self, loaded: u64, total: Option<u64>) {
        if let Some(ref f) = self.shared.download {
            if !self.is_closed() {
                f(Progress { loaded, total });
            }
        }
    }

    /// Returns true once the request has settled or been aborted.
    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::Acquire)
    }

    /// A handle that can settle the request without keeping it alive.
    ///
    /// Once every strong `Notifier` is dropped the request settles as
    /// dropped, whatever weak handles remain.
    pub(crate) fn downgrade(&self) -> WeakNotifier {
        WeakNotifier {
            shared: Arc::downgrade(&self.shared),
        }
    }
}

/// A non-owning [`Notifier`].
pub(crate) struct WeakNotifier {
    shared: Weak<Shared>,
}

impl WeakNotifier {
    /// Settle the request if it is still alive.
    pub(crate) fn settle(&self, outcome: Settled) -> bool {
        match self.shared.upgrade() {
            Some(shared) => Notifier { shared }.settle(outcome),
            None => false,
        }
    }
}

impl fmt::Debug for Notifier {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Notifier")
            .field("closed", &self.is_closed())
            .finish()
    }
}
