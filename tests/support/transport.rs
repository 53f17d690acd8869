//! A scripted transport for the integration tests.
//!
//! Every request is recorded, then answered by the handler given to
//! [`scripted`]. The handler decides how the exchange ends.

use std::sync::{Arc, Mutex};

use dispatchr::{Body, Connection, Method, Notifier, Options, RawResponse, Transport};
use tokio::sync::Notify;

/// What the stub should do with a sent request.
pub enum Reply {
    Respond(RawResponse),
    Fail,
    Timeout,
    /// Keep the request open; its notifier is available from `Stub::hung`.
    Hang,
    /// Drop the notifier without settling.
    Drop,
    /// Drive the notifier by hand.
    With(Box<dyn FnOnce(Notifier) + Send>),
}

impl Reply {
    pub fn ok(body: &str) -> Reply {
        Reply::Respond(RawResponse::new(200).status_text("OK").body(body.to_owned()))
    }

    pub fn json(status: u16, body: &str) -> Reply {
        Reply::Respond(
            RawResponse::new(status)
                .headers("Content-Type: application/json\r\n")
                .body(body.to_owned()),
        )
    }

    pub fn status(status: u16) -> Reply {
        Reply::Respond(RawResponse::new(status))
    }
}

/// What the stub saw for one request.
#[derive(Clone, Debug, Default)]
pub struct Request {
    pub method: Option<Method>,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub options: Option<Options>,
    pub body: Option<Body>,
}

impl Request {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

type Handler = dyn Fn(&Request) -> Reply + Send + Sync;

#[derive(Clone)]
pub struct Stub {
    inner: Arc<Inner>,
}

struct Inner {
    handler: Box<Handler>,
    connects: Mutex<usize>,
    requests: Mutex<Vec<Request>>,
    aborts: Mutex<usize>,
    events: Mutex<Vec<String>>,
    hung: Mutex<Option<Notifier>>,
    sent: Notify,
}

pub fn scripted<F>(handler: F) -> Stub
where
    F: Fn(&Request) -> Reply + Send + Sync + 'static,
{
    Stub {
        inner: Arc::new(Inner {
            handler: Box::new(handler),
            connects: Mutex::new(0),
            requests: Mutex::new(Vec::new()),
            aborts: Mutex::new(0),
            events: Mutex::new(Vec::new()),
            hung: Mutex::new(None),
            sent: Notify::new(),
        }),
    }
}

impl Stub {
    pub fn connects(&self) -> usize {
        *self.inner.connects.lock().unwrap()
    }

    pub fn requests(&self) -> Vec<Request> {
        self.inner.requests.lock().unwrap().clone()
    }

    pub fn last(&self) -> Request {
        self.requests().pop().expect("no request was sent")
    }

    pub fn aborts(&self) -> usize {
        *self.inner.aborts.lock().unwrap()
    }

    pub fn log(&self, event: impl Into<String>) {
        self.inner.events.lock().unwrap().push(event.into());
    }

    pub fn events(&self) -> Vec<String> {
        self.inner.events.lock().unwrap().clone()
    }

    pub fn hung(&self) -> Option<Notifier> {
        self.inner.hung.lock().unwrap().clone()
    }

    /// Wait until a request reaches `send`.
    pub async fn sent(&self) {
        self.inner.sent.notified().await
    }
}

impl Transport for Stub {
    fn connect(&self) -> Box<dyn Connection> {
        *self.inner.connects.lock().unwrap() += 1;
        Box::new(StubConnection {
            inner: self.inner.clone(),
            request: Request::default(),
        })
    }
}

struct StubConnection {
    inner: Arc<Inner>,
    request: Request,
}

impl Connection for StubConnection {
    fn open(&mut self, method: &Method, url: &str) {
        self.request.method = Some(method.clone());
        self.request.url = url.to_owned();
    }

    fn set_request_header(&mut self, name: &str, value: &str) {
        self.request.headers.push((name.to_owned(), value.to_owned()));
    }

    fn configure(&mut self, options: &Options) {
        self.request.options = Some(options.clone());
    }

    fn send(&mut self, body: Option<Body>, notifier: Notifier) {
        self.request.body = body;
        self.inner.events.lock().unwrap().push("send".into());
        self.inner.requests.lock().unwrap().push(self.request.clone());

        let reply = (self.inner.handler)(&self.request);
        match reply {
            Reply::Respond(res) => notifier.complete(res),
            Reply::Fail => notifier.error(),
            Reply::Timeout => notifier.timeout(),
            Reply::Hang => {
                *self.inner.hung.lock().unwrap() = Some(notifier);
            }
            Reply::Drop => drop(notifier),
            Reply::With(f) => f(notifier),
        }
        self.inner.sent.notify_one();
    }

    fn abort(&mut self) {
        *self.inner.aborts.lock().unwrap() += 1;
        self.inner.events.lock().unwrap().push("abort".into());
    }
}
