//! Request and response interceptors.
//!
//! A [`Client`](crate::Client) owns two chains. Request interceptors see the
//! resolved [`RequestConfig`] before it reaches the transport; response
//! interceptors see the [`Response`] (or the error) on the way back.
//!
//! Request interceptors run in reverse registration order, so the most
//! recently added one runs closest to the transport. Response interceptors
//! run in registration order, so the first added one runs closest to the
//! transport.
//!
//! Each step follows sequential promise semantics: a failure skips every
//! later `fulfilled` handler until some `rejected` handler recovers it.
//!
//! ```
//! # async fn run(client: dispatchr::Client) {
//! use dispatchr::interceptor::Interceptor;
//! use dispatchr::RequestConfig;
//!
//! let id = client.interceptors().request.add(Interceptor::fulfilled(|mut config: RequestConfig| async move {
//!     config.headers_mut().insert("X-Request-Id", "42");
//!     Ok(config)
//! }));
//! client.interceptors().request.eject(id);
//! # }
//! ```

use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use log::trace;

use crate::config::RequestConfig;
use crate::error::Error;
use crate::response::Response;

type Fulfilled<T> = Arc<dyn Fn(T) -> BoxFuture<'static, crate::Result<T>> + Send + Sync>;
type Rejected<T> = Arc<dyn Fn(Error) -> BoxFuture<'static, crate::Result<T>> + Send + Sync>;

/// A pair of handlers wrapped around the dispatch call.
pub struct Interceptor<T> {
    fulfilled: Option<Fulfilled<T>>,
    rejected: Option<Rejected<T>>,
}

impl<T: Send + 'static> Interceptor<T> {
    /// An interceptor with neither handler; it passes everything through.
    pub fn new() -> Interceptor<T> {
        Interceptor {
            fulfilled: None,
            rejected: None,
        }
    }

    /// An interceptor that only handles success.
    pub fn fulfilled<F, Fut>(f: F) -> Interceptor<T>
    where
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = crate::Result<T>> + Send + 'static,
    {
        Interceptor::new().on_fulfilled(f)
    }

    /// An interceptor that only handles failure.
    pub fn rejected<F, Fut>(f: F) -> Interceptor<T>
    where
        F: Fn(Error) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = crate::Result<T>> + Send + 'static,
    {
        Interceptor::new().on_rejected(f)
    }

    /// Set the success handler.
    pub fn on_fulfilled<F, Fut>(mut self, f: F) -> Interceptor<T>
    where
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = crate::Result<T>> + Send + 'static,
    {
        self.fulfilled = Some(Arc::new(move |value| f(value).boxed()));
        self
    }

    /// Set the failure handler. Returning `Ok` recovers the chain.
    pub fn on_rejected<F, Fut>(mut self, f: F) -> Interceptor<T>
    where
        F: Fn(Error) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = crate::Result<T>> + Send + 'static,
    {
        self.rejected = Some(Arc::new(move |err| f(err).boxed()));
        self
    }

    /// A synchronous success handler.
    pub fn map<F>(f: F) -> Interceptor<T>
    where
        F: Fn(T) -> T + Send + Sync + 'static,
    {
        Interceptor::fulfilled(move |value| futures_util::future::ready(Ok(f(value))))
    }

    async fn step(&self, state: crate::Result<T>) -> crate::Result<T> {
        match state {
            Ok(value) => match self.fulfilled {
                Some(ref f) => f(value).await,
                None => Ok(value),
            },
            Err(err) => match self.rejected {
                Some(ref f) => f(err).await,
                None => Err(err),
            },
        }
    }
}

impl<T: Send + 'static> Default for Interceptor<T> {
    fn default() -> Interceptor<T> {
        Interceptor::new()
    }
}

impl<T> fmt::Debug for Interceptor<T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Interceptor")
            .field("fulfilled", &self.fulfilled.is_some())
            .field("rejected", &self.rejected.is_some())
            .finish()
    }
}

/// Identifies a registered interceptor, for [`InterceptorManager::eject`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct InterceptorId(usize);

struct Entries<T> {
    next_id: usize,
    list: Vec<(InterceptorId, Arc<Interceptor<T>>)>,
}

/// An ordered, shareable list of interceptors.
///
/// Every dispatch works from a snapshot taken when it starts, so adding or
/// ejecting entries never disturbs a request already in flight.
pub struct InterceptorManager<T> {
    entries: Mutex<Entries<T>>,
}

impl<T: Send + 'static> InterceptorManager<T> {
    pub(crate) fn new() -> InterceptorManager<T> {
        InterceptorManager {
            entries: Mutex::new(Entries {
                next_id: 0,
                list: Vec::new(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Entries<T>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register an interceptor at the end of the list.
    pub fn add(&self, interceptor: Interceptor<T>) -> InterceptorId {
        let mut entries = self.lock();
        let id = InterceptorId(entries.next_id);
        entries.next_id += 1;
        entries.list.push((id, Arc::new(interceptor)));
        id
    }

    /// Remove an interceptor. Returns false if `id` was not registered.
    pub fn eject(&self, id: InterceptorId) -> bool {
        let mut entries = self.lock();
        let before = entries.list.len();
        entries.list.retain(|(entry, _)| *entry != id);
        entries.list.len() != before
    }

    /// Remove every interceptor.
    pub fn clear(&self) {
        self.lock().list.clear();
    }

    /// The number of registered interceptors.
    pub fn len(&self) -> usize {
        self.lock().list.len()
    }

    /// Returns true if no interceptors are registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub(crate) fn snapshot(&self) -> Vec<Arc<Interceptor<T>>> {
        self.lock()
            .list
            .iter()
            .map(|(_, interceptor)| interceptor.clone())
            .collect()
    }
}

impl<T> fmt::Debug for InterceptorManager<T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let len = self
            .entries
            .lock()
            .map(|e| e.list.len())
            .unwrap_or_default();
        f.debug_struct("InterceptorManager").field("len", &len).finish()
    }
}

/// The request and response chains of a client.
#[derive(Debug)]
pub struct Interceptors {
    /// Runs over the resolved config, newest first.
    pub request: InterceptorManager<RequestConfig>,
    /// Runs over the response or error, oldest first.
    pub response: InterceptorManager<Response>,
}

impl Interceptors {
    pub(crate) fn new() -> Interceptors {
        Interceptors {
            request: InterceptorManager::new(),
            response: InterceptorManager::new(),
        }
    }
}

/// Thread `state` through `chain` in iteration order.
pub(crate) async fn run<'a, T, I>(chain: I, mut state: crate::Result<T>) -> crate::Result<T>
where
    T: Send + 'static,
    I: IntoIterator<Item = &'a Arc<Interceptor<T>>>,
{
    for (i, interceptor) in chain.into_iter().enumerate() {
        trace!("interceptor step {i} (ok = {})", state.is_ok());
        state = interceptor.step(state).await;
    }
    state
}

#[cfg(test)]
mod tests {
    use super::*;

    fn push(tag: &'static str) -> Interceptor<Vec<&'static str>> {
        Interceptor::map(move |mut v: Vec<&'static str>| {
            v.push(tag);
            v
        })
    }

    #[tokio::test]
    async fn runs_in_given_order() {
        let manager = InterceptorManager::new();
        manager.add(push("a"));
        manager.add(push("b"));

        let snapshot = manager.snapshot();
        let out = run(snapshot.iter(), Ok(vec![])).await.unwrap();
        assert_eq!(out, ["a", "b"]);

        let out = run(snapshot.iter().rev(), Ok(vec![])).await.unwrap();
        assert_eq!(out, ["b", "a"]);
    }

    #[tokio::test]
    async fn eject_keeps_remaining_order() {
        let manager = InterceptorManager::new();
        manager.add(push("a"));
        let b = manager.add(push("b"));
        manager.add(push("c"));

        assert!(manager.eject(b));
        assert!(!manager.eject(b));
        assert_eq!(manager.len(), 2);

        let out = run(manager.snapshot().iter(), Ok(vec![])).await.unwrap();
        assert_eq!(out, ["a", "c"]);
    }

    #[tokio::test]
    async fn snapshot_ignores_later_changes() {
        let manager = InterceptorManager::new();
        let a = manager.add(push("a"));
        let snapshot = manager.snapshot();

        manager.eject(a);
        manager.add(push("late"));

        let out = run(snapshot.iter(), Ok(vec![])).await.unwrap();
        assert_eq!(out, ["a"]);
    }

    #[tokio::test]
    async fn failure_skips_to_next_rejected_handler() {
        let manager = InterceptorManager::<Vec<&'static str>>::new();
        manager.add(Interceptor::fulfilled(|_| async {
            Err(crate::error::config("boom"))
        }));
        manager.add(push("skipped"));
        manager.add(Interceptor::rejected(|err: Error| async move {
            assert_eq!(err.message(), "boom");
            Ok(vec!["recovered"])
        }));
        manager.add(push("after"));

        let out = run(manager.snapshot().iter(), Ok(vec![])).await.unwrap();
        assert_eq!(out, ["recovered", "after"]);
    }

    #[tokio::test]
    async fn fulfilled_failure_does_not_hit_own_rejected() {
        let manager = InterceptorManager::<Vec<&'static str>>::new();
        manager.add(
            Interceptor::fulfilled(|_| async { Err(crate::error::config("boom")) })
                .on_rejected(|_| async { Ok(vec!["wrong"]) }),
        );

        let err = run(manager.snapshot().iter(), Ok(vec![])).await.unwrap_err();
        assert!(err.is_config());
    }

    #[tokio::test]
    async fn ids_are_never_reused() {
        let manager = InterceptorManager::<Vec<&'static str>>::new();
        let a = manager.add(Interceptor::new());
        manager.eject(a);
        let b = manager.add(Interceptor::new());
        assert_ne!(a, b);
        manager.clear();
        assert!(manager.is_empty());
    }
}
