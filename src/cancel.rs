//! Cooperative cancellation.
//!
//! A [`CancelToken`] is handed to a request through its config. Cancelling
//! the token aborts the transport (if the request is still in flight) and
//! rejects the request with the token's [`Cancel`] reason.
//!
//! ```
//! use dispatchr::CancelToken;
//!
//! let token = CancelToken::new();
//! let for_request = token.clone();
//!
//! token.cancel("navigated away");
//! token.cancel("ignored");
//!
//! assert_eq!(for_request.reason().unwrap().message(), Some("navigated away"));
//! ```

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use log::trace;
use tokio::sync::oneshot;

/// The reason a request was cancelled.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Cancel {
    message: Option<String>,
}

impl Cancel {
    /// A reason with a message.
    pub fn new(message: impl Into<String>) -> Cancel {
        Cancel {
            message: Some(message.into()),
        }
    }

    /// The message given when cancelling, if any.
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }
}

impl fmt::Display for Cancel {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.message {
            Some(ref message) => f.write_str(message),
            None => f.write_str("canceled"),
        }
    }
}

impl From<&str> for Cancel {
    fn from(message: &str) -> Cancel {
        Cancel::new(message)
    }
}

impl From<String> for Cancel {
    fn from(message: String) -> Cancel {
        Cancel::new(message)
    }
}

impl From<()> for Cancel {
    fn from(_: ()) -> Cancel {
        Cancel::default()
    }
}

type Callback = Box<dyn FnOnce(&Cancel) + Send>;

enum State {
    Pending(Vec<Callback>),
    Settled(Cancel),
}

/// A settle-once cancellation signal.
///
/// Clones share the same state. The first [`cancel`](CancelToken::cancel)
/// wins; later calls leave the reason untouched.
#[derive(Clone)]
pub struct CancelToken {
    state: Arc<Mutex<State>>,
}

impl CancelToken {
    /// Create an unsettled token.
    pub fn new() -> CancelToken {
        CancelToken {
            state: Arc::new(Mutex::new(State::Pending(Vec::new()))),
        }
    }

    /// Create a token and hand a clone of it to `executor`.
    ///
    /// This is handy for wiring cancellation into some other event source
    /// at construction time.
    pub fn with_executor<F>(executor: F) -> CancelToken
    where
        F: FnOnce(CancelToken),
    {
        let token = CancelToken::new();
        executor(token.clone());
        token
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Settle the token with `reason`.
    ///
    /// Returns `false` if the token was already settled, in which case
    /// nothing changes.
    pub fn cancel(&self, reason: impl Into<Cancel>) -> bool {
        let reason = reason.into();
        let callbacks = {
            let mut state = self.lock();
            match *state {
                State::Settled(_) => return false,
                State::Pending(ref mut callbacks) => {
                    let callbacks = std::mem::take(callbacks);
                    *state = State::Settled(reason.clone());
                    callbacks
                }
            }
        };

        trace!("cancel token settled with {} waiter(s)", callbacks.len());
        for callback in callbacks {
            callback(&reason);
        }
        true
    }

    /// Returns true once the token has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        matches!(*self.lock(), State::Settled(_))
    }

    /// The reason, once the token has been cancelled.
    pub fn reason(&self) -> Option<Cancel> {
        match *self.lock() {
            State::Settled(ref reason) => Some(reason.clone()),
            State::Pending(_) => None,
        }
    }

    /// Register `callback` to run exactly once when the token settles.
    ///
    /// If the token is already settled, `callback` runs immediately.
    pub fn on_settle<F>(&self, callback: F)
    where
        F: FnOnce(&Cancel) + Send + 'static,
    {
        let reason = {
            let mut state = self.lock();
            match *state {
                State::Pending(ref mut callbacks) => {
                    callbacks.push(Box::new(callback));
                    return;
                }
                State::Settled(ref reason) => reason.clone(),
            }
        };
        callback(&reason);
    }

    /// Wait until the token is cancelled, yielding the reason.
    pub async fn cancelled(&self) -> Cancel {
        let (tx, rx) = oneshot::channel();
        self.on_settle(move |reason| {
            let _ = tx.send(reason.clone());
        });
        match rx.await {
            Ok(reason) => reason,
            // the sender lives in the token's callback list until it fires
            Err(_) => std::future::pending().await,
        }
    }
}

impl Default for CancelToken {
    fn default() -> CancelToken {
        CancelToken::new()
    }
}

impl fmt::Debug for CancelToken {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("CancelToken")
            .field("reason", &self.reason())
            .finish()
    }
}
