#![deny(missing_docs)]
#![deny(missing_debug_implementations)]

//! # dispatchr
//!
//! The `dispatchr` crate provides a declarative HTTP request pipeline.
//!
//! Callers describe a request as layered [`Config`]s and get back either a
//! normalized [`Response`] or a classified [`Error`]. Between the two sit:
//!
//! - config resolution: defaults, instance and per-call layers merged in order
//! - header normalization per method, with case-insensitive names
//! - query parameter serialization onto the url
//! - request and response [interceptors](interceptor)
//! - request and response [transforms](transform)
//! - cooperative cancellation with a [`CancelToken`]
//!
//! The bytes themselves are moved by a [`Transport`], which this crate
//! only drives. Plug in any implementation of the trait.
//!
//! ## Making a request
//!
//! ```no_run
//! # async fn run(transport: impl dispatchr::Transport + 'static) -> dispatchr::Result<()> {
//! let client = dispatchr::Client::new(transport);
//!
//! let res = client
//!     .post("/user")
//!     .json(&serde_json::json!({ "name": "Fred" }))
//!     .send()
//!     .await?;
//!
//! println!("status = {}", res.status());
//! # Ok(())
//! # }
//! ```
//!
//! Or, without the builder, hand a per-call [`Config`] to
//! [`Client::dispatch`]:
//!
//! ```no_run
//! # async fn run(client: dispatchr::Client) -> dispatchr::Result<()> {
//! use dispatchr::{Config, Method};
//!
//! let res = client
//!     .dispatch(Config::new().url("/user").method(Method::GET).param("id", 12345))
//!     .await?;
//! # drop(res);
//! # Ok(())
//! # }
//! ```
//!
//! ## Cancellation
//!
//! Attach a [`CancelToken`] and cancel it from anywhere. Whichever happens
//! first, the transport settling or the token firing, decides the outcome.
//!
//! ```no_run
//! # async fn run(client: dispatchr::Client) {
//! let token = dispatchr::CancelToken::new();
//! let pending = client.get("/slow").cancel_token(token.clone()).send();
//!
//! token.cancel("user navigated away");
//!
//! let err = pending.await.unwrap_err();
//! assert!(err.is_cancel());
//! # }
//! ```
//!
//! ## Optional Features
//!
//! - **cookies** *(enabled by default)*: parse `Cookie` strings into a
//!   [`cookie::Jar`] for XSRF tokens.

pub use http::Method;

pub use self::body::{Body, ResponseType};
pub use self::cancel::{Cancel, CancelToken};
pub use self::client::{Client, ClientBuilder, Pending, RequestBuilder};
pub use self::config::{resolve, Auth, Config, RequestConfig, ValidateStatus};
pub use self::error::{Code, Error, Result};
pub use self::header::{flatten, parse_headers, Headers, RawHeaders};
pub use self::interceptor::{Interceptor, InterceptorId};
pub use self::merge::deep_merge;
pub use self::query::{build_url, Params};
pub use self::response::Response;
pub use self::transform::Transformer;
pub use self::transport::{Connection, Notifier, Options, Progress, RawHandle, RawResponse, Transport};

mod body;
mod cancel;
mod client;
mod config;
mod dispatch;
mod error;
mod header;
mod merge;
mod response;
mod util;

pub mod cookie;
pub mod interceptor;
pub mod multipart;
pub mod origin;
pub mod query;
pub mod transform;
pub mod transport;
