use std::fmt;

use serde::de::DeserializeOwned;

use crate::body::Body;
use crate::config::RequestConfig;
use crate::header::Headers;
use crate::transport::RawHandle;

/// A Response to a dispatched request.
#[derive(Clone)]
pub struct Response {
    data: Option<Body>,
    status: u16,
    status_text: String,
    headers: Headers,
    config: RequestConfig,
    handle: Option<RawHandle>,
}

impl Response {
    pub(crate) fn new(
        data: Option<Body>,
        status: u16,
        status_text: String,
        headers: Headers,
        config: RequestConfig,
        handle: Option<RawHandle>,
    ) -> Response {
        Response {
            data,
            status,
            status_text,
            headers,
            config,
            handle,
        }
    }

    /// Get the transformed body.
    #[inline]
    pub fn data(&self) -> Option<&Body> {
        self.data.as_ref()
    }

    /// Get a mutable reference to the body.
    #[inline]
    pub fn data_mut(&mut self) -> &mut Option<Body> {
        &mut self.data
    }

    /// Take the body.
    #[inline]
    pub fn into_data(self) -> Option<Body> {
        self.data
    }

    /// Get the status code.
    #[inline]
    pub fn status(&self) -> u16 {
        self.status
    }

    /// Get the reason phrase.
    #[inline]
    pub fn status_text(&self) -> &str {
        &self.status_text
    }

    /// Get the response headers.
    #[inline]
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Get a mutable reference to the response headers.
    #[inline]
    pub fn headers_mut(&mut self) -> &mut Headers {
        &mut self.headers
    }

    /// The config that produced this response.
    #[inline]
    pub fn config(&self) -> &RequestConfig {
        &self.config
    }

    /// The transport's handle for this request, if it provided one.
    #[inline]
    pub fn raw_handle(&self) -> Option<&RawHandle> {
        self.handle.as_ref()
    }

    /// Deserialize a JSON body into `T`.
    ///
    /// Returns `None` if the body is not JSON or does not fit `T`.
    pub fn json<T: DeserializeOwned>(&self) -> Option<T> {
        match self.data {
            Some(Body::Json(ref value)) => T::deserialize(value).ok(),
            Some(Body::Text(ref text)) => serde_json::from_str(text).ok(),
            _ => None,
        }
    }
}

impl fmt::Debug for Response {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Response")
            .field("url", &self.config.url())
            .field("status", &self.status)
            .field("headers", &self.headers)
            .finish()
    }
}
