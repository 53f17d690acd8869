use std::fmt;

use bytes::Bytes;
use serde_json::Value;

use crate::multipart::Form;

/// A request or response payload.
///
/// The pipeline only looks inside a body to infer a `Content-Type` for JSON
/// documents and to recognize multipart forms; everything else is handed to
/// the transport and the transformers as is.
#[derive(Clone, PartialEq)]
pub enum Body {
    /// A text payload.
    Text(String),
    /// A JSON document, serialized by the default request transform.
    Json(Value),
    /// Raw bytes.
    Bytes(Bytes),
    /// A multipart form; the transport chooses its boundary.
    Form(Form),
}

impl Body {
    /// The text of a `Text` body.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Body::Text(s) => Some(s),
            _ => None,
        }
    }

    /// The document of a `Json` body.
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Body::Json(v) => Some(v),
            _ => None,
        }
    }

    /// The bytes of a `Bytes` body.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Body::Bytes(b) => Some(b),
            _ => None,
        }
    }

    /// Returns true if this is a multipart form.
    pub fn is_form(&self) -> bool {
        matches!(self, Body::Form(_))
    }
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Body::Text(s) => f.debug_tuple("Text").field(s).finish(),
            Body::Json(v) => f.debug_tuple("Json").field(v).finish(),
            Body::Bytes(b) => write!(f, "Bytes({} bytes)", b.len()),
            Body::Form(form) => f.debug_tuple("Form").field(form).finish(),
        }
    }
}

impl From<String> for Body {
    #[inline]
    fn from(s: String) -> Body {
        Body::Text(s)
    }
}

impl From<&'static str> for Body {
    #[inline]
    fn from(s: &'static str) -> Body {
        Body::Text(s.to_owned())
    }
}

impl From<Value> for Body {
    #[inline]
    fn from(v: Value) -> Body {
        Body::Json(v)
    }
}

impl From<Bytes> for Body {
    #[inline]
    fn from(bytes: Bytes) -> Body {
        Body::Bytes(bytes)
    }
}

impl From<Vec<u8>> for Body {
    #[inline]
    fn from(vec: Vec<u8>) -> Body {
        Body::Bytes(vec.into())
    }
}

impl From<Form> for Body {
    #[inline]
    fn from(form: Form) -> Body {
        Body::Form(form)
    }
}

/// How the transport should hand back the response body.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ResponseType {
    /// Decode as UTF-8 text; the default response transform may parse it as JSON.
    #[default]
    Text,
    /// Parse as JSON, falling back to text if parsing fails.
    Json,
    /// Keep the raw bytes.
    Bytes,
}

impl ResponseType {
    pub(crate) fn shape(self, body: Bytes) -> Option<Body> {
        if body.is_empty() && self != ResponseType::Bytes {
            return None;
        }
        match self {
            ResponseType::Bytes => Some(Body::Bytes(body)),
            ResponseType::Json => match serde_json::from_slice(&body) {
                Ok(value) => Some(Body::Json(value)),
                Err(_) => Some(Body::Text(String::from_utf8_lossy(&body).into_owned())),
            },
            ResponseType::Text => Some(Body::Text(String::from_utf8_lossy(&body).into_owned())),
        }
    }
}
