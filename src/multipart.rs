//! multipart/form-data
use std::borrow::Cow;
use std::fmt;

use bytes::Bytes;
use mime::Mime;

use crate::error;

/// A multipart/form-data request body.
///
/// The form only records its fields. The transport picks the boundary and
/// writes the `Content-Type` header, which is why any caller-supplied
/// `Content-Type` is dropped for form bodies.
#[derive(Clone, Default, PartialEq)]
pub struct Form {
    fields: Vec<(Cow<'static, str>, Part)>,
}

/// A field in a multipart form.
#[derive(Clone, PartialEq)]
pub struct Part {
    value: Bytes,
    file_name: Option<Cow<'static, str>>,
    mime: Option<Mime>,
}

impl Form {
    /// Creates a new Form without any content.
    pub fn new() -> Form {
        Form::default()
    }

    /// Add a data field with supplied name and value.
    ///
    /// # Examples
    ///
    /// ```
    /// let form = dispatchr::multipart::Form::new()
    ///     .text("username", "seanmonstar")
    ///     .text("password", "secret");
    /// ```
    pub fn text<T, U>(self, name: T, value: U) -> Form
    where
        T: Into<Cow<'static, str>>,
        U: Into<Cow<'static, str>>,
    {
        self.part(name, Part::text(value))
    }

    /// Adds a customized Part.
    pub fn part<T>(mut self, name: T, part: Part) -> Form
    where
        T: Into<Cow<'static, str>>,
    {
        self.fields.push((name.into(), part));
        self
    }

    /// Iterate over `(name, part)` pairs in insertion order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &Part)> {
        self.fields.iter().map(|(name, part)| (name.as_ref(), part))
    }

    /// Returns true if the form has no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl fmt::Debug for Form {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_map().entries(self.fields()).finish()
    }
}

impl Part {
    /// Makes a text parameter.
    pub fn text<T>(value: T) -> Part
    where
        T: Into<Cow<'static, str>>,
    {
        let value = match value.into() {
            Cow::Borrowed(s) => Bytes::from_static(s.as_bytes()),
            Cow::Owned(s) => Bytes::from(s),
        };
        Part {
            value,
            file_name: None,
            mime: None,
        }
    }

    /// Makes a new parameter from arbitrary bytes.
    pub fn bytes<T>(value: T) -> Part
    where
        T: Into<Bytes>,
    {
        Part {
            value: value.into(),
            file_name: None,
            mime: None,
        }
    }

    /// Set the filename.
    pub fn file_name<T>(mut self, filename: T) -> Part
    where
        T: Into<Cow<'static, str>>,
    {
        self.file_name = Some(filename.into());
        self
    }

    /// Tries to set the mime type of this part.
    ///
    /// Fails with a config error if `mime` does not parse as a media type.
    pub fn mime_str(mut self, mime: &str) -> crate::Result<Part> {
        let parsed = mime
            .parse::<Mime>()
            .map_err(|e| error::config(format!("Invalid mime type {mime:?}")).with_source(e))?;
        self.mime = Some(parsed);
        Ok(self)
    }

    /// The raw value of this part.
    pub fn value(&self) -> &[u8] {
        &self.value
    }

    /// The filename, if one was set.
    pub fn filename(&self) -> Option<&str> {
        self.file_name.as_deref()
    }

    /// The mime type, if one was set.
    pub fn mime(&self) -> Option<&str> {
        self.mime.as_ref().map(|m| m.as_ref())
    }
}

impl fmt::Debug for Part {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut dbg = f.debug_struct("Part");
        dbg.field("len", &self.value.len());
        if let Some(ref name) = self.file_name {
            dbg.field("file_name", name);
        }
        if let Some(ref mime) = self.mime {
            dbg.field("mime", mime);
        }
        dbg.finish()
    }
}
