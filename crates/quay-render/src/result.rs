//! Result values produced by application code.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::headers::{Cookie, Headers};

/// The closed set of result kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultKind {
    /// Redirect to another URL.
    Redirect,
    /// Render a template.
    Render,
    /// Send a file.
    File,
}

impl ResultKind {
    /// Every kind, in registration order.
    pub const ALL: [Self; 3] = [Self::Redirect, Self::Render, Self::File];
}

impl fmt::Display for ResultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Redirect => write!(f, "redirect"),
            Self::Render => write!(f, "render"),
            Self::File => write!(f, "file"),
        }
    }
}

/// Which base directory of an application a file result is served from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageArea {
    /// The application's public directory.
    #[default]
    Public,
    /// The application's private directory.
    Private,
}

/// Redirect to `url`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Redirect {
    /// Target URL.
    pub url: String,
    /// Headers added to the response.
    pub headers: Headers,
    /// Cookies added to the response.
    pub cookies: Vec<Cookie>,
}

impl Redirect {
    /// Redirect to `url`.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }
}

/// Render the template `template` with `attributes`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Render {
    /// Application-scoped template identifier.
    pub template: String,
    /// Attributes merged into the template model last.
    pub attributes: Map<String, Value>,
    /// Headers added to the response.
    pub headers: Headers,
    /// Cookies added to the response.
    pub cookies: Vec<Cookie>,
}

impl Render {
    /// Render `template` with no attributes.
    #[must_use]
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
            ..Default::default()
        }
    }

    /// Add an attribute.
    #[must_use]
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }
}

/// Send the file at `path` from `area`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FileDownload {
    /// Path relative to the storage area's base directory.
    pub path: PathBuf,
    /// Which base directory `path` is under.
    pub area: StorageArea,
    /// Headers added to the response.
    pub headers: Headers,
    /// Cookies added to the response.
    pub cookies: Vec<Cookie>,
}

impl FileDownload {
    /// Send `path` from `area`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, area: StorageArea) -> Self {
        Self {
            path: path.into(),
            area,
            ..Default::default()
        }
    }
}

/// The outcome of handling one request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ResultValue {
    /// Redirect to another URL.
    Redirect(Redirect),
    /// Render a template.
    Render(Render),
    /// Send a file.
    File(FileDownload),
}

impl ResultValue {
    /// The kind tag.
    #[must_use]
    pub fn kind(&self) -> ResultKind {
        match self {
            Self::Redirect(_) => ResultKind::Redirect,
            Self::Render(_) => ResultKind::Render,
            Self::File(_) => ResultKind::File,
        }
    }

    /// Headers carried by the result.
    #[must_use]
    pub fn headers(&self) -> &Headers {
        match self {
            Self::Redirect(r) => &r.headers,
            Self::Render(r) => &r.headers,
            Self::File(r) => &r.headers,
        }
    }

    /// Mutable headers carried by the result.
    pub fn headers_mut(&mut self) -> &mut Headers {
        match self {
            Self::Redirect(r) => &mut r.headers,
            Self::Render(r) => &mut r.headers,
            Self::File(r) => &mut r.headers,
        }
    }

    /// Cookies carried by the result.
    #[must_use]
    pub fn cookies(&self) -> &[Cookie] {
        match self {
            Self::Redirect(r) => &r.cookies,
            Self::Render(r) => &r.cookies,
            Self::File(r) => &r.cookies,
        }
    }

    /// Mutable cookies carried by the result.
    pub fn cookies_mut(&mut self) -> &mut Vec<Cookie> {
        match self {
            Self::Redirect(r) => &mut r.cookies,
            Self::Render(r) => &mut r.cookies,
            Self::File(r) => &mut r.cookies,
        }
    }

    /// Set a header on the result.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers_mut().set(name, value);
        self
    }

    /// Add a cookie to the result.
    #[must_use]
    pub fn with_cookie(mut self, cookie: Cookie) -> Self {
        self.cookies_mut().push(cookie);
        self
    }
}

impl From<Redirect> for ResultValue {
    fn from(value: Redirect) -> Self {
        Self::Redirect(value)
    }
}

impl From<Render> for ResultValue {
    fn from(value: Render) -> Self {
        Self::Render(value)
    }
}

impl From<FileDownload> for ResultValue {
    fn from(value: FileDownload) -> Self {
        Self::File(value)
    }
}
