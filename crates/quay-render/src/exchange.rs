//! The request/response pair a responder works on.
//!
//! The transport owns the real connection; it fills in a [`Request`] and a
//! [`Session`], hands the [`Exchange`] to dispatch, and writes out whatever
//! ends up in the [`Response`].

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::headers::{Cookie, Headers};

/// Incoming request data exposed to templates.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Request {
    /// HTTP method.
    pub method: String,
    /// Request path.
    pub path: String,
    /// Query and form parameters.
    pub parameters: Map<String, Value>,
}

impl Request {
    /// A request for `path` with `method`.
    #[must_use]
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
            parameters: Map::new(),
        }
    }

    /// Add a parameter.
    #[must_use]
    pub fn with_parameter(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.parameters.insert(name.into(), value.into());
        self
    }
}

/// The visitor's session as seen by responders.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Session {
    /// Session identifier, sent in the session cookie.
    pub id: Uuid,
    /// When the session was created.
    pub created_at: DateTime<Utc>,
    /// Preferred locale, if the visitor chose one.
    pub locale: Option<String>,
    /// Error messages accumulated for the next rendered page.
    pub errors: Vec<String>,
    #[serde(skip)]
    fresh: bool,
}

impl Session {
    /// A session created by this request. Its cookie has not been sent yet.
    #[must_use]
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            locale: None,
            errors: Vec::new(),
            fresh: true,
        }
    }

    /// A session restored from an earlier request.
    #[must_use]
    pub fn existing(id: Uuid, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            created_at,
            locale: None,
            errors: Vec::new(),
            fresh: false,
        }
    }

    /// Set the preferred locale.
    #[must_use]
    pub fn with_locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = Some(locale.into());
        self
    }

    /// Record an error message for the next rendered page.
    pub fn push_error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }

    /// Whether the session was created by this request and its cookie has
    /// not been emitted.
    #[must_use]
    pub fn is_new(&self) -> bool {
        self.fresh
    }

    /// Note that the session cookie has been emitted.
    pub fn mark_cookie_sent(&mut self) {
        self.fresh = false;
    }

    /// Drop the accumulated error context.
    pub fn clear_errors(&mut self) {
        self.errors.clear();
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

/// Response body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Body {
    /// No body.
    #[default]
    Empty,
    /// In-memory bytes.
    Bytes(Vec<u8>),
    /// Stream this file from disk.
    File(PathBuf),
}

/// Mutable response under construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// Status code.
    pub status: u16,
    /// Response headers.
    pub headers: Headers,
    /// Cookies to set.
    pub cookies: Vec<Cookie>,
    /// Response body.
    pub body: Body,
}

impl Default for Response {
    fn default() -> Self {
        Self {
            status: 200,
            headers: Headers::new(),
            cookies: Vec::new(),
            body: Body::Empty,
        }
    }
}

impl Response {
    /// Body bytes as UTF-8 text, if the body is in memory.
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        match &self.body {
            Body::Bytes(bytes) => std::str::from_utf8(bytes).ok(),
            _ => None,
        }
    }
}

/// One request being served.
#[derive(Debug, Clone, Default)]
pub struct Exchange {
    /// The incoming request.
    pub request: Request,
    /// The visitor's session.
    pub session: Session,
    /// Named values computed by application code for the template model.
    pub beans: Map<String, Value>,
    /// The response being built.
    pub response: Response,
}

impl Exchange {
    /// Create an exchange for `request` within `session`.
    #[must_use]
    pub fn new(request: Request, session: Session) -> Self {
        Self {
            request,
            session,
            beans: Map::new(),
            response: Response::default(),
        }
    }

    /// Add a computed bean.
    #[must_use]
    pub fn with_bean(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.beans.insert(name.into(), value.into());
        self
    }
}
