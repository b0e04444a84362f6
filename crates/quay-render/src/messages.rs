//! Localized message lookup.
//!
//! Bundles map message keys to patterns such as `Hello, {0}!`. A lookup for
//! `en-US` tries `en-US`, then `en`, then the default locale. Compiled
//! formats are cached per `(key, locale)`, each behind its own mutex, so
//! concurrent lookups of different keys never contend.

use std::collections::HashMap;
use std::fmt::Write;
use std::sync::{Arc, Mutex, PoisonError};

use dashmap::DashMap;
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Arg(usize),
}

/// A compiled message pattern.
///
/// Placeholders are `{n}` with a zero-based argument index. `''` is a
/// literal quote and text between single quotes is copied verbatim.
/// Placeholders without a matching argument are kept as written.
#[derive(Debug)]
pub struct MessageFormat {
    segments: Vec<Segment>,
    buffer: String,
}

impl MessageFormat {
    /// Compile `pattern`.
    #[must_use]
    pub fn compile(pattern: &str) -> Self {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut chars = pattern.chars().peekable();
        let mut quoted = false;

        while let Some(c) = chars.next() {
            match c {
                '\'' if chars.peek() == Some(&'\'') => {
                    chars.next();
                    literal.push('\'');
                },
                '\'' => quoted = !quoted,
                '{' if !quoted => {
                    let mut digits = String::new();
                    while let Some(&d) = chars.peek() {
                        if d == '}' {
                            break;
                        }
                        digits.push(d);
                        chars.next();
                    }
                    let closed = chars.next() == Some('}');
                    match digits.trim().parse::<usize>() {
                        Ok(index) if closed => {
                            if !literal.is_empty() {
                                segments.push(Segment::Literal(std::mem::take(&mut literal)));
                            }
                            segments.push(Segment::Arg(index));
                        },
                        _ => {
                            literal.push('{');
                            literal.push_str(&digits);
                            if closed {
                                literal.push('}');
                            }
                        },
                    }
                },
                other => literal.push(other),
            }
        }
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        Self {
            segments,
            buffer: String::new(),
        }
    }

    /// Format with `args`, reusing the internal buffer.
    pub fn format(&mut self, args: &[&str]) -> String {
        self.buffer.clear();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => self.buffer.push_str(text),
                Segment::Arg(index) => match args.get(*index) {
                    Some(arg) => self.buffer.push_str(arg),
                    None => {
                        let _ = write!(self.buffer, "{{{index}}}");
                    },
                },
            }
        }
        self.buffer.clone()
    }
}

/// Message bundles for every locale an application ships.
#[derive(Debug)]
pub struct MessageSource {
    default_locale: String,
    bundles: HashMap<String, HashMap<String, String>>,
    formats: DashMap<(String, String), Arc<Mutex<MessageFormat>>>,
}

impl MessageSource {
    /// Create an empty source falling back to `default_locale`.
    #[must_use]
    pub fn new(default_locale: impl Into<String>) -> Self {
        Self {
            default_locale: default_locale.into(),
            bundles: HashMap::new(),
            formats: DashMap::new(),
        }
    }

    /// Add or extend the bundle for `locale`.
    #[must_use]
    pub fn with_bundle<I, K, V>(mut self, locale: impl Into<String>, messages: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let bundle = self.bundles.entry(locale.into()).or_default();
        for (key, value) in messages {
            bundle.insert(key.into(), value.into());
        }
        self
    }

    /// The default locale.
    #[must_use]
    pub fn default_locale(&self) -> &str {
        &self.default_locale
    }

    /// Locales tried for `locale`, most specific first.
    #[must_use]
    pub fn candidates(&self, locale: &str) -> Vec<String> {
        let mut out = vec![locale.to_owned()];
        let mut current = locale;
        while let Some(idx) = current.rfind(['-', '_']) {
            current = current.get(..idx).unwrap_or_default();
            if !current.is_empty() {
                out.push(current.to_owned());
            }
        }
        if !out.iter().any(|l| l == &self.default_locale) {
            out.push(self.default_locale.clone());
        }
        out
    }

    /// Look up `key` for `locale` and format it with `args`.
    #[must_use]
    pub fn lookup(&self, key: &str, locale: &str, args: &[&str]) -> Option<String> {
        let (found_in, pattern) = self.candidates(locale).into_iter().find_map(|l| {
            let pattern = self.bundles.get(&l)?.get(key)?;
            Some((l, pattern))
        })?;

        let format = self
            .formats
            .entry((key.to_owned(), found_in))
            .or_insert_with(|| Arc::new(Mutex::new(MessageFormat::compile(pattern))))
            .clone();

        let mut guard = format.lock().unwrap_or_else(PoisonError::into_inner);
        Some(guard.format(args))
    }

    /// Every message visible from `locale`, with more specific bundles
    /// shadowing less specific ones. Used as the template `messages` model.
    #[must_use]
    pub fn bundle_for(&self, locale: &str) -> Map<String, Value> {
        let mut merged = Map::new();
        for l in self.candidates(locale).iter().rev() {
            if let Some(bundle) = self.bundles.get(l) {
                for (key, value) in bundle {
                    merged.insert(key.clone(), Value::String(value.clone()));
                }
            }
        }
        merged
    }

    /// Number of compiled formats cached.
    #[must_use]
    pub fn cached_formats(&self) -> usize {
        self.formats.len()
    }
}
