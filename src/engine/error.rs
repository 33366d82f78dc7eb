use std::error::Error as StdError;
use std::fmt;
use std::ops::{BitOr, BitOrAssign};

use serde_json::{json, Map, Value};

/// Classification of a per-request [`Error`], a set of bit flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ErrorType(u64);

impl ErrorType {
    /// Binding failed.
    pub const BIND: Self = Self(1 << 63);
    /// Rendering failed.
    pub const RENDER: Self = Self(1 << 62);
    pub const PRIVATE: Self = Self(1 << 0);
    pub const PUBLIC: Self = Self(1 << 1);
    pub const ANY: Self = Self(u64::MAX);

    pub const fn bits(self) -> u64 {
        self.0
    }

    /// Whether the two sets share a flag.
    pub const fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }
}

impl BitOr for ErrorType {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for ErrorType {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

/// An error attached to a request context.
#[derive(Debug)]
pub struct Error {
    pub err: Box<dyn StdError + Send + Sync>,
    pub kind: ErrorType,
    pub meta: Option<Value>,
}

impl Error {
    pub fn new(err: impl Into<Box<dyn StdError + Send + Sync>>, kind: ErrorType) -> Self {
        Self {
            err: err.into(),
            kind,
            meta: None,
        }
    }

    pub fn set_type(&mut self, kind: ErrorType) -> &mut Self {
        self.kind = kind;
        self
    }

    pub fn set_meta(&mut self, meta: Value) -> &mut Self {
        self.meta = Some(meta);
        self
    }

    pub fn is_type(&self, kind: ErrorType) -> bool {
        self.kind.intersects(kind)
    }

    /// JSON form: an object meta is merged with an `error` message key,
    /// any other meta is nested under `meta`.
    pub fn to_json(&self) -> Value {
        let mut obj = Map::new();
        match &self.meta {
            Some(Value::Object(meta)) => obj.extend(meta.clone()),
            Some(meta) => {
                obj.insert("meta".to_owned(), meta.clone());
            }
            None => {}
        }
        obj.entry("error")
            .or_insert_with(|| Value::String(self.err.to_string()));
        Value::Object(obj)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.err, f)
    }
}

/// The ordered error list of one request.
#[derive(Debug, Default)]
pub struct Errors {
    list: Vec<Error>,
}

impl Errors {
    pub fn len(&self) -> usize {
        self.list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Error> {
        self.list.iter()
    }

    pub fn last(&self) -> Option<&Error> {
        self.list.last()
    }

    pub fn by_type(&self, kind: ErrorType) -> Vec<&Error> {
        self.list.iter().filter(|e| e.is_type(kind)).collect()
    }

    pub fn messages(&self) -> Vec<String> {
        self.list.iter().map(|e| e.err.to_string()).collect()
    }

    /// `null` when empty, a single object for one error, an array otherwise.
    pub fn to_json(&self) -> Value {
        match self.list.as_slice() {
            [] => Value::Null,
            [e] => e.to_json(),
            list => json!(list.iter().map(Error::to_json).collect::<Vec<_>>()),
        }
    }

    pub(crate) fn push(&mut self, error: Error) -> &mut Error {
        self.list.push(error);
        let last = self.list.len() - 1;
        &mut self.list[last]
    }

    pub(crate) fn clear(&mut self) {
        self.list.clear();
    }
}

impl fmt::Display for Errors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, e) in self.list.iter().enumerate() {
            writeln!(f, "Error #{:02}: {}", i + 1, e.err)?;
            if let Some(meta) = &e.meta {
                writeln!(f, "     Meta: {}", meta)?;
            }
        }
        Ok(())
    }
}

impl<'a> IntoIterator for &'a Errors {
    type Item = &'a Error;
    type IntoIter = std::slice::Iter<'a, Error>;
    fn into_iter(self) -> Self::IntoIter {
        self.list.iter()
    }
}
