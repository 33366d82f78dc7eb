#![forbid(unsafe_code)]

mod router_macro;

use crate::router::{Captures, Match, Router, RouterError};

pub use http::Method;

/// One radix tree per HTTP method.
///
/// Trees are kept in the order their method was first registered, which is
/// also the order [`HttpRouter::allowed_methods`] reports.
#[derive(Debug)]
pub struct HttpRouter<T> {
    trees: Vec<(Method, Router<T>)>,
}

impl<T> Default for HttpRouter<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> HttpRouter<T> {
    pub fn new() -> Self {
        Self { trees: Vec::new() }
    }

    pub fn router(&self, method: &Method) -> Option<&Router<T>> {
        self.trees
            .iter()
            .find_map(|(m, r)| if m == method { Some(r) } else { None })
    }

    pub fn find<'a>(&'a self, method: &Method, path: &'a str) -> Option<(&'a T, Captures<'a>)> {
        self.router(method)?.find(path)
    }

    pub fn lookup<'a>(&'a self, method: &Method, path: &'a str) -> Match<'a, T> {
        match self.router(method) {
            Some(router) => router.lookup(path),
            None => Match::NotFound,
        }
    }

    pub fn insert(&mut self, method: Method, pattern: &str, data: T) -> &mut Self {
        self.access_router(method).insert(pattern, data);
        self
    }

    pub fn try_insert(
        &mut self,
        method: Method,
        pattern: &str,
        data: T,
    ) -> Result<&mut Self, RouterError> {
        self.access_router(method).try_insert(pattern, data)?;
        Ok(self)
    }

    /// Methods other than `except` whose tree matches `path`.
    pub fn allowed_methods<'a>(&'a self, path: &str, except: &Method) -> Vec<&'a Method> {
        self.trees
            .iter()
            .filter(|(m, r)| m != except && r.find(path).is_some())
            .map(|(m, _)| m)
            .collect()
    }

    pub fn methods(&self) -> impl Iterator<Item = &Method> + '_ {
        self.trees.iter().map(|(m, _)| m)
    }

    /// Every route as `(method, pattern, data)`, grouped by method.
    pub fn routes(&self) -> impl Iterator<Item = (&Method, &str, &T)> + '_ {
        self.trees
            .iter()
            .flat_map(|(m, r)| r.routes().map(move |(p, d)| (m, p, d)))
    }

    pub fn len(&self) -> usize {
        self.trees.iter().map(|(_, r)| r.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T> HttpRouter<T> {
    fn access_router(&mut self, method: Method) -> &mut Router<T> {
        let pos = match self.trees.iter().position(|(m, _)| *m == method) {
            Some(pos) => pos,
            None => {
                self.trees.push((method, Router::new()));
                self.trees.len() - 1
            }
        };
        &mut self.trees[pos].1
    }
}
