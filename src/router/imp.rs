use super::captures::Captures;
use super::endpoint::Endpoint;
use super::error::RouterError;
use super::find::Match;
use super::pattern::Pattern;
use super::{Node, NodeKind, Router};

impl<T> Router<T> {
    pub fn new() -> Self {
        Self {
            nodes: vec![Node::new(NodeKind::Root)],
            endpoints: Vec::new(),
        }
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
        self.nodes.push(Node::new(NodeKind::Root));
        self.endpoints.clear();
    }

    /// Number of registered routes.
    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }

    /// # Panics
    /// Panics if the pattern is malformed or conflicts with a registered one.
    pub fn insert(&mut self, pattern: &str, data: T) -> &mut Self {
        if let Err(e) = self.try_insert(pattern, data) {
            panic!("{}", e);
        }
        self
    }

    /// Registers `data` under `pattern`.
    ///
    /// On failure the tree is left exactly as it was before the call.
    pub fn try_insert(&mut self, pattern: &str, data: T) -> Result<&mut Self, RouterError> {
        let full_path = Pattern::parse(pattern)?.to_string();

        let snapshot = self.nodes.clone();
        match self.add_route(&full_path) {
            Ok(node) => {
                self.nodes[node].value = Some(self.endpoints.len());
                self.endpoints.push(Endpoint::new(data, full_path));
                Ok(self)
            }
            Err(e) => {
                self.nodes = snapshot;
                Err(e)
            }
        }
    }

    pub fn find<'a>(&'a self, path: &'a str) -> Option<(&'a T, Captures<'a>)> {
        self.walk(path).map(|(ep, captures)| (&ep.data, captures))
    }

    /// Like [`Router::find`], but also reports the registered pattern, and on
    /// a miss whether the path with its trailing slash toggled would match.
    pub fn lookup<'a>(&'a self, path: &'a str) -> Match<'a, T> {
        match self.walk(path) {
            Some((ep, captures)) => Match::Found {
                data: &ep.data,
                captures,
                full_path: &ep.full_path,
            },
            None if self.has_trailing_slash_alternative(path) => Match::TrailingSlashRedirect,
            None => Match::NotFound,
        }
    }

    /// Registered patterns and their data, in registration order.
    pub fn routes(&self) -> impl Iterator<Item = (&str, &T)> + '_ {
        self.endpoints.iter().map(|ep| (&*ep.full_path, &ep.data))
    }
}
