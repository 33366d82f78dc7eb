use super::captures::Captures;
use super::endpoint::Endpoint;
use super::pattern::SLASH;
use super::{NodeId, NodeKind, Router, ROOT};

use smallvec::SmallVec;

/// The outcome of a lookup.
#[derive(Debug)]
pub enum Match<'a, T> {
    Found {
        data: &'a T,
        captures: Captures<'a>,
        /// The pattern the route was registered under.
        full_path: &'a str,
    },
    /// No route matched, but one exists for the same path with the trailing
    /// slash added or removed.
    TrailingSlashRedirect,
    NotFound,
}

impl<'a, T> Match<'a, T> {
    pub fn is_found(&self) -> bool {
        matches!(self, Match::Found { .. })
    }
}

/// A node whose static child was taken although its wildcard child could
/// also have matched.
struct Skipped<'a> {
    path: &'a str,
    node: NodeId,
    captures: usize,
}

impl<T> Router<T> {
    pub(super) fn walk<'a>(&'a self, path: &'a str) -> Option<(&'a Endpoint<T>, Captures<'a>)> {
        let mut path = path;
        let mut n = ROOT;
        let mut captures = Captures::new();
        let mut skipped: SmallVec<[Skipped<'a>; 4]> = SmallVec::new();
        let mut statics_done = false;

        macro_rules! backtrack {
            () => {
                match skipped.pop() {
                    Some(s) => {
                        path = s.path;
                        n = s.node;
                        captures.buf.truncate(s.captures);
                        statics_done = true;
                        continue;
                    }
                    None => return None,
                }
            };
        }

        loop {
            let node = &self.nodes[n];

            let rest = match path.strip_prefix(&*node.path) {
                Some(rest) => rest,
                None => backtrack!(),
            };

            if rest.is_empty() {
                if let Some(id) = node.value {
                    return Some((&self.endpoints[id], captures));
                }
                backtrack!();
            }

            if !statics_done {
                let c = rest.chars().next().unwrap_or_default();
                if let Some(pos) = node.indices.iter().position(|&idx| idx == c) {
                    if node.wild_child {
                        skipped.push(Skipped {
                            path,
                            node: n,
                            captures: captures.len(),
                        });
                    }
                    path = rest;
                    n = node.children[pos];
                    continue;
                }
            }
            statics_done = false;

            if !node.wild_child {
                backtrack!();
            }

            let child = &self.nodes[node.children[node.children.len() - 1]];
            match child.kind {
                NodeKind::Param => {
                    let end = rest.find(SLASH).unwrap_or(rest.len());
                    if end == 0 {
                        backtrack!();
                    }
                    captures.buf.push((&child.path[1..], &rest[..end]));

                    if end < rest.len() {
                        match child.children.first() {
                            Some(&next) => {
                                path = &rest[end..];
                                n = next;
                                continue;
                            }
                            None => backtrack!(),
                        }
                    }

                    if let Some(id) = child.value {
                        return Some((&self.endpoints[id], captures));
                    }
                    backtrack!();
                }
                NodeKind::CatchAll => {
                    let value = match rest.strip_prefix(SLASH) {
                        Some(value) if !value.is_empty() => value,
                        _ => backtrack!(),
                    };
                    if let Some(id) = child.value {
                        captures.buf.push((&child.path[2..], value));
                        return Some((&self.endpoints[id], captures));
                    }
                    backtrack!();
                }
                NodeKind::Static | NodeKind::Root => backtrack!(),
            }
        }
    }

    /// Whether the path with its trailing slash added or removed would match.
    pub(super) fn has_trailing_slash_alternative(&self, path: &str) -> bool {
        match path.strip_suffix(SLASH) {
            Some(trimmed) if !trimmed.is_empty() => self.walk(trimmed).is_some(),
            _ => {
                let alt = format!("{}{}", path, SLASH);
                let found = self.walk(&alt).is_some();
                found
            }
        }
    }
}
