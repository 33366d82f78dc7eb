use super::error::RouterError;
use super::pattern::{COLON, SLASH, STAR};
use super::{Node, NodeId, NodeKind, Router, ROOT};

use std::mem;

use smallvec::smallvec;

/// Byte length of the longest common prefix, always on a char boundary.
fn longest_common_prefix(a: &str, b: &str) -> usize {
    a.char_indices()
        .zip(b.chars())
        .find(|&((_, x), y)| x != y)
        .map_or_else(|| a.len().min(b.len()), |((i, _), _)| i)
}

/// Returns the first wildcard segment in `path` and its byte offset.
///
/// Only a `:` or `*` opening a segment starts a wildcard. `after_slash` tells
/// whether `path` itself begins right after a `/`.
fn find_wildcard(path: &str, after_slash: bool) -> Option<(&str, usize)> {
    let mut at_segment_start = after_slash;
    for (start, c) in path.char_indices() {
        if at_segment_start && (c == COLON || c == STAR) {
            let rest = &path[start..];
            let end = rest.find(SLASH).unwrap_or(rest.len());
            return Some((&rest[..end], start));
        }
        at_segment_start = c == SLASH;
    }
    None
}

/// Whether the tail `path` of `full_path` begins a new segment.
fn starts_segment(full_path: &str, path: &str) -> bool {
    let offset = full_path.len() - path.len();
    full_path[..offset].ends_with(SLASH)
}

fn first_char(s: &str) -> char {
    s.chars().next().unwrap_or_default()
}

impl<T> Router<T> {
    fn push_node(&mut self, node: Node) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(node);
        id
    }

    /// Appends a child, keeping the wildcard child at the end.
    fn add_child(&mut self, parent: NodeId, child: NodeId) {
        let n = &mut self.nodes[parent];
        if n.wild_child && !n.children.is_empty() {
            let last = n.children.len() - 1;
            n.children.insert(last, child);
        } else {
            n.children.push(child);
        }
    }

    /// Bumps the priority of the child at `pos` and moves it ahead of every
    /// sibling with a strictly lower priority. Returns the new position.
    fn increment_child_prio(&mut self, parent: NodeId, pos: usize) -> usize {
        let child = self.nodes[parent].children[pos];
        self.nodes[child].priority += 1;
        let prio = self.nodes[child].priority;

        let mut new_pos = pos;
        while new_pos > 0 {
            let prev = self.nodes[parent].children[new_pos - 1];
            if self.nodes[prev].priority >= prio {
                break;
            }
            new_pos -= 1;
        }

        if new_pos != pos {
            let n = &mut self.nodes[parent];
            n.children[new_pos..=pos].rotate_right(1);
            n.indices[new_pos..=pos].rotate_right(1);
        }
        new_pos
    }

    /// Splits `n` at byte `i`: the node keeps `path[..i]` and a new static
    /// child takes over the rest along with everything `n` carried.
    fn split_node(&mut self, n: NodeId, i: usize) {
        let node = &mut self.nodes[n];
        let suffix: Box<str> = node.path[i..].into();
        let first = first_char(&suffix);
        let child = Node {
            path: suffix,
            indices: mem::take(&mut node.indices),
            children: mem::take(&mut node.children),
            wild_child: mem::replace(&mut node.wild_child, false),
            kind: NodeKind::Static,
            priority: node.priority - 1,
            value: node.value.take(),
        };
        node.path = node.path[..i].into();
        node.indices = smallvec![first];

        let id = self.push_node(child);
        self.nodes[n].children = smallvec![id];
    }

    /// Walks the tree along a canonical pattern, creating nodes as needed,
    /// and returns the node that should carry the route's value.
    ///
    /// Priorities are bumped along the way, so the caller must roll the arena
    /// back when this fails.
    pub(super) fn add_route(&mut self, full_path: &str) -> Result<NodeId, RouterError> {
        let mut path = full_path;
        let mut n = ROOT;
        self.nodes[n].priority += 1;

        if self.nodes[n].path.is_empty() && self.nodes[n].children.is_empty() {
            return self.insert_child(n, path, full_path);
        }

        loop {
            let i = longest_common_prefix(path, &self.nodes[n].path);

            if i < self.nodes[n].path.len() {
                self.split_node(n, i);
            }

            if i == path.len() {
                if self.nodes[n].value.is_some() {
                    return Err(RouterError::DuplicateRoute {
                        pattern: full_path.to_owned(),
                    });
                }
                return Ok(n);
            }

            path = &path[i..];
            let c = first_char(path);

            // a param is always followed by a single "/..." child
            if self.nodes[n].kind == NodeKind::Param
                && c == SLASH
                && self.nodes[n].children.len() == 1
            {
                n = self.nodes[n].children[0];
                self.nodes[n].priority += 1;
                continue;
            }

            if let Some(pos) = self.nodes[n].indices.iter().position(|&idx| idx == c) {
                let pos = self.increment_child_prio(n, pos);
                n = self.nodes[n].children[pos];
                continue;
            }

            let wildcard = (c == COLON || c == STAR) && starts_segment(full_path, path);
            if !wildcard && self.nodes[n].kind != NodeKind::CatchAll {
                let child = self.push_node(Node::new(NodeKind::Static));
                self.nodes[n].indices.push(c);
                self.add_child(n, child);
                let pos = self.nodes[n].indices.len() - 1;
                self.increment_child_prio(n, pos);
                n = child;
            } else if self.nodes[n].wild_child {
                let last = self.nodes[n].children.len() - 1;
                n = self.nodes[n].children[last];
                self.nodes[n].priority += 1;

                let wild = &self.nodes[n];
                if wild.kind == NodeKind::CatchAll && *wild.path == *path && wild.value.is_some() {
                    return Err(RouterError::DuplicateRoute {
                        pattern: full_path.to_owned(),
                    });
                }

                // same wildcard, and not a longer name such as `:name` vs `:names`
                let same_wildcard = wild.kind != NodeKind::CatchAll
                    && path.starts_with(&*wild.path)
                    && path[wild.path.len()..]
                        .chars()
                        .next()
                        .map_or(true, |c| c == SLASH);
                if same_wildcard {
                    continue;
                }

                return Err(self.wildcard_conflict(n, path, full_path));
            }

            return self.insert_child(n, path, full_path);
        }
    }

    fn wildcard_conflict(&self, wild: NodeId, path: &str, full_path: &str) -> RouterError {
        let wild = &self.nodes[wild];
        let segment = if wild.kind == NodeKind::CatchAll {
            path
        } else {
            path.split(SLASH).next().unwrap_or(path)
        };
        let head = full_path.find(segment).map_or("", |i| &full_path[..i]);
        RouterError::WildcardConflict {
            segment: segment.to_owned(),
            pattern: full_path.to_owned(),
            wildcard: wild.path.to_string(),
            prefix: format!("{}{}", head, wild.path),
        }
    }

    /// Builds the chain of nodes for the unmatched tail `path` below `n`.
    fn insert_child(
        &mut self,
        mut n: NodeId,
        mut path: &str,
        full_path: &str,
    ) -> Result<NodeId, RouterError> {
        while let Some((wildcard, i)) = find_wildcard(path, starts_segment(full_path, path)) {
            if wildcard.starts_with(COLON) {
                if i > 0 {
                    self.nodes[n].path = path[..i].into();
                    path = &path[i..];
                }

                let child = self.push_node(Node {
                    path: wildcard.into(),
                    ..Node::new(NodeKind::Param)
                });
                self.add_child(n, child);
                self.nodes[n].wild_child = true;
                n = child;
                self.nodes[n].priority += 1;

                if wildcard.len() < path.len() {
                    path = &path[wildcard.len()..];
                    let child = self.push_node(Node {
                        priority: 1,
                        ..Node::new(NodeKind::Static)
                    });
                    self.add_child(n, child);
                    n = child;
                    continue;
                }

                return Ok(n);
            }

            // catch-all: the preceding '/' moves into the holder node
            let node = &self.nodes[n];
            let slash = match i.checked_sub(1) {
                Some(slash) if !node.path.ends_with(SLASH) => slash,
                _ => {
                    let segment = node
                        .children
                        .first()
                        .map(|&c| &*self.nodes[c].path)
                        .and_then(|p| p.split(SLASH).next())
                        .unwrap_or("");
                    return Err(RouterError::CatchAllConflict {
                        wildcard: path.to_owned(),
                        segment: segment.to_owned(),
                        pattern: full_path.to_owned(),
                        prefix: format!("{}{}", node.path, segment),
                    });
                }
            };

            self.nodes[n].path = path[..slash].into();

            let container = self.push_node(Node {
                wild_child: true,
                priority: 1,
                ..Node::new(NodeKind::CatchAll)
            });
            self.add_child(n, container);
            self.nodes[n].indices = smallvec![SLASH];

            let holder = self.push_node(Node {
                path: path[slash..].into(),
                priority: 1,
                ..Node::new(NodeKind::CatchAll)
            });
            self.nodes[container].children.push(holder);

            return Ok(holder);
        }

        self.nodes[n].path = path.into();
        Ok(n)
    }
}
