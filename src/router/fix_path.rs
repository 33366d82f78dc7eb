use super::pattern::SLASH;
use super::{NodeId, NodeKind, Router, ROOT};

impl<T> Router<T> {
    /// Finds a registered path that matches `path` when ASCII letters are
    /// compared case-insensitively, and returns it with the casing of the
    /// tree. Parameter values keep the casing of the request.
    ///
    /// With `fix_trailing_slash`, a missing or superfluous trailing slash is
    /// corrected as well.
    pub fn find_case_insensitive_path(&self, path: &str, fix_trailing_slash: bool) -> Option<String> {
        let mut out = String::with_capacity(path.len() + 1);
        if self.fix_node(ROOT, path, &mut out, fix_trailing_slash) {
            Some(out)
        } else {
            None
        }
    }

    fn fix_node(&self, n: NodeId, path: &str, out: &mut String, fix: bool) -> bool {
        let node = &self.nodes[n];
        let mark = out.len();

        let rest = match node.kind {
            NodeKind::Param => {
                let end = path.find(SLASH).unwrap_or(path.len());
                if end == 0 {
                    return false;
                }
                out.push_str(&path[..end]);
                &path[end..]
            }
            NodeKind::CatchAll if !node.wild_child => {
                if node.value.is_none() || path.len() <= 1 || !path.starts_with(SLASH) {
                    return false;
                }
                out.push_str(path);
                return true;
            }
            _ => match path.get(..node.path.len()) {
                Some(head) if head.eq_ignore_ascii_case(&node.path) => {
                    out.push_str(&node.path);
                    &path[node.path.len()..]
                }
                _ => {
                    let missing_slash = fix
                        && node.value.is_some()
                        && node.path.len() == path.len() + 1
                        && node.path.ends_with(SLASH)
                        && node.path[..path.len()].eq_ignore_ascii_case(path);
                    if missing_slash {
                        out.push_str(&node.path);
                    }
                    return missing_slash;
                }
            },
        };

        if rest.is_empty() {
            if node.value.is_some() {
                return true;
            }
            if fix && self.has_slash_leaf(n) {
                out.push(SLASH);
                return true;
            }
            out.truncate(mark);
            return false;
        }

        let c = rest.chars().next().unwrap_or_default();
        let statics = node.children.len() - usize::from(node.wild_child);
        for (pos, &child) in node.children[..statics].iter().enumerate() {
            let candidate = node.kind == NodeKind::Param
                || node
                    .indices
                    .get(pos)
                    .map_or(false, |idx| idx.eq_ignore_ascii_case(&c));
            if candidate && self.fix_node(child, rest, out, fix) {
                return true;
            }
        }

        if node.wild_child && self.fix_node(node.children[statics], rest, out, fix) {
            return true;
        }

        if fix && rest == "/" && node.value.is_some() {
            return true;
        }

        out.truncate(mark);
        false
    }

    fn has_slash_leaf(&self, n: NodeId) -> bool {
        let node = &self.nodes[n];
        node.children.iter().enumerate().any(|(pos, &child)| {
            let indexed = node.kind == NodeKind::Param || node.indices.get(pos) == Some(&SLASH);
            let child = &self.nodes[child];
            indexed && &*child.path == "/" && child.value.is_some()
        })
    }
}
