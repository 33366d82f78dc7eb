//! Radix tree router.
//!
//! All nodes live in one arena and refer to their children by index, so the
//! tree can be cloned cheaply during construction and read by any number of
//! threads once built.

mod captures;
mod core;
mod endpoint;
mod error;
mod find;
mod fix_path;
mod imp;
mod pattern;

pub use self::captures::Captures;
pub use self::error::RouterError;
pub use self::find::Match;
pub use self::pattern::{parse_pattern, Pattern, Segment};

use self::endpoint::Endpoint;

use smallvec::SmallVec;

type NodeId = usize;
type EndpointId = usize;

const ROOT: NodeId = 0;

/// A compressed prefix tree holding the routes of one HTTP method.
#[derive(Debug)]
pub struct Router<T> {
    nodes: Vec<Node>,
    endpoints: Vec<Endpoint<T>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NodeKind {
    Static,
    Root,
    Param,
    CatchAll,
}

#[derive(Debug, Clone)]
struct Node {
    /// Literal text shared by every route below this node.
    path: Box<str>,
    /// First character of each static child, aligned with `children`.
    indices: SmallVec<[char; 4]>,
    /// Static children ordered by descending priority, then the wildcard
    /// child (if any) in last position.
    children: SmallVec<[NodeId; 4]>,
    wild_child: bool,
    kind: NodeKind,
    /// Number of routes registered in this subtree.
    priority: u32,
    value: Option<EndpointId>,
}

impl Node {
    fn new(kind: NodeKind) -> Self {
        Self {
            path: "".into(),
            indices: SmallVec::new(),
            children: SmallVec::new(),
            wild_child: false,
            kind,
            priority: 0,
            value: None,
        }
    }
}

impl<T> Default for Router<T> {
    fn default() -> Self {
        Self::new()
    }
}
