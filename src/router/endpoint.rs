use std::sync::Arc;

/// The data attached to one registered pattern.
#[derive(Debug)]
pub(super) struct Endpoint<T> {
    pub(super) data: T,
    /// The canonical pattern this endpoint was registered under.
    pub(super) full_path: Arc<str>,
}

impl<T> Endpoint<T> {
    pub(super) fn new(data: T, full_path: String) -> Self {
        Self {
            data,
            full_path: full_path.into(),
        }
    }
}
