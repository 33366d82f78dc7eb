/// Route construction failure.
///
/// Every variant describes a registration that can never work as intended,
/// so callers are expected to abort startup when they see one.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RouterError {
    #[error("pattern must begin with '/': pattern = {pattern:?}")]
    MissingLeadingSlash { pattern: String },

    #[error("wildcards must be named with a non-empty name: pattern = {pattern:?}")]
    EmptyWildcardName { pattern: String },

    #[error("only one wildcard per path segment is allowed, has {segment:?}: pattern = {pattern:?}")]
    InvalidWildcard { segment: String, pattern: String },

    #[error("handlers are already registered: pattern = {pattern:?}")]
    DuplicateRoute { pattern: String },

    #[error(
        "{segment:?} in new pattern {pattern:?} conflicts with existing wildcard {wildcard:?} in existing prefix {prefix:?}"
    )]
    WildcardConflict {
        segment: String,
        pattern: String,
        wildcard: String,
        prefix: String,
    },

    #[error(
        "catch-all wildcard {wildcard:?} in new pattern {pattern:?} conflicts with existing path segment {segment:?} in existing prefix {prefix:?}"
    )]
    CatchAllConflict {
        wildcard: String,
        segment: String,
        pattern: String,
        prefix: String,
    },
}
