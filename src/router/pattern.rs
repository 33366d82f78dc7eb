use super::error::RouterError;

use std::fmt;

use smallvec::SmallVec;

pub(super) const COLON: char = ':';
pub(super) const STAR: char = '*';
pub(super) const SLASH: char = '/';

/// One `/`-separated piece of a route pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment<'a> {
    /// Matches the text exactly.
    Static(&'a str),
    /// `:name`, matches exactly one non-empty path segment.
    Param(&'a str),
    /// `*name`, matches the non-empty remainder of the path.
    CatchAll(&'a str),
}

impl fmt::Display for Segment<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::Static(s) => f.write_str(s),
            Segment::Param(name) => write!(f, "{}{}", COLON, name),
            Segment::CatchAll(name) => write!(f, "{}{}", STAR, name),
        }
    }
}

/// Splits a pattern into its segments.
///
/// Empty segments are discarded, so `//` collapses. A catch-all segment ends
/// the segmentation: anything after it is ignored.
pub fn parse_pattern(pattern: &str) -> SmallVec<[Segment<'_>; 8]> {
    let mut segments: SmallVec<[Segment<'_>; 8]> = SmallVec::new();
    for part in pattern.split(SLASH).filter(|p| !p.is_empty()) {
        if let Some(name) = part.strip_prefix(COLON) {
            segments.push(Segment::Param(name));
        } else if let Some(name) = part.strip_prefix(STAR) {
            segments.push(Segment::CatchAll(name));
            break;
        } else {
            segments.push(Segment::Static(part));
        }
    }
    segments
}

/// A validated route pattern.
///
/// Its `Display` form is the canonical pattern stored in the tree: one
/// leading slash, single slashes between segments, and the trailing slash of
/// the source pattern kept unless the pattern ends in a catch-all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern<'a> {
    segments: SmallVec<[Segment<'a>; 8]>,
    trailing_slash: bool,
}

impl<'a> Pattern<'a> {
    pub fn parse(pattern: &'a str) -> Result<Self, RouterError> {
        if !pattern.starts_with(SLASH) {
            return Err(RouterError::MissingLeadingSlash {
                pattern: pattern.to_owned(),
            });
        }

        let segments = parse_pattern(pattern);

        for segment in &segments {
            // `:` and `*` inside a static segment are plain text
            let (name, text) = match *segment {
                Segment::Static(_) => continue,
                Segment::Param(name) | Segment::CatchAll(name) => (name, segment.to_string()),
            };
            if name.is_empty() {
                return Err(RouterError::EmptyWildcardName {
                    pattern: pattern.to_owned(),
                });
            }
            if name.contains(&[COLON, STAR][..]) {
                return Err(RouterError::InvalidWildcard {
                    segment: text,
                    pattern: pattern.to_owned(),
                });
            }
        }

        let ends_with_catch_all = matches!(segments.last(), Some(Segment::CatchAll(_)));
        let trailing_slash = !ends_with_catch_all && pattern.len() > 1 && pattern.ends_with(SLASH);

        Ok(Self {
            segments,
            trailing_slash,
        })
    }

    pub fn segments(&self) -> &[Segment<'a>] {
        &self.segments
    }
}

impl fmt::Display for Pattern<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() {
            return f.write_str("/");
        }
        for segment in &self.segments {
            write!(f, "{}{}", SLASH, segment)?;
        }
        if self.trailing_slash {
            f.write_str("/")?;
        }
        Ok(())
    }
}
