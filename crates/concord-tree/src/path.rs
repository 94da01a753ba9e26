//! Dotted config paths
//!
//! Provides [`ConfigPath`] for addressing locations in a config tree, e.g.
//! `sections.3f2a.name`. Segments are drawn from the UID alphabet
//! (`[A-Za-z0-9_-]`), so path strings never contain an unescaped delimiter.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// Path within a config tree
///
/// Hierarchical addressing using string segments joined by `.`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ConfigPath(Vec<String>);

impl ConfigPath {
    /// Create new path from segments
    ///
    /// Segments are trusted here; use [`FromStr`] to validate.
    #[inline]
    #[must_use]
    pub fn new(segments: Vec<String>) -> Self {
        Self(segments)
    }

    /// Create path from a single segment
    #[inline]
    #[must_use]
    pub fn single(segment: impl Into<String>) -> Self {
        Self(vec![segment.into()])
    }

    /// Get path segments
    #[inline]
    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// Path depth (number of segments)
    #[inline]
    #[must_use]
    pub fn depth(&self) -> usize {
        self.0.len()
    }

    /// Whether the path has no segments
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// First segment: the top-level tree node this path belongs to
    #[inline]
    #[must_use]
    pub fn first(&self) -> Option<&str> {
        self.0.first().map(String::as_str)
    }

    /// Last segment
    #[inline]
    #[must_use]
    pub fn last(&self) -> Option<&str> {
        self.0.last().map(String::as_str)
    }

    /// Parent path, if any
    #[inline]
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        if self.0.is_empty() {
            None
        } else {
            Some(Self(self.0[..self.0.len() - 1].to_vec()))
        }
    }

    /// Append a segment, returning a new path
    #[inline]
    #[must_use]
    pub fn child(&self, segment: impl Into<String>) -> Self {
        let mut new = self.clone();
        new.0.push(segment.into());
        new
    }

    /// Keep at most the first `n` segments
    #[inline]
    #[must_use]
    pub fn truncated(&self, n: usize) -> Self {
        Self(self.0.iter().take(n).cloned().collect())
    }

}

impl Display for ConfigPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join("."))
    }
}

impl FromStr for ConfigPath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(PathError::Empty);
        }

        let segments: Vec<String> = s
            .split('.')
            .map(|seg| {
                if seg.is_empty() {
                    Err(PathError::EmptySegment(s.to_string()))
                } else if seg
                    .contains(|c: char| !c.is_ascii_alphanumeric() && c != '_' && c != '-')
                {
                    Err(PathError::InvalidSegment(seg.to_string()))
                } else {
                    Ok(seg.to_string())
                }
            })
            .collect::<Result<_, _>>()?;

        Ok(Self(segments))
    }
}

impl From<Vec<String>> for ConfigPath {
    fn from(segments: Vec<String>) -> Self {
        Self(segments)
    }
}

/// Errors related to config paths
#[derive(Debug, thiserror::Error)]
pub enum PathError {
    /// Empty path string
    #[error("config path is empty")]
    Empty,

    /// Empty segment in path
    #[error("config path '{0}' contains an empty segment")]
    EmptySegment(String),

    /// Invalid segment characters
    #[error("invalid path segment: '{0}' (allowed: [A-Za-z0-9_-])")]
    InvalidSegment(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_parse_and_display() {
        let path: ConfigPath = "sections.3f2a.name".parse().unwrap();
        assert_eq!(path.segments(), &["sections", "3f2a", "name"]);
        assert_eq!(path.to_string(), "sections.3f2a.name");
    }

    #[test]
    fn path_depth() {
        let path: ConfigPath = "a.b.c".parse().unwrap();
        assert_eq!(path.depth(), 3);
    }

    #[test]
    fn path_first_and_last() {
        let path: ConfigPath = "a.b.c".parse().unwrap();
        assert_eq!(path.first(), Some("a"));
        assert_eq!(path.last(), Some("c"));
    }

    #[test]
    fn path_parent() {
        let path: ConfigPath = "a.b.c".parse().unwrap();
        assert_eq!(path.parent().unwrap().to_string(), "a.b");

        let top: ConfigPath = "a".parse().unwrap();
        assert_eq!(top.parent().unwrap().to_string(), "");
        assert!(top.parent().unwrap().is_empty());
    }

    #[test]
    fn path_child() {
        let path = ConfigPath::single("sections");
        assert_eq!(path.child("3f2a").to_string(), "sections.3f2a");
    }

    #[test]
    fn path_truncated() {
        let path: ConfigPath = "a.b.c.d".parse().unwrap();
        assert_eq!(path.truncated(2).to_string(), "a.b");
        assert_eq!(path.truncated(9).to_string(), "a.b.c.d");
    }

    #[test]
    fn path_allows_uid_alphabet() {
        let path: ConfigPath = "sections.3f2a-9c_X".parse().unwrap();
        assert_eq!(path.last(), Some("3f2a-9c_X"));
    }

    #[test]
    fn path_rejects_empty() {
        assert!(matches!("".parse::<ConfigPath>(), Err(PathError::Empty)));
    }

    #[test]
    fn path_rejects_empty_segment() {
        let result = "a..b".parse::<ConfigPath>();
        assert!(matches!(result, Err(PathError::EmptySegment(_))));
    }

    #[test]
    fn path_rejects_invalid_chars() {
        let result = "a.b/c".parse::<ConfigPath>();
        assert!(matches!(result, Err(PathError::InvalidSegment(_))));
    }
}
