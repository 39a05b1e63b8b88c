//! Dotted/indexed paths into the tree.
//!
//! A path is a dot-separated list of segments, each either a group key or a
//! collection index: `addresses.0.street`. The empty string refers to the
//! root node.

use std::fmt;

/// One path segment: a named group child or a positional collection child.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Named child of a group.
    Key(String),
    /// Positional child of a collection.
    Index(usize),
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Key(key) => write!(f, "{key}"),
            Self::Index(index) => write!(f, "{index}"),
        }
    }
}

/// A parsed path like `addresses.0.street`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Path {
    segments: Vec<Segment>,
}

impl Path {
    /// Parse a dotted path. Returns `None` for malformed paths (empty
    /// segments, e.g. `a..b` or a trailing dot).
    pub fn parse(raw: &str) -> Option<Self> {
        if raw.is_empty() {
            return Some(Self::default());
        }

        let mut segments = Vec::new();
        for part in raw.split('.') {
            if part.is_empty() {
                return None;
            }
            let segment = if part.bytes().all(|b| b.is_ascii_digit()) {
                match part.parse::<usize>() {
                    Ok(index) => Segment::Index(index),
                    Err(_) => return None,
                }
            } else {
                Segment::Key(part.to_string())
            };
            segments.push(segment);
        }

        Some(Self { segments })
    }

    /// The parsed segments, outermost first.
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Whether this path refers to the root node.
    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for segment in &self.segments {
            if !first {
                write!(f, ".")?;
            }
            write!(f, "{segment}")?;
            first = false;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_keys() {
        let path = Path::parse("user.email").unwrap();
        assert_eq!(
            path.segments(),
            &[
                Segment::Key("user".to_string()),
                Segment::Key("email".to_string())
            ]
        );
    }

    #[test]
    fn test_parse_mixed_keys_and_indices() {
        let path = Path::parse("addresses.2.street").unwrap();
        assert_eq!(
            path.segments(),
            &[
                Segment::Key("addresses".to_string()),
                Segment::Index(2),
                Segment::Key("street".to_string())
            ]
        );
    }

    #[test]
    fn test_parse_empty_is_root() {
        let path = Path::parse("").unwrap();
        assert!(path.is_root());
    }

    #[test]
    fn test_parse_rejects_empty_segments() {
        assert_eq!(Path::parse("a..b"), None);
        assert_eq!(Path::parse(".a"), None);
        assert_eq!(Path::parse("a."), None);
    }

    #[test]
    fn test_display_round_trip() {
        let raw = "addresses.0.street";
        assert_eq!(Path::parse(raw).unwrap().to_string(), raw);
    }
}
