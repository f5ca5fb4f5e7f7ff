//! Dot-delimited paths into the data tree
//!
//! A path segment is either a field key or, where the segment text is the
//! decimal form of a nonnegative integer, a row index: `items.2.price`
//! addresses the `price` field of the third row of `items`.

use crate::error::{CoreError, CoreResult};
use std::fmt;

/// One segment of a [`Path`]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Segment {
    /// Field key
    Key(String),
    /// Row index into a list
    Index(usize),
}

impl Segment {
    /// The key text, if this segment is a key
    pub fn as_key(&self) -> Option<&str> {
        match self {
            Segment::Key(k) => Some(k),
            Segment::Index(_) => None,
        }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::Key(k) => write!(f, "{k}"),
            Segment::Index(i) => write!(f, "{i}"),
        }
    }
}

/// A parsed dot-delimited address into the data tree
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Path {
    segments: Vec<Segment>,
}

impl Path {
    /// Parse a dot-delimited path string
    ///
    /// Empty input and empty segments are rejected. A segment consisting
    /// only of ASCII digits parses as a row index.
    pub fn parse(text: &str) -> CoreResult<Path> {
        if text.is_empty() {
            return Err(CoreError::InvalidPath(text.to_string()));
        }
        let mut segments = Vec::new();
        for part in text.split('.') {
            if part.is_empty() {
                return Err(CoreError::InvalidPath(text.to_string()));
            }
            if part.bytes().all(|b| b.is_ascii_digit()) {
                let index = part
                    .parse::<usize>()
                    .map_err(|_| CoreError::InvalidPath(text.to_string()))?;
                segments.push(Segment::Index(index));
            } else {
                segments.push(Segment::Key(part.to_string()));
            }
        }
        Ok(Path { segments })
    }

    /// The path's segments
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Number of segments
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Whether the path has no segments (never true for a parsed path)
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// The generic field key of the addressed field (the last key segment,
    /// only if the path actually ends in a key)
    pub fn last_key(&self) -> Option<&str> {
        self.segments.last().and_then(Segment::as_key)
    }

    /// The enclosing row, when this path addresses a field inside one
    ///
    /// A path of the form `...list.index.field` yields the list's generic
    /// key, the row index, and the path of the row record itself. Only the
    /// trailing three segments matter, so arbitrarily nested row-groups
    /// resolve the same way.
    pub fn row_context(&self) -> Option<(&str, usize, Path)> {
        let n = self.segments.len();
        if n < 3 {
            return None;
        }
        let list_key = self.segments[n - 3].as_key()?;
        let index = match self.segments[n - 2] {
            Segment::Index(i) => i,
            Segment::Key(_) => return None,
        };
        self.segments[n - 1].as_key()?;
        let row_base = Path {
            segments: self.segments[..n - 1].to_vec(),
        };
        Some((list_key, index, row_base))
    }

    /// Extend the path with a trailing key segment
    pub fn child(&self, key: &str) -> Path {
        let mut segments = self.segments.clone();
        segments.push(Segment::Key(key.to_string()));
        Path { segments }
    }

    /// Extend the path with a trailing row-index segment
    pub fn child_index(&self, index: usize) -> Path {
        let mut segments = self.segments.clone();
        segments.push(Segment::Index(index));
        Path { segments }
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, seg) in self.segments.iter().enumerate() {
            if i > 0 {
                write!(f, ".")?;
            }
            write!(f, "{seg}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple() {
        let path = Path::parse("price").unwrap();
        assert_eq!(path.segments(), &[Segment::Key("price".into())]);
        assert_eq!(path.last_key(), Some("price"));
        assert!(path.row_context().is_none());
    }

    #[test]
    fn test_parse_row_path() {
        let path = Path::parse("items.2.price").unwrap();
        assert_eq!(path.len(), 3);
        assert_eq!(path.last_key(), Some("price"));

        let (list, index, row_base) = path.row_context().unwrap();
        assert_eq!(list, "items");
        assert_eq!(index, 2);
        assert_eq!(row_base.to_string(), "items.2");
    }

    #[test]
    fn test_nested_row_path() {
        // A row-group inside a row-group: only the trailing row matters
        let path = Path::parse("orders.0.lines.3.amount").unwrap();
        let (list, index, row_base) = path.row_context().unwrap();
        assert_eq!(list, "lines");
        assert_eq!(index, 3);
        assert_eq!(row_base.to_string(), "orders.0.lines.3");
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert!(Path::parse("").is_err());
        assert!(Path::parse("a..b").is_err());
        assert!(Path::parse(".a").is_err());
        assert!(Path::parse("a.").is_err());
    }

    #[test]
    fn test_display_roundtrip() {
        let path = Path::parse("items.0.price").unwrap();
        assert_eq!(path.to_string(), "items.0.price");
    }

    #[test]
    fn test_child() {
        let base = Path::parse("items.1").unwrap();
        assert_eq!(base.child("amount").to_string(), "items.1.amount");
        let list = Path::parse("items").unwrap();
        assert_eq!(list.child_index(2).to_string(), "items.2");
    }
}
