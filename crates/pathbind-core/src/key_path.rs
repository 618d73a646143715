#![forbid(unsafe_code)]

//! Dotted key paths anchored at a `root` sentinel.
//!
//! A key path such as `root.house.owner.name` names a chain of field
//! accesses. Segment 0 is always the sentinel [`ROOT_SEGMENT`] and stands for
//! the observable the path is attached to; it is never looked up as a field.
//! Segments `1..` are field names resolved one hop at a time.
//!
//! # Invariants
//!
//! 1. A parsed path has at least one segment, and segment 0 is `root`.
//! 2. No segment is empty or contains [`SEPARATOR`].
//! 3. `Display` renders the path back to the exact string it was parsed from.

use std::fmt;
use std::rc::Rc;
use std::str::FromStr;

/// Required first segment of every key path.
pub const ROOT_SEGMENT: &str = "root";

/// Segment separator.
pub const SEPARATOR: char = '.';

/// A malformed key path.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KeyPathError {
    #[error("key path `{path}` does not start with `{}`", ROOT_SEGMENT)]
    MissingRoot { path: String },
    #[error("key path `{path}` has an empty segment at position {position}")]
    EmptySegment { path: String, position: usize },
    #[error("key path segment `{segment}` at position {position} contains `{}`", SEPARATOR)]
    SeparatorInSegment { segment: String, position: usize },
}

/// A validated, cheaply clonable key path.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct KeyPath {
    segments: Rc<[String]>,
}

impl KeyPath {
    /// Parse a dotted path.
    ///
    /// # Errors
    ///
    /// - [`KeyPathError::MissingRoot`] if the first segment is not `root`
    ///   (this includes the empty string).
    /// - [`KeyPathError::EmptySegment`] for `root..x` or a trailing dot.
    ///
    /// # Examples
    ///
    /// ```
    /// use pathbind_core::KeyPath;
    ///
    /// let path = KeyPath::parse("root.house.name").unwrap();
    /// assert_eq!(path.len(), 3);
    /// assert_eq!(path.segment(1), Some("house"));
    /// assert_eq!(path.to_string(), "root.house.name");
    ///
    /// assert!(KeyPath::parse("house.name").is_err());
    /// ```
    pub fn parse(path: &str) -> Result<Self, KeyPathError> {
        Self::from_segments(path.split(SEPARATOR))
    }

    /// Build a path from already split segments.
    ///
    /// # Errors
    ///
    /// Same as [`parse`](Self::parse), plus
    /// [`KeyPathError::SeparatorInSegment`] for a segment such as `"a.b"`,
    /// which would not render back to the same path.
    pub fn from_segments<I, S>(segments: I) -> Result<Self, KeyPathError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let segments: Vec<String> = segments.into_iter().map(Into::into).collect();
        let joined = || segments.join(".");

        if segments.first().map(String::as_str) != Some(ROOT_SEGMENT) {
            return Err(KeyPathError::MissingRoot { path: joined() });
        }
        if let Some(position) = segments.iter().position(String::is_empty) {
            return Err(KeyPathError::EmptySegment {
                path: joined(),
                position,
            });
        }
        if let Some(position) = segments.iter().position(|s| s.contains(SEPARATOR)) {
            return Err(KeyPathError::SeparatorInSegment {
                segment: segments[position].clone(),
                position,
            });
        }

        Ok(Self {
            segments: segments.into(),
        })
    }

    /// Number of segments, including `root`.
    #[must_use]
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Always `false`: a parsed path holds at least the `root` segment.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Index of the terminal segment.
    #[must_use]
    pub fn last_index(&self) -> usize {
        self.segments.len() - 1
    }

    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    #[must_use]
    pub fn segment(&self, index: usize) -> Option<&str> {
        self.segments.get(index).map(String::as_str)
    }

    /// Field names after the sentinel.
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.segments[1..].iter().map(String::as_str)
    }

    /// Segments `0..=index` joined with dots, e.g. `root.house` for index 1.
    #[must_use]
    pub fn prefix(&self, index: usize) -> String {
        let end = (index + 1).min(self.segments.len());
        self.segments[..end].join(".")
    }
}

impl fmt::Display for KeyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("."))
    }
}

impl fmt::Debug for KeyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("KeyPath").field(&self.to_string()).finish()
    }
}

impl FromStr for KeyPath {
    type Err = KeyPathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn root_only_path() {
        let path = KeyPath::parse("root").expect("valid");
        assert_eq!(path.len(), 1);
        assert_eq!(path.last_index(), 0);
        assert_eq!(path.fields().count(), 0);
        assert!(!path.is_empty());
    }

    #[test]
    fn missing_root_is_rejected() {
        assert_eq!(
            KeyPath::parse("house.name"),
            Err(KeyPathError::MissingRoot {
                path: "house.name".into()
            })
        );
        assert!(matches!(
            KeyPath::parse(""),
            Err(KeyPathError::MissingRoot { .. })
        ));
        assert!(matches!(
            KeyPath::parse("Root.house"),
            Err(KeyPathError::MissingRoot { .. })
        ));
    }

    #[test]
    fn empty_segments_are_rejected() {
        assert_eq!(
            KeyPath::parse("root..name"),
            Err(KeyPathError::EmptySegment {
                path: "root..name".into(),
                position: 1
            })
        );
        assert!(matches!(
            KeyPath::parse("root.house."),
            Err(KeyPathError::EmptySegment { position: 2, .. })
        ));
    }

    #[test]
    fn prefix_rendering() {
        let path: KeyPath = "root.house.owner.name".parse().expect("valid");
        assert_eq!(path.prefix(0), "root");
        assert_eq!(path.prefix(2), "root.house.owner");
        assert_eq!(path.prefix(10), "root.house.owner.name");
    }

    #[test]
    fn from_segments_matches_parse() {
        let a = KeyPath::from_segments(["root", "a", "b"]).expect("valid");
        let b = KeyPath::parse("root.a.b").expect("valid");
        assert_eq!(a, b);
        assert_eq!(a.fields().collect::<Vec<_>>(), vec!["a", "b"]);
    }

    #[test]
    fn separator_inside_a_segment_is_rejected() {
        assert_eq!(
            KeyPath::from_segments(["root", "a.b"]),
            Err(KeyPathError::SeparatorInSegment {
                segment: "a.b".into(),
                position: 1
            })
        );
        let err = KeyPath::from_segments(["root", "house", ".name"]).expect_err("dotted segment");
        assert_eq!(
            err.to_string(),
            "key path segment `.name` at position 2 contains `.`"
        );
    }

    #[test]
    fn error_messages_name_the_path() {
        let err = KeyPath::parse("house").expect_err("missing root");
        assert_eq!(err.to_string(), "key path `house` does not start with `root`");
    }

    proptest! {
        #[test]
        fn display_round_trips(fields in proptest::collection::vec("[a-z_][a-z0-9_]{0,8}", 0..6)) {
            let text = std::iter::once("root".to_string())
                .chain(fields.iter().cloned())
                .collect::<Vec<_>>()
                .join(".");
            let path = KeyPath::parse(&text).expect("generated paths are valid");
            prop_assert_eq!(path.to_string(), text);
            prop_assert_eq!(path.len(), fields.len() + 1);
        }
    }
}
