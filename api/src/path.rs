//! Materialized paths.
//!
//! A path is the list of a comment's ancestor ids, root first, ending with
//! the comment's own id. Ids are encoded as `ltree` labels and joined by
//! [`SEPARATOR`], so a subtree is always a contiguous prefix range.

use std::{cmp::Ordering, fmt};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const SEPARATOR: char = '.';

// `-` is not a valid ltree label character before PostgreSQL 16
const ID_DASH: char = '-';
const LABEL_DASH: char = '_';

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PathError {
    #[error("path is empty")]
    Empty,

    #[error("path `{0}` contains an empty segment")]
    EmptySegment(String),

    #[error("segment `{0}` contains characters outside [A-Za-z0-9_]")]
    InvalidSegment(String),

    #[error("segment `{0}` is not an encoded id")]
    NotAnId(String),
}

/// Encodes an id as a single path segment.
pub fn encode_segment(id: &Uuid) -> String {
    id.hyphenated()
        .to_string()
        .replace(ID_DASH, &LABEL_DASH.to_string())
}

pub fn decode_segment(segment: &str) -> Result<Uuid, PathError> {
    Uuid::parse_str(&segment.replace(LABEL_DASH, &ID_DASH.to_string()))
        .map_err(|_| PathError::NotAnId(segment.to_string()))
}

/// Returns the path of `child` placed directly under `parent_path`.
pub fn append(parent_path: &str, child: &Uuid) -> String {
    let segment = encode_segment(child);
    let mut path = String::with_capacity(parent_path.len() + 1 + segment.len());
    path.push_str(parent_path);
    path.push(SEPARATOR);
    path.push_str(&segment);
    path
}

/// Whether `candidate` is `ancestor` itself or lies somewhere below it.
///
/// A plain prefix test is not enough: `12.5` is under `12`, but `123` is
/// not, so the prefix has to end at a separator or at the end of the string.
pub fn is_descendant_or_self(candidate: &str, ancestor: &str) -> bool {
    match candidate.strip_prefix(ancestor) {
        Some(rest) => rest.is_empty() || rest.starts_with(SEPARATOR),
        None => false,
    }
}

/// Label-by-label comparison, the order PostgreSQL applies to `ltree`.
///
/// Every parent sorts ahead of its descendants and each subtree is
/// contiguous. For valid labels this agrees with byte order, since the
/// separator sorts below every label character.
pub fn compare(a: &str, b: &str) -> Ordering {
    a.split(SEPARATOR).cmp(b.split(SEPARATOR))
}

fn validate_segment(path: &str, segment: &str) -> Result<(), PathError> {
    if segment.is_empty() {
        return Err(PathError::EmptySegment(path.to_string()));
    }
    if !segment
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == LABEL_DASH)
    {
        return Err(PathError::InvalidSegment(segment.to_string()));
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MaterializedPath(String);

impl MaterializedPath {
    /// Path of a tree root: just its own segment.
    pub fn root(id: &Uuid) -> Self {
        Self(encode_segment(id))
    }

    pub fn parse(raw: &str) -> Result<Self, PathError> {
        if raw.is_empty() {
            return Err(PathError::Empty);
        }
        for segment in raw.split(SEPARATOR) {
            validate_segment(raw, segment)?;
        }
        Ok(Self(raw.to_string()))
    }

    pub fn append(&self, child: &Uuid) -> Self {
        Self(append(&self.0, child))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split(SEPARATOR)
    }

    /// Number of segments; a root has depth 1.
    pub fn depth(&self) -> usize {
        self.segments().count()
    }

    pub fn last_segment(&self) -> &str {
        self.0
            .rsplit_once(SEPARATOR)
            .map_or(self.0.as_str(), |(_, last)| last)
    }

    pub fn parent(&self) -> Option<Self> {
        self.0
            .rsplit_once(SEPARATOR)
            .map(|(parent, _)| Self(parent.to_string()))
    }

    /// Decodes every segment back into the ids of the ancestry, root first.
    pub fn ids(&self) -> Result<Vec<Uuid>, PathError> {
        self.segments().map(decode_segment).collect()
    }

    pub fn is_descendant_or_self(&self, ancestor: &MaterializedPath) -> bool {
        is_descendant_or_self(&self.0, &ancestor.0)
    }

    /// Whether this path ends with the segment of `id`.
    pub fn names(&self, id: &Uuid) -> bool {
        self.last_segment() == encode_segment(id)
    }
}

impl Ord for MaterializedPath {
    fn cmp(&self, other: &Self) -> Ordering {
        compare(&self.0, &other.0)
    }
}

impl PartialOrd for MaterializedPath {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for MaterializedPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for MaterializedPath {
    type Error = PathError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<MaterializedPath> for String {
    fn from(path: MaterializedPath) -> Self {
        path.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(n: u128) -> Uuid {
        Uuid::from_u128(n)
    }

    #[test]
    fn encoded_segment_has_no_separator_or_dash() {
        let segment = encode_segment(&Uuid::now_v7());
        assert!(!segment.contains(SEPARATOR));
        assert!(!segment.contains('-'));
        assert_eq!(segment.len(), 36);
    }

    #[test]
    fn decode_reverses_encode() {
        let original = Uuid::now_v7();
        assert_eq!(decode_segment(&encode_segment(&original)), Ok(original));
        assert!(matches!(
            decode_segment("not_a_uuid"),
            Err(PathError::NotAnId(_))
        ));
    }

    #[test]
    fn append_adds_exactly_one_segment() {
        let root = MaterializedPath::root(&id(1));
        let child = root.append(&id(2));

        assert_eq!(child.depth(), 2);
        assert_eq!(child.parent(), Some(root.clone()));
        assert!(child.names(&id(2)));
        assert_eq!(child.ids().unwrap(), vec![id(1), id(2)]);
        assert_eq!(root.parent(), None);
    }

    #[test]
    fn append_is_injective() {
        let a = MaterializedPath::root(&id(1));
        let b = MaterializedPath::root(&id(2));

        assert_ne!(a.append(&id(3)), a.append(&id(4)));
        assert_ne!(a.append(&id(3)), b.append(&id(3)));
    }

    #[test]
    fn prefix_needs_segment_boundary() {
        assert!(is_descendant_or_self("12", "12"));
        assert!(is_descendant_or_self("12.3", "12"));
        assert!(is_descendant_or_self("12.3.45", "12"));
        assert!(!is_descendant_or_self("123", "12"));
        assert!(!is_descendant_or_self("123.4", "12"));
        assert!(!is_descendant_or_self("12", "12.3"));
    }

    #[test]
    fn parents_sort_before_descendants_and_later_siblings() {
        let mut paths = vec!["1_9", "1.2", "1", "1.1.5", "1.1"];
        paths.sort_by(|a, b| compare(a, b));
        assert_eq!(paths, vec!["1", "1.1", "1.1.5", "1.2", "1_9"]);
    }

    #[test]
    fn later_v7_children_sort_after_earlier_ones() {
        let root = MaterializedPath::root(&Uuid::now_v7());
        let first = root.append(&Uuid::now_v7());
        let second = root.append(&Uuid::now_v7());
        let nested = first.append(&Uuid::now_v7());

        assert!(root < first);
        assert!(first < nested);
        assert!(nested < second);
    }

    #[test]
    fn parse_rejects_malformed_paths() {
        assert_eq!(MaterializedPath::parse(""), Err(PathError::Empty));
        assert!(matches!(
            MaterializedPath::parse("a..b"),
            Err(PathError::EmptySegment(_))
        ));
        assert!(matches!(
            MaterializedPath::parse("a.b-c"),
            Err(PathError::InvalidSegment(_))
        ));
        assert!(MaterializedPath::parse("a.b_c.D9").is_ok());
    }

    #[test]
    fn serializes_as_plain_string() {
        let path = MaterializedPath::root(&id(7)).append(&id(8));
        let json = serde_json::to_string(&path).unwrap();
        assert_eq!(json, format!("\"{path}\""));
        let back: MaterializedPath = serde_json::from_str(&json).unwrap();
        assert_eq!(back, path);
    }
}
