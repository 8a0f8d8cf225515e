//! Prim identities
//!
//! A `PrimPath` is the stable identity of a scene object (`/World/Geo/mesh`).
//! Paths are cheap to clone (shared string) and carry a precomputed FNV-1a
//! hash so they can key hash maps on hot paths without rehashing the text.

use core::cmp::Ordering;
use core::fmt;
use core::hash::{Hash, Hasher};
use alloc::format;
use alloc::string::String;
use alloc::sync::Arc;

use crate::error::PathError;

/// Hierarchical, absolute prim path
#[derive(Clone)]
pub struct PrimPath {
    text: Arc<str>,
    hash: u64,
}

impl PrimPath {
    /// Separator between path elements
    pub const SEPARATOR: char = '/';

    /// The absolute root path `/`
    pub fn root() -> Self {
        Self::from_validated("/")
    }

    /// Parse and validate an absolute path
    pub fn parse(text: &str) -> Result<Self, PathError> {
        if text.is_empty() {
            return Err(PathError::Empty);
        }
        if !text.starts_with(Self::SEPARATOR) {
            return Err(PathError::NotAbsolute(text.into()));
        }
        if text.len() > 1 {
            for element in text[1..].split(Self::SEPARATOR) {
                let legal = !element.is_empty()
                    && element
                        .chars()
                        .all(|c| c.is_alphanumeric() || c == '_' || c == '.' || c == ':');
                if !legal {
                    return Err(PathError::InvalidElement {
                        path: text.into(),
                        element: element.into(),
                    });
                }
            }
        }
        Ok(Self::from_validated(text))
    }

    fn from_validated(text: &str) -> Self {
        Self {
            text: Arc::from(text),
            hash: fnv1a(text),
        }
    }

    /// Path text
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Precomputed FNV-1a hash of the path text
    #[inline]
    pub fn hash_value(&self) -> u64 {
        self.hash
    }

    /// Whether this is the root path
    #[inline]
    pub fn is_root(&self) -> bool {
        &*self.text == "/"
    }

    /// Last path element (empty for the root)
    pub fn name(&self) -> &str {
        match self.text.rfind(Self::SEPARATOR) {
            Some(i) => &self.text[i + 1..],
            None => &self.text,
        }
    }

    /// Parent path, `None` for the root
    pub fn parent(&self) -> Option<PrimPath> {
        if self.is_root() {
            return None;
        }
        match self.text.rfind(Self::SEPARATOR) {
            Some(0) => Some(Self::root()),
            Some(i) => Some(Self::from_validated(&self.text[..i])),
            None => None,
        }
    }

    /// Append a child element
    pub fn child(&self, name: &str) -> Result<PrimPath, PathError> {
        let text: String = if self.is_root() {
            format!("/{}", name)
        } else {
            format!("{}/{}", self.text, name)
        };
        Self::parse(&text)
    }

    /// Whether `self` equals `other` or lies beneath it
    pub fn has_prefix(&self, other: &PrimPath) -> bool {
        if other.is_root() || self == other {
            return true;
        }
        self.text.starts_with(&*other.text)
            && self.text[other.text.len()..].starts_with(Self::SEPARATOR)
    }
}

/// FNV-1a over the path bytes
fn fnv1a(text: &str) -> u64 {
    let mut hash = 0xcbf29ce484222325u64;
    for byte in text.bytes() {
        hash ^= byte as u64;
        hash = hash.wrapping_mul(0x100000001b3);
    }
    hash
}

impl PartialEq for PrimPath {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash && self.text == other.text
    }
}

impl Eq for PrimPath {}

impl Hash for PrimPath {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.hash.hash(state);
    }
}

impl PartialOrd for PrimPath {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PrimPath {
    fn cmp(&self, other: &Self) -> Ordering {
        self.text.cmp(&other.text)
    }
}

impl fmt::Debug for PrimPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PrimPath({})", self.text)
    }
}

impl fmt::Display for PrimPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl TryFrom<&str> for PrimPath {
    type Error = PathError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_parse() {
        let path = PrimPath::parse("/World/Geo/mesh").unwrap();
        assert_eq!(path.name(), "mesh");
        assert_eq!(path.parent().unwrap().as_str(), "/World/Geo");
        assert!(PrimPath::parse("World").is_err());
        assert!(PrimPath::parse("/World//mesh").is_err());
        assert!(PrimPath::parse("").is_err());
    }

    #[test]
    fn test_path_parent_chain() {
        let path = PrimPath::parse("/a").unwrap();
        assert!(path.parent().unwrap().is_root());
        assert!(PrimPath::root().parent().is_none());
    }

    #[test]
    fn test_path_child_and_prefix() {
        let world = PrimPath::parse("/World").unwrap();
        let mesh = world.child("mesh").unwrap();
        assert_eq!(mesh.as_str(), "/World/mesh");
        assert!(mesh.has_prefix(&world));
        assert!(!PrimPath::parse("/WorldX").unwrap().has_prefix(&world));
        assert_eq!(PrimPath::root().child("a").unwrap().as_str(), "/a");
    }

    #[test]
    fn test_path_equality_uses_text() {
        let a = PrimPath::parse("/a/b").unwrap();
        let b = PrimPath::parse("/a/b").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.hash_value(), b.hash_value());
        assert!(a < PrimPath::parse("/a/c").unwrap());
    }
}
