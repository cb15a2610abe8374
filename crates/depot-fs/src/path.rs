//! Virtual path handling for storage backends
//!
//! Every artefact in a store is addressed by a [`VirtualPath`]: a rooted,
//! `/`-separated path that is independent of the native platform and of any
//! particular backend. Paths normalize on construction so that two spellings
//! of the same location always compare equal.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A normalized, rooted, `/`-separated path within a store.
///
/// Invariants maintained by every constructor:
/// - always begins with `/`
/// - forward slashes only (backslashes are converted)
/// - no empty, `.` or `..` segments (`..` resolves upward, clamped at the
///   root)
/// - no trailing slash, except for the root path itself
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VirtualPath {
    /// Normalized representation, `"/"` for the root.
    inner: String,
}

impl VirtualPath {
    /// Create a path from any string-like input, normalizing it.
    ///
    /// Relative input is interpreted against the root, so `"a/b"` and
    /// `"/a/b"` denote the same path.
    pub fn new(path: impl AsRef<str>) -> Self {
        Self {
            inner: normalize(path.as_ref()),
        }
    }

    /// The root path `/`.
    pub fn root() -> Self {
        Self {
            inner: "/".to_string(),
        }
    }

    /// The normalized string representation.
    pub fn as_str(&self) -> &str {
        &self.inner
    }

    /// Whether this is the root path.
    pub fn is_root(&self) -> bool {
        self.inner == "/"
    }

    /// Join a path fragment onto this path.
    ///
    /// The fragment is normalized as well, so `join("a/../b")` appends `b`.
    /// An absolute fragment replaces this path entirely.
    pub fn join(&self, fragment: impl AsRef<str>) -> Self {
        let fragment = fragment.as_ref().replace('\\', "/");
        if fragment.starts_with('/') {
            Self::new(fragment)
        } else {
            Self::new(format!("{}/{}", self.inner, fragment))
        }
    }

    /// Append another rooted path beneath this one.
    ///
    /// `"/a/b".concat("/c/d")` is `"/a/b/c/d"`; concatenating the root is a
    /// no-op. This is how prefix views and tree snapshots re-anchor relative
    /// locations.
    pub fn concat(&self, rel: &VirtualPath) -> Self {
        if rel.is_root() {
            self.clone()
        } else {
            Self::new(format!("{}{}", self.inner, rel.inner))
        }
    }

    /// The parent path, or `None` for the root.
    pub fn parent(&self) -> Option<Self> {
        if self.is_root() {
            return None;
        }
        match self.inner.rfind('/') {
            Some(0) => Some(Self::root()),
            Some(idx) => Some(Self {
                inner: self.inner[..idx].to_string(),
            }),
            None => None,
        }
    }

    /// The final segment, or `None` for the root.
    pub fn name(&self) -> Option<&str> {
        if self.is_root() {
            None
        } else {
            self.inner.rsplit('/').next()
        }
    }

    /// The extension of the final segment, if any.
    ///
    /// A leading dot (`.hidden`) does not count as an extension separator.
    pub fn extension(&self) -> Option<&str> {
        self.name().and_then(|name| {
            let idx = name.rfind('.')?;
            if idx == 0 { None } else { Some(&name[idx + 1..]) }
        })
    }

    /// Iterate over the path segments, shallowest first.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.inner.split('/').filter(|s| !s.is_empty())
    }

    /// Number of segments; the root has depth zero.
    pub fn depth(&self) -> usize {
        self.segments().count()
    }

    /// Whether this path is `prefix` itself or lies beneath it.
    pub fn starts_with(&self, prefix: &VirtualPath) -> bool {
        if prefix.is_root() {
            return true;
        }
        self.inner == prefix.inner
            || (self.inner.len() > prefix.inner.len()
                && self.inner.starts_with(&prefix.inner)
                && self.inner.as_bytes()[prefix.inner.len()] == b'/')
    }

    /// Whether this path is a strict ancestor of `other`.
    pub fn is_ancestor_of(&self, other: &VirtualPath) -> bool {
        other.starts_with(self) && self != other
    }

    /// The remainder of this path below `prefix`, re-rooted.
    ///
    /// Returns `Some("/")` when the paths are equal and `None` when this
    /// path does not lie beneath `prefix`.
    pub fn relative_to(&self, prefix: &VirtualPath) -> Option<Self> {
        if !self.starts_with(prefix) {
            return None;
        }
        if self == prefix {
            return Some(Self::root());
        }
        let rest = if prefix.is_root() {
            &self.inner
        } else {
            &self.inner[prefix.inner.len()..]
        };
        Some(Self {
            inner: rest.to_string(),
        })
    }

    /// Resolve this virtual path beneath a native root directory.
    pub fn to_native_under(&self, root: &Path) -> PathBuf {
        let rel = self.inner.trim_start_matches('/');
        if rel.is_empty() {
            root.to_path_buf()
        } else {
            root.join(rel)
        }
    }
}

fn normalize(raw: &str) -> String {
    let unified = raw.replace('\\', "/");
    let mut segments: Vec<&str> = Vec::new();
    for segment in unified.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    if segments.is_empty() {
        "/".to_string()
    } else {
        let mut out = String::with_capacity(unified.len() + 1);
        for segment in segments {
            out.push('/');
            out.push_str(segment);
        }
        out
    }
}

impl Default for VirtualPath {
    fn default() -> Self {
        Self::root()
    }
}

impl fmt::Display for VirtualPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.inner)
    }
}

impl From<&str> for VirtualPath {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for VirtualPath {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&VirtualPath> for VirtualPath {
    fn from(p: &VirtualPath) -> Self {
        p.clone()
    }
}

impl AsRef<str> for VirtualPath {
    fn as_ref(&self) -> &str {
        &self.inner
    }
}

impl Serialize for VirtualPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.inner)
    }
}

impl<'de> Deserialize<'de> for VirtualPath {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::new(raw))
    }
}
