//! Source unit identity.

use std::borrow::Borrow;
use std::fmt;

/// Identity of one source unit: its workspace-relative path, e.g.
/// `src/com/x/Foo.java`.
///
/// Ordered by path so that maps and sets keyed by units iterate
/// deterministically.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub struct UnitId(String);

impl UnitId {
    pub fn new(path: impl Into<String>) -> Self {
        UnitId(path.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Check whether this unit lives under `folder` (a path prefix ending at a
    /// segment boundary). An empty folder contains every unit.
    pub fn is_under(&self, folder: &str) -> bool {
        let folder = folder.trim_end_matches('/');
        if folder.is_empty() {
            return true;
        }
        self.0
            .strip_prefix(folder)
            .is_some_and(|rest| rest.starts_with('/'))
    }
}

impl Borrow<str> for UnitId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for UnitId {
    fn from(path: &str) -> Self {
        UnitId::new(path)
    }
}

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UnitId({:?})", self.0)
    }
}
