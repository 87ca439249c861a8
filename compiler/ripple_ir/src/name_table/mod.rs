//! Deduplicating storage for simple and qualified names.
//!
//! One table lives inside one build state. It never forgets a name; a full
//! rebuild starts from a fresh table instead.

use std::borrow::Cow;
use std::fmt;

use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::{Name, QualifiedName};

/// Segments of one qualified name. Most type names have four or fewer.
type Segments = SmallVec<[Name; 4]>;

/// Handles that share a last segment.
type Bucket = SmallVec<[QualifiedName; 2]>;

/// Interner for simple names and qualified name paths.
///
/// Qualified names are bucketed by their **last** segment only. Thousands of
/// types share prefixes like `java.util`, but their last segments are almost
/// always distinct, so each bucket stays short and a rehash costs in
/// proportion to the number of distinct last segments.
#[derive(Clone)]
pub struct NameTable {
    /// Name contents, indexed by `Name`.
    names: Vec<Box<[u8]>>,
    /// Content to handle.
    name_ids: FxHashMap<Box<[u8]>, Name>,
    /// Segment lists, indexed by `QualifiedName`.
    qualified: Vec<Segments>,
    /// Last segment to every qualified name ending in it.
    buckets: FxHashMap<Name, Bucket>,
}

impl NameTable {
    /// Create an empty table with the empty name pre-interned.
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Create a table sized for about `expected` names.
    ///
    /// Reserves half as much again as expected so a table filled to its
    /// estimate does not immediately grow.
    pub fn with_capacity(expected: usize) -> Self {
        let capacity = expected + expected / 2 + 1;
        let mut table = NameTable {
            names: Vec::with_capacity(capacity),
            name_ids: FxHashMap::with_capacity_and_hasher(capacity, Default::default()),
            qualified: Vec::with_capacity(capacity),
            buckets: FxHashMap::with_capacity_and_hasher(capacity, Default::default()),
        };
        table.intern(b"");
        table
    }

    /// Intern a byte string, returning its handle.
    ///
    /// Equal byte strings always get the same handle within this table.
    pub fn intern(&mut self, bytes: &[u8]) -> Name {
        if let Some(&name) = self.name_ids.get(bytes) {
            return name;
        }
        let name = Name::from_raw(next_index(self.names.len()));
        let owned: Box<[u8]> = bytes.into();
        self.names.push(owned.clone());
        self.name_ids.insert(owned, name);
        name
    }

    /// Intern a UTF-8 string.
    pub fn intern_str(&mut self, s: &str) -> Name {
        self.intern(s.as_bytes())
    }

    /// Look up a name without interning it.
    pub fn find(&self, bytes: &[u8]) -> Option<Name> {
        self.name_ids.get(bytes).copied()
    }

    /// Look up the bytes of a name.
    pub fn lookup(&self, name: Name) -> &[u8] {
        &self.names[name.index()]
    }

    /// Look up a name as text. Invalid UTF-8 is replaced, never rejected.
    pub fn lookup_str(&self, name: Name) -> Cow<'_, str> {
        String::from_utf8_lossy(self.lookup(name))
    }

    /// Intern a qualified name from already-interned segments.
    pub fn intern_qualified(&mut self, segments: &[Name]) -> QualifiedName {
        if let Some(existing) = self.find_qualified(segments) {
            return existing;
        }
        let qualified = QualifiedName::from_raw(next_index(self.qualified.len()));
        self.qualified.push(segments.iter().copied().collect());
        self.buckets
            .entry(last_of(segments))
            .or_default()
            .push(qualified);
        qualified
    }

    /// Intern a dotted or slashed path such as `java.util.List` or
    /// `java/util/List`. Empty segments are skipped.
    pub fn intern_path(&mut self, path: &str) -> QualifiedName {
        let segments: Segments = split_path(path).map(|s| self.intern_str(s)).collect();
        self.intern_qualified(&segments)
    }

    /// Find a qualified name without interning anything.
    pub fn find_qualified(&self, segments: &[Name]) -> Option<QualifiedName> {
        self.buckets
            .get(&last_of(segments))?
            .iter()
            .copied()
            .find(|q| self.qualified[q.index()].as_slice() == segments)
    }

    /// Find a dotted or slashed path without interning anything.
    ///
    /// Returns `None` if any segment was never interned.
    pub fn find_path(&self, path: &str) -> Option<QualifiedName> {
        let segments = split_path(path)
            .map(|s| self.find(s.as_bytes()))
            .collect::<Option<Segments>>()?;
        self.find_qualified(&segments)
    }

    /// Segments of a qualified name, first to last.
    pub fn segments(&self, qualified: QualifiedName) -> &[Name] {
        &self.qualified[qualified.index()]
    }

    /// First segment (the root name). `Name::EMPTY` for an empty path.
    pub fn root(&self, qualified: QualifiedName) -> Name {
        self.segments(qualified)
            .first()
            .copied()
            .unwrap_or(Name::EMPTY)
    }

    /// Last segment (the simple type name). `Name::EMPTY` for an empty path.
    pub fn last_segment(&self, qualified: QualifiedName) -> Name {
        last_of(self.segments(qualified))
    }

    /// Render a qualified name with `.` separators.
    pub fn display(&self, qualified: QualifiedName) -> String {
        let mut out = String::new();
        for (i, segment) in self.segments(qualified).iter().enumerate() {
            if i > 0 {
                out.push('.');
            }
            out.push_str(&self.lookup_str(*segment));
        }
        out
    }

    /// Number of qualified names sharing the given last segment.
    pub fn bucket_len(&self, last: Name) -> usize {
        self.buckets.get(&last).map_or(0, SmallVec::len)
    }

    /// Number of interned simple names, including the empty name.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Check if the table holds only the empty name.
    pub fn is_empty(&self) -> bool {
        self.names.len() <= 1
    }

    /// Number of interned qualified names.
    pub fn qualified_len(&self) -> usize {
        self.qualified.len()
    }
}

impl Default for NameTable {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for NameTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NameTable")
            .field("names", &self.names.len())
            .field("qualified", &self.qualified.len())
            .field("buckets", &self.buckets.len())
            .finish()
    }
}

fn last_of(segments: &[Name]) -> Name {
    segments.last().copied().unwrap_or(Name::EMPTY)
}

fn split_path(path: &str) -> impl Iterator<Item = &str> {
    path.split(['.', '/']).filter(|s| !s.is_empty())
}

/// Convert a table length into the next handle index.
///
/// # Panics
/// Panics past `u32::MAX` entries; a single build never gets near that.
fn next_index(len: usize) -> u32 {
    u32::try_from(len).unwrap_or_else(|_| panic!("name table exceeded {} entries", u32::MAX))
}
