//! Interned name handles.
//!
//! Both handles are plain 32-bit indices into the `NameTable` that produced
//! them. They are only meaningful together with that table.

use std::fmt;

/// Interned simple name (identifier or path segment).
///
/// Has all the cheap traits: Copy, Clone, Eq, `PartialEq`, Ord, `PartialOrd`,
/// Hash, Debug. Ordering follows interning order, not text order.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[repr(transparent)]
pub struct Name(u32);

impl Name {
    /// Pre-interned empty name.
    pub const EMPTY: Name = Name(0);

    /// Create from an index into the table.
    #[inline]
    pub const fn from_raw(raw: u32) -> Self {
        Name(raw)
    }

    /// Get raw u32 value.
    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }

    #[inline]
    pub(crate) const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Name({})", self.0)
    }
}

impl Default for Name {
    fn default() -> Self {
        Self::EMPTY
    }
}

/// Interned qualified name: an ordered sequence of `Name` segments such as
/// `java.util.List`.
///
/// Two handles from the same table are equal iff their segment sequences are
/// element-wise equal.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[repr(transparent)]
pub struct QualifiedName(u32);

impl QualifiedName {
    /// Create from an index into the table.
    #[inline]
    pub const fn from_raw(raw: u32) -> Self {
        QualifiedName(raw)
    }

    /// Get raw u32 value.
    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }

    #[inline]
    pub(crate) const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "QualifiedName({})", self.0)
    }
}
