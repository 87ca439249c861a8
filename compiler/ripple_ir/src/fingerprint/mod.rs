//! Structural Fingerprints
//!
//! A fingerprint summarizes the externally visible shape of one declared
//! type. If recompiling a unit leaves a type's fingerprint unchanged, units
//! that depend on the type do not need recompiling.
//!
//! # Contract
//!
//! Only what other compilation units can observe goes in a `TypeShape`:
//!
//! | Field             | Order significant? |
//! |-------------------|--------------------|
//! | `modifiers`       | n/a (bit set)      |
//! | `superclass`      | n/a                |
//! | `type_parameters` | yes (positional)   |
//! | `interfaces`      | no                 |
//! | `members`         | no                 |
//! | `annotations`     | no                 |
//!
//! Method bodies, private helpers the compiler leaves out of `members`,
//! comments and formatting never reach the hash, so editing them is a
//! non-structural change. Reordering members is also non-structural.

use std::fmt;
use std::hash::Hasher;

use crate::hash::StableHasher;

/// Digest of a type's structural shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub struct Fingerprint(u64);

impl Fingerprint {
    /// Create a fingerprint from a precomputed digest.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Get the underlying digest.
    #[must_use]
    pub const fn value(&self) -> u64 {
        self.0
    }

    /// Fingerprint a type shape.
    #[must_use]
    pub fn of_shape(shape: &TypeShape) -> Self {
        shape.fingerprint()
    }

    /// Format as a hex string.
    #[must_use]
    pub fn to_hex(&self) -> String {
        format!("{:016x}", self.0)
    }

    /// Parse from a hex string.
    pub fn from_hex(s: &str) -> Option<Self> {
        u64::from_str_radix(s, 16).ok().map(Self)
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// The structural shape of a declared type, as reported by the compiler.
///
/// Signatures are opaque strings; the compiler picks their spelling, and it
/// only has to be consistent between builds.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypeShape {
    /// Modifier bits (visibility, abstract, final, kind of type, ...).
    pub modifiers: u32,
    /// Qualified name of the superclass, if any.
    pub superclass: Option<String>,
    /// Type parameters with their bounds, in declaration order.
    pub type_parameters: Vec<String>,
    /// Qualified names of directly implemented interfaces.
    pub interfaces: Vec<String>,
    /// Signatures of members visible outside the declaring unit.
    pub members: Vec<String>,
    /// Annotations visible outside the declaring unit.
    pub annotations: Vec<String>,
}

impl TypeShape {
    #[must_use]
    pub fn new(modifiers: u32) -> Self {
        TypeShape {
            modifiers,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_superclass(mut self, superclass: impl Into<String>) -> Self {
        self.superclass = Some(superclass.into());
        self
    }

    #[must_use]
    pub fn with_type_parameter(mut self, parameter: impl Into<String>) -> Self {
        self.type_parameters.push(parameter.into());
        self
    }

    #[must_use]
    pub fn with_interface(mut self, interface: impl Into<String>) -> Self {
        self.interfaces.push(interface.into());
        self
    }

    #[must_use]
    pub fn with_member(mut self, signature: impl Into<String>) -> Self {
        self.members.push(signature.into());
        self
    }

    #[must_use]
    pub fn with_annotation(mut self, annotation: impl Into<String>) -> Self {
        self.annotations.push(annotation.into());
        self
    }

    /// Compute the fingerprint of this shape.
    #[must_use]
    pub fn fingerprint(&self) -> Fingerprint {
        let mut hasher = StableHasher::new();
        hasher.write_u32(self.modifiers);
        match &self.superclass {
            Some(superclass) => {
                hasher.write_u8(1);
                hasher.write_str(superclass);
            }
            None => hasher.write_u8(0),
        }
        hash_list(&mut hasher, self.type_parameters.iter().map(String::as_str));
        hash_set(&mut hasher, &self.interfaces);
        hash_set(&mut hasher, &self.members);
        hash_set(&mut hasher, &self.annotations);
        Fingerprint(hasher.finish())
    }
}

fn hash_list<'a>(hasher: &mut StableHasher, items: impl ExactSizeIterator<Item = &'a str>) {
    hasher.write_len(items.len());
    for item in items {
        hasher.write_str(item);
    }
}

/// Hash as a set: sorted and deduplicated first.
fn hash_set(hasher: &mut StableHasher, items: &[String]) {
    let mut sorted: Vec<&str> = items.iter().map(String::as_str).collect();
    sorted.sort_unstable();
    sorted.dedup();
    hash_list(hasher, sorted.into_iter());
}
