//! Stable Hashing
//!
//! Fast, non-cryptographic hashing for values that outlive the process:
//! structural fingerprints and the checksum of the persisted build state.
//!
//! `rustc_hash::FxHasher` is fine for in-memory tables but its output is not
//! promised to stay the same across crate releases, and the `Hash` impls of
//! std write `usize` lengths in native width. Everything hashed here goes
//! through explicit little-endian encodings instead.

use std::hash::Hasher;
use std::ops::BitXor;

/// A 64-bit FxHash-style hasher with a fixed, platform-independent encoding.
///
/// This is the same mixing function rustc uses for incremental compilation.
#[derive(Clone, Debug, Default)]
pub struct StableHasher {
    hash: u64,
}

impl StableHasher {
    const K: u64 = 0x517c_c1b7_2722_0a95;

    /// Create a hasher with the zero seed.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed raw bytes without a length prefix.
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        for byte in bytes {
            self.hash = self
                .hash
                .rotate_left(5)
                .bitxor(u64::from(*byte))
                .wrapping_mul(Self::K);
        }
    }

    /// Feed a string, length-prefixed so that `("ab", "c")` and `("a", "bc")`
    /// hash differently.
    pub fn write_str(&mut self, s: &str) {
        self.write_len(s.len());
        self.write_bytes(s.as_bytes());
    }

    /// Feed a collection length.
    pub fn write_len(&mut self, len: usize) {
        self.write_u64(len as u64);
    }
}

impl Hasher for StableHasher {
    fn write(&mut self, bytes: &[u8]) {
        self.write_bytes(bytes);
    }

    fn write_u8(&mut self, i: u8) {
        self.write_bytes(&[i]);
    }

    fn write_u16(&mut self, i: u16) {
        self.write_bytes(&i.to_le_bytes());
    }

    fn write_u32(&mut self, i: u32) {
        self.write_bytes(&i.to_le_bytes());
    }

    fn write_u64(&mut self, i: u64) {
        self.write_bytes(&i.to_le_bytes());
    }

    fn write_usize(&mut self, i: usize) {
        self.write_u64(i as u64);
    }

    fn finish(&self) -> u64 {
        self.hash
    }
}

/// Hash raw bytes directly.
///
/// Used for the checksum of the serialized build state.
#[must_use]
pub fn hash_bytes(data: &[u8]) -> u64 {
    let mut hasher = StableHasher::new();
    hasher.write_bytes(data);
    hasher.finish()
}

/// Hash a string directly.
#[must_use]
pub fn hash_str(s: &str) -> u64 {
    let mut hasher = StableHasher::new();
    hasher.write_str(s);
    hasher.finish()
}

/// Combine multiple hashes into one. Order matters.
#[must_use]
pub fn combine_hashes(hashes: &[u64]) -> u64 {
    let mut hasher = StableHasher::new();
    for hash in hashes {
        hasher.write_u64(*hash);
    }
    hasher.finish()
}
