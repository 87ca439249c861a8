//! Ripple IR - Core Data Types of the Build Engine
//!
//! This crate contains the compact, comparable keys the rest of the engine is
//! built on:
//! - `Name` / `QualifiedName` handles and the `NameTable` that owns them
//! - `UnitId` for source-unit identity
//! - `ReferenceCollection`, the per-unit record of referenced names
//! - `Fingerprint` / `TypeShape`, the structural digest of a declared type
//! - `StableHasher`, a platform-independent hash for persisted digests
//!
//! # Design Philosophy
//!
//! - **Intern Everything**: byte strings become `Name(u32)`, dotted paths
//!   become `QualifiedName(u32)`; equality is an integer compare.
//! - **Explicit Ownership**: a `NameTable` belongs to exactly one build state.
//!   There is no process-wide table; handles from different tables must not
//!   be mixed.
//! - **Conservative Queries**: reference lookups may answer "maybe" but never
//!   a false "no".

pub mod fingerprint;
pub mod hash;
mod name;
mod name_table;
mod references;
mod unit;

pub use fingerprint::{Fingerprint, TypeShape};
pub use hash::{combine_hashes, hash_bytes, hash_str, StableHasher};
pub use name::{Name, QualifiedName};
pub use name_table::NameTable;
pub use references::ReferenceCollection;
pub use unit::UnitId;
