//! Ripple Classpath - Where Does a Type Come From?
//!
//! An ordered list of classpath entries (source folders, output folders,
//! archives, modules). The build engine asks it whether a referenced type is
//! declared by a tracked source unit (subject to incremental analysis) or
//! comes from a binary entry that is assumed stable for the whole build.
//!
//! Entries are consulted in classpath order and the first one that provides a
//! type wins, so an earlier archive shadows a later source folder.
//!
//! The model never mutates build state. Source folders answer through the
//! [`SourceTypeIndex`] seam, which the build state implements.

mod entry;
mod model;

pub use entry::{ClasspathEntry, EntryKind, Provider};
pub use model::{Classification, ClasspathModel};

use ripple_ir::UnitId;

/// Read-only view of the types declared by tracked source units.
pub trait SourceTypeIndex {
    /// Units declaring `qualified` (dotted), in unit order.
    fn declaring_units(&self, qualified: &str) -> Vec<UnitId>;

    /// True if a unit under `folder` declares a type in `package` or one of
    /// its sub-packages.
    fn has_package_under(&self, folder: &str, package: &str) -> bool;
}

/// No tracked sources. Every source folder is empty.
impl SourceTypeIndex for () {
    fn declaring_units(&self, _qualified: &str) -> Vec<UnitId> {
        Vec::new()
    }

    fn has_package_under(&self, _folder: &str, _package: &str) -> bool {
        false
    }
}

/// Normalize a slashed or dotted name to dotted form.
pub(crate) fn dotted(name: &str) -> String {
    name.replace('/', ".")
}
