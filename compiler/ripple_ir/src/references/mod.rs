//! Per-unit reference records.
//!
//! A `ReferenceCollection` answers one question cheaply: could the unit that
//! owns it be affected by a change to a given name? Answers are conservative.
//! A "yes" may be a false positive that costs one extra recompile; a "no" is
//! always right.

use crate::{Name, NameTable, QualifiedName};

/// The names one compiled unit refers to.
///
/// Holds three sorted, deduplicated sets:
/// - simple names: every identifier textually referenced
/// - root names: first segment of every qualified reference
/// - qualified names: fully qualified type references
///
/// Invariant: every qualified name's first segment is in the root set.
/// The constructors enforce it, so callers may pass an incomplete root list.
///
/// A collection is replaced wholesale when its unit is recompiled; it is
/// never patched.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReferenceCollection {
    simple_names: Box<[Name]>,
    root_names: Box<[Name]>,
    qualified_names: Box<[QualifiedName]>,
}

impl ReferenceCollection {
    /// Build a collection from already-interned names.
    pub fn new(
        table: &NameTable,
        simple_names: impl IntoIterator<Item = Name>,
        root_names: impl IntoIterator<Item = Name>,
        qualified_names: impl IntoIterator<Item = QualifiedName>,
    ) -> Self {
        let qualified_names = sorted(qualified_names);
        let roots = root_names.into_iter().chain(
            qualified_names
                .iter()
                .map(|q| table.root(*q))
                .filter(|root| *root != Name::EMPTY),
        );
        ReferenceCollection {
            simple_names: sorted(simple_names),
            root_names: sorted(roots),
            qualified_names,
        }
    }

    /// Build a collection from the textual facts a compiler reports, interning
    /// every name into `table`. Qualified names may use `.` or `/`.
    pub fn intern<S, R, Q>(table: &mut NameTable, simple_names: S, root_names: R, qualified_names: Q) -> Self
    where
        S: IntoIterator,
        S::Item: AsRef<str>,
        R: IntoIterator,
        R::Item: AsRef<str>,
        Q: IntoIterator,
        Q::Item: AsRef<str>,
    {
        let simple: Vec<Name> = simple_names
            .into_iter()
            .map(|s| table.intern_str(s.as_ref()))
            .collect();
        let roots: Vec<Name> = root_names
            .into_iter()
            .map(|s| table.intern_str(s.as_ref()))
            .collect();
        let qualified: Vec<QualifiedName> = qualified_names
            .into_iter()
            .map(|s| table.intern_path(s.as_ref()))
            .collect();
        Self::new(table, simple, roots, qualified)
    }

    /// Could this unit be affected by a change to `simple_name`?
    ///
    /// True iff the unit referenced the simple name.
    pub fn might_reference(&self, simple_name: Name) -> bool {
        self.simple_names.binary_search(&simple_name).is_ok()
    }

    /// Could this unit be affected by a change to `qualified`?
    ///
    /// True if the unit referenced the qualified name exactly, or if it
    /// referenced the name's root segment. A root match alone is enough: the
    /// unit may reach the type through an on-demand import, so it has to be
    /// looked at again.
    pub fn might_reference_qualified(&self, table: &NameTable, qualified: QualifiedName) -> bool {
        self.qualified_names.binary_search(&qualified).is_ok()
            || self.references_root(table.root(qualified))
    }

    /// True iff `root` is in the root set.
    pub fn references_root(&self, root: Name) -> bool {
        self.root_names.binary_search(&root).is_ok()
    }

    /// Referenced simple names, sorted by handle.
    pub fn simple_names(&self) -> &[Name] {
        &self.simple_names
    }

    /// Referenced root names, sorted by handle.
    pub fn root_names(&self) -> &[Name] {
        &self.root_names
    }

    /// Referenced qualified names, sorted by handle.
    pub fn qualified_names(&self) -> &[QualifiedName] {
        &self.qualified_names
    }

    /// True if the unit references nothing at all.
    pub fn is_empty(&self) -> bool {
        self.simple_names.is_empty() && self.root_names.is_empty() && self.qualified_names.is_empty()
    }
}

fn sorted<T: Ord>(items: impl IntoIterator<Item = T>) -> Box<[T]> {
    let mut items: Vec<T> = items.into_iter().collect();
    items.sort_unstable();
    items.dedup();
    items.into_boxed_slice()
}
