//! Classpath entries.

use rustc_hash::FxHashSet;

use ripple_ir::UnitId;

use crate::{dotted, SourceTypeIndex};

/// What kind of location an entry is.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum EntryKind {
    /// Folder of tracked source units. Its types are subject to incremental
    /// analysis.
    SourceFolder,
    /// Folder of compiled classes produced outside this build.
    OutputFolder,
    /// Library archive.
    Archive,
    /// Named module from the module path.
    Module,
}

/// Which kind of entry answered a type lookup.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Provider {
    /// Declared by this tracked source unit.
    Source(UnitId),
    /// Listed by a binary entry.
    Binary,
}

impl EntryKind {
    pub fn is_source(self) -> bool {
        matches!(self, EntryKind::SourceFolder)
    }
}

/// One classpath entry.
///
/// Binary entries (output folders, archives, modules) carry the set of types
/// they provide. Source folders carry nothing; they answer from the tracked
/// units whose path lies under the folder.
#[derive(Clone, Debug)]
pub struct ClasspathEntry {
    kind: EntryKind,
    path: String,
    module_name: Option<String>,
    types: FxHashSet<String>,
    packages: FxHashSet<String>,
}

impl ClasspathEntry {
    fn new(kind: EntryKind, path: impl Into<String>) -> Self {
        ClasspathEntry {
            kind,
            path: path.into(),
            module_name: None,
            types: FxHashSet::default(),
            packages: FxHashSet::default(),
        }
    }

    /// A folder of tracked source units, e.g. `src`.
    pub fn source_folder(path: impl Into<String>) -> Self {
        Self::new(EntryKind::SourceFolder, path)
    }

    /// A folder of already-compiled classes.
    pub fn output_folder(path: impl Into<String>) -> Self {
        Self::new(EntryKind::OutputFolder, path)
    }

    /// A library archive.
    pub fn archive(path: impl Into<String>) -> Self {
        Self::new(EntryKind::Archive, path)
    }

    /// A named module.
    pub fn module(name: impl Into<String>, path: impl Into<String>) -> Self {
        let mut entry = Self::new(EntryKind::Module, path);
        entry.module_name = Some(name.into());
        entry
    }

    /// Declare a type this binary entry provides. Ignored for source folders.
    #[must_use]
    pub fn with_type(mut self, qualified: &str) -> Self {
        self.add_type(qualified);
        self
    }

    /// Declare several provided types.
    #[must_use]
    pub fn with_types<I>(mut self, types: I) -> Self
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        for qualified in types {
            self.add_type(qualified.as_ref());
        }
        self
    }

    fn add_type(&mut self, qualified: &str) {
        if self.kind.is_source() {
            return;
        }
        let qualified = dotted(qualified);
        let mut package = qualified.as_str();
        while let Some(dot) = package.rfind('.') {
            package = &package[..dot];
            if !self.packages.insert(package.to_owned()) {
                // Every enclosing package is already recorded.
                break;
            }
        }
        self.types.insert(qualified);
    }

    pub fn kind(&self) -> EntryKind {
        self.kind
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn module_name(&self) -> Option<&str> {
        self.module_name.as_deref()
    }

    /// Number of types a binary entry provides.
    pub fn type_count(&self) -> usize {
        self.types.len()
    }

    /// Does this entry provide `qualified`?
    ///
    /// For a source folder, answers with the first declaring unit that lives
    /// under the folder.
    pub fn provides_type(&self, qualified: &str, sources: &dyn SourceTypeIndex) -> Option<Provider> {
        let qualified = dotted(qualified);
        if self.kind.is_source() {
            sources
                .declaring_units(&qualified)
                .into_iter()
                .find(|unit| unit.is_under(&self.path))
                .map(Provider::Source)
        } else if self.types.contains(&qualified) {
            Some(Provider::Binary)
        } else {
            None
        }
    }

    /// Does this entry provide anything in `package` (dotted or slashed)?
    pub fn provides_package(&self, package: &str, sources: &dyn SourceTypeIndex) -> bool {
        let package = dotted(package);
        if self.kind.is_source() {
            sources.has_package_under(&self.path, &package)
        } else {
            self.packages.contains(&package)
        }
    }
}
