//! The ordered classpath.

use ripple_ir::UnitId;

use crate::{ClasspathEntry, EntryKind, Provider, SourceTypeIndex};

/// Where a referenced type comes from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Classification {
    /// Declared by a tracked source unit; subject to incremental analysis.
    Internal(UnitId),
    /// Provided by a binary entry; assumed stable for the build.
    External,
    /// No entry provides it. Probably a compile error, reported elsewhere.
    Unknown,
}

impl Classification {
    pub fn is_internal(&self) -> bool {
        matches!(self, Classification::Internal(_))
    }
}

/// Classpath entries in resolution order.
#[derive(Clone, Debug, Default)]
pub struct ClasspathModel {
    entries: Vec<ClasspathEntry>,
}

impl ClasspathModel {
    /// Create an empty classpath.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry at the end of the classpath.
    pub fn push(&mut self, entry: ClasspathEntry) {
        self.entries.push(entry);
    }

    /// Append an entry, builder style.
    #[must_use]
    pub fn with_entry(mut self, entry: ClasspathEntry) -> Self {
        self.push(entry);
        self
    }

    pub fn entries(&self) -> &[ClasspathEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Source folder paths, in classpath order.
    pub fn source_folders(&self) -> impl Iterator<Item = &str> {
        self.entries
            .iter()
            .filter(|e| e.kind() == EntryKind::SourceFolder)
            .map(ClasspathEntry::path)
    }

    /// First entry that provides `qualified`, with its answer.
    pub fn provider_of(
        &self,
        qualified: &str,
        sources: &dyn SourceTypeIndex,
    ) -> Option<(usize, Provider)> {
        self.entries
            .iter()
            .enumerate()
            .find_map(|(index, entry)| entry.provides_type(qualified, sources).map(|p| (index, p)))
    }

    /// Classify a qualified type name (dotted or slashed).
    ///
    /// The first entry in classpath order that provides the type decides.
    pub fn classify(&self, qualified: &str, sources: &dyn SourceTypeIndex) -> Classification {
        let classification = match self.provider_of(qualified, sources) {
            Some((_, Provider::Source(unit))) => Classification::Internal(unit),
            Some((_, Provider::Binary)) => Classification::External,
            None => Classification::Unknown,
        };
        tracing::trace!(qualified, ?classification, "classified type");
        classification
    }

    /// Index of the first entry that provides anything in `package`.
    pub fn package_provider(&self, package: &str, sources: &dyn SourceTypeIndex) -> Option<usize> {
        self.entries
            .iter()
            .position(|entry| entry.provides_package(package, sources))
    }
}
