//! Filesystem deltas.

use ripple_ir::UnitId;

/// How a unit changed on disk.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    Added,
    Removed,
    Modified,
}

/// One entry reported by the filesystem watcher.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileChange {
    pub unit: UnitId,
    pub kind: ChangeKind,
}

/// Changes since the last build, in watcher order.
///
/// Besides source units, a delta may name types whose compiled form changed
/// on a binary classpath entry (a replaced archive, for instance).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Delta {
    pub changes: Vec<FileChange>,
    /// Qualified names (dotted or slashed) of changed binary types.
    pub external_types: Vec<String>,
}

impl Delta {
    /// An empty delta.
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn added(mut self, unit: impl Into<String>) -> Self {
        self.push(unit, ChangeKind::Added);
        self
    }

    #[must_use]
    pub fn removed(mut self, unit: impl Into<String>) -> Self {
        self.push(unit, ChangeKind::Removed);
        self
    }

    #[must_use]
    pub fn modified(mut self, unit: impl Into<String>) -> Self {
        self.push(unit, ChangeKind::Modified);
        self
    }

    #[must_use]
    pub fn external_type(mut self, qualified: impl Into<String>) -> Self {
        self.external_types.push(qualified.into());
        self
    }

    pub fn push(&mut self, unit: impl Into<String>, kind: ChangeKind) {
        self.changes.push(FileChange {
            unit: UnitId::new(unit),
            kind,
        });
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty() && self.external_types.is_empty()
    }

    /// Final kind of each unit after replaying the changes in order.
    ///
    /// A unit removed and then re-added counts as modified; one added and
    /// then removed drops out as removed.
    pub fn net_changes(&self) -> Vec<(UnitId, ChangeKind)> {
        let mut net: Vec<(UnitId, ChangeKind)> = Vec::new();
        for change in &self.changes {
            match net.iter_mut().find(|(unit, _)| *unit == change.unit) {
                Some((_, kind)) => *kind = merge(*kind, change.kind),
                None => net.push((change.unit.clone(), change.kind)),
            }
        }
        net
    }
}

fn merge(earlier: ChangeKind, later: ChangeKind) -> ChangeKind {
    match (earlier, later) {
        (_, ChangeKind::Removed) => ChangeKind::Removed,
        (ChangeKind::Removed, _) => ChangeKind::Modified,
        (ChangeKind::Added, _) => ChangeKind::Added,
        (ChangeKind::Modified, _) => ChangeKind::Modified,
    }
}
