//! Build state and the affected-set algorithm.
//!
//! # Lifecycle of one incremental build
//!
//! ```text
//! begin_build()          clear this build's structural changes
//! remove_unit(..)*       deleted units leave tombstones
//! record(facts)*         commit each compiled unit, collect structural changes
//! affected_by(changed)   expand to everything that must be recompiled
//! finish_build(max)      remember the changes, drop tombstones
//! ```
//!
//! A full build starts from `BuildState::new()` instead and records every
//! unit.

use std::collections::{BTreeMap, BTreeSet};
use std::mem;

use rustc_hash::{FxHashMap, FxHashSet};

use ripple_classpath::SourceTypeIndex;
use ripple_ir::{Fingerprint, Name, NameTable, QualifiedName, ReferenceCollection, UnitId};

use crate::UnitFacts;

/// What the state remembers about one compiled unit.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct UnitRecord {
    /// Declared types, sorted by handle.
    pub(crate) declared: Vec<QualifiedName>,
    pub(crate) references: ReferenceCollection,
}

/// Dependency information that survives between builds.
///
/// Owns its `NameTable`; every handle stored here belongs to that table.
/// The state is a plain value: the build controller clones it at the start
/// of a cycle and swaps the clone in when the cycle completes.
#[derive(Clone, Debug)]
pub struct BuildState {
    pub(crate) names: NameTable,
    pub(crate) units: BTreeMap<UnitId, UnitRecord>,
    /// Type locators: every unit declaring a type.
    pub(crate) declarers: FxHashMap<QualifiedName, BTreeSet<UnitId>>,
    pub(crate) fingerprints: FxHashMap<QualifiedName, Fingerprint>,
    pub(crate) structurally_changed: FxHashSet<QualifiedName>,
    pub(crate) units_with_errors: BTreeSet<UnitId>,
    pub(crate) duplicate_types: FxHashSet<QualifiedName>,
    /// Types whose last declarer was removed. Consumed by the next build.
    pub(crate) tombstones: FxHashSet<QualifiedName>,
    pub(crate) build_number: u32,
    pub(crate) last_structural_changes: Option<FxHashSet<QualifiedName>>,
}

impl Default for BuildState {
    fn default() -> Self {
        Self::new()
    }
}

impl BuildState {
    /// An empty state, as used by a full build.
    pub fn new() -> Self {
        BuildState {
            names: NameTable::new(),
            units: BTreeMap::new(),
            declarers: FxHashMap::default(),
            fingerprints: FxHashMap::default(),
            structurally_changed: FxHashSet::default(),
            units_with_errors: BTreeSet::new(),
            duplicate_types: FxHashSet::default(),
            tombstones: FxHashSet::default(),
            build_number: 0,
            last_structural_changes: Some(FxHashSet::default()),
        }
    }

    /// Start an incremental build.
    pub fn begin_build(&mut self) {
        self.structurally_changed.clear();
        self.build_number = self.build_number.wrapping_add(1);
    }

    /// Close a build. Structural changes beyond `max_tracked` are forgotten
    /// and reported as unknown.
    pub fn finish_build(&mut self, max_tracked: usize) {
        let changed = mem::take(&mut self.structurally_changed);
        self.last_structural_changes = if changed.len() > max_tracked {
            tracing::debug!(
                changed = changed.len(),
                max_tracked,
                "too many structural changes to track"
            );
            None
        } else {
            Some(changed)
        };
        self.tombstones.clear();
    }

    /// Commit one compiled unit.
    ///
    /// Replaces the unit's references and declared types wholesale, updates
    /// fingerprints and the error set. Returns the types that changed
    /// structurally: a different fingerprint, a new type, or a type the unit
    /// no longer declares.
    pub fn record(&mut self, facts: UnitFacts) -> Vec<QualifiedName> {
        let UnitFacts {
            unit,
            declared_types,
            simple_refs,
            root_refs,
            qualified_refs,
            fingerprints,
            success,
        } = facts;

        let mut reported: FxHashMap<QualifiedName, Fingerprint> = FxHashMap::default();
        for (qualified, fingerprint) in &fingerprints {
            reported.insert(self.names.intern_path(qualified), *fingerprint);
        }
        let mut declared: Vec<QualifiedName> = declared_types
            .iter()
            .map(|qualified| self.names.intern_path(qualified))
            .chain(reported.keys().copied())
            .collect();
        declared.sort_unstable();
        declared.dedup();

        let references =
            ReferenceCollection::intern(&mut self.names, simple_refs, root_refs, qualified_refs);
        let previous = self.units.insert(
            unit.clone(),
            UnitRecord {
                declared: declared.clone(),
                references,
            },
        );

        let previously_declared = previous.map(|record| record.declared).unwrap_or_default();
        let mut changed = Vec::new();
        for &ty in &previously_declared {
            if declared.binary_search(&ty).is_err() {
                self.forget_declaration(ty, &unit);
                changed.push(ty);
            }
        }

        for &ty in &declared {
            let was_duplicate = self.duplicate_types.contains(&ty);
            let is_new = self.declarers.entry(ty).or_default().insert(unit.clone());
            let fresh = reported.get(&ty).copied();
            let previous = match fresh {
                Some(fingerprint) => self.fingerprints.insert(ty, fingerprint),
                None => self.fingerprints.remove(&ty),
            };
            self.refresh_duplicate(ty);
            // The stored fingerprint of a duplicate belongs to whichever
            // declarer was recorded last, so comparing against it says
            // nothing about this unit.
            let still_duplicate = was_duplicate && self.duplicate_types.contains(&ty);
            if is_new || (previous != fresh && !still_duplicate) {
                changed.push(ty);
            }
        }

        if success {
            self.units_with_errors.remove(&unit);
        } else {
            self.units_with_errors.insert(unit.clone());
        }

        for &ty in &changed {
            tracing::trace!(%unit, type_name = %self.names.display(ty), "structural change");
            self.structurally_changed.insert(ty);
        }
        changed
    }

    /// Forget a deleted unit.
    ///
    /// Types it alone declared lose their fingerprints and become tombstones,
    /// so their dependents are recompiled by the next affected-set
    /// computation. Returns false if the unit was unknown.
    pub fn remove_unit(&mut self, unit: &UnitId) -> bool {
        let Some(record) = self.units.remove(unit) else {
            return false;
        };
        for ty in record.declared {
            self.forget_declaration(ty, unit);
            self.tombstones.insert(ty);
        }
        self.units_with_errors.remove(unit);
        tracing::debug!(%unit, "removed unit");
        true
    }

    /// Mark a type as structurally changed from outside the compile loop,
    /// e.g. a library type whose binary was replaced.
    pub fn note_structural_change(&mut self, qualified: &str) -> QualifiedName {
        let ty = self.names.intern_path(qualified);
        tracing::trace!(type_name = %self.names.display(ty), "external structural change");
        self.structurally_changed.insert(ty);
        ty
    }

    /// The complete set of units to recompile given directly changed units.
    ///
    /// Seeds with the changed units that still exist, every unit that failed
    /// to compile, and every declarer of a duplicate type, then adds the
    /// dependents of this build's structural changes and tombstones.
    /// Units that no longer exist are never returned.
    pub fn affected_by(&self, changed: &BTreeSet<UnitId>) -> BTreeSet<UnitId> {
        let mut affected: BTreeSet<UnitId> = changed
            .iter()
            .filter(|unit| self.units.contains_key(*unit))
            .cloned()
            .collect();
        affected.extend(self.units_with_errors.iter().cloned());
        affected.extend(self.duplicate_declarers());
        let changed_types = self
            .structurally_changed
            .iter()
            .chain(&self.tombstones)
            .copied();
        affected.extend(self.dependents_of(changed_types));
        affected
    }

    /// Units whose references might reach any of `types`.
    ///
    /// A unit matches a type if it references the qualified name, its root
    /// segment, or its simple (last) name.
    pub fn dependents_of(
        &self,
        types: impl IntoIterator<Item = QualifiedName>,
    ) -> BTreeSet<UnitId> {
        let probes: Vec<(QualifiedName, Name)> = types
            .into_iter()
            .map(|ty| (ty, self.names.last_segment(ty)))
            .collect();
        if probes.is_empty() {
            return BTreeSet::new();
        }
        self.units
            .iter()
            .filter(|(_, record)| {
                probes.iter().any(|&(ty, simple)| {
                    record.references.might_reference_qualified(&self.names, ty)
                        || (simple != Name::EMPTY && record.references.might_reference(simple))
                })
            })
            .map(|(unit, _)| unit.clone())
            .collect()
    }

    /// Every unit declaring a duplicate type.
    pub fn duplicate_declarers(&self) -> BTreeSet<UnitId> {
        self.duplicate_types
            .iter()
            .filter_map(|ty| self.declarers.get(ty))
            .flatten()
            .cloned()
            .collect()
    }

    fn forget_declaration(&mut self, ty: QualifiedName, unit: &UnitId) {
        if let Some(units) = self.declarers.get_mut(&ty) {
            units.remove(unit);
            if units.is_empty() {
                self.declarers.remove(&ty);
                self.fingerprints.remove(&ty);
            }
        }
        self.refresh_duplicate(ty);
    }

    fn refresh_duplicate(&mut self, ty: QualifiedName) {
        let count = self.declarers.get(&ty).map_or(0, BTreeSet::len);
        if count > 1 {
            if self.duplicate_types.insert(ty) {
                tracing::warn!(
                    type_name = %self.names.display(ty),
                    declarers = count,
                    "type declared by more than one unit"
                );
            }
        } else {
            self.duplicate_types.remove(&ty);
        }
    }

    fn find_type(&self, qualified: &str) -> Option<QualifiedName> {
        self.names.find_path(qualified)
    }

    /// Segment handles of a package path, or `None` if some segment was
    /// never interned (so no known type can live there).
    fn find_package(&self, package: &str) -> Option<Vec<Name>> {
        package
            .split(['.', '/'])
            .filter(|segment| !segment.is_empty())
            .map(|segment| self.names.find(segment.as_bytes()))
            .collect()
    }

    fn in_package(&self, ty: QualifiedName, package: &[Name]) -> bool {
        let segments = self.names.segments(ty);
        segments.len() > package.len() && segments.starts_with(package)
    }

    fn sorted_display<'a>(&self, types: impl Iterator<Item = &'a QualifiedName>) -> Vec<String> {
        let mut out: Vec<String> = types.map(|ty| self.names.display(*ty)).collect();
        out.sort();
        out
    }
}

/// Read accessors.
impl BuildState {
    pub fn names(&self) -> &NameTable {
        &self.names
    }

    pub fn build_number(&self) -> u32 {
        self.build_number
    }

    /// Tracked units, in id order.
    pub fn units(&self) -> impl Iterator<Item = &UnitId> {
        self.units.keys()
    }

    pub fn unit_count(&self) -> usize {
        self.units.len()
    }

    pub fn contains_unit(&self, unit: &UnitId) -> bool {
        self.units.contains_key(unit)
    }

    pub fn references(&self, unit: &UnitId) -> Option<&ReferenceCollection> {
        self.units.get(unit).map(|record| &record.references)
    }

    /// Types a unit declares, dotted and sorted.
    pub fn declared_types(&self, unit: &UnitId) -> Vec<String> {
        self.units
            .get(unit)
            .map(|record| self.sorted_display(record.declared.iter()))
            .unwrap_or_default()
    }

    /// Number of distinct declared types.
    pub fn type_count(&self) -> usize {
        self.declarers.len()
    }

    pub fn fingerprint(&self, qualified: &str) -> Option<Fingerprint> {
        self.find_type(qualified)
            .and_then(|ty| self.fingerprints.get(&ty).copied())
    }

    pub fn declaring_units(&self, qualified: &str) -> Vec<UnitId> {
        self.find_type(qualified)
            .and_then(|ty| self.declarers.get(&ty))
            .map(|units| units.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn is_known_type(&self, qualified: &str) -> bool {
        self.find_type(qualified)
            .is_some_and(|ty| self.declarers.contains_key(&ty))
    }

    /// True if a tracked type lives in `package` or one of its sub-packages.
    pub fn is_known_package(&self, package: &str) -> bool {
        let Some(package) = self.find_package(package) else {
            return false;
        };
        self.declarers
            .keys()
            .any(|&ty| self.in_package(ty, &package))
    }

    /// True if a unit other than `unit` declares `qualified`.
    pub fn is_duplicate_locator(&self, qualified: &str, unit: &UnitId) -> bool {
        self.find_type(qualified)
            .and_then(|ty| self.declarers.get(&ty))
            .is_some_and(|units| units.iter().any(|other| other != unit))
    }

    pub fn units_with_errors(&self) -> &BTreeSet<UnitId> {
        &self.units_with_errors
    }

    /// Types declared by more than one unit, dotted and sorted.
    pub fn duplicate_type_names(&self) -> Vec<String> {
        self.sorted_display(self.duplicate_types.iter())
    }

    /// Structural changes recorded so far in the current build.
    pub fn structurally_changed(&self) -> Vec<String> {
        self.sorted_display(self.structurally_changed.iter())
    }

    /// Types removed since the last build finished.
    pub fn tombstones(&self) -> Vec<String> {
        self.sorted_display(self.tombstones.iter())
    }

    /// Structural changes of the last finished build. `None` means too many
    /// to track; assume everything changed.
    pub fn last_structural_changes(&self) -> Option<Vec<String>> {
        self.last_structural_changes
            .as_ref()
            .map(|changed| self.sorted_display(changed.iter()))
    }
}

impl SourceTypeIndex for BuildState {
    fn declaring_units(&self, qualified: &str) -> Vec<UnitId> {
        BuildState::declaring_units(self, qualified)
    }

    fn has_package_under(&self, folder: &str, package: &str) -> bool {
        let Some(package) = self.find_package(package) else {
            return false;
        };
        self.declarers.iter().any(|(&ty, units)| {
            self.in_package(ty, &package) && units.iter().any(|unit| unit.is_under(folder))
        })
    }
}
