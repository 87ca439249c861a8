//! Outcome of one build cycle.

use std::collections::BTreeSet;
use std::fmt;

use thiserror::Error;

use ripple_ir::UnitId;
use ripple_state::{BuildState, StateError};

/// Whether a cycle rebuilt everything.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BuildKind {
    Full,
    Incremental,
}

/// Why an incremental request ran as a full build.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FallbackReason {
    /// No state was ever persisted.
    NoPriorState,
    /// The persisted state could not be used.
    StateUnreadable { kind: &'static str, message: String },
    /// Structural changes kept cascading past the round limit.
    CompileLoopLimit { rounds: usize },
    /// The compiled form of a tracked source type changed behind the
    /// builder's back.
    TrackedBinaryChanged { type_name: String, unit: UnitId },
}

impl fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FallbackReason::NoPriorState => write!(f, "no previous build state"),
            FallbackReason::StateUnreadable { kind, message } => {
                write!(f, "previous build state unusable ({kind}): {message}")
            }
            FallbackReason::CompileLoopLimit { rounds } => {
                write!(f, "structural changes still cascading after {rounds} compile rounds")
            }
            FallbackReason::TrackedBinaryChanged { type_name, unit } => {
                write!(f, "compiled form of {type_name} (declared by {unit}) changed")
            }
        }
    }
}

/// A per-unit problem surfaced for display. Never aborts a cycle.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UnitProblem {
    /// The unit failed to compile; it is retried every build until clean.
    Compile { unit: UnitId },
    /// Several units declare the same type; all of them are recompiled every
    /// build until the duplication is resolved.
    DuplicateType { type_name: String, units: Vec<UnitId> },
}

/// Summary of one build cycle.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BuildResult {
    pub kind: BuildKind,
    /// Every unit compiled during the cycle.
    pub recompiled: BTreeSet<UnitId>,
    pub problems: Vec<UnitProblem>,
    /// Compile rounds run.
    pub rounds: usize,
    /// Set when an incremental request ran as a full build.
    pub fallback: Option<FallbackReason>,
    pub build_number: u32,
    /// Types that changed structurally, or `None` if too many to track.
    pub structural_changes: Option<Vec<String>>,
}

impl BuildResult {
    /// Summarize a finished state.
    pub(crate) fn new(
        kind: BuildKind,
        recompiled: BTreeSet<UnitId>,
        rounds: usize,
        fallback: Option<FallbackReason>,
        state: &BuildState,
    ) -> Self {
        let mut problems: Vec<UnitProblem> = state
            .units_with_errors()
            .iter()
            .map(|unit| UnitProblem::Compile { unit: unit.clone() })
            .collect();
        problems.extend(state.duplicate_type_names().into_iter().map(|type_name| {
            let units = state.declaring_units(&type_name);
            UnitProblem::DuplicateType { type_name, units }
        }));
        BuildResult {
            kind,
            recompiled,
            problems,
            rounds,
            fallback,
            build_number: state.build_number(),
            structural_changes: state.last_structural_changes(),
        }
    }

    pub fn recompiled_count(&self) -> usize {
        self.recompiled.len()
    }

    /// Units that failed to compile.
    pub fn failed_units(&self) -> impl Iterator<Item = &UnitId> {
        self.problems.iter().filter_map(|problem| match problem {
            UnitProblem::Compile { unit } => Some(unit),
            UnitProblem::DuplicateType { .. } => None,
        })
    }

    pub fn error_count(&self) -> usize {
        self.failed_units().count()
    }

    pub fn duplicate_count(&self) -> usize {
        self.problems
            .iter()
            .filter(|problem| matches!(problem, UnitProblem::DuplicateType { .. }))
            .count()
    }
}

/// A cycle that did not complete normally.
#[derive(Error, Debug)]
pub enum BuildError {
    /// The service asked to stop. The previous state is kept in memory and
    /// on disk.
    #[error("build cancelled")]
    Cancelled,

    /// The cycle completed and its state is in memory, but writing it failed.
    #[error("failed to persist build state: {0}")]
    Persist(#[from] StateError),
}
