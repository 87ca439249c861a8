//! Orchestration of one build cycle.
//!
//! # Incremental Cycle
//!
//! ```text
//! delta ──► removed units dropped (tombstones)
//!       ──► binary type changes classified ──► tracked type? full build
//!       ──► round 1: compile changed units, record fresh fingerprints
//!       ──► affected_by(changed) ──► round 2: compile the expansion
//!       ──► dependents of round N's structural changes ──► round N+1
//!       ──► finish, persist
//! ```
//!
//! The cycle works on a clone of the state. The clone replaces the live
//! state only when the cycle completes, so a cancelled cycle leaves both
//! the in-memory and the persisted state as they were.

use std::collections::BTreeSet;

use rayon::prelude::*;

use ripple_classpath::{Classification, ClasspathModel};
use ripple_ir::{QualifiedName, UnitId};
use ripple_state::{serialize, BuildState, StateError, UnitFacts};

use crate::{
    BuildConfig, BuildError, BuildKind, BuildResult, ChangeKind, CompilationService, Delta,
    FallbackReason,
};

/// Drives incremental and full builds over one exclusively owned state.
pub struct BuildCycleController {
    config: BuildConfig,
    classpath: ClasspathModel,
    state: Option<BuildState>,
    /// Why there is no state, when loading failed.
    load_failure: Option<FallbackReason>,
    pool: Option<rayon::ThreadPool>,
}

/// How an incremental attempt ended.
enum Attempt {
    Done {
        recompiled: BTreeSet<UnitId>,
        rounds: usize,
    },
    Fallback(FallbackReason),
}

impl BuildCycleController {
    /// Open a controller, loading persisted state if the config names a
    /// state file. An unreadable state is logged and the next build runs
    /// full; it is never an error to the caller.
    pub fn open(config: BuildConfig, classpath: ClasspathModel) -> Self {
        let (state, load_failure) = match config.state_path.as_deref() {
            None => (None, None),
            Some(path) => match serialize::load(path) {
                Ok(Some(state)) => {
                    tracing::info!(
                        path = %path.display(),
                        units = state.unit_count(),
                        build_number = state.build_number(),
                        "loaded build state"
                    );
                    (Some(state), None)
                }
                Ok(None) => {
                    tracing::info!(path = %path.display(), "no build state yet");
                    (None, None)
                }
                Err(e) => {
                    report_load_failure(&e);
                    let reason = FallbackReason::StateUnreadable {
                        kind: e.kind(),
                        message: e.to_string(),
                    };
                    (None, Some(reason))
                }
            },
        };
        Self::assemble(config, classpath, state, load_failure)
    }

    /// Create a controller around an existing state, bypassing the state
    /// file on open. The file is still written at the end of each cycle.
    pub fn with_state(config: BuildConfig, classpath: ClasspathModel, state: BuildState) -> Self {
        Self::assemble(config, classpath, Some(state), None)
    }

    fn assemble(
        config: BuildConfig,
        classpath: ClasspathModel,
        state: Option<BuildState>,
        load_failure: Option<FallbackReason>,
    ) -> Self {
        let pool = if config.parallel {
            rayon::ThreadPoolBuilder::new()
                .thread_name(|i| format!("ripple-compile-{i}"))
                .build()
                .map_err(|e| {
                    tracing::warn!("failed to create thread pool ({e}), compiling sequentially");
                })
                .ok()
        } else {
            None
        };
        BuildCycleController {
            config,
            classpath,
            state,
            load_failure,
            pool,
        }
    }

    pub fn config(&self) -> &BuildConfig {
        &self.config
    }

    pub fn classpath(&self) -> &ClasspathModel {
        &self.classpath
    }

    /// The committed state, if any build has completed or one was loaded.
    pub fn state(&self) -> Option<&BuildState> {
        self.state.as_ref()
    }

    /// Build what changed since the last cycle.
    ///
    /// Runs a full build instead when there is no usable previous state,
    /// when the delta touches the compiled form of a tracked type, or when
    /// structural changes cascade past `max_compile_loops`.
    #[tracing::instrument(level = "debug", skip_all, fields(
        changes = delta.changes.len(),
        external = delta.external_types.len(),
    ))]
    pub fn run_incremental(
        &mut self,
        service: &dyn CompilationService,
        delta: &Delta,
    ) -> Result<BuildResult, BuildError> {
        let Some(mut state) = self.state.clone() else {
            let reason = self
                .load_failure
                .clone()
                .unwrap_or(FallbackReason::NoPriorState);
            return self.fall_back(service, reason);
        };

        match self.attempt_incremental(&mut state, service, delta)? {
            Attempt::Done { recompiled, rounds } => {
                self.commit(state, service, BuildKind::Incremental, recompiled, rounds, None)
            }
            Attempt::Fallback(reason) => self.fall_back(service, reason),
        }
    }

    /// Rebuild every source unit from a fresh state.
    #[tracing::instrument(level = "debug", skip_all)]
    pub fn run_full(&mut self, service: &dyn CompilationService) -> Result<BuildResult, BuildError> {
        self.full_build(service, None)
    }

    fn fall_back(
        &mut self,
        service: &dyn CompilationService,
        reason: FallbackReason,
    ) -> Result<BuildResult, BuildError> {
        tracing::info!(%reason, "falling back to full build");
        self.full_build(service, Some(reason))
    }

    fn full_build(
        &mut self,
        service: &dyn CompilationService,
        fallback: Option<FallbackReason>,
    ) -> Result<BuildResult, BuildError> {
        let mut state = BuildState::new();
        let units: BTreeSet<UnitId> = service.source_units().into_iter().collect();
        tracing::debug!(units = units.len(), "full build");
        let rounds = if units.is_empty() {
            0
        } else {
            self.compile_round(&mut state, service, &units)?;
            1
        };
        self.commit(state, service, BuildKind::Full, units, rounds, fallback)
    }

    fn attempt_incremental(
        &self,
        state: &mut BuildState,
        service: &dyn CompilationService,
        delta: &Delta,
    ) -> Result<Attempt, BuildError> {
        state.begin_build();
        let sources: BTreeSet<UnitId> = service.source_units().into_iter().collect();

        // Units the service no longer lists are gone, reported or not.
        let vanished: Vec<UnitId> = state
            .units()
            .filter(|unit| !sources.contains(*unit))
            .cloned()
            .collect();
        for unit in &vanished {
            state.remove_unit(unit);
        }

        let mut changed = BTreeSet::new();
        for (unit, kind) in delta.net_changes() {
            match kind {
                ChangeKind::Removed => {
                    state.remove_unit(&unit);
                }
                ChangeKind::Added | ChangeKind::Modified if sources.contains(&unit) => {
                    changed.insert(unit);
                }
                ChangeKind::Added | ChangeKind::Modified => {
                    tracing::warn!(%unit, "changed unit is not a source unit, skipped");
                }
            }
        }

        // Likewise, sources the state has never seen are new.
        for unit in sources.iter().filter(|unit| !state.contains_unit(unit)) {
            if changed.insert(unit.clone()) {
                tracing::debug!(%unit, "unrecorded source unit, compiling");
            }
        }

        for type_name in &delta.external_types {
            match self.classpath.classify(type_name, &*state) {
                Classification::Internal(unit) => {
                    return Ok(Attempt::Fallback(FallbackReason::TrackedBinaryChanged {
                        type_name: type_name.clone(),
                        unit,
                    }));
                }
                Classification::External | Classification::Unknown => {
                    state.note_structural_change(type_name);
                }
            }
        }

        let mut recompiled = BTreeSet::new();
        let mut rounds = 0;
        if !changed.is_empty() {
            rounds += 1;
            self.compile_round(state, service, &changed)?;
            recompiled.extend(changed.iter().cloned());
        }

        let mut worklist: BTreeSet<UnitId> = state
            .affected_by(&changed)
            .into_iter()
            .filter(|unit| !changed.contains(unit) && sources.contains(unit))
            .collect();
        while !worklist.is_empty() {
            rounds += 1;
            if rounds > self.config.max_compile_loops {
                return Ok(Attempt::Fallback(FallbackReason::CompileLoopLimit {
                    rounds: self.config.max_compile_loops,
                }));
            }
            let structural = self.compile_round(state, service, &worklist)?;
            recompiled.extend(worklist.iter().cloned());
            worklist = state
                .dependents_of(structural)
                .into_iter()
                .filter(|unit| !worklist.contains(unit) && sources.contains(unit))
                .collect();
        }

        Ok(Attempt::Done { recompiled, rounds })
    }

    /// Compile `units` and commit their facts one unit at a time. Returns
    /// the round's structural changes.
    fn compile_round(
        &self,
        state: &mut BuildState,
        service: &dyn CompilationService,
        units: &BTreeSet<UnitId>,
    ) -> Result<Vec<QualifiedName>, BuildError> {
        if service.is_cancelled() {
            return Err(BuildError::Cancelled);
        }
        tracing::debug!(units = units.len(), "compile round");

        let mut structural = Vec::new();
        for facts in self.compile_all(service, units) {
            structural.extend(state.record(facts));
        }
        tracing::debug!(structural = structural.len(), "round committed");
        Ok(structural)
    }

    fn compile_all(
        &self,
        service: &dyn CompilationService,
        units: &BTreeSet<UnitId>,
    ) -> Vec<UnitFacts> {
        let units: Vec<&UnitId> = units.iter().collect();
        match &self.pool {
            Some(pool) if units.len() > 1 => pool.install(|| {
                units
                    .par_iter()
                    .map(|unit| service.compile(unit))
                    .collect()
            }),
            _ => units.iter().map(|unit| service.compile(unit)).collect(),
        }
    }

    /// Close the cycle, swap the new state in and persist it.
    fn commit(
        &mut self,
        mut state: BuildState,
        service: &dyn CompilationService,
        kind: BuildKind,
        recompiled: BTreeSet<UnitId>,
        rounds: usize,
        fallback: Option<FallbackReason>,
    ) -> Result<BuildResult, BuildError> {
        if service.is_cancelled() {
            return Err(BuildError::Cancelled);
        }
        state.finish_build(self.config.max_tracked_structural_changes);
        let result = BuildResult::new(kind, recompiled, rounds, fallback, &state);
        tracing::info!(
            kind = ?result.kind,
            recompiled = result.recompiled_count(),
            errors = result.error_count(),
            duplicates = result.duplicate_count(),
            rounds = result.rounds,
            "build finished"
        );

        let persisted = match self.config.state_path.as_deref() {
            Some(path) => serialize::save(path, &state).map(|_| ()),
            None => Ok(()),
        };
        self.state = Some(state);
        self.load_failure = None;
        persisted?;
        Ok(result)
    }
}

fn report_load_failure(error: &StateError) {
    match error {
        StateError::Format(problem) => {
            tracing::warn!(%problem, "build state has an incompatible format, full build required");
        }
        StateError::Corruption { reason } => {
            tracing::warn!(%reason, "build state is corrupt, full build required");
        }
        other => {
            tracing::warn!(error = %other, "build state could not be read, full build required");
        }
    }
}
