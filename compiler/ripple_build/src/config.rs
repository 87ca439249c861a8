//! Build cycle configuration.

use std::path::PathBuf;

/// Compile rounds an incremental cycle may take before giving up and
/// running a full build.
pub const DEFAULT_MAX_COMPILE_LOOPS: usize = 5;

/// Structural changes remembered per build before the set is reported as
/// unknown.
pub const DEFAULT_MAX_TRACKED_STRUCTURAL_CHANGES: usize = 100;

/// Configuration for a `BuildCycleController`.
#[derive(Clone, Debug)]
pub struct BuildConfig {
    /// Where the persisted state lives. `None` keeps state in memory only.
    pub state_path: Option<PathBuf>,
    /// Maximum compile rounds in one incremental cycle.
    pub max_compile_loops: usize,
    /// Maximum structural changes kept as "last build's changes".
    pub max_tracked_structural_changes: usize,
    /// Compile a round's units on a thread pool.
    pub parallel: bool,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            state_path: None,
            max_compile_loops: DEFAULT_MAX_COMPILE_LOOPS,
            max_tracked_structural_changes: DEFAULT_MAX_TRACKED_STRUCTURAL_CHANGES,
            parallel: true,
        }
    }
}

impl BuildConfig {
    /// Configuration persisting state at `path`.
    #[must_use]
    pub fn new(state_path: impl Into<PathBuf>) -> Self {
        Self {
            state_path: Some(state_path.into()),
            ..Self::default()
        }
    }

    /// Keep state in memory only.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Set the compile-round limit.
    #[must_use]
    pub fn with_max_compile_loops(mut self, loops: usize) -> Self {
        self.max_compile_loops = loops;
        self
    }

    /// Set how many structural changes are remembered.
    #[must_use]
    pub fn with_max_tracked_structural_changes(mut self, max: usize) -> Self {
        self.max_tracked_structural_changes = max;
        self
    }

    /// Enable or disable parallel compilation.
    #[must_use]
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }
}
