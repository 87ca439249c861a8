//! Ripple Build - The Incremental Build Cycle
//!
//! Given a filesystem delta, decides which units to recompile, drives the
//! compilation service in rounds until structural changes stop cascading,
//! and persists the resulting state for the next cycle.
//!
//! # Architecture
//!
//! ```text
//! Delta ──► BuildCycleController ──► CompilationService (rounds, parallel)
//!                  │                        │
//!                  │                  UnitFacts per unit
//!                  ▼                        ▼
//!           ClasspathModel            BuildState.record()
//!       (binary change tracked?)            │
//!                                           ▼
//!                                 BuildResult + state file
//! ```
//!
//! Anything that makes the previous state untrustworthy (no state, an
//! unreadable state file, a tracked type changed in binary form, runaway
//! cascades) turns the cycle into a full build instead of an error.
//!
//! # Tracing
//!
//! Set `RUST_LOG=ripple_build=debug` and call [`init_tracing`] to see round
//! sizes and fallback reasons.

mod config;
mod controller;
mod delta;
mod result;
mod service;
mod tracing_setup;

pub use config::{BuildConfig, DEFAULT_MAX_COMPILE_LOOPS, DEFAULT_MAX_TRACKED_STRUCTURAL_CHANGES};
pub use controller::BuildCycleController;
pub use delta::{ChangeKind, Delta, FileChange};
pub use result::{BuildError, BuildKind, BuildResult, FallbackReason, UnitProblem};
pub use service::CompilationService;
pub use tracing_setup::init_tracing;
