//! Ripple State - What Must Be Recompiled?
//!
//! Holds the dependency information that survives between builds and
//! answers the engine's central question: given the units that changed,
//! which units must be recompiled?
//!
//! - [`BuildState`] maps each unit to its `ReferenceCollection`, each type to
//!   its structural fingerprint and declaring units, and tracks units with
//!   errors, duplicate types and removed types.
//! - [`serialize`] persists a state to a single versioned, checksummed file
//!   and reads it back all-or-nothing.
//!
//! The state never errs toward less recompilation: reference matches are
//! conservative, failed units and duplicate declarers are recompiled every
//! build, and an unreadable state file means a full build.

mod error;
mod facts;
pub mod serialize;
mod state;

pub use error::{FormatProblem, StateError, StateResult};
pub use facts::UnitFacts;
pub use state::BuildState;
