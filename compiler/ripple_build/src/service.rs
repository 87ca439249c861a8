//! The seam to the external compiler.

use ripple_ir::UnitId;
use ripple_state::UnitFacts;

/// Compiles units on behalf of the build controller.
///
/// `compile` may be called from several threads at once; the controller
/// commits the results one unit at a time.
pub trait CompilationService: Sync {
    /// Every source unit that currently exists.
    fn source_units(&self) -> Vec<UnitId>;

    /// Compile one unit and report what it declares and references. The
    /// returned facts must be for `unit`. A failed compile is reported with
    /// `success == false`, never by panicking.
    fn compile(&self, unit: &UnitId) -> UnitFacts;

    /// Polled between compile rounds. A cancelled cycle leaves the previous
    /// state untouched.
    fn is_cancelled(&self) -> bool {
        false
    }
}
