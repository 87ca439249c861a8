//! What the external compiler reports for one unit.

use ripple_ir::{Fingerprint, UnitId};

/// Facts about one compiled unit, as reported by the compiler.
///
/// Names are textual. Qualified names may use `.` or `/` separators. A unit
/// is committed all-or-nothing: `BuildState::record` replaces every fact it
/// held about the unit with this set.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnitFacts {
    pub unit: UnitId,
    /// Types the unit declares. Types listed in `fingerprints` count as
    /// declared even when missing here.
    pub declared_types: Vec<String>,
    pub simple_refs: Vec<String>,
    pub root_refs: Vec<String>,
    pub qualified_refs: Vec<String>,
    pub fingerprints: Vec<(String, Fingerprint)>,
    pub success: bool,
}

impl UnitFacts {
    /// A successful compile that declares and references nothing.
    pub fn new(unit: UnitId) -> Self {
        UnitFacts {
            unit,
            declared_types: Vec::new(),
            simple_refs: Vec::new(),
            root_refs: Vec::new(),
            qualified_refs: Vec::new(),
            fingerprints: Vec::new(),
            success: true,
        }
    }

    /// Declare a type with its structural fingerprint.
    #[must_use]
    pub fn declares(mut self, qualified: impl Into<String>, fingerprint: Fingerprint) -> Self {
        let qualified = qualified.into();
        self.fingerprints.push((qualified.clone(), fingerprint));
        self.declared_types.push(qualified);
        self
    }

    /// Declare a type the compiler produced no fingerprint for.
    #[must_use]
    pub fn declares_unfingerprinted(mut self, qualified: impl Into<String>) -> Self {
        self.declared_types.push(qualified.into());
        self
    }

    /// Reference a fully qualified type. Its root is recorded implicitly.
    #[must_use]
    pub fn references_type(mut self, qualified: impl Into<String>) -> Self {
        self.qualified_refs.push(qualified.into());
        self
    }

    /// Reference a simple identifier.
    #[must_use]
    pub fn references_name(mut self, simple: impl Into<String>) -> Self {
        self.simple_refs.push(simple.into());
        self
    }

    /// Reference a root name, e.g. the package of an on-demand import.
    #[must_use]
    pub fn references_root(mut self, root: impl Into<String>) -> Self {
        self.root_refs.push(root.into());
        self
    }

    /// Mark the compile as failed.
    #[must_use]
    pub fn failed(mut self) -> Self {
        self.success = false;
        self
    }
}
