//! Shared test utilities for build cycle tests.

// Not every test module uses every helper
#![allow(dead_code)]

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;

use ripple_build::{BuildConfig, BuildCycleController, CompilationService};
use ripple_classpath::{ClasspathEntry, ClasspathModel};
use ripple_ir::{Fingerprint, UnitId};
use ripple_state::UnitFacts;

pub fn unit(path: &str) -> UnitId {
    UnitId::new(path)
}

pub fn units(paths: &[&str]) -> BTreeSet<UnitId> {
    paths.iter().map(|p| unit(p)).collect()
}

/// The source of one fake unit: what compiling it reports.
#[derive(Clone, Debug, Default)]
pub struct FakeSource {
    declares: Vec<(String, u64)>,
    references: Vec<String>,
    simple: Vec<String>,
    roots: Vec<String>,
    failing: bool,
    /// Fingerprints change on every compile.
    unstable: bool,
}

impl FakeSource {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn declares(mut self, qualified: &str, fingerprint: u64) -> Self {
        self.declares.push((qualified.to_string(), fingerprint));
        self
    }

    #[must_use]
    pub fn references(mut self, qualified: &str) -> Self {
        self.references.push(qualified.to_string());
        self
    }

    #[must_use]
    pub fn simple(mut self, name: &str) -> Self {
        self.simple.push(name.to_string());
        self
    }

    #[must_use]
    pub fn root(mut self, name: &str) -> Self {
        self.roots.push(name.to_string());
        self
    }

    #[must_use]
    pub fn failing(mut self) -> Self {
        self.failing = true;
        self
    }

    #[must_use]
    pub fn unstable(mut self) -> Self {
        self.unstable = true;
        self
    }
}

/// In-memory compiler. Records every unit it compiles.
#[derive(Default)]
pub struct FakeCompiler {
    sources: Mutex<BTreeMap<UnitId, FakeSource>>,
    compiled: Mutex<Vec<UnitId>>,
    cancelled: AtomicBool,
    generation: AtomicU64,
}

impl FakeCompiler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a unit.
    pub fn set(&self, path: &str, source: FakeSource) {
        self.sources.lock().unwrap().insert(unit(path), source);
    }

    pub fn remove(&self, path: &str) {
        self.sources.lock().unwrap().remove(&unit(path));
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Units compiled since the last call.
    pub fn take_compiled(&self) -> BTreeSet<UnitId> {
        self.compiled.lock().unwrap().drain(..).collect()
    }

    /// Number of compile calls since the last `take_compiled`.
    pub fn compile_calls(&self) -> usize {
        self.compiled.lock().unwrap().len()
    }
}

impl CompilationService for FakeCompiler {
    fn source_units(&self) -> Vec<UnitId> {
        self.sources.lock().unwrap().keys().cloned().collect()
    }

    fn compile(&self, unit: &UnitId) -> UnitFacts {
        self.compiled.lock().unwrap().push(unit.clone());
        let Some(source) = self.sources.lock().unwrap().get(unit).cloned() else {
            return UnitFacts::new(unit.clone()).failed();
        };
        let mut facts = UnitFacts::new(unit.clone());
        for (qualified, fingerprint) in &source.declares {
            let fingerprint = if source.unstable {
                self.generation.fetch_add(1, Ordering::SeqCst) + 1000
            } else {
                *fingerprint
            };
            facts = facts.declares(qualified.clone(), Fingerprint::new(fingerprint));
        }
        for qualified in &source.references {
            facts = facts.references_type(qualified.clone());
        }
        for name in &source.simple {
            facts = facts.references_name(name.clone());
        }
        for name in &source.roots {
            facts = facts.references_root(name.clone());
        }
        if source.failing {
            facts = facts.failed();
        }
        facts
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Source folder `src` followed by a library archive.
pub fn classpath() -> ClasspathModel {
    ClasspathModel::new()
        .with_entry(ClasspathEntry::source_folder("src"))
        .with_entry(
            ClasspathEntry::archive("lib/rt.jar").with_types(["java.util.List", "java.lang.Object"]),
        )
}

/// An in-memory controller with no prior state.
pub fn controller() -> BuildCycleController {
    BuildCycleController::open(BuildConfig::in_memory(), classpath())
}

/// `A` declares `com.x.Foo`; `B` declares `com.x.Bar` referencing Foo.
pub fn foo_bar(compiler: &FakeCompiler, foo_fingerprint: u64) {
    compiler.set("src/A.java", FakeSource::new().declares("com.x.Foo", foo_fingerprint));
    compiler.set(
        "src/B.java",
        FakeSource::new().declares("com.x.Bar", 2).references("com.x.Foo"),
    );
}
