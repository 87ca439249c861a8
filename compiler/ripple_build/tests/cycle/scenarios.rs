//! What an incremental cycle recompiles.

use pretty_assertions::assert_eq;

use ripple_build::{BuildConfig, BuildError, BuildKind, Delta, FallbackReason, UnitProblem};

use crate::common::{classpath, controller, foo_bar, unit, units, FakeCompiler, FakeSource};

#[test]
fn test_first_build_is_full() {
    let compiler = FakeCompiler::new();
    foo_bar(&compiler, 1);
    let mut controller = controller();

    let result = controller.run_incremental(&compiler, &Delta::new()).unwrap();

    assert_eq!(result.kind, BuildKind::Full);
    assert_eq!(result.fallback, Some(FallbackReason::NoPriorState));
    assert_eq!(result.recompiled, units(&["src/A.java", "src/B.java"]));
    assert_eq!(result.rounds, 1);
    assert_eq!(result.build_number, 0);
    assert_eq!(compiler.take_compiled(), units(&["src/A.java", "src/B.java"]));
}

#[test]
fn test_body_change_recompiles_only_the_unit() {
    let compiler = FakeCompiler::new();
    foo_bar(&compiler, 1);
    let mut controller = controller();
    controller.run_full(&compiler).unwrap();
    compiler.take_compiled();

    // Body edit: Foo keeps its fingerprint.
    let result = controller
        .run_incremental(&compiler, &Delta::new().modified("src/A.java"))
        .unwrap();

    assert_eq!(result.kind, BuildKind::Incremental);
    assert_eq!(result.recompiled, units(&["src/A.java"]));
    assert_eq!(result.rounds, 1);
    assert_eq!(result.structural_changes, Some(vec![]));
    assert_eq!(compiler.take_compiled(), units(&["src/A.java"]));
}

#[test]
fn test_structural_change_recompiles_dependents() {
    let compiler = FakeCompiler::new();
    foo_bar(&compiler, 1);
    let mut controller = controller();
    controller.run_full(&compiler).unwrap();

    // Foo's supertype changed.
    compiler.set("src/A.java", FakeSource::new().declares("com.x.Foo", 99));
    let result = controller
        .run_incremental(&compiler, &Delta::new().modified("src/A.java"))
        .unwrap();

    assert_eq!(result.recompiled, units(&["src/A.java", "src/B.java"]));
    assert_eq!(result.rounds, 2);
    assert_eq!(result.structural_changes, Some(vec!["com.x.Foo".to_string()]));
    assert_eq!(result.build_number, 1);
}

#[test]
fn test_structural_changes_cascade_transitively() {
    let compiler = FakeCompiler::new();
    compiler.set("src/A.java", FakeSource::new().declares("a.A", 1));
    compiler.set("src/B.java", FakeSource::new().declares("b.B", 1).references("a.A"));
    compiler.set("src/C.java", FakeSource::new().declares("c.C", 1).references("b.B"));
    compiler.set("src/D.java", FakeSource::new().declares("d.D", 1));
    let mut controller = controller();
    controller.run_full(&compiler).unwrap();

    // B's shape depends on A's, so both change, but only A was edited.
    compiler.set("src/A.java", FakeSource::new().declares("a.A", 2));
    compiler.set("src/B.java", FakeSource::new().declares("b.B", 2).references("a.A"));
    let result = controller
        .run_incremental(&compiler, &Delta::new().modified("src/A.java"))
        .unwrap();

    assert_eq!(
        result.recompiled,
        units(&["src/A.java", "src/B.java", "src/C.java"])
    );
    assert_eq!(result.rounds, 3);
}

#[test]
fn test_duplicate_declarers_recompiled_every_build() {
    let compiler = FakeCompiler::new();
    foo_bar(&compiler, 1);
    compiler.set("src/C.java", FakeSource::new().declares("com.y.Dup", 3));
    compiler.set("src/D.java", FakeSource::new().declares("com.y.Dup", 3));
    let mut controller = controller();
    let full = controller.run_full(&compiler).unwrap();
    assert_eq!(
        full.problems,
        vec![UnitProblem::DuplicateType {
            type_name: "com.y.Dup".to_string(),
            units: vec![unit("src/C.java"), unit("src/D.java")],
        }]
    );

    for delta in [Delta::new().modified("src/A.java"), Delta::new()] {
        let result = controller.run_incremental(&compiler, &delta).unwrap();
        assert!(result
            .recompiled
            .is_superset(&units(&["src/C.java", "src/D.java"])));
        assert_eq!(result.duplicate_count(), 1);
    }

    // Resolving the duplicate stops the churn.
    compiler.set("src/D.java", FakeSource::new().declares("com.y.Other", 3));
    controller
        .run_incremental(&compiler, &Delta::new().modified("src/D.java"))
        .unwrap();
    let result = controller.run_incremental(&compiler, &Delta::new()).unwrap();
    assert!(result.recompiled.is_empty());
    assert_eq!(result.duplicate_count(), 0);
}

#[test]
fn test_diverging_duplicate_declarers_settle() {
    let compiler = FakeCompiler::new();
    compiler.set(
        "src/C.java",
        FakeSource::new().declares("com.y.Dup", 1).references("com.y.Dup"),
    );
    compiler.set(
        "src/D.java",
        FakeSource::new().declares("com.y.Dup", 2).references("com.y.Dup"),
    );
    let mut controller = controller();
    controller.run_full(&compiler).unwrap();
    compiler.take_compiled();

    for edited in ["src/C.java", "src/D.java"] {
        let result = controller
            .run_incremental(&compiler, &Delta::new().modified(edited))
            .unwrap();
        assert_eq!(result.kind, BuildKind::Incremental);
        assert_eq!(result.fallback, None);
        assert_eq!(result.recompiled, units(&["src/C.java", "src/D.java"]));
        assert_eq!(result.rounds, 2);
        assert_eq!(result.structural_changes, Some(vec![]));
        assert_eq!(compiler.compile_calls(), 2);
        compiler.take_compiled();
    }

    // Leaving the duplicate set is still a change for the type's users.
    compiler.set("src/D.java", FakeSource::new().declares("com.y.Other", 2));
    let result = controller
        .run_incremental(&compiler, &Delta::new().modified("src/D.java"))
        .unwrap();
    assert_eq!(result.kind, BuildKind::Incremental);
    assert_eq!(
        result.structural_changes,
        Some(vec!["com.y.Dup".to_string(), "com.y.Other".to_string()])
    );
    assert!(result.recompiled.contains(&unit("src/C.java")));
}

#[test]
fn test_failed_unit_is_retried_until_clean() {
    let compiler = FakeCompiler::new();
    foo_bar(&compiler, 1);
    compiler.set("src/E.java", FakeSource::new().declares("com.e.E", 5).failing());
    let mut controller = controller();
    let first = controller.run_full(&compiler).unwrap();
    assert_eq!(first.error_count(), 1);
    assert_eq!(
        first.failed_units().cloned().collect::<Vec<_>>(),
        vec![unit("src/E.java")]
    );
    compiler.take_compiled();

    let second = controller.run_incremental(&compiler, &Delta::new()).unwrap();
    assert_eq!(second.recompiled, units(&["src/E.java"]));
    assert!(second
        .problems
        .contains(&UnitProblem::Compile { unit: unit("src/E.java") }));

    compiler.set("src/E.java", FakeSource::new().declares("com.e.E", 5));
    let third = controller.run_incremental(&compiler, &Delta::new()).unwrap();
    assert_eq!(third.recompiled, units(&["src/E.java"]));
    assert_eq!(third.error_count(), 0);

    let fourth = controller.run_incremental(&compiler, &Delta::new()).unwrap();
    assert!(fourth.recompiled.is_empty());
    assert_eq!(fourth.rounds, 0);
}

#[test]
fn test_compile_error_does_not_stop_other_units() {
    let compiler = FakeCompiler::new();
    foo_bar(&compiler, 1);
    let mut controller = controller();
    controller.run_full(&compiler).unwrap();

    compiler.set("src/A.java", FakeSource::new().declares("com.x.Foo", 4).failing());
    let result = controller
        .run_incremental(&compiler, &Delta::new().modified("src/A.java"))
        .unwrap();
    assert_eq!(result.recompiled, units(&["src/A.java", "src/B.java"]));
    assert_eq!(result.error_count(), 1);
}

#[test]
fn test_removed_unit_recompiles_dependents_once() {
    let compiler = FakeCompiler::new();
    foo_bar(&compiler, 1);
    let mut controller = controller();
    controller.run_full(&compiler).unwrap();

    compiler.remove("src/A.java");
    let result = controller
        .run_incremental(&compiler, &Delta::new().removed("src/A.java"))
        .unwrap();
    assert_eq!(result.recompiled, units(&["src/B.java"]));
    let state = controller.state().unwrap();
    assert!(!state.contains_unit(&unit("src/A.java")));
    assert!(!state.is_known_type("com.x.Foo"));

    let again = controller.run_incremental(&compiler, &Delta::new()).unwrap();
    assert!(again.recompiled.is_empty());
}

#[test]
fn test_unreported_deletion_is_still_noticed() {
    let compiler = FakeCompiler::new();
    foo_bar(&compiler, 1);
    let mut controller = controller();
    controller.run_full(&compiler).unwrap();

    compiler.remove("src/A.java");
    let result = controller.run_incremental(&compiler, &Delta::new()).unwrap();
    assert_eq!(result.recompiled, units(&["src/B.java"]));
}

#[test]
fn test_unreported_addition_is_still_compiled() {
    let compiler = FakeCompiler::new();
    compiler.set("src/A.java", FakeSource::new().declares("com.x.Foo", 1));
    let mut controller = controller();
    controller.run_full(&compiler).unwrap();
    compiler.take_compiled();

    compiler.set("src/E.java", FakeSource::new().declares("org.e.E", 1));
    let result = controller.run_incremental(&compiler, &Delta::new()).unwrap();
    assert_eq!(result.kind, BuildKind::Incremental);
    assert_eq!(result.recompiled, units(&["src/E.java"]));
    assert_eq!(compiler.take_compiled(), units(&["src/E.java"]));
    let state = controller.state().unwrap();
    assert!(state.contains_unit(&unit("src/E.java")));
    assert!(state.is_known_type("org.e.E"));

    let again = controller.run_incremental(&compiler, &Delta::new()).unwrap();
    assert!(again.recompiled.is_empty());
}

#[test]
fn test_added_type_reaches_simple_name_and_package_import_users() {
    let compiler = FakeCompiler::new();
    foo_bar(&compiler, 1);
    compiler.set("src/G.java", FakeSource::new().simple("Baz"));
    compiler.set("src/H.java", FakeSource::new().root("org"));
    let mut controller = controller();
    controller.run_full(&compiler).unwrap();

    compiler.set("src/F.java", FakeSource::new().declares("org.z.Baz", 1));
    let result = controller
        .run_incremental(&compiler, &Delta::new().added("src/F.java"))
        .unwrap();
    assert_eq!(
        result.recompiled,
        units(&["src/F.java", "src/G.java", "src/H.java"])
    );
    assert!(controller.state().unwrap().is_known_type("org.z.Baz"));
}

#[test]
fn test_empty_delta_is_idempotent() {
    let compiler = FakeCompiler::new();
    foo_bar(&compiler, 1);
    let mut controller = controller();
    controller.run_full(&compiler).unwrap();
    let before = controller.state().unwrap().clone();
    compiler.take_compiled();

    let result = controller.run_incremental(&compiler, &Delta::new()).unwrap();

    assert!(result.recompiled.is_empty());
    assert_eq!(compiler.compile_calls(), 0);
    let after = controller.state().unwrap();
    assert_eq!(after.build_number(), before.build_number() + 1);
    for changed in [units(&[]), units(&["src/A.java"]), units(&["src/A.java", "src/B.java"])] {
        assert_eq!(after.affected_by(&changed), before.affected_by(&changed));
    }
    assert_eq!(after.fingerprint("com.x.Foo"), before.fingerprint("com.x.Foo"));
}

#[test]
fn test_library_change_recompiles_its_users() {
    let compiler = FakeCompiler::new();
    foo_bar(&compiler, 1);
    compiler.set("src/U.java", FakeSource::new().references("java.util.List"));
    let mut controller = controller();
    controller.run_full(&compiler).unwrap();

    let result = controller
        .run_incremental(&compiler, &Delta::new().external_type("java/util/List"))
        .unwrap();
    assert_eq!(result.kind, BuildKind::Incremental);
    assert_eq!(result.recompiled, units(&["src/U.java"]));
}

#[test]
fn test_tracked_binary_change_forces_full_build() {
    let compiler = FakeCompiler::new();
    foo_bar(&compiler, 1);
    let mut controller = controller();
    controller.run_full(&compiler).unwrap();

    let result = controller
        .run_incremental(&compiler, &Delta::new().external_type("com.x.Foo"))
        .unwrap();
    assert_eq!(result.kind, BuildKind::Full);
    assert_eq!(
        result.fallback,
        Some(FallbackReason::TrackedBinaryChanged {
            type_name: "com.x.Foo".to_string(),
            unit: unit("src/A.java"),
        })
    );
    assert_eq!(result.recompiled, units(&["src/A.java", "src/B.java"]));
}

#[test]
fn test_endless_cascade_falls_back_to_full_build() {
    let compiler = FakeCompiler::new();
    compiler.set("src/P.java", FakeSource::new().declares("p.P", 0).references("p.Q").unstable());
    compiler.set("src/Q.java", FakeSource::new().declares("p.Q", 0).references("p.P").unstable());
    compiler.set("src/R.java", FakeSource::new().declares("r.R", 0));
    let mut controller =
        ripple_build::BuildCycleController::open(BuildConfig::in_memory().with_max_compile_loops(3), classpath());
    controller.run_full(&compiler).unwrap();

    let result = controller
        .run_incremental(&compiler, &Delta::new().modified("src/P.java"))
        .unwrap();
    assert_eq!(result.kind, BuildKind::Full);
    assert_eq!(result.fallback, Some(FallbackReason::CompileLoopLimit { rounds: 3 }));
    assert_eq!(
        result.recompiled,
        units(&["src/P.java", "src/Q.java", "src/R.java"])
    );
}

#[test]
fn test_cancelled_cycle_keeps_previous_state() {
    let compiler = FakeCompiler::new();
    foo_bar(&compiler, 1);
    let mut controller = controller();
    controller.run_full(&compiler).unwrap();

    compiler.set("src/A.java", FakeSource::new().declares("com.x.Foo", 42));
    compiler.cancel();
    let err = controller
        .run_incremental(&compiler, &Delta::new().modified("src/A.java"))
        .unwrap_err();
    assert!(matches!(err, BuildError::Cancelled));

    let state = controller.state().unwrap();
    assert_eq!(state.build_number(), 0);
    assert_eq!(state.fingerprint("com.x.Foo"), Some(ripple_ir::Fingerprint::new(1)));
}

#[test]
fn test_sequential_and_parallel_agree() {
    let compiler = FakeCompiler::new();
    for i in 0..16 {
        compiler.set(
            &format!("src/U{i}.java"),
            FakeSource::new()
                .declares(&format!("p{i}.T{i}"), 1)
                .references(&format!("p{0}.T{0}", (i + 1) % 16)),
        );
    }
    let mut parallel = controller();
    let mut sequential = ripple_build::BuildCycleController::open(
        BuildConfig::in_memory().with_parallel(false),
        classpath(),
    );
    let a = parallel.run_full(&compiler).unwrap();
    let b = sequential.run_full(&compiler).unwrap();
    assert_eq!(a, b);

    compiler.set("src/U3.java", FakeSource::new().declares("p3.T3", 2).references("p4.T4"));
    let delta = Delta::new().modified("src/U3.java");
    let a = parallel.run_incremental(&compiler, &delta).unwrap();
    let b = sequential.run_incremental(&compiler, &delta).unwrap();
    assert_eq!(a, b);
    assert_eq!(a.recompiled, units(&["src/U2.java", "src/U3.java"]));
}
