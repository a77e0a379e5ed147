//! End-to-end build scenarios against the scripted compiler.
//!
//! A is a leaf; B includes A. Every scenario runs on a real directory so the
//! staleness analysis sees real timestamps.

use std::collections::BTreeSet;
use std::path::PathBuf;

use idlmake_build::BuildError;
use idlmake_conformance::{seconds_ago, set_mtime, Workspace};
use idlmake_diagnostics::Severity;
use idlmake_state::StaleReason;
use tempfile::TempDir;

fn setup() -> (TempDir, Workspace, PathBuf, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let ws = Workspace::new(dir.path());
    let a = ws.write_source("A.ice", "module A { struct S { int x; }; };\n");
    let b = ws.write_source("B.ice", "#include \"A.ice\"\nmodule B { struct T { A::S s; }; };\n");
    (dir, ws, a, b)
}

fn set(paths: &[&PathBuf]) -> BTreeSet<PathBuf> {
    paths.iter().map(|p| (*p).clone()).collect()
}

#[test]
fn first_build_compiles_everything_then_nothing() {
    let (_dir, ws, a, b) = setup();
    let mut coordinator = ws.coordinator();
    let sources = vec![a.clone(), b.clone()];

    let first = coordinator.compile(&sources, &ws.args()).unwrap();
    assert_eq!(first.changed, set(&[&a, &b]));
    assert!(ws.output_dir().join("A.out").exists());
    assert!(ws.output_dir().join("B.out").exists());

    let state = coordinator.store().load();
    assert_eq!(state.dependencies[&a], Vec::<PathBuf>::new());
    assert_eq!(state.dependencies[&b], vec![a.clone()]);

    let second = coordinator.compile(&sources, &ws.args()).unwrap();
    assert!(second.changed.is_empty());
    assert_eq!(coordinator.invoker().generate_calls, 1);
    assert_eq!(coordinator.invoker().depend_calls, 2);
}

#[test]
fn touching_a_dependency_rebuilds_its_dependents() {
    let (_dir, ws, a, b) = setup();
    let mut coordinator = ws.coordinator();
    let sources = vec![a.clone(), b.clone()];
    coordinator.compile(&sources, &ws.args()).unwrap();

    set_mtime(&a, seconds_ago(2000));
    set_mtime(&b, seconds_ago(2000));
    set_mtime(&ws.output_dir().join("A.out"), seconds_ago(1000));
    set_mtime(&ws.output_dir().join("B.out"), seconds_ago(1000));
    assert!(coordinator.compile(&sources, &ws.args()).unwrap().changed.is_empty());

    set_mtime(&a, seconds_ago(500));
    let status = coordinator.status(&sources, &ws.args()).unwrap();
    assert_eq!(
        status.stale[&a],
        StaleReason::OutputOlder(ws.output_dir().join("A.out"))
    );
    assert_eq!(status.stale[&b], StaleReason::DependencyNewer(a.clone()));

    let report = coordinator.compile(&sources, &ws.args()).unwrap();
    assert_eq!(report.changed, set(&[&a, &b]));
    assert_eq!(coordinator.invoker().last_generated, vec![a.clone(), b.clone()]);
}

#[test]
fn generation_error_drops_only_the_failing_source() {
    let dir = tempfile::tempdir().unwrap();
    let ws = Workspace::new(dir.path());
    let a = ws.write_source("A.ice", "module A {\n  struct S {\n#error syntax error\n  };\n};\n");
    let b = ws.write_source("B.ice", "module B { struct T { int y; }; };\n");
    let mut coordinator = ws.coordinator();

    let err = coordinator
        .compile(&[a.clone(), b.clone()], &ws.args())
        .unwrap_err();

    let BuildError::Compilation { diagnostics } = err else {
        panic!("expected a compilation error");
    };
    let errors: Vec<_> = diagnostics
        .iter()
        .filter(|d| d.severity == Severity::Error)
        .collect();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].message, "syntax error");
    let location = errors[0].location.as_ref().unwrap();
    assert_eq!(location.file, a);
    assert_eq!(location.line, 3);

    let state = coordinator.store().load();
    assert!(!state.artifacts.contains_key(&a));
    assert!(!ws.output_dir().join("A.out").exists());
    assert_eq!(state.outputs_of(&b), [ws.output_dir().join("B.out")]);
    assert!(ws.output_dir().join("B.out").exists());
}

#[test]
fn failed_source_is_retried_on_the_next_build() {
    let dir = tempfile::tempdir().unwrap();
    let ws = Workspace::new(dir.path());
    let a = ws.write_source("A.ice", "#error unterminated module\n");
    let mut coordinator = ws.coordinator();
    assert!(coordinator.compile(&[a.clone()], &ws.args()).is_err());

    ws.write_source("A.ice", "module A {};\n");
    let report = coordinator.compile(&[a.clone()], &ws.args()).unwrap();
    assert_eq!(report.changed, set(&[&a]));
    assert!(ws.output_dir().join("A.out").exists());
}

#[test]
fn warnings_are_reported_and_do_not_block() {
    let dir = tempfile::tempdir().unwrap();
    let ws = Workspace::new(dir.path());
    let a = ws.write_source("A.ice", "#warning deprecated metadata\nmodule A {};\n");
    let mut coordinator = ws.coordinator();

    let report = coordinator.compile(&[a.clone()], &ws.args()).unwrap();
    assert_eq!(report.warnings.len(), 1);
    assert_eq!(report.warnings[0].message, "deprecated metadata");
    assert!(coordinator.store().load().artifacts.contains_key(&a));
}

#[test]
fn later_failure_deletes_outputs_from_the_last_good_build() {
    let (_dir, ws, a, _) = setup();
    let c = ws.write_source("C.ice", "module C {};\n");
    let mut coordinator = ws.coordinator();
    let sources = vec![a.clone(), c.clone()];
    coordinator.compile(&sources, &ws.args()).unwrap();

    let a_out = ws.output_dir().join("A.out");
    set_mtime(&a, seconds_ago(2000));
    set_mtime(&c, seconds_ago(2000));
    set_mtime(&a_out, seconds_ago(1000));
    set_mtime(&ws.output_dir().join("C.out"), seconds_ago(1000));

    // The broken A no longer produces A.out at all.
    ws.write_source("A.ice", "#output Partial.out\n#error unterminated struct\n");
    assert!(coordinator.compile(&sources, &ws.args()).is_err());
    assert_eq!(coordinator.invoker().last_generated, vec![a.clone()]);

    let state = coordinator.store().load();
    assert!(!state.artifacts.contains_key(&a));
    assert!(!a_out.exists());
    assert!(!ws.output_dir().join("Partial.out").exists());
    assert_eq!(state.outputs_of(&c), [ws.output_dir().join("C.out")]);
    assert!(ws.output_dir().join("C.out").exists());
}

#[test]
fn failure_keeps_outputs_shared_with_a_good_source() {
    let dir = tempfile::tempdir().unwrap();
    let ws = Workspace::new(dir.path());
    let a = ws.write_source("A.ice", "#output A.out\n#output Common.out\n");
    let b = ws.write_source("B.ice", "#output B.out\n#output Common.out\n");
    let common = ws.output_dir().join("Common.out");
    let mut coordinator = ws.coordinator();
    let sources = vec![a.clone(), b.clone()];
    coordinator.compile(&sources, &ws.args()).unwrap();

    set_mtime(&a, seconds_ago(2000));
    set_mtime(&b, seconds_ago(2000));
    for name in ["A.out", "B.out", "Common.out"] {
        set_mtime(&ws.output_dir().join(name), seconds_ago(1000));
    }

    ws.write_source("A.ice", "#output A.out\n#output Common.out\n#error missing type\n");
    assert!(coordinator.compile(&sources, &ws.args()).is_err());

    let state = coordinator.store().load();
    assert!(!state.artifacts.contains_key(&a));
    assert!(!ws.output_dir().join("A.out").exists());
    assert_eq!(
        state.outputs_of(&b),
        [ws.output_dir().join("B.out"), common.clone()]
    );
    assert!(common.exists());
    for output in state.referenced_outputs() {
        assert!(output.exists(), "{} is committed but missing", output.display());
    }
}

#[test]
fn listing_warnings_reach_the_host_when_generation_fails() {
    let dir = tempfile::tempdir().unwrap();
    let ws = Workspace::new(dir.path());
    let a = ws.write_source("A.ice", "#depend-warning deprecated include\n#error broken\n");
    let mut coordinator = ws.coordinator();

    let BuildError::Compilation { diagnostics } =
        coordinator.compile(&[a.clone()], &ws.args()).unwrap_err()
    else {
        panic!("expected a compilation error");
    };
    let copies = diagnostics
        .iter()
        .filter(|d| d.severity == Severity::Warning && d.message == "deprecated include")
        .count();
    assert_eq!(copies, 1);
    assert!(diagnostics.iter().any(|d| d.message == "broken"));
}

#[test]
fn listing_warnings_are_reported_on_success() {
    let dir = tempfile::tempdir().unwrap();
    let ws = Workspace::new(dir.path());
    let a = ws.write_source("A.ice", "#depend-warning deprecated include\nmodule A {};\n");
    let mut coordinator = ws.coordinator();

    let report = coordinator.compile(&[a], &ws.args()).unwrap();
    assert_eq!(report.warnings.len(), 1);
    assert_eq!(report.warnings[0].message, "deprecated include");
}
