mod common;

use common::{RecordingActions, Workspace};
use monoforge_core::actions::ActionOptions;
use monoforge_core::orchestrator::{BuildOrchestrator, Outcome};
use monoforge_core::registry::{Artifact, MemoryRegistry, RegistryClient};
use semver::Version;

#[test]
fn test_first_run_builds_everything_in_dependency_order() {
    let ws = Workspace::new();
    ws.add_package("util", "1.0.0", &[]);
    ws.add_package("lib", "1.0.0", &[("util", "^1.0")]);
    ws.add_package("app", "1.0.0", &[("lib", "^1.0")]);
    let graph = ws.graph();
    let registry = MemoryRegistry::new();
    let actions = RecordingActions::new();

    let orchestrator = BuildOrchestrator::new(ws.root(), &graph, &actions, &actions);
    let mut detector = ws.detector(&registry);
    let report = orchestrator.run(&mut detector, None).unwrap();

    assert!(report.is_success());
    assert_eq!(report.built(), 3);
    assert_eq!(actions.log(), vec!["util", "lib", "app"]);
}

#[test]
fn test_second_run_skips_everything() {
    let ws = Workspace::new();
    ws.add_package("lib", "1.0.0", &[]);
    ws.add_package("app", "1.0.0", &[("lib", "^1.0")]);
    let graph = ws.graph();
    let registry = MemoryRegistry::new();
    let actions = RecordingActions::new();
    let orchestrator = BuildOrchestrator::new(ws.root(), &graph, &actions, &actions);

    let mut detector = ws.detector(&registry);
    orchestrator.run(&mut detector, None).unwrap();

    // fresh detector, as a new invocation would create
    let mut detector = ws.detector(&registry);
    let report = orchestrator.run(&mut detector, None).unwrap();

    assert!(report.is_success());
    assert_eq!(report.built(), 0);
    assert_eq!(
        report.outcome("app"),
        Some(&Outcome::SkippedUnmodified)
    );
    assert_eq!(actions.log(), vec!["lib", "app"]);
}

#[test]
fn test_failure_skips_dependents_but_not_siblings() {
    let ws = Workspace::new();
    ws.add_package("lib", "1.0.0", &[]);
    ws.add_package("app", "1.0.0", &[("lib", "^1.0")]);
    ws.add_package("island", "1.0.0", &[]);
    let graph = ws.graph();
    let registry = MemoryRegistry::new();
    let actions = RecordingActions::new();
    actions.fail_on("lib");

    let orchestrator = BuildOrchestrator::new(ws.root(), &graph, &actions, &actions);
    let mut detector = ws.detector(&registry);
    let report = orchestrator.run(&mut detector, None).unwrap();

    assert!(!report.is_success());
    assert!(matches!(report.outcome("lib"), Some(Outcome::Failed(_))));
    assert_eq!(
        report.outcome("app"),
        Some(&Outcome::SkippedFailedDependency)
    );
    assert_eq!(report.outcome("island"), Some(&Outcome::Built));
}

#[test]
fn test_unmodified_dependency_of_modified_package_is_rebuilt() {
    let ws = Workspace::new();
    ws.add_package("lib", "1.0.0", &[]);
    ws.add_package("app", "1.0.0", &[("lib", "^1.0")]);
    ws.add_package("island", "1.0.0", &[]);
    let graph = ws.graph();
    let registry = MemoryRegistry::new();
    let actions = RecordingActions::new();
    let orchestrator = BuildOrchestrator::new(ws.root(), &graph, &actions, &actions);

    let mut detector = ws.detector(&registry);
    orchestrator.run(&mut detector, None).unwrap();

    ws.write_file("app", "src/main.txt", "changed");
    let actions = RecordingActions::new();
    let orchestrator = BuildOrchestrator::new(ws.root(), &graph, &actions, &actions);
    let mut detector = ws.detector(&registry);
    let report = orchestrator.run(&mut detector, None).unwrap();

    // lib must be present for app's build even though lib did not change
    assert_eq!(report.outcome("lib"), Some(&Outcome::Built));
    assert_eq!(report.outcome("app"), Some(&Outcome::Built));
    assert_eq!(report.outcome("island"), Some(&Outcome::SkippedUnmodified));
}

#[test]
fn test_editable_skips_already_linked_dependencies() {
    let ws = Workspace::new();
    ws.add_package("lib", "1.0.0", &[]);
    ws.add_package("app", "1.0.0", &[("lib", "^1.0")]);
    let graph = ws.graph();
    let registry = MemoryRegistry::new();
    let actions = RecordingActions::new();
    let orchestrator = BuildOrchestrator::new(ws.root(), &graph, &actions, &actions);

    let mut detector = ws.detector(&registry);
    orchestrator.run(&mut detector, None).unwrap();

    // lib is linked into the environment; only app changed
    ws.write_file("app", "src/main.txt", "changed");
    let actions = RecordingActions::new();
    actions.mark_linked("lib");
    let orchestrator = BuildOrchestrator::new(ws.root(), &graph, &actions, &actions)
        .with_options(ActionOptions {
            editable: true,
            ..ActionOptions::default()
        });
    let mut detector = ws.detector(&registry);
    let report = orchestrator.run(&mut detector, None).unwrap();

    assert_eq!(report.outcome("lib"), Some(&Outcome::SkippedUnmodified));
    assert_eq!(report.outcome("app"), Some(&Outcome::Built));
    assert_eq!(actions.log(), vec!["app"]);
}

#[test]
fn test_targets_limit_the_run_to_their_closure() {
    let ws = Workspace::new();
    ws.add_package("util", "1.0.0", &[]);
    ws.add_package("lib", "1.0.0", &[("util", "^1.0")]);
    ws.add_package("app", "1.0.0", &[("lib", "^1.0")]);
    let graph = ws.graph();
    let registry = MemoryRegistry::new();
    let actions = RecordingActions::new();

    let orchestrator = BuildOrchestrator::new(ws.root(), &graph, &actions, &actions);
    let mut detector = ws.detector(&registry);
    let report = orchestrator
        .run(&mut detector, Some(&["lib".to_string()]))
        .unwrap();

    assert_eq!(actions.log(), vec!["util", "lib"]);
    assert!(report.outcome("app").is_none());
}

#[test]
fn test_version_conflict_blocks_the_subtree() {
    let ws = Workspace::new();
    ws.add_package("lib", "1.0.0", &[]);
    ws.add_package("app", "1.0.0", &[("lib", "^1.0")]);
    let graph = ws.graph();
    let registry = MemoryRegistry::new();
    registry
        .publish(
            "lib",
            &Version::new(1, 0, 0),
            &Artifact {
                digest: "foreign-content".to_string(),
                bytes: Vec::new(),
            },
        )
        .unwrap();

    let actions = RecordingActions::new();
    let orchestrator = BuildOrchestrator::new(ws.root(), &graph, &actions, &actions);
    let mut detector = ws.detector(&registry);
    let report = orchestrator.run(&mut detector, None).unwrap();

    assert!(!report.is_success());
    assert!(matches!(report.outcome("lib"), Some(Outcome::Failed(_))));
    assert_eq!(
        report.outcome("app"),
        Some(&Outcome::SkippedFailedDependency)
    );
    assert!(actions.log().is_empty());
}
