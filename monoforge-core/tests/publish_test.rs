mod common;

use common::{RecordingActions, Workspace};
use monoforge_core::publish::{PublishOrchestrator, PublishOutcome};
use monoforge_core::registry::{Artifact, MemoryRegistry, RegistryClient};
use semver::Version;

#[test]
fn test_publishes_dependencies_first_and_confirms_snapshots() {
    let ws = Workspace::new();
    ws.add_package("util", "1.0.0", &[]);
    ws.add_package("lib", "1.0.0", &[("util", "^1.0")]);
    ws.add_package("app", "1.0.0", &[("lib", "^1.0")]);
    let graph = ws.graph();
    let registry = MemoryRegistry::new();
    let actions = RecordingActions::new();

    let orchestrator = PublishOrchestrator::new(ws.root(), &graph, &registry, &actions);
    let mut detector = ws.detector(&registry);
    let report = orchestrator.run(&mut detector, None).unwrap();

    assert!(report.is_success());
    assert_eq!(report.published(), vec!["util", "lib", "app"]);
    assert_eq!(
        registry.latest_version("util").unwrap(),
        Some(Version::new(1, 0, 0))
    );

    // fresh invocation: everything is already on the registry
    let mut detector = ws.detector(&registry);
    let report = orchestrator.run(&mut detector, None).unwrap();
    assert!(report.published().is_empty());
    assert_eq!(
        report.outcome("app"),
        Some(&PublishOutcome::SkippedUnmodified)
    );
}

#[test]
fn test_identical_content_already_on_registry_is_not_republished() {
    let ws = Workspace::new();
    ws.add_package("lib", "1.0.0", &[]);
    ws.add_package("app", "1.0.0", &[("lib", "^1.0")]);
    let graph = ws.graph();
    let registry = MemoryRegistry::new();
    let actions = RecordingActions::new();
    let orchestrator = PublishOrchestrator::new(ws.root(), &graph, &registry, &actions);

    let mut detector = ws.detector(&registry);
    orchestrator.run(&mut detector, None).unwrap();

    // lib moves; app's own tree is untouched and its 1.0.0 already exists
    ws.set_version("lib", "1.1.0");
    let graph = ws.graph();
    let orchestrator = PublishOrchestrator::new(ws.root(), &graph, &registry, &actions);
    let mut detector = ws.detector(&registry);
    let report = orchestrator.run(&mut detector, None).unwrap();

    assert!(report.is_success());
    assert_eq!(report.published(), vec!["lib"]);
    assert_eq!(
        report.outcome("app"),
        Some(&PublishOutcome::AlreadyPublished)
    );
}

#[test]
fn test_conflict_blocks_dependents() {
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
    let orchestrator = PublishOrchestrator::new(ws.root(), &graph, &registry, &actions);
    let mut detector = ws.detector(&registry);
    let report = orchestrator.run(&mut detector, None).unwrap();

    assert!(!report.is_success());
    assert!(matches!(
        report.outcome("lib"),
        Some(PublishOutcome::Conflict(_))
    ));
    assert_eq!(
        report.outcome("app"),
        Some(&PublishOutcome::SkippedFailedDependency)
    );
    // the foreign artifact was never overwritten
    let artifact = registry
        .fetch_artifact("lib", &Version::new(1, 0, 0))
        .unwrap()
        .unwrap();
    assert_eq!(artifact.digest, "foreign-content");
}

#[test]
fn test_dry_run_leaves_registry_and_snapshots_untouched() {
    let ws = Workspace::new();
    ws.add_package("core", "1.0.0", &[]);
    let graph = ws.graph();
    let registry = MemoryRegistry::new();
    let actions = RecordingActions::new();

    let orchestrator =
        PublishOrchestrator::new(ws.root(), &graph, &registry, &actions).with_dry_run(true);
    let mut detector = ws.detector(&registry);
    let report = orchestrator.run(&mut detector, None).unwrap();

    assert_eq!(report.outcome("core"), Some(&PublishOutcome::Published));
    assert!(registry.list_versions("core").unwrap().is_empty());
    assert!(actions.log().is_empty());

    // a real pass afterwards still publishes
    let orchestrator = PublishOrchestrator::new(ws.root(), &graph, &registry, &actions);
    let mut detector = ws.detector(&registry);
    let report = orchestrator.run(&mut detector, None).unwrap();
    assert_eq!(report.published(), vec!["core"]);
}

#[test]
fn test_build_failure_marks_package_failed_and_blocks_dependents() {
    let ws = Workspace::new();
    ws.add_package("lib", "1.0.0", &[]);
    ws.add_package("app", "1.0.0", &[("lib", "^1.0")]);
    let graph = ws.graph();
    let registry = MemoryRegistry::new();
    let actions = RecordingActions::new();
    actions.fail_on("lib");

    let orchestrator = PublishOrchestrator::new(ws.root(), &graph, &registry, &actions);
    let mut detector = ws.detector(&registry);
    let report = orchestrator.run(&mut detector, None).unwrap();

    assert!(!report.is_success());
    assert!(matches!(
        report.outcome("lib"),
        Some(PublishOutcome::Failed(_))
    ));
    assert_eq!(
        report.outcome("app"),
        Some(&PublishOutcome::SkippedFailedDependency)
    );
    assert!(registry.list_versions("lib").unwrap().is_empty());
}
