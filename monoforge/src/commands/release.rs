//! Versioning and publishing commands.

use std::path::Path;
use std::time::Instant;

use anyhow::Result;
use monoforge_core::{
    ActionOptions, CommandBuildAction, PublishOrchestrator, PublishOutcome, SnapshotStore,
    TomlManifest, VersionPropagator, WorkspaceConfig,
};

use crate::formatting::{
    print_heading, print_result, print_success, print_summary, print_warning, Status,
};

use super::{targets_of, Workspace};

pub fn cmd_update(root: &Path, cascade: bool, dry_run: bool) -> Result<bool> {
    let ws = Workspace::load(root)?;
    let propagator = VersionPropagator::new(&ws.root, &TomlManifest)
        .with_cascade(cascade || ws.config.cascade);

    // Every local constraint is checked against the version its dependency
    // declares right now; only the ones no longer satisfied get edits.
    let changed = ws.graph.topological_order().to_vec();
    let plan = propagator.plan(&ws.graph, &changed)?;

    let title = if dry_run {
        "Constraint updates (dry run)"
    } else {
        "Constraint updates"
    };
    print_heading(title);

    if plan.is_empty() {
        print_success("all dependency constraints are consistent");
        println!();
        return Ok(true);
    }

    for bump in &plan.bumps {
        print_result(
            Status::Warning,
            &bump.package,
            &format!("{} -> {}", bump.old, bump.new),
        );
    }
    for edit in &plan.edits {
        print_result(
            Status::Success,
            &edit.package,
            &format!("{}: {} -> {}", edit.dependency, edit.old, edit.new),
        );
    }
    println!();

    if !dry_run {
        propagator.apply(&ws.graph, &plan)?;
        print_success(&format!(
            "updated {} manifests",
            plan.bumps.len() + plan.edits.len()
        ));
        println!();
    }
    Ok(true)
}

pub fn cmd_publish(
    root: &Path,
    packages: Vec<String>,
    dry_run: bool,
    no_propagate: bool,
    verbose: bool,
) -> Result<bool> {
    let start = Instant::now();
    let ws = Workspace::load(root)?;
    let registry = ws.registry();
    let mut detector = ws.detector(&registry)?;

    let build = CommandBuildAction::new(&ws.config.commands.build, &ws.config.commands.artifact);
    let orchestrator = PublishOrchestrator::new(&ws.root, &ws.graph, &registry, &build)
        .with_options(ActionOptions {
            verbose,
            ..ActionOptions::default()
        })
        .with_dry_run(dry_run);

    let title = if dry_run {
        "Publishing packages (dry run)"
    } else {
        "Publishing packages"
    };
    print_heading(title);
    let report = orchestrator.run(&mut detector, targets_of(&packages))?;

    let (mut skipped, mut conflicts, mut failed) = (0usize, 0usize, 0usize);
    for (name, outcome) in report.iter() {
        match outcome {
            PublishOutcome::Published => print_result(Status::Success, name, "published"),
            PublishOutcome::AlreadyPublished => {
                print_result(Status::Skipped, name, "already on the registry")
            }
            PublishOutcome::SkippedUnmodified => skipped += 1,
            PublishOutcome::SkippedFailedDependency => {
                failed += 1;
                print_result(Status::Warning, name, "skipped: failed dependency");
            }
            PublishOutcome::Conflict(message) => {
                conflicts += 1;
                print_result(Status::Error, name, message);
            }
            PublishOutcome::Failed(message) => {
                failed += 1;
                print_result(Status::Error, name, message);
            }
        }
    }

    let published = report.published();
    print_summary(
        &[
            ("published", published.len().to_string()),
            ("unchanged", skipped.to_string()),
            ("conflicts", conflicts.to_string()),
            ("failed", failed.to_string()),
        ],
        start.elapsed().as_secs_f64(),
    );
    println!();

    if !no_propagate && !dry_run && !published.is_empty() {
        let propagator = VersionPropagator::new(&ws.root, &TomlManifest)
            .with_cascade(ws.config.cascade);
        let plan = propagator.plan(&ws.graph, &published)?;
        if !plan.is_empty() {
            propagator.apply(&ws.graph, &plan)?;
            print_success(&format!(
                "retargeted {} dependent constraints",
                plan.edits.len()
            ));
            println!();
        }
    }

    if report.is_success() {
        print_success("publish complete");
    } else {
        print_warning("publish finished with failures");
    }
    println!();
    Ok(report.is_success())
}

pub fn cmd_clean(root: &Path, package: Option<String>) -> Result<bool> {
    let config = WorkspaceConfig::load(root)?;
    let mut store = SnapshotStore::open(config.resolve(root, &config.snapshot_file))?;

    match package {
        Some(name) => {
            if store.remove(&name)? {
                print_success(&format!("dropped snapshot for {}", name));
            } else {
                print_warning(&format!("no snapshot recorded for {}", name));
            }
        }
        None => {
            let count = store.len();
            store.clear()?;
            print_success(&format!("dropped {} snapshots", count));
        }
    }
    println!();
    Ok(true)
}
