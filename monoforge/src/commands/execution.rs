//! Build and install commands.

use std::path::Path;
use std::time::Instant;

use anyhow::Result;
use monoforge_core::{
    ActionOptions, BuildOrchestrator, CommandBuildAction, CommandInstallAction, Outcome,
};

use crate::formatting::{print_heading, print_result, print_success, print_summary, print_warning, Status};

use super::{targets_of, Workspace};

pub fn cmd_install(
    root: &Path,
    packages: Vec<String>,
    dev: bool,
    editable: bool,
    verbose: bool,
) -> Result<bool> {
    let start = Instant::now();
    let ws = Workspace::load(root)?;
    let registry = ws.registry();
    let mut detector = ws.detector(&registry)?;

    let commands = &ws.config.commands;
    let build = CommandBuildAction::new(&commands.build, &commands.artifact);
    let mut install = CommandInstallAction::new(&commands.install);
    if let Some(editable_command) = &commands.editable_install {
        install = install.with_editable_command(editable_command);
    }
    if let Some(probe) = &commands.probe {
        install = install.with_probe(probe);
    }

    let options = ActionOptions {
        include_dev: dev,
        editable,
        verbose,
    };
    let orchestrator = BuildOrchestrator::new(&ws.root, &ws.graph, &build, &install)
        .with_options(options);

    print_heading("Installing packages");
    let report = orchestrator.run(&mut detector, targets_of(&packages))?;

    let (mut skipped, mut blocked, mut failed) = (0usize, 0usize, 0usize);
    for (name, outcome) in report.iter() {
        match outcome {
            Outcome::Built => print_result(Status::Success, name, "built"),
            Outcome::SkippedUnmodified => skipped += 1,
            Outcome::SkippedFailedDependency => {
                blocked += 1;
                print_result(Status::Warning, name, "skipped: failed dependency");
            }
            Outcome::Failed(message) => {
                failed += 1;
                print_result(Status::Error, name, message);
            }
        }
    }

    print_summary(
        &[
            ("built", report.built().to_string()),
            ("unchanged", skipped.to_string()),
            ("blocked", blocked.to_string()),
            ("failed", failed.to_string()),
        ],
        start.elapsed().as_secs_f64(),
    );
    println!();

    if report.is_success() {
        print_success("install complete");
    } else {
        print_warning("install finished with failures");
    }
    println!();
    Ok(report.is_success())
}
