//! Build/install orchestration across the package graph.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crossbeam::channel;
use indexmap::IndexMap;
use rayon::prelude::*;
use tracing::{debug, info};

use crate::actions::{ActionOptions, BuildAction, InstallAction};
use crate::error::Result;
use crate::graph::PackageGraph;
use crate::package::Package;
use crate::state::StateDetector;

/// Final outcome for one package in a build/install pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Built,
    SkippedUnmodified,
    SkippedFailedDependency,
    Failed(String),
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Built => "built",
            Outcome::SkippedUnmodified => "skipped (unmodified)",
            Outcome::SkippedFailedDependency => "skipped (failed dependency)",
            Outcome::Failed(_) => "failed",
        }
    }
}

/// Per-package outcomes in visit order.
#[derive(Debug, Default)]
pub struct RunReport {
    outcomes: IndexMap<String, Outcome>,
}

impl RunReport {
    #[inline]
    pub fn outcome(&self, name: &str) -> Option<&Outcome> {
        self.outcomes.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Outcome)> {
        self.outcomes.iter().map(|(name, o)| (name.as_str(), o))
    }

    /// True when no package failed outright or was dragged down by a failed
    /// dependency.
    pub fn is_success(&self) -> bool {
        !self.outcomes.values().any(|o| {
            matches!(o, Outcome::Failed(_) | Outcome::SkippedFailedDependency)
        })
    }

    pub fn built(&self) -> usize {
        self.outcomes
            .values()
            .filter(|o| matches!(o, Outcome::Built))
            .count()
    }
}

/// Walks the graph in dependency order and invokes build/install actions
/// for packages that need it.
///
/// Packages within one dependency level run in parallel; a level boundary
/// is the gate that guarantees every dependency finished before any
/// dependent starts. A failure never stops independent subtrees, but every
/// descendant of a failed package is skipped.
pub struct BuildOrchestrator<'a> {
    root: PathBuf,
    graph: &'a PackageGraph,
    build: &'a dyn BuildAction,
    install: &'a dyn InstallAction,
    options: ActionOptions,
}

impl<'a> BuildOrchestrator<'a> {
    pub fn new(
        root: impl AsRef<Path>,
        graph: &'a PackageGraph,
        build: &'a dyn BuildAction,
        install: &'a dyn InstallAction,
    ) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            graph,
            build,
            install,
            options: ActionOptions::default(),
        }
    }

    pub fn with_options(mut self, options: ActionOptions) -> Self {
        self.options = options;
        self
    }

    /// Builds and installs `targets` (or every package) together with their
    /// transitive local dependencies.
    pub fn run(
        &self,
        detector: &mut StateDetector,
        targets: Option<&[String]>,
    ) -> Result<RunReport> {
        let target_names: Vec<String> = match targets {
            Some(names) if !names.is_empty() => names.to_vec(),
            _ => self.graph.topological_order().to_vec(),
        };
        let closure = self
            .graph
            .dependency_closure(&target_names, self.options.include_dev)?;

        let states = detector.classify_subset(self.graph, &closure)?;

        // Everything modified, plus its runtime dependencies: a dependency
        // of a package being rebuilt must be present even when unmodified.
        let modified = states.modified();
        let mut need = self.graph.dependency_closure(&modified, false)?;
        need.retain(|name| closure.contains(name));

        let mut report = RunReport::default();
        let mut blocked: HashSet<String> = HashSet::new();

        for level in self.graph.dependency_levels() {
            let mut to_run: Vec<&Package> = Vec::new();

            for name in level.iter().filter(|n| closure.contains(*n)) {
                if let Some(err) = states.failure(name) {
                    report
                        .outcomes
                        .insert(name.clone(), Outcome::Failed(err.to_string()));
                    blocked.insert(name.clone());
                    continue;
                }
                let deps = self.graph.dependencies_of(name, self.options.include_dev)?;
                if deps.iter().any(|dep| blocked.contains(dep)) {
                    report
                        .outcomes
                        .insert(name.clone(), Outcome::SkippedFailedDependency);
                    blocked.insert(name.clone());
                    continue;
                }
                if !need.contains(name) {
                    debug!(package = %name, "unmodified, skipping");
                    report
                        .outcomes
                        .insert(name.clone(), Outcome::SkippedUnmodified);
                    continue;
                }
                let pkg = self.graph.get(name).expect("package in level");
                let unmodified = states
                    .state(name)
                    .map(|s| !s.is_modified())
                    .unwrap_or(false);
                if self.options.editable
                    && unmodified
                    && self.install.is_linked(pkg, &self.root.join(&pkg.path))
                {
                    // Already linked into the environment; re-entrant runs
                    // must not reinstall it.
                    report
                        .outcomes
                        .insert(name.clone(), Outcome::SkippedUnmodified);
                    continue;
                }
                to_run.push(pkg);
            }

            if to_run.is_empty() {
                continue;
            }

            let (tx, rx) = channel::unbounded();
            to_run.into_par_iter().for_each(|pkg| {
                let result = self.run_one(pkg);
                let _ = tx.send((pkg.name.clone(), result));
            });
            drop(tx);

            let mut results: Vec<_> = rx.iter().collect();
            results.sort_by(|a, b| a.0.cmp(&b.0));
            for (name, result) in results {
                match result {
                    Ok(()) => {
                        // One writer per package per invocation: snapshots
                        // are committed here, after the parallel section.
                        let was_modified = states
                            .state(&name)
                            .map(|s| s.is_modified())
                            .unwrap_or(true);
                        if was_modified {
                            detector.confirm(self.graph, &name, None)?;
                        }
                        report.outcomes.insert(name, Outcome::Built);
                    }
                    Err(e) => {
                        report
                            .outcomes
                            .insert(name.clone(), Outcome::Failed(e.to_string()));
                        blocked.insert(name);
                    }
                }
            }
        }

        Ok(report)
    }

    fn run_one(&self, pkg: &Package) -> Result<()> {
        let dir = self.root.join(&pkg.path);
        info!(package = %pkg.name, version = %pkg.version, "building");
        self.build.build(pkg, &dir, &self.options)?;
        self.install.install(pkg, &dir, &self.options)?;
        Ok(())
    }
}
