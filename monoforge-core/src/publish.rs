//! Publish orchestration.
//!
//! A published version's content never changes: the same name+version with
//! different content is a conflict, never an overwrite. Re-publishing
//! identical content is a no-op.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use semver::Version;
use tracing::info;

use crate::actions::{ActionOptions, BuildAction};
use crate::error::{Error, Result};
use crate::graph::PackageGraph;
use crate::registry::{Artifact, RegistryClient};
use crate::state::{PackageState, StateDetector};

/// Final outcome for one package in a publish pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishOutcome {
    Published,
    /// Nothing changed locally; nothing to push.
    SkippedUnmodified,
    /// The registry already holds this exact version with identical content.
    AlreadyPublished,
    SkippedFailedDependency,
    /// Same version, different content.
    Conflict(String),
    Failed(String),
}

impl PublishOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            PublishOutcome::Published => "published",
            PublishOutcome::SkippedUnmodified => "skipped (unmodified)",
            PublishOutcome::AlreadyPublished => "already published",
            PublishOutcome::SkippedFailedDependency => "skipped (failed dependency)",
            PublishOutcome::Conflict(_) => "conflict",
            PublishOutcome::Failed(_) => "failed",
        }
    }
}

#[derive(Debug, Default)]
pub struct PublishReport {
    outcomes: IndexMap<String, PublishOutcome>,
}

impl PublishReport {
    #[inline]
    pub fn outcome(&self, name: &str) -> Option<&PublishOutcome> {
        self.outcomes.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &PublishOutcome)> {
        self.outcomes.iter().map(|(name, o)| (name.as_str(), o))
    }

    pub fn is_success(&self) -> bool {
        !self.outcomes.values().any(|o| {
            matches!(
                o,
                PublishOutcome::Conflict(_)
                    | PublishOutcome::Failed(_)
                    | PublishOutcome::SkippedFailedDependency
            )
        })
    }

    /// Names of packages actually pushed in this pass.
    pub fn published(&self) -> Vec<String> {
        self.outcomes
            .iter()
            .filter(|(_, o)| matches!(o, PublishOutcome::Published))
            .map(|(name, _)| name.clone())
            .collect()
    }
}

/// Decides per package whether to publish and pushes in dependency order,
/// so a dependent never lands on the registry before its dependencies.
pub struct PublishOrchestrator<'a> {
    root: PathBuf,
    graph: &'a PackageGraph,
    registry: &'a dyn RegistryClient,
    build: &'a dyn BuildAction,
    options: ActionOptions,
    dry_run: bool,
}

impl<'a> PublishOrchestrator<'a> {
    pub fn new(
        root: impl AsRef<Path>,
        graph: &'a PackageGraph,
        registry: &'a dyn RegistryClient,
        build: &'a dyn BuildAction,
    ) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            graph,
            registry,
            build,
            options: ActionOptions::default(),
            dry_run: false,
        }
    }

    pub fn with_options(mut self, options: ActionOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Publishes `targets` (or every package) together with their runtime
    /// dependency closure.
    pub fn run(
        &self,
        detector: &mut StateDetector,
        targets: Option<&[String]>,
    ) -> Result<PublishReport> {
        let target_names: Vec<String> = match targets {
            Some(names) if !names.is_empty() => names.to_vec(),
            _ => self.graph.topological_order().to_vec(),
        };
        let closure = self.graph.dependency_closure(&target_names, false)?;
        let states = detector.classify_subset(self.graph, &closure)?;

        let mut report = PublishReport::default();
        let mut blocked: HashSet<String> = HashSet::new();

        for name in self.graph.topological_order_of(&closure) {
            if let Some(err) = states.failure(&name) {
                let outcome = match err {
                    Error::VersionConflict { .. } => PublishOutcome::Conflict(err.to_string()),
                    _ => PublishOutcome::Failed(err.to_string()),
                };
                report.outcomes.insert(name.clone(), outcome);
                blocked.insert(name);
                continue;
            }
            let deps = self.graph.dependencies_of(&name, false)?;
            if deps.iter().any(|dep| blocked.contains(dep)) {
                report
                    .outcomes
                    .insert(name.clone(), PublishOutcome::SkippedFailedDependency);
                blocked.insert(name);
                continue;
            }
            if states.state(&name) == Some(PackageState::Unmodified) {
                report
                    .outcomes
                    .insert(name.clone(), PublishOutcome::SkippedUnmodified);
                continue;
            }

            match self.publish_one(detector, &name) {
                Ok(outcome) => {
                    report.outcomes.insert(name, outcome);
                }
                Err(e) if e.is_retryable() => return Err(e),
                Err(e) => {
                    let outcome = match &e {
                        Error::VersionConflict { .. } => PublishOutcome::Conflict(e.to_string()),
                        _ => PublishOutcome::Failed(e.to_string()),
                    };
                    report.outcomes.insert(name.clone(), outcome);
                    blocked.insert(name);
                }
            }
        }

        Ok(report)
    }

    fn publish_one(
        &self,
        detector: &mut StateDetector,
        name: &str,
    ) -> Result<PublishOutcome> {
        let pkg = self.graph.get(name).expect("package in closure");
        let version: Version = pkg.version.clone();
        let fingerprint = detector.fingerprint(pkg)?;

        match self.registry.fetch_artifact(name, &version)? {
            Some(existing) if existing.digest == fingerprint => {
                detector.confirm(self.graph, name, Some(version))?;
                return Ok(PublishOutcome::AlreadyPublished);
            }
            Some(_) => {
                return Err(Error::VersionConflict {
                    package: name.to_string(),
                    version: version.to_string(),
                });
            }
            None => {}
        }

        if self.dry_run {
            info!(package = %name, version = %version, "would publish (dry run)");
            return Ok(PublishOutcome::Published);
        }

        let dir = self.root.join(&pkg.path);
        let bytes = self
            .build
            .build(pkg, &dir, &self.options)
            .map_err(|e| match e {
                Error::Build { package, message } => Error::Publish { package, message },
                other => other,
            })?;
        info!(package = %name, version = %version, "publishing");
        self.registry.publish(
            name,
            &version,
            &Artifact {
                digest: fingerprint,
                bytes,
            },
        )?;
        detector.confirm(self.graph, name, Some(version))?;
        Ok(PublishOutcome::Published)
    }
}
