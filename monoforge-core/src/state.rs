//! Modification-state detection.
//!
//! Classifying a package as modified has no single ground truth: local file
//! content, the recorded snapshot, and the registry all get a vote. The
//! decision procedure here reconciles the three and is idempotent: with no
//! intervening change, repeated calls return the same verdict. A `Modified`
//! verdict never writes the snapshot store; snapshots are committed only
//! after a confirming action (build/install/publish), through [`confirm`].
//!
//! [`confirm`]: StateDetector::confirm

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use semver::Version;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::fingerprint::fingerprint_dir;
use crate::graph::PackageGraph;
use crate::package::Package;
use crate::registry::RegistryClient;
use crate::snapshot::{SnapshotStore, StateSnapshot};

/// Derived modification state of one package. Recomputed fresh on every
/// invocation; never cached except through the snapshot it compares against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PackageState {
    Unmodified,
    Modified,
    /// A new version is assigned locally but not yet on the registry:
    /// built, ready to publish.
    ModifiedUnpublished,
}

impl PackageState {
    #[inline]
    pub fn is_modified(self) -> bool {
        !matches!(self, PackageState::Unmodified)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PackageState::Unmodified => "unmodified",
            PackageState::Modified => "modified",
            PackageState::ModifiedUnpublished => "modified-unpublished",
        }
    }
}

/// Policy for file changes without a version bump: warn and classify
/// `Modified`, or refuse with a per-package error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strictness {
    #[default]
    Warn,
    Deny,
}

/// Per-package verdicts for one detection pass.
///
/// Package-local failures (conflicts, outdated versions) live here next to
/// the clean verdicts so independent subtrees can keep going; only
/// retryable transport errors abort the pass as a whole.
#[derive(Debug, Default)]
pub struct StateReport {
    states: BTreeMap<String, PackageState>,
    failures: BTreeMap<String, Error>,
}

impl StateReport {
    #[inline]
    pub fn state(&self, name: &str) -> Option<PackageState> {
        self.states.get(name).copied()
    }

    #[inline]
    pub fn failure(&self, name: &str) -> Option<&Error> {
        self.failures.get(name)
    }

    pub fn states(&self) -> impl Iterator<Item = (&str, PackageState)> {
        self.states.iter().map(|(name, state)| (name.as_str(), *state))
    }

    pub fn failures(&self) -> impl Iterator<Item = (&str, &Error)> {
        self.failures.iter().map(|(name, error)| (name.as_str(), error))
    }

    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }

    /// Names of packages classified as anything but `Unmodified`.
    pub fn modified(&self) -> Vec<String> {
        self.states
            .iter()
            .filter(|(_, state)| state.is_modified())
            .map(|(name, _)| name.clone())
            .collect()
    }
}

/// Classifies package states against snapshots and the registry.
///
/// Owns the snapshot store; everything else reads verdicts, never the store.
pub struct StateDetector<'a> {
    root: PathBuf,
    registry: &'a dyn RegistryClient,
    store: SnapshotStore,
    strictness: Strictness,
    ignore: Vec<String>,
}

impl<'a> StateDetector<'a> {
    pub fn new(root: impl AsRef<Path>, registry: &'a dyn RegistryClient, store: SnapshotStore) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            registry,
            store,
            strictness: Strictness::default(),
            ignore: Vec::new(),
        }
    }

    pub fn with_strictness(mut self, strictness: Strictness) -> Self {
        self.strictness = strictness;
        self
    }

    pub fn with_ignore(mut self, ignore: Vec<String>) -> Self {
        self.ignore = ignore;
        self
    }

    /// Classifies every package in the graph, in dependency order.
    pub fn classify_all(&mut self, graph: &PackageGraph) -> Result<StateReport> {
        let all: HashSet<String> = graph.topological_order().iter().cloned().collect();
        self.classify_subset(graph, &all)
    }

    /// Classifies `subset`, in dependency order so a dependency's state is
    /// known before its dependents'. Retryable registry errors abort the
    /// whole pass; package-local failures are recorded and skipped over.
    pub fn classify_subset(
        &mut self,
        graph: &PackageGraph,
        subset: &HashSet<String>,
    ) -> Result<StateReport> {
        let mut report = StateReport::default();
        for name in graph.topological_order_of(subset) {
            match self.classify(graph, &name) {
                Ok(state) => {
                    debug!(package = %name, state = state.as_str(), "classified");
                    report.states.insert(name, state);
                }
                Err(e) if e.is_retryable() => return Err(e),
                Err(e) => {
                    report.failures.insert(name, e);
                }
            }
        }
        Ok(report)
    }

    /// Classifies one package.
    pub fn classify(&mut self, graph: &PackageGraph, name: &str) -> Result<PackageState> {
        let pkg = graph.get(name).ok_or_else(|| Error::PackageNotFound {
            name: name.to_string(),
            available: graph.topological_order().join(", "),
        })?;
        let fingerprint = self.fingerprint(pkg)?;
        let parents = graph.local_dependency_versions(name)?;

        let Some(snapshot) = self.store.get(name).cloned() else {
            // Nothing local to compare against; the registry is the only
            // possible baseline (fresh clone of an already-published tree).
            return self.reconcile_with_registry(pkg, &fingerprint, &parents);
        };

        if snapshot.version != pkg.version {
            return self.reconcile_with_registry(pkg, &fingerprint, &parents);
        }

        if snapshot.fingerprint != fingerprint {
            // File changes without a version bump must be flagged, not
            // silently rebuilt.
            if self.strictness == Strictness::Deny {
                return Err(Error::UnversionedChange {
                    package: pkg.name.clone(),
                });
            }
            warn!(
                package = %pkg.name,
                "content changed but version {} was not bumped", pkg.version
            );
            return self.refine_modified(pkg);
        }

        if snapshot.parent_versions != parents {
            // A dependency bump changes the effective dependency closure
            // even though this package's own files did not move.
            return self.refine_modified(pkg);
        }

        Ok(PackageState::Unmodified)
    }

    /// Version differs from the snapshot (or no snapshot exists): ask the
    /// registry whether this exact version is already out there.
    fn reconcile_with_registry(
        &mut self,
        pkg: &Package,
        fingerprint: &str,
        parents: &BTreeMap<String, Version>,
    ) -> Result<PackageState> {
        match self.registry.fetch_artifact(&pkg.name, &pkg.version)? {
            Some(artifact) if artifact.digest == fingerprint => {
                // The version exists and carries identical content; confirm
                // it locally so later checks are pure snapshot comparisons.
                self.store.record(
                    &pkg.name,
                    StateSnapshot {
                        version: pkg.version.clone(),
                        fingerprint: fingerprint.to_string(),
                        parent_versions: parents.clone(),
                        published: Some(pkg.version.clone()),
                    },
                )?;
                Ok(PackageState::Unmodified)
            }
            Some(_) => Err(Error::VersionConflict {
                package: pkg.name.clone(),
                version: pkg.version.to_string(),
            }),
            None => match self.registry.latest_version(&pkg.name)? {
                Some(latest) if pkg.version < latest => Err(Error::OutdatedVersion {
                    package: pkg.name.clone(),
                    local: pkg.version.to_string(),
                    published: latest.to_string(),
                }),
                Some(_) => Ok(PackageState::ModifiedUnpublished),
                None => Ok(PackageState::Modified),
            },
        }
    }

    /// Distinguishes "built, ready to publish" from "just modified locally"
    /// for packages whose version matches their snapshot.
    fn refine_modified(&self, pkg: &Package) -> Result<PackageState> {
        let versions = self.registry.list_versions(&pkg.name)?;
        if !versions.contains(&pkg.version) {
            if let Some(latest) = versions.iter().max() {
                if pkg.version > *latest {
                    return Ok(PackageState::ModifiedUnpublished);
                }
            }
        }
        Ok(PackageState::Modified)
    }

    /// Records the current version, fingerprint, and resolved dependency
    /// versions as the new baseline after a confirming action. `published`
    /// overrides the last-known-published version; `None` keeps whatever
    /// the previous snapshot recorded.
    pub fn confirm(
        &mut self,
        graph: &PackageGraph,
        name: &str,
        published: Option<Version>,
    ) -> Result<()> {
        let pkg = graph.get(name).ok_or_else(|| Error::PackageNotFound {
            name: name.to_string(),
            available: graph.topological_order().join(", "),
        })?;
        let fingerprint = self.fingerprint(pkg)?;
        let parents = graph.local_dependency_versions(name)?;
        let published =
            published.or_else(|| self.store.get(name).and_then(|s| s.published.clone()));
        self.store.record(
            name,
            StateSnapshot {
                version: pkg.version.clone(),
                fingerprint,
                parent_versions: parents,
                published,
            },
        )
    }

    /// Current content fingerprint of a package tree.
    pub fn fingerprint(&self, pkg: &Package) -> Result<String> {
        fingerprint_dir(&self.root.join(&pkg.path), &self.ignore)
    }

    /// Drops the recorded snapshot for one package.
    pub fn forget(&mut self, name: &str) -> Result<bool> {
        self.store.remove(name)
    }

    /// Drops every recorded snapshot.
    pub fn forget_all(&mut self) -> Result<()> {
        self.store.clear()
    }
}
