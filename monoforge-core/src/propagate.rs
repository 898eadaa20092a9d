//! Version bump propagation through dependents.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use semver::{Comparator, Op, Version, VersionReq};
use tracing::info;

use crate::error::{Error, Result};
use crate::graph::PackageGraph;
use crate::manifest::ManifestWriter;

/// Type of semantic version bump.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BumpType {
    /// 1.2.3 -> 2.0.0
    Major,
    /// 1.2.3 -> 1.3.0
    Minor,
    /// 1.2.3 -> 1.2.4
    Patch,
}

impl BumpType {
    pub fn apply(self, version: &Version) -> Version {
        match self {
            BumpType::Major => Version::new(version.major + 1, 0, 0),
            BumpType::Minor => Version::new(version.major, version.minor + 1, 0),
            BumpType::Patch => Version::new(version.major, version.minor, version.patch + 1),
        }
    }
}

/// One constraint retarget in a dependent's manifest.
#[derive(Debug, Clone, PartialEq)]
pub struct ConstraintEdit {
    pub package: String,
    pub dependency: String,
    pub old: VersionReq,
    pub new: VersionReq,
}

/// One package version change.
#[derive(Debug, Clone, PartialEq)]
pub struct VersionBump {
    pub package: String,
    pub old: Version,
    pub new: Version,
}

/// Planned manifest changes; nothing is written until [`VersionPropagator::apply`].
#[derive(Debug, Default, Clone)]
pub struct PropagationPlan {
    pub bumps: Vec<VersionBump>,
    pub edits: Vec<ConstraintEdit>,
}

impl PropagationPlan {
    pub fn is_empty(&self) -> bool {
        self.bumps.is_empty() && self.edits.is_empty()
    }
}

/// Walks dependents of changed packages and retargets their declared
/// constraints. Packages are visited with their dependencies already
/// finalized, so each dependent sees updated upstream versions exactly once.
///
/// Cascading automatic version bumps to dependents is off by default; with
/// it disabled, the installer force-upgrades transitive local dependencies
/// at install time instead of relying on version bumps.
pub struct VersionPropagator<'a> {
    root: PathBuf,
    writer: &'a dyn ManifestWriter,
    cascade: bool,
}

impl<'a> VersionPropagator<'a> {
    pub fn new(root: impl AsRef<Path>, writer: &'a dyn ManifestWriter) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            writer,
            cascade: false,
        }
    }

    pub fn with_cascade(mut self, cascade: bool) -> Self {
        self.cascade = cascade;
        self
    }

    /// Plans constraint updates for dependents of `changed` packages, whose
    /// new versions are already reflected in the graph.
    pub fn plan(&self, graph: &PackageGraph, changed: &[String]) -> Result<PropagationPlan> {
        for name in changed {
            if graph.get(name).is_none() {
                return Err(Error::PackageNotFound {
                    name: name.clone(),
                    available: graph.topological_order().join(", "),
                });
            }
        }
        self.plan_inner(graph, HashMap::new(), changed.iter().cloned().collect())
    }

    /// Bumps `target` and plans the resulting propagation in one go.
    pub fn plan_bump(
        &self,
        graph: &PackageGraph,
        target: &str,
        bump: BumpType,
    ) -> Result<PropagationPlan> {
        let pkg = graph.get(target).ok_or_else(|| Error::PackageNotFound {
            name: target.to_string(),
            available: graph.topological_order().join(", "),
        })?;
        let new_version = bump.apply(&pkg.version);
        let mut overrides = HashMap::new();
        overrides.insert(target.to_string(), (pkg.version.clone(), new_version));
        self.plan_inner(graph, overrides, [target.to_string()].into_iter().collect())
    }

    fn plan_inner(
        &self,
        graph: &PackageGraph,
        overrides: HashMap<String, (Version, Version)>,
        mut changed: HashSet<String>,
    ) -> Result<PropagationPlan> {
        let mut plan = PropagationPlan::default();
        let mut versions: HashMap<String, Version> = graph
            .packages()
            .map(|p| (p.name.clone(), p.version.clone()))
            .collect();
        // Packages whose version this plan already moves; `changed` only
        // marks whose constraints need checking and may cover the whole
        // graph, so it cannot gate the cascade.
        let mut bumped: HashSet<String> = HashSet::new();
        for (name, (old, new)) in overrides {
            versions.insert(name.clone(), new.clone());
            bumped.insert(name.clone());
            plan.bumps.push(VersionBump {
                package: name,
                old,
                new,
            });
        }

        // Dependencies are finalized before any of their dependents.
        for name in graph.topological_order() {
            let pkg = graph.get(name).expect("package in topological order");
            let mut edited = false;

            for dep in &pkg.dependencies {
                if !changed.contains(&dep.name) {
                    continue;
                }
                let Some(dep_version) = versions.get(&dep.name) else {
                    continue; // external dependency, out of scope
                };
                if dep.constraint.matches(dep_version) {
                    // Still satisfied; leave user-set constraints alone.
                    continue;
                }
                let new = retarget(&dep.constraint, dep_version);
                plan.edits.push(ConstraintEdit {
                    package: name.clone(),
                    dependency: dep.name.clone(),
                    old: dep.constraint.clone(),
                    new,
                });
                edited = true;
            }

            if edited && self.cascade && !bumped.contains(name) {
                let old = versions[name].clone();
                let new = BumpType::Patch.apply(&old);
                versions.insert(name.clone(), new.clone());
                bumped.insert(name.clone());
                plan.bumps.push(VersionBump {
                    package: name.clone(),
                    old,
                    new,
                });
                changed.insert(name.clone());
            }
        }

        Ok(plan)
    }

    /// Writes the planned changes through the manifest writer.
    pub fn apply(&self, graph: &PackageGraph, plan: &PropagationPlan) -> Result<()> {
        for bump in &plan.bumps {
            let pkg = graph.get(&bump.package).ok_or_else(|| Error::PackageNotFound {
                name: bump.package.clone(),
                available: graph.topological_order().join(", "),
            })?;
            info!(package = %bump.package, old = %bump.old, new = %bump.new, "bump version");
            self.writer
                .set_version(&self.root.join(&pkg.path), &bump.new)?;
        }
        for edit in &plan.edits {
            let pkg = graph.get(&edit.package).ok_or_else(|| Error::PackageNotFound {
                name: edit.package.clone(),
                available: graph.topological_order().join(", "),
            })?;
            info!(
                package = %edit.package,
                dependency = %edit.dependency,
                old = %edit.old,
                new = %edit.new,
                "retarget constraint"
            );
            self.writer
                .set_constraint(&self.root.join(&pkg.path), &edit.dependency, &edit.new)?;
        }
        Ok(())
    }
}

/// Retargets a constraint to include `version`, keeping the shape of an
/// explicit exact pin and defaulting to a caret requirement otherwise.
fn retarget(old: &VersionReq, version: &Version) -> VersionReq {
    let is_exact_pin =
        old.comparators.len() == 1 && matches!(old.comparators[0], Comparator { op: Op::Exact, .. });
    let spec = if is_exact_pin {
        format!("={}", version)
    } else {
        format!("^{}", version)
    };
    VersionReq::parse(&spec).expect("constraint built from a valid version")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bump_arithmetic() {
        let v = Version::new(1, 2, 3);
        assert_eq!(BumpType::Major.apply(&v), Version::new(2, 0, 0));
        assert_eq!(BumpType::Minor.apply(&v), Version::new(1, 3, 0));
        assert_eq!(BumpType::Patch.apply(&v), Version::new(1, 2, 4));
    }

    #[test]
    fn retarget_keeps_exact_pins() {
        let pinned = VersionReq::parse("=1.0.0").unwrap();
        assert_eq!(
            retarget(&pinned, &Version::new(1, 1, 0)),
            VersionReq::parse("=1.1.0").unwrap()
        );

        let caret = VersionReq::parse("^1.0").unwrap();
        assert_eq!(
            retarget(&caret, &Version::new(2, 0, 0)),
            VersionReq::parse("^2.0.0").unwrap()
        );
    }
}
