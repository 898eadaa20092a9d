//! Package data model.

use std::path::PathBuf;

use semver::{Version, VersionReq};
use serde::{Deserialize, Serialize};

/// A single declared dependency with its version constraint.
///
/// Whether the dependency is local (another package in the same scan) or
/// external is decided by the graph builder, not by the manifest: a declared
/// name that no discovered package carries is external by definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dependency {
    pub name: String,
    pub constraint: VersionReq,
    /// Development-only dependency, excluded from the publish closure.
    #[serde(default)]
    pub dev: bool,
}

/// Represents a package discovered in the monorepo.
///
/// Identity is the declared name from the manifest, not the folder name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Package {
    pub name: String,
    pub version: Version,
    /// Directory of the package, relative to the scan root.
    pub path: PathBuf,
    /// Declared dependencies in deterministic (name) order.
    pub dependencies: Vec<Dependency>,
}

impl Package {
    pub fn new(
        name: String,
        version: Version,
        path: PathBuf,
        dependencies: Vec<Dependency>,
    ) -> Self {
        Self {
            name,
            version,
            path,
            dependencies,
        }
    }

    #[inline]
    pub fn dependency(&self, name: &str) -> Option<&Dependency> {
        self.dependencies.iter().find(|d| d.name == name)
    }

    /// Dependency names, optionally filtered to runtime-only.
    pub fn dependency_names(&self, include_dev: bool) -> impl Iterator<Item = &str> {
        self.dependencies
            .iter()
            .filter(move |d| include_dev || !d.dev)
            .map(|d| d.name.as_str())
    }
}
