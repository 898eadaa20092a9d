//! Shared fixtures: on-disk workspaces and scripted actions.
#![allow(dead_code)]

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use monoforge_core::actions::{ActionOptions, BuildAction, InstallAction};
use monoforge_core::error::{Error, Result};
use monoforge_core::graph::PackageGraph;
use monoforge_core::manifest::{TomlManifest, MANIFEST_FILE};
use monoforge_core::package::Package;
use monoforge_core::registry::MemoryRegistry;
use monoforge_core::scanner::Scanner;
use monoforge_core::snapshot::SnapshotStore;
use monoforge_core::state::StateDetector;

pub struct Workspace {
    dir: tempfile::TempDir,
}

impl Workspace {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
        }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Creates a package directory with a manifest and one source file.
    /// Dependencies are `(name, constraint)` pairs.
    pub fn add_package(&self, name: &str, version: &str, deps: &[(&str, &str)]) {
        self.add_package_full(name, version, deps, &[]);
    }

    pub fn add_package_full(
        &self,
        name: &str,
        version: &str,
        deps: &[(&str, &str)],
        dev_deps: &[(&str, &str)],
    ) {
        let dir = self.root().join(name);
        fs::create_dir_all(dir.join("src")).unwrap();

        let mut manifest = format!("name = \"{}\"\nversion = \"{}\"\n", name, version);
        if !deps.is_empty() {
            manifest.push_str("\n[dependencies]\n");
            for (dep, constraint) in deps {
                manifest.push_str(&format!("{} = \"{}\"\n", dep, constraint));
            }
        }
        if !dev_deps.is_empty() {
            manifest.push_str("\n[dev-dependencies]\n");
            for (dep, constraint) in dev_deps {
                manifest.push_str(&format!("{} = \"{}\"\n", dep, constraint));
            }
        }
        fs::write(dir.join(MANIFEST_FILE), manifest).unwrap();
        fs::write(dir.join("src").join("main.txt"), format!("{} sources", name)).unwrap();
    }

    pub fn write_file(&self, package: &str, relative: &str, content: &str) {
        let path = self.root().join(package).join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    pub fn set_version(&self, package: &str, version: &str) {
        use monoforge_core::manifest::ManifestWriter;
        TomlManifest
            .set_version(
                &self.root().join(package),
                &semver::Version::parse(version).unwrap(),
            )
            .unwrap();
    }

    pub fn scan(&self) -> Vec<Package> {
        Scanner::new(self.root(), &TomlManifest).scan().unwrap()
    }

    pub fn graph(&self) -> PackageGraph {
        PackageGraph::new(self.scan()).unwrap()
    }

    /// Detector with a file-backed store, so a fresh detector per
    /// "invocation" still sees earlier confirmations.
    pub fn detector<'a>(&self, registry: &'a MemoryRegistry) -> StateDetector<'a> {
        let store = SnapshotStore::open(self.snapshot_path()).unwrap();
        StateDetector::new(self.root(), registry, store)
    }

    pub fn snapshot_path(&self) -> PathBuf {
        self.root().join(".monoforge/snapshots.json")
    }
}

/// Build/install double that records invocation order and fails on demand.
#[derive(Default)]
pub struct RecordingActions {
    pub log: Mutex<Vec<String>>,
    pub fail: Mutex<HashSet<String>>,
    pub linked: Mutex<HashSet<String>>,
}

impl RecordingActions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_on(&self, name: &str) {
        self.fail.lock().unwrap().insert(name.to_string());
    }

    pub fn mark_linked(&self, name: &str) {
        self.linked.lock().unwrap().insert(name.to_string());
    }

    pub fn log(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }
}

impl BuildAction for RecordingActions {
    fn build(&self, pkg: &Package, _dir: &Path, _opts: &ActionOptions) -> Result<Vec<u8>> {
        if self.fail.lock().unwrap().contains(&pkg.name) {
            return Err(Error::Build {
                package: pkg.name.clone(),
                message: "scripted failure".to_string(),
            });
        }
        self.log.lock().unwrap().push(pkg.name.clone());
        Ok(format!("artifact:{}:{}", pkg.name, pkg.version).into_bytes())
    }
}

impl InstallAction for RecordingActions {
    fn install(&self, _pkg: &Package, _dir: &Path, _opts: &ActionOptions) -> Result<()> {
        Ok(())
    }

    fn is_linked(&self, pkg: &Package, _dir: &Path) -> bool {
        self.linked.lock().unwrap().contains(&pkg.name)
    }
}
