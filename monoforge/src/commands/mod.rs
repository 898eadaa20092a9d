//! Command implementations for the CLI.

mod execution;
mod query;
mod release;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use monoforge_core::{
    FsRegistry, PackageGraph, Scanner, SnapshotStore, StateDetector, TomlManifest,
    WorkspaceConfig,
};

pub use execution::cmd_install;
pub use query::cmd_list;
pub use release::{cmd_clean, cmd_publish, cmd_update};

/// Everything a command needs about the workspace it runs in.
struct Workspace {
    root: PathBuf,
    config: WorkspaceConfig,
    graph: PackageGraph,
}

impl Workspace {
    fn load(root: &Path) -> Result<Self> {
        let config = WorkspaceConfig::load(root)
            .with_context(|| format!("loading workspace config in {}", root.display()))?;
        let packages = Scanner::new(root, &TomlManifest)
            .with_ignore(config.ignore.clone())
            .with_max_depth(config.max_depth)
            .scan()
            .with_context(|| format!("scanning {}", root.display()))?;
        let graph = PackageGraph::new(packages)?;
        Ok(Self {
            root: root.to_path_buf(),
            config,
            graph,
        })
    }

    fn registry(&self) -> FsRegistry {
        FsRegistry::new(self.config.resolve(&self.root, &self.config.registry_dir))
    }

    fn snapshot_store(&self) -> Result<SnapshotStore> {
        let path = self.config.resolve(&self.root, &self.config.snapshot_file);
        Ok(SnapshotStore::open(path)?)
    }

    fn detector<'a>(&self, registry: &'a FsRegistry) -> Result<StateDetector<'a>> {
        Ok(
            StateDetector::new(&self.root, registry, self.snapshot_store()?)
                .with_strictness(self.config.strictness)
                .with_ignore(self.config.ignore.clone()),
        )
    }
}

fn targets_of(packages: &[String]) -> Option<&[String]> {
    if packages.is_empty() {
        None
    } else {
        Some(packages)
    }
}
