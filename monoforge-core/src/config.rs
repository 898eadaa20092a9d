//! Workspace configuration.
//!
//! Lives in the root `monoforge.toml` under a `[workspace]` table, with
//! build/install command templates under `[commands]`. Every field has a
//! usable default, so a bare root file (or none at all) still works.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::manifest::MANIFEST_FILE;
use crate::state::Strictness;

/// Command templates for the external actions. Placeholders `{name}`,
/// `{version}`, and `{path}` expand per package.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Commands {
    #[serde(default = "default_build")]
    pub build: String,
    /// Path of the artifact the build command leaves behind, relative to
    /// the package directory.
    #[serde(default = "default_artifact")]
    pub artifact: String,
    #[serde(default = "default_install")]
    pub install: String,
    /// Alternative install command for editable (link-style) installs.
    #[serde(default)]
    pub editable_install: Option<String>,
    /// Probe whose zero exit status means the package is already linked.
    #[serde(default)]
    pub probe: Option<String>,
}

fn default_build() -> String {
    "mkdir -p dist && tar --exclude ./dist -czf dist/{name}-{version}.tar.gz .".to_string()
}

fn default_artifact() -> String {
    "dist/{name}-{version}.tar.gz".to_string()
}

fn default_install() -> String {
    ":".to_string()
}

impl Default for Commands {
    fn default() -> Self {
        Self {
            build: default_build(),
            artifact: default_artifact(),
            install: default_install(),
            editable_install: None,
            probe: None,
        }
    }
}

/// Workspace-level settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkspaceConfig {
    #[serde(default = "default_registry_dir")]
    pub registry_dir: PathBuf,
    #[serde(default = "default_snapshot_file")]
    pub snapshot_file: PathBuf,
    #[serde(default)]
    pub strictness: Strictness,
    /// Cascade automatic version bumps to dependents during propagation.
    #[serde(default)]
    pub cascade: bool,
    /// Extra directory names excluded from scanning and fingerprinting.
    #[serde(default)]
    pub ignore: Vec<String>,
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
    #[serde(default)]
    pub commands: Commands,
}

fn default_registry_dir() -> PathBuf {
    PathBuf::from(".monoforge/registry")
}

fn default_snapshot_file() -> PathBuf {
    PathBuf::from(".monoforge/snapshots.json")
}

fn default_max_depth() -> usize {
    3
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            registry_dir: default_registry_dir(),
            snapshot_file: default_snapshot_file(),
            strictness: Strictness::default(),
            cascade: false,
            ignore: Vec::new(),
            max_depth: default_max_depth(),
            commands: Commands::default(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct WorkspaceFile {
    #[serde(default)]
    workspace: Option<WorkspaceConfig>,
    #[serde(default)]
    commands: Option<Commands>,
}

impl WorkspaceConfig {
    /// Loads the configuration from `<root>/monoforge.toml`, falling back
    /// to defaults when the file or its `[workspace]` table is absent.
    pub fn load(root: impl AsRef<Path>) -> Result<Self> {
        let path = root.as_ref().join(MANIFEST_FILE);
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(&path)?;
        let file: WorkspaceFile = toml::from_str(&content).map_err(|e| Error::Manifest {
            path: path.clone(),
            message: e.to_string(),
        })?;
        let mut config = file.workspace.unwrap_or_default();
        if let Some(commands) = file.commands {
            config.commands = commands;
        }
        Ok(config)
    }

    /// Resolves a configured path against the workspace root.
    pub fn resolve(&self, root: &Path, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            root.join(path)
        }
    }
}
