//! Repository scanner for discovering packages.

use std::path::{Path, PathBuf};

use rayon::prelude::*;
use tracing::debug;
use walkdir::WalkDir;

use crate::error::Result;
use crate::manifest::ManifestReader;
use crate::package::Package;

const DEFAULT_SKIP: &[&str] = &[".git", ".monoforge", "target", "dist", "node_modules"];

/// Scans a root directory for package manifests.
///
/// Every directory below the root (up to `max_depth`) holding the reader's
/// manifest file is a candidate package. The root's own manifest is the
/// workspace configuration, not a package, and is skipped.
pub struct Scanner<'a> {
    root: PathBuf,
    reader: &'a dyn ManifestReader,
    ignore: Vec<String>,
    max_depth: usize,
}

impl<'a> Scanner<'a> {
    pub fn new(root: impl AsRef<Path>, reader: &'a dyn ManifestReader) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            reader,
            ignore: Vec::new(),
            max_depth: 3,
        }
    }

    pub fn with_ignore(mut self, ignore: Vec<String>) -> Self {
        self.ignore = ignore;
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Discovers every package under the root, sorted by name. Name
    /// uniqueness is enforced by the graph builder, which has both paths
    /// at hand for the error.
    pub fn scan(&self) -> Result<Vec<Package>> {
        let manifest_name = self.reader.file_name();
        let manifest_dirs: Vec<PathBuf> = WalkDir::new(&self.root)
            .max_depth(self.max_depth)
            .into_iter()
            .filter_entry(|e| {
                let name = e.file_name().to_string_lossy();
                !(e.file_type().is_dir()
                    && (DEFAULT_SKIP.contains(&name.as_ref())
                        || self.ignore.iter().any(|i| i == &*name)))
            })
            .filter_map(|e| e.ok())
            .filter(|e| e.depth() >= 2 && e.file_name() == manifest_name)
            .filter_map(|e| e.path().parent().map(Path::to_path_buf))
            .collect();

        let packages: Result<Vec<Package>> = manifest_dirs
            .into_par_iter()
            .map(|dir| {
                let mut pkg = self.reader.read(&dir)?;
                pkg.path = dir
                    .strip_prefix(&self.root)
                    .map(Path::to_path_buf)
                    .unwrap_or(dir);
                debug!(package = %pkg.name, path = %pkg.path.display(), "discovered");
                Ok(pkg)
            })
            .collect();

        let mut packages = packages?;
        packages.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(packages)
    }
}
