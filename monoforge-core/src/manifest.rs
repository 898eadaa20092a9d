//! Manifest reading and writing.
//!
//! The core never assumes a particular manifest syntax; it talks to these
//! traits. The default implementation parses per-package `monoforge.toml`
//! files.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use semver::{Version, VersionReq};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::package::{Dependency, Package};

pub const MANIFEST_FILE: &str = "monoforge.toml";

/// Parses one package directory into a normalized descriptor.
pub trait ManifestReader: Send + Sync {
    /// File name that marks a directory as a package.
    fn file_name(&self) -> &str;

    /// Reads the manifest in `dir`. The returned package's `path` is `dir`
    /// as given; the scanner relativizes it against the root.
    fn read(&self, dir: &Path) -> Result<Package>;
}

/// Writes version and constraint updates back to a package manifest.
pub trait ManifestWriter: Send + Sync {
    fn set_version(&self, dir: &Path, version: &Version) -> Result<()>;

    fn set_constraint(&self, dir: &Path, dependency: &str, constraint: &VersionReq)
        -> Result<()>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawManifest {
    name: String,
    version: String,
    #[serde(default)]
    dependencies: BTreeMap<String, String>,
    #[serde(default, rename = "dev-dependencies")]
    dev_dependencies: BTreeMap<String, String>,
}

/// Default TOML manifest implementation.
#[derive(Debug, Default, Clone)]
pub struct TomlManifest;

impl TomlManifest {
    fn load_raw(&self, dir: &Path) -> Result<RawManifest> {
        let path = dir.join(self.file_name());
        let content = fs::read_to_string(&path)?;
        toml::from_str(&content).map_err(|e| Error::Manifest {
            path: path.clone(),
            message: e.to_string(),
        })
    }

    fn store_raw(&self, dir: &Path, raw: &RawManifest) -> Result<()> {
        let path = dir.join(self.file_name());
        let content = toml::to_string_pretty(raw).map_err(|e| Error::Manifest {
            path: path.clone(),
            message: e.to_string(),
        })?;
        fs::write(&path, content)?;
        Ok(())
    }
}

fn parse_deps(
    dir: &Path,
    entries: &BTreeMap<String, String>,
    dev: bool,
    out: &mut Vec<Dependency>,
) -> Result<()> {
    for (name, spec) in entries {
        let constraint = VersionReq::parse(spec).map_err(|e| Error::Manifest {
            path: dir.join(MANIFEST_FILE),
            message: format!("invalid constraint '{}' for dependency {}: {}", spec, name, e),
        })?;
        out.push(Dependency {
            name: name.clone(),
            constraint,
            dev,
        });
    }
    Ok(())
}

impl ManifestReader for TomlManifest {
    fn file_name(&self) -> &str {
        MANIFEST_FILE
    }

    fn read(&self, dir: &Path) -> Result<Package> {
        let raw = self.load_raw(dir)?;
        let version = Version::parse(&raw.version).map_err(|e| Error::Manifest {
            path: dir.join(MANIFEST_FILE),
            message: format!("invalid version '{}': {}", raw.version, e),
        })?;

        let mut dependencies = Vec::with_capacity(raw.dependencies.len());
        parse_deps(dir, &raw.dependencies, false, &mut dependencies)?;
        parse_deps(dir, &raw.dev_dependencies, true, &mut dependencies)?;

        Ok(Package::new(
            raw.name,
            version,
            dir.to_path_buf(),
            dependencies,
        ))
    }
}

impl ManifestWriter for TomlManifest {
    fn set_version(&self, dir: &Path, version: &Version) -> Result<()> {
        let mut raw = self.load_raw(dir)?;
        raw.version = version.to_string();
        self.store_raw(dir, &raw)
    }

    fn set_constraint(
        &self,
        dir: &Path,
        dependency: &str,
        constraint: &VersionReq,
    ) -> Result<()> {
        let mut raw = self.load_raw(dir)?;
        let entries = if raw.dependencies.contains_key(dependency) {
            &mut raw.dependencies
        } else if raw.dev_dependencies.contains_key(dependency) {
            &mut raw.dev_dependencies
        } else {
            return Err(Error::PackageNotFound {
                name: dependency.to_string(),
                available: raw
                    .dependencies
                    .keys()
                    .chain(raw.dev_dependencies.keys())
                    .cloned()
                    .collect::<Vec<_>>()
                    .join(", "),
            });
        };
        entries.insert(dependency.to_string(), constraint.to_string());
        self.store_raw(dir, &raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_manifest_with_dev_dependencies() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join(MANIFEST_FILE),
            r#"
name = "core"
version = "1.4.0"

[dependencies]
util = "^1.0"

[dev-dependencies]
testkit = "^0.2"
"#,
        )
        .unwrap();

        let pkg = TomlManifest.read(dir.path()).unwrap();
        assert_eq!(pkg.name, "core");
        assert_eq!(pkg.version, Version::new(1, 4, 0));
        assert!(!pkg.dependency("util").unwrap().dev);
        assert!(pkg.dependency("testkit").unwrap().dev);
    }

    #[test]
    fn rejects_invalid_version() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join(MANIFEST_FILE),
            "name = \"core\"\nversion = \"not-a-version\"\n",
        )
        .unwrap();

        let err = TomlManifest.read(dir.path()).unwrap_err();
        assert!(matches!(err, Error::Manifest { .. }));
    }

    #[test]
    fn writes_version_and_constraint() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join(MANIFEST_FILE),
            "name = \"core\"\nversion = \"1.0.0\"\n\n[dependencies]\nutil = \"^1.0\"\n",
        )
        .unwrap();

        TomlManifest
            .set_version(dir.path(), &Version::new(1, 1, 0))
            .unwrap();
        TomlManifest
            .set_constraint(dir.path(), "util", &VersionReq::parse("^2.0.0").unwrap())
            .unwrap();

        let pkg = TomlManifest.read(dir.path()).unwrap();
        assert_eq!(pkg.version, Version::new(1, 1, 0));
        assert_eq!(
            pkg.dependency("util").unwrap().constraint,
            VersionReq::parse("^2.0.0").unwrap()
        );
    }
}
