//! Registry client abstraction and backends.
//!
//! The core never assumes a registry wire protocol; it talks to the
//! [`RegistryClient`] trait. A published artifact carries the content
//! digest it was built from, which is what state detection compares
//! against local fingerprints.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use semver::Version;

use crate::error::{Error, Result};

/// A published (or to-be-published) distribution payload.
#[derive(Debug, Clone, PartialEq)]
pub struct Artifact {
    /// Content digest of the package tree the payload was built from.
    pub digest: String,
    pub bytes: Vec<u8>,
}

/// Client for one package registry.
///
/// Transport failures must surface as `Error::Registry` and are retryable
/// by re-running the command; they are never folded into "not found".
pub trait RegistryClient: Send + Sync {
    /// All published versions of `name`, unsorted. Empty if the package was
    /// never published.
    fn list_versions(&self, name: &str) -> Result<Vec<Version>>;

    /// The artifact published for `name` at `version`, or `None` if that
    /// exact version does not exist.
    fn fetch_artifact(&self, name: &str, version: &Version) -> Result<Option<Artifact>>;

    /// Uploads an artifact. A version that already exists with different
    /// content is refused with `VersionConflict`; re-publishing identical
    /// content is an idempotent no-op.
    fn publish(&self, name: &str, version: &Version, artifact: &Artifact) -> Result<()>;

    /// Highest published version, if any.
    fn latest_version(&self, name: &str) -> Result<Option<Version>> {
        Ok(self.list_versions(name)?.into_iter().max())
    }
}

const DIGEST_FILE: &str = "sha256";
const PAYLOAD_FILE: &str = "artifact.bin";

/// Directory-backed registry: one directory per package, one subdirectory
/// per published version holding the payload and its digest.
pub struct FsRegistry {
    root: PathBuf,
}

impl FsRegistry {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    fn version_dir(&self, name: &str, version: &Version) -> PathBuf {
        self.root.join(name).join(version.to_string())
    }
}

impl RegistryClient for FsRegistry {
    fn list_versions(&self, name: &str) -> Result<Vec<Version>> {
        let dir = self.root.join(name);
        if !dir.exists() {
            return Ok(Vec::new());
        }
        let mut versions = Vec::new();
        for entry in fs::read_dir(&dir).map_err(|e| Error::Registry {
            message: format!("cannot list {}: {}", dir.display(), e),
        })? {
            let entry = entry.map_err(|e| Error::Registry {
                message: e.to_string(),
            })?;
            if let Ok(version) = Version::parse(&entry.file_name().to_string_lossy()) {
                versions.push(version);
            }
        }
        Ok(versions)
    }

    fn fetch_artifact(&self, name: &str, version: &Version) -> Result<Option<Artifact>> {
        let dir = self.version_dir(name, version);
        if !dir.exists() {
            return Ok(None);
        }
        let digest = fs::read_to_string(dir.join(DIGEST_FILE)).map_err(|e| Error::Registry {
            message: format!("cannot read {}: {}", dir.display(), e),
        })?;
        let bytes = fs::read(dir.join(PAYLOAD_FILE)).map_err(|e| Error::Registry {
            message: format!("cannot read {}: {}", dir.display(), e),
        })?;
        Ok(Some(Artifact {
            digest: digest.trim().to_string(),
            bytes,
        }))
    }

    fn publish(&self, name: &str, version: &Version, artifact: &Artifact) -> Result<()> {
        if let Some(existing) = self.fetch_artifact(name, version)? {
            if existing.digest == artifact.digest {
                return Ok(());
            }
            return Err(Error::VersionConflict {
                package: name.to_string(),
                version: version.to_string(),
            });
        }
        let dir = self.version_dir(name, version);
        fs::create_dir_all(&dir).map_err(|e| Error::Registry {
            message: format!("cannot create {}: {}", dir.display(), e),
        })?;
        fs::write(dir.join(DIGEST_FILE), &artifact.digest).map_err(|e| Error::Registry {
            message: e.to_string(),
        })?;
        fs::write(dir.join(PAYLOAD_FILE), &artifact.bytes).map_err(|e| Error::Registry {
            message: e.to_string(),
        })?;
        Ok(())
    }
}

/// In-memory registry for tests and dry runs. Can be flipped offline to
/// exercise the retryable transport-error path.
#[derive(Default)]
pub struct MemoryRegistry {
    inner: Mutex<MemoryInner>,
}

#[derive(Default)]
struct MemoryInner {
    packages: HashMap<String, BTreeMap<Version, Artifact>>,
    offline: bool,
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_offline(&self, offline: bool) {
        self.inner.lock().unwrap().offline = offline;
    }

    fn check_online(inner: &MemoryInner) -> Result<()> {
        if inner.offline {
            return Err(Error::Registry {
                message: "registry unreachable".to_string(),
            });
        }
        Ok(())
    }
}

impl RegistryClient for MemoryRegistry {
    fn list_versions(&self, name: &str) -> Result<Vec<Version>> {
        let inner = self.inner.lock().unwrap();
        Self::check_online(&inner)?;
        Ok(inner
            .packages
            .get(name)
            .map(|versions| versions.keys().cloned().collect())
            .unwrap_or_default())
    }

    fn fetch_artifact(&self, name: &str, version: &Version) -> Result<Option<Artifact>> {
        let inner = self.inner.lock().unwrap();
        Self::check_online(&inner)?;
        Ok(inner
            .packages
            .get(name)
            .and_then(|versions| versions.get(version))
            .cloned())
    }

    fn publish(&self, name: &str, version: &Version, artifact: &Artifact) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        Self::check_online(&inner)?;
        let versions = inner.packages.entry(name.to_string()).or_default();
        if let Some(existing) = versions.get(version) {
            if existing.digest == artifact.digest {
                return Ok(());
            }
            return Err(Error::VersionConflict {
                package: name.to_string(),
                version: version.to_string(),
            });
        }
        versions.insert(version.clone(), artifact.clone());
        Ok(())
    }
}
