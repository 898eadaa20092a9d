//! Persistent per-package state snapshots.
//!
//! The store is a plain key-value file keyed by package name. It is owned
//! exclusively by the state detector; orchestrators reach it only through
//! the detector's verdicts and confirm calls, which keeps the single-writer-
//! per-package discipline at the call site rather than inside the store.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use semver::Version;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Last confirmed state record for one package, the baseline every
/// modification check compares against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateSnapshot {
    /// Version recorded at the last confirming action.
    pub version: Version,
    /// Content digest recorded at the last confirming action.
    pub fingerprint: String,
    /// Resolved versions of local dependencies at snapshot time.
    #[serde(default)]
    pub parent_versions: BTreeMap<String, Version>,
    /// Last version known to be on the registry, if any.
    #[serde(default)]
    pub published: Option<Version>,
}

/// File-backed snapshot store. With no path it stays in memory, which the
/// tests and dry runs use.
#[derive(Debug)]
pub struct SnapshotStore {
    path: Option<PathBuf>,
    entries: BTreeMap<String, StateSnapshot>,
}

impl SnapshotStore {
    pub fn in_memory() -> Self {
        Self {
            path: None,
            entries: BTreeMap::new(),
        }
    }

    /// Opens the store at `path`, treating a missing file as empty.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let entries = if path.exists() {
            let content = fs::read_to_string(&path)?;
            serde_json::from_str(&content)
                .map_err(|e| Error::Snapshot(format!("corrupt store {}: {}", path.display(), e)))?
        } else {
            BTreeMap::new()
        };
        Ok(Self {
            path: Some(path),
            entries,
        })
    }

    #[inline]
    pub fn get(&self, name: &str) -> Option<&StateSnapshot> {
        self.entries.get(name)
    }

    /// Inserts or overwrites the snapshot for `name` and persists.
    pub fn record(&mut self, name: &str, snapshot: StateSnapshot) -> Result<()> {
        self.entries.insert(name.to_string(), snapshot);
        self.persist()
    }

    /// Drops the snapshot for `name`; the next state check treats the
    /// package as first-time.
    pub fn remove(&mut self, name: &str) -> Result<bool> {
        let removed = self.entries.remove(name).is_some();
        if removed {
            self.persist()?;
        }
        Ok(removed)
    }

    pub fn clear(&mut self) -> Result<()> {
        self.entries.clear();
        self.persist()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn persist(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(&self.entries)
            .map_err(|e| Error::Snapshot(e.to_string()))?;
        fs::write(path, content)?;
        Ok(())
    }
}
