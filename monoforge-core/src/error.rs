//! Error types and result aliases.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed manifest {path:?}: {message}")]
    Manifest { path: PathBuf, message: String },

    #[error("Duplicate package '{name}' declared in both {first:?} and {second:?}")]
    DuplicatePackage {
        name: String,
        first: PathBuf,
        second: PathBuf,
    },

    #[error("Package not found: {name}. Available packages: {available}")]
    PackageNotFound { name: String, available: String },

    #[error("Circular dependency detected among: {members}")]
    CircularDependency { members: String },

    #[error("Registry unavailable: {message}")]
    Registry { message: String },

    #[error(
        "Version conflict for {package} {version}: the registry already holds this version with \
         different content"
    )]
    VersionConflict { package: String, version: String },

    #[error(
        "Package {package} version {local} is older than the latest published version {published}"
    )]
    OutdatedVersion {
        package: String,
        local: String,
        published: String,
    },

    #[error("Package {package} changed on disk but its version was not bumped")]
    UnversionedChange { package: String },

    #[error("Build failed for {package}: {message}")]
    Build { package: String, message: String },

    #[error("Install failed for {package}: {message}")]
    Install { package: String, message: String },

    #[error("Publish failed for {package}: {message}")]
    Publish { package: String, message: String },

    #[error("Snapshot store error: {0}")]
    Snapshot(String),
}

impl Error {
    /// Whether the caller may retry the whole command and expect a different
    /// outcome. Only transport-level registry failures qualify; everything
    /// else reflects the state of the workspace itself.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Registry { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;
