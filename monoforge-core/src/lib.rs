//! Core library for monorepo package build and publish orchestration.

pub mod actions;
pub mod config;
pub mod error;
pub mod fingerprint;
pub mod graph;
pub mod manifest;
pub mod orchestrator;
pub mod package;
pub mod propagate;
pub mod publish;
pub mod registry;
pub mod scanner;
pub mod snapshot;
pub mod state;

pub use actions::{ActionOptions, BuildAction, CommandBuildAction, CommandInstallAction, InstallAction};
pub use config::{Commands, WorkspaceConfig};
pub use error::{Error, Result};
pub use graph::PackageGraph;
pub use manifest::{ManifestReader, ManifestWriter, TomlManifest, MANIFEST_FILE};
pub use orchestrator::{BuildOrchestrator, Outcome, RunReport};
pub use package::{Dependency, Package};
pub use propagate::{BumpType, PropagationPlan, VersionPropagator};
pub use publish::{PublishOrchestrator, PublishOutcome, PublishReport};
pub use registry::{Artifact, FsRegistry, MemoryRegistry, RegistryClient};
pub use scanner::Scanner;
pub use snapshot::{SnapshotStore, StateSnapshot};
pub use state::{PackageState, StateDetector, StateReport, Strictness};
