//! External build and install actions.
//!
//! The orchestrators never know how a package is actually built or
//! installed; they call these traits. The default implementations shell out
//! to user-configured command templates.

use std::fs;
use std::path::Path;
use std::process::Command;

use tracing::debug;

use crate::error::{Error, Result};
use crate::package::Package;

/// Flags threaded through a build/install run.
#[derive(Debug, Clone, Copy, Default)]
pub struct ActionOptions {
    pub include_dev: bool,
    pub editable: bool,
    pub verbose: bool,
}

/// Builds one package and returns the distribution payload.
pub trait BuildAction: Send + Sync {
    fn build(&self, pkg: &Package, dir: &Path, opts: &ActionOptions) -> Result<Vec<u8>>;
}

/// Installs one package into the current environment.
pub trait InstallAction: Send + Sync {
    fn install(&self, pkg: &Package, dir: &Path, opts: &ActionOptions) -> Result<()>;

    /// Whether the package is already linked into the environment in
    /// editable mode; used for the editable short-circuit.
    fn is_linked(&self, _pkg: &Package, _dir: &Path) -> bool {
        false
    }
}

/// Expands `{name}`, `{version}`, and `{path}` placeholders.
fn render(template: &str, pkg: &Package) -> String {
    template
        .replace("{name}", &pkg.name)
        .replace("{version}", &pkg.version.to_string())
        .replace("{path}", &pkg.path.to_string_lossy())
}

fn run_command(command: &str, dir: &Path, package: &str, verbose: bool) -> Result<()> {
    debug!(package, command, "run");
    let mut cmd = Command::new("sh");
    cmd.arg("-c").arg(command).current_dir(dir);

    if verbose {
        let status = cmd.status().map_err(|e| Error::Build {
            package: package.to_string(),
            message: format!("failed to spawn '{}': {}", command, e),
        })?;
        if !status.success() {
            return Err(Error::Build {
                package: package.to_string(),
                message: format!("'{}' exited with {}", command, status),
            });
        }
    } else {
        let output = cmd.output().map_err(|e| Error::Build {
            package: package.to_string(),
            message: format!("failed to spawn '{}': {}", command, e),
        })?;
        if !output.status.success() {
            return Err(Error::Build {
                package: package.to_string(),
                message: format!(
                    "'{}' exited with {}: {}",
                    command,
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            });
        }
    }
    Ok(())
}

/// Build action that runs a configured command and picks up the artifact it
/// leaves behind.
pub struct CommandBuildAction {
    command: String,
    artifact_path: String,
}

impl CommandBuildAction {
    pub fn new(command: impl Into<String>, artifact_path: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            artifact_path: artifact_path.into(),
        }
    }
}

impl BuildAction for CommandBuildAction {
    fn build(&self, pkg: &Package, dir: &Path, opts: &ActionOptions) -> Result<Vec<u8>> {
        run_command(&render(&self.command, pkg), dir, &pkg.name, opts.verbose)?;
        let artifact = dir.join(render(&self.artifact_path, pkg));
        fs::read(&artifact).map_err(|e| Error::Build {
            package: pkg.name.clone(),
            message: format!("expected artifact {}: {}", artifact.display(), e),
        })
    }
}

/// Install action backed by configured commands. A separate editable
/// command covers link-style installs; an optional probe command (exit
/// status zero means linked) drives the editable short-circuit.
pub struct CommandInstallAction {
    command: String,
    editable_command: Option<String>,
    probe: Option<String>,
}

impl CommandInstallAction {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            editable_command: None,
            probe: None,
        }
    }

    pub fn with_editable_command(mut self, command: impl Into<String>) -> Self {
        self.editable_command = Some(command.into());
        self
    }

    pub fn with_probe(mut self, command: impl Into<String>) -> Self {
        self.probe = Some(command.into());
        self
    }
}

impl InstallAction for CommandInstallAction {
    fn install(&self, pkg: &Package, dir: &Path, opts: &ActionOptions) -> Result<()> {
        let template = if opts.editable {
            self.editable_command.as_deref().unwrap_or(&self.command)
        } else {
            &self.command
        };
        run_command(&render(template, pkg), dir, &pkg.name, opts.verbose).map_err(|e| {
            match e {
                Error::Build { package, message } => Error::Install { package, message },
                other => other,
            }
        })
    }

    fn is_linked(&self, pkg: &Package, dir: &Path) -> bool {
        let Some(probe) = &self.probe else {
            return false;
        };
        Command::new("sh")
            .arg("-c")
            .arg(render(probe, pkg))
            .current_dir(dir)
            .output()
            .map(|out| out.status.success())
            .unwrap_or(false)
    }
}
