//! Boundary to the external package manager.
//!
//! Dependency resolution and fetching are left to `npm`, which runs as a
//! child process. The installer waits for each run to finish before moving on.

use anyhow::{Context, Result};
use async_trait::async_trait;
use log::{debug, info};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;

use crate::error::WorkspaceError;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PackageManager: Send + Sync {
    /// Run `install` in `dir` for the given package arguments.
    async fn install(&self, dir: &Path, packages: &[String]) -> Result<()>;

    /// Major version of the package manager, if it can be determined.
    async fn major_version(&self) -> Result<Option<u32>>;
}

/// `npm` found on the system path (or at an explicit location)
pub struct Npm {
    program: PathBuf,
    verbose: bool,
}

impl Npm {
    pub fn new(program: impl Into<PathBuf>, verbose: bool) -> Self {
        Self {
            program: program.into(),
            verbose,
        }
    }

    fn install_args(packages: &[String]) -> Vec<String> {
        let mut args = vec!["install".to_string(), "--no-save".to_string()];
        args.extend(packages.iter().cloned());
        args
    }
}

#[async_trait]
impl PackageManager for Npm {
    #[tracing::instrument(skip(self))]
    async fn install(&self, dir: &Path, packages: &[String]) -> Result<()> {
        let args = Self::install_args(packages);
        let command_line = format!("{} {}", self.program.display(), args.join(" "));
        info!("Running `{}` in {:?}", command_line, dir);

        let mut command = Command::new(&self.program);
        command.args(&args).current_dir(dir).stdin(Stdio::null());

        // In verbose mode the child writes straight to our terminal.
        let status = if self.verbose {
            command
                .status()
                .await
                .with_context(|| format!("Failed to run {}", self.program.display()))?
        } else {
            let output = command
                .output()
                .await
                .with_context(|| format!("Failed to run {}", self.program.display()))?;
            debug!("{}", String::from_utf8_lossy(&output.stdout));
            if !output.status.success() {
                eprint!("{}", String::from_utf8_lossy(&output.stderr));
            }
            output.status
        };

        if !status.success() {
            return Err(WorkspaceError::Install {
                module: dir.to_path_buf(),
                command: command_line,
                code: status.code(),
            }
            .into());
        }
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn major_version(&self) -> Result<Option<u32>> {
        let output = match Command::new(&self.program)
            .arg("--version")
            .stdin(Stdio::null())
            .output()
            .await
        {
            Ok(output) if output.status.success() => output,
            Ok(output) => {
                debug!("{:?} --version exited with {}", self.program, output.status);
                return Ok(None);
            }
            Err(e) => {
                debug!("Failed to run {:?} --version: {}", self.program, e);
                return Ok(None);
            }
        };
        Ok(parse_major_version(&String::from_utf8_lossy(&output.stdout)))
    }
}

/// Parse the major component of a version string such as `10.2.4` or `v6.14.0`.
pub fn parse_major_version(version: &str) -> Option<u32> {
    let version = version.trim();
    let version = version.strip_prefix('v').unwrap_or(version);
    version.split('.').next()?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_major_version() {
        assert_eq!(parse_major_version("10.2.4\n"), Some(10));
        assert_eq!(parse_major_version("v2.15.12"), Some(2));
        assert_eq!(parse_major_version(""), None);
        assert_eq!(parse_major_version("not-a-version"), None);
    }

    #[test]
    fn test_install_args() {
        assert_eq!(
            Npm::install_args(&["lodash@^4.0.0".to_string()]),
            vec!["install", "--no-save", "lodash@^4.0.0"]
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_failed_install_reports_exit_code() {
        let dir = tempfile::tempdir().unwrap();
        let npm = Npm::new("false", false);

        let err = npm.install(dir.path(), &[]).await.unwrap_err();
        match err.downcast_ref::<WorkspaceError>() {
            Some(WorkspaceError::Install { module, code, .. }) => {
                assert_eq!(module, dir.path());
                assert_eq!(*code, Some(1));
            }
            other => panic!("Expected Install error, got {:?}", other),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_successful_install_and_unknown_version() {
        let dir = tempfile::tempdir().unwrap();
        let npm = Npm::new("true", false);

        npm.install(dir.path(), &["prj2@1.0.0".to_string()])
            .await
            .unwrap();
        assert_eq!(npm.major_version().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_missing_program_has_no_version() {
        let npm = Npm::new("/nonexistent/npm", false);
        assert_eq!(npm.major_version().await.unwrap(), None);
    }
}
