//! Error taxonomy for workspace operations.
//!
//! Filesystem failures travel as plain `anyhow` errors with context attached
//! by the caller. The variants here are the failures callers need to tell
//! apart: configuration problems and a failed package-manager run.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum WorkspaceError {
    /// No `workspace.json` in the directory or any of its ancestors.
    #[error("workspace descriptor not found (searched from {})", .dir.display())]
    WorkspaceDescriptorNotFound { dir: PathBuf },

    /// No `package.json` in the module directory.
    #[error("package descriptor not found in {}", .dir.display())]
    PackageDescriptorNotFound { dir: PathBuf },

    /// A descriptor exists but cannot be parsed.
    #[error("invalid descriptor {}: {message}", .path.display())]
    InvalidDescriptor { path: PathBuf, message: String },

    /// The external package manager exited unsuccessfully.
    #[error("`{command}` failed in {} ({})", .module.display(), describe_code(.code))]
    Install {
        module: PathBuf,
        command: String,
        code: Option<i32>,
    },
}

impl WorkspaceError {
    /// True for missing or unreadable descriptors.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::WorkspaceDescriptorNotFound { .. }
                | Self::PackageDescriptorNotFound { .. }
                | Self::InvalidDescriptor { .. }
        )
    }
}

fn describe_code(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {}", code),
        None => "terminated by signal".to_string(),
    }
}

/// Map an error chain to a process exit code.
///
/// A failed package-manager run surfaces its own exit code; configuration
/// errors use 2 and everything else 1.
pub fn exit_code(err: &anyhow::Error) -> i32 {
    match err.chain().find_map(|e| e.downcast_ref::<WorkspaceError>()) {
        Some(WorkspaceError::Install {
            code: Some(code), ..
        }) if *code != 0 => *code,
        Some(e) if e.is_configuration() => 2,
        _ => 1,
    }
}
