//! Workspace and package descriptors
//!
//! `workspace.json` maps dependency names to local directories (`links`) and
//! to alternate sources (`repos`). `package.json` is the module manifest and
//! is only ever read.

mod package;
mod workspace;

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use std::path::Path;

use crate::error::WorkspaceError;
use crate::runtime::Runtime;

pub use package::{PackageDescriptor, find_package_descriptor, load_package_descriptor};
pub use workspace::{WorkspaceDescriptor, find_workspace_descriptor, load_workspace_descriptor};

pub const WORKSPACE_DESCRIPTOR: &str = "workspace.json";
pub const PACKAGE_DESCRIPTOR: &str = "package.json";

/// How far to look for a workspace descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup {
    /// Only the given directory.
    Shallow,
    /// The given directory, then each ancestor up to the filesystem root.
    Ancestors,
}

/// Read and parse a JSON descriptor. Parse failures become
/// [`WorkspaceError::InvalidDescriptor`].
fn read_json<R: Runtime, T: DeserializeOwned>(runtime: &R, path: &Path) -> Result<T> {
    let content = runtime
        .read_to_string(path)
        .with_context(|| format!("Failed to read descriptor {}", path.display()))?;
    serde_json::from_str(&content).map_err(|e| {
        WorkspaceError::InvalidDescriptor {
            path: path.to_path_buf(),
            message: e.to_string(),
        }
        .into()
    })
}
