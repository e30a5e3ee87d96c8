//! Workspace traversal
//!
//! Enumerates the directories under a workspace root that are candidates for
//! their own install (or clean) call.

use anyhow::Result;
use std::path::{Path, PathBuf};

use crate::descriptor::{PACKAGE_DESCRIPTOR, WORKSPACE_DESCRIPTOR};
use crate::runtime::Runtime;

/// Dependency store maintained for every module.
pub const DEPENDENCY_STORE: &str = "node_modules";

/// Directory names never visited by the walker.
const EXCLUDED_DIRS: &[&str] = &[DEPENDENCY_STORE, "bower_components"];

fn is_candidate_name(path: &Path) -> bool {
    match path.file_name().and_then(|n| n.to_str()) {
        Some(name) => !name.starts_with('.') && !EXCLUDED_DIRS.contains(&name),
        None => false,
    }
}

fn candidates<R: Runtime>(runtime: &R, dir: &Path) -> Result<Vec<PathBuf>> {
    Ok(runtime
        .read_dir(dir)?
        .into_iter()
        .filter(|p| is_candidate_name(p) && runtime.is_dir(p))
        .collect())
}

fn holds_descriptor<R: Runtime>(runtime: &R, dir: &Path) -> bool {
    runtime.exists(&dir.join(WORKSPACE_DESCRIPTOR)) || runtime.exists(&dir.join(PACKAGE_DESCRIPTOR))
}

/// List the subdirectories of `dir` to install, sorted by path.
///
/// With `recursive`, the walk continues (pre-order) into every candidate that
/// is neither a module nor a nested workspace; those get their own install
/// call, which enumerates their children itself. Symlinked directories are
/// listed but never descended into.
#[tracing::instrument(skip(runtime))]
pub fn list_installable_children<R: Runtime>(
    runtime: &R,
    dir: &Path,
    recursive: bool,
) -> Result<Vec<PathBuf>> {
    let mut result = Vec::new();
    let mut stack: Vec<PathBuf> = candidates(runtime, dir)?.into_iter().rev().collect();

    while let Some(child) = stack.pop() {
        if recursive && !runtime.is_symlink(&child) && !holds_descriptor(runtime, &child) {
            stack.extend(candidates(runtime, &child)?.into_iter().rev());
        }
        result.push(child);
    }

    Ok(result)
}
