//! Removal of generated dependency stores.

use anyhow::Result;
use log::{debug, warn};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::descriptor::{Lookup, PACKAGE_DESCRIPTOR, find_workspace_descriptor};
use crate::error::WorkspaceError;
use crate::runtime::{Runtime, path::path_depth};
use crate::walker::DEPENDENCY_STORE;

/// Modules to clean under `dir`: the members named in workspace `links`
/// (expanded through nested workspaces) and `dir` itself if it is a module.
///
/// Returns `None` if `dir` is neither a workspace root nor a module.
fn collect_modules<R: Runtime>(runtime: &R, dir: &Path) -> Result<Option<Vec<PathBuf>>> {
    let mut seen = HashSet::new();
    let mut modules = Vec::new();
    let mut stack = vec![dir.to_path_buf()];
    let mut recognized = false;

    while let Some(current) = stack.pop() {
        let key = runtime
            .canonicalize(&current)
            .unwrap_or_else(|_| current.clone());
        if !seen.insert(key) {
            continue;
        }

        let is_root = current == dir;
        if let Some(workspace) = find_workspace_descriptor(runtime, &current, Lookup::Shallow)? {
            recognized |= is_root;
            for member in workspace.links.into_values() {
                if runtime.is_dir(&member) {
                    stack.push(member);
                } else {
                    warn!("Workspace member {:?} does not exist, skipping", member);
                }
            }
        }
        if runtime.exists(&current.join(PACKAGE_DESCRIPTOR)) {
            recognized |= is_root;
            modules.push(current);
        }
    }

    if !recognized {
        return Ok(None);
    }
    // Deepest first; equal depths in path order
    modules.sort_by(|a, b| path_depth(b).cmp(&path_depth(a)).then_with(|| a.cmp(b)));
    Ok(Some(modules))
}

fn remove_store<R: Runtime>(runtime: &R, module: &Path) -> Result<bool> {
    let store = module.join(DEPENDENCY_STORE);
    if runtime.is_symlink(&store) {
        runtime.remove_symlink(&store)?;
    } else if runtime.is_dir(&store) {
        runtime.remove_dir_all(&store)?;
    } else {
        debug!("{:?} has no {}", module, DEPENDENCY_STORE);
        return Ok(false);
    }
    println!("Removed {}", store.display());
    Ok(true)
}

/// Remove the dependency store of `dir` and of every workspace member it
/// links to. Returns the removed store directories.
#[tracing::instrument(skip(runtime))]
pub fn clean<R: Runtime>(runtime: &R, dir: &Path) -> Result<Vec<PathBuf>> {
    let Some(modules) = collect_modules(runtime, dir)? else {
        return Err(WorkspaceError::PackageDescriptorNotFound {
            dir: dir.to_path_buf(),
        }
        .into());
    };

    let mut removed = Vec::new();
    for module in modules {
        if remove_store(runtime, &module)? {
            removed.push(module.join(DEPENDENCY_STORE));
        }
    }
    Ok(removed)
}
