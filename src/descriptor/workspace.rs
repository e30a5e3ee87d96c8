use anyhow::Result;
use log::debug;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use super::{Lookup, WORKSPACE_DESCRIPTOR, read_json};
use crate::error::WorkspaceError;
use crate::runtime::{Runtime, normalize_path};

/// `workspace.json` as written on disk
#[derive(Deserialize, Debug, Default)]
struct RawWorkspaceDescriptor {
    #[serde(default)]
    links: BTreeMap<String, String>,
    #[serde(default)]
    repos: BTreeMap<String, String>,
}

/// Normalized workspace descriptor
#[derive(Debug, Clone, PartialEq, Default)]
pub struct WorkspaceDescriptor {
    /// Directory holding the `workspace.json` this was loaded from
    pub dir: PathBuf,
    /// Dependency name -> absolute module directory
    pub links: BTreeMap<String, PathBuf>,
    /// Dependency name -> alternate source, passed to the package manager as is
    pub repos: BTreeMap<String, String>,
}

impl WorkspaceDescriptor {
    /// Read `workspace.json` from `dir` and resolve its links against `dir`.
    pub fn load<R: Runtime>(runtime: &R, dir: &Path) -> Result<Self> {
        let raw: RawWorkspaceDescriptor = read_json(runtime, &dir.join(WORKSPACE_DESCRIPTOR))?;
        Ok(Self::normalize(dir, raw))
    }

    fn normalize(dir: &Path, raw: RawWorkspaceDescriptor) -> Self {
        let links = raw
            .links
            .into_iter()
            .map(|(name, target)| (name, normalize_path(&dir.join(target))))
            .collect();
        Self {
            dir: dir.to_path_buf(),
            links,
            repos: raw.repos,
        }
    }

    pub fn link(&self, name: &str) -> Option<&Path> {
        self.links.get(name).map(PathBuf::as_path)
    }

    pub fn repo(&self, name: &str) -> Option<&str> {
        self.repos.get(name).map(String::as_str)
    }
}

/// Look for `workspace.json` in `dir` (and its ancestors for [`Lookup::Ancestors`]).
///
/// Returns `Ok(None)` when no descriptor is found.
#[tracing::instrument(skip(runtime))]
pub fn find_workspace_descriptor<R: Runtime>(
    runtime: &R,
    dir: &Path,
    lookup: Lookup,
) -> Result<Option<WorkspaceDescriptor>> {
    let mut current = Some(dir);
    while let Some(candidate) = current {
        if runtime.exists(&candidate.join(WORKSPACE_DESCRIPTOR)) {
            debug!("Found workspace descriptor in {:?}", candidate);
            return WorkspaceDescriptor::load(runtime, candidate).map(Some);
        }
        if lookup == Lookup::Shallow {
            break;
        }
        current = candidate.parent();
    }
    Ok(None)
}

/// Like [`find_workspace_descriptor`], but a missing descriptor is an error.
pub fn load_workspace_descriptor<R: Runtime>(
    runtime: &R,
    dir: &Path,
    lookup: Lookup,
) -> Result<WorkspaceDescriptor> {
    find_workspace_descriptor(runtime, dir, lookup)?.ok_or_else(|| {
        WorkspaceError::WorkspaceDescriptorNotFound {
            dir: dir.to_path_buf(),
        }
        .into()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::MockRuntime;
    use mockall::predicate::eq;

    #[test]
    fn test_load_resolves_links_against_descriptor_dir() {
        let mut runtime = MockRuntime::new();
        let dir = PathBuf::from("/ws/prj1");

        runtime
            .expect_read_to_string()
            .with(eq(dir.join("workspace.json")))
            .returning(|_| {
                Ok(r#"{
                    "links": { "prj2": "../prj2", "abs": "/opt/abs", "here": "./lib" },
                    "repos": { "forked": "git+https://example.com/forked.git" }
                }"#
                .to_string())
            });

        let descriptor = WorkspaceDescriptor::load(&runtime, &dir).unwrap();
        assert_eq!(descriptor.dir, dir);
        assert_eq!(descriptor.link("prj2"), Some(Path::new("/ws/prj2")));
        assert_eq!(descriptor.link("abs"), Some(Path::new("/opt/abs")));
        assert_eq!(descriptor.link("here"), Some(Path::new("/ws/prj1/lib")));
        assert_eq!(
            descriptor.repo("forked"),
            Some("git+https://example.com/forked.git")
        );
    }

    #[test]
    fn test_load_missing_sections_default_to_empty() {
        let mut runtime = MockRuntime::new();
        runtime
            .expect_read_to_string()
            .returning(|_| Ok("{}".to_string()));

        let descriptor = WorkspaceDescriptor::load(&runtime, Path::new("/ws")).unwrap();
        assert!(descriptor.links.is_empty());
        assert!(descriptor.repos.is_empty());
    }

    #[test]
    fn test_find_climbs_to_ancestor() {
        let mut runtime = MockRuntime::new();
        runtime
            .expect_exists()
            .returning(|p| p == Path::new("/ws/workspace.json"));
        runtime
            .expect_read_to_string()
            .with(eq(PathBuf::from("/ws/workspace.json")))
            .returning(|_| Ok(r#"{ "links": { "prj2": "prj2" } }"#.to_string()));

        let descriptor =
            find_workspace_descriptor(&runtime, Path::new("/ws/group/prj1"), Lookup::Ancestors)
                .unwrap()
                .unwrap();
        assert_eq!(descriptor.dir, PathBuf::from("/ws"));
        assert_eq!(descriptor.link("prj2"), Some(Path::new("/ws/prj2")));
    }

    #[test]
    fn test_find_shallow_does_not_climb() {
        let mut runtime = MockRuntime::new();
        runtime
            .expect_exists()
            .with(eq(PathBuf::from("/ws/prj1/workspace.json")))
            .times(1)
            .returning(|_| false);

        let found =
            find_workspace_descriptor(&runtime, Path::new("/ws/prj1"), Lookup::Shallow).unwrap();
        assert!(found.is_none());
    }

    #[test]
    fn test_load_missing_is_configuration_error() {
        let mut runtime = MockRuntime::new();
        runtime.expect_exists().returning(|_| false);

        let err =
            load_workspace_descriptor(&runtime, Path::new("/ws/prj1"), Lookup::Ancestors)
                .unwrap_err();
        let err = err.downcast_ref::<WorkspaceError>().unwrap();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("workspace descriptor not found"));
    }

    #[test]
    fn test_invalid_json_is_reported_with_path() {
        let mut runtime = MockRuntime::new();
        runtime.expect_exists().returning(|_| true);
        runtime
            .expect_read_to_string()
            .returning(|_| Ok("{ links: ".to_string()));

        let err = find_workspace_descriptor(&runtime, Path::new("/ws"), Lookup::Shallow)
            .unwrap_err();
        match err.downcast_ref::<WorkspaceError>() {
            Some(WorkspaceError::InvalidDescriptor { path, .. }) => {
                assert_eq!(path, Path::new("/ws/workspace.json"));
            }
            other => panic!("Expected InvalidDescriptor, got {:?}", other),
        }
    }
}
