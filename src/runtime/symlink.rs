//! Symlink operations (create, read, resolve, remove).

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use super::RealRuntime;
use super::path::normalize_path;

impl RealRuntime {
    #[tracing::instrument(skip(self))]
    pub(crate) fn symlink_impl(&self, original: &Path, link: &Path) -> Result<()> {
        #[cfg(unix)]
        {
            std::os::unix::fs::symlink(original, link).with_context(|| {
                format!(
                    "Failed to create symlink {} -> {}",
                    link.display(),
                    original.display()
                )
            })?;
        }
        #[cfg(windows)]
        {
            // Linked modules are always directories.
            std::os::windows::fs::symlink_dir(original, link).with_context(|| {
                format!(
                    "Failed to create directory symlink {} -> {}",
                    link.display(),
                    original.display()
                )
            })?;
        }
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    pub(crate) fn read_link_impl(&self, path: &Path) -> Result<PathBuf> {
        fs::read_link(path).with_context(|| format!("Failed to read symlink {}", path.display()))
    }

    #[tracing::instrument(skip(self))]
    pub(crate) fn resolve_link_impl(&self, path: &Path) -> Result<PathBuf> {
        let target = self.read_link_impl(path)?;
        if target.is_absolute() {
            Ok(target)
        } else {
            let parent = path
                .parent()
                .context("Failed to get parent directory of symlink")?;
            Ok(normalize_path(&parent.join(&target)))
        }
    }

    #[tracing::instrument(skip(self))]
    pub(crate) fn canonicalize_impl(&self, path: &Path) -> Result<PathBuf> {
        fs::canonicalize(path)
            .with_context(|| format!("Failed to canonicalize {}", path.display()))
    }

    #[tracing::instrument(skip(self))]
    pub(crate) fn is_symlink_impl(&self, path: &Path) -> bool {
        fs::symlink_metadata(path)
            .map(|m| m.file_type().is_symlink())
            .unwrap_or(false)
    }

    #[tracing::instrument(skip(self))]
    pub(crate) fn remove_symlink_impl(&self, path: &Path) -> Result<()> {
        #[cfg(unix)]
        {
            fs::remove_file(path)
                .with_context(|| format!("Failed to remove symlink {}", path.display()))?;
        }
        #[cfg(windows)]
        {
            // Directory symlinks need remove_dir on Windows.
            fs::remove_dir(path)
                .or_else(|_| fs::remove_file(path))
                .with_context(|| format!("Failed to remove symlink {}", path.display()))?;
        }
        Ok(())
    }
}

#[cfg(all(test, unix))]
mod tests {
    use crate::runtime::{RealRuntime, Runtime};
    use std::path::Path;
    use tempfile::tempdir;

    #[test]
    fn test_real_runtime_symlink_ops() {
        let runtime = RealRuntime;
        let dir = tempdir().unwrap();
        let target = dir.path().join("prj2");
        runtime.create_dir_all(&target).unwrap();

        let link = dir.path().join("link");
        runtime.symlink(&target, &link).unwrap();
        assert!(runtime.is_symlink(&link));
        assert!(!runtime.is_symlink(&target));
        assert_eq!(runtime.read_link(&link).unwrap(), target);

        let canonical = runtime.canonicalize(&link).unwrap();
        assert!(canonical.ends_with("prj2"));

        runtime.remove_symlink(&link).unwrap();
        assert!(!runtime.exists(&link));
        assert!(runtime.is_dir(&target));
    }

    #[test]
    fn test_resolve_link_relative_target() {
        let runtime = RealRuntime;
        let dir = tempdir().unwrap();
        let store = dir.path().join("prj1/node_modules");
        runtime.create_dir_all(&store).unwrap();
        runtime.create_dir_all(&dir.path().join("prj2")).unwrap();

        let link = store.join("prj2");
        runtime.symlink(Path::new("../../prj2"), &link).unwrap();

        assert_eq!(runtime.resolve_link(&link).unwrap(), dir.path().join("prj2"));
    }

    #[test]
    fn test_is_symlink_false_for_missing_path() {
        let runtime = RealRuntime;
        assert!(!runtime.is_symlink(Path::new("/nonexistent/link")));
    }
}
