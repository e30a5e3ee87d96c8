//! Placeholders, symlinks and copies of linked modules.

use anyhow::{Context, Result, bail};
use log::{debug, warn};
use std::path::{Path, PathBuf};

use super::{Installer, StubManifest};
use crate::classify::{DependencyKind, DependencySpec};
use crate::descriptor::PACKAGE_DESCRIPTOR;
use crate::install::InstallSession;
use crate::link_target::compute_relative_link_target;
use crate::package_manager::PackageManager;
use crate::runtime::{Runtime, relative_path_from_dir};
use crate::walker::DEPENDENCY_STORE;

/// Present in placeholder directories and in copies that are not finished.
pub const STUB_MARKER: &str = ".npm-workspace-stub";

const VCS_DIRS: &[&str] = &[".git", ".hg", ".svn"];

/// What currently occupies a linked dependency's destination
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Destination {
    Missing,
    /// Placeholder or unfinished copy
    Stub,
    Symlink,
    /// A directory (or file) this tool did not leave unfinished
    Real,
}

pub(crate) fn inspect<R: Runtime>(runtime: &R, destination: &Path) -> Destination {
    if runtime.is_symlink(destination) {
        Destination::Symlink
    } else if runtime.is_dir(destination) {
        if runtime.exists(&destination.join(STUB_MARKER)) {
            Destination::Stub
        } else {
            Destination::Real
        }
    } else if runtime.exists(destination) {
        Destination::Real
    } else {
        Destination::Missing
    }
}

fn linked_source(spec: &DependencySpec) -> Result<&Path> {
    match &spec.kind {
        DependencyKind::Linked { source } => Ok(source.as_path()),
        other => bail!("{} is not a linked dependency ({:?})", spec.name, other),
    }
}

impl<R: Runtime, P: PackageManager> Installer<'_, R, P> {
    /// Phase A: put a placeholder where a linked module will go.
    pub(crate) async fn stub_linked(&self, spec: &DependencySpec) -> Result<()> {
        if inspect(self.runtime, &spec.destination) != Destination::Missing {
            return Ok(());
        }
        let source = linked_source(spec)?;
        let manifest = match self.stub_manifest().await? {
            StubManifest::Empty => "{}".to_string(),
            StubManifest::Full => self
                .runtime
                .read_to_string(&source.join(PACKAGE_DESCRIPTOR))
                .with_context(|| format!("Failed to read manifest of linked module {}", spec.name))?,
        };

        debug!("Creating placeholder {:?}", spec.destination);
        self.runtime.create_dir_all(&spec.destination)?;
        self.runtime
            .write(&spec.destination.join(PACKAGE_DESCRIPTOR), manifest.as_bytes())?;
        self.runtime.write(&spec.destination.join(STUB_MARKER), b"")?;
        Ok(())
    }

    /// Phase C: replace the placeholder with the real link or copy.
    ///
    /// Returns the destination if the linked module should be installed next.
    pub(crate) fn materialize_linked(
        &self,
        spec: &DependencySpec,
        session: &mut InstallSession,
    ) -> Result<Option<PathBuf>> {
        let source = linked_source(spec)?;
        let destination = &spec.destination;
        if !self.runtime.is_dir(source) {
            bail!(
                "Linked module {} maps to {}, which is not a directory",
                spec.name,
                source.display()
            );
        }

        let state = inspect(self.runtime, destination);
        if self.options.copy {
            match state {
                Destination::Real => debug!("{:?} already copied", destination),
                Destination::Symlink => self.runtime.remove_symlink(destination)?,
                Destination::Stub => self.runtime.remove_dir_all(destination)?,
                Destination::Missing => {}
            }
            if state != Destination::Real {
                self.copy_module(source, destination)
                    .with_context(|| format!("Failed to copy linked module {}", spec.name))?;
                println!("Copied {} -> {}", source.display(), destination.display());
            }

            // Each copy has its own path, so cycles are cut on the source
            let canonical_source = self.runtime.canonicalize(source)?;
            if !session.enter_copy_source(canonical_source) {
                debug!(
                    "{} from {:?} already installed in this session",
                    spec.name, source
                );
                return Ok(None);
            }
            return Ok(Some(destination.clone()));
        }

        match state {
            Destination::Real => {
                warn!(
                    "{:?} is already installed and not a link, leaving it in place",
                    destination
                );
                return Ok(None);
            }
            Destination::Symlink => {
                if self.points_to(destination, source) {
                    debug!("{:?} already links to {:?}", destination, source);
                    return Ok(Some(destination.clone()));
                }
                self.runtime.remove_symlink(destination)?;
            }
            Destination::Stub => self.runtime.remove_dir_all(destination)?,
            Destination::Missing => {
                if let Some(parent) = destination.parent() {
                    self.runtime.create_dir_all(parent)?;
                }
            }
        }

        let target = if self.options.relative_links {
            compute_relative_link_target(destination, source, session)
                .unwrap_or_else(|| source.to_path_buf())
        } else {
            source.to_path_buf()
        };
        self.runtime
            .symlink(&target, destination)
            .with_context(|| format!("Failed to link {}", spec.name))?;
        println!("Linked {} -> {}", destination.display(), target.display());
        Ok(Some(destination.clone()))
    }

    fn points_to(&self, link: &Path, source: &Path) -> bool {
        match (
            self.runtime.canonicalize(link),
            self.runtime.canonicalize(source),
        ) {
            (Ok(a), Ok(b)) => a == b,
            _ => false,
        }
    }

    /// Copy `source` to `destination`, marked unfinished until the copy completes.
    fn copy_module(&self, source: &Path, destination: &Path) -> Result<()> {
        self.runtime.create_dir_all(destination)?;
        let marker = destination.join(STUB_MARKER);
        self.runtime.write(&marker, b"")?;
        self.copy_tree(source, destination)?;
        self.runtime.remove_file(&marker)?;
        Ok(())
    }

    fn skip_when_copying(&self, name: &str) -> bool {
        name == STUB_MARKER
            || (self.options.strip_vcs && VCS_DIRS.contains(&name))
            || (self.options.production && name == DEPENDENCY_STORE)
    }

    fn copy_tree(&self, source: &Path, destination: &Path) -> Result<()> {
        // A destination inside its own source is left out of the copy
        let nested_destination = match (
            self.runtime.canonicalize(source),
            self.runtime.canonicalize(destination),
        ) {
            (Ok(from), Ok(to)) if to.starts_with(&from) => Some(to),
            _ => None,
        };

        let mut stack = vec![(source.to_path_buf(), destination.to_path_buf())];
        while let Some((from_dir, to_dir)) = stack.pop() {
            for from in self.runtime.read_dir(&from_dir)? {
                let Some(name) = from.file_name() else {
                    continue;
                };
                if self.skip_when_copying(&name.to_string_lossy()) {
                    continue;
                }
                let to = to_dir.join(name);
                if self.runtime.is_symlink(&from) {
                    let target = self.copied_link_target(source, &from, &to)?;
                    self.runtime.symlink(&target, &to)?;
                } else if self.runtime.is_dir(&from) {
                    if let Some(nested) = &nested_destination
                        && self.runtime.canonicalize(&from).ok().as_ref() == Some(nested)
                    {
                        debug!("Not copying {:?} into itself", from);
                        continue;
                    }
                    self.runtime.create_dir_all(&to)?;
                    stack.push((from, to));
                } else {
                    self.runtime.copy(&from, &to)?;
                }
            }
        }
        Ok(())
    }

    /// Target for the copy `to` of the symlink `link` found under `source`.
    ///
    /// Relative links staying inside `source` are kept as they are; links
    /// leaving it are re-pointed at what they resolve to from the original.
    fn copied_link_target(&self, source: &Path, link: &Path, to: &Path) -> Result<PathBuf> {
        let target = self.runtime.read_link(link)?;
        if target.is_absolute() {
            return Ok(target);
        }
        let resolved = self.runtime.resolve_link(link)?;
        if resolved.starts_with(source) {
            return Ok(target);
        }
        if self.options.relative_links
            && let Some(relative) = to
                .parent()
                .and_then(|parent| relative_path_from_dir(parent, &resolved))
        {
            return Ok(relative);
        }
        Ok(resolved)
    }
}
