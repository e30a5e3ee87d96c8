//! Workspace installation.
//!
//! A module is installed in phases:
//!
//! - A: linked dependencies that are not on disk yet get a placeholder
//!   directory, so the package manager treats them as present
//! - B: the package manager installs plain and alternate-source dependencies
//! - C: placeholders are replaced by symlinks (or copies) of the local modules
//! - D: each linked module is installed in turn
//!
//! Unless running in production mode, the peer dependencies of linked modules
//! that are themselves linked are then added at the current module's level,
//! repeating until no new names appear.

mod materialize;
mod options;
mod session;

use anyhow::{Context, Result};
use log::{debug, info, warn};
use std::collections::{BTreeMap, BTreeSet};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use tokio::sync::OnceCell;

use crate::classify::{ClassifiedDependencies, DependencySpec, classify};
use crate::descriptor::{
    Lookup, PackageDescriptor, WorkspaceDescriptor, find_package_descriptor,
    find_workspace_descriptor, load_workspace_descriptor,
};
use crate::error::WorkspaceError;
use crate::package_manager::PackageManager;
use crate::runtime::Runtime;
use crate::walker::{DEPENDENCY_STORE, list_installable_children};

pub use materialize::STUB_MARKER;
pub use options::{InstallOptions, StubManifest, StubManifestMode};
pub use session::{InstallSession, ModuleVisit};

/// Outcome of [`Installer::install_module`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visit {
    Installed,
    /// The canonical path was already installed in this session.
    AlreadyProcessed,
}

type LocalBoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + 'a>>;

pub struct Installer<'a, R: Runtime, P: PackageManager> {
    runtime: &'a R,
    package_manager: &'a P,
    options: InstallOptions,
    stub_manifest: OnceCell<StubManifest>,
}

impl<'a, R: Runtime, P: PackageManager> Installer<'a, R, P> {
    pub fn new(runtime: &'a R, package_manager: &'a P, options: InstallOptions) -> Self {
        Self {
            runtime,
            package_manager,
            options,
            stub_manifest: OnceCell::new(),
        }
    }

    /// Install `dir` in a fresh session.
    pub async fn install(&self, dir: &Path) -> Result<InstallSession> {
        let mut session = InstallSession::new();
        self.install_in(dir, &mut session).await?;
        Ok(session)
    }

    /// Install `dir` as a workspace root, a module, or both.
    ///
    /// Fails if `dir` holds neither descriptor.
    pub async fn install_in(&self, dir: &Path, session: &mut InstallSession) -> Result<()> {
        if !self.install_dir(dir.to_path_buf(), session).await? {
            return Err(WorkspaceError::PackageDescriptorNotFound {
                dir: dir.to_path_buf(),
            }
            .into());
        }
        Ok(())
    }

    /// Workspace children first, then the module itself. Returns `false` if
    /// `dir` is neither a workspace root nor a module.
    fn install_dir<'s>(
        &'s self,
        dir: PathBuf,
        session: &'s mut InstallSession,
    ) -> LocalBoxFuture<'s, Result<bool>> {
        Box::pin(async move {
            let mut handled = false;
            let workspace = find_workspace_descriptor(self.runtime, &dir, Lookup::Shallow)?;

            if workspace.is_some() {
                handled = true;
                let canonical = self.runtime.canonicalize(&dir)?;
                if session.enter_workspace(canonical) {
                    for child in list_installable_children(self.runtime, &dir, self.options.recursive)?
                    {
                        if !self.install_dir(child.clone(), session).await? {
                            debug!("Skipping {:?}: no package.json or workspace.json", child);
                        }
                    }
                }
            }

            if let Some(package) = find_package_descriptor(self.runtime, &dir)? {
                handled = true;
                let workspace = match workspace {
                    Some(workspace) => workspace,
                    None => load_workspace_descriptor(self.runtime, &dir, Lookup::Ancestors)?,
                };
                self.install_module(&dir, &workspace, &package, session)
                    .await
                    .with_context(|| format!("Failed to install {}", dir.display()))?;
            }

            Ok(handled)
        })
    }

    /// Install one module's dependencies, then its linked modules.
    #[tracing::instrument(skip(self, workspace, package, session))]
    pub async fn install_module(
        &self,
        dir: &Path,
        workspace: &WorkspaceDescriptor,
        package: &PackageDescriptor,
        session: &mut InstallSession,
    ) -> Result<Visit> {
        let canonical = self.runtime.canonicalize(dir)?;
        if !session.enter(dir, canonical) {
            debug!("{:?} already installed in this session", dir);
            return Ok(Visit::AlreadyProcessed);
        }
        println!("Installing {} in {}", package.display_name(), dir.display());

        let dependencies = package.working_dependencies(self.options.production);
        let classified = ClassifiedDependencies::new(classify(dir, &dependencies, workspace));
        let linked: BTreeSet<String> = classified.linked.iter().map(|s| s.name.clone()).collect();

        self.install_dependencies(dir, classified, session).await?;

        if !self.options.production {
            self.install_linked_peers(dir, workspace, package, linked, session)
                .await?;
        }

        Ok(Visit::Installed)
    }

    /// Phases A to D for one set of dependencies of the module at `dir`.
    async fn install_dependencies(
        &self,
        dir: &Path,
        classified: ClassifiedDependencies,
        session: &mut InstallSession,
    ) -> Result<()> {
        if classified.needs_package_manager() {
            for spec in &classified.linked {
                self.stub_linked(spec).await?;
            }
            self.run_package_manager(dir, &classified).await?;
        }

        let mut materialized = Vec::new();
        for spec in &classified.linked {
            if let Some(path) = self.materialize_linked(spec, session)? {
                materialized.push(path);
            }
        }

        for path in materialized {
            if !self.install_dir(path.clone(), session).await? {
                warn!("Linked module {:?} has no package.json", path);
            }
        }

        Ok(())
    }

    async fn run_package_manager(
        &self,
        dir: &Path,
        classified: &ClassifiedDependencies,
    ) -> Result<()> {
        if !classified.plain.is_empty() {
            let packages: Vec<String> = classified
                .plain
                .iter()
                .map(DependencySpec::install_arg)
                .collect();
            self.package_manager.install(dir, &packages).await?;
        }

        for spec in &classified.alt_registry {
            info!("Installing {} from {}", spec.name, spec.install_arg());
            self.package_manager
                .install(dir, &[spec.install_arg()])
                .await?;
        }

        Ok(())
    }

    /// Treat the linked peer dependencies of linked modules as dependencies
    /// of the module at `dir` until no new names turn up.
    async fn install_linked_peers(
        &self,
        dir: &Path,
        workspace: &WorkspaceDescriptor,
        package: &PackageDescriptor,
        mut processed: BTreeSet<String>,
        session: &mut InstallSession,
    ) -> Result<()> {
        let store = dir.join(DEPENDENCY_STORE);
        let mut pending: Vec<String> = processed.iter().cloned().collect();

        while !pending.is_empty() {
            let mut discovered = BTreeMap::new();
            for name in &pending {
                let Some(linked) = find_package_descriptor(self.runtime, &store.join(name))?
                else {
                    continue;
                };
                for (peer, requirement) in linked.peer_dependencies {
                    if workspace.link(&peer).is_none()
                        || processed.contains(&peer)
                        || package.name.as_deref() == Some(peer.as_str())
                    {
                        continue;
                    }
                    discovered.entry(peer).or_insert(requirement);
                }
            }

            if discovered.is_empty() {
                break;
            }
            info!(
                "Linking peer dependencies {:?} into {:?}",
                discovered.keys().collect::<Vec<_>>(),
                dir
            );

            processed.extend(discovered.keys().cloned());
            pending = discovered.keys().cloned().collect();
            let classified = ClassifiedDependencies::new(classify(dir, &discovered, workspace));
            self.install_dependencies(dir, classified, session).await?;
        }

        Ok(())
    }

    async fn stub_manifest(&self) -> Result<StubManifest> {
        let mode = self.options.stub_manifest;
        let manifest = self
            .stub_manifest
            .get_or_try_init(|| async {
                let major = match mode {
                    StubManifestMode::Auto => self.package_manager.major_version().await?,
                    _ => None,
                };
                debug!("Package manager major version: {:?}", major);
                Ok::<_, anyhow::Error>(mode.resolve(major))
            })
            .await?;
        Ok(*manifest)
    }
}
