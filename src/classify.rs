//! Dependency classification
//!
//! Every declared dependency is satisfied in exactly one way: by a local
//! module from the workspace `links`, by an alternate source from `repos`, or
//! by the package manager's default registry. Links win over repos, which win
//! over the default.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::descriptor::WorkspaceDescriptor;
use crate::walker::DEPENDENCY_STORE;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DependencyKind {
    /// Installed by the package manager from its default registry.
    Plain,
    /// Satisfied by a local module directory.
    Linked { source: PathBuf },
    /// Installed by the package manager from an alternate source.
    AltRegistry { source: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencySpec {
    pub name: String,
    pub requirement: String,
    pub kind: DependencyKind,
    /// `<module>/node_modules/<name>`
    pub destination: PathBuf,
}

impl DependencySpec {
    /// Argument handed to `npm install` for this dependency.
    pub fn install_arg(&self) -> String {
        match &self.kind {
            DependencyKind::AltRegistry { source } => source.clone(),
            DependencyKind::Plain | DependencyKind::Linked { .. } => {
                let requirement = self.requirement.trim();
                if requirement.is_empty() {
                    self.name.clone()
                } else {
                    format!("{}@{}", self.name, requirement)
                }
            }
        }
    }
}

/// Classify `dependencies` of the module at `module_dir`. Output follows the
/// (sorted) order of `dependencies`.
pub fn classify(
    module_dir: &Path,
    dependencies: &BTreeMap<String, String>,
    workspace: &WorkspaceDescriptor,
) -> Vec<DependencySpec> {
    let store = module_dir.join(DEPENDENCY_STORE);
    dependencies
        .iter()
        .map(|(name, requirement)| {
            let kind = if let Some(source) = workspace.link(name) {
                DependencyKind::Linked {
                    source: source.to_path_buf(),
                }
            } else if let Some(source) = workspace.repo(name) {
                DependencyKind::AltRegistry {
                    source: source.to_string(),
                }
            } else {
                DependencyKind::Plain
            };
            DependencySpec {
                name: name.clone(),
                requirement: requirement.clone(),
                kind,
                destination: store.join(name),
            }
        })
        .collect()
}

/// Dependency specs grouped by kind
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ClassifiedDependencies {
    pub plain: Vec<DependencySpec>,
    pub linked: Vec<DependencySpec>,
    pub alt_registry: Vec<DependencySpec>,
}

impl ClassifiedDependencies {
    pub fn new(specs: Vec<DependencySpec>) -> Self {
        let mut grouped = Self::default();
        for spec in specs {
            match spec.kind {
                DependencyKind::Plain => grouped.plain.push(spec),
                DependencyKind::Linked { .. } => grouped.linked.push(spec),
                DependencyKind::AltRegistry { .. } => grouped.alt_registry.push(spec),
            }
        }
        grouped
    }

    /// True if the package manager has anything to install.
    pub fn needs_package_manager(&self) -> bool {
        !self.plain.is_empty() || !self.alt_registry.is_empty()
    }
}
