use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// A module as it was reached during an install
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleVisit {
    /// Path the module was reached through (possibly inside a symlink)
    pub path: PathBuf,
    /// Symlink-free path of the module
    pub canonical: PathBuf,
}

impl ModuleVisit {
    pub fn is_linked(&self) -> bool {
        self.path != self.canonical
    }
}

/// Bookkeeping for one top-level install invocation.
///
/// A module is installed at most once per session, keyed by canonical path.
#[derive(Debug, Default)]
pub struct InstallSession {
    visited: HashSet<PathBuf>,
    workspaces: HashSet<PathBuf>,
    copied_sources: HashSet<PathBuf>,
    history: Vec<ModuleVisit>,
}

impl InstallSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a module visit. Returns `false` if the canonical path was
    /// already visited in this session.
    pub fn enter(&mut self, path: &Path, canonical: PathBuf) -> bool {
        if !self.visited.insert(canonical.clone()) {
            return false;
        }
        self.history.push(ModuleVisit {
            path: path.to_path_buf(),
            canonical,
        });
        true
    }

    /// Record a workspace root whose children are being enumerated.
    /// Returns `false` if it was already enumerated.
    pub fn enter_workspace(&mut self, canonical: PathBuf) -> bool {
        self.workspaces.insert(canonical)
    }

    /// Record the source of a copied module before installing the copy.
    /// Returns `false` if that source was already installed or copied in
    /// this session, in which case the copy must not be installed again.
    pub fn enter_copy_source(&mut self, canonical: PathBuf) -> bool {
        !self.visited.contains(&canonical) && self.copied_sources.insert(canonical)
    }

    #[cfg(test)]
    pub fn is_visited(&self, canonical: &Path) -> bool {
        self.visited.contains(canonical)
    }

    /// Installed modules, in the order they were entered.
    pub fn history(&self) -> &[ModuleVisit] {
        &self.history
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enter_dedups_by_canonical_path() {
        let mut session = InstallSession::new();
        assert!(session.enter(Path::new("/ws/prj2"), PathBuf::from("/ws/prj2")));
        assert!(!session.enter(
            Path::new("/ws/prj1/node_modules/prj2"),
            PathBuf::from("/ws/prj2")
        ));

        assert!(session.is_visited(Path::new("/ws/prj2")));
        assert_eq!(session.history().len(), 1);
        assert!(!session.history()[0].is_linked());
    }

    #[test]
    fn test_linked_visit() {
        let mut session = InstallSession::new();
        session.enter(
            Path::new("/ws/prj1/node_modules/prj2"),
            PathBuf::from("/ws/prj2"),
        );
        assert!(session.history()[0].is_linked());
    }

    #[test]
    fn test_workspaces_are_tracked_separately() {
        let mut session = InstallSession::new();
        assert!(session.enter_workspace(PathBuf::from("/ws")));
        assert!(!session.enter_workspace(PathBuf::from("/ws")));
        assert!(!session.is_visited(Path::new("/ws")));
    }

    #[test]
    fn test_copy_source_entered_once() {
        let mut session = InstallSession::new();
        session.enter(Path::new("/ws/a"), PathBuf::from("/ws/a"));

        assert!(!session.enter_copy_source(PathBuf::from("/ws/a")));
        assert!(session.enter_copy_source(PathBuf::from("/ws/b")));
        assert!(!session.enter_copy_source(PathBuf::from("/ws/b")));
        // Copies are not module visits
        assert!(!session.is_visited(Path::new("/ws/b")));
    }
}
