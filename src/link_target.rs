//! Relative symlink targets
//!
//! A link created inside a module that was itself reached through a symlink
//! lives, on disk, in the module's real directory. A relative target computed
//! from the lexical path would be resolved from the real directory and miss.
//! The target is therefore computed from the real location of the link's
//! parent directory.

use std::path::{Path, PathBuf};

use crate::install::InstallSession;
use crate::runtime::{path::path_depth, relative_path_from_dir};

/// Real directory that will hold a link created at `destination`.
///
/// The deepest linked module in the session history containing the
/// destination supplies the real prefix; otherwise the lexical parent is
/// already real.
pub fn real_link_dir(destination: &Path, session: &InstallSession) -> Option<PathBuf> {
    let link_dir = destination.parent()?;
    let rebased = session
        .history()
        .iter()
        .filter(|visit| visit.is_linked())
        .filter_map(|visit| {
            link_dir
                .strip_prefix(&visit.path)
                .ok()
                .map(|rest| (path_depth(&visit.path), visit.canonical.join(rest)))
        })
        .max_by_key(|(depth, _)| *depth)
        .map(|(_, real)| real);
    Some(rebased.unwrap_or_else(|| link_dir.to_path_buf()))
}

/// Relative symlink target for a link at `destination` pointing to `mapped_source`.
///
/// Returns `None` if no relative path exists (e.g., different drive letters on Windows).
pub fn compute_relative_link_target(
    destination: &Path,
    mapped_source: &Path,
    session: &InstallSession,
) -> Option<PathBuf> {
    let base = real_link_dir(destination, session)?;
    relative_path_from_dir(&base, mapped_source)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_naive_relative_target_for_unlinked_module() {
        let mut session = InstallSession::new();
        session.enter(Path::new("/ws/prj1"), PathBuf::from("/ws/prj1"));

        let target = compute_relative_link_target(
            Path::new("/ws/prj1/node_modules/prj2"),
            Path::new("/ws/prj2"),
            &session,
        );
        assert_eq!(target, Some(PathBuf::from("../../prj2")));
    }

    #[test]
    fn test_target_computed_from_real_dir_of_linked_module() {
        // prj1 links prj2, prj2 links prj3
        let mut session = InstallSession::new();
        session.enter(Path::new("/ws/prj1"), PathBuf::from("/ws/prj1"));
        session.enter(
            Path::new("/ws/prj1/node_modules/prj2"),
            PathBuf::from("/ws/libs/prj2"),
        );

        let target = compute_relative_link_target(
            Path::new("/ws/prj1/node_modules/prj2/node_modules/prj3"),
            Path::new("/ws/prj3"),
            &session,
        );
        // Resolved from /ws/libs/prj2/node_modules, not /ws/prj1/node_modules/prj2/node_modules
        assert_eq!(target, Some(PathBuf::from("../../../prj3")));
    }

    #[test]
    fn test_deepest_linked_module_wins() {
        let mut session = InstallSession::new();
        session.enter(
            Path::new("/ws/prj1/node_modules/prj2"),
            PathBuf::from("/ws/prj2"),
        );
        session.enter(
            Path::new("/ws/prj1/node_modules/prj2/node_modules/prj3"),
            PathBuf::from("/ws/deep/prj3"),
        );
        // An unrelated later visit must not be picked
        session.enter(
            Path::new("/ws/prj1/node_modules/other"),
            PathBuf::from("/ws/other"),
        );

        let dir = real_link_dir(
            Path::new("/ws/prj1/node_modules/prj2/node_modules/prj3/node_modules/prj4"),
            &session,
        );
        assert_eq!(dir, Some(PathBuf::from("/ws/deep/prj3/node_modules")));
    }
}
