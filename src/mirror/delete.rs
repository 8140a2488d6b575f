// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Deletion pass.
//!
//! Empty out a directory tree depth-first, except for whatever the keep list
//! protects.

use crate::{config::KeepList, mirror::matcher::KeepMatcher};

use std::{
    fs::{read_dir, remove_dir, remove_file},
    path::{Path, PathBuf},
};
use tracing::{debug, instrument, warn};

/// Recursively delete everything under `dir` that is not protected.
///
/// Protection is always checked relative to `destination_root`, no matter how
/// deep into the tree the current directory is. A protected directory is left
/// alone entirely, i.e., nothing inside of it is visited.
///
/// Symlinks are never followed. A symlink to a directory is removed as a link.
///
/// # Failure Asymmetry
///
/// Failing to list a directory or to inspect one of its entries aborts the
/// whole pass. Failing to remove a file, link, or emptied directory does not.
/// The removal failure is logged, and the pass keeps going. A directory that
/// still holds protected entries cannot be removed, so that failure is
/// expected whenever the keep list reaches below the top-level.
///
/// # Errors
///
/// - Return [`DeleteError::ReadDir`] if a directory cannot be listed.
/// - Return [`DeleteError::ReadEntry`] if a directory entry or its file type
///   cannot be read.
#[instrument(skip(destination_root, keep, matcher), level = "debug")]
pub fn delete_tree(
    dir: &Path,
    destination_root: &Path,
    keep: &KeepList,
    matcher: &dyn KeepMatcher,
) -> Result<()> {
    let entries = read_dir(dir).map_err(|err| DeleteError::ReadDir {
        source: err,
        path: dir.to_path_buf(),
    })?;

    for entry in entries {
        let entry = entry.map_err(|err| DeleteError::ReadEntry {
            source: err,
            path: dir.to_path_buf(),
        })?;
        let path = entry.path();

        if matcher.is_protected(&path, destination_root, keep) {
            debug!("keep {:?}", path.display());
            continue;
        }

        let file_type = entry.file_type().map_err(|err| DeleteError::ReadEntry {
            source: err,
            path: path.clone(),
        })?;

        if file_type.is_dir() {
            delete_tree(&path, destination_root, keep, matcher)?;
            if let Err(error) = remove_dir(&path) {
                warn!("failed to remove directory {:?}: {error}", path.display());
            }
        } else if let Err(error) = remove_file(&path) {
            warn!("failed to remove {:?}: {error}", path.display());
        }
    }

    Ok(())
}

/// Deletion pass error types.
#[derive(Debug, thiserror::Error)]
pub enum DeleteError {
    /// Directory cannot be listed.
    #[error("failed to list directory {:?}", path.display())]
    ReadDir {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Directory entry cannot be read.
    #[error("failed to read directory entry {:?}", path.display())]
    ReadEntry {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },
}

/// Friendly result alias :3
pub type Result<T, E = DeleteError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mirror::matcher::{DescendantMatcher, ExactMatcher};

    use pretty_assertions::assert_eq;
    use std::fs::{create_dir_all, read_to_string, write};

    fn fixture() -> anyhow::Result<tempfile::TempDir> {
        let root = tempfile::tempdir()?;
        create_dir_all(root.path().join("logs").join("old"))?;
        create_dir_all(root.path().join("world").join("region"))?;
        write(root.path().join("old.txt"), "x")?;
        write(root.path().join("keep.txt"), "k")?;
        write(root.path().join("logs").join("old").join("latest.log"), "l")?;
        write(root.path().join("world").join("level.dat"), "w")?;
        write(root.path().join("world").join("region").join("r.0.0.mca"), "r")?;
        Ok(root)
    }

    #[test]
    fn delete_tree_without_keep_list_empties_directory() -> anyhow::Result<()> {
        let root = fixture()?;

        delete_tree(root.path(), root.path(), &KeepList::default(), &ExactMatcher)?;

        assert!(root.path().exists());
        assert_eq!(read_dir(root.path())?.count(), 0);

        Ok(())
    }

    #[test]
    fn delete_tree_spares_protected_files() -> anyhow::Result<()> {
        let root = fixture()?;
        let keep = KeepList::new(["keep.txt"]);

        delete_tree(root.path(), root.path(), &keep, &ExactMatcher)?;

        assert_eq!(read_to_string(root.path().join("keep.txt"))?, "k");
        assert!(!root.path().join("old.txt").exists());
        assert!(!root.path().join("logs").exists());
        assert!(!root.path().join("world").exists());

        Ok(())
    }

    #[test]
    fn delete_tree_does_not_descend_into_protected_directory() -> anyhow::Result<()> {
        let root = fixture()?;
        let keep = KeepList::new(["world"]);

        delete_tree(root.path(), root.path(), &keep, &ExactMatcher)?;

        assert!(root.path().join("world").join("level.dat").exists());
        assert!(root
            .path()
            .join("world")
            .join("region")
            .join("r.0.0.mca")
            .exists());

        Ok(())
    }

    #[test]
    fn delete_tree_keeps_parent_of_nested_protected_file() -> anyhow::Result<()> {
        let root = fixture()?;
        let keep = KeepList::new(["world/level.dat"]);

        delete_tree(root.path(), root.path(), &keep, &ExactMatcher)?;

        // Parent removal fails softly since it is not empty.
        assert_eq!(read_to_string(root.path().join("world").join("level.dat"))?, "w");
        assert!(!root.path().join("world").join("region").exists());
        assert!(!root.path().join("old.txt").exists());

        Ok(())
    }

    #[test]
    fn delete_tree_matches_relative_to_destination_root() -> anyhow::Result<()> {
        let root = fixture()?;
        // Same relative name as a nested directory, but anchored at the root.
        let keep = KeepList::new(["old"]);

        delete_tree(root.path(), root.path(), &keep, &ExactMatcher)?;

        assert!(!root.path().join("logs").exists());

        Ok(())
    }

    #[test]
    fn delete_tree_with_descendant_matcher() -> anyhow::Result<()> {
        let root = fixture()?;
        let keep = KeepList::new(["world"]);

        delete_tree(root.path(), root.path(), &keep, &DescendantMatcher)?;

        assert!(root.path().join("world").join("level.dat").exists());
        assert!(!root.path().join("logs").exists());

        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn delete_tree_removes_symlink_without_following() -> anyhow::Result<()> {
        let outside = tempfile::tempdir()?;
        write(outside.path().join("precious.txt"), "p")?;
        let root = fixture()?;
        std::os::unix::fs::symlink(outside.path(), root.path().join("link"))?;

        delete_tree(root.path(), root.path(), &KeepList::default(), &ExactMatcher)?;

        assert!(!root.path().join("link").exists());
        assert_eq!(read_to_string(outside.path().join("precious.txt"))?, "p");

        Ok(())
    }

    #[test]
    fn delete_tree_fails_on_missing_directory() -> anyhow::Result<()> {
        let root = tempfile::tempdir()?;
        let missing = root.path().join("missing");

        let result = delete_tree(&missing, root.path(), &KeepList::default(), &ExactMatcher);
        assert!(matches!(result, Err(DeleteError::ReadDir { .. })));

        Ok(())
    }
}
