// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Copy pass.
//!
//! Recreate a source directory tree inside the destination, skipping whatever
//! the keep list protects on the destination side.

use crate::{config::KeepList, mirror::matcher::KeepMatcher};

use std::{
    fs::{create_dir, metadata, read, read_dir, set_permissions, write, DirEntry, Permissions},
    path::{Path, PathBuf},
};
use tracing::{debug, instrument, trace, warn};

/// Recursively copy everything under `src_dir` into `dst_dir`.
///
/// Each destination path is checked against the keep list relative to
/// `destination_root`. A protected destination path is skipped along with
/// everything beneath it on the source side, even entries that would not be
/// protected themselves.
///
/// Symlinks in the source are never descended into. A link to a regular file
/// is copied as that file, and any other link is skipped.
///
/// Files are read whole into memory before being written out. Permission
/// bits of the source are applied to every file and directory created. A
/// directory receives its permissions only after its contents were copied,
/// so a read-only source directory can still be populated.
///
/// Destination files are not replaced atomically. A failed write can leave a
/// truncated file behind.
///
/// # Errors
///
/// Every failure is fatal, and aborts the whole pass.
///
/// - Return [`CopyError::ReadDir`] if a source directory cannot be listed.
/// - Return [`CopyError::ReadEntry`] if a source entry cannot be inspected,
///   e.g., an unprotected dangling symlink.
/// - Return [`CopyError::CreateDir`] if a destination directory cannot be
///   created.
/// - Return [`CopyError::ReadFile`] if a source file cannot be read.
/// - Return [`CopyError::WriteFile`] if a destination file cannot be written.
/// - Return [`CopyError::SetPermissions`] if permission bits cannot be
///   applied.
#[instrument(skip(destination_root, keep, matcher), level = "debug")]
pub fn copy_tree(
    src_dir: &Path,
    dst_dir: &Path,
    destination_root: &Path,
    keep: &KeepList,
    matcher: &dyn KeepMatcher,
) -> Result<()> {
    let entries = read_dir(src_dir).map_err(|err| CopyError::ReadDir {
        source: err,
        path: src_dir.to_path_buf(),
    })?;

    for entry in entries {
        let entry = entry.map_err(|err| CopyError::ReadEntry {
            source: err,
            path: src_dir.to_path_buf(),
        })?;
        let dst = dst_dir.join(entry.file_name());

        if matcher.is_protected(&dst, destination_root, keep) {
            debug!("skip protected {:?}", dst.display());
            continue;
        }

        let Some(node) = Node::inspect(&entry)? else {
            continue;
        };

        if node.is_dir {
            if !dst.is_dir() {
                create_dir(&dst).map_err(|err| CopyError::CreateDir {
                    source: err,
                    path: dst.clone(),
                })?;
            }
            copy_tree(&node.path, &dst, destination_root, keep, matcher)?;
            apply_permissions(&dst, node.permissions)?;
        } else {
            trace!("copy {:?} to {:?}", node.path.display(), dst.display());
            let data = read(&node.path).map_err(|err| CopyError::ReadFile {
                source: err,
                path: node.path.clone(),
            })?;
            write(&dst, data).map_err(|err| CopyError::WriteFile {
                source: err,
                path: dst.clone(),
            })?;
            apply_permissions(&dst, node.permissions)?;
        }
    }

    Ok(())
}

/// Source entry visited during the copy pass.
///
/// A symlink to a regular file is copied as the file it points to. Any other
/// symlink is skipped, so the pass never descends through a linked directory.
#[derive(Debug)]
struct Node {
    path: PathBuf,
    is_dir: bool,
    permissions: Permissions,
}

impl Node {
    fn inspect(entry: &DirEntry) -> Result<Option<Self>> {
        let path = entry.path();
        let file_type = entry.file_type().map_err(|err| CopyError::ReadEntry {
            source: err,
            path: path.clone(),
        })?;

        let meta = if file_type.is_symlink() {
            metadata(&path)
        } else {
            entry.metadata()
        }
        .map_err(|err| CopyError::ReadEntry {
            source: err,
            path: path.clone(),
        })?;

        if file_type.is_symlink() && !meta.is_file() {
            warn!("skip symlink {:?}, it does not point to a file", path.display());
            return Ok(None);
        }

        Ok(Some(Self {
            is_dir: meta.is_dir(),
            permissions: meta.permissions(),
            path,
        }))
    }
}

fn apply_permissions(path: &Path, permissions: Permissions) -> Result<()> {
    set_permissions(path, permissions).map_err(|err| CopyError::SetPermissions {
        source: err,
        path: path.to_path_buf(),
    })
}

/// Copy pass error types.
#[derive(Debug, thiserror::Error)]
pub enum CopyError {
    /// Source directory cannot be listed.
    #[error("failed to list directory {:?}", path.display())]
    ReadDir {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Source entry cannot be inspected.
    #[error("failed to inspect {:?}", path.display())]
    ReadEntry {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Destination directory cannot be created.
    #[error("failed to create directory {:?}", path.display())]
    CreateDir {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Source file cannot be read.
    #[error("failed to read {:?}", path.display())]
    ReadFile {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Destination file cannot be written.
    #[error("failed to write {:?}", path.display())]
    WriteFile {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Permission bits cannot be applied.
    #[error("failed to set permissions of {:?}", path.display())]
    SetPermissions {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },
}

/// Friendly result alias :3
pub type Result<T, E = CopyError> = std::result::Result<T, E>;
