// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT


use anyhow::Result;
use std::{
    collections::BTreeMap,
    fs::{create_dir_all, read, read_dir, write},
    path::{Path, PathBuf},
};
use tempfile::TempDir;

/// Scratch directory holding a source tree and a destination tree.
pub(crate) struct TreeFixture {
    root: TempDir,
}

impl TreeFixture {
    pub(crate) fn new() -> Result<Self> {
        let root = tempfile::tempdir()?;
        create_dir_all(root.path().join("src"))?;
        create_dir_all(root.path().join("dst"))?;

        Ok(Self { root })
    }

    pub(crate) fn src(&self) -> PathBuf {
        self.root.path().join("src")
    }

    pub(crate) fn dst(&self) -> PathBuf {
        self.root.path().join("dst")
    }

    pub(crate) fn missing(&self) -> PathBuf {
        self.root.path().join("missing")
    }

    pub(crate) fn put(
        &self,
        tree: impl AsRef<Path>,
        relative: impl AsRef<Path>,
        contents: impl AsRef<str>,
    ) -> Result<()> {
        let path = tree.as_ref().join(relative);

        // INVARIANT: Always create missing parent directories.
        if let Some(parent) = path.parent() {
            create_dir_all(parent)?;
        }
        write(path, contents.as_ref())?;

        Ok(())
    }
}

/// Snapshot of every file in a tree keyed by its relative path.
///
/// Directories are recorded with empty contents, and a trailing slash.
pub(crate) fn snapshot(tree: impl AsRef<Path>) -> Result<BTreeMap<String, Vec<u8>>> {
    let mut entries = BTreeMap::new();
    let mut pending = vec![tree.as_ref().to_path_buf()];

    while let Some(dir) = pending.pop() {
        for entry in read_dir(&dir)? {
            let path = entry?.path();
            let relative = path
                .strip_prefix(tree.as_ref())?
                .to_string_lossy()
                .into_owned();
            if path.is_dir() {
                entries.insert(format!("{relative}/"), Vec::new());
                pending.push(path);
            } else {
                entries.insert(relative, read(&path)?);
            }
        }
    }

    Ok(entries)
}
