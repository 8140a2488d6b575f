// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Path resolution utilities.
//!
//! Determine canonical forms of paths that need to be compared against each
//! other, and default locations of external files that volmirror reads.

use std::{
    env,
    io::ErrorKind,
    path::{Component, Path, PathBuf},
};

/// Default base directory holding server volumes.
///
/// Used when the mirror configuration is assembled from the environment
/// without `SERVER_BASE_DIR`.
pub const DEFAULT_VOLUME_BASE_DIR: &str = "/var/lib/pterodactyl/volumes/";

/// Resolve path into its canonical absolute form.
///
/// Relative paths are anchored at the current working directory. Existing
/// paths are canonicalized, i.e., symlinks are followed. When the path does
/// not exist yet, the deepest existing ancestor is canonicalized and the
/// remaining components are appended after lexical normalization. Thus,
/// `/dst/link/new.txt` and `/real/new.txt` resolve identically when `link`
/// points to `/real`, even though `new.txt` does not exist.
///
/// # Errors
///
/// - Return [`ResolveError::CurrentDir`] if a relative path is given and the
///   current working directory cannot be determined.
/// - Return [`ResolveError::Canonicalize`] if canonicalization fails for any
///   reason other than the path not existing.
pub fn resolve(path: impl AsRef<Path>) -> Result<PathBuf> {
    let path = path.as_ref();
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        env::current_dir()
            .map_err(ResolveError::CurrentDir)?
            .join(path)
    };
    let absolute = normalize(&absolute);

    let mut existing = absolute.as_path();
    let mut missing = Vec::new();
    loop {
        match existing.canonicalize() {
            Ok(canonical) => {
                return Ok(missing
                    .iter()
                    .rev()
                    .fold(canonical, |acc, name| acc.join(name)));
            }
            Err(err) if err.kind() == ErrorKind::NotFound => {
                // INVARIANT: Root always exists, so parent-less paths are fine.
                let (Some(parent), Some(name)) = (existing.parent(), existing.file_name()) else {
                    return Ok(absolute.clone());
                };
                missing.push(name.to_os_string());
                existing = parent;
            }
            Err(err) => {
                return Err(ResolveError::Canonicalize {
                    source: err,
                    path: path.to_path_buf(),
                });
            }
        }
    }
}

/// Lexically normalize an absolute path.
///
/// Drops `.` components, and lets `..` pop the previous component without
/// ever climbing above the root.
fn normalize(path: &Path) -> PathBuf {
    let mut components = Vec::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if matches!(components.last(), Some(Component::Normal(_))) {
                    components.pop();
                }
            }
            _ => components.push(component),
        }
    }

    components.iter().collect()
}

/// Determine default absolute path to the configuration file.
///
/// Uses XDG Base Directory path `$XDG_CONFIG_HOME/volmirror/config.toml`.
/// Does not check if the path returned actually exists.
///
/// # Errors
///
/// - Return [`NoConfigDir`] if configuration directory cannot be determined.
///
/// # See Also
///
/// - [XDG Base Directory](https://wiki.archlinux.org/title/XDG_Base_Directory)
pub fn default_config_path() -> std::result::Result<PathBuf, NoConfigDir> {
    dirs::config_dir()
        .map(|path| path.join("volmirror").join("config.toml"))
        .ok_or(NoConfigDir)
}

/// No way to determine user's configuration directory.
///
/// # See Also
///
/// - [`dirs::config_dir`](https://docs.rs/dirs/latest/dirs/fn.config_dir.html)
#[derive(Clone, Debug, thiserror::Error)]
#[error("cannot determine absolute path to user's configuration directory")]
pub struct NoConfigDir;

/// Path resolution error types.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    /// Current working directory cannot be determined.
    #[error("cannot determine current working directory")]
    CurrentDir(#[source] std::io::Error),

    /// Path cannot be canonicalized.
    #[error("failed to canonicalize {:?}", path.display())]
    Canonicalize {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },
}

/// Friendly result alias :3
pub type Result<T, E = ResolveError> = std::result::Result<T, E>;
