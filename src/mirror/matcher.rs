// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Keep list matching.
//!
//! Decide whether a path inside the destination is protected by the keep
//! list. Both the candidate path and every keep list entry are resolved to
//! their canonical absolute forms before they are compared, so the spelling
//! of a path never matters, only the file it names.
//!
//! # Failing Open
//!
//! Resolution can fail, e.g., a permission error while following a symlink.
//! A candidate that cannot be resolved is treated as __not__ protected, and a
//! keep list entry that cannot be resolved is ignored. Either way, the failure
//! is logged. This means a resolution failure can let a mirror run delete or
//! overwrite a file the operator meant to keep.

use crate::{
    config::{KeepList, MatchMode},
    path::resolve,
};

use std::path::{Component, Path, PathBuf};
use tracing::{trace, warn};

/// Match paths against a keep list.
pub trait KeepMatcher: Send + Sync + 'static {
    /// Check if candidate path is protected by keep list relative to
    /// destination root.
    fn is_protected(&self, candidate: &Path, destination_root: &Path, keep: &KeepList) -> bool;
}

/// Protect only paths that exactly name a keep list entry.
///
/// Protecting a directory does not protect anything inside of it.
#[derive(Debug, Default, Clone, Copy)]
pub struct ExactMatcher;

impl KeepMatcher for ExactMatcher {
    fn is_protected(&self, candidate: &Path, destination_root: &Path, keep: &KeepList) -> bool {
        let Some(candidate) = resolve_candidate(candidate) else {
            return false;
        };

        resolve_entries(destination_root, keep).any(|entry| entry == candidate)
    }
}

/// Protect paths that name a keep list entry, or lie beneath one.
#[derive(Debug, Default, Clone, Copy)]
pub struct DescendantMatcher;

impl KeepMatcher for DescendantMatcher {
    fn is_protected(&self, candidate: &Path, destination_root: &Path, keep: &KeepList) -> bool {
        let Some(candidate) = resolve_candidate(candidate) else {
            return false;
        };

        // Path::starts_with compares whole components, so "keep" never
        // protects "keeper".
        resolve_entries(destination_root, keep).any(|entry| candidate.starts_with(entry))
    }
}

/// Select keep list matcher for given match mode.
pub fn matcher_for(mode: MatchMode) -> Box<dyn KeepMatcher> {
    match mode {
        MatchMode::Exact => Box::new(ExactMatcher),
        MatchMode::Descendants => Box::new(DescendantMatcher),
    }
}

fn resolve_candidate(candidate: &Path) -> Option<PathBuf> {
    match resolve(candidate) {
        Ok(path) => Some(path),
        Err(error) => {
            warn!(
                "cannot resolve {:?}, treating it as unprotected: {error}",
                candidate.display()
            );
            None
        }
    }
}

fn resolve_entries<'a>(
    destination_root: &'a Path,
    keep: &'a KeepList,
) -> impl Iterator<Item = PathBuf> + 'a {
    keep.iter().filter_map(move |entry| {
        match resolve(destination_root.join(relative_entry(entry))) {
            Ok(path) => {
                trace!("keep entry {entry:?} resolved to {:?}", path.display());
                Some(path)
            }
            Err(error) => {
                warn!("cannot resolve keep entry {entry:?}, skipping it: {error}");
                None
            }
        }
    })
}

// Keep list entries are always relative to destination root, even when they
// are spelled with a leading slash.
fn relative_entry(entry: &str) -> PathBuf {
    Path::new(entry)
        .components()
        .filter(|component| !matches!(component, Component::RootDir | Component::Prefix(_)))
        .collect()
}
