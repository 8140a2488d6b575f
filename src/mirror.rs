// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Mirror orchestration.
//!
//! A __mirror__ makes a destination directory tree match a source directory
//! tree. Everything inside the destination is deleted, and everything inside
//! the source is copied over. Paths in the destination protected by the
//! __keep list__ survive both passes untouched.
//!
//! # Mirror Stages
//!
//! Every mirror run goes through the same stages in order:
//!
//! 1. __Check destination__: the destination root must be an existing
//!    directory. Otherwise, nothing is touched.
//! 2. __Deleting__: the destination is emptied out, minus protected paths.
//! 3. __Check source__: the source root must be an existing directory.
//! 4. __Copying__: the source is copied into the destination, minus protected
//!    paths.
//!
//! The source is checked _after_ deletion. A run with a missing source still
//! leaves behind an emptied destination.
//!
//! Any failure ends the run on the spot. There are no retries, and a run
//! cannot be cancelled once started.
//!
//! # Triggering Runs
//!
//! Runs are requested through [`Mirror`], which performs the work on a
//! background task and hands back a [`MirrorHandle`] that yields the outcome
//! exactly once. Only one run can be in flight at a time. Requesting another
//! run while one is still going is rejected with [`MirrorError::Busy`].
//!
//! # See Also
//!
//! 1. [`matcher`]
//! 2. [`delete`]
//! 3. [`copy`]

pub mod copy;
pub mod delete;
pub mod matcher;

use crate::{
    config::MirrorConfig,
    mirror::{copy::copy_tree, delete::delete_tree, matcher::matcher_for},
    path::resolve,
};

use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    path::{Path, PathBuf},
    sync::Arc,
};
use tokio::sync::{oneshot, Mutex};
use tracing::{debug, error, info, instrument, warn};

/// Trigger for mirror runs.
///
/// Owns the immutable mirror configuration, and guarantees that at most one
/// mirror run is in flight at any given time.
#[derive(Debug, Clone)]
pub struct Mirror {
    config: Arc<MirrorConfig>,
    in_flight: Arc<Mutex<()>>,
}

impl Mirror {
    /// Construct new mirror trigger.
    pub fn new(config: MirrorConfig) -> Self {
        Self {
            config: Arc::new(config),
            in_flight: Arc::new(Mutex::new(())),
        }
    }

    /// Configuration every run uses.
    pub fn config(&self) -> &MirrorConfig {
        &self.config
    }

    /// Check if a mirror run is currently in flight.
    pub fn is_busy(&self) -> bool {
        self.in_flight.try_lock().is_err()
    }

    /// Request a new mirror run.
    ///
    /// Starts exactly one mirror run on the blocking thread pool, and returns
    /// immediately. The run reports its outcome through the returned handle.
    ///
    /// # Errors
    ///
    /// - Return [`MirrorError::Busy`] if another run is still in flight.
    ///
    /// # Panics
    ///
    /// - Panics if called outside of a Tokio runtime.
    pub fn request(&self) -> Result<MirrorHandle> {
        let guard = Arc::clone(&self.in_flight)
            .try_lock_owned()
            .map_err(|_| MirrorError::Busy)?;
        let config = Arc::clone(&self.config);
        let (sender, receiver) = oneshot::channel();

        info!(
            "mirror {:?} to {:?}",
            config.source_root.display(),
            config.destination_root.display()
        );
        tokio::task::spawn_blocking(move || {
            let outcome = run_mirror(&config);

            // INVARIANT: Release guard before reporting, so the receiving end
            // can request a new run right away.
            drop(guard);
            if sender.send(outcome).is_err() {
                debug!("mirror outcome dropped, nobody is waiting for it");
            }
        });

        Ok(MirrorHandle { receiver })
    }
}

/// Pending outcome of a requested mirror run.
#[derive(Debug)]
pub struct MirrorHandle {
    receiver: oneshot::Receiver<MirrorOutcome>,
}

impl MirrorHandle {
    /// Wait for mirror run to finish.
    ///
    /// If the run ended without reporting anything, e.g., it panicked, then
    /// a failure is yielded.
    pub async fn wait(self) -> MirrorOutcome {
        self.receiver.await.unwrap_or_else(|_| {
            error!("mirror run ended without reporting an outcome");
            MirrorOutcome::Failure {
                stage: None,
                reason: "mirror run ended unexpectedly".into(),
            }
        })
    }
}

/// Source and destination of a single mirror run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MirrorRequest {
    pub source_root: PathBuf,
    pub destination_root: PathBuf,
}

impl MirrorRequest {
    /// Resolve both roots of mirror configuration.
    ///
    /// Falls back to the configured path if it cannot be resolved.
    pub fn from_config(config: &MirrorConfig) -> Self {
        Self {
            source_root: resolve_root(&config.source_root),
            destination_root: resolve_root(&config.destination_root),
        }
    }
}

fn resolve_root(path: &Path) -> PathBuf {
    resolve(path).unwrap_or_else(|error| {
        warn!("cannot resolve {:?}, using it as is: {error}", path.display());
        path.to_path_buf()
    })
}

/// Stages of a mirror run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    CheckDestination,
    Deleting,
    CheckSource,
    Copying,
}

impl Display for Stage {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::CheckDestination => fmt.write_str("check destination"),
            Self::Deleting => fmt.write_str("deleting"),
            Self::CheckSource => fmt.write_str("check source"),
            Self::Copying => fmt.write_str("copying"),
        }
    }
}

/// Result of a finished mirror run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MirrorOutcome {
    /// Every stage completed.
    Success,

    /// Run stopped at a failing stage.
    Failure {
        /// Stage that failed, if the run got far enough to know.
        stage: Option<Stage>,

        /// Short reason fit for display.
        reason: String,
    },
}

impl MirrorOutcome {
    /// Check if mirror run succeeded.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }

    /// Reason of failure, if any.
    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::Success => None,
            Self::Failure { reason, .. } => Some(reason.as_str()),
        }
    }
}

impl From<Result<()>> for MirrorOutcome {
    fn from(result: Result<()>) -> Self {
        match result {
            Ok(()) => Self::Success,
            Err(error) => Self::Failure {
                stage: error.stage(),
                reason: error.reason().into(),
            },
        }
    }
}

/// Perform a full mirror run in the current thread.
///
/// Runs every stage in order, and stops at the first failure. The full error
/// is logged, while the outcome only carries a short reason.
pub fn run_mirror(config: &MirrorConfig) -> MirrorOutcome {
    let request = MirrorRequest::from_config(config);
    let result = try_mirror(&request, config);
    if let Err(error) = &result {
        error!("mirror failed: {}", report(error));
    } else {
        info!("mirror completed");
    }

    result.into()
}

#[instrument(skip(config), level = "debug")]
fn try_mirror(request: &MirrorRequest, config: &MirrorConfig) -> Result<()> {
    let matcher = matcher_for(config.match_mode);

    debug!("stage: {}", Stage::CheckDestination);
    if !request.destination_root.is_dir() {
        return Err(MirrorError::DestinationMissing {
            path: request.destination_root.clone(),
        });
    }

    debug!("stage: {}", Stage::Deleting);
    delete_tree(
        &request.destination_root,
        &request.destination_root,
        &config.keep,
        matcher.as_ref(),
    )?;

    debug!("stage: {}", Stage::CheckSource);
    if !request.source_root.is_dir() {
        return Err(MirrorError::SourceMissing {
            path: request.source_root.clone(),
        });
    }

    debug!("stage: {}", Stage::Copying);
    copy_tree(
        &request.source_root,
        &request.destination_root,
        &request.destination_root,
        &config.keep,
        matcher.as_ref(),
    )?;

    Ok(())
}

// Flatten error chain into one line for the operator log.
fn report(error: &dyn std::error::Error) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        message.push_str(&format!(": {cause}"));
        source = cause.source();
    }

    message
}

/// Mirror error types.
#[derive(Debug, thiserror::Error)]
pub enum MirrorError {
    /// Destination root is missing or not a directory.
    #[error("destination directory {:?} does not exist", path.display())]
    DestinationMissing { path: PathBuf },

    /// Source root is missing or not a directory.
    #[error("source directory {:?} does not exist", path.display())]
    SourceMissing { path: PathBuf },

    /// Deletion pass failed.
    #[error(transparent)]
    Delete(#[from] crate::mirror::delete::DeleteError),

    /// Copy pass failed.
    #[error(transparent)]
    Copy(#[from] crate::mirror::copy::CopyError),

    /// Another mirror run is still in flight.
    #[error("a mirror run is already in progress")]
    Busy,
}

impl MirrorError {
    /// Stage this error ends a run at.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Self::DestinationMissing { .. } => Some(Stage::CheckDestination),
            Self::Delete(_) => Some(Stage::Deleting),
            Self::SourceMissing { .. } => Some(Stage::CheckSource),
            Self::Copy(_) => Some(Stage::Copying),
            Self::Busy => None,
        }
    }

    /// Short reason fit for display.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::DestinationMissing { .. } => "destination directory does not exist",
            Self::Delete(_) => "failed to delete destination files",
            Self::SourceMissing { .. } => "source directory does not exist",
            Self::Copy(_) => "failed to copy source files",
            Self::Busy => "a mirror run is already in progress",
        }
    }
}

/// Friendly result alias :3
pub type Result<T, E = MirrorError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::KeepList;

    use pretty_assertions::assert_eq;
    use std::fs::{create_dir_all, read_dir, read_to_string, write};

    #[test]
    fn run_mirror_fails_on_missing_destination() -> anyhow::Result<()> {
        let src = tempfile::tempdir()?;
        write(src.path().join("a.txt"), "hi")?;
        let missing = src.path().join("missing");
        let config = MirrorConfig::new(src.path(), &missing, KeepList::default());

        let result = run_mirror(&config);

        assert_eq!(
            result,
            MirrorOutcome::Failure {
                stage: Some(Stage::CheckDestination),
                reason: "destination directory does not exist".into(),
            }
        );
        assert!(!missing.exists());
        assert_eq!(read_to_string(src.path().join("a.txt"))?, "hi");

        Ok(())
    }

    #[test]
    fn run_mirror_deletes_before_checking_source() -> anyhow::Result<()> {
        let root = tempfile::tempdir()?;
        let dst = root.path().join("dst");
        create_dir_all(&dst)?;
        write(dst.join("old.txt"), "x")?;
        write(dst.join("keep.txt"), "k")?;
        let config = MirrorConfig::new(
            root.path().join("missing"),
            &dst,
            KeepList::new(["keep.txt"]),
        );

        let result = run_mirror(&config);

        assert_eq!(result.reason(), Some("source directory does not exist"));
        assert!(!dst.join("old.txt").exists());
        assert_eq!(read_to_string(dst.join("keep.txt"))?, "k");
        assert_eq!(read_dir(&dst)?.count(), 1);

        Ok(())
    }

    #[test]
    fn run_mirror_replaces_destination() -> anyhow::Result<()> {
        let src = tempfile::tempdir()?;
        let dst = tempfile::tempdir()?;
        write(src.path().join("a.txt"), "hi")?;
        write(dst.path().join("old.txt"), "x")?;
        let config = MirrorConfig::new(src.path(), dst.path(), KeepList::default());

        let result = run_mirror(&config);

        assert!(result.is_success());
        assert_eq!(read_to_string(dst.path().join("a.txt"))?, "hi");
        assert!(!dst.path().join("old.txt").exists());

        Ok(())
    }

    #[tokio::test]
    async fn request_reports_outcome_once() -> anyhow::Result<()> {
        let src = tempfile::tempdir()?;
        let dst = tempfile::tempdir()?;
        write(src.path().join("a.txt"), "hi")?;
        let mirror = Mirror::new(MirrorConfig::new(
            src.path(),
            dst.path(),
            KeepList::default(),
        ));

        let outcome = mirror.request()?.wait().await;

        assert!(outcome.is_success());
        assert_eq!(read_to_string(dst.path().join("a.txt"))?, "hi");

        Ok(())
    }

    #[tokio::test]
    async fn request_rejects_concurrent_run() -> anyhow::Result<()> {
        let src = tempfile::tempdir()?;
        let dst = tempfile::tempdir()?;
        let mirror = Mirror::new(MirrorConfig::new(
            src.path(),
            dst.path(),
            KeepList::default(),
        ));

        // Hold the guard to simulate a run that is still going.
        let guard = Arc::clone(&mirror.in_flight).try_lock_owned()?;
        assert!(mirror.is_busy());
        assert!(matches!(mirror.request(), Err(MirrorError::Busy)));

        drop(guard);
        assert!(!mirror.is_busy());
        assert!(mirror.request()?.wait().await.is_success());

        Ok(())
    }

    #[tokio::test]
    async fn request_releases_guard_after_failure() -> anyhow::Result<()> {
        let root = tempfile::tempdir()?;
        let mirror = Mirror::new(MirrorConfig::new(
            root.path().join("src"),
            root.path().join("dst"),
            KeepList::default(),
        ));

        let first = mirror.request()?.wait().await;
        assert_eq!(first.reason(), Some("destination directory does not exist"));
        let second = mirror.request()?.wait().await;
        assert!(!second.is_success());

        Ok(())
    }
}
