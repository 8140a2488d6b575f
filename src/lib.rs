// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Mirror one directory tree onto another.
//!
//! Volmirror replaces the contents of a destination directory with the
//! contents of a source directory, while leaving a configured set of
//! destination paths untouched. It was written to copy game server volumes
//! from one server to another without clobbering server-specific files.

pub mod config;
pub mod mirror;
pub mod notify;
pub mod path;

pub use config::{KeepList, MatchMode, MirrorConfig};
pub use mirror::{
    run_mirror, Mirror, MirrorError, MirrorHandle, MirrorOutcome, MirrorRequest, Stage,
};
pub use notify::{Notice, Notifier, TracingNotifier, WriterNotifier};
