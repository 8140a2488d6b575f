// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Progress and result notices.
//!
//! Whoever triggers a mirror run gets told about it twice: once when the run
//! starts, and once when it finishes. Notices render into human-readable text
//! suitable for direct display.

use crate::{config::MirrorConfig, mirror::MirrorOutcome};

use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    io::Write,
    sync::Mutex,
};
use tracing::{error, info, warn};

/// Notice about a mirror run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// Mirror run has started.
    Started {
        source: String,
        destination: String,
        keep: Vec<String>,
    },

    /// Mirror run has finished.
    Finished(MirrorOutcome),
}

impl Notice {
    /// Construct start notice for mirror configuration.
    pub fn started(config: &MirrorConfig) -> Self {
        Self::Started {
            source: config.source_root.display().to_string(),
            destination: config.destination_root.display().to_string(),
            keep: config.keep.iter().map(str::to_owned).collect(),
        }
    }
}

impl Display for Notice {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::Started {
                source,
                destination,
                keep,
            } => {
                writeln!(fmt, "Copying server files...")?;
                writeln!(
                    fmt,
                    "Warning: do not modify the server files while copying!"
                )?;
                writeln!(fmt, "Source: {source}")?;
                writeln!(fmt, "Destination: {destination}")?;
                if keep.is_empty() {
                    writeln!(fmt, "Keep files: (none)")
                } else {
                    writeln!(fmt, "Keep files:")?;
                    for entry in keep {
                        writeln!(fmt, "  {entry}")?;
                    }
                    Ok(())
                }
            }
            Self::Finished(MirrorOutcome::Success) => {
                writeln!(fmt, "Copying has been completed!")
            }
            Self::Finished(MirrorOutcome::Failure { reason, .. }) => {
                writeln!(fmt, "Copying has failed! {reason}")
            }
        }
    }
}

/// Sink for mirror notices.
pub trait Notifier: Send + Sync {
    /// Deliver notice.
    fn notify(&self, notice: &Notice);
}

/// Deliver notices through the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notice: &Notice) {
        match notice {
            Notice::Finished(MirrorOutcome::Failure { .. }) => {
                error!("{}", notice.to_string().trim_end())
            }
            _ => info!("{}", notice.to_string().trim_end()),
        }
    }
}

/// Deliver notices by writing them out.
#[derive(Debug)]
pub struct WriterNotifier<W>
where
    W: Write + Send,
{
    writer: Mutex<W>,
}

impl<W> WriterNotifier<W>
where
    W: Write + Send,
{
    /// Construct new writer notifier.
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    /// Take back the writer.
    pub fn into_inner(self) -> W {
        self.writer
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl<W> Notifier for WriterNotifier<W>
where
    W: Write + Send,
{
    fn notify(&self, notice: &Notice) {
        let mut writer = self
            .writer
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Err(error) = write!(writer, "{notice}").and_then(|_| writer.flush()) {
            warn!("failed to deliver notice: {error}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::KeepList, mirror::Stage};

    use indoc::indoc;
    use pretty_assertions::assert_eq;

    #[test]
    fn render_started_notice() {
        let config = MirrorConfig::new(
            "/srv/volumes/aaaa",
            "/srv/volumes/bbbb",
            KeepList::new(["server.properties", "ops.json"]),
        );

        let result = Notice::started(&config).to_string();
        let expect = indoc! {r#"
            Copying server files...
            Warning: do not modify the server files while copying!
            Source: /srv/volumes/aaaa
            Destination: /srv/volumes/bbbb
            Keep files:
              server.properties
              ops.json
        "#};

        assert_eq!(result, expect);
    }

    #[test]
    fn render_started_notice_without_keep_files() {
        let config = MirrorConfig::new("/a", "/b", KeepList::default());

        let result = Notice::started(&config).to_string();
        assert!(result.ends_with("Keep files: (none)\n"));
    }

    #[test]
    fn render_finished_notices() {
        let success = Notice::Finished(MirrorOutcome::Success).to_string();
        assert_eq!(success, "Copying has been completed!\n");

        let failure = Notice::Finished(MirrorOutcome::Failure {
            stage: Some(Stage::CheckSource),
            reason: "source directory does not exist".into(),
        })
        .to_string();
        assert_eq!(
            failure,
            "Copying has failed! source directory does not exist\n"
        );
    }

    #[test]
    fn writer_notifier_writes_every_notice() {
        let notifier = WriterNotifier::new(Vec::new());
        let config = MirrorConfig::new("/a", "/b", KeepList::default());

        notifier.notify(&Notice::started(&config));
        notifier.notify(&Notice::Finished(MirrorOutcome::Success));

        let result = String::from_utf8(notifier.into_inner()).unwrap();
        assert!(result.starts_with("Copying server files...\n"));
        assert!(result.ends_with("Copying has been completed!\n"));
    }
}
