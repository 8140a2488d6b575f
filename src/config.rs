// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Configuration layout.
//!
//! Specify the layout of the mirror configuration, and the ways it can be
//! assembled: from a TOML file, or from the process environment. The
//! configuration is built once at startup, and is immutable from then on.
//!
//! # General Layout
//!
//! ```toml
//! source_root = "/var/lib/pterodactyl/volumes/<source-uuid>"
//! destination_root = "/var/lib/pterodactyl/volumes/<destination-uuid>"
//! keep = ["server.properties", "whitelist.json"]
//! match_mode = "exact"
//! ```
//!
//! Each entry of `keep` is a path relative to `destination_root` that a mirror
//! run must never delete nor overwrite.

use crate::path::DEFAULT_VOLUME_BASE_DIR;

use serde::{Deserialize, Serialize};
use std::{
    env,
    fmt::{Display, Error as FmtError, Formatter, Result as FmtResult},
    fs::read_to_string,
    path::{Path, PathBuf},
    str::FromStr,
};

/// Mirror configuration.
#[derive(Default, Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
pub struct MirrorConfig {
    /// Directory whose contents get copied.
    pub source_root: PathBuf,

    /// Directory whose contents get replaced.
    pub destination_root: PathBuf,

    /// Destination-relative paths that survive a mirror run.
    #[serde(default)]
    pub keep: KeepList,

    /// How keep list entries protect paths.
    #[serde(default)]
    pub match_mode: MatchMode,
}

impl MirrorConfig {
    /// Construct new mirror configuration with exact keep list matching.
    pub fn new(
        source_root: impl Into<PathBuf>,
        destination_root: impl Into<PathBuf>,
        keep: KeepList,
    ) -> Self {
        Self {
            source_root: source_root.into(),
            destination_root: destination_root.into(),
            keep,
            match_mode: MatchMode::default(),
        }
    }

    /// Use a different match mode.
    pub fn with_match_mode(mut self, match_mode: MatchMode) -> Self {
        self.match_mode = match_mode;
        self
    }

    /// Load mirror configuration from TOML file.
    ///
    /// # Errors
    ///
    /// - Return [`ConfigError::ReadFile`] if file cannot be read.
    /// - Return [`ConfigError::Deserialize`] if file content is invalid.
    /// - Return [`ConfigError::ShellExpansion`] if root paths cannot be
    ///   expanded.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        read_to_string(path.as_ref())
            .map_err(|err| ConfigError::ReadFile {
                source: err,
                path: path.as_ref().to_path_buf(),
            })?
            .parse()
    }

    /// Assemble mirror configuration from the process environment.
    ///
    /// Reads the following variables:
    ///
    /// - `SRC_SERVER_UUID`: name of source volume (required).
    /// - `DST_SERVER_UUID`: name of destination volume (required).
    /// - `SERVER_BASE_DIR`: directory holding the volumes, defaults to
    ///   [`DEFAULT_VOLUME_BASE_DIR`].
    /// - `KEEP_FILES`: comma-separated keep list.
    /// - `MIRROR_MATCH_MODE`: either "exact" or "descendants".
    ///
    /// # Errors
    ///
    /// - Return [`ConfigError::MissingVar`] if a required variable is unset or
    ///   empty.
    /// - Return [`ConfigError::InvalidMatchMode`] if match mode is unknown.
    pub fn from_env() -> Result<Self> {
        let src_uuid = required_var("SRC_SERVER_UUID")?;
        let dst_uuid = required_var("DST_SERVER_UUID")?;
        let base_dir = env::var("SERVER_BASE_DIR")
            .ok()
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| DEFAULT_VOLUME_BASE_DIR.into());
        let base_dir = PathBuf::from(base_dir);

        let keep = env::var("KEEP_FILES")
            .map(|value| KeepList::from_comma_separated(&value))
            .unwrap_or_default();
        let match_mode = match env::var("MIRROR_MATCH_MODE") {
            Ok(value) if !value.is_empty() => value.parse()?,
            _ => MatchMode::default(),
        };

        Ok(Self {
            source_root: base_dir.join(src_uuid),
            destination_root: base_dir.join(dst_uuid),
            keep,
            match_mode,
        })
    }
}

fn required_var(name: &'static str) -> Result<String> {
    match env::var(name) {
        Ok(value) if !value.is_empty() => Ok(value),
        _ => Err(ConfigError::MissingVar(name)),
    }
}

impl FromStr for MirrorConfig {
    type Err = ConfigError;

    fn from_str(data: &str) -> Result<Self, Self::Err> {
        let mut config: MirrorConfig =
            toml::de::from_str(data).map_err(ConfigError::Deserialize)?;

        // INVARIANT: Perform shell expansion on both roots.
        config.source_root = expand(&config.source_root)?;
        config.destination_root = expand(&config.destination_root)?;

        Ok(config)
    }
}

fn expand(path: &Path) -> Result<PathBuf> {
    Ok(PathBuf::from(
        shellexpand::full(path.to_string_lossy().as_ref())
            .map_err(ConfigError::ShellExpansion)?
            .into_owned(),
    ))
}

impl Display for MirrorConfig {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.write_str(
            toml::ser::to_string_pretty(self)
                .map_err(ConfigError::Serialize)?
                .as_str(),
        )
    }
}

/// Listing of paths to keep in the destination.
///
/// # Invariant
///
/// - Entries are trimmed.
/// - No blank entries.
/// - Order of entries is preserved.
#[derive(Default, Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct KeepList(Vec<String>);

impl KeepList {
    /// Construct new keep list, discarding blank entries.
    pub fn new(entries: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self(
            entries
                .into_iter()
                .map(Into::<String>::into)
                .map(|entry| entry.trim().to_owned())
                .filter(|entry| !entry.is_empty())
                .collect(),
        )
    }

    /// Construct keep list from comma-separated listing.
    pub fn from_comma_separated(listing: &str) -> Self {
        Self::new(listing.split(','))
    }

    /// Iterate through entries in order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if there are no entries.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<String>> for KeepList {
    fn from(entries: Vec<String>) -> Self {
        Self::new(entries)
    }
}

impl From<KeepList> for Vec<String> {
    fn from(keep: KeepList) -> Self {
        keep.0
    }
}

/// Matching semantics of keep list entries.
#[derive(Default, Debug, PartialEq, Eq, Clone, Copy, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
    /// Path is protected only if it is exactly a keep list entry.
    #[default]
    Exact,

    /// Path is protected if it is a keep list entry, or lies beneath one.
    Descendants,
}

impl FromStr for MatchMode {
    type Err = ConfigError;

    fn from_str(data: &str) -> Result<Self, Self::Err> {
        match data.trim() {
            "exact" => Ok(Self::Exact),
            "descendants" => Ok(Self::Descendants),
            other => Err(ConfigError::InvalidMatchMode(other.into())),
        }
    }
}

impl Display for MatchMode {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::Exact => fmt.write_str("exact"),
            Self::Descendants => fmt.write_str("descendants"),
        }
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to deserialize configuration.
    #[error(transparent)]
    Deserialize(#[from] toml::de::Error),

    /// Failed to serialize configuration.
    #[error(transparent)]
    Serialize(#[from] toml::ser::Error),

    /// Failed to perform shell expansion on configuration.
    #[error(transparent)]
    ShellExpansion(#[from] shellexpand::LookupError<std::env::VarError>),

    /// Required environment variable is unset or empty.
    #[error("no value found for environment variable {0}")]
    MissingVar(&'static str),

    /// Match mode is not recognized.
    #[error("unknown match mode {0:?}, expected \"exact\" or \"descendants\"")]
    InvalidMatchMode(String),

    /// Configuration file cannot be read.
    #[error("failed to read configuration file at {:?}", path.display())]
    ReadFile {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Configuration file cannot be written.
    #[error("failed to write configuration file at {:?}", path.display())]
    WriteFile {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },
}

impl From<ConfigError> for FmtError {
    fn from(_: ConfigError) -> Self {
        FmtError
    }
}

/// Friendly result alias :3
type Result<T, E = ConfigError> = std::result::Result<T, E>;
