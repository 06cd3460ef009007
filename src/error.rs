//! Error types shared by the walker, the platform layer and the CLI

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::kind::StatKind;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Error, Debug)]
pub enum Error {
    // Configuration
    #[error("cannot access '{}': {source}", path.display())]
    RootInaccessible {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("'{}' is not a directory", .0.display())]
    NotADirectory(PathBuf),

    #[error("{0} statistics are not supported on this platform")]
    UnsupportedStat(StatKind),

    #[error("resolving owner names is not supported on this platform")]
    OwnerNamesUnsupported,

    #[error("invalid exclude pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },

    #[error("failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    // Per-entry
    #[error("cannot read directory '{}': {source}", path.display())]
    ReadDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot count lines in '{}': {source}", path.display())]
    LineCount {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot stat '{}': {source}", path.display())]
    Stat {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl Error {
    /// The path this error occurred at, if applicable.
    pub fn path(&self) -> Option<&PathBuf> {
        match self {
            Self::RootInaccessible { path, .. }
            | Self::ReadDir { path, .. }
            | Self::LineCount { path, .. }
            | Self::Stat { path, .. } => Some(path),
            Self::NotADirectory(path) => Some(path),
            _ => None,
        }
    }

    /// Whether the walk can continue after this error.
    ///
    /// Recoverable errors are isolated to one entry and collected into the
    /// walk report. Everything else stops the run before any output.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::ReadDir { .. } | Self::LineCount { .. } | Self::Stat { .. }
        )
    }
}
