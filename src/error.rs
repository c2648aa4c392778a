// src/error.rs

//! Crate-wide error type and result alias.
//!
//! Unresolvable dependency conflicts are deliberately NOT represented here:
//! they are an expected, human-actionable outcome and travel alongside the
//! successful results as [`crate::resolver::UnResolvable`] records.

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// A `-c`/`-r` directive references a file absent from the file system,
    /// or the resolution loop stalled with unresolved files remaining.
    /// Fatal for the venv's run.
    #[error("missing requirements file(s); unable to resolve directives. {0}")]
    MissingRequirementsFile(String),

    /// A requirement line carries more than two version comparisons or uses
    /// the `~=` compatible-release operator. Raised rather than approximated.
    #[error("unsupported specifier shape for package {pkg_name}: {detail}")]
    UnsupportedSpecifier { pkg_name: String, detail: String },

    #[error("failed to parse version {input:?}: {reason}")]
    VersionParse { input: String, reason: String },

    #[error("path {path:?} has no recognized requirements suffix (.in, .unlock, .lock)")]
    UnrecognizedSuffix { path: PathBuf },

    #[error("failed to read venv map {path:?}: {source}")]
    VenvMapRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse venv map {path:?}: {source}")]
    VenvMapParse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("no [[tool.venvs]] entry for venv {0:?}")]
    UnknownVenv(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
