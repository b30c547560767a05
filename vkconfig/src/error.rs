//! Error types for the configuration store.
//!
//! Absent keys are not errors: lookups return `Option`/sentinels and emit a
//! `debug!` diagnostic. Everything here is a startup or I/O failure the caller
//! has to decide on.

use compact_str::CompactString;
use std::io::ErrorKind;
use std::path::Path;
use thiserror::Error;

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Could not determine the user's home directory")]
    NoHomeDir,

    #[error("Invalid configuration filename: {path}")]
    BadFilename { path: CompactString },

    #[error("Configuration directory {path} does not exist")]
    NoDirectory { path: CompactString },

    #[error(
        "There is a problem with '{path}': {reason}. Either some files or \
         sub-directories do not exist, or the permissions are not set correctly"
    )]
    DirectoryTree {
        path: CompactString,
        reason: CompactString,
    },

    #[error("You do not have read/write permissions set on the directory {path}")]
    NoPermission { path: CompactString },

    #[error("Initialisation of {path} failed after {attempts} attempts")]
    RetriesExhausted { path: CompactString, attempts: u32 },

    #[error("Failed to read {path}: {kind:?}")]
    Read { path: CompactString, kind: ErrorKind },

    #[error("Failed to write {path}: {kind:?}")]
    Write { path: CompactString, kind: ErrorKind },

    #[error("Failed to delete stale {path}: {kind:?}")]
    Remove { path: CompactString, kind: ErrorKind },

    #[error("Object '{name}' (id {id}) clashes with an already registered object")]
    DuplicateObject { name: CompactString, id: usize },
}

impl ConfigError {
    /// True for failures that must stop the application before any window is
    /// shown.
    #[inline]
    pub fn is_fatal_startup(&self) -> bool {
        !matches!(self, ConfigError::DuplicateObject { .. })
    }

    #[inline]
    pub fn read(path: &Path, err: std::io::Error) -> Self {
        Self::Read {
            path: CompactString::from(path.to_string_lossy()),
            kind: err.kind(),
        }
    }

    #[inline]
    pub fn write(path: &Path, err: std::io::Error) -> Self {
        Self::Write {
            path: CompactString::from(path.to_string_lossy()),
            kind: err.kind(),
        }
    }

    #[inline]
    pub fn remove(path: &Path, err: std::io::Error) -> Self {
        Self::Remove {
            path: CompactString::from(path.to_string_lossy()),
            kind: err.kind(),
        }
    }

    #[inline]
    pub fn directory_tree(path: &Path, reason: impl Into<CompactString>) -> Self {
        Self::DirectoryTree {
            path: CompactString::from(path.to_string_lossy()),
            reason: reason.into(),
        }
    }

    #[inline]
    pub fn no_permission(path: &Path) -> Self {
        Self::NoPermission {
            path: CompactString::from(path.to_string_lossy()),
        }
    }
}
