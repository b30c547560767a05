//! src/error.rs
//! ============================================================================
//! # Error Types for the Dialog Engine and Front-End
//!
//! `DialogError` describes failed backend operations and travels inside
//! backend events; `ErrorCode` classifies listing failures so the dialog can
//! decide whether to roll back. `AppError` is the binary's top-level error.

use compact_str::CompactString;
use std::{io, path::PathBuf};
use thiserror::Error;
use vkconfig::ConfigError;

/// Failure classes reported by a listing backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// The URL could not be parsed.
    Parse,
    /// The URL is syntactically fine but does not name a listable location.
    Invalid,
    /// The children of the location could not be read.
    ListChildren,
    HostNotFound,
    UnknownProtocol,
    LoginIncorrect,
    FileNotExisting,
    PermissionDenied,
    AlreadyExists,
    /// Anything the backend cannot classify.
    Other,
}

impl ErrorCode {
    /// Listing failures after which the dialog returns to the previous URL.
    pub fn is_recoverable(self) -> bool {
        matches!(
            self,
            ErrorCode::Parse
                | ErrorCode::Invalid
                | ErrorCode::ListChildren
                | ErrorCode::HostNotFound
                | ErrorCode::UnknownProtocol
                | ErrorCode::LoginIncorrect
                | ErrorCode::FileNotExisting
        )
    }

    /// Maps an I/O failure onto the closest listing failure class.
    pub fn from_io(kind: io::ErrorKind) -> Self {
        match kind {
            io::ErrorKind::NotFound => ErrorCode::FileNotExisting,
            io::ErrorKind::PermissionDenied => ErrorCode::ListChildren,
            io::ErrorKind::NotADirectory | io::ErrorKind::InvalidInput => ErrorCode::Invalid,
            io::ErrorKind::AlreadyExists => ErrorCode::AlreadyExists,
            _ => ErrorCode::Other,
        }
    }
}

/// A backend operation that did not complete.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DialogError {
    #[error("Could not read directory\n{path}")]
    ListDirectory { path: PathBuf, code: ErrorCode },

    #[error("Could not rename\n{from}\nto\n{to}")]
    Rename {
        from: CompactString,
        to: CompactString,
        code: ErrorCode,
    },

    #[error("Could not remove file or directory\n{path}")]
    Remove { path: PathBuf, code: ErrorCode },

    #[error("Could not create directory\n{path}")]
    MakeDirectory { path: PathBuf, code: ErrorCode },

    #[error("Unknown protocol: {scheme}")]
    UnsupportedScheme { scheme: CompactString },

    #[error("Malformed URL: {url}")]
    MalformedUrl { url: String },
}

impl DialogError {
    pub fn list_directory<P: Into<PathBuf>>(path: P, err: &io::Error) -> Self {
        Self::ListDirectory {
            path: path.into(),
            code: ErrorCode::from_io(err.kind()),
        }
    }

    pub fn rename<S1, S2>(from: S1, to: S2, err: &io::Error) -> Self
    where
        S1: Into<CompactString>,
        S2: Into<CompactString>,
    {
        Self::Rename {
            from: from.into(),
            to: to.into(),
            code: ErrorCode::from_io(err.kind()),
        }
    }

    pub fn remove<P: Into<PathBuf>>(path: P, err: &io::Error) -> Self {
        Self::Remove {
            path: path.into(),
            code: ErrorCode::from_io(err.kind()),
        }
    }

    pub fn make_directory<P: Into<PathBuf>>(path: P, err: &io::Error) -> Self {
        Self::MakeDirectory {
            path: path.into(),
            code: ErrorCode::from_io(err.kind()),
        }
    }

    /// Failure class carried by this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            DialogError::ListDirectory { code, .. }
            | DialogError::Rename { code, .. }
            | DialogError::Remove { code, .. }
            | DialogError::MakeDirectory { code, .. } => *code,
            DialogError::UnsupportedScheme { .. } => ErrorCode::UnknownProtocol,
            DialogError::MalformedUrl { .. } => ErrorCode::Parse,
        }
    }
}

/// Top-level error of the `valkyrie` binary.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Startup of the settings store failed.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Logging setup failed: {0}")]
    Logging(String),

    #[error("Terminal error: {0}")]
    Terminal(String),

    #[error("Invalid input: {field} - {message}")]
    InvalidInput { field: String, message: String },
}

impl AppError {
    pub fn invalid_input<S1: Into<String>, S2: Into<String>>(field: S1, message: S2) -> Self {
        Self::InvalidInput {
            field: field.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listing_failures_that_roll_back() {
        for code in [
            ErrorCode::Parse,
            ErrorCode::Invalid,
            ErrorCode::ListChildren,
            ErrorCode::HostNotFound,
            ErrorCode::UnknownProtocol,
            ErrorCode::LoginIncorrect,
            ErrorCode::FileNotExisting,
        ] {
            assert!(code.is_recoverable(), "{code:?}");
        }
        assert!(!ErrorCode::PermissionDenied.is_recoverable());
        assert!(!ErrorCode::Other.is_recoverable());
    }

    #[test]
    fn io_errors_map_to_codes() {
        let err = io::Error::from(io::ErrorKind::NotFound);
        let dialog_err = DialogError::list_directory("/nowhere", &err);
        assert_eq!(dialog_err.code(), ErrorCode::FileNotExisting);
        assert_eq!(dialog_err.to_string(), "Could not read directory\n/nowhere");
    }
}
