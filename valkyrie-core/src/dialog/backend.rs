//! src/dialog/backend.rs
//! ============================================================================
//! # Listing backend seam
//!
//! The dialog never touches a filesystem directly. It issues operations
//! through [`ListingBackend`] and receives their results later as
//! [`BackendEvent`]s, applied in arrival order by whoever runs the dialog.
//!
//! Listing results carry the [`ListingToken`] handed out when the listing was
//! started; the dialog ignores results for any token but the newest one.

use crate::dialog::url::DialogUrl;
use crate::error::{DialogError, ErrorCode};
use crate::fs::url_info::UrlInfo;
use compact_str::CompactString;
use std::fmt;

/// Identifies one listing operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListingToken(pub u64);

impl fmt::Display for ListingToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Non-listing operations whose failure is reported back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    Rename,
    Remove,
    MakeDir,
    Put,
}

impl OperationKind {
    pub fn name(self) -> &'static str {
        match self {
            OperationKind::Rename => "rename",
            OperationKind::Remove => "remove",
            OperationKind::MakeDir => "mkdir",
            OperationKind::Put => "put",
        }
    }
}

/// Asynchronous results and notifications from a backend.
#[derive(Debug, Clone, PartialEq)]
pub enum BackendEvent {
    /// A batch of children of the listed directory.
    BatchReady {
        token: ListingToken,
        entries: Vec<UrlInfo>,
    },

    ListingFinished {
        token: ListingToken,
    },

    ListingFailed {
        token: ListingToken,
        code: ErrorCode,
        detail: String,
    },

    /// `dir` is the directory the operation was issued in; the dialog
    /// drops these notifications once it has moved elsewhere.
    EntryRemoved {
        dir: DialogUrl,
        name: CompactString,
    },

    EntryRenamed {
        dir: DialogUrl,
        old: CompactString,
        new: CompactString,
    },

    DirectoryCreated {
        dir: DialogUrl,
        info: UrlInfo,
    },

    TransferProgress {
        url: DialogUrl,
        done: u64,
        total: u64,
    },

    OperationFailed {
        kind: OperationKind,
        error: DialogError,
    },
}

/// Protocol-specific listing and file operations.
///
/// Operations return immediately; outcomes arrive as [`BackendEvent`]s.
/// `stat` is the only synchronous query and may return `None` when the
/// backend cannot answer without a round trip.
pub trait ListingBackend {
    /// Starts listing the children of `url`.
    fn start_listing(&mut self, url: &DialogUrl) -> ListingToken;

    fn rename(&mut self, dir: &DialogUrl, old: &str, new: &str);

    fn remove(&mut self, dir: &DialogUrl, name: &str);

    fn make_dir(&mut self, dir: &DialogUrl, name: &str);

    /// Asks running listings to stop producing batches. Advisory.
    fn stop(&mut self);

    /// Entry `name` inside `dir`, or the directory itself for an empty name.
    fn stat(&self, dir: &DialogUrl, name: &str) -> Option<UrlInfo>;
}
