//! `src/fs/url_info.rs`
//! ============================================================
//! One entry of a directory listing, independent of the backend that
//! produced it.
//!
//! The dialog only needs the name, the kind bits, size, mtime and the
//! read/write permission of the *current user*; everything else a backend
//! might know stays in the backend.

use std::fs::Metadata;
use std::time::SystemTime;

use bytesize::ByteSize;
use chrono::{DateTime, Local};
use compact_str::CompactString;

/// Name of the synthetic parent entry.
pub const PARENT_ENTRY: &str = "..";

/// Name of the self entry some backends report; always dropped.
pub const SELF_ENTRY: &str = ".";

// ------------------------------------------------------------
// UrlInfo: listing entry
// ------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlInfo {
    pub name: CompactString,
    pub size: u64,
    pub modified: Option<SystemTime>,
    pub is_dir: bool,
    pub is_file: bool,
    pub is_symlink: bool,
    pub readable: bool,
    pub writable: bool,
}

impl UrlInfo {
    /// Plain readable/writable regular file.
    pub fn file(name: &str, size: u64) -> Self {
        Self {
            name: CompactString::new(name),
            size,
            modified: None,
            is_dir: false,
            is_file: true,
            is_symlink: false,
            readable: true,
            writable: true,
        }
    }

    /// Plain readable/writable directory.
    pub fn dir(name: &str) -> Self {
        Self {
            is_dir: true,
            is_file: false,
            ..Self::file(name, 0)
        }
    }

    /// The `..` entry the dialog inserts when a backend did not send one.
    pub fn parent_entry() -> Self {
        Self::dir(PARENT_ENTRY)
    }

    /// Builds an entry from `lstat` metadata plus, for symlinks, the
    /// metadata of the link target (if it resolves).
    pub fn from_metadata(name: &str, link_meta: &Metadata, target: Option<&Metadata>) -> Self {
        let is_symlink = link_meta.file_type().is_symlink();
        let meta = if is_symlink {
            target.unwrap_or(link_meta)
        } else {
            link_meta
        };

        let (readable, writable) = access_bits(meta);

        Self {
            name: CompactString::new(name),
            size: meta.len(),
            modified: meta.modified().ok(),
            is_dir: meta.is_dir(),
            is_file: meta.is_file(),
            is_symlink,
            readable,
            writable,
        }
    }

    #[must_use]
    pub fn with_modified(mut self, modified: SystemTime) -> Self {
        self.modified = Some(modified);
        self
    }

    #[must_use]
    pub fn with_access(mut self, readable: bool, writable: bool) -> Self {
        self.readable = readable;
        self.writable = writable;
        self
    }

    #[must_use]
    pub fn with_symlink(mut self, is_symlink: bool) -> Self {
        self.is_symlink = is_symlink;
        self
    }

    pub fn is_parent_entry(&self) -> bool {
        self.name == PARENT_ENTRY
    }

    pub fn is_hidden(&self) -> bool {
        self.name.starts_with('.') && !self.is_parent_entry()
    }

    // --------------------------------------------------------
    // Detail view columns
    // --------------------------------------------------------

    /// Size column: byte count for files, blank otherwise.
    pub fn size_text(&self) -> String {
        if self.is_file {
            self.size.to_string()
        } else {
            String::new()
        }
    }

    /// Human readable size for the status line.
    pub fn human_size(&self) -> String {
        ByteSize::b(self.size).to_string()
    }

    /// Type column.
    pub fn kind_text(&self) -> &'static str {
        match (self.is_symlink, self.is_file, self.is_dir) {
            (false, true, _) => "File",
            (false, _, true) => "Dir",
            (false, _, _) => "Special",
            (true, true, _) => "Symlink to File",
            (true, _, true) => "Symlink to Directory",
            (true, _, _) => "Symlink to Special",
        }
    }

    /// Date column in local time.
    pub fn date_text(&self) -> String {
        self.modified
            .map(|t| DateTime::<Local>::from(t).format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_default()
    }

    /// Attributes column.
    pub fn access_text(&self) -> &'static str {
        match (self.readable, self.writable) {
            (true, true) => "Read-write",
            (true, false) => "Read-only",
            (false, true) => "Write-only",
            (false, false) => "Inaccessible",
        }
    }

    /// Word used in the delete confirmation.
    pub fn kind_word(&self) -> &'static str {
        if self.is_symlink {
            "symlink"
        } else if self.is_dir {
            "directory"
        } else {
            "file"
        }
    }
}

#[cfg(unix)]
fn access_bits(meta: &Metadata) -> (bool, bool) {
    use std::os::unix::fs::PermissionsExt;
    let mode = meta.permissions().mode();
    (mode & 0o444 != 0, mode & 0o222 != 0)
}

#[cfg(not(unix))]
fn access_bits(meta: &Metadata) -> (bool, bool) {
    (true, !meta.permissions().readonly())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn columns_for_plain_entries() {
        let file = UrlInfo::file("notes.txt", 1234);
        assert_eq!(file.size_text(), "1234");
        assert_eq!(file.kind_text(), "File");
        assert_eq!(file.access_text(), "Read-write");

        let dir = UrlInfo::dir("src");
        assert_eq!(dir.size_text(), "");
        assert_eq!(dir.kind_text(), "Dir");
        assert_eq!(dir.kind_word(), "directory");
    }

    #[test]
    fn symlink_and_access_labels() {
        let link = UrlInfo::dir("lib").with_symlink(true).with_access(true, false);
        assert_eq!(link.kind_text(), "Symlink to Directory");
        assert_eq!(link.access_text(), "Read-only");
        assert_eq!(link.kind_word(), "symlink");

        let locked = UrlInfo::file("secret", 0).with_access(false, false);
        assert_eq!(locked.access_text(), "Inaccessible");
    }

    #[test]
    fn hidden_excludes_parent_entry() {
        assert!(UrlInfo::file(".bashrc", 10).is_hidden());
        assert!(!UrlInfo::parent_entry().is_hidden());
        assert!(UrlInfo::parent_entry().is_parent_entry());
    }

    #[test]
    fn built_from_disk_metadata() {
        let tmp = TempDir::new().expect("tempdir");
        let path = tmp.path().join("data.bin");
        fs::write(&path, [0u8; 16]).expect("write");

        let meta = fs::symlink_metadata(&path).expect("stat");
        let info = UrlInfo::from_metadata("data.bin", &meta, None);
        assert!(info.is_file);
        assert!(!info.is_dir);
        assert_eq!(info.size, 16);
        assert!(info.modified.is_some());
        assert!(!info.date_text().is_empty());
    }
}
