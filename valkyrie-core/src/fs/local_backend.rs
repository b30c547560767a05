//! src/fs/local_backend.rs
//! ============================================================================
//! # LocalBackend: `file` URLs on the local filesystem
//!
//! Every operation runs on its own tokio task and reports through an
//! unbounded channel of [`BackendEvent`]s. Listings stream their entries in
//! batches so the dialog can show a large directory before it is read to
//! the end.
//!
//! Must be used from inside a tokio runtime.

use crate::dialog::backend::{BackendEvent, ListingBackend, ListingToken, OperationKind};
use crate::dialog::url::DialogUrl;
use crate::error::{DialogError, ErrorCode};
use crate::fs::url_info::UrlInfo;
use compact_str::CompactString;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// Entries per [`BackendEvent::BatchReady`].
pub const DEFAULT_BATCH_SIZE: usize = 64;

pub struct LocalBackend {
    tx: UnboundedSender<BackendEvent>,
    next_token: u64,
    cancel: CancellationToken,
    batch_size: usize,
}

impl LocalBackend {
    pub fn new() -> (Self, UnboundedReceiver<BackendEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let backend = Self {
            tx,
            next_token: 0,
            cancel: CancellationToken::new(),
            batch_size: DEFAULT_BATCH_SIZE,
        };
        (backend, rx)
    }

    #[must_use]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    fn local_dir(&self, dir: &DialogUrl, kind: OperationKind) -> Option<PathBuf> {
        let path = dir.to_local_path();
        if path.is_none() {
            let error = DialogError::UnsupportedScheme {
                scheme: CompactString::new(dir.scheme()),
            };
            let _ = self.tx.send(BackendEvent::OperationFailed { kind, error });
        }
        path
    }
}

impl ListingBackend for LocalBackend {
    fn start_listing(&mut self, url: &DialogUrl) -> ListingToken {
        self.next_token += 1;
        let token = ListingToken(self.next_token);

        self.cancel.cancel();
        self.cancel = CancellationToken::new();

        let Some(path) = url.to_local_path() else {
            let error = DialogError::UnsupportedScheme {
                scheme: CompactString::new(url.scheme()),
            };
            let _ = self.tx.send(BackendEvent::ListingFailed {
                token,
                code: ErrorCode::UnknownProtocol,
                detail: error.to_string(),
            });
            return token;
        };

        tokio::spawn(list_directory(
            path,
            token,
            self.batch_size,
            self.tx.clone(),
            self.cancel.clone(),
        ));
        token
    }

    fn rename(&mut self, dir: &DialogUrl, old: &str, new: &str) {
        let Some(path) = self.local_dir(dir, OperationKind::Rename) else {
            return;
        };
        tokio::spawn(rename_entry(
            dir.clone(),
            path,
            CompactString::new(old),
            CompactString::new(new),
            self.tx.clone(),
        ));
    }

    fn remove(&mut self, dir: &DialogUrl, name: &str) {
        let Some(path) = self.local_dir(dir, OperationKind::Remove) else {
            return;
        };
        tokio::spawn(remove_entry(
            dir.clone(),
            path,
            CompactString::new(name),
            self.tx.clone(),
        ));
    }

    fn make_dir(&mut self, dir: &DialogUrl, name: &str) {
        let Some(path) = self.local_dir(dir, OperationKind::MakeDir) else {
            return;
        };
        tokio::spawn(make_directory(
            dir.clone(),
            path,
            CompactString::new(name),
            self.tx.clone(),
        ));
    }

    fn stop(&mut self) {
        debug!(token = self.next_token, "Stopping listing");
        self.cancel.cancel();
    }

    fn stat(&self, dir: &DialogUrl, name: &str) -> Option<UrlInfo> {
        let base = dir.to_local_path()?;
        let (path, display) = if name.is_empty() {
            let own = if dir.is_root() { "/" } else { dir.file_name() };
            (base, own.to_string())
        } else {
            (base.join(name), name.to_string())
        };

        let link_meta = std::fs::symlink_metadata(&path).ok()?;
        let target = link_meta
            .file_type()
            .is_symlink()
            .then(|| std::fs::metadata(&path).ok())
            .flatten();
        Some(UrlInfo::from_metadata(&display, &link_meta, target.as_ref()))
    }
}

// ------------------------------------------------------------
// Tasks
// ------------------------------------------------------------

#[instrument(level = "debug", skip(tx, cancel))]
async fn list_directory(
    path: PathBuf,
    token: ListingToken,
    batch_size: usize,
    tx: UnboundedSender<BackendEvent>,
    cancel: CancellationToken,
) {
    let mut read_dir = match fs::read_dir(&path).await {
        Ok(read_dir) => read_dir,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Cannot open directory");
            report_failure(&tx, token, &path, Vec::new(), &e);
            return;
        }
    };

    let mut batch = Vec::with_capacity(batch_size);
    let mut total = 0usize;

    loop {
        let next = tokio::select! {
            biased;
            () = cancel.cancelled() => {
                debug!(total, "Listing cancelled");
                break;
            }
            next = read_dir.next_entry() => next,
        };

        match next {
            Ok(Some(entry)) => {
                let Some(info) = entry_info(&entry.path(), &entry.file_name().to_string_lossy()).await
                else {
                    continue;
                };
                batch.push(info);
                total += 1;

                if batch.len() >= batch_size {
                    let entries = std::mem::replace(&mut batch, Vec::with_capacity(batch_size));
                    if tx.send(BackendEvent::BatchReady { token, entries }).is_err() {
                        return;
                    }
                    tokio::task::yield_now().await;
                }
            }
            Ok(None) => break,
            Err(e) => {
                warn!(path = %path.display(), total, error = %e, "Directory read interrupted");
                report_failure(&tx, token, &path, batch, &e);
                return;
            }
        }
    }

    flush_batch(&tx, token, batch);
    info!(path = %path.display(), total, "Listing complete");
    let _ = tx.send(BackendEvent::ListingFinished { token });
}

fn flush_batch(tx: &UnboundedSender<BackendEvent>, token: ListingToken, batch: Vec<UrlInfo>) {
    if !batch.is_empty() {
        let _ = tx.send(BackendEvent::BatchReady { token, entries: batch });
    }
}

/// Ends a listing with an error. Entries read before it are still delivered.
fn report_failure(
    tx: &UnboundedSender<BackendEvent>,
    token: ListingToken,
    path: &Path,
    batch: Vec<UrlInfo>,
    e: &std::io::Error,
) {
    flush_batch(tx, token, batch);
    let error = DialogError::list_directory(path, e);
    let _ = tx.send(BackendEvent::ListingFailed {
        token,
        code: error.code(),
        detail: error.to_string(),
    });
}

/// Entry for `path`; symlinks are described by their target when it resolves.
async fn entry_info(path: &Path, name: &str) -> Option<UrlInfo> {
    let link_meta = match fs::symlink_metadata(path).await {
        Ok(meta) => meta,
        Err(e) => {
            debug!(path = %path.display(), error = %e, "Skipping unreadable entry");
            return None;
        }
    };
    let target = if link_meta.file_type().is_symlink() {
        fs::metadata(path).await.ok()
    } else {
        None
    };
    Some(UrlInfo::from_metadata(name, &link_meta, target.as_ref()))
}

#[instrument(level = "debug", skip(tx), fields(op_id = %nanoid::nanoid!(8)))]
async fn rename_entry(
    dir: DialogUrl,
    path: PathBuf,
    old: CompactString,
    new: CompactString,
    tx: UnboundedSender<BackendEvent>,
) {
    let from = path.join(old.as_str());
    let to = path.join(new.as_str());
    let event = match fs::rename(&from, &to).await {
        Ok(()) => {
            info!(%old, %new, "Renamed");
            BackendEvent::EntryRenamed { dir, old, new }
        }
        Err(e) => {
            warn!(from = %from.display(), to = %to.display(), error = %e, "Rename failed");
            BackendEvent::OperationFailed {
                kind: OperationKind::Rename,
                error: DialogError::rename(
                    from.to_string_lossy().as_ref(),
                    to.to_string_lossy().as_ref(),
                    &e,
                ),
            }
        }
    };
    let _ = tx.send(event);
}

#[instrument(level = "debug", skip(tx), fields(op_id = %nanoid::nanoid!(8)))]
async fn remove_entry(
    dir: DialogUrl,
    path: PathBuf,
    name: CompactString,
    tx: UnboundedSender<BackendEvent>,
) {
    let path = path.join(name.as_str());
    let result = match fs::symlink_metadata(&path).await {
        Ok(meta) if meta.is_dir() => fs::remove_dir(&path).await,
        Ok(_) => fs::remove_file(&path).await,
        Err(e) => Err(e),
    };
    let event = match result {
        Ok(()) => {
            info!(path = %path.display(), "Removed");
            BackendEvent::EntryRemoved { dir, name }
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Remove failed");
            BackendEvent::OperationFailed {
                kind: OperationKind::Remove,
                error: DialogError::remove(&path, &e),
            }
        }
    };
    let _ = tx.send(event);
}

#[instrument(level = "debug", skip(tx), fields(op_id = %nanoid::nanoid!(8)))]
async fn make_directory(
    dir: DialogUrl,
    path: PathBuf,
    name: CompactString,
    tx: UnboundedSender<BackendEvent>,
) {
    let path = path.join(name.as_str());
    let event = match fs::create_dir(&path).await {
        Ok(()) => {
            info!(path = %path.display(), "Directory created");
            let info = entry_info(&path, &name)
                .await
                .unwrap_or_else(|| UrlInfo::dir(&name));
            BackendEvent::DirectoryCreated { dir, info }
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Cannot create directory");
            BackendEvent::OperationFailed {
                kind: OperationKind::MakeDir,
                error: DialogError::make_directory(&path, &e),
            }
        }
    };
    let _ = tx.send(event);
}
