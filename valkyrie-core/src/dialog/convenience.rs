//! src/dialog/convenience.rs
//! ============================================================================
//! # One-call dialogs
//!
//! `get_*` build a [`FileDialog`] for the common cases, run it modally
//! through a [`DialogRunner`] and return what the user committed. An
//! accepted dialog stores its directory as the session's working directory,
//! so the next dialog opens where this one ended.

use crate::dialog::backend::ListingBackend;
use crate::dialog::file_dialog::{DialogCode, FileDialog, Mode};
use crate::dialog::session::SharedSession;
use crate::dialog::url::DialogUrl;
use crate::error::AppError;
use tracing::info;

/// Runs a dialog until it is accepted or rejected.
#[allow(async_fn_in_trait)]
pub trait DialogRunner {
    async fn exec(&mut self, dialog: &mut FileDialog) -> Result<DialogCode, AppError>;
}

/// Optional seeds for a convenience dialog.
#[derive(Debug, Clone, Default)]
pub struct DialogRequest {
    /// Start directory, or a file to preselect.
    pub start: Option<String>,
    /// `;;`-separated filter labels.
    pub filter: Option<String>,
    pub selected_filter: Option<String>,
    pub caption: Option<String>,
}

impl DialogRequest {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn start(mut self, start: impl Into<String>) -> Self {
        self.start = Some(start.into());
        self
    }

    #[must_use]
    pub fn filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    #[must_use]
    pub fn selected_filter(mut self, label: impl Into<String>) -> Self {
        self.selected_filter = Some(label.into());
        self
    }

    #[must_use]
    pub fn caption(mut self, caption: impl Into<String>) -> Self {
        self.caption = Some(caption.into());
        self
    }
}

/// An existing file, or `None` when cancelled.
pub async fn get_open_file_name<R: DialogRunner>(
    runner: &mut R,
    backend: Box<dyn ListingBackend>,
    session: &SharedSession,
    request: &DialogRequest,
) -> Result<Option<String>, AppError> {
    let mut dialog = build(backend, session, request, Mode::ExistingFile, "Open");
    Ok(run(runner, &mut dialog, session)
        .await?
        .then(|| dialog.selected_file()))
}

/// A file name to save to, or `None` when cancelled.
pub async fn get_save_file_name<R: DialogRunner>(
    runner: &mut R,
    backend: Box<dyn ListingBackend>,
    session: &SharedSession,
    request: &DialogRequest,
) -> Result<Option<String>, AppError> {
    let mut dialog = build(backend, session, request, Mode::AnyFile, "Save As");
    Ok(run(runner, &mut dialog, session)
        .await?
        .then(|| dialog.selected_file()))
}

/// Existing files; empty when cancelled.
pub async fn get_open_file_names<R: DialogRunner>(
    runner: &mut R,
    backend: Box<dyn ListingBackend>,
    session: &SharedSession,
    request: &DialogRequest,
) -> Result<Vec<String>, AppError> {
    let mut dialog = build(backend, session, request, Mode::ExistingFiles, "Open");
    if run(runner, &mut dialog, session).await? {
        Ok(dialog.selected_files())
    } else {
        Ok(Vec::new())
    }
}

/// A directory, or `None` when cancelled. With `dirs_only` files are not
/// listed at all.
pub async fn get_existing_directory<R: DialogRunner>(
    runner: &mut R,
    backend: Box<dyn ListingBackend>,
    session: &SharedSession,
    request: &DialogRequest,
    dirs_only: bool,
) -> Result<Option<String>, AppError> {
    let mode = if dirs_only {
        Mode::DirectoryOnly
    } else {
        Mode::Directory
    };
    let mut dialog = build(backend, session, request, mode, "Find Directory");
    Ok(run(runner, &mut dialog, session)
        .await?
        .then(|| dialog.selected_file()))
}

fn build(
    backend: Box<dyn ListingBackend>,
    session: &SharedSession,
    request: &DialogRequest,
    mode: Mode,
    caption: &str,
) -> FileDialog {
    let working = session.borrow().working_dir.clone();
    let dir = working.unwrap_or_else(current_dir);

    let mut dialog = FileDialog::new(backend, session.clone(), Some(dir));
    dialog.set_mode(mode);
    dialog.set_caption(request.caption.as_deref().unwrap_or(caption));

    if !mode.is_directory_mode() {
        if let Some(filter) = request.filter.as_deref().filter(|f| !f.is_empty()) {
            dialog.set_filters_str(filter);
        }
        if let Some(label) = request.selected_filter.as_deref() {
            dialog.set_filter(label);
        }
    }
    if let Some(start) = request.start.as_deref().filter(|s| !s.is_empty()) {
        dialog.set_selection(start);
    }
    dialog
}

async fn run<R: DialogRunner>(
    runner: &mut R,
    dialog: &mut FileDialog,
    session: &SharedSession,
) -> Result<bool, AppError> {
    let code = runner.exec(dialog).await?;
    info!(?code, mode = ?dialog.mode(), "Dialog closed");
    if code == DialogCode::Accepted {
        session.borrow_mut().working_dir = Some(dialog.url().clone());
        Ok(true)
    } else {
        Ok(false)
    }
}

fn current_dir() -> DialogUrl {
    std::env::current_dir()
        .map(DialogUrl::local)
        .unwrap_or_default()
}
