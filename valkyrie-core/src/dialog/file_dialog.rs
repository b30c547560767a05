//! src/dialog/file_dialog.rs
//! ============================================================================
//! # FileDialog: the dialog state machine
//!
//! Owns the listing, both view projections, navigation state, the name line
//! and the rename controller, and reacts to two kinds of input:
//!
//! * user operations (press, double click, typing, OK, context actions),
//!   called by whatever front-end displays the dialog;
//! * [`BackendEvent`]s, fed in arrival order by the same front-end.
//!
//! Outcomes leave the dialog as [`DialogSignal`]s (drained with
//! [`FileDialog::take_signals`]) and as the final [`DialogCode`].
//!
//! The dialog is single-threaded by construction (`Rc` session handle) and
//! must only be mutated from the task running the front-end.

use crate::dialog::backend::{BackendEvent, ListingBackend};
use crate::dialog::filter::{self, FilterList};
use crate::dialog::navigation::NavigationState;
use crate::dialog::projection::{ViewKind, ViewProjection};
use crate::dialog::rename::{PressContext, RenameController, RenameState};
use crate::dialog::session::SharedSession;
use crate::dialog::sorted_list::{SortKey, SortSpec, SortedEntryList};
use crate::dialog::url::DialogUrl;
use crate::error::ErrorCode;
use crate::fs::url_info::{PARENT_ENTRY, SELF_ENTRY, UrlInfo};
use compact_str::CompactString;
use std::collections::VecDeque;
use std::time::Instant;
use tracing::{debug, info, warn};

// ------------------------------------------------------------
// Public vocabulary
// ------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Any file name, existing or not (save dialogs).
    AnyFile,
    /// A single existing file.
    #[default]
    ExistingFile,
    /// A directory; files are shown but cannot be selected.
    Directory,
    /// Zero or more existing files.
    ExistingFiles,
    /// A directory; files are not listed at all.
    DirectoryOnly,
}

impl Mode {
    pub fn is_directory_mode(self) -> bool {
        matches!(self, Mode::Directory | Mode::DirectoryOnly)
    }

    /// Whether an entry may be selected in this mode.
    pub fn can_select(self, info: &UrlInfo) -> bool {
        match self {
            Mode::ExistingFiles => !info.is_dir,
            Mode::Directory | Mode::DirectoryOnly => info.is_dir,
            Mode::AnyFile | Mode::ExistingFile => true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogCode {
    Accepted,
    Rejected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageLevel {
    Info,
    Warning,
    Error,
}

/// Notifications for whoever embeds the dialog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DialogSignal {
    FileSelected(String),
    FilesSelected(Vec<String>),
    /// The selection moved to another file (preview hook).
    FileHighlighted(String),
    FilterSelected(String),
    DirEntered(String),
    Message {
        level: MessageLevel,
        title: String,
        text: String,
    },
}

/// A yes/no question waiting for [`FileDialog::answer_query`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Query {
    Delete {
        name: CompactString,
        title: String,
        text: String,
    },
}

impl Query {
    pub fn title(&self) -> &str {
        match self {
            Query::Delete { title, .. } => title,
        }
    }

    pub fn text(&self) -> &str {
        match self {
            Query::Delete { text, .. } => text,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PopupAction {
    Open,
    Rename,
    Delete,
    Reload,
    ToggleHidden,
    SortName,
    SortSize,
    SortDate,
    SortNone,
}

/// State of the context menu for one entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextMenu {
    pub open_label: &'static str,
    pub open_enabled: bool,
    pub rename_enabled: bool,
    pub delete_enabled: bool,
    pub show_hidden: bool,
    pub sort: SortKey,
}

impl ContextMenu {
    /// Menu lines in display order: action, label, enabled, checked.
    pub fn items(&self) -> Vec<(PopupAction, &'static str, bool, bool)> {
        vec![
            (PopupAction::Open, self.open_label, self.open_enabled, false),
            (PopupAction::Rename, "Rename", self.rename_enabled, false),
            (PopupAction::Delete, "Delete", self.delete_enabled, false),
            (PopupAction::SortName, "Sort by Name", true, self.sort == SortKey::Name),
            (PopupAction::SortSize, "Sort by Size", true, self.sort == SortKey::Size),
            (PopupAction::SortDate, "Sort by Date", true, self.sort == SortKey::Date),
            (PopupAction::SortNone, "Unsorted", true, self.sort == SortKey::Unsorted),
            (PopupAction::Reload, "Reload", true, false),
            (PopupAction::ToggleHidden, "Show hidden files", true, self.show_hidden),
        ]
    }
}

/// Editable file name line with an optional auto-completed tail.
#[derive(Debug, Clone, Default)]
struct NameLine {
    text: String,
    /// Byte offset where the auto-completed (selected) tail starts.
    cursor: usize,
}

impl NameLine {
    fn set(&mut self, text: &str) {
        self.text = text.to_string();
        self.cursor = self.text.len();
    }

    fn clear(&mut self) {
        self.set("");
    }

    fn has_completion(&self) -> bool {
        self.cursor < self.text.len()
    }
}

// ------------------------------------------------------------
// FileDialog
// ------------------------------------------------------------

pub struct FileDialog {
    backend: Box<dyn ListingBackend>,
    session: SharedSession,
    mode: Mode,
    caption: String,

    nav: NavigationState,
    list: SortedEntryList,
    views: ViewProjection,
    active_view: ViewKind,
    rename: RenameController,
    filters: FilterList,
    name: NameLine,

    current_file: Option<String>,
    current_dir_info: Option<UrlInfo>,
    pending_selection: Option<CompactString>,
    check_for_filter: bool,
    had_dot_dot: bool,
    busy: bool,
    progress: Option<(String, u64, u64)>,
    sort_column: usize,

    signals: VecDeque<DialogSignal>,
    query: Option<Query>,
    result: Option<DialogCode>,
}

impl FileDialog {
    /// Opens a dialog on `dir`, or on the session's working directory, and
    /// starts listing it.
    pub fn new(
        backend: Box<dyn ListingBackend>,
        session: SharedSession,
        dir: Option<DialogUrl>,
    ) -> Self {
        let (start, sort, detail) = {
            let s = session.borrow();
            let start = dir
                .or_else(|| s.working_dir.clone())
                .unwrap_or_default();
            (start, s.sort, s.detail_view)
        };

        let mut dialog = Self {
            backend,
            session,
            mode: Mode::default(),
            caption: "Open".to_string(),
            nav: NavigationState::new(start),
            list: SortedEntryList::new(),
            views: ViewProjection::new(),
            active_view: if detail { ViewKind::Detail } else { ViewKind::Compact },
            rename: RenameController::new(),
            filters: FilterList::new(),
            name: NameLine::default(),
            current_file: None,
            current_dir_info: None,
            pending_selection: None,
            check_for_filter: false,
            had_dot_dot: false,
            busy: false,
            progress: None,
            sort_column: sort.key.column(),
            signals: VecDeque::new(),
            query: None,
            result: None,
        };
        dialog.reread_dir();
        dialog
    }

    // --------------------------------------------------------
    // Accessors
    // --------------------------------------------------------

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn caption(&self) -> &str {
        &self.caption
    }

    pub fn set_caption(&mut self, caption: &str) {
        self.caption = caption.to_string();
    }

    /// Label of the commit button for the current mode.
    pub fn ok_label(&self) -> &'static str {
        match self.mode {
            Mode::Directory | Mode::DirectoryOnly => "OK",
            Mode::AnyFile => "Save",
            Mode::ExistingFile | Mode::ExistingFiles => "Open",
        }
    }

    pub fn url(&self) -> &DialogUrl {
        self.nav.current()
    }

    pub fn navigation(&self) -> &NavigationState {
        &self.nav
    }

    pub fn entries(&self) -> &SortedEntryList {
        &self.list
    }

    pub fn views(&self) -> &ViewProjection {
        &self.views
    }

    /// Listing entry shown at `row` of `view`.
    pub fn entry(&self, view: ViewKind, row: usize) -> Option<&UrlInfo> {
        self.views
            .entry_at(view, row)
            .and_then(|index| self.list.get(index))
    }

    pub fn active_view(&self) -> ViewKind {
        self.active_view
    }

    pub fn set_active_view(&mut self, view: ViewKind) {
        self.active_view = view;
        self.session.borrow_mut().detail_view = view == ViewKind::Detail;
    }

    pub fn current_row(&self) -> Option<usize> {
        self.views.current(self.active_view)
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    pub fn name_text(&self) -> &str {
        &self.name.text
    }

    /// Start of the auto-completed tail of the name line, if any.
    pub fn name_completion(&self) -> Option<usize> {
        self.name.has_completion().then_some(self.name.cursor)
    }

    pub fn filters(&self) -> &FilterList {
        &self.filters
    }

    pub fn selected_filter(&self) -> &str {
        self.filters.selected_label()
    }

    pub fn rename_state(&self) -> &RenameState {
        self.rename.state()
    }

    pub fn query(&self) -> Option<&Query> {
        self.query.as_ref()
    }

    pub fn result(&self) -> Option<DialogCode> {
        self.result
    }

    pub fn sort_spec(&self) -> SortSpec {
        self.session.borrow().sort
    }

    pub fn show_hidden(&self) -> bool {
        self.session.borrow().show_hidden
    }

    pub fn session(&self) -> &SharedSession {
        &self.session
    }

    /// Progress line of a running transfer: `path` for local URLs,
    /// `path (on host)` otherwise.
    pub fn progress_label(&self) -> Option<String> {
        self.progress
            .as_ref()
            .map(|(label, done, total)| format!("{label}: {done}/{total}"))
    }

    pub fn take_signals(&mut self) -> Vec<DialogSignal> {
        self.signals.drain(..).collect()
    }

    /// The committed file (or directory), empty when there is none.
    pub fn selected_file(&self) -> String {
        self.current_file.clone().unwrap_or_default()
    }

    /// Full paths of the files listed in the name line (ExistingFiles only).
    pub fn selected_files(&self) -> Vec<String> {
        if self.mode != Mode::ExistingFiles {
            return Vec::new();
        }
        self.selected_names()
            .iter()
            .map(|name| self.target_of(name).to_string())
            .collect()
    }

    // --------------------------------------------------------
    // Mode and filters
    // --------------------------------------------------------

    pub fn set_mode(&mut self, mode: Mode) {
        let relist = (mode == Mode::DirectoryOnly) != (self.mode == Mode::DirectoryOnly);
        self.mode = mode;
        self.views.set_multi_selection(mode == Mode::ExistingFiles);

        if mode.is_directory_mode() {
            self.filters.set_directories_only();
            self.current_file = Some(self.nav.current().to_string());
        } else {
            self.filters.reset_if_directories_only();
            self.current_file = None;
        }

        if relist {
            self.reread_dir();
        } else {
            self.resort_dir();
        }
    }

    pub fn set_filters(&mut self, labels: Vec<String>) {
        if self.filters.set_filters(labels) {
            self.reread_dir();
        }
    }

    /// Filters from a `;;`- or newline-separated string.
    pub fn set_filters_str(&mut self, filters: &str) {
        self.set_filters(filter::make_filters_list(filters));
    }

    pub fn set_filter(&mut self, label: &str) {
        if self.filters.set_filter(label) {
            self.reread_dir();
        }
    }

    pub fn add_filter(&mut self, label: &str) {
        if self.filters.add_filter(label) {
            self.reread_dir();
        }
    }

    pub fn set_selected_filter_index(&mut self, index: usize) {
        if self.filters.select_index(index) {
            self.reread_dir();
        }
    }

    pub fn set_selected_filter_mask(&mut self, mask: &str) {
        if self.filters.select_mask(mask) {
            self.reread_dir();
        }
    }

    /// User picked a filter from the drop-down.
    pub fn activate_filter(&mut self, index: usize) {
        if self.filters.select_index(index) {
            let label = self.filters.selected_label().to_string();
            self.signals.push_back(DialogSignal::FilterSelected(label));
            self.reread_dir();
        }
    }

    // --------------------------------------------------------
    // Navigation
    // --------------------------------------------------------

    /// Relists the current directory.
    pub fn reread_dir(&mut self) {
        self.busy = true;
        self.progress = None;
        self.current_dir_info = self.backend.stat(self.nav.current(), "");
        self.list.clear();
        self.views.clear();
        self.rename.cancel();
        self.had_dot_dot = false;
        self.nav.record_visit();

        let token = self.backend.start_listing(self.nav.current());
        self.nav.begin_listing(token);
        info!(url = %self.nav.current(), %token, "Listing started");
    }

    /// Goes to `input`: absolute, `scheme://` or relative to the current
    /// directory. A file target lists its directory and puts the file name
    /// into the name line.
    pub fn set_url(&mut self, input: &str) {
        self.go_to(input, false);
    }

    /// Like [`FileDialog::set_url`], additionally selecting a file target
    /// once it is listed.
    pub fn set_selection(&mut self, input: &str) {
        self.go_to(input, true);
    }

    /// Like [`FileDialog::set_url`] with `~` and `~user` expanded.
    pub fn set_dir(&mut self, path: &str) {
        if path.is_empty() {
            return;
        }
        let expanded = expand_tilde(path);
        self.set_url(&expanded);
    }

    pub fn cd_up(&mut self) {
        self.set_url(PARENT_ENTRY);
    }

    pub fn go_home(&mut self) {
        let home = directories::BaseDirs::new()
            .map(|dirs| dirs.home_dir().to_string_lossy().into_owned())
            .unwrap_or_else(|| "/".to_string());
        self.set_url(&home);
    }

    pub fn go_back(&mut self) {
        if let Some(url) = self.nav.pop_back() {
            self.change_dir(url);
        }
    }

    /// Stops the running listing. Entries already shown stay.
    pub fn stop(&mut self) {
        self.backend.stop();
        self.busy = false;
    }

    fn go_to(&mut self, input: &str, select: bool) {
        let target = match self.nav.current().resolve(input) {
            Ok(url) => url,
            Err(e) => {
                self.message(MessageLevel::Warning, e.to_string());
                return;
            }
        };

        self.nav.mark_previous();
        self.check_for_filter = true;

        let is_dir = input.ends_with('/')
            || target.is_root()
            || match self.backend.stat(&target, "") {
                Some(info) => info.is_dir,
                None => !target.is_local(),
            };

        if is_dir {
            self.nav.set_current(target.clone());
            self.try_set_selection(true, &target, "", false);
            self.reread_dir();
            self.dir_entered();
            if select {
                self.name.clear();
            }
        } else {
            let file = target.file_name().to_string();
            let dir = target.parent().unwrap_or_default();
            self.nav.set_current(dir);
            self.try_set_selection(false, &target, &file, false);
            self.reread_dir();
            self.dir_entered();
            if !file.contains('*') {
                self.name.set(&file);
                if select {
                    self.pending_selection = Some(CompactString::new(&file));
                }
            }
        }
        self.check_for_filter = false;
    }

    /// Enters a directory known to be one.
    fn change_dir(&mut self, url: DialogUrl) {
        self.nav.mark_previous();
        self.nav.set_current(url.clone());
        self.try_set_selection(true, &url, "", false);
        self.reread_dir();
        self.dir_entered();
    }

    fn dir_entered(&mut self) {
        let dir = self.nav.current().to_string();
        self.signals.push_back(DialogSignal::DirEntered(dir));
    }

    // --------------------------------------------------------
    // Backend events
    // --------------------------------------------------------

    pub fn handle_event(&mut self, event: BackendEvent) {
        match event {
            BackendEvent::BatchReady { token, entries } => {
                if !self.nav.is_current(token) {
                    debug!(%token, count = entries.len(), "Dropping stale batch");
                    return;
                }
                self.insert_batch(entries);
            }

            BackendEvent::ListingFinished { token } => {
                if !self.nav.is_current(token) {
                    debug!(%token, "Ignoring completion of stale listing");
                    return;
                }
                self.listing_finished();
            }

            BackendEvent::ListingFailed { token, code, detail } => {
                if !self.nav.is_current(token) {
                    debug!(%token, ?code, "Ignoring failure of stale listing");
                    return;
                }
                self.listing_failed(code, detail);
            }

            BackendEvent::EntryRemoved { dir, .. }
            | BackendEvent::EntryRenamed { dir, .. }
            | BackendEvent::DirectoryCreated { dir, .. }
                if dir != *self.nav.current() =>
            {
                debug!(
                    %dir,
                    current = %self.nav.current(),
                    "Ignoring change in a directory left behind"
                );
            }

            BackendEvent::EntryRemoved { name, .. } => {
                if self.list.remove(&name).is_some() {
                    debug!(%name, "Entry removed");
                    self.resort_dir();
                }
            }

            BackendEvent::EntryRenamed { old, new, .. } => {
                self.list.remove(&new);
                if self.list.rename(&old, &new) {
                    debug!(%old, %new, "Entry renamed");
                }
                self.resort_dir();
            }

            BackendEvent::DirectoryCreated { info, .. } => self.directory_created(info),

            BackendEvent::TransferProgress { url, done, total } => {
                let label = if url.is_local() {
                    url.path().to_string()
                } else {
                    format!("{} (on {})", url.path(), url.host())
                };
                self.progress = Some((label, done, total));
            }

            BackendEvent::OperationFailed { kind, error } => {
                warn!(operation = kind.name(), %error, "Backend operation failed");
                self.message(MessageLevel::Warning, error.to_string());
            }
        }
    }

    fn insert_batch(&mut self, entries: Vec<UrlInfo>) {
        let show_hidden = self.show_hidden();
        for info in entries {
            if self.mode == Mode::DirectoryOnly && !info.is_dir {
                continue;
            }
            if info.is_parent_entry() {
                self.had_dot_dot = true;
                if self.nav.current().is_root() {
                    continue;
                }
            }
            if info.name.is_empty() || info.name == SELF_ENTRY {
                continue;
            }
            if !show_hidden && info.is_hidden() {
                continue;
            }
            if !info.is_dir && !self.filters.name_filter().matches(&info.name) {
                continue;
            }
            let selectable = self.mode.can_select(&info);
            let index = self.list.len();
            self.list.push(info);
            self.views.append(index, selectable);
        }
    }

    fn listing_finished(&mut self) {
        self.busy = false;
        self.progress = None;
        self.nav.end_listing();

        if !self.had_dot_dot && !self.nav.current().is_root() {
            self.list.push(UrlInfo::parent_entry());
        }
        self.had_dot_dot = true;
        self.resort_dir();

        if let Some(name) = self.pending_selection.take() {
            if let Some(index) = self.list.position(&name) {
                if let Some(row) = self.views.row_for_entry(index) {
                    self.views.set_current(ViewKind::Detail, row);
                    self.views.set_selected(ViewKind::Detail, row, true);
                }
            }
        }
        info!(url = %self.nav.current(), entries = self.list.len(), "Listing finished");
    }

    fn listing_failed(&mut self, code: ErrorCode, detail: String) {
        self.busy = false;
        self.progress = None;
        self.nav.end_listing();
        warn!(url = %self.nav.current(), ?code, %detail, "Listing failed");
        self.message(MessageLevel::Warning, detail);

        if code.is_recoverable() && self.nav.roll_back() {
            self.reread_dir();
        }
    }

    fn directory_created(&mut self, info: UrlInfo) {
        let name = info.name.clone();
        if !self.list.contains(&name) {
            self.list.push(info);
        }
        self.resort_dir();
        if let Some(row) = self
            .list
            .position(&name)
            .and_then(|index| self.views.row_for_entry(index))
        {
            self.views.set_current(ViewKind::Detail, row);
            self.views.set_selected(ViewKind::Detail, row, true);
            self.rename.start(row, &name);
        }
    }

    /// Sorts the listing and rebuilds both views, keeping current item and
    /// selection by name.
    fn resort_dir(&mut self) {
        let current = self
            .views
            .current_entry()
            .and_then(|i| self.list.get(i))
            .map(|e| e.name.clone());
        let selected: Vec<CompactString> = self
            .views
            .selected_entries()
            .into_iter()
            .filter_map(|i| self.list.get(i).map(|e| e.name.clone()))
            .collect();
        let editing = match self.rename.state() {
            RenameState::Editing { original, .. } => Some(original.clone()),
            _ => None,
        };

        let spec = self.sort_spec();
        self.list.sort(spec);
        let mode = self.mode;
        self.views.rebuild(&self.list, |info| mode.can_select(info));

        for name in &selected {
            if let Some(row) = self.row_of(name) {
                self.views.set_selected(ViewKind::Detail, row, true);
            }
        }
        if let Some(row) = current.as_deref().and_then(|n| self.row_of(n)) {
            self.views.set_current(ViewKind::Detail, row);
        }
        match editing.as_deref().and_then(|n| self.row_of(n)) {
            Some(row) => self.rename.retarget(row),
            None => {
                if self.rename.is_armed() || editing.is_some() {
                    self.rename.cancel();
                }
            }
        }
    }

    fn row_of(&self, name: &str) -> Option<usize> {
        self.list
            .position(name)
            .and_then(|index| self.views.row_for_entry(index))
    }

    // --------------------------------------------------------
    // Selection
    // --------------------------------------------------------

    /// Single click on `row` of `view`. An open inline edit loses focus and
    /// is discarded.
    pub fn press(&mut self, view: ViewKind, row: usize, now: Instant) {
        if self.rename.is_editing() {
            self.rename.cancel();
        }
        let Some(detail_row) = self.views.to_detail_row(view, row) else {
            return;
        };
        let is_parent = self
            .entry(view, row)
            .is_some_and(UrlInfo::is_parent_entry);

        let ctx = PressContext {
            row: detail_row,
            was_current: self.views.current(ViewKind::Detail) == Some(detail_row),
            was_selected: self.views.is_selected(ViewKind::Detail, detail_row),
            dir_writable: self.current_dir_writable(),
            is_parent_entry: is_parent,
        };
        let interval = self.session.borrow().double_click_interval;
        self.rename.on_press(ctx, now, interval);

        self.views.set_current(view, row);
        if self.mode == Mode::ExistingFiles {
            self.views.clear_selection();
        }
        self.views.set_selected(view, row, true);
        self.selection_changed(detail_row);
    }

    /// Adds or removes `row` from the selection (extended selection).
    pub fn toggle_select(&mut self, view: ViewKind, row: usize) {
        let Some(detail_row) = self.views.to_detail_row(view, row) else {
            return;
        };
        self.views.set_current(view, row);
        self.views.toggle_selected(view, row);
        self.selection_changed(detail_row);
    }

    /// Moves the current item by `delta` rows (keyboard navigation).
    pub fn move_current(&mut self, delta: isize) {
        if self.views.is_empty() {
            return;
        }
        let last = self.views.len() - 1;
        let row = match self.views.current(ViewKind::Detail) {
            Some(row) => row.saturating_add_signed(delta).min(last),
            None => 0,
        };
        self.set_current_row(row);
    }

    pub fn select_all(&mut self, on: bool) {
        if self.mode != Mode::ExistingFiles {
            return;
        }
        self.views.select_all(on);
        self.update_name_from_selection();
    }

    /// Type-ahead: jumps to the next item starting with `c`.
    pub fn type_ahead(&mut self, c: char) {
        let len = self.views.len();
        if len == 0 {
            return;
        }
        let wanted = c.to_lowercase().next().unwrap_or(c);
        let start = self
            .views
            .current(ViewKind::Detail)
            .map_or(0, |row| row + 1);
        for step in 0..len {
            let row = (start + step) % len;
            let hit = self
                .entry(ViewKind::Detail, row)
                .and_then(|e| e.name.chars().next())
                .and_then(|first| first.to_lowercase().next())
                == Some(wanted);
            if hit {
                self.set_current_row(row);
                return;
            }
        }
    }

    fn set_current_row(&mut self, detail_row: usize) {
        self.views.set_current(ViewKind::Detail, detail_row);
        if self.mode != Mode::ExistingFiles {
            self.views.set_selected(ViewKind::Detail, detail_row, true);
        }
        self.selection_changed(detail_row);
    }

    fn selection_changed(&mut self, detail_row: usize) {
        let Some(info) = self.entry(ViewKind::Detail, detail_row).cloned() else {
            return;
        };
        if self.mode == Mode::ExistingFiles {
            self.update_name_from_selection();
            if !info.is_dir {
                let path = self.nav.current().child_string(&info.name);
                self.signals.push_back(DialogSignal::FileHighlighted(path));
            }
        } else if self.views.is_selected(ViewKind::Detail, detail_row) {
            let target = self.nav.current().join(&info.name);
            self.try_set_selection(info.is_dir, &target, &info.name, true);
        }
    }

    /// Name line for extended selection: `"a" "b" `.
    fn update_name_from_selection(&mut self) {
        let text: String = self
            .views
            .selected_entries()
            .into_iter()
            .filter_map(|i| self.list.get(i))
            .filter(|e| !e.is_dir)
            .map(|e| format!("\"{}\" ", e.name))
            .collect();
        self.name.set(&text);
    }

    /// Records `target` as the current file if the mode allows it. Returns
    /// whether there is a current file afterwards.
    fn try_set_selection(
        &mut self,
        is_dir: bool,
        target: &DialogUrl,
        name: &str,
        update_line: bool,
    ) -> bool {
        if self.check_for_filter && name.contains('*') {
            self.filters.add_filter(name);
            self.current_file = None;
            self.name.clear();
            return false;
        }

        let previous = self.current_file.take();
        self.current_file = if self.mode.is_directory_mode() {
            is_dir.then(|| target.to_string())
        } else if !is_dir {
            Some(target.to_string())
        } else {
            None
        };

        if update_line && self.current_file.is_some() {
            self.name.set(if name == PARENT_ENTRY { "" } else { name });
        }

        if self.current_file.is_some() && self.current_file != previous {
            let file = self.selected_file();
            self.signals.push_back(DialogSignal::FileHighlighted(file));
        }
        self.current_file.is_some()
    }

    // --------------------------------------------------------
    // Activation and commit
    // --------------------------------------------------------

    pub fn double_click(&mut self, view: ViewKind, row: usize) {
        self.rename.on_double_click();
        if let Some(detail_row) = self.views.to_detail_row(view, row) {
            self.select_directory_or_file(detail_row);
        }
    }

    /// Enter on the list.
    pub fn activate_current(&mut self) {
        if let Some(row) = self.views.current(ViewKind::Detail) {
            self.select_directory_or_file(row);
        }
    }

    fn select_directory_or_file(&mut self, detail_row: usize) {
        let Some(info) = self.entry(ViewKind::Detail, detail_row).cloned() else {
            return;
        };
        self.remember_location();

        if info.is_dir {
            let target = self.nav.current().join(&info.name);
            self.change_dir(target);
            return;
        }

        let selectable = self.views.is_selectable(ViewKind::Detail, detail_row);
        let target = self.nav.current().join(&info.name);
        if selectable && self.try_set_selection(false, &target, &info.name, true) {
            if self.mode == Mode::ExistingFile && !self.file_exists(&info.name) {
                return;
            }
            let file = self.selected_file();
            self.signals.push_back(DialogSignal::FileSelected(file));
            self.accept();
        } else if self.mode.is_directory_mode() {
            self.current_file = Some(self.nav.current().to_string());
            self.accept();
        }
    }

    /// The OK button.
    pub fn ok_clicked(&mut self) {
        let typed = self.name.text.clone();
        if typed.contains('*') {
            self.add_filter(&typed);
            self.name.clear();
            return;
        }
        self.remember_location();

        if self.mode.is_directory_mode() {
            let name = if typed.is_empty() { SELF_ENTRY } else { typed.as_str() };
            if self.is_dir_name(name) {
                self.current_file = Some(self.target_of(name).to_string());
                self.accept();
            }
            return;
        }

        if self.mode == Mode::ExistingFiles && !typed.is_empty() {
            let names = self.selected_names();
            let single_dir = names.len() == 1 && self.is_dir_name(&names[0]);
            if !single_dir {
                let files = self.selected_files();
                self.signals.push_back(DialogSignal::FilesSelected(files));
                self.accept();
                return;
            }
        }

        if self.mode == Mode::AnyFile && !typed.is_empty() && !self.is_dir_name(&typed) {
            self.current_file = Some(self.target_of(&typed).to_string());
            let file = self.selected_file();
            self.signals.push_back(DialogSignal::FileSelected(file));
            self.accept();
            return;
        }

        if self.mode == Mode::ExistingFile && !typed.is_empty() && !self.file_exists(&typed) {
            return;
        }

        if self.current_file.is_some() && self.mode != Mode::ExistingFiles {
            let file = self.selected_file();
            self.signals.push_back(DialogSignal::FileSelected(file));
            self.accept();
            return;
        }

        if !typed.is_empty() && self.is_dir_name(&typed) {
            let target = self.target_of(&typed);
            self.change_dir(target);
        }
        self.name.clear();
    }

    /// Enter in the name line.
    pub fn name_edit_return(&mut self) {
        if !self.mode.is_directory_mode() {
            self.ok_clicked();
            return;
        }

        let typed = self.name.text.clone();
        if typed.is_empty() {
            self.remember_location();
            self.current_file = Some(self.nav.current().to_string());
            let file = self.selected_file();
            self.signals.push_back(DialogSignal::FileSelected(file));
            self.accept();
            return;
        }
        if self.is_dir_name(&typed) {
            let target = self.target_of(&typed);
            self.change_dir(target);
        }
        self.name.clear();
    }

    pub fn cancel_clicked(&mut self) {
        self.done(DialogCode::Rejected);
    }

    pub fn accept(&mut self) -> bool {
        self.done(DialogCode::Accepted)
    }

    /// Closes the dialog with `code`. Accepting a local file that does not
    /// exist in an existing-file mode is refused and keeps the dialog open.
    pub fn done(&mut self, code: DialogCode) -> bool {
        if code == DialogCode::Accepted
            && matches!(self.mode, Mode::ExistingFile | Mode::ExistingFiles)
        {
            let files = if self.mode == Mode::ExistingFiles {
                self.selected_files()
            } else {
                vec![self.selected_file()]
            };
            for file in &files {
                let Ok(url) = DialogUrl::parse(file) else {
                    continue;
                };
                if url.is_local() && self.backend.stat(&url, "").is_none() {
                    self.message(MessageLevel::Warning, format!("File not found\n{file}"));
                    return false;
                }
            }
        }

        info!(?code, file = %self.selected_file(), "Dialog finished");
        self.result = Some(code);
        true
    }

    fn remember_location(&mut self) {
        let mut session = self.session.borrow_mut();
        session.working_dir = Some(self.nav.current().clone());
        session.detail_view = self.active_view == ViewKind::Detail;
    }

    // --------------------------------------------------------
    // Name line
    // --------------------------------------------------------

    pub fn set_name_text(&mut self, text: &str) {
        self.name.set(text);
        self.name_edit_done();
    }

    /// Types one character; outside AnyFile the name is completed against
    /// the listing and the completed tail stays selected.
    pub fn name_input(&mut self, c: char) {
        let cursor = self.name.cursor;
        self.name.text.truncate(cursor);
        self.name.text.push(c);
        self.name.cursor = self.name.text.len();

        if self.mode != Mode::AnyFile {
            let prefix = self.name.text.clone();
            let completion = self
                .views
                .detail()
                .iter()
                .filter_map(|item| self.list.get(item.entry))
                .find(|e| e.name.starts_with(prefix.as_str()))
                .map(|e| e.name.to_string());
            if let Some(full) = completion {
                self.name.text = full;
            }
        }
        self.name_edit_done();
    }

    pub fn name_backspace(&mut self) {
        if self.name.has_completion() {
            let cursor = self.name.cursor;
            self.name.text.truncate(cursor);
        } else {
            self.name.text.pop();
        }
        self.name.cursor = self.name.text.len();
        self.name_edit_done();
    }

    /// Keeps the current file in step with the typed name.
    fn name_edit_done(&mut self) {
        if self.mode == Mode::ExistingFiles {
            return;
        }
        let typed = self.name.text.clone();
        let is_dir = self.is_dir_name(&typed);
        let target = self.target_of(&typed);
        let name = target.file_name().to_string();
        self.try_set_selection(is_dir, &target, &name, false);
    }

    // --------------------------------------------------------
    // Rename
    // --------------------------------------------------------

    /// Advances time-driven state; call from the event loop tick.
    pub fn tick(&mut self, now: Instant) {
        if let Some(row) = self.rename.poll(now) {
            self.start_rename(row);
        }
    }

    /// F2 on the current item.
    pub fn rename_current(&mut self) {
        if let Some(row) = self.views.current(ViewKind::Detail) {
            self.start_rename(row);
        }
    }

    fn start_rename(&mut self, detail_row: usize) {
        let Some(info) = self.entry(ViewKind::Detail, detail_row) else {
            return;
        };
        if info.is_parent_entry() || !self.current_dir_writable() {
            return;
        }
        let name = info.name.clone();
        self.rename.start(detail_row, &name);
    }

    pub fn rename_input(&mut self, c: char) {
        self.rename.input(c);
    }

    pub fn rename_backspace(&mut self) {
        self.rename.backspace();
    }

    pub fn set_rename_text(&mut self, text: &str) {
        self.rename.set_text(text);
    }

    /// Confirms the inline edit. The listing changes only when the backend
    /// reports the rename.
    pub fn confirm_rename(&mut self) {
        if let Some((old, new)) = self.rename.confirm() {
            info!(%old, %new, "Rename requested");
            self.backend.rename(self.nav.current(), &old, &new);
        }
    }

    pub fn cancel_rename(&mut self) {
        self.rename.cancel();
    }

    // --------------------------------------------------------
    // Context actions
    // --------------------------------------------------------

    pub fn context_menu(&self, name: Option<&str>) -> ContextMenu {
        let name = name.unwrap_or_default();
        let info = if name.is_empty() { None } else { self.lookup(name) };
        let writable = self.current_dir_writable()
            && info.as_ref().is_none_or(|i| i.writable);
        let readable = info.as_ref().is_some_and(|i| i.readable);
        let is_dir = info.as_ref().is_some_and(|i| i.is_dir);

        let locked = name.is_empty() || name == PARENT_ENTRY || !writable;
        let session = self.session.borrow();
        ContextMenu {
            open_label: if !is_dir && self.mode == Mode::AnyFile {
                "Save"
            } else {
                "Open"
            },
            open_enabled: !name.is_empty() && readable,
            rename_enabled: !locked,
            delete_enabled: !locked,
            show_hidden: session.show_hidden,
            sort: session.sort.key,
        }
    }

    pub fn apply_popup_action(&mut self, name: Option<&str>, action: PopupAction) {
        let row = name.and_then(|n| self.row_of(n));
        match action {
            PopupAction::Open => {
                if let Some(row) = row {
                    self.select_directory_or_file(row);
                }
            }
            PopupAction::Rename => {
                if let Some(row) = row {
                    self.views.set_current(ViewKind::Detail, row);
                    self.start_rename(row);
                }
            }
            PopupAction::Delete => {
                if let Some(name) = name {
                    self.request_delete(name);
                }
            }
            PopupAction::Reload => self.reread_dir(),
            PopupAction::ToggleHidden => self.toggle_hidden(),
            PopupAction::SortName => self.set_sort_key(SortKey::Name),
            PopupAction::SortSize => self.set_sort_key(SortKey::Size),
            PopupAction::SortDate => self.set_sort_key(SortKey::Date),
            PopupAction::SortNone => self.set_sort_key(SortKey::Unsorted),
        }
    }

    pub fn toggle_hidden(&mut self) {
        {
            let mut session = self.session.borrow_mut();
            session.show_hidden = !session.show_hidden;
        }
        self.reread_dir();
    }

    /// Sorts by `key`, ascending. Does not relist.
    pub fn set_sort_key(&mut self, key: SortKey) {
        self.session.borrow_mut().sort = SortSpec::new(key, true);
        self.sort_column = key.column();
        self.resort_dir();
    }

    /// Detail header click: the same column flips the direction, another
    /// column sorts ascending by its key.
    pub fn header_clicked(&mut self, column: usize) {
        let key = SortKey::for_column(column);
        {
            let mut session = self.session.borrow_mut();
            let ascending = if column == self.sort_column {
                !session.sort.ascending
            } else {
                true
            };
            session.sort = SortSpec::new(key, ascending);
        }
        self.sort_column = column;
        self.resort_dir();
    }

    /// Asks for confirmation before deleting `name`.
    pub fn request_delete(&mut self, name: &str) {
        if name.is_empty() || name == PARENT_ENTRY {
            return;
        }
        let kind = self.lookup(name).map_or("file", |info| info.kind_word());
        self.query = Some(Query::Delete {
            name: CompactString::new(name),
            title: format!("Delete {kind}"),
            text: format!("Are you sure you wish to delete the {kind} '{name}'?"),
        });
    }

    pub fn delete_current(&mut self) {
        let name = self
            .views
            .current_entry()
            .and_then(|i| self.list.get(i))
            .map(|e| e.name.to_string());
        if let Some(name) = name {
            self.request_delete(&name);
        }
    }

    /// Resolves the pending query.
    pub fn answer_query(&mut self, yes: bool) {
        match self.query.take() {
            Some(Query::Delete { name, .. }) if yes => {
                info!(%name, "Delete requested");
                self.backend.remove(self.nav.current(), &name);
            }
            _ => {}
        }
    }

    pub fn make_directory(&mut self, name: &str) {
        if name.is_empty() {
            return;
        }
        self.backend.make_dir(self.nav.current(), name);
    }

    /// Creates `New Folder N` with the first free N; the created entry opens
    /// for renaming when the backend reports it.
    pub fn new_folder(&mut self) {
        let name = (1..=u16::MAX)
            .map(|n| format!("New Folder {n}"))
            .find(|candidate| self.lookup(candidate).is_none());
        if let Some(name) = name {
            self.make_directory(&name);
        }
    }

    // --------------------------------------------------------
    // Lookups
    // --------------------------------------------------------

    fn current_dir_writable(&self) -> bool {
        self.current_dir_info.as_ref().is_none_or(|i| i.writable)
    }

    /// Location named by typed text, relative to the current directory.
    fn target_of(&self, name: &str) -> DialogUrl {
        self.nav
            .current()
            .resolve(name)
            .unwrap_or_else(|_| self.nav.current().join(name))
    }

    /// Entry for a name: the live listing first, then the backend.
    fn lookup(&self, name: &str) -> Option<UrlInfo> {
        if name.is_empty() || name == SELF_ENTRY {
            return Some(
                self.current_dir_info
                    .clone()
                    .unwrap_or_else(|| UrlInfo::dir(SELF_ENTRY)),
            );
        }
        if !name.contains('/') {
            if let Some(info) = self.list.find(name) {
                return Some(info.clone());
            }
            return self.backend.stat(self.nav.current(), name);
        }
        self.backend.stat(&self.target_of(name), "")
    }

    fn is_dir_name(&self, name: &str) -> bool {
        name.ends_with('/') || self.lookup(name).is_some_and(|info| info.is_dir)
    }

    fn file_exists(&self, name: &str) -> bool {
        self.list.contains(name)
            || (self.nav.current().is_local() && self.lookup(name).is_some())
    }

    /// Names in the name line: `"a" "b" ` or a single bare name.
    fn selected_names(&self) -> Vec<String> {
        let text = self.name.text.as_str();
        let body = match text.rfind('"') {
            Some(end) => &text[..end],
            None => text,
        };
        body.split("\" ")
            .map(|s| s.strip_prefix('"').unwrap_or(s))
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }

    fn message(&mut self, level: MessageLevel, text: String) {
        self.signals.push_back(DialogSignal::Message {
            level,
            title: self.caption.clone(),
            text,
        });
    }
}

/// Expands a leading `~` (current user) or `~user`.
fn expand_tilde(path: &str) -> String {
    let Some(rest) = path.strip_prefix('~') else {
        return path.to_string();
    };
    let (user, tail) = match rest.find('/') {
        Some(pos) => rest.split_at(pos),
        None => (rest, ""),
    };
    let home = if user.is_empty() {
        directories::BaseDirs::new().map(|dirs| dirs.home_dir().to_string_lossy().into_owned())
    } else {
        home_of_user(user)
    };
    match home {
        Some(home) => format!("{home}{tail}"),
        None => path.to_string(),
    }
}

/// Home directory of `user` from the password database.
fn home_of_user(user: &str) -> Option<String> {
    let passwd = std::fs::read_to_string("/etc/passwd").ok()?;
    passwd.lines().find_map(|line| {
        let mut fields = line.split(':');
        (fields.next() == Some(user))
            .then(|| fields.nth(4).map(str::to_string))
            .flatten()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialog::backend::{ListingToken, OperationKind};
    use crate::dialog::session::DialogSession;
    use crate::error::DialogError;
    use pretty_assertions::assert_eq;
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::rc::Rc;
    use std::time::Duration;

    #[derive(Default)]
    struct MockState {
        next: u64,
        listings: Vec<(ListingToken, DialogUrl)>,
        renames: Vec<(String, String)>,
        removes: Vec<String>,
        mkdirs: Vec<String>,
        stops: usize,
        fs: HashMap<String, UrlInfo>,
    }

    struct MockBackend(Rc<RefCell<MockState>>);

    impl ListingBackend for MockBackend {
        fn start_listing(&mut self, url: &DialogUrl) -> ListingToken {
            let mut state = self.0.borrow_mut();
            state.next += 1;
            let token = ListingToken(state.next);
            state.listings.push((token, url.clone()));
            token
        }

        fn rename(&mut self, _dir: &DialogUrl, old: &str, new: &str) {
            self.0.borrow_mut().renames.push((old.into(), new.into()));
        }

        fn remove(&mut self, _dir: &DialogUrl, name: &str) {
            self.0.borrow_mut().removes.push(name.into());
        }

        fn make_dir(&mut self, _dir: &DialogUrl, name: &str) {
            self.0.borrow_mut().mkdirs.push(name.into());
        }

        fn stop(&mut self) {
            self.0.borrow_mut().stops += 1;
        }

        fn stat(&self, dir: &DialogUrl, name: &str) -> Option<UrlInfo> {
            let url = if name.is_empty() { dir.clone() } else { dir.join(name) };
            if url.is_root() {
                return Some(UrlInfo::dir("/"));
            }
            self.0.borrow().fs.get(&url.to_string()).cloned()
        }
    }

    const INTERVAL: Duration = Duration::from_millis(400);

    fn home() -> DialogUrl {
        DialogUrl::local("/home/u")
    }

    fn home_listing() -> Vec<UrlInfo> {
        vec![
            UrlInfo::file("foo.txt", 10),
            UrlInfo::dir("src"),
            UrlInfo::file("a.txt", 5),
            UrlInfo::file(".hidden", 1),
            UrlInfo::dir("docs"),
        ]
    }

    fn fixture(mode: Mode) -> (FileDialog, Rc<RefCell<MockState>>) {
        let state = Rc::new(RefCell::new(MockState::default()));
        {
            let mut s = state.borrow_mut();
            s.fs.insert("/home".into(), UrlInfo::dir("home"));
            s.fs.insert("/home/u".into(), UrlInfo::dir("u"));
            for info in home_listing() {
                s.fs.insert(format!("/home/u/{}", info.name), info);
            }
            s.fs.insert("/home/u/src/main.rs".into(), UrlInfo::file("main.rs", 3));
        }
        let session = DialogSession {
            double_click_interval: INTERVAL,
            ..DialogSession::default()
        }
        .shared();
        let mut dialog = FileDialog::new(
            Box::new(MockBackend(state.clone())),
            session,
            Some(home()),
        );
        dialog.set_mode(mode);
        deliver(&mut dialog, &state, home_listing());
        dialog.take_signals();
        (dialog, state)
    }

    fn last_token(state: &Rc<RefCell<MockState>>) -> ListingToken {
        state.borrow().listings.last().map(|(t, _)| *t).expect("a listing")
    }

    fn deliver(dialog: &mut FileDialog, state: &Rc<RefCell<MockState>>, entries: Vec<UrlInfo>) {
        let token = last_token(state);
        dialog.handle_event(BackendEvent::BatchReady { token, entries });
        dialog.handle_event(BackendEvent::ListingFinished { token });
    }

    fn names(dialog: &FileDialog) -> Vec<String> {
        dialog.entries().iter().map(|e| e.name.to_string()).collect()
    }

    fn row(dialog: &FileDialog, name: &str) -> usize {
        dialog.row_of(name).expect("listed")
    }

    #[test]
    fn opening_lists_start_directory_and_waits() {
        let state = Rc::new(RefCell::new(MockState::default()));
        let dialog = FileDialog::new(
            Box::new(MockBackend(state.clone())),
            DialogSession::default().shared(),
            Some(DialogUrl::local("/tmp")),
        );
        assert!(dialog.is_busy());
        assert_eq!(state.borrow().listings[0].1, DialogUrl::local("/tmp"));
    }

    #[test]
    fn completed_listing_is_sorted_with_parent_first() {
        let (dialog, _) = fixture(Mode::ExistingFile);
        assert!(!dialog.is_busy());
        assert_eq!(names(&dialog), vec!["..", "docs", "src", "a.txt", "foo.txt"]);
        assert_eq!(dialog.views().len(), 5);
    }

    #[test]
    fn stale_batches_are_dropped() {
        let (mut dialog, state) = fixture(Mode::ExistingFile);
        let stale = last_token(&state);
        dialog.reread_dir();

        dialog.handle_event(BackendEvent::BatchReady {
            token: stale,
            entries: vec![UrlInfo::file("ghost", 1)],
        });
        dialog.handle_event(BackendEvent::ListingFinished { token: stale });
        assert!(dialog.entries().is_empty());
        assert!(dialog.is_busy());

        deliver(&mut dialog, &state, vec![UrlInfo::file("real", 1)]);
        assert_eq!(names(&dialog), vec!["..", "real"]);
    }

    #[test]
    fn incremental_batches_show_before_completion() {
        let (mut dialog, state) = fixture(Mode::ExistingFile);
        dialog.reread_dir();
        let token = last_token(&state);
        dialog.handle_event(BackendEvent::BatchReady {
            token,
            entries: vec![UrlInfo::file("one", 1)],
        });
        assert_eq!(dialog.views().len(), 1);
        assert!(dialog.is_busy());
    }

    #[test]
    fn hidden_self_and_root_parent_entries_are_filtered() {
        let state = Rc::new(RefCell::new(MockState::default()));
        let mut dialog = FileDialog::new(
            Box::new(MockBackend(state.clone())),
            DialogSession::default().shared(),
            Some(DialogUrl::root()),
        );
        deliver(
            &mut dialog,
            &state,
            vec![
                UrlInfo::dir("."),
                UrlInfo::parent_entry(),
                UrlInfo::dir("etc"),
                UrlInfo::file(".profile", 1),
            ],
        );
        assert_eq!(names(&dialog), vec!["etc"]);

        dialog.toggle_hidden();
        deliver(&mut dialog, &state, vec![UrlInfo::file(".profile", 1)]);
        assert_eq!(names(&dialog), vec![".profile"]);
    }

    #[test]
    fn backend_parent_entry_is_not_duplicated() {
        let (mut dialog, state) = fixture(Mode::ExistingFile);
        dialog.reread_dir();
        deliver(
            &mut dialog,
            &state,
            vec![UrlInfo::parent_entry(), UrlInfo::file("x", 1)],
        );
        assert_eq!(names(&dialog), vec!["..", "x"]);
    }

    #[test]
    fn directory_only_mode_drops_files() {
        let (dialog, _) = fixture(Mode::DirectoryOnly);
        assert_eq!(names(&dialog), vec!["..", "docs", "src"]);
        assert_eq!(dialog.ok_label(), "OK");
        assert_eq!(dialog.filters().labels(), &["Directories".to_string()]);
    }

    #[test]
    fn name_filter_applies_to_files_only() {
        let (mut dialog, state) = fixture(Mode::ExistingFile);
        dialog.set_filters_str("Text (foo*);;All Files (*)");
        deliver(&mut dialog, &state, home_listing());
        assert_eq!(names(&dialog), vec!["..", "docs", "src", "foo.txt"]);
        assert_eq!(dialog.selected_filter(), "Text (foo*)");
    }

    #[test]
    fn double_click_on_directory_enters_it() {
        let (mut dialog, state) = fixture(Mode::ExistingFile);
        let src = row(&dialog, "src");
        dialog.double_click(ViewKind::Detail, src);

        assert!(dialog.is_busy());
        assert_eq!(
            state.borrow().listings.last().map(|(_, u)| u.to_string()),
            Some("/home/u/src".to_string())
        );
        assert!(
            dialog
                .take_signals()
                .contains(&DialogSignal::DirEntered("/home/u/src".into()))
        );

        deliver(&mut dialog, &state, vec![UrlInfo::file("main.rs", 3)]);
        assert_eq!(names(&dialog), vec!["..", "main.rs"]);
        assert!(!dialog.is_busy());
    }

    #[test]
    fn recoverable_failure_rolls_back_and_relists() {
        let (mut dialog, state) = fixture(Mode::ExistingFile);
        dialog.set_url("/home/u/gone/");
        let token = last_token(&state);
        dialog.handle_event(BackendEvent::ListingFailed {
            token,
            code: ErrorCode::FileNotExisting,
            detail: "Could not read directory\n/home/u/gone".into(),
        });

        assert_eq!(dialog.url(), &DialogUrl::local("/home/u"));
        assert_eq!(
            state.borrow().listings.last().map(|(_, u)| u.clone()),
            Some(DialogUrl::local("/home/u"))
        );
        let warned = dialog.take_signals().into_iter().any(|s| {
            matches!(s, DialogSignal::Message { level: MessageLevel::Warning, ref text, .. }
                if text.contains("/home/u/gone"))
        });
        assert!(warned);
    }

    #[test]
    fn other_failures_keep_location() {
        let (mut dialog, state) = fixture(Mode::ExistingFile);
        dialog.set_url("/home/u/locked/");
        let listings = state.borrow().listings.len();
        let token = last_token(&state);
        dialog.handle_event(BackendEvent::ListingFailed {
            token,
            code: ErrorCode::PermissionDenied,
            detail: "denied".into(),
        });
        assert_eq!(dialog.url(), &DialogUrl::local("/home/u/locked"));
        assert_eq!(state.borrow().listings.len(), listings);
        assert!(!dialog.is_busy());
    }

    #[test]
    fn rename_in_place_round_trip() {
        let (mut dialog, state) = fixture(Mode::ExistingFile);
        let foo = row(&dialog, "foo.txt");
        let t0 = Instant::now();

        dialog.press(ViewKind::Detail, foo, t0);
        dialog.press(ViewKind::Detail, foo, t0);
        dialog.tick(t0 + INTERVAL / 2);
        assert!(!dialog.rename.is_editing());
        dialog.tick(t0 + INTERVAL);
        assert!(dialog.rename.is_editing());

        dialog.set_rename_text("bar.txt");
        dialog.confirm_rename();
        assert_eq!(
            state.borrow().renames,
            vec![("foo.txt".to_string(), "bar.txt".to_string())]
        );
        assert!(dialog.entries().contains("foo.txt"));

        dialog.handle_event(BackendEvent::EntryRenamed {
            dir: home(),
            old: "foo.txt".into(),
            new: "bar.txt".into(),
        });
        assert_eq!(names(&dialog), vec!["..", "docs", "src", "a.txt", "bar.txt"]);
    }

    #[test]
    fn clicking_elsewhere_discards_the_edit() {
        let (mut dialog, state) = fixture(Mode::ExistingFile);
        let foo = row(&dialog, "foo.txt");
        dialog.press(ViewKind::Detail, foo, Instant::now());
        dialog.rename_current();
        assert!(dialog.rename.is_editing());

        dialog.set_rename_text("bar.txt");
        let a = row(&dialog, "a.txt");
        dialog.press(ViewKind::Detail, a, Instant::now());

        assert!(state.borrow().renames.is_empty());
        assert_eq!(dialog.rename_state(), &RenameState::Idle);
        assert!(dialog.entries().contains("foo.txt"));
    }

    #[test]
    fn double_click_cancels_armed_rename() {
        let (mut dialog, _) = fixture(Mode::AnyFile);
        let foo = row(&dialog, "foo.txt");
        let t0 = Instant::now();
        dialog.press(ViewKind::Detail, foo, t0);
        dialog.press(ViewKind::Detail, foo, t0);
        dialog.double_click(ViewKind::Detail, foo);
        dialog.tick(t0 + INTERVAL);
        assert!(!dialog.rename.is_editing());
        assert_eq!(dialog.result(), Some(DialogCode::Accepted));
    }

    #[test]
    fn rename_replacing_existing_entry() {
        let (mut dialog, _) = fixture(Mode::ExistingFile);
        dialog.handle_event(BackendEvent::EntryRenamed {
            dir: home(),
            old: "foo.txt".into(),
            new: "a.txt".into(),
        });
        assert_eq!(names(&dialog), vec!["..", "docs", "src", "a.txt"]);
        assert_eq!(dialog.entries().find("a.txt").map(|e| e.size), Some(10));
    }

    #[test]
    fn existing_files_commit_quoted_names() {
        let (mut dialog, _) = fixture(Mode::ExistingFiles);
        let a = row(&dialog, "a.txt");
        let foo = row(&dialog, "foo.txt");
        dialog.press(ViewKind::Detail, a, Instant::now());
        dialog.toggle_select(ViewKind::Compact, foo);
        assert_eq!(dialog.name_text(), "\"a.txt\" \"foo.txt\" ");

        dialog.ok_clicked();
        assert_eq!(dialog.result(), Some(DialogCode::Accepted));
        let expected = vec!["/home/u/a.txt".to_string(), "/home/u/foo.txt".to_string()];
        assert_eq!(dialog.selected_files(), expected);
        assert!(
            dialog
                .take_signals()
                .contains(&DialogSignal::FilesSelected(expected))
        );
    }

    #[test]
    fn directories_are_not_selectable_for_existing_files() {
        let (mut dialog, _) = fixture(Mode::ExistingFiles);
        let src = row(&dialog, "src");
        dialog.press(ViewKind::Detail, src, Instant::now());
        assert!(dialog.views().selected_rows().is_empty());
        dialog.select_all(true);
        assert_eq!(dialog.name_text(), "\"a.txt\" \"foo.txt\" ");
    }

    #[test]
    fn any_file_accepts_new_name() {
        let (mut dialog, _) = fixture(Mode::AnyFile);
        assert_eq!(dialog.ok_label(), "Save");
        for c in "new.log".chars() {
            dialog.name_input(c);
        }
        assert_eq!(dialog.name_text(), "new.log");
        dialog.ok_clicked();
        assert_eq!(dialog.result(), Some(DialogCode::Accepted));
        assert_eq!(dialog.selected_file(), "/home/u/new.log");
    }

    #[test]
    fn any_file_with_directory_name_navigates() {
        let (mut dialog, state) = fixture(Mode::AnyFile);
        dialog.set_name_text("src");
        dialog.ok_clicked();
        assert_eq!(dialog.result(), None);
        assert_eq!(dialog.url(), &DialogUrl::local("/home/u/src"));
        assert_eq!(state.borrow().listings.last().map(|(_, u)| u.path().to_string()),
            Some("/home/u/src".to_string()));
        assert_eq!(dialog.name_text(), "");
    }

    #[test]
    fn existing_file_requires_existence() {
        let (mut dialog, _) = fixture(Mode::ExistingFile);
        dialog.set_name_text("missing.txt");
        dialog.ok_clicked();
        assert_eq!(dialog.result(), None);

        dialog.set_name_text("foo.txt");
        dialog.ok_clicked();
        assert_eq!(dialog.result(), Some(DialogCode::Accepted));
        assert_eq!(dialog.selected_file(), "/home/u/foo.txt");
    }

    #[test]
    fn done_refuses_vanished_local_file() {
        let (mut dialog, state) = fixture(Mode::ExistingFile);
        let foo = row(&dialog, "foo.txt");
        dialog.press(ViewKind::Detail, foo, Instant::now());
        state.borrow_mut().fs.remove("/home/u/foo.txt");

        assert!(!dialog.accept());
        assert_eq!(dialog.result(), None);
        let not_found = dialog.take_signals().into_iter().any(|s| {
            matches!(s, DialogSignal::Message { ref text, .. } if text.starts_with("File not found"))
        });
        assert!(not_found);
    }

    #[test]
    fn directory_mode_commits_current_directory() {
        let (mut dialog, _) = fixture(Mode::Directory);
        dialog.ok_clicked();
        assert_eq!(dialog.result(), Some(DialogCode::Accepted));
        assert_eq!(dialog.selected_file(), "/home/u");
    }

    #[test]
    fn directory_mode_commits_selected_directory() {
        let (mut dialog, _) = fixture(Mode::Directory);
        let docs = row(&dialog, "docs");
        dialog.press(ViewKind::Detail, docs, Instant::now());
        assert_eq!(dialog.name_text(), "docs");
        dialog.ok_clicked();
        assert_eq!(dialog.selected_file(), "/home/u/docs");
    }

    #[test]
    fn header_clicks_toggle_direction() {
        let (mut dialog, _) = fixture(Mode::ExistingFile);
        dialog.header_clicked(0);
        assert_eq!(dialog.sort_spec(), SortSpec::new(SortKey::Name, false));
        assert_eq!(names(&dialog), vec!["..", "src", "docs", "foo.txt", "a.txt"]);

        dialog.header_clicked(1);
        assert_eq!(dialog.sort_spec(), SortSpec::new(SortKey::Size, true));
        dialog.header_clicked(1);
        assert_eq!(dialog.sort_spec(), SortSpec::new(SortKey::Size, false));
        dialog.header_clicked(2);
        assert_eq!(dialog.sort_spec(), SortSpec::new(SortKey::Name, true));
    }

    #[test]
    fn sorting_keeps_selection() {
        let (mut dialog, state) = fixture(Mode::ExistingFile);
        let listings = state.borrow().listings.len();
        let foo = row(&dialog, "foo.txt");
        dialog.press(ViewKind::Detail, foo, Instant::now());

        dialog.apply_popup_action(None, PopupAction::SortSize);
        let foo = row(&dialog, "foo.txt");
        assert!(dialog.views().is_selected(ViewKind::Compact, foo));
        assert_eq!(state.borrow().listings.len(), listings);
    }

    #[test]
    fn context_menu_states() {
        let (dialog, _) = fixture(Mode::AnyFile);
        let menu = dialog.context_menu(Some("foo.txt"));
        assert_eq!(menu.open_label, "Save");
        assert!(menu.open_enabled && menu.rename_enabled && menu.delete_enabled);

        let parent = dialog.context_menu(Some(".."));
        assert!(!parent.rename_enabled && !parent.delete_enabled);
        assert_eq!(parent.open_label, "Open");

        let empty = dialog.context_menu(None);
        assert!(!empty.open_enabled && !empty.rename_enabled);
        assert_eq!(empty.items().len(), 9);
    }

    #[test]
    fn read_only_directory_disables_rename() {
        let (mut dialog, state) = fixture(Mode::ExistingFile);
        state.borrow_mut().fs.insert(
            "/home/u".into(),
            UrlInfo::dir("u").with_access(true, false),
        );
        dialog.reread_dir();
        deliver(&mut dialog, &state, home_listing());
        assert!(!dialog.context_menu(Some("foo.txt")).rename_enabled);
        dialog.rename_current();
        assert!(!dialog.rename.is_editing());
    }

    #[test]
    fn delete_asks_then_removes() {
        let (mut dialog, state) = fixture(Mode::ExistingFile);
        dialog.apply_popup_action(Some("src"), PopupAction::Delete);
        let query = dialog.query().cloned().expect("query");
        assert_eq!(query.title(), "Delete directory");
        assert_eq!(query.text(), "Are you sure you wish to delete the directory 'src'?");

        dialog.answer_query(false);
        assert!(state.borrow().removes.is_empty());

        dialog.request_delete("foo.txt");
        dialog.answer_query(true);
        assert_eq!(state.borrow().removes, vec!["foo.txt".to_string()]);

        dialog.handle_event(BackendEvent::EntryRemoved {
            dir: home(),
            name: "foo.txt".into(),
        });
        assert!(!dialog.entries().contains("foo.txt"));
    }

    #[test]
    fn created_directory_is_selected_and_edited() {
        let (mut dialog, state) = fixture(Mode::ExistingFile);
        dialog.make_directory("New Folder");
        assert_eq!(state.borrow().mkdirs, vec!["New Folder".to_string()]);

        dialog.handle_event(BackendEvent::DirectoryCreated {
            dir: home(),
            info: UrlInfo::dir("New Folder"),
        });
        let created = row(&dialog, "New Folder");
        assert_eq!(dialog.views().current(ViewKind::Detail), Some(created));
        assert_eq!(dialog.rename.editing_row(), Some(created));
        assert_eq!(dialog.rename.text(), Some("New Folder"));
    }

    #[test]
    fn late_notifications_for_a_left_directory_are_dropped() {
        let (mut dialog, state) = fixture(Mode::ExistingFile);
        let foo = row(&dialog, "foo.txt");
        dialog.press(ViewKind::Detail, foo, Instant::now());
        dialog.rename_current();
        dialog.set_rename_text("bar.txt");
        dialog.confirm_rename();
        dialog.request_delete("a.txt");
        dialog.answer_query(true);

        dialog.set_url("src/");
        deliver(
            &mut dialog,
            &state,
            vec![UrlInfo::file("foo.txt", 1), UrlInfo::file("a.txt", 2)],
        );

        dialog.handle_event(BackendEvent::EntryRenamed {
            dir: home(),
            old: "foo.txt".into(),
            new: "bar.txt".into(),
        });
        dialog.handle_event(BackendEvent::EntryRemoved {
            dir: home(),
            name: "a.txt".into(),
        });
        dialog.handle_event(BackendEvent::DirectoryCreated {
            dir: home(),
            info: UrlInfo::dir("New Folder 1"),
        });

        assert_eq!(names(&dialog), vec!["..", "a.txt", "foo.txt"]);
        assert_eq!(dialog.rename_state(), &RenameState::Idle);
    }

    #[test]
    fn new_folder_picks_free_name() {
        let (mut dialog, state) = fixture(Mode::ExistingFile);
        dialog.handle_event(BackendEvent::DirectoryCreated {
            dir: home(),
            info: UrlInfo::dir("New Folder 1"),
        });
        dialog.cancel_rename();
        dialog.new_folder();
        assert_eq!(state.borrow().mkdirs, vec!["New Folder 2".to_string()]);
    }

    #[test]
    fn operation_failures_become_warnings() {
        let (mut dialog, _) = fixture(Mode::ExistingFile);
        let err = std::io::Error::from(std::io::ErrorKind::PermissionDenied);
        dialog.handle_event(BackendEvent::OperationFailed {
            kind: OperationKind::Remove,
            error: DialogError::remove("/home/u/src", &err),
        });
        let signals = dialog.take_signals();
        assert!(matches!(
            signals.as_slice(),
            [DialogSignal::Message { level: MessageLevel::Warning, .. }]
        ));
    }

    #[test]
    fn type_ahead_cycles_through_matches() {
        let (mut dialog, _) = fixture(Mode::ExistingFile);
        dialog.type_ahead('D');
        assert_eq!(dialog.current_row(), Some(row(&dialog, "docs")));
        dialog.type_ahead('a');
        assert_eq!(dialog.current_row(), Some(row(&dialog, "a.txt")));
        dialog.type_ahead('a');
        assert_eq!(dialog.current_row(), Some(row(&dialog, "a.txt")));
        dialog.type_ahead('s');
        assert_eq!(dialog.current_row(), Some(row(&dialog, "src")));
    }

    #[test]
    fn name_line_completes_from_listing() {
        let (mut dialog, _) = fixture(Mode::ExistingFile);
        dialog.name_input('f');
        assert_eq!(dialog.name_text(), "foo.txt");
        assert_eq!(dialog.name_completion(), Some(1));

        dialog.name_backspace();
        assert_eq!(dialog.name_text(), "f");
        assert_eq!(dialog.name_completion(), None);

        dialog.name_input('x');
        assert_eq!(dialog.name_text(), "fx");
    }

    #[test]
    fn typed_pattern_becomes_filter() {
        let (mut dialog, state) = fixture(Mode::ExistingFile);
        dialog.set_name_text("*.txt");
        dialog.ok_clicked();
        assert_eq!(dialog.selected_filter(), "*.txt");
        assert_eq!(dialog.name_text(), "");
        deliver(&mut dialog, &state, home_listing());
        assert_eq!(names(&dialog), vec!["..", "docs", "src", "a.txt", "foo.txt"]);
    }

    #[test]
    fn set_url_to_file_lists_parent_and_fills_name() {
        let (mut dialog, state) = fixture(Mode::ExistingFile);
        dialog.set_selection("/home/u/src/main.rs");
        assert_eq!(dialog.url(), &DialogUrl::local("/home/u/src"));
        assert_eq!(dialog.name_text(), "main.rs");

        deliver(&mut dialog, &state, vec![UrlInfo::file("main.rs", 3)]);
        let main = row(&dialog, "main.rs");
        assert!(dialog.views().is_selected(ViewKind::Detail, main));
        assert_eq!(dialog.selected_file(), "/home/u/src/main.rs");
    }

    #[test]
    fn back_and_up_navigation() {
        let (mut dialog, state) = fixture(Mode::ExistingFile);
        dialog.set_url("src/");
        deliver(&mut dialog, &state, vec![]);
        dialog.go_back();
        assert_eq!(dialog.url(), &DialogUrl::local("/home/u"));

        dialog.cd_up();
        assert_eq!(dialog.url(), &DialogUrl::local("/home"));
        assert_eq!(dialog.navigation().visited().len(), 3);
    }

    #[test]
    fn transfer_progress_label() {
        let (mut dialog, _) = fixture(Mode::ExistingFile);
        dialog.handle_event(BackendEvent::TransferProgress {
            url: DialogUrl::parse("ftp://example.org/pub/a.tar").expect("url"),
            done: 5,
            total: 10,
        });
        assert_eq!(
            dialog.progress_label().as_deref(),
            Some("/pub/a.tar (on example.org): 5/10")
        );
    }

    #[test]
    fn stop_is_advisory() {
        let (mut dialog, state) = fixture(Mode::ExistingFile);
        dialog.reread_dir();
        let token = last_token(&state);
        dialog.handle_event(BackendEvent::BatchReady {
            token,
            entries: vec![UrlInfo::file("kept", 1)],
        });
        dialog.stop();
        assert_eq!(state.borrow().stops, 1);
        assert!(!dialog.is_busy());
        assert!(dialog.entries().contains("kept"));
    }

    #[test]
    fn filter_activation_is_signalled() {
        let (mut dialog, _) = fixture(Mode::ExistingFile);
        dialog.set_filters(vec!["Logs (*.xml)".into(), "All Files (*)".into()]);
        dialog.activate_filter(1);
        assert!(
            dialog
                .take_signals()
                .contains(&DialogSignal::FilterSelected("All Files (*)".into()))
        );
    }

    #[test]
    fn tilde_expansion_of_unknown_user_is_literal() {
        assert_eq!(expand_tilde("/plain"), "/plain");
        assert_eq!(expand_tilde("~no-such-user-xyz/x"), "~no-such-user-xyz/x");
    }
}
