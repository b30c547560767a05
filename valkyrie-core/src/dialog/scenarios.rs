//! End-to-end dialog scenarios against the local file system.

use crate::dialog::backend::BackendEvent;
use crate::dialog::convenience::{DialogRequest, DialogRunner, get_save_file_name};
use crate::dialog::file_dialog::{DialogCode, DialogSignal, FileDialog, MessageLevel, Mode};
use crate::dialog::rename::RenameState;
use crate::dialog::session::{DialogSession, SharedSession};
use crate::dialog::url::DialogUrl;
use crate::error::AppError;
use crate::fs::local_backend::LocalBackend;
use pretty_assertions::assert_eq;
use std::fs;
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time::timeout;

const WAIT: Duration = Duration::from_secs(5);

fn workspace() -> TempDir {
    let dir = TempDir::new().expect("temp dir");
    fs::write(dir.path().join("a.txt"), b"a").expect("write");
    fs::write(dir.path().join("b.rs"), b"bb").expect("write");
    fs::write(dir.path().join("c.rs"), b"ccc").expect("write");
    fs::create_dir(dir.path().join("src")).expect("mkdir");
    fs::write(dir.path().join("src/main.rs"), b"fn main() {}").expect("write");
    dir
}

fn open(dir: &TempDir, mode: Mode) -> (FileDialog, UnboundedReceiver<BackendEvent>) {
    let (backend, rx) = LocalBackend::new();
    let session = DialogSession::default().shared();
    let mut dialog = FileDialog::new(
        Box::new(backend),
        session,
        Some(DialogUrl::local(dir.path())),
    );
    dialog.set_mode(mode);
    (dialog, rx)
}

async fn next(rx: &mut UnboundedReceiver<BackendEvent>) -> BackendEvent {
    timeout(WAIT, rx.recv())
        .await
        .expect("backend timed out")
        .expect("backend channel open")
}

/// Feeds backend events until the running listing is done.
async fn settle(dialog: &mut FileDialog, rx: &mut UnboundedReceiver<BackendEvent>) {
    while dialog.is_busy() {
        let event = next(rx).await;
        dialog.handle_event(event);
    }
}

/// Feeds backend events up to and including the first one matching `done`.
async fn until<F>(dialog: &mut FileDialog, rx: &mut UnboundedReceiver<BackendEvent>, done: F)
where
    F: Fn(&BackendEvent) -> bool,
{
    loop {
        let event = next(rx).await;
        let stop = done(&event);
        dialog.handle_event(event);
        if stop {
            return;
        }
    }
}

fn names(dialog: &FileDialog) -> Vec<String> {
    dialog
        .views()
        .detail()
        .iter()
        .filter_map(|item| dialog.entries().get(item.entry))
        .map(|e| e.name.to_string())
        .collect()
}

fn target(dir: &TempDir, name: &str) -> String {
    DialogUrl::local(dir.path()).child_string(name)
}

#[tokio::test]
async fn filters_hide_non_matching_files_but_not_directories() {
    let dir = workspace();
    let (mut dialog, mut rx) = open(&dir, Mode::ExistingFile);
    dialog.set_filters_str("Rust (*.rs);;All (*)");
    settle(&mut dialog, &mut rx).await;

    assert_eq!(names(&dialog), ["..", "src", "b.rs", "c.rs"]);

    dialog.activate_filter(1);
    settle(&mut dialog, &mut rx).await;
    assert_eq!(names(&dialog), ["..", "src", "a.txt", "b.rs", "c.rs"]);
    assert!(
        dialog
            .take_signals()
            .contains(&DialogSignal::FilterSelected("All (*)".into()))
    );
}

#[tokio::test]
async fn enter_directory_and_go_back() {
    let dir = workspace();
    let (mut dialog, mut rx) = open(&dir, Mode::ExistingFile);
    settle(&mut dialog, &mut rx).await;

    dialog.type_ahead('s');
    dialog.activate_current();
    settle(&mut dialog, &mut rx).await;

    assert_eq!(dialog.url(), &DialogUrl::local(dir.path().join("src")));
    assert_eq!(names(&dialog), ["..", "main.rs"]);

    dialog.go_back();
    settle(&mut dialog, &mut rx).await;
    assert_eq!(dialog.url(), &DialogUrl::local(dir.path()));
    assert!(names(&dialog).contains(&"a.txt".to_string()));
}

#[tokio::test]
async fn typed_prefix_completes_and_opens() {
    let dir = workspace();
    let (mut dialog, mut rx) = open(&dir, Mode::ExistingFile);
    settle(&mut dialog, &mut rx).await;

    dialog.name_input('b');
    assert_eq!(dialog.name_text(), "b.rs");
    assert_eq!(dialog.name_completion(), Some(1));

    dialog.ok_clicked();
    assert_eq!(dialog.result(), Some(DialogCode::Accepted));
    assert_eq!(dialog.selected_file(), target(&dir, "b.rs"));
}

#[tokio::test]
async fn unknown_name_does_not_close_open_dialog() {
    let dir = workspace();
    let (mut dialog, mut rx) = open(&dir, Mode::ExistingFile);
    settle(&mut dialog, &mut rx).await;

    for c in "zzz".chars() {
        dialog.name_input(c);
    }
    dialog.ok_clicked();
    assert_eq!(dialog.result(), None);
}

#[tokio::test]
async fn new_folder_opens_editor_and_rename_lands_on_disk() {
    let dir = workspace();
    let (mut dialog, mut rx) = open(&dir, Mode::ExistingFile);
    settle(&mut dialog, &mut rx).await;

    dialog.new_folder();
    until(&mut dialog, &mut rx, |e| {
        matches!(e, BackendEvent::DirectoryCreated { .. })
    })
    .await;
    assert!(matches!(
        dialog.rename_state(),
        RenameState::Editing { original, .. } if original == "New Folder 1"
    ));

    dialog.set_rename_text("docs");
    dialog.confirm_rename();
    until(&mut dialog, &mut rx, |e| matches!(e, BackendEvent::EntryRenamed { .. })).await;

    let listed = names(&dialog);
    assert!(listed.contains(&"docs".to_string()));
    assert!(!listed.contains(&"New Folder 1".to_string()));
    assert!(dir.path().join("docs").is_dir());
}

#[tokio::test]
async fn delete_waits_for_confirmation() {
    let dir = workspace();
    let (mut dialog, mut rx) = open(&dir, Mode::ExistingFile);
    settle(&mut dialog, &mut rx).await;

    dialog.request_delete("a.txt");
    assert!(dialog.query().is_some());
    dialog.answer_query(false);
    assert!(dialog.query().is_none());
    assert!(dir.path().join("a.txt").exists());

    dialog.request_delete("a.txt");
    dialog.answer_query(true);
    until(&mut dialog, &mut rx, |e| matches!(e, BackendEvent::EntryRemoved { .. })).await;

    assert!(!dir.path().join("a.txt").exists());
    assert!(!names(&dialog).contains(&"a.txt".to_string()));
}

#[tokio::test]
async fn missing_directory_rolls_back_with_warning() {
    let dir = workspace();
    let (mut dialog, mut rx) = open(&dir, Mode::ExistingFile);
    settle(&mut dialog, &mut rx).await;
    dialog.take_signals();

    dialog.set_url("missing/");
    settle(&mut dialog, &mut rx).await;

    assert_eq!(dialog.url(), &DialogUrl::local(dir.path()));
    assert!(names(&dialog).contains(&"src".to_string()));
    let warned = dialog.take_signals().into_iter().any(|s| {
        matches!(s, DialogSignal::Message { level: MessageLevel::Warning, .. })
    });
    assert!(warned);
}

/// Lets the listing finish, then runs a script against the dialog.
struct Scripted {
    rx: UnboundedReceiver<BackendEvent>,
    script: Box<dyn FnMut(&mut FileDialog)>,
}

impl DialogRunner for Scripted {
    async fn exec(&mut self, dialog: &mut FileDialog) -> Result<DialogCode, AppError> {
        settle(dialog, &mut self.rx).await;
        (self.script)(dialog);
        Ok(dialog.result().unwrap_or(DialogCode::Rejected))
    }
}

#[tokio::test]
async fn save_dialog_returns_typed_name_and_remembers_directory() {
    let dir = workspace();
    let (backend, rx) = LocalBackend::new();
    let session: SharedSession = DialogSession::default().shared();
    let mut runner = Scripted {
        rx,
        script: Box::new(|dialog: &mut FileDialog| {
            for c in "out.txt".chars() {
                dialog.name_input(c);
            }
            dialog.ok_clicked();
        }),
    };
    let start = dir.path().to_string_lossy().into_owned();
    let request = DialogRequest::new().start(start);

    let saved = get_save_file_name(&mut runner, Box::new(backend), &session, &request)
        .await
        .expect("dialog runs");

    assert_eq!(saved, Some(target(&dir, "out.txt")));
    assert_eq!(
        session.borrow().working_dir,
        Some(DialogUrl::local(dir.path()))
    );
}
