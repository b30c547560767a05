//! src/controller/keymap.rs
//! ============================================================================
//! # Keymap: terminal keys to dialog commands
//!
//! Keys mean different things depending on which part of the dialog has the
//! focus: letters type ahead in the list but edit the name line. Modal
//! states (inline rename, a pending question, the context menu) are handled
//! by the event loop before this map is consulted.

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

/// Part of the dialog receiving keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Focus {
    #[default]
    List,
    NameLine,
    Filter,
}

impl Focus {
    pub fn next(self) -> Self {
        match self {
            Focus::List => Focus::NameLine,
            Focus::NameLine => Focus::Filter,
            Focus::Filter => Focus::List,
        }
    }

    pub fn prev(self) -> Self {
        match self {
            Focus::List => Focus::Filter,
            Focus::NameLine => Focus::List,
            Focus::Filter => Focus::NameLine,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogCommand {
    /// Commit (OK button).
    Accept,
    /// Open the current list item.
    Activate,
    Cancel,

    MoveBy(isize),
    MoveToStart,
    MoveToEnd,
    ToggleSelect,
    SelectAll,

    CdUp,
    Back,
    Home,
    Reread,

    Rename,
    Delete,
    NewFolder,
    ContextMenu,
    ToggleHidden,
    ToggleView,
    SortColumn(usize),

    NextFocus,
    PrevFocus,
    PrevFilter,
    NextFilter,

    TypeAhead(char),
    NameInput(char),
    NameBackspace,
}

const PAGE: isize = 10;

/// Command for `key` with `focus`, if it is bound.
pub fn map_key(key: KeyEvent, focus: Focus) -> Option<DialogCommand> {
    use DialogCommand as C;

    if key.kind == KeyEventKind::Release {
        return None;
    }
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    let alt = key.modifiers.contains(KeyModifiers::ALT);

    let global = match key.code {
        KeyCode::Esc => Some(C::Cancel),
        KeyCode::Tab => Some(C::NextFocus),
        KeyCode::BackTab => Some(C::PrevFocus),
        KeyCode::F(2) => Some(C::Rename),
        KeyCode::F(3) => Some(C::ToggleView),
        KeyCode::F(5) => Some(C::Reread),
        KeyCode::F(7) => Some(C::NewFolder),
        KeyCode::F(9) => Some(C::ContextMenu),
        KeyCode::Left if alt => Some(C::Back),
        KeyCode::Up if alt => Some(C::CdUp),
        KeyCode::Home if alt => Some(C::Home),
        KeyCode::Char('h') if ctrl => Some(C::ToggleHidden),
        KeyCode::Char('a') if ctrl => Some(C::SelectAll),
        KeyCode::Char('n') if alt => Some(C::SortColumn(0)),
        KeyCode::Char('s') if alt => Some(C::SortColumn(1)),
        KeyCode::Char('d') if alt => Some(C::SortColumn(3)),
        _ => None,
    };
    if global.is_some() {
        return global;
    }
    if ctrl || alt {
        return None;
    }

    match focus {
        Focus::List => match key.code {
            KeyCode::Enter => Some(C::Activate),
            KeyCode::Up => Some(C::MoveBy(-1)),
            KeyCode::Down => Some(C::MoveBy(1)),
            KeyCode::PageUp => Some(C::MoveBy(-PAGE)),
            KeyCode::PageDown => Some(C::MoveBy(PAGE)),
            KeyCode::Home => Some(C::MoveToStart),
            KeyCode::End => Some(C::MoveToEnd),
            KeyCode::Char(' ') => Some(C::ToggleSelect),
            KeyCode::Backspace => Some(C::CdUp),
            KeyCode::Delete => Some(C::Delete),
            KeyCode::Char(c) => Some(C::TypeAhead(c)),
            _ => None,
        },
        Focus::NameLine => match key.code {
            KeyCode::Enter => Some(C::Accept),
            KeyCode::Backspace => Some(C::NameBackspace),
            KeyCode::Up => Some(C::MoveBy(-1)),
            KeyCode::Down => Some(C::MoveBy(1)),
            KeyCode::Char(c) => Some(C::NameInput(c)),
            _ => None,
        },
        Focus::Filter => match key.code {
            KeyCode::Enter => Some(C::Accept),
            KeyCode::Up | KeyCode::Left => Some(C::PrevFilter),
            KeyCode::Down | KeyCode::Right => Some(C::NextFilter),
            _ => None,
        },
    }
}
