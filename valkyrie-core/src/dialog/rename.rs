//! src/dialog/rename.rs
//! ============================================================================
//! # Rename-in-place
//!
//! A slow second click on the current, already selected item arms a timer
//! of one double-click interval. If nothing else happens before it expires
//! the inline editor opens. A double click or another press disarms it.
//!
//! The controller only tracks state; time is passed in by the caller and the
//! event loop polls [`RenameController::poll`] on its tick.

use compact_str::CompactString;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum RenameState {
    #[default]
    Idle,
    Armed {
        row: usize,
        deadline: Instant,
    },
    Editing {
        row: usize,
        original: CompactString,
        text: String,
    },
}

/// What the dialog knows about a press when it happens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PressContext {
    pub row: usize,
    /// The pressed row was already the current item.
    pub was_current: bool,
    pub was_selected: bool,
    pub dir_writable: bool,
    pub is_parent_entry: bool,
}

#[derive(Debug, Clone)]
pub struct RenameController {
    state: RenameState,
    first_press: bool,
    just_renamed: bool,
}

impl Default for RenameController {
    fn default() -> Self {
        Self::new()
    }
}

impl RenameController {
    pub fn new() -> Self {
        Self {
            state: RenameState::Idle,
            first_press: true,
            just_renamed: false,
        }
    }

    pub fn state(&self) -> &RenameState {
        &self.state
    }

    pub fn is_armed(&self) -> bool {
        matches!(self.state, RenameState::Armed { .. })
    }

    pub fn is_editing(&self) -> bool {
        matches!(self.state, RenameState::Editing { .. })
    }

    /// Row being edited.
    pub fn editing_row(&self) -> Option<usize> {
        match self.state {
            RenameState::Editing { row, .. } => Some(row),
            _ => None,
        }
    }

    /// Handles a press; returns `true` when the timer was armed.
    pub fn on_press(&mut self, ctx: PressContext, now: Instant, interval: Duration) -> bool {
        let first = std::mem::replace(&mut self.first_press, false);
        let did_rename = std::mem::replace(&mut self.just_renamed, false);
        if self.is_armed() {
            self.state = RenameState::Idle;
        }

        let eligible = !first
            && !did_rename
            && ctx.was_current
            && ctx.was_selected
            && ctx.dir_writable
            && !ctx.is_parent_entry;

        if eligible && !self.is_editing() {
            self.state = RenameState::Armed {
                row: ctx.row,
                deadline: now + interval,
            };
        }
        eligible
    }

    pub fn on_double_click(&mut self) {
        if self.is_armed() {
            self.state = RenameState::Idle;
        }
    }

    /// Row whose editor should open now, if the armed timer has expired.
    pub fn poll(&mut self, now: Instant) -> Option<usize> {
        match self.state {
            RenameState::Armed { row, deadline } if now >= deadline => {
                self.state = RenameState::Idle;
                Some(row)
            }
            _ => None,
        }
    }

    /// Opens the inline editor pre-filled with the current name.
    pub fn start(&mut self, row: usize, original: &str) {
        self.state = RenameState::Editing {
            row,
            original: CompactString::new(original),
            text: original.to_string(),
        };
    }

    /// Moves an open editor to `row` after the listing was re-sorted.
    pub fn retarget(&mut self, new_row: usize) {
        if let RenameState::Editing { row, .. } = &mut self.state {
            *row = new_row;
        }
    }

    pub fn text(&self) -> Option<&str> {
        match &self.state {
            RenameState::Editing { text, .. } => Some(text),
            _ => None,
        }
    }

    pub fn input(&mut self, c: char) {
        if let RenameState::Editing { text, .. } = &mut self.state {
            text.push(c);
        }
    }

    pub fn backspace(&mut self) {
        if let RenameState::Editing { text, .. } = &mut self.state {
            text.pop();
        }
    }

    pub fn set_text(&mut self, value: &str) {
        if let RenameState::Editing { text, .. } = &mut self.state {
            *text = value.to_string();
        }
    }

    /// Closes the editor. Returns `(old, new)` when the name really changed.
    pub fn confirm(&mut self) -> Option<(CompactString, String)> {
        match std::mem::take(&mut self.state) {
            RenameState::Editing { original, text, .. } => {
                self.just_renamed = true;
                (!text.is_empty() && text != original).then_some((original, text))
            }
            other => {
                self.state = other;
                None
            }
        }
    }

    pub fn cancel(&mut self) {
        if self.is_editing() {
            self.just_renamed = true;
        }
        self.state = RenameState::Idle;
    }
}
