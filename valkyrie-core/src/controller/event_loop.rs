//! src/controller/event_loop.rs
//! ============================================================================
//! # TerminalRunner: modal dialog loop on a crossterm terminal
//!
//! Owns the terminal for the lifetime of the runner and runs one dialog at a
//! time. Each turn of the loop draws the dialog and then waits on whichever
//! comes first:
//!
//! - a terminal event (keys, mouse, resize),
//! - a backend event for the dialog,
//! - the tick that drives time-based state (rename timer).

use crate::controller::keymap::{DialogCommand, Focus, map_key};
use crate::dialog::backend::BackendEvent;
use crate::dialog::convenience::DialogRunner;
use crate::dialog::file_dialog::{DialogCode, FileDialog};
use crate::dialog::projection::ViewKind;
use crate::dialog::rename::RenameState;
use crate::error::AppError;
use crate::view::ui::{DialogView, UiState};
use crossterm::{
    event::{
        DisableMouseCapture, EnableMouseCapture, Event as TermEvent, EventStream, KeyCode,
        KeyEvent, KeyEventKind, KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
    },
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use futures::StreamExt;
use ratatui::{Terminal, backend::CrosstermBackend};
use std::io::{self, Stdout};
use std::time::{Duration, Instant};
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, trace, warn};

type AppTerminal = Terminal<CrosstermBackend<Stdout>>;

const TICK_RATE: Duration = Duration::from_millis(50);

pub struct TerminalRunner {
    terminal: AppTerminal,
    events: EventStream,
    backend_rx: UnboundedReceiver<BackendEvent>,
    ui: UiState,
    restored: bool,
}

impl TerminalRunner {
    /// Switches the terminal to raw mode and the alternate screen.
    pub fn new(backend_rx: UnboundedReceiver<BackendEvent>) -> Result<Self, AppError> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
        let terminal = Terminal::new(CrosstermBackend::new(stdout))?;
        info!("Terminal ready");

        Ok(Self {
            terminal,
            events: EventStream::new(),
            backend_rx,
            ui: UiState::new(),
            restored: false,
        })
    }

    /// Gives the terminal back. Called on drop as well.
    pub fn restore(&mut self) -> Result<(), AppError> {
        if self.restored {
            return Ok(());
        }
        self.restored = true;
        disable_raw_mode()?;
        execute!(
            self.terminal.backend_mut(),
            LeaveAlternateScreen,
            DisableMouseCapture
        )?;
        self.terminal.show_cursor()?;
        info!("Terminal restored");
        Ok(())
    }

    fn handle_terminal_event(&mut self, dialog: &mut FileDialog, event: TermEvent) {
        match event {
            TermEvent::Key(key) if key.kind != KeyEventKind::Release => {
                trace!(code = ?key.code, modifiers = ?key.modifiers, "Key");
                self.handle_key(dialog, key);
            }
            TermEvent::Mouse(mouse) => self.handle_mouse(dialog, mouse),
            TermEvent::Resize(width, height) => {
                debug!(width, height, "Terminal resized");
                dialog.session().borrow_mut().last_size = Some((width, height));
            }
            _ => {}
        }
    }

    fn handle_key(&mut self, dialog: &mut FileDialog, key: KeyEvent) {
        if dialog.query().is_some() {
            match key.code {
                KeyCode::Char('y' | 'Y') | KeyCode::Enter => dialog.answer_query(true),
                KeyCode::Char('n' | 'N') | KeyCode::Esc => dialog.answer_query(false),
                _ => {}
            }
            return;
        }

        if self.ui.menu.is_some() {
            self.handle_menu_key(dialog, key);
            return;
        }

        if matches!(dialog.rename_state(), RenameState::Editing { .. }) {
            match key.code {
                KeyCode::Enter => dialog.confirm_rename(),
                KeyCode::Esc => dialog.cancel_rename(),
                KeyCode::Backspace => dialog.rename_backspace(),
                KeyCode::Char(c) => dialog.rename_input(c),
                _ => {}
            }
            return;
        }

        let Some(command) = map_key(key, self.ui.focus) else {
            return;
        };
        self.ui.status = None;
        self.apply(dialog, command);
    }

    fn handle_menu_key(&mut self, dialog: &mut FileDialog, key: KeyEvent) {
        let Some(menu) = self.ui.menu.as_mut() else {
            return;
        };
        let count = menu.menu.items().len();
        match key.code {
            KeyCode::Up => menu.selected = (menu.selected + count - 1) % count,
            KeyCode::Down => menu.selected = (menu.selected + 1) % count,
            KeyCode::Esc => self.ui.menu = None,
            KeyCode::Enter => {
                let chosen = menu.menu.items().get(menu.selected).copied();
                let target = menu.target.clone();
                self.ui.menu = None;
                if let Some((action, _, true, _)) = chosen {
                    debug!(?action, ?target, "Context action");
                    dialog.apply_popup_action(target.as_deref(), action);
                }
            }
            _ => {}
        }
    }

    fn apply(&mut self, dialog: &mut FileDialog, command: DialogCommand) {
        use DialogCommand as C;
        match command {
            C::Accept => {
                if self.ui.focus == Focus::NameLine {
                    dialog.name_edit_return();
                } else {
                    dialog.ok_clicked();
                }
            }
            C::Activate => dialog.activate_current(),
            C::Cancel => dialog.cancel_clicked(),

            C::MoveBy(delta) => dialog.move_current(delta),
            C::MoveToStart => dialog.move_current(isize::MIN),
            C::MoveToEnd => dialog.move_current(isize::MAX),
            C::ToggleSelect => {
                if let Some(row) = dialog.views().current(ViewKind::Detail) {
                    dialog.toggle_select(ViewKind::Detail, row);
                }
            }
            C::SelectAll => dialog.select_all(true),

            C::CdUp => dialog.cd_up(),
            C::Back => dialog.go_back(),
            C::Home => dialog.go_home(),
            C::Reread => dialog.reread_dir(),

            C::Rename => dialog.rename_current(),
            C::Delete => dialog.delete_current(),
            C::NewFolder => dialog.new_folder(),
            C::ContextMenu => {
                let target = dialog
                    .views()
                    .current_entry()
                    .and_then(|i| dialog.entries().get(i))
                    .map(|e| e.name.to_string());
                self.open_menu(dialog, target);
            }
            C::ToggleHidden => dialog.toggle_hidden(),
            C::ToggleView => dialog.set_active_view(dialog.active_view().other()),
            C::SortColumn(column) => dialog.header_clicked(column),

            C::NextFocus => self.ui.focus = self.ui.focus.next(),
            C::PrevFocus => self.ui.focus = self.ui.focus.prev(),
            C::PrevFilter => {
                let current = dialog.filters().current_index();
                if current > 0 {
                    dialog.activate_filter(current - 1);
                }
            }
            C::NextFilter => {
                let next = dialog.filters().current_index() + 1;
                dialog.activate_filter(next);
            }

            C::TypeAhead(c) => dialog.type_ahead(c),
            C::NameInput(c) => dialog.name_input(c),
            C::NameBackspace => dialog.name_backspace(),
        }
    }

    fn open_menu(&mut self, dialog: &FileDialog, target: Option<String>) {
        let menu = dialog.context_menu(target.as_deref());
        self.ui.open_menu(target, menu);
    }

    fn handle_mouse(&mut self, dialog: &mut FileDialog, mouse: MouseEvent) {
        if dialog.query().is_some() {
            return;
        }
        let view = dialog.active_view();
        let hit = self
            .ui
            .row_at(mouse.column, mouse.row, view)
            .filter(|row| *row < dialog.views().len());

        match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) => {
                self.ui.menu = None;
                let Some(row) = hit else {
                    return;
                };
                self.ui.focus = Focus::List;
                if mouse.modifiers.contains(KeyModifiers::CONTROL) {
                    dialog.toggle_select(view, row);
                    return;
                }
                let now = Instant::now();
                let interval = dialog.session().borrow().double_click_interval;
                if self.ui.register_click(row, now, interval) {
                    dialog.double_click(view, row);
                } else {
                    dialog.press(view, row, now);
                }
            }
            MouseEventKind::Down(MouseButton::Right) => {
                let target = hit.and_then(|row| dialog.entry(view, row)).map(|e| e.name.to_string());
                if let Some(row) = hit {
                    dialog.press(view, row, Instant::now());
                }
                self.open_menu(dialog, target);
            }
            MouseEventKind::ScrollUp => dialog.move_current(-1),
            MouseEventKind::ScrollDown => dialog.move_current(1),
            _ => {}
        }
    }
}

impl DialogRunner for TerminalRunner {
    async fn exec(&mut self, dialog: &mut FileDialog) -> Result<DialogCode, AppError> {
        self.ui = UiState::new();
        if let Ok(size) = self.terminal.size() {
            dialog.session().borrow_mut().last_size = Some((size.width, size.height));
        }

        let mut ticker = tokio::time::interval(TICK_RATE);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            for signal in dialog.take_signals() {
                self.ui.note_signal(&signal);
            }
            if let Some(code) = dialog.result() {
                return Ok(code);
            }

            let view = DialogView::new(dialog);
            let ui = &mut self.ui;
            self.terminal.draw(|frame| view.render(frame, ui))?;

            tokio::select! {
                event = self.events.next() => match event {
                    Some(Ok(event)) => self.handle_terminal_event(dialog, event),
                    Some(Err(e)) => return Err(AppError::Io(e)),
                    None => {
                        warn!("Terminal event stream ended");
                        return Ok(DialogCode::Rejected);
                    }
                },
                Some(event) = self.backend_rx.recv() => dialog.handle_event(event),
                _ = ticker.tick() => dialog.tick(Instant::now()),
            }
        }
    }
}

impl Drop for TerminalRunner {
    fn drop(&mut self) {
        if let Err(e) = self.restore() {
            warn!(error = %e, "Could not restore terminal");
        }
    }
}
