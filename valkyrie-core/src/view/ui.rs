//! src/view/ui.rs
//! ============================================================================
//! # DialogView: ratatui rendering of a FileDialog
//!
//! Layout, top to bottom: path bar, file list (detail table or compact
//! list), name line, filter line with the buttons, status bar. A pending
//! question or the context menu is drawn on top.
//!
//! [`UiState`] holds what only the terminal front-end needs: focus, widget
//! scroll state, the last status message and the geometry used to map mouse
//! clicks back to rows.

use crate::controller::keymap::Focus;
use crate::dialog::file_dialog::{ContextMenu, DialogSignal, FileDialog, MessageLevel};
use crate::dialog::projection::ViewKind;
use crate::dialog::rename::RenameState;
use crate::dialog::sorted_list::SortKey;
use crate::fs::url_info::UrlInfo;
use crate::view::{icons, theme};
use ratatui::{
    prelude::*,
    widgets::{
        Block, Borders, Cell, Clear, HighlightSpacing, List, ListItem, ListState, Paragraph, Row,
        Table, TableState, Wrap,
    },
};
use std::time::{Duration, Instant};
use tracing::debug;

const HEADERS: [&str; 5] = ["Name", "Size", "Type", "Date", "Attributes"];

/// Context menu being shown for `target`.
#[derive(Debug, Clone)]
pub struct MenuState {
    pub target: Option<String>,
    pub menu: ContextMenu,
    pub selected: usize,
}

#[derive(Debug, Default)]
pub struct UiState {
    pub focus: Focus,
    pub status: Option<(MessageLevel, String)>,
    pub menu: Option<MenuState>,
    table: TableState,
    list: ListState,
    list_area: Rect,
    last_click: Option<(usize, Instant)>,
}

impl UiState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reflects a dialog signal in the status bar.
    pub fn note_signal(&mut self, signal: &DialogSignal) {
        match signal {
            DialogSignal::Message { level, text, .. } => {
                self.status = Some((*level, text.replace('\n', " ")));
            }
            DialogSignal::DirEntered(_) => self.status = None,
            other => debug!(signal = ?other, "Dialog signal"),
        }
    }

    /// Row of `view` under the terminal cell `(column, row)`.
    pub fn row_at(&self, column: u16, row: u16, view: ViewKind) -> Option<usize> {
        let inner = self.list_area.inner(Margin::new(1, 1));
        let header = if view == ViewKind::Detail { 1 } else { 0 };
        let first = inner.y + header;
        if !inner.contains(Position::new(column, row)) || row < first {
            return None;
        }
        let offset = match view {
            ViewKind::Detail => self.table.offset(),
            ViewKind::Compact => self.list.offset(),
        };
        Some(offset + usize::from(row - first))
    }

    /// Records a click on `row`; `true` when it completes a double click.
    pub fn register_click(&mut self, row: usize, now: Instant, interval: Duration) -> bool {
        let double = matches!(
            self.last_click,
            Some((last, at)) if last == row && now.duration_since(at) <= interval
        );
        self.last_click = if double { None } else { Some((row, now)) };
        double
    }

    pub fn open_menu(&mut self, target: Option<String>, menu: ContextMenu) {
        self.menu = Some(MenuState {
            target,
            menu,
            selected: 0,
        });
    }
}

pub struct DialogView<'a> {
    dialog: &'a FileDialog,
}

impl<'a> DialogView<'a> {
    pub fn new(dialog: &'a FileDialog) -> Self {
        Self { dialog }
    }

    pub fn render(&self, frame: &mut Frame<'_>, ui: &mut UiState) {
        let [path_area, list_area, name_area, filter_area, status_area] = Layout::vertical([
            Constraint::Length(1),
            Constraint::Min(3),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(1),
        ])
        .areas(frame.area());

        frame.render_widget(Block::default().style(theme::base_style()), frame.area());
        self.render_path_bar(frame, path_area);
        match self.dialog.active_view() {
            ViewKind::Detail => self.render_detail(frame, list_area, ui),
            ViewKind::Compact => self.render_compact(frame, list_area, ui),
        }
        ui.list_area = list_area;
        self.render_name_line(frame, name_area, ui.focus);
        self.render_filter_line(frame, filter_area, ui.focus);
        self.render_status(frame, status_area, ui);

        if let Some(query) = self.dialog.query() {
            render_query(frame, query.title(), query.text());
        } else if let Some(menu) = &ui.menu {
            render_menu(frame, menu);
        }
    }

    fn render_path_bar(&self, frame: &mut Frame<'_>, area: Rect) {
        let mut spans = vec![
            Span::styled(format!(" {} ", self.dialog.caption()), theme::title_style()),
            Span::styled("Look in: ", theme::label_style()),
            Span::raw(self.dialog.url().to_string()),
        ];
        if self.dialog.is_busy() {
            spans.push(Span::styled("  reading…", theme::busy_style()));
        }
        if let Some(progress) = self.dialog.progress_label() {
            spans.push(Span::styled(format!("  {progress}"), theme::busy_style()));
        }
        frame.render_widget(Paragraph::new(Line::from(spans)), area);
    }

    fn list_block(&self, focused: bool) -> Block<'static> {
        let title = match self.dialog.active_view() {
            ViewKind::Detail => " Detail ",
            ViewKind::Compact => " List ",
        };
        Block::default()
            .borders(Borders::ALL)
            .title(title)
            .title_style(theme::title_style())
            .border_style(theme::border_style(focused))
    }

    fn name_cell(&self, row: usize, info: &UrlInfo) -> Line<'static> {
        if let RenameState::Editing { row: editing, text, .. } = self.dialog.rename_state() {
            if *editing == row {
                return Line::from(Span::styled(format!("{text}▏"), theme::rename_style()));
            }
        }
        Line::from(format!("{} {}", icons::icon_for(info), info.name))
    }

    fn header_row(&self) -> Row<'static> {
        let sort = self.dialog.sort_spec();
        let arrow = if sort.ascending { " ▲" } else { " ▼" };
        let cells = HEADERS.iter().enumerate().map(|(column, title)| {
            if sort.key != SortKey::Unsorted && sort.key.column() == column {
                Cell::from(format!("{title}{arrow}"))
            } else {
                Cell::from(*title)
            }
        });
        Row::new(cells).style(theme::header_style())
    }

    fn render_detail(&self, frame: &mut Frame<'_>, area: Rect, ui: &mut UiState) {
        let views = self.dialog.views();
        let rows: Vec<Row> = views
            .detail()
            .iter()
            .enumerate()
            .filter_map(|(row, item)| {
                let info = self.dialog.entries().get(item.entry)?;
                Some(
                    Row::new(vec![
                        Cell::from(self.name_cell(row, info)),
                        Cell::from(info.size_text()),
                        Cell::from(info.kind_text()),
                        Cell::from(info.date_text()),
                        Cell::from(info.access_text()),
                    ])
                    .style(theme::entry_style(
                        info.is_dir,
                        info.is_symlink,
                        item.selectable,
                        item.selected,
                    )),
                )
            })
            .collect();

        let widths = [
            Constraint::Fill(1),
            Constraint::Length(10),
            Constraint::Length(22),
            Constraint::Length(17),
            Constraint::Length(12),
        ];

        let table = Table::new(rows, widths)
            .header(self.header_row())
            .block(self.list_block(ui.focus == Focus::List))
            .row_highlight_style(theme::highlight_style())
            .highlight_symbol("▶ ")
            .highlight_spacing(HighlightSpacing::Always);

        ui.table.select(views.current(ViewKind::Detail));
        frame.render_stateful_widget(table, area, &mut ui.table);
    }

    fn render_compact(&self, frame: &mut Frame<'_>, area: Rect, ui: &mut UiState) {
        let views = self.dialog.views();
        let items: Vec<ListItem> = views
            .compact()
            .iter()
            .filter_map(|item| {
                let info = self.dialog.entries().get(item.entry)?;
                Some(
                    ListItem::new(self.name_cell(item.detail, info)).style(theme::entry_style(
                        info.is_dir,
                        info.is_symlink,
                        item.selectable,
                        item.selected,
                    )),
                )
            })
            .collect();

        let list = List::new(items)
            .block(self.list_block(ui.focus == Focus::List))
            .highlight_style(theme::highlight_style())
            .highlight_symbol("▶ ")
            .highlight_spacing(HighlightSpacing::Always);

        ui.list.select(views.current(ViewKind::Compact));
        frame.render_stateful_widget(list, area, &mut ui.list);
    }

    fn render_name_line(&self, frame: &mut Frame<'_>, area: Rect, focus: Focus) {
        const LABEL: &str = " File name: ";
        let text = self.dialog.name_text();
        let mut spans = vec![Span::styled(LABEL, theme::label_style())];
        match self.dialog.name_completion() {
            Some(at) if at <= text.len() => {
                spans.push(Span::raw(text[..at].to_string()));
                spans.push(Span::styled(text[at..].to_string(), theme::completion_style()));
            }
            _ => spans.push(Span::raw(text.to_string())),
        }
        frame.render_widget(Paragraph::new(Line::from(spans)), area);

        if focus == Focus::NameLine {
            let typed = self.dialog.name_completion().unwrap_or(text.len());
            let width = LABEL.chars().count() + text[..typed.min(text.len())].chars().count();
            let x = area.x.saturating_add(u16::try_from(width).unwrap_or(u16::MAX));
            frame.set_cursor_position((x.min(area.right().saturating_sub(1)), area.y));
        }
    }

    fn render_filter_line(&self, frame: &mut Frame<'_>, area: Rect, focus: Focus) {
        let filters = self.dialog.filters();
        let label_style = if focus == Focus::Filter {
            theme::highlight_style()
        } else {
            Style::default()
        };
        let spans = vec![
            Span::styled(" Filter:    ", theme::label_style()),
            Span::styled(format!("◀ {} ▶", filters.selected_label()), label_style),
            Span::styled(
                format!("  ({}/{})", filters.current_index() + 1, filters.labels().len()),
                theme::label_style(),
            ),
            Span::raw("   "),
            Span::styled(format!("[ {} ]", self.dialog.ok_label()), theme::title_style()),
            Span::raw(" "),
            Span::styled("[ Cancel ]", theme::label_style()),
        ];
        frame.render_widget(Paragraph::new(Line::from(spans)), area);
    }

    fn render_status(&self, frame: &mut Frame<'_>, area: Rect, ui: &UiState) {
        let line = match &ui.status {
            Some((level, text)) => Line::from(Span::styled(
                format!(" {text}"),
                theme::message_style(*level),
            )),
            None => Line::from(Span::styled(
                " Tab focus  F2 rename  F3 view  F5 reload  F7 new folder  F9 menu  Ctrl-H hidden",
                theme::label_style(),
            )),
        };
        frame.render_widget(Paragraph::new(line), area);
    }
}

fn render_query(frame: &mut Frame<'_>, title: &str, text: &str) {
    let area = centered(frame.area(), 60, 7);
    let body = vec![
        Line::from(text.to_string()),
        Line::default(),
        Line::from(Span::styled("[y] Yes   [n] No", theme::title_style())),
    ];
    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!(" {title} "))
        .title_style(theme::title_style())
        .border_style(theme::border_style(true))
        .style(theme::overlay_style());
    frame.render_widget(Clear, area);
    frame.render_widget(
        Paragraph::new(body).block(block).wrap(Wrap { trim: true }),
        area,
    );
}

fn render_menu(frame: &mut Frame<'_>, state: &MenuState) {
    let items = state.menu.items();
    let height = u16::try_from(items.len()).unwrap_or(u16::MAX).saturating_add(2);
    let area = centered(frame.area(), 30, height);
    let lines: Vec<ListItem> = items
        .iter()
        .map(|(_, label, enabled, checked)| {
            let mark = if *checked { "✓ " } else { "  " };
            let style = if *enabled {
                Style::default()
            } else {
                theme::disabled_style()
            };
            ListItem::new(format!("{mark}{label}")).style(style)
        })
        .collect();
    let list = List::new(lines)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(theme::border_style(true))
                .style(theme::overlay_style()),
        )
        .highlight_style(theme::highlight_style());
    let mut list_state = ListState::default().with_selected(Some(state.selected));
    frame.render_widget(Clear, area);
    frame.render_stateful_widget(list, area, &mut list_state);
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn clicks_map_to_rows_below_header() {
        let mut ui = UiState::new();
        ui.list_area = Rect::new(0, 1, 40, 10);

        assert_eq!(ui.row_at(5, 1, ViewKind::Detail), None);
        assert_eq!(ui.row_at(5, 2, ViewKind::Detail), None);
        assert_eq!(ui.row_at(5, 3, ViewKind::Detail), Some(0));
        assert_eq!(ui.row_at(5, 2, ViewKind::Compact), Some(0));
        assert_eq!(ui.row_at(45, 3, ViewKind::Compact), None);
    }

    #[test]
    fn double_click_needs_same_row_within_interval() {
        let mut ui = UiState::new();
        let t0 = Instant::now();
        let interval = Duration::from_millis(400);

        assert!(!ui.register_click(2, t0, interval));
        assert!(ui.register_click(2, t0 + Duration::from_millis(100), interval));
        assert!(!ui.register_click(2, t0 + Duration::from_millis(150), interval));
        assert!(!ui.register_click(3, t0 + Duration::from_millis(200), interval));
        assert!(!ui.register_click(3, t0 + Duration::from_secs(2), interval));
    }

    #[test]
    fn messages_reach_status_bar() {
        let mut ui = UiState::new();
        ui.note_signal(&DialogSignal::Message {
            level: MessageLevel::Warning,
            title: "Open".into(),
            text: "Could not read directory\n/root".into(),
        });
        assert_eq!(
            ui.status,
            Some((MessageLevel::Warning, "Could not read directory /root".to_string()))
        );
        ui.note_signal(&DialogSignal::DirEntered("/tmp".into()));
        assert_eq!(ui.status, None);
    }

    #[test]
    fn centered_rect_fits_inside() {
        let outer = Rect::new(0, 0, 20, 10);
        assert_eq!(centered(outer, 60, 7), Rect::new(0, 1, 20, 7));
    }
}
