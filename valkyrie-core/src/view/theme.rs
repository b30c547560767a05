//! src/view/theme.rs
//! ============================================================================
//! # Catppuccin Mocha palette and dialog styles
//!
//! Colors follow the Catppuccin Mocha specification:
//! https://github.com/catppuccin/catppuccin

use crate::dialog::file_dialog::MessageLevel;
use ratatui::style::{Color, Modifier, Style};

pub const BACKGROUND: Color = Color::Rgb(30, 30, 46); // Base
pub const CURRENT_LINE: Color = Color::Rgb(69, 71, 90); // Surface1
pub const FOREGROUND: Color = Color::Rgb(205, 214, 244); // Text
pub const COMMENT: Color = Color::Rgb(127, 132, 156); // Overlay1
pub const CYAN: Color = Color::Rgb(137, 220, 235); // Sky
pub const GREEN: Color = Color::Rgb(166, 227, 161); // Green
pub const ORANGE: Color = Color::Rgb(250, 179, 135); // Peach
pub const PINK: Color = Color::Rgb(245, 194, 231); // Pink
pub const PURPLE: Color = Color::Rgb(203, 166, 247); // Mauve
pub const RED: Color = Color::Rgb(243, 139, 168); // Red
pub const YELLOW: Color = Color::Rgb(249, 226, 175); // Yellow

pub fn base_style() -> Style {
    Style::default().bg(BACKGROUND).fg(FOREGROUND)
}

pub fn border_style(focused: bool) -> Style {
    Style::default().fg(if focused { PURPLE } else { COMMENT })
}

pub fn title_style() -> Style {
    Style::default().fg(PURPLE).add_modifier(Modifier::BOLD)
}

pub fn header_style() -> Style {
    Style::default().fg(YELLOW).add_modifier(Modifier::BOLD)
}

pub fn highlight_style() -> Style {
    Style::default()
        .bg(CURRENT_LINE)
        .add_modifier(Modifier::BOLD)
}

/// Row style by entry kind and selection state.
pub fn entry_style(is_dir: bool, is_symlink: bool, selectable: bool, selected: bool) -> Style {
    let fg = if !selectable && !is_dir {
        COMMENT
    } else if is_dir {
        CYAN
    } else if is_symlink {
        PINK
    } else {
        FOREGROUND
    };
    let style = Style::default().fg(fg);
    if selected {
        style.fg(GREEN).add_modifier(Modifier::BOLD)
    } else {
        style
    }
}

pub fn rename_style() -> Style {
    Style::default()
        .fg(BACKGROUND)
        .bg(YELLOW)
}

pub fn completion_style() -> Style {
    Style::default().add_modifier(Modifier::REVERSED)
}

pub fn label_style() -> Style {
    Style::default().fg(COMMENT)
}

pub fn busy_style() -> Style {
    Style::default().fg(ORANGE).add_modifier(Modifier::ITALIC)
}

pub fn message_style(level: MessageLevel) -> Style {
    match level {
        MessageLevel::Info => Style::default().fg(GREEN),
        MessageLevel::Warning => Style::default().fg(YELLOW).add_modifier(Modifier::BOLD),
        MessageLevel::Error => Style::default().fg(RED).add_modifier(Modifier::BOLD),
    }
}

pub fn overlay_style() -> Style {
    Style::default().bg(CURRENT_LINE).fg(FOREGROUND)
}

pub fn disabled_style() -> Style {
    Style::default().fg(COMMENT)
}
