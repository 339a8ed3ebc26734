//! Colors and styles for the mailmate TUI
//!
//! One palette (Catppuccin Mocha on true-color terminals, plain ANSI
//! otherwise) behind a set of pre-composed styles.

use ratatui::style::{Color, Modifier, Style};

/// Check if the terminal supports true color (24-bit RGB)
pub fn supports_true_color() -> bool {
    std::env::var("COLORTERM")
        .map(|v| v == "truecolor" || v == "24bit")
        .unwrap_or(false)
}

mod catppuccin {
    use super::Color;

    pub const TEXT: Color = Color::Rgb(205, 214, 244); // #cdd6f4
    pub const SUBTEXT: Color = Color::Rgb(166, 173, 200); // #a6adc8
    pub const OVERLAY: Color = Color::Rgb(108, 112, 134); // #6c7086
    pub const SURFACE1: Color = Color::Rgb(69, 71, 90); // #45475a
    pub const MANTLE: Color = Color::Rgb(24, 24, 37); // #181825
    pub const RED: Color = Color::Rgb(243, 139, 168); // #f38ba8
    pub const PEACH: Color = Color::Rgb(250, 179, 135); // #fab387
    pub const YELLOW: Color = Color::Rgb(249, 226, 175); // #f9e2af
    pub const GREEN: Color = Color::Rgb(166, 227, 161); // #a6e3a1
    pub const MAUVE: Color = Color::Rgb(203, 166, 247); // #cba6f7
    pub const BLUE: Color = Color::Rgb(137, 180, 250); // #89b4fa
}

/// Color palette
pub mod colors {
    use super::*;

    fn pick(rgb: Color, ansi: Color) -> Color {
        if supports_true_color() { rgb } else { ansi }
    }

    pub fn fg_primary() -> Color {
        pick(catppuccin::TEXT, Color::White)
    }

    pub fn fg_secondary() -> Color {
        pick(catppuccin::SUBTEXT, Color::Gray)
    }

    pub fn fg_muted() -> Color {
        pick(catppuccin::OVERLAY, Color::DarkGray)
    }

    pub fn fg_accent() -> Color {
        pick(catppuccin::MAUVE, Color::Magenta)
    }

    pub fn fg_warning() -> Color {
        pick(catppuccin::PEACH, Color::Yellow)
    }

    pub fn fg_label() -> Color {
        pick(catppuccin::BLUE, Color::Cyan)
    }

    pub fn fg_success() -> Color {
        pick(catppuccin::GREEN, Color::Green)
    }

    pub fn fg_spinner() -> Color {
        pick(catppuccin::YELLOW, Color::Yellow)
    }

    pub fn bg_selection() -> Color {
        pick(catppuccin::SURFACE1, Color::Blue)
    }

    pub fn bg_status() -> Color {
        pick(catppuccin::MANTLE, Color::DarkGray)
    }

    pub fn bg_error() -> Color {
        pick(catppuccin::RED, Color::Red)
    }
}

/// Pre-composed styles for common UI elements
pub struct Theme;

impl Theme {
    pub fn selected() -> Style {
        Style::default()
            .bg(colors::bg_selection())
            .fg(colors::fg_primary())
    }

    pub fn text() -> Style {
        Style::default().fg(colors::fg_primary())
    }

    pub fn text_secondary() -> Style {
        Style::default().fg(colors::fg_secondary())
    }

    pub fn text_muted() -> Style {
        Style::default().fg(colors::fg_muted())
    }

    pub fn text_bold() -> Style {
        Self::text().add_modifier(Modifier::BOLD)
    }

    pub fn text_accent() -> Style {
        Style::default().fg(colors::fg_accent())
    }

    pub fn text_success() -> Style {
        Style::default().fg(colors::fg_success())
    }

    pub fn label() -> Style {
        Style::default()
            .fg(colors::fg_label())
            .add_modifier(Modifier::BOLD)
    }

    /// Marker for entries that could not be fully loaded
    pub fn degraded() -> Style {
        Style::default()
            .fg(colors::fg_warning())
            .add_modifier(Modifier::BOLD)
    }

    pub fn spinner() -> Style {
        Style::default().fg(colors::fg_spinner())
    }

    pub fn failure() -> Style {
        Style::default().fg(colors::bg_error())
    }

    pub fn status_bar() -> Style {
        Style::default()
            .bg(colors::bg_status())
            .fg(colors::fg_primary())
    }

    pub fn error_bar() -> Style {
        Style::default()
            .bg(colors::bg_error())
            .fg(Color::Black)
    }

    pub fn help_key() -> Style {
        Style::default().fg(colors::fg_warning())
    }

    pub fn help_desc() -> Style {
        Style::default().fg(colors::fg_muted())
    }

    pub fn border() -> Style {
        Style::default().fg(colors::fg_muted())
    }

    pub fn border_focused() -> Style {
        Style::default().fg(colors::fg_accent())
    }
}
