//! Common UI widgets and utilities

use ratatui::{
    Frame,
    layout::Rect,
    text::{Line, Span},
    widgets::Paragraph,
};
use unicode_width::UnicodeWidthStr;

use super::theme::Theme;
use crate::constants::SPINNER_FRAME_MS;

pub fn error_bar(frame: &mut Frame, area: Rect, message: &str) {
    let paragraph =
        Paragraph::new(format!(" {} ", sanitize_text(message).replace('\n', " "))).style(Theme::error_bar());
    frame.render_widget(paragraph, area);
}

/// Key hints, dropping trailing ones that do not fit the width
pub fn help_bar(frame: &mut Frame, area: Rect, hints: &[(&str, &str)]) {
    let available_width = area.width as usize;

    let mut spans: Vec<Span> = Vec::new();
    let mut used = 0;
    for (i, (key, desc)) in hints.iter().enumerate() {
        let separator = if i == 0 { 0 } else { 3 };
        let width = format!(" {} ", key).width() + desc.width() + separator;
        if i > 0 && used + width > available_width {
            break;
        }
        used += width;

        if i > 0 {
            spans.push(Span::styled(" │ ", Theme::text_muted()));
        }
        spans.push(Span::styled(format!(" {} ", key), Theme::help_key()));
        spans.push(Span::styled(desc.to_string(), Theme::help_desc()));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

pub fn truncate_string(s: &str, max_width: usize) -> String {
    if s.width() <= max_width {
        return s.to_string();
    }
    if max_width <= 3 {
        return s.chars().take(max_width).collect();
    }

    let mut out = String::new();
    let mut width = 0;
    for c in s.chars() {
        let w = unicode_width::UnicodeWidthChar::width(c).unwrap_or(0);
        if width + w > max_width - 3 {
            break;
        }
        width += w;
        out.push(c);
    }
    out.push_str("...");
    out
}

/// Sanitize text for display: remove control characters and ANSI escape sequences
pub fn sanitize_text(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '\x1b' && chars.peek() == Some(&'[') {
            chars.next();
            // Skip until the final letter of the sequence
            while let Some(&ch) = chars.peek() {
                chars.next();
                if ch.is_ascii_alphabetic() {
                    break;
                }
            }
            continue;
        }
        if c == '\r' {
            continue;
        }
        // Replace other control characters (except newline and tab) with space
        if c.is_control() && c != '\n' && c != '\t' {
            result.push(' ');
        } else {
            result.push(c);
        }
    }

    result
}

/// Animated spinner frame for in-flight work
pub fn spinner_char() -> char {
    const FRAMES: [char; 10] = ['⠋', '⠙', '⠹', '⠸', '⠼', '⠴', '⠦', '⠧', '⠇', '⠏'];
    let millis = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0);
    FRAMES[(millis / SPINNER_FRAME_MS) as usize % FRAMES.len()]
}
