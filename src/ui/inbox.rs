use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span, Text},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
};

use super::theme::Theme;
use super::widgets::{error_bar, help_bar, sanitize_text, spinner_char, truncate_string};
use crate::app::state::AppState;
use crate::error::FailureKind;
use crate::mail::{EntryIssue, InboxEntry};
use crate::selection::ActionState;

const LIST_WIDTH_PERCENT: u16 = 40;

pub fn render_inbox(frame: &mut Frame, state: &AppState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // Status bar
            Constraint::Min(0),    // Main content
            Constraint::Length(1), // Help bar or error
        ])
        .split(frame.area());

    render_status_bar(frame, chunks[0], state);

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(LIST_WIDTH_PERCENT),
            Constraint::Percentage(100 - LIST_WIDTH_PERCENT),
        ])
        .split(chunks[1]);

    render_list(frame, columns[0], state);

    let right = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(columns[1]);

    render_email(frame, right[0], state);
    render_response(frame, right[1], state);

    if let Some(ref error) = state.status.error {
        error_bar(frame, chunks[2], error);
    } else {
        let hints: &[(&str, &str)] = if state.selection.email().is_some() {
            &[
                ("s", "summarize"),
                ("r", "reply"),
                ("d", "draft"),
                ("t", "tone"),
                ("T", "cycle tone"),
                ("Esc", "close"),
                ("q", "quit"),
            ]
        } else {
            &[
                ("j/k", "move"),
                ("Enter", "open"),
                ("f", "fetch"),
                ("T", "cycle tone"),
                ("q", "quit"),
            ]
        };
        help_bar(frame, chunks[2], hints);
    }
}

fn render_status_bar(frame: &mut Frame, area: Rect, state: &AppState) {
    let style = Theme::status_bar();
    let mut spans = vec![Span::styled(" mailmate ", style.patch(Theme::label()))];

    let account = if state.signed_in {
        "signed in"
    } else {
        "not signed in"
    };
    spans.push(Span::styled(format!("│ {} ", account), style));
    spans.push(Span::styled(format!("│ tone: {} ", state.tone), style));
    if !state.ai_enabled {
        spans.push(Span::styled("│ AI off ", style.patch(Theme::text_muted())));
    }

    if state.status.fetching {
        spans.push(Span::styled(
            format!("│ {} ", spinner_char()),
            style.patch(Theme::spinner()),
        ));
    } else {
        spans.push(Span::styled("│ ", style));
    }
    spans.push(Span::styled(state.status.message.clone(), style));

    frame.render_widget(Paragraph::new(Line::from(spans)).style(style), area);
}

fn render_list(frame: &mut Frame, area: Rect, state: &AppState) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Theme::border())
        .title(format!(" Inbox ({}) ", state.entries.len()));

    if state.entries.is_empty() {
        let hint = if state.status.fetching {
            "Fetching..."
        } else {
            "No messages. Press f to fetch."
        };
        let paragraph = Paragraph::new(hint).style(Theme::text_muted()).block(block);
        frame.render_widget(paragraph, area);
        return;
    }

    // Borders plus marker columns
    let width = area.width.saturating_sub(6) as usize;
    let opened = state.selection.index();

    let items: Vec<ListItem> = state
        .entries
        .iter()
        .enumerate()
        .map(|(i, entry)| list_item(entry, opened == Some(i), width))
        .collect();

    let list = List::new(items)
        .block(block)
        .highlight_style(Theme::selected());

    let mut list_state = ListState::default().with_selected(Some(state.cursor));
    frame.render_stateful_widget(list, area, &mut list_state);
}

fn list_item(entry: &InboxEntry, opened: bool, width: usize) -> ListItem<'static> {
    let marker = if opened { "▸" } else { " " };
    let flag = if entry.is_degraded() {
        Span::styled("! ", Theme::degraded())
    } else {
        Span::raw("  ")
    };

    let from = truncate_string(&sanitize_text(entry.email.from()), width);
    let subject = truncate_string(&sanitize_text(entry.email.subject()), width);

    ListItem::new(Text::from(vec![
        Line::from(vec![
            Span::styled(marker.to_string(), Theme::text_accent()),
            flag,
            Span::styled(from, Theme::text_bold()),
        ]),
        Line::from(vec![
            Span::raw("   "),
            Span::styled(subject, Theme::text_secondary()),
        ]),
    ]))
}

fn render_email(frame: &mut Frame, area: Rect, state: &AppState) {
    let focused = state.selection.email().is_some();
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(if focused {
            Theme::border_focused()
        } else {
            Theme::border()
        })
        .title(" Email ");

    let Some(email) = state.selection.email() else {
        let paragraph = Paragraph::new("Press Enter to open the highlighted message.")
            .style(Theme::text_muted())
            .block(block);
        frame.render_widget(paragraph, area);
        return;
    };

    let mut lines = vec![
        Line::from(vec![
            Span::styled("From:    ", Theme::label()),
            Span::styled(sanitize_text(email.from()), Theme::text()),
        ]),
        Line::from(vec![
            Span::styled("Subject: ", Theme::label()),
            Span::styled(sanitize_text(email.subject()), Theme::text_bold()),
        ]),
    ];

    let issue = state
        .selection
        .index()
        .and_then(|i| state.entries.get(i))
        .and_then(|entry| entry.issue.as_ref());
    if let Some(issue) = issue {
        lines.push(Line::from(Span::styled(issue_text(issue), Theme::degraded())));
    }

    lines.push(Line::raw(""));
    let body_style = if email.has_body() {
        Theme::text()
    } else {
        Theme::text_muted()
    };
    for line in sanitize_text(email.body()).lines() {
        lines.push(Line::from(Span::styled(line.to_string(), body_style)));
    }

    let paragraph = Paragraph::new(lines)
        .block(block)
        .wrap(Wrap { trim: false });
    frame.render_widget(paragraph, area);
}

fn issue_text(issue: &EntryIssue) -> String {
    let what = match issue.kind() {
        FailureKind::Decode => "body could not be decoded",
        _ => "could not load this message",
    };
    format!("! {}: {} ({})", issue.kind().label(), what, issue.reason())
}

fn render_response(frame: &mut Frame, area: Rect, state: &AppState) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Theme::border())
        .title(" AI ");

    let paragraph = match state.selection.state() {
        ActionState::Idle => {
            let hint = if !state.ai_enabled {
                "AI backend not configured."
            } else if state.selection.email().is_some() {
                "s summarize · r reply · d draft · t rewrite in tone"
            } else {
                "Open an email to run an action."
            };
            Paragraph::new(hint).style(Theme::text_muted())
        }
        ActionState::Requesting(kind) => Paragraph::new(Line::from(vec![
            Span::styled(format!("{} ", spinner_char()), Theme::spinner()),
            Span::styled(format!("Working on {}...", kind), Theme::text_secondary()),
        ])),
        ActionState::Completed(response) => {
            let style = if response.is_empty_reply() {
                Theme::text_muted()
            } else {
                Theme::text_success()
            };
            Paragraph::new(sanitize_text(&response.text)).style(style)
        }
        ActionState::Failed(e) => Paragraph::new(format!("{}: {}", e.kind().label(), e))
            .style(Theme::failure()),
    };

    frame.render_widget(paragraph.block(block).wrap(Wrap { trim: false }), area);
}
