// src/ui/render.rs
//
// Frame layout: key hints on top, console in the middle, status bar at the
// bottom, dialogs centred over the console.

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

use super::app::App;
use super::dialogs::{Modal, ABOUT_TEXT};
use super::keymap::MenuAction;
use super::settings_dialog::{Field, SettingsDialog};
use crate::console::{Console, TextColor};
use crate::io::{Channel, ChannelState};

const INCOMING_COLOR: Color = Color::Green;
const LOCAL_COLOR: Color = Color::Red;

pub fn draw<C: Channel>(frame: &mut Frame<'_>, app: &mut App<C>) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(1),
            Constraint::Length(1),
        ])
        .split(frame.area());

    render_hints(frame, chunks[0], app);

    let console_area = chunks[1];
    app.session_mut()
        .console_mut()
        .set_page_lines(console_area.height as usize);
    render_console(frame, console_area, app.session().console());

    render_status(frame, chunks[2], app);

    if let Some(dialog) = app.settings_dialog() {
        render_settings(frame, console_area, dialog);
    } else if let Some(modal) = app.modal() {
        render_modal(frame, console_area, modal);
    }
}

fn render_hints<C: Channel>(frame: &mut Frame<'_>, area: Rect, app: &App<C>) {
    let mut spans = Vec::new();
    for action in MenuAction::ALL {
        let style = if app.is_enabled(action) {
            Style::default().fg(Color::White)
        } else {
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::DIM)
        };
        spans.push(Span::styled(
            action.key_label(),
            style.add_modifier(Modifier::BOLD),
        ));
        spans.push(Span::styled(format!(" {}  ", action.label()), style));
    }
    frame.render_widget(
        Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::Blue)),
        area,
    );
}

fn render_console(frame: &mut Frame<'_>, area: Rect, console: &Console) {
    let height = area.height as usize;
    let end = console
        .line_count()
        .saturating_sub(console.scroll_back())
        .max(1);
    let start = end.saturating_sub(height);

    let visible: Vec<Line> = console
        .lines_window(start, end - start)
        .into_iter()
        .map(|runs| {
            Line::from(
                runs.into_iter()
                    .map(|(color, text)| {
                        let fg = match color {
                            TextColor::Incoming => INCOMING_COLOR,
                            TextColor::Local => LOCAL_COLOR,
                        };
                        Span::styled(text, Style::default().fg(fg))
                    })
                    .collect::<Vec<_>>(),
            )
        })
        .collect();

    frame.render_widget(
        Paragraph::new(visible).style(Style::default().bg(Color::Black)),
        area,
    );

    // Cursor only while following the tail
    if console.scroll_back() == 0 {
        let (line, column) = console.cursor_position();
        if let Some(position) = cursor_cell(area, start..end, line, column) {
            frame.set_cursor_position(position);
        }
    }
}

/// Screen cell for the cursor at (`line`, `column`) when `visible` lines are
/// shown in `area`. Long lines pin the cursor to the right edge.
fn cursor_cell(
    area: Rect,
    visible: std::ops::Range<usize>,
    line: usize,
    column: usize,
) -> Option<(u16, u16)> {
    if !visible.contains(&line) {
        return None;
    }
    let x = column.min(usize::from(area.width.saturating_sub(1))) as u16;
    let y = (line - visible.start) as u16;
    Some((area.x + x, area.y + y))
}

fn render_status<C: Channel>(frame: &mut Frame<'_>, area: Rect, app: &App<C>) {
    let session = app.session();
    let (state, state_color) = match session.channel().state() {
        ChannelState::Open => ("OPEN", Color::Green),
        ChannelState::Closed => ("CLOSED", Color::DarkGray),
        ChannelState::Error(_) => ("ERROR", Color::Red),
    };

    let mut spans = vec![
        Span::styled(
            format!(" {} ", state),
            Style::default().fg(Color::Black).bg(state_color),
        ),
        Span::raw(" "),
        Span::raw(session.status().to_string()),
    ];
    if session.console().is_busy() {
        spans.push(Span::styled(
            "  [typing]",
            Style::default().fg(Color::Yellow),
        ));
    }
    if session.console().scroll_back() > 0 {
        spans.push(Span::styled(
            format!("  [scrolled +{}]", session.console().scroll_back()),
            Style::default().fg(Color::Cyan),
        ));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
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

fn render_modal(frame: &mut Frame<'_>, area: Rect, modal: &Modal) {
    let (body, border) = match modal {
        Modal::Error { message, .. } => (message.clone(), Color::Red),
        Modal::Warning { message, .. } => (message.clone(), Color::Yellow),
        Modal::About => (ABOUT_TEXT.to_string(), Color::Cyan),
        Modal::PathPrompt { input, .. } => (format!("Path: {}", input), Color::White),
    };

    let rect = centered(area, 72, body.lines().count() as u16 + 4);
    let block = Block::default()
        .title(format!(" {} ", modal.title()))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border));

    frame.render_widget(Clear, rect);
    frame.render_widget(
        Paragraph::new(body).block(block).wrap(Wrap { trim: false }),
        rect,
    );
}

fn render_settings(frame: &mut Frame<'_>, area: Rect, dialog: &SettingsDialog) {
    let info = dialog.port_info_lines();
    let height = (Field::ALL.len() + info.len() + 5) as u16;
    let rect = centered(area, 60, height);

    let mut lines: Vec<Line> = Field::ALL
        .iter()
        .map(|field| {
            let focused = *field == dialog.focused();
            let style = if focused {
                Style::default().fg(Color::Black).bg(Color::Cyan)
            } else {
                Style::default()
            };
            Line::from(vec![
                Span::raw(format!("{:>22}  ", field.label())),
                Span::styled(dialog.value(*field), style),
            ])
        })
        .collect();

    lines.push(Line::raw(""));
    for text in info {
        lines.push(Line::styled(text, Style::default().fg(Color::DarkGray)));
    }
    if let Some(error) = dialog.error() {
        lines.push(Line::styled(
            error.to_string(),
            Style::default().fg(Color::Red),
        ));
    }

    let block = Block::default()
        .title(" Settings  (Enter apply, Esc cancel) ")
        .borders(Borders::ALL);

    frame.render_widget(Clear, rect);
    frame.render_widget(Paragraph::new(lines).block(block), rect);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cursor_cell_clamps_long_lines() {
        let area = Rect::new(2, 1, 80, 10);
        assert_eq!(cursor_cell(area, 5..15, 7, 3), Some((5, 3)));
        assert_eq!(cursor_cell(area, 5..15, 7, 200), Some((81, 3)));
        // Wider than u16 must not wrap around to the left
        assert_eq!(cursor_cell(area, 5..15, 14, 65_536 + 4), Some((81, 10)));
        assert_eq!(cursor_cell(area, 5..15, 15, 0), None);
        assert_eq!(cursor_cell(area, 5..15, 4, 0), None);
    }
}
