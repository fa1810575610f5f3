use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

use crate::api::{Level, MAX_TOP_K, MIN_TOP_K};
use crate::app::{App, ChatRole, Focus, Status};
use crate::markup;

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    // Main layout: header, body, footer
    let [header_area, body_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, frame, header_area);

    // Body: chat transcript, request controls, input box
    let [chat_area, controls_area, input_area] = Layout::vertical([
        Constraint::Min(0),
        Constraint::Length(3),
        Constraint::Length(3),
    ])
    .areas(body_area);

    render_chat(app, frame, chat_area);
    render_controls(app, frame, controls_area);
    render_input(app, frame, input_area);
    render_footer(app, frame, footer_area);

    // Popups (a notice outranks the clear confirm)
    if let Some(notice) = app.notice.clone() {
        render_notice(frame, area, &notice);
    } else if app.show_clear_confirm {
        render_clear_confirm(frame, area);
    }
}

fn status_indicator(app: &App) -> (&'static str, Style) {
    match app.status {
        Status::Ready => ("Ready", Style::default().fg(Color::Green)),
        Status::Thinking => ("Thinking...", Style::default().fg(Color::Yellow)),
        Status::Error => ("Error", Style::default().fg(Color::Red)),
        Status::KeyMissing => ("⚠ API Key not set", Style::default().fg(Color::Yellow)),
    }
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let (status_text, status_style) = status_indicator(app);
    let status_width = status_text.chars().count() as u16 + 2;

    let [title_area, status_area] =
        Layout::horizontal([Constraint::Min(0), Constraint::Length(status_width)]).areas(area);

    let title = Line::from(vec![
        Span::styled(" Docubot ", Style::default().fg(Color::Cyan).bold()),
        Span::styled(
            "Ceph documentation assistant",
            Style::default().fg(Color::Gray),
        ),
        Span::raw(" "),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::DarkGray),
        ),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, title_area);

    let status = Paragraph::new(Line::from(Span::styled(status_text, status_style.bold())))
        .style(Style::default().bg(Color::DarkGray));
    frame.render_widget(status, status_area);
}

fn welcome_text() -> Text<'static> {
    let dim = Style::default().fg(Color::DarkGray);
    Text::from(vec![
        Line::default(),
        Line::from(Span::styled(
            " Welcome to Docubot!",
            Style::default().fg(Color::Cyan).bold(),
        )),
        Line::from(Span::styled(
            " Ask me anything about the Ceph distributed storage system.",
            Style::default().fg(Color::Gray),
        )),
        Line::default(),
        Line::from(Span::styled(" Examples:", dim)),
        Line::from(Span::styled("   \"What is Ceph?\"", dim)),
        Line::from(Span::styled("   \"How does CRUSH algorithm work?\"", dim)),
        Line::from(Span::styled("   \"Explain OSDs in Ceph\"", dim)),
        Line::from(Span::styled("   \"What is RADOS?\"", dim)),
    ])
}

fn render_chat(app: &mut App, frame: &mut Frame, area: Rect) {
    // Store chat area dimensions for scroll calculations and mouse hit-testing
    app.chat_area = Some(area);
    app.chat_height = area.height.saturating_sub(2);
    app.chat_width = area.width.saturating_sub(2);

    let focused = app.focus == Focus::Chat;
    let border_color = if focused { Color::Cyan } else { Color::DarkGray };

    let chat_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(" Conversation ");

    let chat_text = if app.message_count == 0 && !app.query_loading {
        welcome_text()
    } else {
        let mut lines: Vec<Line> = Vec::new();

        for msg in &app.chat_messages {
            let (label, color) = match msg.role {
                ChatRole::User => ("You:", Color::Cyan),
                ChatRole::Bot => ("Docubot:", Color::Yellow),
            };
            lines.push(Line::from(Span::styled(
                label,
                Style::default().fg(color).add_modifier(Modifier::BOLD),
            )));
            lines.extend(markup::content_lines(&msg.content));
            lines.push(Line::from(Span::styled(
                msg.timestamp.format("%H:%M:%S").to_string(),
                Style::default().fg(Color::DarkGray),
            )));
            lines.push(Line::default());
        }

        if app.query_loading {
            lines.push(Line::from(Span::styled(
                "Docubot:",
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
            )));
            let dots = ".".repeat((app.animation_frame as usize) + 1);
            lines.push(Line::from(Span::styled(
                format!("Thinking{}", dots),
                Style::default()
                    .fg(Color::DarkGray)
                    .add_modifier(Modifier::ITALIC),
            )));
        }

        Text::from(lines)
    };

    let chat = Paragraph::new(chat_text)
        .block(chat_block)
        .wrap(Wrap { trim: true })
        .scroll((app.chat_scroll, 0));

    frame.render_widget(chat, area);
}

fn render_controls(app: &App, frame: &mut Frame, area: Rect) {
    let [level_area, top_k_area] =
        Layout::horizontal([Constraint::Percentage(60), Constraint::Percentage(40)]).areas(area);

    // Detail level selector
    let level_focused = app.focus == Focus::Level;
    let level_border = if level_focused { Color::Yellow } else { Color::DarkGray };

    let mut level_spans: Vec<Span> = vec![Span::raw(" ")];
    for level in Level::all() {
        let style = if *level == app.level {
            Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        level_spans.push(Span::styled(level.display_name(), style));
        level_spans.push(Span::raw("  "));
    }

    let level_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(level_border))
        .title(" Detail Level ");
    frame.render_widget(Paragraph::new(Line::from(level_spans)).block(level_block), level_area);

    // Top-K slider
    let top_k_focused = app.focus == Focus::TopK;
    let top_k_border = if top_k_focused { Color::Yellow } else { Color::DarkGray };

    let top_k_line = Line::from(vec![
        Span::styled(" ◂ ", Style::default().fg(Color::DarkGray)),
        Span::styled(
            format!("{}", app.top_k),
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ),
        Span::styled(" ▸ ", Style::default().fg(Color::DarkGray)),
        Span::styled(
            format!("({}-{} retrieved chunks)", MIN_TOP_K, MAX_TOP_K),
            Style::default().fg(Color::DarkGray),
        ),
    ]);

    let top_k_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(top_k_border))
        .title(" Top K ");
    frame.render_widget(Paragraph::new(top_k_line).block(top_k_block), top_k_area);
}

fn render_input(app: &App, frame: &mut Frame, area: Rect) {
    let focused = app.focus == Focus::Input;
    let border_color = if focused && !app.query_loading {
        Color::Yellow
    } else {
        Color::DarkGray
    };

    let input_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(" Ask (Enter to send) ");

    // Horizontal scroll keeps the cursor inside the bordered width
    let inner_width = area.width.saturating_sub(2) as usize;
    let cursor_pos = app.query_cursor;

    let scroll_offset = if inner_width == 0 {
        0
    } else if cursor_pos >= inner_width {
        cursor_pos - inner_width + 1
    } else {
        0
    };

    let visible_text: String = app
        .query_input
        .chars()
        .skip(scroll_offset)
        .take(inner_width)
        .collect();

    let text_color = if app.query_loading { Color::DarkGray } else { Color::Cyan };
    let input = Paragraph::new(visible_text)
        .style(Style::default().fg(text_color))
        .block(input_block);

    frame.render_widget(input, area);

    if focused && !app.query_loading {
        let cursor_x = (cursor_pos - scroll_offset).min(inner_width) as u16;
        frame.set_cursor_position((area.x + 1 + cursor_x, area.y + 1));
    }
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    // Key style: dark background with bright text for visibility on both light/dark terminals
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);

    let mut hints = match app.focus {
        Focus::Input => vec![
            Span::styled(" Enter ", key_style),
            Span::styled(" send ", label_style),
        ],
        Focus::Level => vec![
            Span::styled(" ←/→ ", key_style),
            Span::styled(" level ", label_style),
        ],
        Focus::TopK => vec![
            Span::styled(" ←/→ ", key_style),
            Span::styled(" adjust ", label_style),
        ],
        Focus::Chat => vec![
            Span::styled(" j/k ", key_style),
            Span::styled(" scroll ", label_style),
            Span::styled(" g/G ", key_style),
            Span::styled(" top/bottom ", label_style),
            Span::styled(" q ", key_style),
            Span::styled(" quit ", label_style),
        ],
    };

    hints.extend(vec![
        Span::styled(" Tab ", key_style),
        Span::styled(" focus ", label_style),
        Span::styled(" Ctrl+L ", key_style),
        Span::styled(" clear ", label_style),
        Span::styled(" Ctrl+C ", key_style),
        Span::styled(" quit ", label_style),
    ]);

    let footer = Paragraph::new(Line::from(hints));
    frame.render_widget(footer, area);
}

fn render_notice(frame: &mut Frame, area: Rect, notice: &str) {
    let popup_width = (notice.chars().count() as u16 + 6)
        .max(30)
        .min(area.width.saturating_sub(4));
    let popup_height = 5;

    let popup_x = (area.width.saturating_sub(popup_width)) / 2;
    let popup_y = (area.height.saturating_sub(popup_height)) / 2;
    let popup_area = Rect::new(popup_x, popup_y, popup_width, popup_height);

    // Clear the area behind the popup
    frame.render_widget(Clear, popup_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow))
        .title(" Notice ");

    let text = Text::from(vec![
        Line::default(),
        Line::from(notice.to_string()).centered(),
        Line::from(Span::styled(
            "press any key",
            Style::default().fg(Color::DarkGray),
        ))
        .centered(),
    ]);

    frame.render_widget(Paragraph::new(text).block(block), popup_area);
}

fn render_clear_confirm(frame: &mut Frame, area: Rect) {
    let popup_width = 48.min(area.width.saturating_sub(4));
    let popup_height = 5;

    let popup_x = (area.width.saturating_sub(popup_width)) / 2;
    let popup_y = (area.height.saturating_sub(popup_height)) / 2;
    let popup_area = Rect::new(popup_x, popup_y, popup_width, popup_height);

    frame.render_widget(Clear, popup_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Red))
        .title(" Clear history ");

    let text = Text::from(vec![
        Line::default(),
        Line::from("Clear all messages? This cannot be undone.").centered(),
        Line::from(vec![
            Span::styled("y", Style::default().fg(Color::Green).bold()),
            Span::raw(" confirm  ·  "),
            Span::styled("n", Style::default().fg(Color::Red).bold()),
            Span::raw(" cancel"),
        ])
        .centered(),
    ]);

    frame.render_widget(Paragraph::new(text).block(block), popup_area);
}
