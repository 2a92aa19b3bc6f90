use finrag_core::controller::{IngestIndicator, View};
use finrag_core::{Author, Message, RenderMode};
use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, List, ListItem, Paragraph, Wrap},
};

use crate::app::{App, FocusPane, InputMode};

/// Style one line of an assistant answer: `#` headings, `-`/`*` bullets,
/// and inline **bold**, *italic* and `code`.
fn parse_markdown_line(text: &str) -> Line<'static> {
    let trimmed = text.trim_start();

    let heading = trimmed
        .strip_prefix("### ")
        .or_else(|| trimmed.strip_prefix("## "))
        .or_else(|| trimmed.strip_prefix("# "));
    if let Some(heading) = heading {
        return Line::from(Span::styled(
            heading.trim().to_string(),
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ));
    }

    let mut spans: Vec<Span<'static>> = Vec::new();
    let bullet = trimmed
        .strip_prefix("- ")
        .or_else(|| trimmed.strip_prefix("* "));
    let indent = " ".repeat(text.len() - trimmed.len());
    let body = match (bullet, numbered_item(trimmed)) {
        (Some(item), _) => {
            spans.push(Span::raw(format!("{}• ", indent)));
            item
        }
        (None, Some((number, item))) => {
            spans.push(Span::styled(
                format!("{}{}. ", indent, number),
                Style::default().fg(Color::Cyan),
            ));
            item
        }
        (None, None) => text,
    };
    spans.extend(parse_inline(body));

    if spans.is_empty() {
        Line::default()
    } else {
        Line::from(spans)
    }
}

/// Split `12. rest` into `("12", "rest")`
fn numbered_item(text: &str) -> Option<(&str, &str)> {
    let (number, rest) = text.split_once(". ")?;
    if !number.is_empty() && number.chars().all(|c| c.is_ascii_digit()) {
        Some((number, rest))
    } else {
        None
    }
}

fn parse_inline(text: &str) -> Vec<Span<'static>> {
    let mut spans: Vec<Span<'static>> = Vec::new();
    let mut chars = text.chars().peekable();
    let mut current_text = String::new();

    while let Some(c) = chars.next() {
        let (marker, style) = match c {
            '`' => ("`", Style::default().fg(Color::Yellow)),
            '*' if chars.peek() == Some(&'*') => {
                chars.next();
                ("**", Style::default().add_modifier(Modifier::BOLD))
            }
            // A lone `*` before a space is multiplication, not emphasis
            '*' if chars.peek().map_or(true, |n| n.is_whitespace()) => {
                current_text.push(c);
                continue;
            }
            '*' => ("*", Style::default().add_modifier(Modifier::ITALIC)),
            _ => {
                current_text.push(c);
                continue;
            }
        };

        // Collect up to the matching closing marker
        let mut inner = String::new();
        let mut found_close = false;
        while let Some(c) = chars.next() {
            if marker == "**" && c == '*' && chars.peek() == Some(&'*') {
                chars.next();
                found_close = true;
                break;
            }
            if marker != "**" && marker.starts_with(c) {
                found_close = true;
                break;
            }
            inner.push(c);
        }

        if found_close && !inner.is_empty() {
            if !current_text.is_empty() {
                spans.push(Span::raw(std::mem::take(&mut current_text)));
            }
            spans.push(Span::styled(inner, style));
        } else {
            // No closing marker, treat as literal
            current_text.push_str(marker);
            current_text.push_str(&inner);
            if found_close {
                current_text.push_str(marker);
            }
        }
    }

    if !current_text.is_empty() {
        spans.push(Span::raw(current_text));
    }
    spans
}

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    // Main layout: header, body, footer
    let [header_area, body_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(1),
    ])
    .areas(area);

    let [sidebar_area, main_area] = Layout::horizontal([
        Constraint::Length(34),
        Constraint::Min(0),
    ])
    .areas(body_area);

    let [chat_area, caption_area, input_area] = Layout::vertical([
        Constraint::Min(0),
        Constraint::Length(1),
        Constraint::Length(3),
    ])
    .areas(main_area);

    // Store chat area dimensions for scroll calculations (inner size minus borders)
    app.chat_height = chat_area.height.saturating_sub(2);
    app.chat_width = chat_area.width.saturating_sub(2);

    let view = app.controller.view();
    render_header(app, &view, frame, header_area);
    render_sidebar(app, &view, frame, sidebar_area);
    render_chat(app, &view, frame, chat_area);
    render_caption(&view, frame, caption_area);
    render_question_input(app, &view, frame, input_area);
    render_footer(app, &view, frame, footer_area);
}

fn render_header(app: &App, view: &View, frame: &mut Frame, area: Rect) {
    let company = match view.active_ticker {
        Some(ticker) => format!(" [{}]", ticker),
        None => " [no company]".to_string(),
    };

    let title = Line::from(vec![
        Span::styled(" FinRAG ", Style::default().fg(Color::Cyan).bold()),
        Span::styled(company, Style::default().fg(Color::White)),
        Span::raw(" "),
        Span::styled(app.api_url.clone(), Style::default().fg(Color::Gray)),
        Span::raw(" "),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::Gray),
        ),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

fn render_sidebar(app: &App, view: &View, frame: &mut Frame, area: Rect) {
    let [ticker_area, status_area, suggestions_area] = Layout::vertical([
        Constraint::Length(3),
        Constraint::Length(4),
        Constraint::Min(0),
    ])
    .areas(area);

    // Ticker input
    let editing = app.input_mode == InputMode::Editing && app.focus == FocusPane::Ticker;
    let border_color = if editing {
        Color::Yellow
    } else if app.focus == FocusPane::Ticker {
        Color::Cyan
    } else {
        Color::DarkGray
    };
    let title = if view.ingest_enabled {
        " Ticker (Enter to ingest) "
    } else {
        " Ticker (ingesting) "
    };
    let input = Paragraph::new(view.inputs.ticker.as_str())
        .style(Style::default().fg(Color::Cyan))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(border_color))
                .title(title),
        );
    frame.render_widget(input, ticker_area);
    if editing {
        let cursor_x = (app.ticker_cursor as u16).min(ticker_area.width.saturating_sub(3));
        frame.set_cursor_position((ticker_area.x + cursor_x + 1, ticker_area.y + 1));
    }

    // Ingest status and active company
    let dots = ".".repeat((app.animation_frame as usize) + 1);
    let status_line = match view.ingest {
        IngestIndicator::Empty => Line::from(Span::styled(
            "Not ingested yet",
            Style::default().fg(Color::DarkGray),
        )),
        IngestIndicator::Busy { ticker } => Line::from(Span::styled(
            format!("Ingesting {}{}", ticker, dots),
            Style::default().fg(Color::Yellow),
        )),
        IngestIndicator::Succeeded { .. } => Line::from(Span::styled(
            view.ingest.text(),
            Style::default().fg(Color::Green),
        )),
        IngestIndicator::Failed { .. } => Line::from(Span::styled(
            view.ingest.text(),
            Style::default().fg(Color::Red),
        )),
    };
    let mut lines = vec![status_line];
    if let IngestIndicator::Succeeded { summary, .. } = view.ingest {
        if !summary.is_empty() {
            lines.push(Line::from(Span::styled(
                summary.clone(),
                Style::default().fg(Color::DarkGray),
            )));
        }
    }
    let status = Paragraph::new(Text::from(lines))
        .wrap(Wrap { trim: true })
        .block(Block::default().borders(Borders::ALL).title(" Status "));
    frame.render_widget(status, status_area);

    // Suggested questions
    let focused = app.focus == FocusPane::Suggestions;
    let items: Vec<ListItem> = view
        .suggestions
        .iter()
        .map(|s| ListItem::new(s.clone()))
        .collect();
    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(if focused {
                    Color::Cyan
                } else {
                    Color::DarkGray
                }))
                .title(" Suggestions "),
        )
        .highlight_style(
            Style::default()
                .bg(if focused { Color::Cyan } else { Color::DarkGray })
                .fg(Color::Black)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");
    let mut state = app.suggestion_state.clone();
    frame.render_stateful_widget(list, suggestions_area, &mut state);
}

fn message_lines(msg: &Message, animation_frame: u8) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    match msg.author {
        Author::User => lines.push(Line::from(Span::styled(
            "You:",
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ))),
        Author::Assistant => lines.push(Line::from(Span::styled(
            "AI:",
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        ))),
    }

    if msg.is_pending() {
        // Animated ellipsis: cycles through ".", "..", "..."
        let dots = ".".repeat((animation_frame as usize) + 1);
        lines.push(Line::from(Span::styled(
            format!("Analyzing{}", dots),
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        )));
    } else {
        for line in msg.body.lines() {
            match msg.render_mode {
                RenderMode::PlainText => lines.push(Line::from(line.to_string())),
                RenderMode::RichText => lines.push(parse_markdown_line(line)),
            }
        }
    }
    lines.push(Line::default());
    lines
}

fn render_chat(app: &App, view: &View, frame: &mut Frame, area: Rect) {
    let focused = app.focus == FocusPane::Chat;
    let title = match &view.effective_ticker {
        Some(ticker) => format!(" Chat: {} ", ticker),
        None => " Chat ".to_string(),
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(if focused { Color::Cyan } else { Color::DarkGray }))
        .title(title);

    let text = if view.messages.is_empty() {
        Text::from(Span::styled(
            "Ingest a ticker, then ask about the company's financials...",
            Style::default().fg(Color::DarkGray),
        ))
    } else {
        let lines: Vec<Line> = view
            .messages
            .iter()
            .flat_map(|msg| message_lines(msg, app.animation_frame))
            .collect();
        Text::from(lines)
    };

    let chat = Paragraph::new(text)
        .block(block)
        .wrap(Wrap { trim: true })
        .scroll((app.chat_scroll, 0));
    frame.render_widget(chat, area);
}

fn render_caption(view: &View, frame: &mut Frame, area: Rect) {
    let line = match (view.notice, view.caption) {
        (Some(notice), _) => Line::from(Span::styled(
            format!(" {}", notice),
            Style::default().fg(Color::Magenta),
        )),
        (None, Some(caption)) => Line::from(Span::styled(
            format!(" {}", caption),
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        )),
        (None, None) => Line::default(),
    };
    frame.render_widget(Paragraph::new(line), area);
}

fn render_question_input(app: &App, view: &View, frame: &mut Frame, area: Rect) {
    let editing = app.input_mode == InputMode::Editing && app.focus == FocusPane::Question;
    let border_color = if editing {
        Color::Yellow
    } else if app.focus == FocusPane::Question {
        Color::Cyan
    } else {
        Color::DarkGray
    };
    let title = if view.send_enabled {
        " Ask (Enter to send) "
    } else {
        " Ask (waiting for answer) "
    };

    // Horizontal scrolling keeps the cursor visible
    let inner_width = area.width.saturating_sub(2) as usize;
    let cursor_pos = app.question_cursor;
    let scroll_offset = if inner_width == 0 {
        0
    } else if cursor_pos >= inner_width {
        cursor_pos - inner_width + 1
    } else {
        0
    };
    let visible_text: String = view
        .inputs
        .question
        .chars()
        .skip(scroll_offset)
        .take(inner_width)
        .collect();

    let input = Paragraph::new(visible_text)
        .style(Style::default().fg(Color::Cyan))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(border_color))
                .title(title),
        );
    frame.render_widget(input, area);

    if editing {
        let cursor_x = (cursor_pos - scroll_offset) as u16;
        frame.set_cursor_position((area.x + cursor_x + 1, area.y + 1));
    }
}

fn render_footer(app: &App, view: &View, frame: &mut Frame, area: Rect) {
    let (mode_text, mode_style) = match app.input_mode {
        InputMode::Normal => (" NORMAL ", Style::default().bg(Color::Blue).fg(Color::White)),
        InputMode::Editing => (" EDIT ", Style::default().bg(Color::Yellow).fg(Color::Black)),
    };

    // Key style: dark background with bright text for visibility on both light/dark terminals
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);

    let mut spans = vec![Span::styled(mode_text, mode_style)];

    if let Some(status) = &app.status {
        spans.push(Span::styled(
            format!(" {} ", status),
            Style::default().fg(Color::Red),
        ));
    } else {
        let hints: &[(&str, &str)] = match app.input_mode {
            InputMode::Editing => &[("Enter", "submit"), ("Tab", "switch"), ("Esc", "done")],
            InputMode::Normal => &[
                ("t", "ticker"),
                ("a", "ask"),
                ("Tab", "focus"),
                ("s", "set company"),
                ("x", "clear company"),
                ("n", "new chat"),
                ("q", "quit"),
            ],
        };
        for (key, label) in hints {
            spans.push(Span::styled(format!(" {} ", key), key_style));
            spans.push(Span::styled(format!(" {} ", label), label_style));
        }
    }

    if view.phase != finrag_core::controller::Phase::Idle {
        spans.push(Span::styled(
            " working ",
            Style::default().fg(Color::Yellow).add_modifier(Modifier::ITALIC),
        ));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}
