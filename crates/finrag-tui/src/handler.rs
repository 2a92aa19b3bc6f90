use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent, MouseEventKind};
use finrag_core::controller::UiEvent;

use crate::app::{App, FocusPane, InputMode};
use crate::tui::AppEvent;

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

pub fn handle_event(app: &mut App, event: AppEvent) -> Result<()> {
    match event {
        AppEvent::Key(key) => handle_key(app, key),
        AppEvent::Mouse(mouse) => handle_mouse(app, mouse),
        AppEvent::Resize(_, _) => {}
        AppEvent::Tick => app.tick_animation(),
        AppEvent::Completed(completion) => app.apply(completion),
    }
    Ok(())
}

fn handle_key(app: &mut App, key: KeyEvent) {
    // Global keys that work in any mode
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return;
    }

    app.status = None;
    match app.input_mode {
        InputMode::Normal => handle_normal_mode(app, key),
        InputMode::Editing => handle_editing_mode(app, key),
    }
}

fn handle_normal_mode(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') => app.should_quit = true,

        KeyCode::Tab => app.focus = app.focus.next(),
        KeyCode::Char('t') => {
            app.focus = FocusPane::Ticker;
            app.input_mode = InputMode::Editing;
        }
        KeyCode::Char('a') | KeyCode::Char('/') => {
            app.focus = FocusPane::Question;
            app.input_mode = InputMode::Editing;
        }

        KeyCode::Char('i') | KeyCode::Enter if app.focus.is_text_field() => {
            app.input_mode = InputMode::Editing;
        }
        KeyCode::Enter if app.focus == FocusPane::Suggestions => {
            if let Some(index) = app.selected_suggestion() {
                app.apply(UiEvent::PickSuggestion(index));
                app.question_cursor = app.controller.inputs().question.chars().count();
            }
        }

        KeyCode::Char('j') | KeyCode::Down => match app.focus {
            FocusPane::Suggestions => app.suggestion_down(),
            _ => app.scroll_down(),
        },
        KeyCode::Char('k') | KeyCode::Up => match app.focus {
            FocusPane::Suggestions => app.suggestion_up(),
            _ => app.scroll_up(),
        },
        KeyCode::Char('G') => app.scroll_chat_to_bottom(),

        // Pin the ticker box value as the active company without ingesting
        KeyCode::Char('s') => {
            let ticker = app.controller.inputs().ticker.clone();
            app.apply(UiEvent::SetContext { ticker });
        }
        KeyCode::Char('x') => app.apply(UiEvent::ClearContext),
        KeyCode::Char('n') => {
            app.apply(UiEvent::ClearConversation);
            app.chat_scroll = 0;
        }

        KeyCode::Esc => app.controller.dismiss_notice(),
        _ => {}
    }
}

fn handle_editing_mode(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => app.input_mode = InputMode::Normal,
        KeyCode::Tab => {
            app.focus = match app.focus {
                FocusPane::Ticker => FocusPane::Question,
                _ => FocusPane::Ticker,
            };
        }
        KeyCode::Enter => match app.focus {
            FocusPane::Ticker => {
                let ticker = app.controller.inputs().ticker.clone();
                app.apply(UiEvent::SubmitIngest { ticker });
            }
            _ => {
                let question = app.controller.inputs().question.clone();
                app.apply(UiEvent::SubmitQuery { question });
            }
        },
        _ => edit_focused_field(app, key),
    }
}

fn edit_focused_field(app: &mut App, key: KeyEvent) {
    let (text, cursor) = match app.focus {
        FocusPane::Ticker => (
            &mut app.controller.inputs_mut().ticker,
            &mut app.ticker_cursor,
        ),
        _ => (
            &mut app.controller.inputs_mut().question,
            &mut app.question_cursor,
        ),
    };
    edit_text(text, cursor, key);
}

fn edit_text(text: &mut String, cursor: &mut usize, key: KeyEvent) {
    let char_count = text.chars().count();
    *cursor = (*cursor).min(char_count);

    match key.code {
        KeyCode::Backspace => {
            if *cursor > 0 {
                *cursor -= 1;
                let byte_pos = char_to_byte_index(text, *cursor);
                text.remove(byte_pos);
            }
        }
        KeyCode::Delete => {
            if *cursor < char_count {
                let byte_pos = char_to_byte_index(text, *cursor);
                text.remove(byte_pos);
            }
        }
        KeyCode::Left => *cursor = cursor.saturating_sub(1),
        KeyCode::Right => *cursor = (*cursor + 1).min(char_count),
        KeyCode::Home => *cursor = 0,
        KeyCode::End => *cursor = char_count,
        KeyCode::Char(c) => {
            let byte_pos = char_to_byte_index(text, *cursor);
            text.insert(byte_pos, c);
            *cursor += 1;
        }
        _ => {}
    }
}

fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    match mouse.kind {
        MouseEventKind::ScrollDown => app.chat_scroll = app.chat_scroll.saturating_add(3),
        MouseEventKind::ScrollUp => app.chat_scroll = app.chat_scroll.saturating_sub(3),
        _ => {}
    }
}
