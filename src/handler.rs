use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent, MouseEventKind};
use ratatui::layout::Rect;

use crate::app::{App, Focus};
use crate::config::Config;
use crate::tui::AppEvent;

/// Byte offset of the `char_idx`-th character, for editing multi-byte input.
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

pub async fn handle_event(app: &mut App, event: AppEvent) -> Result<()> {
    match event {
        AppEvent::Key(key) => handle_key(app, key),
        AppEvent::Mouse(mouse) => handle_mouse(app, mouse),
        AppEvent::Resize(_, _) => {}
        AppEvent::Tick => {
            app.tick_animation();
            app.poll_tasks().await;
        }
    }
    Ok(())
}

fn handle_key(app: &mut App, key: KeyEvent) {
    // Global keys that work in any state
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return;
    }

    // A notice blocks all other input until dismissed
    if app.notice.is_some() {
        app.notice = None;
        return;
    }

    if app.show_clear_confirm {
        handle_clear_confirm(app, key);
        return;
    }

    if key.code == KeyCode::Char('l') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.show_clear_confirm = true;
        return;
    }

    // Tab cycles focus: Input -> Level -> TopK -> Chat -> Input
    if key.code == KeyCode::Tab {
        app.focus = match app.focus {
            Focus::Input => Focus::Level,
            Focus::Level => Focus::TopK,
            Focus::TopK => Focus::Chat,
            Focus::Chat => Focus::Input,
        };
        return;
    }
    if key.code == KeyCode::BackTab {
        app.focus = match app.focus {
            Focus::Input => Focus::Chat,
            Focus::Level => Focus::Input,
            Focus::TopK => Focus::Level,
            Focus::Chat => Focus::TopK,
        };
        return;
    }

    match app.focus {
        Focus::Input => handle_input_key(app, key),
        Focus::Level => handle_level_key(app, key),
        Focus::TopK => handle_top_k_key(app, key),
        Focus::Chat => handle_chat_key(app, key),
    }
}

fn handle_clear_confirm(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('y') | KeyCode::Char('Y') => app.clear_history(),
        KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
            app.show_clear_confirm = false;
        }
        _ => {}
    }
}

fn handle_input_key(app: &mut App, key: KeyEvent) {
    // The input is unavailable while a request is in flight
    if app.query_loading {
        return;
    }

    match key.code {
        KeyCode::Enter => submit_query(app),
        KeyCode::Esc => {
            app.focus = Focus::Chat;
        }
        KeyCode::Backspace => {
            if app.query_cursor > 0 {
                app.query_cursor -= 1;
                let byte_pos = char_to_byte_index(&app.query_input, app.query_cursor);
                app.query_input.remove(byte_pos);
            }
        }
        KeyCode::Delete => {
            let char_count = app.query_input.chars().count();
            if app.query_cursor < char_count {
                let byte_pos = char_to_byte_index(&app.query_input, app.query_cursor);
                app.query_input.remove(byte_pos);
            }
        }
        KeyCode::Left => {
            app.query_cursor = app.query_cursor.saturating_sub(1);
        }
        KeyCode::Right => {
            let char_count = app.query_input.chars().count();
            app.query_cursor = (app.query_cursor + 1).min(char_count);
        }
        KeyCode::Home => {
            app.query_cursor = 0;
        }
        KeyCode::End => {
            app.query_cursor = app.query_input.chars().count();
        }
        KeyCode::Char(c) => {
            let byte_pos = char_to_byte_index(&app.query_input, app.query_cursor);
            app.query_input.insert(byte_pos, c);
            app.query_cursor += 1;
        }
        _ => {}
    }
}

fn submit_query(app: &mut App) {
    if let Some(request) = app.accept_query() {
        tracing::info!(
            "sending query (level={}, top_k={})",
            request.level.display_name(),
            request.top_k
        );
        let client = app.client.clone();
        app.query_task = Some(tokio::spawn(async move { client.chat(&request).await }));
    }
}

fn handle_level_key(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Left | KeyCode::Char('h') => {
            app.cycle_level_prev();
            let _ = Config::save_defaults(app.level, app.top_k);
        }
        KeyCode::Right | KeyCode::Char('l') => {
            app.cycle_level_next();
            let _ = Config::save_defaults(app.level, app.top_k);
        }
        KeyCode::Enter | KeyCode::Esc => {
            app.focus = Focus::Input;
        }
        _ => {}
    }
}

fn handle_top_k_key(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Left | KeyCode::Char('h') | KeyCode::Down => {
            app.top_k_down();
            let _ = Config::save_defaults(app.level, app.top_k);
        }
        KeyCode::Right | KeyCode::Char('l') | KeyCode::Up => {
            app.top_k_up();
            let _ = Config::save_defaults(app.level, app.top_k);
        }
        KeyCode::Enter | KeyCode::Esc => {
            app.focus = Focus::Input;
        }
        _ => {}
    }
}

fn handle_chat_key(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') => app.should_quit = true,
        KeyCode::Esc => app.focus = Focus::Input,
        KeyCode::Char('j') | KeyCode::Down => app.scroll_chat_down(1),
        KeyCode::Char('k') | KeyCode::Up => app.scroll_chat_up(1),
        KeyCode::Char('d') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.scroll_chat_down(app.chat_height / 2);
        }
        KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.scroll_chat_up(app.chat_height / 2);
        }
        KeyCode::Char('g') => app.chat_scroll = 0,
        KeyCode::Char('G') => app.scroll_chat_to_bottom(),
        _ => {}
    }
}

/// Check if a point is within a rectangle
fn point_in_rect(x: u16, y: u16, rect: Rect) -> bool {
    x >= rect.x && x < rect.x + rect.width && y >= rect.y && y < rect.y + rect.height
}

fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    if app.notice.is_some() || app.show_clear_confirm {
        return;
    }

    let in_chat = app
        .chat_area
        .map(|r| point_in_rect(mouse.column, mouse.row, r))
        .unwrap_or(false);
    if !in_chat {
        return;
    }

    match mouse.kind {
        MouseEventKind::ScrollDown => app.scroll_chat_down(3),
        MouseEventKind::ScrollUp => app.scroll_chat_up(3),
        _ => {}
    }
}
