use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent, MouseEventKind};
use mudchat_core::{GameApi, GameController};
use ratatui::layout::Rect;
use tracing::warn;

use crate::app::{Action, App, InputMode};
use crate::tui::AppEvent;

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

pub fn is_quit_chord(key: &KeyEvent) -> bool {
    key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL)
}

/// New remote work is refused while a request is queued or in flight.
fn can_submit<A: GameApi>(app: &App, controller: &GameController<A>) -> bool {
    app.pending_action.is_none() && !controller.is_loading()
}

pub fn handle_event<A: GameApi>(
    app: &mut App,
    controller: &mut GameController<A>,
    event: AppEvent,
) -> Result<()> {
    match event {
        AppEvent::Key(key) => handle_key(app, controller, key)?,
        AppEvent::Mouse(mouse) => handle_mouse(app, mouse),
        AppEvent::Resize => {}
        AppEvent::Tick => app.tick_animation(),
    }
    Ok(())
}

fn handle_key<A: GameApi>(
    app: &mut App,
    controller: &mut GameController<A>,
    key: KeyEvent,
) -> Result<()> {
    // Global keys that work in any mode
    if is_quit_chord(&key) {
        app.should_quit = true;
        return Ok(());
    }

    if app.show_theme_picker {
        handle_theme_picker(app, controller, key);
        return Ok(());
    }

    match app.input_mode {
        InputMode::Normal => handle_normal_mode(app, controller, key)?,
        InputMode::Editing => handle_editing_mode(app, controller, key),
    }

    Ok(())
}

fn handle_normal_mode<A: GameApi>(
    app: &mut App,
    controller: &mut GameController<A>,
    key: KeyEvent,
) -> Result<()> {
    let in_game = controller.is_in_progress();

    match key.code {
        KeyCode::Char('q') => app.should_quit = true,

        KeyCode::Char('t') => app.open_theme_picker(controller.theme()),

        KeyCode::Char('n') => {
            if can_submit(app, controller) {
                app.follow_chat = true;
                app.request(Action::StartGame);
            }
        }

        KeyCode::Char('d') => match controller.toggle_display_mode() {
            Ok(dark) => {
                app.notice = Some(if dark { "Dark mode" } else { "Light mode" }.to_string());
            }
            Err(err) => {
                warn!(error = %err, "failed to persist display mode");
                app.notice = Some(format!("Could not save display preference: {}", err));
            }
        },

        KeyCode::Char('r') if !in_game => {
            if can_submit(app, controller) {
                app.request(Action::RefreshSessions);
            }
        }

        KeyCode::Char('j') | KeyCode::Down => {
            if in_game {
                app.scroll_down(1);
            } else {
                app.session_nav_down(controller.saved_sessions().len());
            }
        }
        KeyCode::Char('k') | KeyCode::Up => {
            if in_game {
                app.scroll_up(1);
            } else {
                app.session_nav_up();
            }
        }
        KeyCode::PageDown => app.scroll_down((app.chat_height / 2).max(1)),
        KeyCode::PageUp => app.scroll_up((app.chat_height / 2).max(1)),
        KeyCode::Char('G') | KeyCode::End => app.scroll_to_bottom(),

        KeyCode::Enter => {
            if in_game {
                app.input_mode = InputMode::Editing;
            } else if let Some(session) = app.selected_session(controller.saved_sessions()) {
                let session_id = session.id.clone();
                if can_submit(app, controller) {
                    app.follow_chat = true;
                    app.request(Action::LoadGame(session_id));
                }
            }
        }
        KeyCode::Char('i') if in_game => app.input_mode = InputMode::Editing,

        KeyCode::Esc => {
            controller.clear_error();
            app.notice = None;
        }

        _ => {}
    }

    Ok(())
}

fn handle_editing_mode<A: GameApi>(
    app: &mut App,
    controller: &mut GameController<A>,
    key: KeyEvent,
) {
    match key.code {
        KeyCode::Esc => {
            app.input_mode = InputMode::Normal;
        }
        KeyCode::Enter => {
            if app.input.trim().is_empty() || !can_submit(app, controller) {
                return;
            }
            let text = app.take_input();
            app.follow_chat = true;
            app.request(Action::SendMessage(text));
        }
        KeyCode::Backspace => {
            if app.cursor > 0 {
                app.cursor -= 1;
                let byte_pos = char_to_byte_index(&app.input, app.cursor);
                app.input.remove(byte_pos);
            }
        }
        KeyCode::Delete => {
            if app.cursor < app.input.chars().count() {
                let byte_pos = char_to_byte_index(&app.input, app.cursor);
                app.input.remove(byte_pos);
            }
        }
        KeyCode::Left => {
            app.cursor = app.cursor.saturating_sub(1);
        }
        KeyCode::Right => {
            app.cursor = (app.cursor + 1).min(app.input.chars().count());
        }
        KeyCode::Home => {
            app.cursor = 0;
        }
        KeyCode::End => {
            app.cursor = app.input.chars().count();
        }
        KeyCode::Char(c) => {
            let byte_pos = char_to_byte_index(&app.input, app.cursor);
            app.input.insert(byte_pos, c);
            app.cursor += 1;
        }
        _ => {}
    }
}

fn handle_theme_picker<A: GameApi>(
    app: &mut App,
    controller: &mut GameController<A>,
    key: KeyEvent,
) {
    match key.code {
        KeyCode::Char('j') | KeyCode::Down => app.theme_picker_nav_down(),
        KeyCode::Char('k') | KeyCode::Up => app.theme_picker_nav_up(),
        KeyCode::Enter => {
            if let Some(theme) = app.picked_theme() {
                controller.select_theme(theme);
                app.notice = Some(if controller.is_in_progress() {
                    format!("{} selected for the next game", theme.display_name())
                } else {
                    format!("{} selected", theme.display_name())
                });
            }
            app.show_theme_picker = false;
        }
        KeyCode::Esc | KeyCode::Char('q') => app.show_theme_picker = false,
        _ => {}
    }
}

fn contains(area: Rect, column: u16, row: u16) -> bool {
    column >= area.x && column < area.x + area.width && row >= area.y && row < area.y + area.height
}

fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    let Some(area) = app.chat_area else {
        return;
    };
    if !contains(area, mouse.column, mouse.row) {
        return;
    }

    match mouse.kind {
        MouseEventKind::ScrollUp => app.scroll_up(3),
        MouseEventKind::ScrollDown => app.scroll_down(3),
        _ => {}
    }
}
