//! Keyboard input handling.
//!
//! Navigation and prompt editing only touch [`App`], so they happen here
//! directly.  Anything that changes settings or talks to the poller is
//! returned as an [`Action`] for the main loop to carry out.

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::app::{App, EditField, InputMode};

/// A request the main loop must forward to the poller or the OS.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Refresh,
    OpenSelected,
    SubmitInterval(String),
    SubmitKeywords(String),
    ToggleFilterMode,
    ToggleNotifications,
    ToggleStartup,
}

/// Process a single key event.
///
/// Only reacts to key-press events (ignoring release / repeat) so that each
/// physical keypress triggers exactly one action.
pub fn handle_key_event(app: &mut App, key: KeyEvent) -> Option<Action> {
    if key.kind != KeyEventKind::Press {
        return None;
    }

    match &mut app.mode {
        InputMode::Normal => {
            app.banner = None;
            app.dismiss_message();
            handle_normal(app, key)
        }
        InputMode::Editing { field, buffer } => match key.code {
            KeyCode::Esc => {
                app.mode = InputMode::Normal;
                None
            }
            KeyCode::Enter => {
                let action = match field {
                    EditField::Interval => Action::SubmitInterval(std::mem::take(buffer)),
                    EditField::Keywords => Action::SubmitKeywords(std::mem::take(buffer)),
                };
                app.mode = InputMode::Normal;
                Some(action)
            }
            KeyCode::Backspace => {
                buffer.pop();
                None
            }
            KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
                buffer.push(c);
                None
            }
            _ => None,
        },
    }
}

fn handle_normal(app: &mut App, key: KeyEvent) -> Option<Action> {
    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => app.quit = true,
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => app.quit = true,
        KeyCode::Down | KeyCode::Char('j') => app.select_next(),
        KeyCode::Up | KeyCode::Char('k') => app.select_previous(),
        KeyCode::Home | KeyCode::Char('g') => app.select_first(),
        KeyCode::End | KeyCode::Char('G') => app.select_last(),
        KeyCode::Char('i') => app.start_editing(EditField::Interval),
        KeyCode::Char('w') => app.start_editing(EditField::Keywords),
        KeyCode::Enter | KeyCode::Char('o') => return Some(Action::OpenSelected),
        KeyCode::Char('r') => return Some(Action::Refresh),
        KeyCode::Char('f') => return Some(Action::ToggleFilterMode),
        KeyCode::Char('n') => return Some(Action::ToggleNotifications),
        KeyCode::Char('s') => return Some(Action::ToggleStartup),
        _ => {}
    }
    None
}
