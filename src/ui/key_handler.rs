//! Key handling for the usage screen and the settings form.
//!
//! Functions here update cheap UI state in place and return a KeyAction for
//! anything that touches the poll task or the credential store, which the App
//! executes after releasing the state lock.

use crossterm::event::{KeyCode, KeyModifiers};

use usagebar_core::scheduler::PollCommand;

use crate::state::{AppState, FormField};

/// Action to execute after releasing the state lock
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    /// No action needed
    None,
    /// Forward a command to the poll task
    Poll(PollCommand),
    /// Open the settings form pre-filled from the credential store
    OpenSettings,
    /// Store the form's credentials and preference
    SaveSettings,
}

/// Resolve a key press for whatever currently has focus
pub fn resolve_key(state: &mut AppState, code: KeyCode, modifiers: KeyModifiers) -> KeyAction {
    // Help popup swallows the next key
    if state.show_help {
        state.show_help = false;
        return KeyAction::None;
    }

    if state.is_settings_open() {
        resolve_form_key(state, code, modifiers)
    } else {
        resolve_normal_key(state, code)
    }
}

/// Keys on the main screen
fn resolve_normal_key(state: &mut AppState, code: KeyCode) -> KeyAction {
    state.clear_message();

    match code {
        KeyCode::Char('q') | KeyCode::Esc => {
            state.quit();
            KeyAction::None
        }
        KeyCode::Enter | KeyCode::Char(' ') => {
            if state.toggle_panel() {
                KeyAction::Poll(PollCommand::PopoverOpened)
            } else {
                KeyAction::Poll(PollCommand::PopoverClosed)
            }
        }
        KeyCode::Char('r') => KeyAction::Poll(PollCommand::Refresh),
        KeyCode::Char('s') => KeyAction::OpenSettings,
        KeyCode::Char('?') => {
            state.toggle_help();
            KeyAction::None
        }
        _ => KeyAction::None,
    }
}

/// Keys while the settings form is open
fn resolve_form_key(state: &mut AppState, code: KeyCode, modifiers: KeyModifiers) -> KeyAction {
    let Some(form) = state.form.as_mut() else {
        return KeyAction::None;
    };

    match code {
        KeyCode::Esc => {
            state.close_settings();
            KeyAction::None
        }
        KeyCode::Enter => {
            if form.can_save() {
                KeyAction::SaveSettings
            } else {
                KeyAction::None
            }
        }
        KeyCode::Tab | KeyCode::Down => {
            form.focus_next();
            KeyAction::None
        }
        KeyCode::BackTab | KeyCode::Up => {
            form.focus_previous();
            KeyAction::None
        }
        KeyCode::Char(' ') if form.focus == FormField::ShowPercentage => {
            form.toggle_show_percentage();
            KeyAction::None
        }
        code => {
            if let Some(field) = form.focused_text_mut() {
                match code {
                    KeyCode::Char('u') if modifiers.contains(KeyModifiers::CONTROL) => {
                        field.clear()
                    }
                    KeyCode::Char(c) if !modifiers.contains(KeyModifiers::CONTROL) => {
                        field.insert(c)
                    }
                    KeyCode::Backspace => field.backspace(),
                    KeyCode::Delete => field.delete(),
                    KeyCode::Left => field.left(),
                    KeyCode::Right => field.right(),
                    KeyCode::Home => field.home(),
                    KeyCode::End => field.end(),
                    _ => {}
                }
            }
            KeyAction::None
        }
    }
}
