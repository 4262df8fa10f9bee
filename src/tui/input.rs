use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::commands::stages::SortKey;

/// What the keyboard is currently driving.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Table,
    /// The filter input line has focus
    Filter,
    Log,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    None,
    Quit,
    Up,
    Down,
    PageUp,
    PageDown,
    Top,
    Bottom,
    Open,
    Back,
    Sort(SortKey),
    StartFilter,
    ClearFilter,
    FilterInput(char),
    FilterBackspace,
    FilterAccept,
    FilterCancel,
}

pub fn map_key(key: KeyEvent, mode: Mode) -> Action {
    if key.kind != KeyEventKind::Press {
        return Action::None;
    }
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        return match key.code {
            KeyCode::Char('c') => Action::Quit,
            KeyCode::Char('d') if mode != Mode::Filter => Action::PageDown,
            KeyCode::Char('u') if mode != Mode::Filter => Action::PageUp,
            _ => Action::None,
        };
    }

    match mode {
        Mode::Filter => match key.code {
            KeyCode::Enter => Action::FilterAccept,
            KeyCode::Esc => Action::FilterCancel,
            KeyCode::Backspace => Action::FilterBackspace,
            KeyCode::Char(c) => Action::FilterInput(c),
            _ => Action::None,
        },
        Mode::Log => match key.code {
            KeyCode::Char('q') | KeyCode::Char('h') | KeyCode::Esc | KeyCode::Left => Action::Back,
            _ => movement(key.code),
        },
        Mode::Table => match key.code {
            KeyCode::Char('q') => Action::Quit,
            KeyCode::Enter | KeyCode::Right | KeyCode::Char('l') => Action::Open,
            KeyCode::Esc | KeyCode::Left | KeyCode::Char('h') | KeyCode::Backspace => Action::Back,
            KeyCode::Char('n') => Action::Sort(SortKey::Name),
            KeyCode::Char('s') => Action::Sort(SortKey::Status),
            KeyCode::Char('d') => Action::Sort(SortKey::Duration),
            KeyCode::Char('f') | KeyCode::Char('/') => Action::StartFilter,
            KeyCode::Char('c') => Action::ClearFilter,
            _ => movement(key.code),
        },
    }
}

fn movement(code: KeyCode) -> Action {
    match code {
        KeyCode::Up | KeyCode::Char('k') => Action::Up,
        KeyCode::Down | KeyCode::Char('j') => Action::Down,
        KeyCode::PageUp | KeyCode::Char('b') => Action::PageUp,
        KeyCode::PageDown | KeyCode::Char(' ') => Action::PageDown,
        KeyCode::Home | KeyCode::Char('g') => Action::Top,
        KeyCode::End | KeyCode::Char('G') => Action::Bottom,
        _ => Action::None,
    }
}
