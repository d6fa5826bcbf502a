use super::*;

/// Translates a key press into a console event.
///
/// Keys without a meaning in the console map to `None`.
#[must_use]
pub fn map_key(key: KeyEvent) -> Option<NavEvent> {
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        return match key.code {
            KeyCode::Char('c') | KeyCode::Char('C') => Some(NavEvent::Quit),
            KeyCode::Char('u') | KeyCode::Char('U') => Some(NavEvent::QueryClear),
            _ => None,
        };
    }
    if key.modifiers.contains(KeyModifiers::ALT) {
        return None;
    }
    let event = match key.code {
        KeyCode::Esc => NavEvent::Quit,
        KeyCode::Up => NavEvent::MoveUp,
        KeyCode::Down => NavEvent::MoveDown,
        KeyCode::Left => NavEvent::StepLeft,
        KeyCode::Right => NavEvent::StepRight,
        KeyCode::Enter => NavEvent::Activate,
        KeyCode::Home => NavEvent::JumpToStart,
        KeyCode::End => NavEvent::JumpToEnd,
        KeyCode::Backspace => NavEvent::QueryBackspace,
        KeyCode::Char(ch) => NavEvent::QueryInput(ch),
        _ => return None,
    };
    Some(event)
}
