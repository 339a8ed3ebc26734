use crossterm::event::{Event, KeyEvent, KeyEventKind};

use super::keybindings::{Action, KeyBindings};

#[derive(Debug, PartialEq, Eq)]
pub enum InputResult {
    Continue,
    Quit,
    Action(Action),
}

pub fn handle_input(event: Event, bindings: &KeyBindings) -> InputResult {
    match event {
        Event::Key(key_event) if key_event.kind == KeyEventKind::Press => {
            handle_key(key_event, bindings)
        }
        _ => InputResult::Continue,
    }
}

fn handle_key(key: KeyEvent, bindings: &KeyBindings) -> InputResult {
    match bindings.get(&key) {
        Some(Action::Quit) => InputResult::Quit,
        Some(action) => InputResult::Action(action),
        None => InputResult::Continue,
    }
}
