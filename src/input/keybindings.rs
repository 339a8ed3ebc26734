use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    // Navigation
    Up,
    Down,
    Open,
    Back,
    Quit,

    Fetch,

    // AI actions on the opened email
    Summarize,
    Reply,
    Draft,
    AdjustTone,
    CycleTone,
}

pub struct KeyBindings {
    bindings: HashMap<KeyEvent, Action>,
}

/// A displayable keybinding entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeybindingEntry {
    pub key: String,
    pub description: &'static str,
}

impl KeyBindings {
    /// Vim-style letters plus arrow keys
    pub fn new() -> Self {
        let mut map = HashMap::new();

        map.insert(key('j'), Action::Down);
        map.insert(key('k'), Action::Up);
        map.insert(key_code(KeyCode::Down), Action::Down);
        map.insert(key_code(KeyCode::Up), Action::Up);
        map.insert(key_code(KeyCode::Enter), Action::Open);
        map.insert(key_code(KeyCode::Esc), Action::Back);
        map.insert(key('q'), Action::Quit);
        map.insert(ctrl_key('c'), Action::Quit);

        map.insert(key('f'), Action::Fetch);
        map.insert(key_code(KeyCode::F(5)), Action::Fetch);

        map.insert(key('s'), Action::Summarize);
        map.insert(key('r'), Action::Reply);
        map.insert(key('d'), Action::Draft);
        map.insert(key('t'), Action::AdjustTone);
        map.insert(shift_key('T'), Action::CycleTone);

        Self { bindings: map }
    }

    pub fn get(&self, event: &KeyEvent) -> Option<Action> {
        self.bindings.get(event).copied()
    }

    /// All bindings, sorted by action then key
    pub fn all_bindings(&self) -> Vec<KeybindingEntry> {
        let mut pairs: Vec<_> = self.bindings.iter().collect();
        pairs.sort_by_key(|(event, action)| (action_order(action), format_key_event(event)));

        pairs
            .into_iter()
            .map(|(event, action)| KeybindingEntry {
                key: format_key_event(event),
                description: action_description(action),
            })
            .collect()
    }
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self::new()
    }
}

fn key(c: char) -> KeyEvent {
    KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE)
}

fn shift_key(c: char) -> KeyEvent {
    KeyEvent::new(KeyCode::Char(c), KeyModifiers::SHIFT)
}

fn ctrl_key(c: char) -> KeyEvent {
    KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL)
}

fn key_code(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
}

fn format_key_event(event: &KeyEvent) -> String {
    let prefix = if event.modifiers.contains(KeyModifiers::CONTROL) {
        "Ctrl+"
    } else {
        ""
    };

    let key_str = match event.code {
        KeyCode::Char(c) => c.to_string(),
        KeyCode::Enter => "Enter".to_string(),
        KeyCode::Esc => "Esc".to_string(),
        KeyCode::Up => "Up".to_string(),
        KeyCode::Down => "Down".to_string(),
        KeyCode::F(n) => format!("F{}", n),
        _ => "?".to_string(),
    };

    format!("{}{}", prefix, key_str)
}

fn action_description(action: &Action) -> &'static str {
    match action {
        Action::Up => "Move up",
        Action::Down => "Move down",
        Action::Open => "Open highlighted email",
        Action::Back => "Close email",
        Action::Quit => "Quit",
        Action::Fetch => "Fetch newest messages",
        Action::Summarize => "Summarize email",
        Action::Reply => "Write a reply",
        Action::Draft => "Draft a new email from it",
        Action::AdjustTone => "Rewrite in the current tone",
        Action::CycleTone => "Cycle tone",
    }
}

fn action_order(action: &Action) -> u8 {
    match action {
        Action::Up => 0,
        Action::Down => 1,
        Action::Open => 2,
        Action::Back => 3,
        Action::Fetch => 4,
        Action::Summarize => 5,
        Action::Reply => 6,
        Action::Draft => 7,
        Action::AdjustTone => 8,
        Action::CycleTone => 9,
        Action::Quit => 10,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_keys() {
        let bindings = KeyBindings::new();
        assert_eq!(bindings.get(&key('s')), Some(Action::Summarize));
        assert_eq!(bindings.get(&key('r')), Some(Action::Reply));
        assert_eq!(bindings.get(&key('d')), Some(Action::Draft));
        assert_eq!(bindings.get(&key('t')), Some(Action::AdjustTone));
        assert_eq!(bindings.get(&shift_key('T')), Some(Action::CycleTone));
        assert_eq!(bindings.get(&key('x')), None);
    }

    #[test]
    fn test_listing_is_ordered() {
        let entries = KeyBindings::new().all_bindings();
        assert_eq!(entries.first().unwrap().description, "Move up");
        assert_eq!(entries.last().unwrap().description, "Quit");
        assert!(entries.iter().any(|e| e.key == "Ctrl+c"));
    }
}
