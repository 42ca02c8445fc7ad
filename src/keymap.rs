use std::collections::{BTreeMap, HashMap};

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Named control signals the dashboard reacts to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Signal {
    Sort,
    Refresh,
    Remove,
    ForceRemove,
    RemoveDangling,
    Scale,
    Enter,
    Escape,
    Backspace,
    Delete,
    Left,
    Right,
    Up,
    Down,
    PageUp,
    PageDown,
    Home,
    End,
    NextView,
    PrevView,
    Quit,
}

/// One unit of user input, consumed by exactly one owner.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputEvent {
    Signal(Signal),
    Char(char),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum KeySpecError {
    #[error("empty key spec")]
    Empty,
    #[error("unknown key `{0}`")]
    UnknownKey(String),
    #[error("unknown modifier `{0}`")]
    UnknownModifier(String),
}

type KeyChord = (KeyCode, KeyModifiers);

/// Translates terminal key presses into [`InputEvent`]s.
pub struct KeyMap {
    bindings: HashMap<KeyChord, Signal>,
}

impl KeyMap {
    pub fn from_table(table: &BTreeMap<String, Signal>) -> Result<Self, KeySpecError> {
        let mut bindings = HashMap::with_capacity(table.len());
        for (spec, signal) in table {
            bindings.insert(parse_key(spec)?, *signal);
        }
        Ok(Self { bindings })
    }

    pub fn translate(&self, key: &KeyEvent) -> Option<InputEvent> {
        let chord = normalize(key.code, key.modifiers);
        if let Some(signal) = self.bindings.get(&chord) {
            return Some(InputEvent::Signal(*signal));
        }
        match chord {
            (KeyCode::Char(ch), mods) if mods.is_empty() => Some(InputEvent::Char(ch)),
            _ => None,
        }
    }
}

/// Built-in key table, used when the config does not override a key.
pub fn default_bindings() -> BTreeMap<String, Signal> {
    [
        ("f1", Signal::Sort),
        ("f5", Signal::Refresh),
        ("ctrl-e", Signal::Remove),
        ("ctrl-r", Signal::Remove),
        ("ctrl-f", Signal::ForceRemove),
        ("ctrl-d", Signal::RemoveDangling),
        ("ctrl-s", Signal::Scale),
        ("ctrl-c", Signal::Quit),
        ("enter", Signal::Enter),
        ("esc", Signal::Escape),
        ("backspace", Signal::Backspace),
        ("delete", Signal::Delete),
        ("left", Signal::Left),
        ("right", Signal::Right),
        ("up", Signal::Up),
        ("down", Signal::Down),
        ("pageup", Signal::PageUp),
        ("pagedown", Signal::PageDown),
        ("home", Signal::Home),
        ("end", Signal::End),
        ("tab", Signal::NextView),
        ("backtab", Signal::PrevView),
    ]
    .into_iter()
    .map(|(spec, signal)| (spec.to_string(), signal))
    .collect()
}

/// Parses specs like `"ctrl-e"`, `"f5"`, `"pageup"` or `"%"`.
pub fn parse_key(spec: &str) -> Result<KeyChord, KeySpecError> {
    let spec = spec.trim();
    if spec.is_empty() {
        return Err(KeySpecError::Empty);
    }

    let mut modifiers = KeyModifiers::NONE;
    let mut rest = spec;
    // A lone "-" is a key, not a separator.
    while let Some((prefix, tail)) = rest.split_once('-') {
        if tail.is_empty() {
            break;
        }
        match prefix.to_ascii_lowercase().as_str() {
            "ctrl" => modifiers |= KeyModifiers::CONTROL,
            "alt" => modifiers |= KeyModifiers::ALT,
            _ => return Err(KeySpecError::UnknownModifier(prefix.to_string())),
        }
        rest = tail;
    }

    let code = match rest.to_ascii_lowercase().as_str() {
        "enter" => KeyCode::Enter,
        "esc" => KeyCode::Esc,
        "backspace" => KeyCode::Backspace,
        "delete" => KeyCode::Delete,
        "tab" => KeyCode::Tab,
        "backtab" => KeyCode::BackTab,
        "up" => KeyCode::Up,
        "down" => KeyCode::Down,
        "left" => KeyCode::Left,
        "right" => KeyCode::Right,
        "pageup" => KeyCode::PageUp,
        "pagedown" => KeyCode::PageDown,
        "home" => KeyCode::Home,
        "end" => KeyCode::End,
        "space" => KeyCode::Char(' '),
        lower => {
            let mut chars = rest.chars();
            match (chars.next(), chars.next()) {
                (Some(ch), None) => KeyCode::Char(if modifiers.is_empty() {
                    ch
                } else {
                    ch.to_ascii_lowercase()
                }),
                _ => match lower.strip_prefix('f').and_then(|n| n.parse::<u8>().ok()) {
                    Some(n) if (1..=12).contains(&n) => KeyCode::F(n),
                    _ => return Err(KeySpecError::UnknownKey(rest.to_string())),
                },
            }
        }
    };

    Ok(normalize(code, modifiers))
}

// Terminals report uppercase letters with SHIFT set; the character already
// carries the case, so SHIFT is dropped everywhere.
fn normalize(code: KeyCode, modifiers: KeyModifiers) -> KeyChord {
    let modifiers = modifiers & (KeyModifiers::CONTROL | KeyModifiers::ALT);
    let code = match code {
        KeyCode::Char(ch) if !modifiers.is_empty() => KeyCode::Char(ch.to_ascii_lowercase()),
        other => other,
    };
    (code, modifiers)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode, modifiers: KeyModifiers) -> KeyEvent {
        KeyEvent::new(code, modifiers)
    }

    fn default_map() -> KeyMap {
        KeyMap::from_table(&default_bindings()).unwrap()
    }

    #[test]
    fn parse_modifier_and_function_keys() {
        assert_eq!(
            parse_key("ctrl-e").unwrap(),
            (KeyCode::Char('e'), KeyModifiers::CONTROL)
        );
        assert_eq!(parse_key("F5").unwrap(), (KeyCode::F(5), KeyModifiers::NONE));
        assert_eq!(
            parse_key("ctrl-alt-x").unwrap(),
            (KeyCode::Char('x'), KeyModifiers::CONTROL | KeyModifiers::ALT)
        );
        assert_eq!(parse_key("-").unwrap(), (KeyCode::Char('-'), KeyModifiers::NONE));
        assert_eq!(parse_key("%").unwrap(), (KeyCode::Char('%'), KeyModifiers::NONE));
    }

    #[test]
    fn parse_rejects_garbage() {
        assert_eq!(parse_key(""), Err(KeySpecError::Empty));
        assert_eq!(
            parse_key("f13"),
            Err(KeySpecError::UnknownKey("f13".to_string()))
        );
        assert_eq!(
            parse_key("hyper-x"),
            Err(KeySpecError::UnknownModifier("hyper".to_string()))
        );
    }

    #[test]
    fn translate_bound_keys_to_signals() {
        let map = default_map();
        assert_eq!(
            map.translate(&key(KeyCode::F(1), KeyModifiers::NONE)),
            Some(InputEvent::Signal(Signal::Sort))
        );
        assert_eq!(
            map.translate(&key(KeyCode::Char('s'), KeyModifiers::CONTROL)),
            Some(InputEvent::Signal(Signal::Scale))
        );
        assert_eq!(
            map.translate(&key(KeyCode::Esc, KeyModifiers::NONE)),
            Some(InputEvent::Signal(Signal::Escape))
        );
    }

    #[test]
    fn translate_plain_and_shifted_chars() {
        let map = default_map();
        assert_eq!(
            map.translate(&key(KeyCode::Char('r'), KeyModifiers::NONE)),
            Some(InputEvent::Char('r'))
        );
        assert_eq!(
            map.translate(&key(KeyCode::Char('I'), KeyModifiers::SHIFT)),
            Some(InputEvent::Char('I'))
        );
    }

    #[test]
    fn translate_unbound_control_chord_is_dropped() {
        let map = default_map();
        assert_eq!(
            map.translate(&key(KeyCode::Char('z'), KeyModifiers::CONTROL)),
            None
        );
        assert_eq!(map.translate(&key(KeyCode::F(9), KeyModifiers::NONE)), None);
    }

    #[test]
    fn signal_names_are_kebab_case() {
        let table: BTreeMap<String, Signal> =
            toml::from_str("\"ctrl-x\" = \"force-remove\"\n").unwrap();
        assert_eq!(table.get("ctrl-x"), Some(&Signal::ForceRemove));
    }
}
