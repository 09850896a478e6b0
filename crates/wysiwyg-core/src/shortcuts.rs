//! Key combinations bound to toolbar commands.

use indexmap::IndexMap;
use serde_json::Value;

use crate::events::InputEvent;
use crate::toolbar::ButtonId;

/// Command pairs whose shortcuts trade places under right-to-left text.
pub const REVERSE_COMMANDS: &[(&str, &str)] = &[("indent", "outdent")];

pub fn reverse_command(command: &str) -> Option<&'static str> {
    REVERSE_COMMANDS.iter().find_map(|&(a, b)| {
        if a == command {
            Some(b)
        } else if b == command {
            Some(a)
        } else {
            None
        }
    })
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ShortcutKey {
    pub ctrl: bool,
    pub shift: bool,
    pub alt: bool,
    pub code: String,
}

impl ShortcutKey {
    /// Parses `c+KeyB`, `cs+KeyZ` or `c+s+KeyZ`: modifier letters (`c`, `s`,
    /// `a`) followed by the key code.
    pub fn parse(spec: &str) -> Option<Self> {
        let mut parts: Vec<&str> = spec.split('+').map(str::trim).collect();
        let code = parts.pop().filter(|c| !c.is_empty())?;
        let mut key = Self {
            ctrl: false,
            shift: false,
            alt: false,
            code: normalize_code(code),
        };
        for c in parts.concat().chars() {
            match c.to_ascii_lowercase() {
                'c' => key.ctrl = true,
                's' => key.shift = true,
                'a' => key.alt = true,
                _ => return None,
            }
        }
        Some(key)
    }

    pub fn from_event(event: &InputEvent) -> Self {
        Self {
            ctrl: event.ctrl,
            shift: event.shift,
            alt: event.alt,
            code: normalize_code(&event.key),
        }
    }
}

/// Single letters and digits become `KeyX` and `DigitN`.
fn normalize_code(key: &str) -> String {
    let mut chars = key.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if c.is_ascii_alphabetic() => format!("Key{}", c.to_ascii_uppercase()),
        (Some(c), None) if c.is_ascii_digit() => format!("Digit{c}"),
        _ => key.to_string(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shortcut {
    pub command: String,
    pub button: ButtonId,
}

#[derive(Debug, Clone, Default)]
pub struct ShortcutMap {
    keys: IndexMap<ShortcutKey, Shortcut>,
}

impl ShortcutMap {
    /// Binds every key of `spec` to `command`.
    ///
    /// `spec` lists `[key, hint, key, hint, ...]`. The first key keeps a
    /// combination that is bound twice. Returns the first non-empty hint.
    pub fn bind(&mut self, command: &str, button: ButtonId, spec: &Value) -> Option<String> {
        let items = spec.as_array()?;
        let mut hint = None;
        for pair in items.chunks(2) {
            let Some(key) = pair[0].as_str().and_then(ShortcutKey::parse) else {
                tracing::warn!(command, spec = %pair[0], "invalid shortcut");
                continue;
            };
            if hint.is_none() {
                hint = pair
                    .get(1)
                    .and_then(Value::as_str)
                    .filter(|h| !h.is_empty())
                    .map(str::to_string);
            }
            self.keys.entry(key).or_insert_with(|| Shortcut {
                command: command.to_string(),
                button,
            });
        }
        hint
    }

    pub fn get(&self, key: &ShortcutKey) -> Option<&Shortcut> {
        self.keys.get(key)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn clear(&mut self) {
        self.keys.clear();
    }
}

