//! Key codes
//!
//! A key code is an immutable, classified key press. Every code has a
//! short name that scripts see (`a`, `C-a`, `M-a`, `up`, `f5`).

use std::fmt;

/// Named navigation, editing and function keys
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NamedKey {
    Up,
    Down,
    Left,
    Right,
    Home,
    End,
    Insert,
    Delete,
    PageUp,
    PageDown,
    Enter,
    Tab,
    BackTab,
    Backspace,
    /// F1 through F12
    Function(u8),
}

const KEY_NAMES: &[(NamedKey, &str)] = &[
    (NamedKey::Up, "up"),
    (NamedKey::Down, "down"),
    (NamedKey::Left, "left"),
    (NamedKey::Right, "right"),
    (NamedKey::Home, "home"),
    (NamedKey::End, "end"),
    (NamedKey::Insert, "insert"),
    (NamedKey::Delete, "delete"),
    (NamedKey::PageUp, "pageup"),
    (NamedKey::PageDown, "pagedown"),
    (NamedKey::Enter, "enter"),
    (NamedKey::Tab, "tab"),
    (NamedKey::BackTab, "backtab"),
    (NamedKey::Backspace, "backspace"),
];

impl NamedKey {
    /// Short script-visible name
    pub fn name(&self) -> String {
        match self {
            NamedKey::Function(n) => format!("f{}", n),
            key => KEY_NAMES
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, name)| name.to_string())
                .unwrap_or_default(),
        }
    }

    /// Look a key up by its short name
    pub fn from_name(name: &str) -> Option<Self> {
        if let Some(number) = name.strip_prefix('f') {
            if let Ok(n @ 1..=12) = number.parse::<u8>() {
                return Some(NamedKey::Function(n));
            }
        }
        KEY_NAMES
            .iter()
            .find(|(_, n)| *n == name)
            .map(|(key, _)| *key)
    }
}

/// A decoded key press
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum KeyCode {
    /// Printable character
    Char(char),
    /// Control combination; holds the lowercase letter or symbol (`C-a` is `Control('a')`)
    Control(char),
    /// Escape followed by a printable character (`M-x`)
    Meta(char),
    /// Named special key
    Named(NamedKey),
    /// Bytes that did not form a known key
    Unrecognized(Vec<u8>),
}

impl KeyCode {
    /// Short script-visible name
    pub fn name(&self) -> String {
        match self {
            KeyCode::Char(c) => c.to_string(),
            KeyCode::Control(c) => format!("C-{}", c),
            KeyCode::Meta(c) => format!("M-{}", c),
            KeyCode::Named(key) => key.name(),
            KeyCode::Unrecognized(_) => "unknown".to_string(),
        }
    }

    /// Parse a short name back into a key code
    pub fn parse(name: &str) -> Option<Self> {
        let single = |s: &str| {
            let mut chars = s.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => Some(c),
                _ => None,
            }
        };

        if let Some(rest) = name.strip_prefix("C-") {
            return single(rest).map(|c| KeyCode::Control(c.to_ascii_lowercase()));
        }
        if let Some(rest) = name.strip_prefix("M-") {
            return single(rest).map(KeyCode::Meta);
        }
        if let Some(c) = single(name) {
            return Some(KeyCode::Char(c));
        }
        NamedKey::from_name(name).map(KeyCode::Named)
    }

    /// Whether the key came from a single-byte code
    pub fn is_ascii(&self) -> bool {
        match self {
            KeyCode::Char(c) | KeyCode::Meta(c) => c.is_ascii(),
            KeyCode::Control(_) => true,
            KeyCode::Named(NamedKey::Enter | NamedKey::Tab | NamedKey::Backspace) => true,
            KeyCode::Named(_) | KeyCode::Unrecognized(_) => false,
        }
    }

    /// The printable character, if any
    pub fn as_char(&self) -> Option<char> {
        match self {
            KeyCode::Char(c) => Some(*c),
            _ => None,
        }
    }
}

impl fmt::Display for KeyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyCode::Unrecognized(bytes) => write!(f, "unknown{:02x?}", bytes),
            key => f.write_str(&key.name()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names() {
        assert_eq!(KeyCode::Char('a').name(), "a");
        assert_eq!(KeyCode::Control('q').name(), "C-q");
        assert_eq!(KeyCode::Meta('x').name(), "M-x");
        assert_eq!(KeyCode::Named(NamedKey::PageDown).name(), "pagedown");
        assert_eq!(KeyCode::Named(NamedKey::Function(11)).name(), "f11");
        assert_eq!(KeyCode::Unrecognized(vec![0x1b]).name(), "unknown");
    }

    #[test]
    fn test_parse() {
        assert_eq!(KeyCode::parse("q"), Some(KeyCode::Char('q')));
        assert_eq!(KeyCode::parse("C-Q"), Some(KeyCode::Control('q')));
        assert_eq!(KeyCode::parse("M-x"), Some(KeyCode::Meta('x')));
        assert_eq!(KeyCode::parse("f12"), Some(KeyCode::Named(NamedKey::Function(12))));
        assert_eq!(KeyCode::parse("home"), Some(KeyCode::Named(NamedKey::Home)));
        assert_eq!(KeyCode::parse("f13"), None);
        assert_eq!(KeyCode::parse("C-"), None);
        assert_eq!(KeyCode::parse("nonsense"), None);
    }

    #[test]
    fn test_ascii_classification() {
        assert!(KeyCode::Char('q').is_ascii());
        assert!(!KeyCode::Char('é').is_ascii());
        assert!(KeyCode::Named(NamedKey::Enter).is_ascii());
        assert!(!KeyCode::Named(NamedKey::Up).is_ascii());
        assert_eq!(KeyCode::Char('q').as_char(), Some('q'));
        assert_eq!(KeyCode::Control('q').as_char(), None);
    }
}
