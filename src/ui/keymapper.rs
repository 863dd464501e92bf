//! Key scripts
//!
//! Converts a key script (as passed with `--and-keys`) into the raw byte
//! sequence a terminal would send, so injected input goes through the same
//! decoder as live input.
//!
//! Two notations are accepted:
//!
//! - **Token mode** (the script contains a comma or is only `A-Z` and `-`):
//!   `UP,DOWN,TYPE=beta,CTRL-D,ENTER`
//! - **Raw mode**: the script's characters are sent as-is, e.g. `beta\r`

use crossterm::event::{KeyCode, KeyModifiers};

/// Key script to terminal byte mapping
pub struct KeyMapper;

impl KeyMapper {
    /// Parse a key script into terminal bytes
    pub fn parse_script(script: &str) -> Vec<u8> {
        if !Self::is_token_mode(script) {
            return script.as_bytes().to_vec();
        }

        let mut bytes = Vec::new();
        for tok in script.split(',').map(str::trim_start) {
            if let Some(text) = tok.strip_prefix("TYPE=").or_else(|| tok.strip_prefix("type=")) {
                bytes.extend_from_slice(text.as_bytes());
            } else if let Some(seq) = Self::token_bytes(tok) {
                bytes.extend(seq);
            } else if tok.chars().count() == 1 {
                bytes.extend_from_slice(tok.as_bytes());
            }
        }
        bytes
    }

    fn is_token_mode(script: &str) -> bool {
        script.contains(',')
            || (!script.is_empty() && script.chars().all(|c| c.is_ascii_uppercase() || c == '-'))
    }

    /// Bytes for a named key such as `ENTER` or `CTRL-D`
    fn token_bytes(tok: &str) -> Option<Vec<u8>> {
        let up = tok.to_ascii_uppercase();
        let (code, mods) = match up.as_str() {
            "UP" => (KeyCode::Up, KeyModifiers::NONE),
            "DOWN" => (KeyCode::Down, KeyModifiers::NONE),
            "LEFT" => (KeyCode::Left, KeyModifiers::NONE),
            "RIGHT" => (KeyCode::Right, KeyModifiers::NONE),
            "ENTER" => (KeyCode::Enter, KeyModifiers::NONE),
            "ESC" => (KeyCode::Esc, KeyModifiers::NONE),
            "BACKSPACE" => (KeyCode::Backspace, KeyModifiers::NONE),
            other => {
                // CTRL-X or CTRLX
                let letter = other
                    .strip_prefix("CTRL-")
                    .or_else(|| other.strip_prefix("CTRL"))?;
                let mut chars = letter.chars();
                match (chars.next(), chars.next()) {
                    (Some(ch), None) if ch.is_ascii_alphabetic() => {
                        (KeyCode::Char(ch.to_ascii_lowercase()), KeyModifiers::CONTROL)
                    }
                    _ => return None,
                }
            }
        };
        Self::map(code, mods)
    }

    /// Map a key to the bytes a terminal in normal cursor mode sends
    pub fn map(code: KeyCode, mods: KeyModifiers) -> Option<Vec<u8>> {
        match code {
            KeyCode::Char(ch) => Some(Self::map_char(ch, mods)),
            KeyCode::Enter => Some(vec![0x0D]),
            KeyCode::Backspace => Some(vec![0x7F]),
            KeyCode::Esc => Some(vec![0x1B]),
            KeyCode::Up => Some(Self::arrow_key(b'A')),
            KeyCode::Down => Some(Self::arrow_key(b'B')),
            KeyCode::Right => Some(Self::arrow_key(b'C')),
            KeyCode::Left => Some(Self::arrow_key(b'D')),
            _ => None,
        }
    }

    /// Map a character with modifiers
    fn map_char(ch: char, mods: KeyModifiers) -> Vec<u8> {
        // Ctrl + letter = control character
        if mods.contains(KeyModifiers::CONTROL) && ch.is_ascii_alphabetic() {
            let ctrl_code = (ch.to_ascii_lowercase() as u8) - b'a' + 1;
            return vec![ctrl_code];
        }
        ch.to_string().into_bytes()
    }

    /// Arrow key sequence: ESC [ <key>
    fn arrow_key(key: u8) -> Vec<u8> {
        vec![0x1B, b'[', key]
    }
}
