//! Key decoding
//!
//! Turns the raw byte stream from a [`ByteSource`] into logical key events.
//! The only ambiguous input is ESC: a bare Escape key and the start of a CSI
//! arrow sequence share the same first byte, so after ESC the decoder waits a
//! short, bounded time for the rest of the sequence.

use std::time::Duration;

use super::term::{ByteSource, ReadResult, Result};

/// Default window for completing an escape sequence
pub const ESCAPE_TIMEOUT: Duration = Duration::from_millis(50);

/// Longest CSI sequence the decoder will consume before giving up
const MAX_CSI_LEN: usize = 16;

const ESC: u8 = 0x1B;
const ENTER: u8 = 0x0D;
const BACKSPACE: u8 = 0x7F;

/// Arrow key direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arrow {
    Up,
    Down,
    Left,
    Right,
}

/// Logical key event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyEvent {
    Printable(char),
    Arrow(Arrow),
    Enter,
    Escape,
    Backspace,
    /// Control + letter, always lowercase
    Ctrl(char),
}

/// Result of one decode attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decoded {
    Key(KeyEvent),
    /// Bytes were consumed but did not form a known key
    Unrecognized,
    /// No input arrived within the wait
    Idle,
    /// Input is exhausted
    Closed,
}

/// Byte stream to key event decoder
pub struct KeyDecoder {
    /// A byte read while disambiguating ESC that belongs to the next key
    pending: Option<u8>,
    escape_timeout: Duration,
}

impl Default for KeyDecoder {
    fn default() -> Self {
        Self::new(ESCAPE_TIMEOUT)
    }
}

impl KeyDecoder {
    pub fn new(escape_timeout: Duration) -> Self {
        Self {
            pending: None,
            escape_timeout,
        }
    }

    /// Decode the next key, waiting up to `wait` for its first byte
    pub fn next<S: ByteSource + ?Sized>(&mut self, src: &mut S, wait: Option<Duration>) -> Result<Decoded> {
        let first = match self.pending.take() {
            Some(b) => b,
            None => match src.read_byte(wait)? {
                ReadResult::Byte(b) => b,
                ReadResult::TimedOut => return Ok(Decoded::Idle),
                ReadResult::Closed => return Ok(Decoded::Closed),
            },
        };

        match first {
            ESC => self.escape(src),
            ENTER => Ok(Decoded::Key(KeyEvent::Enter)),
            BACKSPACE => Ok(Decoded::Key(KeyEvent::Backspace)),
            0x01..=0x1A => Ok(Decoded::Key(KeyEvent::Ctrl((b'a' + first - 1) as char))),
            0x20..=0x7E => Ok(Decoded::Key(KeyEvent::Printable(first as char))),
            0xC0..=0xF7 => self.utf8(src, first),
            _ => Ok(Decoded::Unrecognized),
        }
    }

    /// ESC, ESC [ A..D, or an unrecognized CSI sequence
    fn escape<S: ByteSource + ?Sized>(&mut self, src: &mut S) -> Result<Decoded> {
        let second = match src.read_byte(Some(self.escape_timeout))? {
            ReadResult::Byte(b) => b,
            ReadResult::TimedOut | ReadResult::Closed => return Ok(Decoded::Key(KeyEvent::Escape)),
        };
        if second != b'[' {
            // Bare Escape followed by an unrelated key
            self.pending = Some(second);
            return Ok(Decoded::Key(KeyEvent::Escape));
        }

        let mut consumed = 0;
        loop {
            let byte = match src.read_byte(Some(self.escape_timeout))? {
                ReadResult::Byte(b) => b,
                ReadResult::TimedOut | ReadResult::Closed => {
                    // "ESC [" with nothing after it
                    return Ok(if consumed == 0 {
                        Decoded::Key(KeyEvent::Escape)
                    } else {
                        Decoded::Unrecognized
                    });
                }
            };
            consumed += 1;

            // Parameter (0x30-0x3F) and intermediate (0x20-0x2F) bytes
            if (0x20..=0x3F).contains(&byte) {
                if consumed >= MAX_CSI_LEN {
                    return Ok(Decoded::Unrecognized);
                }
                continue;
            }

            let arrow = match byte {
                b'A' if consumed == 1 => Some(Arrow::Up),
                b'B' if consumed == 1 => Some(Arrow::Down),
                b'C' if consumed == 1 => Some(Arrow::Right),
                b'D' if consumed == 1 => Some(Arrow::Left),
                _ => None,
            };
            return Ok(match arrow {
                Some(a) => Decoded::Key(KeyEvent::Arrow(a)),
                None => Decoded::Unrecognized,
            });
        }
    }

    /// Complete a multi-byte UTF-8 character
    fn utf8<S: ByteSource + ?Sized>(&mut self, src: &mut S, lead: u8) -> Result<Decoded> {
        let len = match lead {
            0xC0..=0xDF => 2,
            0xE0..=0xEF => 3,
            _ => 4,
        };
        let mut buf = [lead, 0, 0, 0];
        for slot in buf.iter_mut().take(len).skip(1) {
            match src.read_byte(Some(self.escape_timeout))? {
                ReadResult::Byte(b) if b & 0xC0 == 0x80 => *slot = b,
                ReadResult::Byte(b) => {
                    self.pending = Some(b);
                    return Ok(Decoded::Unrecognized);
                }
                ReadResult::TimedOut | ReadResult::Closed => return Ok(Decoded::Unrecognized),
            }
        }
        Ok(match std::str::from_utf8(&buf[..len]).ok().and_then(|s| s.chars().next()) {
            Some(ch) => Decoded::Key(KeyEvent::Printable(ch)),
            None => Decoded::Unrecognized,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::term::ScriptedInput;

    fn decode_all(bytes: &[u8]) -> Vec<Decoded> {
        let mut input = ScriptedInput::new(bytes.to_vec());
        let mut decoder = KeyDecoder::default();
        let mut out = Vec::new();
        loop {
            match decoder.next(&mut input, None).unwrap() {
                Decoded::Closed => break,
                d => out.push(d),
            }
        }
        out
    }

    fn key(k: KeyEvent) -> Decoded {
        Decoded::Key(k)
    }

    #[test]
    fn test_arrow_keys() {
        assert_eq!(
            decode_all(b"\x1b[A\x1b[B\x1b[C\x1b[D"),
            vec![
                key(KeyEvent::Arrow(Arrow::Up)),
                key(KeyEvent::Arrow(Arrow::Down)),
                key(KeyEvent::Arrow(Arrow::Right)),
                key(KeyEvent::Arrow(Arrow::Left)),
            ]
        );
    }

    #[test]
    fn test_bare_escape() {
        assert_eq!(decode_all(b"\x1b"), vec![key(KeyEvent::Escape)]);
    }

    #[test]
    fn test_escape_then_key() {
        assert_eq!(
            decode_all(b"\x1bx"),
            vec![key(KeyEvent::Escape), key(KeyEvent::Printable('x'))]
        );
    }

    #[test]
    fn test_unrecognized_csi_dropped() {
        // Ctrl+Up and Delete are not part of the key set
        assert_eq!(
            decode_all(b"\x1b[1;5A\x1b[3~a"),
            vec![Decoded::Unrecognized, Decoded::Unrecognized, key(KeyEvent::Printable('a'))]
        );
    }

    #[test]
    fn test_control_bytes() {
        assert_eq!(
            decode_all(&[0x01, 0x03, 0x04, 0x08, 0x0B, 0x0D, 0x0E, 0x10, 0x17, 0x7F]),
            vec![
                key(KeyEvent::Ctrl('a')),
                key(KeyEvent::Ctrl('c')),
                key(KeyEvent::Ctrl('d')),
                key(KeyEvent::Ctrl('h')),
                key(KeyEvent::Ctrl('k')),
                key(KeyEvent::Enter),
                key(KeyEvent::Ctrl('n')),
                key(KeyEvent::Ctrl('p')),
                key(KeyEvent::Ctrl('w')),
                key(KeyEvent::Backspace),
            ]
        );
    }

    #[test]
    fn test_printable_and_utf8() {
        assert_eq!(
            decode_all("a é".as_bytes()),
            vec![
                key(KeyEvent::Printable('a')),
                key(KeyEvent::Printable(' ')),
                key(KeyEvent::Printable('é')),
            ]
        );
        // Truncated sequence
        assert_eq!(decode_all(&[0xE3, 0x81]), vec![Decoded::Unrecognized]);
    }

    #[test]
    fn test_idle_on_timeout() {
        struct Silent;
        impl ByteSource for Silent {
            fn read_byte(&mut self, _timeout: Option<Duration>) -> Result<ReadResult> {
                Ok(ReadResult::TimedOut)
            }
        }
        let mut decoder = KeyDecoder::default();
        assert_eq!(decoder.next(&mut Silent, Some(Duration::from_millis(1))).unwrap(), Decoded::Idle);
    }

    /// Bytes with gaps: `None` is a read that times out
    struct Gapped(std::collections::VecDeque<Option<u8>>);

    impl ByteSource for Gapped {
        fn read_byte(&mut self, _timeout: Option<Duration>) -> Result<ReadResult> {
            Ok(match self.0.pop_front() {
                Some(Some(b)) => ReadResult::Byte(b),
                Some(None) => ReadResult::TimedOut,
                None => ReadResult::Closed,
            })
        }
    }

    fn decode_gapped(input: &[Option<u8>]) -> Vec<Decoded> {
        let mut src = Gapped(input.iter().copied().collect());
        let mut decoder = KeyDecoder::default();
        let mut out = Vec::new();
        loop {
            match decoder.next(&mut src, None).unwrap() {
                Decoded::Closed => break,
                d => out.push(d),
            }
        }
        out
    }

    #[test]
    fn test_escape_wait_expires_before_bracket() {
        assert_eq!(
            decode_gapped(&[Some(ESC), None, Some(b'['), Some(b'A')]),
            vec![
                key(KeyEvent::Escape),
                key(KeyEvent::Printable('[')),
                key(KeyEvent::Printable('A')),
            ]
        );
    }

    #[test]
    fn test_escape_wait_expires_after_bracket() {
        assert_eq!(decode_gapped(&[Some(ESC), Some(b'['), None]), vec![key(KeyEvent::Escape)]);
    }
}
