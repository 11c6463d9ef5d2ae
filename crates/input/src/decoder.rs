//! Key decoder
//!
//! State machine from raw terminal bytes to [`KeyCode`]s.
//!
//! ```text
//! Idle ──ESC──▶ InEscape ──'[' or 'O'──▶ InEscapeParams ──final──▶ Idle
//!  │               └──printable──▶ Meta key ──▶ Idle
//!  └──UTF-8 lead──▶ InUtf8 ──last continuation──▶ Idle
//! ```
//!
//! The decoder never waits on its own. When input stops while a
//! sequence is incomplete, the caller invokes [`KeyDecoder::flush`]
//! after its timeout and gets the buffered bytes back as one
//! `Unrecognized` key.

use tracing::debug;

use crate::keycode::{KeyCode, NamedKey};

const ESC: u8 = 0x1b;
const CSI_INTRODUCER: u8 = b'[';
const SS3_INTRODUCER: u8 = b'O';

/// Longest parameter run accepted inside a CSI sequence
const MAX_SEQUENCE_LEN: usize = 16;

/// Single bytes that name a key on their own
const CONTROL_KEYS: &[(u8, NamedKey)] = &[
    (0x09, NamedKey::Tab),
    (0x0d, NamedKey::Enter),
    (0x7f, NamedKey::Backspace),
];

/// `ESC O <final>`
const SS3_KEYS: &[(u8, NamedKey)] = &[
    (b'A', NamedKey::Up),
    (b'B', NamedKey::Down),
    (b'C', NamedKey::Right),
    (b'D', NamedKey::Left),
    (b'H', NamedKey::Home),
    (b'F', NamedKey::End),
    (b'P', NamedKey::Function(1)),
    (b'Q', NamedKey::Function(2)),
    (b'R', NamedKey::Function(3)),
    (b'S', NamedKey::Function(4)),
];

/// `ESC [ <params><final>`, keyed on the bytes after the bracket
const CSI_KEYS: &[(&[u8], NamedKey)] = &[
    (b"A", NamedKey::Up),
    (b"B", NamedKey::Down),
    (b"C", NamedKey::Right),
    (b"D", NamedKey::Left),
    (b"H", NamedKey::Home),
    (b"F", NamedKey::End),
    (b"Z", NamedKey::BackTab),
    (b"1~", NamedKey::Home),
    (b"2~", NamedKey::Insert),
    (b"3~", NamedKey::Delete),
    (b"4~", NamedKey::End),
    (b"5~", NamedKey::PageUp),
    (b"6~", NamedKey::PageDown),
    (b"7~", NamedKey::Home),
    (b"8~", NamedKey::End),
    (b"11~", NamedKey::Function(1)),
    (b"12~", NamedKey::Function(2)),
    (b"13~", NamedKey::Function(3)),
    (b"14~", NamedKey::Function(4)),
    (b"15~", NamedKey::Function(5)),
    (b"17~", NamedKey::Function(6)),
    (b"18~", NamedKey::Function(7)),
    (b"19~", NamedKey::Function(8)),
    (b"20~", NamedKey::Function(9)),
    (b"21~", NamedKey::Function(10)),
    (b"23~", NamedKey::Function(11)),
    (b"24~", NamedKey::Function(12)),
];

fn lookup<K: PartialEq + ?Sized>(table: &[(&K, NamedKey)], key: &K) -> Option<NamedKey> {
    table.iter().find(|(k, _)| *k == key).map(|(_, named)| *named)
}

fn lookup_byte(table: &[(u8, NamedKey)], byte: u8) -> Option<NamedKey> {
    table.iter().find(|(b, _)| *b == byte).map(|(_, named)| *named)
}

/// Decoder state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecoderState {
    Idle,
    /// Saw ESC
    InEscape,
    /// Saw ESC plus `[` or `O`, collecting up to the final byte
    InEscapeParams { introducer: u8 },
    /// Inside a multi-byte UTF-8 character
    InUtf8 { remaining: usize },
}

/// Byte-at-a-time key decoder
#[derive(Debug)]
pub struct KeyDecoder {
    state: DecoderState,
    pending: Vec<u8>,
}

impl Default for KeyDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyDecoder {
    pub fn new() -> Self {
        Self {
            state: DecoderState::Idle,
            pending: Vec::with_capacity(MAX_SEQUENCE_LEN),
        }
    }

    pub fn state(&self) -> DecoderState {
        self.state
    }

    /// Whether bytes are buffered waiting for the rest of a key
    pub fn is_pending(&self) -> bool {
        self.state != DecoderState::Idle
    }

    /// Decode a run of bytes
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<KeyCode> {
        let mut keys = Vec::new();
        for &byte in bytes {
            self.feed_byte(byte, &mut keys);
        }
        keys
    }

    /// Give up on a partial sequence: whatever is buffered becomes one
    /// `Unrecognized` key and the decoder returns to idle.
    pub fn flush(&mut self) -> Option<KeyCode> {
        if self.state == DecoderState::Idle {
            return None;
        }
        Some(self.unrecognized())
    }

    /// Decode one byte, pushing any completed keys onto `out`
    pub fn feed_byte(&mut self, byte: u8, out: &mut Vec<KeyCode>) {
        match self.state {
            DecoderState::Idle => self.idle(byte, out),
            DecoderState::InEscape => self.in_escape(byte, out),
            DecoderState::InEscapeParams { introducer } => self.in_params(introducer, byte, out),
            DecoderState::InUtf8 { remaining } => self.in_utf8(remaining, byte, out),
        }
    }

    fn idle(&mut self, byte: u8, out: &mut Vec<KeyCode>) {
        match byte {
            ESC => {
                self.pending.clear();
                self.pending.push(byte);
                self.state = DecoderState::InEscape;
            }
            0x20..=0x7e => out.push(KeyCode::Char(byte as char)),
            0x00..=0x7f => out.push(classify_control(byte)),
            _ => match utf8_width(byte) {
                Some(width) => {
                    self.pending.clear();
                    self.pending.push(byte);
                    self.state = DecoderState::InUtf8 { remaining: width - 1 };
                }
                None => out.push(KeyCode::Unrecognized(vec![byte])),
            },
        }
    }

    fn in_escape(&mut self, byte: u8, out: &mut Vec<KeyCode>) {
        match byte {
            CSI_INTRODUCER | SS3_INTRODUCER => {
                self.pending.push(byte);
                self.state = DecoderState::InEscapeParams { introducer: byte };
            }
            ESC => {
                // the first escape stands alone; the second may start a sequence
                out.push(self.unrecognized());
                self.pending.push(byte);
                self.state = DecoderState::InEscape;
            }
            0x20..=0x7e => {
                self.reset();
                out.push(KeyCode::Meta(byte as char));
            }
            _ => {
                self.pending.push(byte);
                out.push(self.unrecognized());
            }
        }
    }

    fn in_params(&mut self, introducer: u8, byte: u8, out: &mut Vec<KeyCode>) {
        if byte == ESC {
            // the cut-off sequence goes out alone; the escape starts a new one
            out.push(self.unrecognized());
            self.pending.push(byte);
            self.state = DecoderState::InEscape;
            return;
        }

        self.pending.push(byte);

        if introducer == SS3_INTRODUCER {
            let key = match lookup_byte(SS3_KEYS, byte) {
                Some(named) => {
                    self.reset();
                    KeyCode::Named(named)
                }
                None => self.unrecognized(),
            };
            out.push(key);
            return;
        }

        match byte {
            // parameter and intermediate bytes
            0x20..=0x3f if self.pending.len() < MAX_SEQUENCE_LEN => {}
            // final byte
            0x40..=0x7e => {
                let key = match lookup(CSI_KEYS, &self.pending[2..]) {
                    Some(named) => {
                        self.reset();
                        KeyCode::Named(named)
                    }
                    None => self.unrecognized(),
                };
                out.push(key);
            }
            _ => out.push(self.unrecognized()),
        }
    }

    fn in_utf8(&mut self, remaining: usize, byte: u8, out: &mut Vec<KeyCode>) {
        if byte & 0xc0 != 0x80 {
            // truncated character; the new byte starts over from idle
            out.push(self.unrecognized());
            self.idle(byte, out);
            return;
        }

        self.pending.push(byte);
        if remaining > 1 {
            self.state = DecoderState::InUtf8 { remaining: remaining - 1 };
            return;
        }

        let key = match std::str::from_utf8(&self.pending).ok().and_then(|s| s.chars().next()) {
            Some(c) => {
                self.reset();
                KeyCode::Char(c)
            }
            None => self.unrecognized(),
        };
        out.push(key);
    }

    /// Turn the buffered bytes into an unrecognized key and go idle
    fn unrecognized(&mut self) -> KeyCode {
        let bytes = std::mem::take(&mut self.pending);
        debug!(bytes = ?bytes, "unrecognized key sequence");
        self.state = DecoderState::Idle;
        KeyCode::Unrecognized(bytes)
    }

    fn reset(&mut self) {
        self.pending.clear();
        self.state = DecoderState::Idle;
    }
}

fn classify_control(byte: u8) -> KeyCode {
    if let Some(named) = lookup_byte(CONTROL_KEYS, byte) {
        return KeyCode::Named(named);
    }
    match byte {
        0x00 => KeyCode::Control(' '),
        0x01..=0x1a => KeyCode::Control((b'a' + byte - 1) as char),
        // 0x1c..=0x1f: C-\ C-] C-^ C-_
        _ => KeyCode::Control((byte + 0x40) as char),
    }
}

/// Total width of a UTF-8 character from its lead byte
fn utf8_width(lead: u8) -> Option<usize> {
    match lead {
        0xc2..=0xdf => Some(2),
        0xe0..=0xef => Some(3),
        0xf0..=0xf4 => Some(4),
        _ => None,
    }
}
