//! Editing session
//!
//! A session drives one buffer: it owns the cursor, the script host,
//! and is the reactor's active key handler. Every key is offered to the
//! script's `keypress` listeners first and then applied as a built-in
//! edit.

use tracing::{debug, warn};

use e_core::config::EditorConfig;
use e_core::error::{Result, ScriptError};
use e_core::events::{CallbackId, TargetId};
use e_editor::{Buffer, Cursor, Direction, Line};
use e_input::{KeyCode, NamedKey};
use e_reactor::{KeyFlow, KeyHandler, Runtime, ScriptHost, ScriptScope, ScriptValue};

use crate::host::NativeHost;

/// Event dispatched for every key press
pub const KEYPRESS_EVENT: &str = "keypress";

/// Target identity of the session itself
pub const SESSION_TARGET: TargetId = TargetId::new(0);

/// One buffer being edited
#[derive(Debug)]
pub struct Session {
    buffer: Buffer,
    cursor: Cursor,
    host: NativeHost,
    quit_key: KeyCode,
    indent: String,
}

impl Session {
    pub fn new(buffer: Buffer, config: &EditorConfig) -> Self {
        let quit_key = KeyCode::parse(&config.quit_key).unwrap_or_else(|| {
            warn!("Unknown quit key {:?}, using q", config.quit_key);
            KeyCode::Char('q')
        });
        let indent = if config.soft_tabs {
            " ".repeat(config.tab_width)
        } else {
            "\t".to_string()
        };

        Self {
            buffer,
            cursor: Cursor::new(),
            host: NativeHost::new(),
            quit_key,
            indent,
        }
    }

    pub fn buffer(&self) -> &Buffer {
        &self.buffer
    }

    pub fn buffer_mut(&mut self) -> &mut Buffer {
        &mut self.buffer
    }

    pub fn cursor(&self) -> &Cursor {
        &self.cursor
    }

    pub fn host_mut(&mut self) -> &mut NativeHost {
        &mut self.host
    }

    /// Apply a key as a built-in edit or movement
    pub fn apply_key(&mut self, key: &KeyCode) -> Result<()> {
        match key {
            KeyCode::Char(c) => self.insert_text(&c.to_string())?,
            KeyCode::Named(NamedKey::Tab) => {
                let indent = self.indent.clone();
                self.insert_text(&indent)?;
            }
            KeyCode::Named(NamedKey::Enter) => self.split_line()?,
            KeyCode::Named(NamedKey::Backspace) => self.delete_backward()?,
            KeyCode::Named(NamedKey::Delete) => self.delete_forward()?,
            KeyCode::Named(NamedKey::Up) => self.cursor.move_direction(Direction::Up, &self.buffer),
            KeyCode::Named(NamedKey::Down) => self.cursor.move_direction(Direction::Down, &self.buffer),
            KeyCode::Named(NamedKey::Left) => self.cursor.move_direction(Direction::Left, &self.buffer),
            KeyCode::Named(NamedKey::Right) => self.cursor.move_direction(Direction::Right, &self.buffer),
            KeyCode::Named(NamedKey::Home) => self.cursor.move_to_line_start(),
            KeyCode::Named(NamedKey::End) => self.cursor.move_to_line_end(&self.buffer),
            other => debug!(key = %other, "no built-in action"),
        }
        Ok(())
    }

    /// Keep at least one line to type into and the cursor inside the buffer
    fn normalize(&mut self) {
        if self.buffer.is_empty() {
            self.buffer.append(Line::default());
        }
        self.cursor.clamp(&self.buffer);
    }

    fn insert_text(&mut self, text: &str) -> Result<()> {
        let (line, column) = (self.cursor.line(), self.cursor.column());
        self.buffer.line_mut(line)?.insert_str(column, text);
        let inserted = Line::new(text).len();
        self.cursor.move_to(&self.buffer, line, column + inserted);
        Ok(())
    }

    fn split_line(&mut self) -> Result<()> {
        let (line, column) = (self.cursor.line(), self.cursor.column());
        let tail = self.buffer.line_mut(line)?.split_off(column);
        self.buffer.insert(line + 1, tail)?;
        self.cursor.move_to(&self.buffer, line + 1, 0);
        Ok(())
    }

    fn delete_backward(&mut self) -> Result<()> {
        let (line, column) = (self.cursor.line(), self.cursor.column());
        if column > 0 {
            self.buffer.line_mut(line)?.remove(column - 1);
            self.cursor.move_to(&self.buffer, line, column - 1);
        } else if line > 0 {
            let removed = self.buffer.erase(line)?;
            let join_at = self.buffer.line(line - 1)?.len();
            self.buffer.line_mut(line - 1)?.push_line(&removed);
            self.cursor.move_to(&self.buffer, line - 1, join_at);
        }
        Ok(())
    }

    fn delete_forward(&mut self) -> Result<()> {
        let (line, column) = (self.cursor.line(), self.cursor.column());
        if column < self.buffer.line(line)?.len() {
            self.buffer.line_mut(line)?.remove(column);
        } else if line + 1 < self.buffer.len() {
            let removed = self.buffer.erase(line + 1)?;
            self.buffer.line_mut(line)?.push_line(&removed);
        }
        Ok(())
    }
}

impl ScriptHost for Session {
    fn call(
        &mut self,
        scope: &mut ScriptScope<'_>,
        callback: CallbackId,
        target: Option<TargetId>,
        args: &[ScriptValue],
    ) -> std::result::Result<(), ScriptError> {
        self.host
            .call_with_buffer(scope, Some(&mut self.buffer), callback, target, args)
    }

    fn release(&mut self, callback: CallbackId) {
        self.host.release(callback);
    }
}

impl KeyHandler for Session {
    fn handle_key(&mut self, runtime: &mut Runtime, key: &KeyCode) -> KeyFlow {
        if *key == self.quit_key {
            return KeyFlow::Quit;
        }

        runtime.dispatch(self, KEYPRESS_EVENT, SESSION_TARGET, &[ScriptValue::Key(key.clone())]);
        // listeners may have edited the buffer under the cursor
        self.normalize();

        if let Err(err) = self.apply_key(key) {
            warn!(key = %key, error = %err, "key could not be applied");
            self.cursor.clamp(&self.buffer);
        }
        KeyFlow::Continue
    }
}
