//! Cursor Management
//!
//! The cursor belongs to whoever drives a buffer, not to the buffer
//! itself. Movement clamps against the buffer it is given.

use crate::buffer::Buffer;

/// Text position (line, column)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, PartialOrd, Ord)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Position {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

/// Cursor movement direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

/// A text cursor
#[derive(Debug, Clone, Default)]
pub struct Cursor {
    /// Current position
    position: Position,
    /// Preferred column (for vertical movement)
    preferred_column: Option<usize>,
}

fn line_len(buffer: &Buffer, line: usize) -> usize {
    buffer.line(line).map_or(0, |l| l.len())
}

impl Cursor {
    /// Create a new cursor at position (0, 0)
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a cursor at a specific position
    pub fn at(line: usize, column: usize) -> Self {
        Self {
            position: Position { line, column },
            preferred_column: None,
        }
    }

    /// Get the current position
    pub fn position(&self) -> Position {
        self.position
    }

    pub fn line(&self) -> usize {
        self.position.line
    }

    pub fn column(&self) -> usize {
        self.position.column
    }

    /// Move to a specific line and column, clamped to the buffer
    pub fn move_to(&mut self, buffer: &Buffer, line: usize, column: usize) {
        let line = line.min(buffer.len().saturating_sub(1));
        let column = column.min(line_len(buffer, line));
        self.position = Position { line, column };
        self.preferred_column = None;
    }

    /// Pull the cursor back inside the buffer after an edit
    pub fn clamp(&mut self, buffer: &Buffer) {
        let Position { line, column } = self.position;
        self.move_to(buffer, line, column);
    }

    /// Move in a direction by one character or line
    pub fn move_direction(&mut self, direction: Direction, buffer: &Buffer) {
        let last_line = buffer.len().saturating_sub(1);
        match direction {
            Direction::Up => {
                if self.position.line > 0 {
                    let preferred = self.preferred_column.unwrap_or(self.position.column);
                    self.position.line -= 1;
                    self.position.column = preferred.min(line_len(buffer, self.position.line));
                    self.preferred_column = Some(preferred);
                }
            }
            Direction::Down => {
                if self.position.line < last_line {
                    let preferred = self.preferred_column.unwrap_or(self.position.column);
                    self.position.line += 1;
                    self.position.column = preferred.min(line_len(buffer, self.position.line));
                    self.preferred_column = Some(preferred);
                }
            }
            Direction::Left => {
                if self.position.column > 0 {
                    self.position.column -= 1;
                } else if self.position.line > 0 {
                    self.position.line -= 1;
                    self.position.column = line_len(buffer, self.position.line);
                }
                self.preferred_column = None;
            }
            Direction::Right => {
                if self.position.column < line_len(buffer, self.position.line) {
                    self.position.column += 1;
                } else if self.position.line < last_line {
                    self.position.line += 1;
                    self.position.column = 0;
                }
                self.preferred_column = None;
            }
        }
    }

    /// Move to start of line
    pub fn move_to_line_start(&mut self) {
        self.position.column = 0;
        self.preferred_column = None;
    }

    /// Move to end of line
    pub fn move_to_line_end(&mut self, buffer: &Buffer) {
        self.position.column = line_len(buffer, self.position.line);
        self.preferred_column = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buffer(text: &str) -> Buffer {
        let mut buffer = Buffer::new("test");
        buffer.load(text.as_bytes());
        buffer
    }

    #[test]
    fn test_vertical_movement_keeps_preferred_column() {
        let buf = buffer("long line\nab\nanother long line");
        let mut cursor = Cursor::at(0, 7);

        cursor.move_direction(Direction::Down, &buf);
        assert_eq!(cursor.position(), Position::new(1, 2));

        cursor.move_direction(Direction::Down, &buf);
        assert_eq!(cursor.position(), Position::new(2, 7));
    }

    #[test]
    fn test_horizontal_movement_wraps_lines() {
        let buf = buffer("ab\ncd");
        let mut cursor = Cursor::at(0, 2);

        cursor.move_direction(Direction::Right, &buf);
        assert_eq!(cursor.position(), Position::new(1, 0));

        cursor.move_direction(Direction::Left, &buf);
        assert_eq!(cursor.position(), Position::new(0, 2));
    }

    #[test]
    fn test_clamp_after_erase() {
        let mut buf = buffer("one\ntwo\nthree");
        let mut cursor = Cursor::at(2, 5);
        buf.erase(2).unwrap();
        cursor.clamp(&buf);
        assert_eq!(cursor.position(), Position::new(1, 3));
    }

    #[test]
    fn test_line_start_and_end() {
        let buf = buffer("hello");
        let mut cursor = Cursor::at(0, 2);
        cursor.move_to_line_end(&buf);
        assert_eq!(cursor.column(), 5);
        cursor.move_to_line_start();
        assert_eq!(cursor.column(), 0);
    }
}
