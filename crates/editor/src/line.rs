//! A single line of text.
//!
//! Columns are counted in grapheme clusters, which is what a cursor
//! steps over.

use std::fmt;
use unicode_segmentation::UnicodeSegmentation;

/// One line of a document, without its line terminator
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Line {
    text: String,
}

impl Line {
    /// Create a line, dropping any line terminator characters
    pub fn new(text: impl Into<String>) -> Self {
        let mut text = text.into();
        text.retain(|c| c != '\n' && c != '\r');
        Self { text }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Length in grapheme clusters
    pub fn len(&self) -> usize {
        self.text.graphemes(true).count()
    }

    /// Byte offset of a column, clamped to the end of the line
    fn byte_offset(&self, column: usize) -> usize {
        self.text
            .grapheme_indices(true)
            .nth(column)
            .map_or(self.text.len(), |(offset, _)| offset)
    }

    /// Insert text at a column (clamped to the end of the line)
    pub fn insert_str(&mut self, column: usize, text: &str) {
        let offset = self.byte_offset(column);
        let clean: String = text.chars().filter(|c| *c != '\n' && *c != '\r').collect();
        self.text.insert_str(offset, &clean);
    }

    /// Insert a single character at a column
    pub fn insert_char(&mut self, column: usize, ch: char) {
        if ch == '\n' || ch == '\r' {
            return;
        }
        let offset = self.byte_offset(column);
        self.text.insert(offset, ch);
    }

    /// Remove the grapheme at a column
    pub fn remove(&mut self, column: usize) -> Option<String> {
        let (start, grapheme) = self.text.grapheme_indices(true).nth(column)?;
        let end = start + grapheme.len();
        let removed = grapheme.to_string();
        self.text.replace_range(start..end, "");
        Some(removed)
    }

    /// Split the line at a column, keeping the head and returning the tail
    pub fn split_off(&mut self, column: usize) -> Line {
        let offset = self.byte_offset(column);
        Line {
            text: self.text.split_off(offset),
        }
    }

    /// Append another line's text
    pub fn push_line(&mut self, other: &Line) {
        self.text.push_str(&other.text);
    }

    /// Append text at the end of the line
    pub fn push_str(&mut self, text: &str) {
        let end = self.len();
        self.insert_str(end, text);
    }
}

impl fmt::Display for Line {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl From<&str> for Line {
    fn from(text: &str) -> Self {
        Line::new(text)
    }
}

impl From<String> for Line {
    fn from(text: String) -> Self {
        Line::new(text)
    }
}

impl PartialEq<str> for Line {
    fn eq(&self, other: &str) -> bool {
        self.text == other
    }
}

impl PartialEq<&str> for Line {
    fn eq(&self, other: &&str) -> bool {
        self.text == *other
    }
}
