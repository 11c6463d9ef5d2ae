//! Text Buffer
//!
//! A document: a display name, an optional backing file, the lines
//! themselves, and whether they changed since the last save.

use std::path::{Path, PathBuf};
use tracing::{debug, info};

use e_core::error::{EditorError, Result};

use crate::line::Line;
use crate::line_sequence::LineSequence;

/// Separator written between lines by `serialize`
#[cfg(windows)]
pub const LINE_SEPARATOR: &str = "\r\n";
#[cfg(not(windows))]
pub const LINE_SEPARATOR: &str = "\n";

/// An editable document
#[derive(Debug, Clone)]
pub struct Buffer {
    /// Display name, not necessarily unique
    name: String,
    /// Backing file; `None` means the buffer was never saved
    path: Option<PathBuf>,
    /// Document content
    lines: LineSequence,
    /// Whether the buffer has been modified
    dirty: bool,
}

impl Buffer {
    /// Create an unsaved buffer holding one empty line
    pub fn new(name: impl Into<String>) -> Self {
        let mut lines = LineSequence::new();
        lines.append(Line::default());
        Self {
            name: name.into(),
            path: None,
            lines,
            dirty: false,
        }
    }

    /// Create a buffer bound to a file path (nothing is read)
    pub fn with_path(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        let mut buffer = Self::new(name);
        buffer.path = Some(path.into());
        buffer
    }

    /// Load a buffer from a file, named after the file
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        let mut buffer = Self::with_path(name, path);
        match tokio::fs::read(path).await {
            Ok(bytes) => buffer.load(&bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("{:?} does not exist yet, starting empty", path);
            }
            Err(e) => return Err(e.into()),
        }
        Ok(buffer)
    }

    /// Save the buffer to its file
    pub async fn save(&mut self) -> Result<()> {
        let path = self
            .path
            .clone()
            .ok_or_else(|| EditorError::InvalidState(format!("buffer {} has no file path", self.name)))?;
        tokio::fs::write(&path, self.serialize()).await?;
        self.mark_persisted();
        debug!("Saved {} lines to {:?}", self.len(), path);
        Ok(())
    }

    /// Save the buffer to a new file
    pub async fn save_as(&mut self, path: impl Into<PathBuf>) -> Result<()> {
        self.path = Some(path.into());
        self.save().await
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Get the file path
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Get the number of lines
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Get a line by index
    pub fn line(&self, index: usize) -> Result<&Line> {
        self.lines.get(index)
    }

    /// Get a line for editing; the buffer counts as modified
    pub fn line_mut(&mut self, index: usize) -> Result<&mut Line> {
        let line = self.lines.get_mut(index)?;
        self.dirty = true;
        Ok(line)
    }

    /// Iterate over all lines
    pub fn lines(&self) -> impl DoubleEndedIterator<Item = &Line> + '_ {
        self.lines.iter()
    }

    /// Insert a line before `index`
    pub fn insert(&mut self, index: usize, text: impl Into<Line>) -> Result<()> {
        self.lines.insert(index, text)?;
        self.dirty = true;
        Ok(())
    }

    /// Remove the line at `index`
    pub fn erase(&mut self, index: usize) -> Result<Line> {
        let line = self.lines.erase(index)?;
        self.dirty = true;
        Ok(line)
    }

    /// Append a line at the end
    pub fn append(&mut self, text: impl Into<Line>) {
        self.lines.append(text);
        self.dirty = true;
    }

    /// Check if the buffer has been modified
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Record that the content now matches what was persisted
    pub fn mark_persisted(&mut self) {
        self.dirty = false;
    }

    /// Replace the whole content with `bytes`, split on line boundaries.
    ///
    /// Splitting is on `\n` with an optional preceding `\r` dropped, so an
    /// empty input still yields one empty line. Invalid UTF-8 is replaced.
    pub fn load(&mut self, bytes: &[u8]) {
        let text = String::from_utf8_lossy(bytes);
        self.lines = text
            .split('\n')
            .map(|raw| Line::new(raw.strip_suffix('\r').unwrap_or(raw)))
            .collect();
        self.dirty = false;
        debug!("Loaded {} lines into {}", self.lines.len(), self.name);
    }

    /// Join the lines with `LINE_SEPARATOR`
    pub fn serialize(&self) -> Vec<u8> {
        let mut out = Vec::new();
        for (i, line) in self.lines.iter().enumerate() {
            if i > 0 {
                out.extend_from_slice(LINE_SEPARATOR.as_bytes());
            }
            out.extend_from_slice(line.as_str().as_bytes());
        }
        out
    }
}
