//! Line Sequence
//!
//! Ordered, index-addressable storage for the lines of a document.
//!
//! Lines are split across two stacks around a focus index:
//!
//! ```text
//!   before: [0, 1, 2, .., focus-1]      (in document order)
//!   after:  [len-1, .., focus+1, focus] (reversed, top = focus)
//! ```
//!
//! Inserting or erasing at the focus is a push or pop. Touching a
//! different index first relocates the focus there, moving one line
//! per step of distance. Typing walks the focus one line at a time, so
//! edits near the cursor stay O(1) amortized.

use std::fmt;

use e_core::error::{EditorError, Result};

use crate::line::Line;

/// Ordered sequence of lines with a movable edit focus
#[derive(Clone, Default)]
pub struct LineSequence {
    before: Vec<Line>,
    after: Vec<Line>,
    /// Lines moved by focus relocation since creation
    moved: u64,
}

impl LineSequence {
    /// Create an empty sequence
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of lines
    pub fn len(&self) -> usize {
        self.before.len() + self.after.len()
    }

    pub fn is_empty(&self) -> bool {
        self.before.is_empty() && self.after.is_empty()
    }

    /// Index the next edit is cheapest at
    pub fn focus(&self) -> usize {
        self.before.len()
    }

    /// Total lines moved while relocating the focus
    pub fn relocation_cost(&self) -> u64 {
        self.moved
    }

    fn out_of_range(&self, index: usize) -> EditorError {
        EditorError::OutOfRange {
            index,
            len: self.len(),
        }
    }

    /// Move the focus to `index` (must be <= len)
    fn seek(&mut self, index: usize) {
        debug_assert!(index <= self.len());
        while self.before.len() > index {
            if let Some(line) = self.before.pop() {
                self.after.push(line);
                self.moved += 1;
            }
        }
        while self.before.len() < index {
            if let Some(line) = self.after.pop() {
                self.before.push(line);
                self.moved += 1;
            }
        }
    }

    /// Get a line by index
    pub fn get(&self, index: usize) -> Result<&Line> {
        let split = self.before.len();
        if index < split {
            Ok(&self.before[index])
        } else if index < self.len() {
            Ok(&self.after[self.after.len() - 1 - (index - split)])
        } else {
            Err(self.out_of_range(index))
        }
    }

    /// Get a mutable line by index
    pub fn get_mut(&mut self, index: usize) -> Result<&mut Line> {
        let split = self.before.len();
        if index < split {
            Ok(&mut self.before[index])
        } else if index < self.len() {
            let back = self.after.len() - 1 - (index - split);
            Ok(&mut self.after[back])
        } else {
            Err(self.out_of_range(index))
        }
    }

    /// Insert a line before `index`; `index == len` appends.
    /// The focus ends just after the new line.
    pub fn insert(&mut self, index: usize, content: impl Into<Line>) -> Result<&mut Line> {
        if index > self.len() {
            return Err(self.out_of_range(index));
        }
        self.seek(index);
        self.before.push(content.into());
        let last = self.before.len() - 1;
        Ok(&mut self.before[last])
    }

    /// Remove and return the line at `index`. The focus ends at `index`.
    pub fn erase(&mut self, index: usize) -> Result<Line> {
        if index >= self.len() {
            return Err(self.out_of_range(index));
        }
        self.seek(index);
        self.after.pop().ok_or_else(|| self.out_of_range(index))
    }

    /// Append a line at the end
    pub fn append(&mut self, content: impl Into<Line>) -> &mut Line {
        let end = self.len();
        self.seek(end);
        self.before.push(content.into());
        let last = self.before.len() - 1;
        &mut self.before[last]
    }

    /// Remove every line
    pub fn clear(&mut self) {
        self.before.clear();
        self.after.clear();
    }

    /// Iterate over lines in document order
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Line> + '_ {
        self.before.iter().chain(self.after.iter().rev())
    }
}

impl FromIterator<Line> for LineSequence {
    fn from_iter<I: IntoIterator<Item = Line>>(iter: I) -> Self {
        Self {
            before: iter.into_iter().collect(),
            after: Vec::new(),
            moved: 0,
        }
    }
}

impl fmt::Debug for LineSequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LineSequence")
            .field("len", &self.len())
            .field("focus", &self.focus())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sequence(lines: &[&str]) -> LineSequence {
        lines.iter().map(|l| Line::new(*l)).collect()
    }

    fn contents(seq: &LineSequence) -> Vec<String> {
        seq.iter().map(|l| l.to_string()).collect()
    }

    #[test]
    fn test_insert_then_get() {
        let mut seq = sequence(&["a", "b", "c"]);
        for i in 0..=seq.len() {
            let before = seq.len();
            seq.insert(i, format!("x{}", i)).unwrap();
            assert_eq!(seq.len(), before + 1);
            assert_eq!(*seq.get(i).unwrap(), format!("x{}", i).as_str());
        }
    }

    #[test]
    fn test_erase_shifts_later_lines() {
        let original = ["a", "b", "c", "d", "e"];
        for i in 0..original.len() {
            let mut seq = sequence(&original);
            let removed = seq.erase(i).unwrap();
            assert_eq!(removed, original[i]);
            assert_eq!(seq.len(), original.len() - 1);
            for j in 0..seq.len() {
                let expected = if j < i { original[j] } else { original[j + 1] };
                assert_eq!(*seq.get(j).unwrap(), expected);
            }
        }
    }

    #[test]
    fn test_out_of_range() {
        let mut seq = sequence(&["a"]);
        assert!(matches!(seq.get(1), Err(EditorError::OutOfRange { index: 1, len: 1 })));
        assert!(matches!(seq.erase(1), Err(EditorError::OutOfRange { .. })));
        assert!(matches!(seq.insert(3, "z"), Err(EditorError::OutOfRange { index: 3, .. })));
        assert!(seq.insert(1, "b").is_ok());
        assert_eq!(contents(&seq), vec!["a", "b"]);
    }

    #[test]
    fn test_empty_sequence() {
        let mut seq = LineSequence::new();
        assert!(seq.is_empty());
        assert!(seq.get(0).is_err());
        assert!(seq.erase(0).is_err());
        seq.insert(0, "first").unwrap();
        assert_eq!(seq.len(), 1);
    }

    #[test]
    fn test_get_is_correct_far_from_focus() {
        let mut seq: LineSequence = (0..100).map(|i| Line::new(i.to_string())).collect();
        seq.erase(50).unwrap();
        assert_eq!(seq.focus(), 50);
        assert_eq!(*seq.get(0).unwrap(), "0");
        assert_eq!(*seq.get(49).unwrap(), "49");
        assert_eq!(*seq.get(50).unwrap(), "51");
        assert_eq!(*seq.get(98).unwrap(), "99");
        seq.get_mut(98).unwrap().push_str("!");
        assert_eq!(*seq.get(98).unwrap(), "99!");
    }

    #[test]
    fn test_typing_at_growing_index_stays_local() {
        let mut seq = LineSequence::new();
        seq.append("");
        let start = seq.relocation_cost();
        for i in 1..=1000 {
            seq.insert(i, format!("line {}", i)).unwrap();
        }
        assert_eq!(seq.len(), 1001);
        assert_eq!(seq.relocation_cost(), start);
    }

    #[test]
    fn test_cost_tracks_distance_from_focus() {
        let mut seq: LineSequence = (0..1000).map(|i| Line::new(i.to_string())).collect();
        seq.erase(500).unwrap();
        let after_jump = seq.relocation_cost();
        assert_eq!(after_jump, 500);

        // next to the focus: nothing to move
        seq.insert(500, "near").unwrap();
        assert_eq!(seq.relocation_cost(), after_jump);
        seq.erase(501).unwrap();
        assert_eq!(seq.relocation_cost(), after_jump);

        // far away: pay the distance once
        seq.insert(10, "far").unwrap();
        assert_eq!(seq.relocation_cost(), after_jump + 491);
    }

    #[test]
    fn test_append_after_seek() {
        let mut seq = sequence(&["a", "b", "c"]);
        seq.erase(0).unwrap();
        seq.append("d");
        assert_eq!(contents(&seq), vec!["b", "c", "d"]);
        assert_eq!(seq.focus(), 3);
    }
}
