//! e Editor
//! 
//! Document storage for the editor runtime:
//! - Focus-tracking line sequence for cheap edits near the cursor
//! - Buffers with identity, dirty tracking and load/serialize
//! - Session-owned cursor positions

pub mod line;
pub mod line_sequence;
pub mod buffer;
pub mod cursor;

pub use line::Line;
pub use line_sequence::LineSequence;
pub use buffer::{Buffer, LINE_SEPARATOR};
pub use cursor::{Cursor, Direction, Position};
