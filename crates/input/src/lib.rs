//! e Input
//! 
//! Turns raw terminal bytes into classified key events. Nothing here
//! touches a terminal, so the decoder is tested with plain byte slices.

pub mod keycode;
pub mod decoder;

pub use keycode::{KeyCode, NamedKey};
pub use decoder::{DecoderState, KeyDecoder};
