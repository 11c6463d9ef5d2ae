//! e - a script-extensible terminal text editor
//! 
//! The runtime core of the editor: document storage and the
//! single-threaded reactor that drives it.
//! 
//! ## Architecture
//! 
//! - `e-core`: errors, configuration, capture/bubble event listeners
//! - `e-editor`: lines, the focus-tracking line sequence, buffers, cursors
//! - `e-input`: key codes and the escape-sequence decoder
//! - `e-reactor`: timers, the script runtime and the input/timer loop
//! 
//! This crate adds a native script host and the editing session that
//! acts as the reactor's key handler.

#![warn(clippy::all)]

pub mod host;
pub mod session;

pub use e_core as core;
pub use e_editor as editor;
pub use e_input as input;
pub use e_reactor as reactor;

pub use host::{HostContext, NativeHost};
pub use session::Session;

/// Prelude module for convenient imports
pub mod prelude {
    pub use e_core::{AppConfig, CallbackId, EditorError, Listener, TargetId};
    pub use e_editor::{Buffer, Cursor, Line, LineSequence, Position};
    pub use e_input::{KeyCode, KeyDecoder, NamedKey};
    pub use e_reactor::{Reactor, Runtime, ScriptHost, ScriptScope, ScriptValue, StopReason, TimerId};

    pub use crate::host::{HostContext, NativeHost};
    pub use crate::session::Session;
}
