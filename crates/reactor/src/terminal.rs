//! Raw-mode terminal guard.
//!
//! Raw mode is entered on construction and left again on drop, and a
//! panic hook restores the terminal before the default hook prints, so
//! fatal paths never leave the user's shell in raw mode.

use std::sync::Once;

use crossterm::terminal;
use tracing::{debug, error};

use e_core::error::{EditorError, Result};

static PANIC_HOOK: Once = Once::new();

/// Holds the terminal in raw mode for its lifetime
#[derive(Debug)]
pub struct RawTerminal {
    _private: (),
}

impl RawTerminal {
    /// Switch the controlling terminal to raw mode
    pub fn enter() -> Result<Self> {
        install_panic_hook();
        terminal::enable_raw_mode().map_err(|e| EditorError::Terminal(e.to_string()))?;
        debug!("terminal in raw mode");
        Ok(Self { _private: () })
    }
}

impl Drop for RawTerminal {
    fn drop(&mut self) {
        match terminal::disable_raw_mode() {
            Ok(()) => debug!("terminal restored"),
            Err(e) => error!("Failed to restore terminal: {}", e),
        }
    }
}

fn install_panic_hook() {
    PANIC_HOOK.call_once(|| {
        let previous = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            let _ = terminal::disable_raw_mode();
            previous(info);
        }));
    });
}
