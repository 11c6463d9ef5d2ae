//! e Core - shared types for the editor runtime
//! 
//! This crate provides the pieces every other crate leans on:
//! error handling, configuration, and the capture/bubble event
//! dispatcher used by the scripting layer.

pub mod config;
pub mod events;
pub mod error;

pub use config::AppConfig;
pub use events::{CallbackId, DispatchReport, EventDispatcher, Listener, Phase, TargetId};
pub use error::{EditorError, Result, ScriptError};

/// e version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = "e";
