//! e Reactor
//! 
//! The single control loop of the editor. It waits for terminal input
//! or the next timer deadline, decodes keys, hands them to the active
//! key handler and fires due timers, one activity at a time.

pub mod timer;
pub mod runtime;
pub mod reactor;
pub mod terminal;

pub use timer::{TimerId, TimerRegistry};
pub use runtime::{KeyFlow, KeyHandler, Runtime, ScriptHost, ScriptScope, ScriptValue};
pub use reactor::{Reactor, StopReason};
pub use terminal::RawTerminal;
