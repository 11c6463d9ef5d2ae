//! Script runtime
//!
//! The surface the scripting collaborator sees: values, the host trait
//! that executes callbacks, and the scope a running callback uses to
//! set timers and listeners.
//!
//! Callbacks never run concurrently. The runtime lends its registries
//! to exactly one callback at a time through a [`ScriptScope`], and
//! hands released callback references back to the host once that
//! callback has returned.

use tokio::time::Instant;
use tracing::{debug, warn};

use e_core::error::{Result, ScriptError};
use e_core::events::{CallbackId, EventDispatcher, Listener, Phase, TargetId};
use e_input::KeyCode;

use crate::timer::{TimerId, TimerRegistry};

/// A host value passed to script callbacks
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptValue {
    Undefined,
    Bool(bool),
    Number(f64),
    String(String),
    Key(KeyCode),
    Timer(TimerId),
}

impl From<KeyCode> for ScriptValue {
    fn from(key: KeyCode) -> Self {
        ScriptValue::Key(key)
    }
}

impl From<&str> for ScriptValue {
    fn from(text: &str) -> Self {
        ScriptValue::String(text.to_string())
    }
}

/// The scripting engine, as seen from the runtime
pub trait ScriptHost {
    /// Invoke a stored callback with `this` bound to `target`
    fn call(
        &mut self,
        scope: &mut ScriptScope<'_>,
        callback: CallbackId,
        target: Option<TargetId>,
        args: &[ScriptValue],
    ) -> std::result::Result<(), ScriptError>;

    /// Drop one reference to a callback
    fn release(&mut self, callback: CallbackId);
}

/// What the key handler wants the loop to do next
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyFlow {
    Continue,
    Quit,
}

/// The active key handler
pub trait KeyHandler {
    fn handle_key(&mut self, runtime: &mut Runtime, key: &KeyCode) -> KeyFlow;
}

/// Script-facing API available while a callback runs
#[derive(Debug)]
pub struct ScriptScope<'a> {
    timers: &'a mut TimerRegistry,
    events: &'a mut EventDispatcher,
    stop_requested: &'a mut bool,
}

impl ScriptScope<'_> {
    /// `setTimeout`/`setInterval`: the timer takes over `callback`
    pub fn set_timer(&mut self, callback: CallbackId, millis: u32, repeat: bool) -> Result<TimerId> {
        let id = self.timers.create(callback)?;
        self.timers.start_relative(id, millis, repeat);
        Ok(id)
    }

    /// Timer for a wall-clock deadline (epoch milliseconds); never repeats
    pub fn set_timer_at(&mut self, callback: CallbackId, epoch_millis: u64) -> Result<TimerId> {
        let id = self.timers.create(callback)?;
        self.timers.start_absolute(id, epoch_millis);
        Ok(id)
    }

    /// `clearTimeout`/`clearInterval`
    pub fn clear_timer(&mut self, id: TimerId) -> bool {
        self.timers.cancel(id)
    }

    pub fn add_event_listener(&mut self, event: &str, listener: Listener, use_capture: bool) -> bool {
        self.events.add(event, listener, Phase::from_use_capture(use_capture))
    }

    pub fn remove_event_listener(&mut self, event: &str, listener: Listener, use_capture: bool) -> bool {
        self.events.remove(event, listener, Phase::from_use_capture(use_capture))
    }

    /// Ask the reactor to stop after the current activity
    pub fn request_stop(&mut self) {
        *self.stop_requested = true;
    }

    pub fn timers(&self) -> &TimerRegistry {
        self.timers
    }

    pub fn events(&self) -> &EventDispatcher {
        self.events
    }
}

/// Timers and listeners owned by one reactor
#[derive(Debug, Default)]
pub struct Runtime {
    timers: TimerRegistry,
    events: EventDispatcher,
    stop_requested: bool,
}

impl Runtime {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn timers(&self) -> &TimerRegistry {
        &self.timers
    }

    pub fn events(&self) -> &EventDispatcher {
        &self.events
    }

    /// Borrow the script API outside of any callback
    pub fn scope(&mut self) -> ScriptScope<'_> {
        ScriptScope {
            timers: &mut self.timers,
            events: &mut self.events,
            stop_requested: &mut self.stop_requested,
        }
    }

    pub fn set_timer(&mut self, callback: CallbackId, millis: u32, repeat: bool) -> Result<TimerId> {
        self.scope().set_timer(callback, millis, repeat)
    }

    pub fn clear_timer(&mut self, id: TimerId) -> bool {
        self.timers.cancel(id)
    }

    pub fn add_event_listener(&mut self, event: &str, listener: Listener, use_capture: bool) -> bool {
        self.scope().add_event_listener(event, listener, use_capture)
    }

    pub fn remove_event_listener(&mut self, event: &str, listener: Listener, use_capture: bool) -> bool {
        self.scope().remove_event_listener(event, listener, use_capture)
    }

    /// Consume a pending stop request
    pub fn take_stop_request(&mut self) -> bool {
        std::mem::take(&mut self.stop_requested)
    }

    /// Fire one timer through the host
    pub fn fire_timer<H: ScriptHost + ?Sized>(&mut self, host: &mut H, id: TimerId) -> bool {
        let Runtime {
            timers,
            events,
            stop_requested,
        } = self;

        let fired = timers.fire(id, |timers, callback| {
            let mut scope = ScriptScope {
                timers,
                events,
                stop_requested,
            };
            host.call(&mut scope, callback, None, &[ScriptValue::Timer(id)])
        });

        self.release_pending(host);
        fired
    }

    /// Fire every timer due at `now`, earliest deadline first.
    ///
    /// The due set is fixed up front, so a zero-interval repeating timer
    /// fires once per pass rather than spinning.
    pub fn fire_due<H: ScriptHost + ?Sized>(&mut self, host: &mut H, now: Instant) -> usize {
        let mut fired = 0;
        for id in self.timers.due(now) {
            // an earlier callback may have cancelled or re-armed this one
            if self.timers.is_due(id, now) && self.fire_timer(host, id) {
                fired += 1;
            }
        }
        fired
    }

    /// Dispatch an event against `target`: capture listeners, then bubble.
    /// Failures are logged once the whole dispatch is done. Returns the
    /// number of listeners invoked.
    pub fn dispatch<H: ScriptHost + ?Sized>(
        &mut self,
        host: &mut H,
        event: &str,
        target: TargetId,
        args: &[ScriptValue],
    ) -> usize {
        let Runtime {
            timers,
            events,
            stop_requested,
        } = self;

        let report = events.dispatch(event, |events, listener| {
            let mut scope = ScriptScope {
                timers: &mut *timers,
                events,
                stop_requested: &mut *stop_requested,
            };
            host.call(&mut scope, listener.callback, Some(target), args)
        });

        for (listener, phase, err) in &report.failures {
            warn!(
                event,
                ?phase,
                callback = listener.callback.raw(),
                error = %err,
                "event listener failed"
            );
        }

        self.release_pending(host);
        report.invoked
    }

    /// Return released callback references to the host
    pub fn release_pending<H: ScriptHost + ?Sized>(&mut self, host: &mut H) {
        for callback in self
            .timers
            .drain_released()
            .into_iter()
            .chain(self.events.drain_released())
        {
            host.release(callback);
        }
    }

    /// Cancel every timer and drop every listener. Returns the number of
    /// timers cancelled.
    pub fn shutdown<H: ScriptHost + ?Sized>(&mut self, host: &mut H) -> usize {
        let cancelled = self.timers.cancel_all();
        let listeners = self.events.clear();
        self.release_pending(host);
        debug!(cancelled, listeners, "runtime shut down");
        cancelled
    }
}
