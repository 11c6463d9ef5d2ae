//! Event Listeners
//!
//! DOM-style capture/bubble listener registry for script-visible events.
//! Each event name keeps two ordered lists; dispatch walks capture
//! first, then bubble, each in registration order.

use std::collections::HashMap;
use tracing::debug;

use crate::error::ScriptError;

/// Identity of a script callback, issued by the script host.
///
/// Two registrations of the same script function carry the same id.
/// Registering a callback transfers one host reference to the registry;
/// the registry hands it back through `drain_released` when it lets go.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CallbackId(u64);

impl CallbackId {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u64 {
        self.0
    }
}

/// Identity of the object an event is dispatched against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TargetId(u64);

impl TargetId {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u64 {
        self.0
    }
}

/// Dispatch phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Capture,
    Bubble,
}

impl Phase {
    pub fn from_use_capture(use_capture: bool) -> Self {
        if use_capture {
            Phase::Capture
        } else {
            Phase::Bubble
        }
    }
}

/// A registered target+callback pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Listener {
    pub target: TargetId,
    pub callback: CallbackId,
}

impl Listener {
    pub fn new(target: TargetId, callback: CallbackId) -> Self {
        Self { target, callback }
    }
}

#[derive(Debug, Default)]
struct PhaseLists {
    capture: Vec<Listener>,
    bubble: Vec<Listener>,
}

impl PhaseLists {
    fn list(&self, phase: Phase) -> &Vec<Listener> {
        match phase {
            Phase::Capture => &self.capture,
            Phase::Bubble => &self.bubble,
        }
    }

    fn list_mut(&mut self, phase: Phase) -> &mut Vec<Listener> {
        match phase {
            Phase::Capture => &mut self.capture,
            Phase::Bubble => &mut self.bubble,
        }
    }

    fn is_empty(&self) -> bool {
        self.capture.is_empty() && self.bubble.is_empty()
    }
}

/// Outcome of a single dispatch
#[derive(Debug, Default)]
pub struct DispatchReport {
    /// Listeners that were called
    pub invoked: usize,
    /// Listeners that failed, in call order
    pub failures: Vec<(Listener, Phase, ScriptError)>,
}

impl DispatchReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Capture/bubble listener registry
#[derive(Debug, Default)]
pub struct EventDispatcher {
    listeners: HashMap<String, PhaseLists>,
    released: Vec<CallbackId>,
}

impl EventDispatcher {
    /// Create an empty dispatcher
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener. Returns false if it was already registered,
    /// in which case the extra callback reference is released.
    pub fn add(&mut self, event: &str, listener: Listener, phase: Phase) -> bool {
        let list = self
            .listeners
            .entry(event.to_string())
            .or_default()
            .list_mut(phase);

        if list.contains(&listener) {
            self.released.push(listener.callback);
            return false;
        }

        list.push(listener);
        debug!(event, ?phase, callback = listener.callback.raw(), "listener added");
        true
    }

    /// Unregister a listener. Returns false if it was not registered.
    pub fn remove(&mut self, event: &str, listener: Listener, phase: Phase) -> bool {
        let Some(lists) = self.listeners.get_mut(event) else {
            return false;
        };

        let list = lists.list_mut(phase);
        let Some(index) = list.iter().position(|l| *l == listener) else {
            return false;
        };

        let removed = list.remove(index);
        self.released.push(removed.callback);
        if lists.is_empty() {
            self.listeners.remove(event);
        }
        debug!(event, ?phase, callback = listener.callback.raw(), "listener removed");
        true
    }

    /// Check whether a listener is registered
    pub fn contains(&self, event: &str, listener: Listener, phase: Phase) -> bool {
        self.listeners
            .get(event)
            .is_some_and(|lists| lists.list(phase).contains(&listener))
    }

    /// Number of registrations for an event across both phases
    pub fn listener_count(&self, event: &str) -> usize {
        self.listeners
            .get(event)
            .map_or(0, |lists| lists.capture.len() + lists.bubble.len())
    }

    /// Invoke every listener for `event`: capture phase, then bubble phase.
    ///
    /// The lists are snapshotted up front, so listeners added while the
    /// dispatch runs wait for the next one. A listener removed before its
    /// turn is skipped. Failures never stop the walk; they are collected
    /// into the report.
    pub fn dispatch<F>(&mut self, event: &str, mut invoke: F) -> DispatchReport
    where
        F: FnMut(&mut Self, &Listener) -> Result<(), ScriptError>,
    {
        let mut report = DispatchReport::default();
        let Some(lists) = self.listeners.get(event) else {
            return report;
        };

        let snapshot: Vec<(Phase, Listener)> = lists
            .capture
            .iter()
            .map(|l| (Phase::Capture, *l))
            .chain(lists.bubble.iter().map(|l| (Phase::Bubble, *l)))
            .collect();

        for (phase, listener) in snapshot {
            if !self.contains(event, listener, phase) {
                continue;
            }
            report.invoked += 1;
            if let Err(err) = invoke(self, &listener) {
                report.failures.push((listener, phase, err));
            }
        }

        report
    }

    /// Hand back callback references the dispatcher no longer holds
    pub fn drain_released(&mut self) -> Vec<CallbackId> {
        std::mem::take(&mut self.released)
    }

    /// Drop every registration, releasing all held references
    pub fn clear(&mut self) -> usize {
        let mut count = 0;
        for (_, lists) in self.listeners.drain() {
            for listener in lists.capture.into_iter().chain(lists.bubble) {
                self.released.push(listener.callback);
                count += 1;
            }
        }
        count
    }
}
