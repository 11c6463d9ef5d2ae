//! Native script host
//!
//! A scripting collaborator whose "script functions" are Rust closures.
//! It keeps them in an arena with reference counts, the way an embedded
//! interpreter keeps persistent handles: every registration with a timer
//! or listener holds one reference, and the runtime releases it when the
//! registration goes away.

use std::collections::HashMap;
use std::ops::{Deref, DerefMut};

use tracing::{debug, warn};

use e_core::error::ScriptError;
use e_core::events::{CallbackId, TargetId};
use e_editor::Buffer;
use e_reactor::{ScriptHost, ScriptScope, ScriptValue};

/// What a native callback can reach while it runs: the script API and,
/// when called on behalf of a session, that session's buffer
pub struct HostContext<'s, 'a> {
    scope: &'s mut ScriptScope<'a>,
    buffer: Option<&'s mut Buffer>,
}

impl<'s, 'a> HostContext<'s, 'a> {
    pub fn buffer(&mut self) -> Option<&mut Buffer> {
        self.buffer.as_deref_mut()
    }
}

impl<'a> Deref for HostContext<'_, 'a> {
    type Target = ScriptScope<'a>;

    fn deref(&self) -> &Self::Target {
        &*self.scope
    }
}

impl<'a> DerefMut for HostContext<'_, 'a> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut *self.scope
    }
}

/// Signature of a native callback
pub type NativeCallback = Box<
    dyn FnMut(&mut HostContext<'_, '_>, Option<TargetId>, &[ScriptValue]) -> Result<(), ScriptError>,
>;

struct Slot {
    /// `None` while the callback is running
    callback: Option<NativeCallback>,
    refs: usize,
}

/// Closure arena implementing [`ScriptHost`]
#[derive(Default)]
pub struct NativeHost {
    slots: HashMap<CallbackId, Slot>,
    next_id: u64,
}

impl std::fmt::Debug for NativeHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NativeHost")
            .field("live", &self.slots.len())
            .finish()
    }
}

impl NativeHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a callback; the caller holds the first reference
    pub fn register<F>(&mut self, callback: F) -> CallbackId
    where
        F: FnMut(&mut HostContext<'_, '_>, Option<TargetId>, &[ScriptValue]) -> Result<(), ScriptError>
            + 'static,
    {
        self.next_id += 1;
        let id = CallbackId::new(self.next_id);
        self.slots.insert(
            id,
            Slot {
                callback: Some(Box::new(callback)),
                refs: 1,
            },
        );
        id
    }

    /// Take another reference, e.g. to register the same callback twice
    pub fn retain(&mut self, id: CallbackId) -> Option<CallbackId> {
        let slot = self.slots.get_mut(&id)?;
        slot.refs += 1;
        Some(id)
    }

    /// Number of live callbacks
    pub fn live(&self) -> usize {
        self.slots.len()
    }

    pub fn ref_count(&self, id: CallbackId) -> usize {
        self.slots.get(&id).map_or(0, |slot| slot.refs)
    }

    /// Invoke a callback with a buffer lent for the duration of the call
    pub fn call_with_buffer(
        &mut self,
        scope: &mut ScriptScope<'_>,
        buffer: Option<&mut Buffer>,
        callback: CallbackId,
        target: Option<TargetId>,
        args: &[ScriptValue],
    ) -> Result<(), ScriptError> {
        let Some(slot) = self.slots.get_mut(&callback) else {
            return Err(ScriptError::new(format!("callback {} was released", callback.raw())));
        };
        let Some(mut f) = slot.callback.take() else {
            return Err(ScriptError::new(format!("callback {} is already running", callback.raw())));
        };

        let mut context = HostContext { scope, buffer };
        let result = f(&mut context, target, args);

        // the slot stays alive while a registration holds it
        if let Some(slot) = self.slots.get_mut(&callback) {
            slot.callback = Some(f);
        }
        result
    }
}

impl ScriptHost for NativeHost {
    fn call(
        &mut self,
        scope: &mut ScriptScope<'_>,
        callback: CallbackId,
        target: Option<TargetId>,
        args: &[ScriptValue],
    ) -> Result<(), ScriptError> {
        self.call_with_buffer(scope, None, callback, target, args)
    }

    fn release(&mut self, callback: CallbackId) {
        let Some(slot) = self.slots.get_mut(&callback) else {
            warn!(callback = callback.raw(), "release of unknown callback");
            return;
        };
        slot.refs -= 1;
        if slot.refs == 0 {
            self.slots.remove(&callback);
            debug!(callback = callback.raw(), "callback freed");
        }
    }
}
