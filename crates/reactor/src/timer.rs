//! Timers
//!
//! One-shot and repeating timers behind `setTimeout()`/`setInterval()`
//! style script calls. Each timer has a 32-bit id; ids count upwards
//! and only wrap around after the whole space is used, skipping any id
//! that is still live.
//!
//! The registry only keeps deadlines. The reactor asks for the next
//! deadline, sleeps until then and fires whatever is due.

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use chrono::Utc;
use tokio::time::Instant;
use tracing::{debug, warn};

use e_core::error::{EditorError, Result, ScriptError};
use e_core::events::CallbackId;

/// Timer identifier handed to scripts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u32);

impl TimerId {
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for TimerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What a live timer is doing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerStatus {
    /// Created, not started
    Idle,
    /// Waiting for its deadline
    Armed,
    /// Its callback is running
    Firing,
}

#[derive(Debug)]
struct Timer {
    callback: CallbackId,
    interval: Duration,
    repeat: bool,
    deadline: Option<Instant>,
    /// Arming order, breaks ties between equal deadlines
    armed_seq: u64,
    firing: bool,
}

/// Registry of live timers
#[derive(Debug)]
pub struct TimerRegistry {
    timers: HashMap<TimerId, Timer>,
    next_id: u32,
    next_seq: u64,
    released: Vec<CallbackId>,
}

impl Default for TimerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl TimerRegistry {
    pub fn new() -> Self {
        Self {
            timers: HashMap::new(),
            next_id: 1,
            next_seq: 0,
            released: Vec::new(),
        }
    }

    /// Number of live timers
    pub fn len(&self) -> usize {
        self.timers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }

    pub fn contains(&self, id: TimerId) -> bool {
        self.timers.contains_key(&id)
    }

    pub fn status(&self, id: TimerId) -> Option<TimerStatus> {
        self.timers.get(&id).map(|timer| {
            if timer.firing {
                TimerStatus::Firing
            } else if timer.deadline.is_some() {
                TimerStatus::Armed
            } else {
                TimerStatus::Idle
            }
        })
    }

    /// Create an unarmed timer that owns `callback`
    pub fn create(&mut self, callback: CallbackId) -> Result<TimerId> {
        if self.timers.len() >= u32::MAX as usize {
            self.released.push(callback);
            return Err(EditorError::TimerIdsExhausted);
        }

        loop {
            let id = TimerId(self.next_id);
            self.next_id = self.next_id.checked_add(1).unwrap_or(1);
            if self.timers.contains_key(&id) {
                continue;
            }
            self.timers.insert(
                id,
                Timer {
                    callback,
                    interval: Duration::ZERO,
                    repeat: false,
                    deadline: None,
                    armed_seq: 0,
                    firing: false,
                },
            );
            debug!(timer = id.raw(), "timer created");
            return Ok(id);
        }
    }

    fn arm(&mut self, id: TimerId, delay: Duration, repeat: bool) -> bool {
        let seq = self.next_seq;
        let Some(timer) = self.timers.get_mut(&id) else {
            return false;
        };
        timer.interval = delay;
        timer.repeat = repeat;
        timer.deadline = Some(Instant::now() + delay);
        timer.armed_seq = seq;
        self.next_seq += 1;
        true
    }

    /// Arm a timer `millis` from now, optionally repeating at that interval
    pub fn start_relative(&mut self, id: TimerId, millis: u32, repeat: bool) -> bool {
        self.arm(id, Duration::from_millis(u64::from(millis)), repeat)
    }

    /// Arm a timer for a wall-clock deadline in milliseconds since the
    /// Unix epoch. Absolute timers never repeat; past deadlines are due
    /// immediately.
    pub fn start_absolute(&mut self, id: TimerId, epoch_millis: u64) -> bool {
        let now = Utc::now().timestamp_millis();
        let target = i64::try_from(epoch_millis).unwrap_or(i64::MAX);
        let delay = u64::try_from(target.saturating_sub(now)).unwrap_or(0);
        self.arm(id, Duration::from_millis(delay), false)
    }

    /// Cancel and remove a timer. False if the id is unknown, e.g. a
    /// one-shot timer that already fired.
    pub fn cancel(&mut self, id: TimerId) -> bool {
        match self.timers.remove(&id) {
            Some(timer) => {
                self.released.push(timer.callback);
                debug!(timer = id.raw(), "timer cancelled");
                true
            }
            None => false,
        }
    }

    /// Cancel every timer, returning how many there were
    pub fn cancel_all(&mut self) -> usize {
        let count = self.timers.len();
        self.released
            .extend(self.timers.drain().map(|(_, timer)| timer.callback));
        count
    }

    /// Run a timer's callback through `invoke`.
    ///
    /// The callback gets the registry back so it can set and clear
    /// timers, including its own. Afterwards a one-shot timer is removed
    /// unless the callback re-armed it, and a repeating timer is armed
    /// for another interval unless the callback cancelled it. Returns
    /// false if the id is unknown or already firing.
    pub fn fire<F>(&mut self, id: TimerId, invoke: F) -> bool
    where
        F: FnOnce(&mut Self, CallbackId) -> std::result::Result<(), ScriptError>,
    {
        let Some(timer) = self.timers.get_mut(&id) else {
            debug!(timer = id.raw(), "fire on unknown timer");
            return false;
        };
        if timer.firing {
            warn!(timer = id.raw(), "timer fired from its own callback");
            return false;
        }
        timer.deadline = None;
        timer.firing = true;
        let callback = timer.callback;

        if let Err(err) = invoke(self, callback) {
            warn!(timer = id.raw(), error = %err, "timer callback failed");
        }

        let Some(timer) = self.timers.get_mut(&id) else {
            return true;
        };
        timer.firing = false;
        if timer.deadline.is_some() {
            return true;
        }

        if timer.repeat {
            let interval = timer.interval;
            self.arm(id, interval, true);
        } else if let Some(timer) = self.timers.remove(&id) {
            self.released.push(timer.callback);
        }
        true
    }

    /// Earliest armed deadline
    pub fn next_deadline(&self) -> Option<Instant> {
        self.timers.values().filter_map(|t| t.deadline).min()
    }

    /// Timers whose deadline has passed, earliest first
    pub fn due(&self, now: Instant) -> Vec<TimerId> {
        let mut due: Vec<(Instant, u64, TimerId)> = self
            .timers
            .iter()
            .filter_map(|(id, t)| t.deadline.filter(|d| *d <= now).map(|d| (d, t.armed_seq, *id)))
            .collect();
        due.sort_unstable();
        due.into_iter().map(|(_, _, id)| id).collect()
    }

    /// Whether a timer is still armed and due at `now`
    pub fn is_due(&self, id: TimerId, now: Instant) -> bool {
        self.timers
            .get(&id)
            .and_then(|t| t.deadline)
            .is_some_and(|d| d <= now)
    }

    /// Hand back callback references the registry no longer holds
    pub fn drain_released(&mut self) -> Vec<CallbackId> {
        std::mem::take(&mut self.released)
    }

    #[cfg(test)]
    fn with_next_id(next_id: u32) -> Self {
        Self {
            next_id,
            ..Self::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CB: CallbackId = CallbackId::new(7);

    #[tokio::test(start_paused = true)]
    async fn test_one_shot_fires_once() {
        let mut timers = TimerRegistry::new();
        let id = timers.create(CB).unwrap();
        assert_eq!(timers.status(id), Some(TimerStatus::Idle));
        assert!(timers.start_relative(id, 0, false));
        assert_eq!(timers.status(id), Some(TimerStatus::Armed));

        let mut calls = 0;
        assert!(timers.fire(id, |_, cb| {
            assert_eq!(cb, CB);
            calls += 1;
            Ok(())
        }));
        assert_eq!(calls, 1);

        assert!(!timers.contains(id));
        assert!(!timers.cancel(id));
        assert!(!timers.fire(id, |_, _| Ok(())));
        assert_eq!(timers.drain_released(), vec![CB]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_repeating_timer_stays_until_cancelled() {
        let mut timers = TimerRegistry::new();
        let id = timers.create(CB).unwrap();
        timers.start_relative(id, 10, true);

        let mut calls = 0;
        for _ in 0..5 {
            assert!(timers.fire(id, |_, _| {
                calls += 1;
                Ok(())
            }));
            assert_eq!(timers.status(id), Some(TimerStatus::Armed));
        }
        assert_eq!(calls, 5);
        assert!(timers.drain_released().is_empty());

        assert!(timers.cancel(id));
        assert!(!timers.contains(id));
        assert_eq!(timers.drain_released(), vec![CB]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_callback_failure_still_consumes_one_shot() {
        let mut timers = TimerRegistry::new();
        let id = timers.create(CB).unwrap();
        timers.start_relative(id, 5, false);

        assert!(timers.fire(id, |_, _| Err(ScriptError::new("thrown"))));
        assert!(!timers.contains(id));
    }

    #[tokio::test(start_paused = true)]
    async fn test_callback_can_cancel_itself() {
        let mut timers = TimerRegistry::new();
        let id = timers.create(CB).unwrap();
        timers.start_relative(id, 5, true);

        assert!(timers.fire(id, |timers, _| {
            assert_eq!(timers.status(id), Some(TimerStatus::Firing));
            assert!(timers.cancel(id));
            Ok(())
        }));
        assert!(!timers.contains(id));
        assert_eq!(timers.drain_released(), vec![CB]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_one_shot_rearmed_by_its_callback_survives() {
        let mut timers = TimerRegistry::new();
        let id = timers.create(CB).unwrap();
        timers.start_relative(id, 5, false);

        timers.fire(id, |timers, _| {
            timers.start_relative(id, 20, false);
            Ok(())
        });
        assert_eq!(timers.status(id), Some(TimerStatus::Armed));
    }

    #[tokio::test(start_paused = true)]
    async fn test_due_order_and_deadlines() {
        let mut timers = TimerRegistry::new();
        let slow = timers.create(CallbackId::new(1)).unwrap();
        let fast = timers.create(CallbackId::new(2)).unwrap();
        let idle = timers.create(CallbackId::new(3)).unwrap();
        timers.start_relative(slow, 30, false);
        timers.start_relative(fast, 10, false);

        let start = Instant::now();
        assert_eq!(timers.next_deadline(), Some(start + Duration::from_millis(10)));
        assert!(timers.due(start).is_empty());

        tokio::time::advance(Duration::from_millis(30)).await;
        assert_eq!(timers.due(Instant::now()), vec![fast, slow]);
        assert!(!timers.is_due(idle, Instant::now()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_absolute_timer_never_repeats() {
        let mut timers = TimerRegistry::new();
        let id = timers.create(CB).unwrap();
        let past = u64::try_from(Utc::now().timestamp_millis() - 1_000).unwrap();
        assert!(timers.start_absolute(id, past));
        assert!(timers.is_due(id, Instant::now()));

        timers.fire(id, |_, _| Ok(()));
        assert!(!timers.contains(id));
    }

    #[test]
    fn test_ids_wrap_and_skip_live_timers() {
        let mut timers = TimerRegistry::with_next_id(u32::MAX);
        let last = timers.create(CB).unwrap();
        assert_eq!(last.raw(), u32::MAX);
        let first = timers.create(CB).unwrap();
        assert_eq!(first.raw(), 1);

        let mut timers = TimerRegistry::with_next_id(1);
        let one = timers.create(CB).unwrap();
        timers.next_id = 1;
        let two = timers.create(CB).unwrap();
        assert_eq!(one.raw(), 1);
        assert_eq!(two.raw(), 2);
    }

    #[test]
    fn test_unknown_ids() {
        let mut timers = TimerRegistry::new();
        assert!(!timers.cancel(TimerId::new(42)));
        assert!(!timers.start_relative(TimerId::new(42), 1, false));
        assert!(!timers.start_absolute(TimerId::new(42), 0));
    }

    #[test]
    fn test_cancel_all() {
        let mut timers = TimerRegistry::new();
        for raw in 0..3 {
            let id = timers.create(CallbackId::new(raw)).unwrap();
            timers.start_relative(id, 100, true);
        }
        assert_eq!(timers.cancel_all(), 3);
        assert!(timers.is_empty());
        assert_eq!(timers.drain_released().len(), 3);
        assert_eq!(timers.cancel_all(), 0);
    }
}
