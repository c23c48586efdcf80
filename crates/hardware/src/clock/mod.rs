//! Virtual clock and alarm scheduler.
//!
//! This module provides the discrete-event time base every timed component derives from.
//! It provides:
//! 1. **Time:** A monotonically increasing nanosecond counter advanced only by the driver.
//! 2. **Alarms:** One-shot deadlines identified by [`AlarmHandle`], kept in deadline order.
//! 3. **Dispatch:** [`VirtualClock::advance`] fires due alarms through a caller-supplied
//!    dispatcher, moving the clock to each alarm's exact deadline first.
//!
//! Alarms carry no closure. The owner of an alarm (a peripheral) is found by the bus from
//! the handle, which keeps the clock free of borrows into the peripherals it drives.

/// 32-bit hardware counter and periodic match alarms.
pub mod timer32;

pub use timer32::{AlarmToken, Timer32, TimerMode};

use std::collections::BTreeSet;

/// Identifies an alarm created on a [`VirtualClock`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AlarmHandle(usize);

impl AlarmHandle {
    /// Raw slot index of the alarm.
    pub const fn index(self) -> usize {
        self.0
    }
}

#[derive(Clone, Copy, Debug, Default)]
struct AlarmSlot {
    deadline: u64,
    seq: u64,
    scheduled: bool,
}

/// Nanosecond virtual clock with a deadline-ordered alarm queue.
///
/// Alarms with identical deadlines fire in the order they were scheduled.
#[derive(Debug, Default)]
pub struct VirtualClock {
    nanos: u64,
    slots: Vec<AlarmSlot>,
    queue: BTreeSet<(u64, u64, AlarmHandle)>,
    next_seq: u64,
}

impl VirtualClock {
    /// Creates a clock at time zero with no alarms.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current time in nanoseconds.
    #[inline(always)]
    pub const fn now(&self) -> u64 {
        self.nanos
    }

    /// Allocates a new, unscheduled alarm.
    pub fn create_alarm(&mut self) -> AlarmHandle {
        self.slots.push(AlarmSlot::default());
        AlarmHandle(self.slots.len() - 1)
    }

    /// Schedules `handle` to fire `delta_nanos` from now.
    ///
    /// Any pending deadline for the same alarm is cancelled first.
    pub fn schedule(&mut self, handle: AlarmHandle, delta_nanos: u64) {
        self.cancel(handle);
        let deadline = self.nanos.saturating_add(delta_nanos);
        let seq = self.next_seq;
        self.next_seq += 1;
        if let Some(slot) = self.slots.get_mut(handle.0) {
            *slot = AlarmSlot { deadline, seq, scheduled: true };
            let _ = self.queue.insert((deadline, seq, handle));
        }
    }

    /// Cancels a pending alarm. Cancelling an idle alarm is a no-op.
    pub fn cancel(&mut self, handle: AlarmHandle) {
        if let Some(slot) = self.slots.get_mut(handle.0)
            && slot.scheduled
        {
            slot.scheduled = false;
            let _ = self.queue.remove(&(slot.deadline, slot.seq, handle));
        }
    }

    /// Whether the alarm is currently scheduled.
    pub fn is_scheduled(&self, handle: AlarmHandle) -> bool {
        self.slots.get(handle.0).is_some_and(|s| s.scheduled)
    }

    /// Absolute deadline of a scheduled alarm.
    pub fn deadline(&self, handle: AlarmHandle) -> Option<u64> {
        self.slots.get(handle.0).filter(|s| s.scheduled).map(|s| s.deadline)
    }

    /// Nanoseconds until the earliest pending alarm, or 0 if none is pending.
    pub fn time_to_next_alarm(&self) -> u64 {
        self.queue
            .first()
            .map_or(0, |&(deadline, _, _)| deadline.saturating_sub(self.nanos))
    }

    /// Whether any alarm is pending.
    pub fn has_pending(&self) -> bool {
        !self.queue.is_empty()
    }

    /// Moves time forward by `delta_nanos`, firing every alarm due on the way.
    ///
    /// Alarms fire in ascending deadline order. Before each dispatch the clock is set to
    /// that alarm's deadline. The head of the queue is re-read after every dispatch, so
    /// the dispatcher may schedule or cancel any alarm, including the one firing.
    ///
    /// # Arguments
    ///
    /// * `delta_nanos` - Amount of virtual time to advance.
    /// * `dispatch` - Invoked once per fired alarm with the clock and the alarm handle.
    pub fn advance<F>(&mut self, delta_nanos: u64, mut dispatch: F)
    where
        F: FnMut(&mut Self, AlarmHandle),
    {
        let target = self.nanos.saturating_add(delta_nanos);
        while let Some(&(deadline, seq, handle)) = self.queue.first() {
            if deadline > target {
                break;
            }
            let _ = self.queue.remove(&(deadline, seq, handle));
            if let Some(slot) = self.slots.get_mut(handle.0) {
                slot.scheduled = false;
            }
            self.nanos = deadline;
            tracing::trace!(target: "clock", nanos = deadline, alarm = handle.0, "alarm fired");
            dispatch(self, handle);
        }
        self.nanos = target;
    }

    /// Cancels every pending alarm. The current time is kept.
    pub fn cancel_all(&mut self) {
        for slot in &mut self.slots {
            slot.scheduled = false;
        }
        self.queue.clear();
    }
}
