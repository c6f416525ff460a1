//! Event queue — serializes timed and animated steps with game logic
//!
//! At most one event is active. While it runs, the slot only services it;
//! when it completes the next pending event activates in the same tick, and
//! state logic resumes only once the queue is empty.

use std::collections::VecDeque;
use std::fmt;

/// A unit of asynchronous work polled once per tick
pub trait Task {
    /// Advance by one tick
    fn tick(&mut self);

    fn is_complete(&self) -> bool;
}

/// Completes after a fixed number of ticks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DelayTask {
    remaining: u32,
}

impl DelayTask {
    pub fn new(ticks: u32) -> Self {
        Self { remaining: ticks }
    }
}

impl Task for DelayTask {
    fn tick(&mut self) {
        self.remaining = self.remaining.saturating_sub(1);
    }

    fn is_complete(&self) -> bool {
        self.remaining == 0
    }
}

/// Engine step scheduled by an event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotAction {
    /// Arm the next round
    StartRound,
    /// Start spinning one reel
    SpinReel(usize),
    /// Every started reel reached full speed
    EnterSpinning,
    /// Begin stopping all reels
    StopSpin,
    /// Notify observers of a processed hit (index into the round's hit records)
    AnnounceHit(usize),
}

/// A queued step: a task plus the actions run when it starts and completes
pub struct SlotEvent {
    label: &'static str,
    task: Box<dyn Task>,
    on_start: Vec<SlotAction>,
    on_complete: Vec<SlotAction>,
}

impl SlotEvent {
    pub fn new(label: &'static str, task: Box<dyn Task>) -> Self {
        Self {
            label,
            task,
            on_start: Vec::new(),
            on_complete: Vec::new(),
        }
    }

    /// Event that lasts `ticks` ticks after activation
    pub fn delay(label: &'static str, ticks: u32) -> Self {
        Self::new(label, Box::new(DelayTask::new(ticks)))
    }

    pub fn on_start(mut self, action: SlotAction) -> Self {
        self.on_start.push(action);
        self
    }

    pub fn on_complete(mut self, action: SlotAction) -> Self {
        self.on_complete.push(action);
        self
    }

    pub fn label(&self) -> &'static str {
        self.label
    }
}

impl fmt::Debug for SlotEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SlotEvent")
            .field("label", &self.label)
            .field("complete", &self.task.is_complete())
            .field("on_start", &self.on_start)
            .field("on_complete", &self.on_complete)
            .finish()
    }
}

/// Result of servicing the active event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActiveTick {
    /// Nothing active
    Empty,
    /// Active event still running
    Running,
    /// Active event completed; its completion actions
    Finished(Vec<SlotAction>),
}

/// FIFO event queue
#[derive(Debug, Default)]
pub struct EventQueue {
    active: Option<SlotEvent>,
    pending: VecDeque<SlotEvent>,
    activated: u64,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append to the tail
    pub fn push(&mut self, event: SlotEvent) {
        log::trace!("Queued event '{}'", event.label);
        self.pending.push_back(event);
    }

    /// Active or pending events exist
    pub fn is_locked(&self) -> bool {
        self.active.is_some() || !self.pending.is_empty()
    }

    pub fn active_label(&self) -> Option<&'static str> {
        self.active.as_ref().map(|e| e.label)
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Events activated since creation
    pub fn activated_count(&self) -> u64 {
        self.activated
    }

    /// Advance the active event by one tick
    pub fn tick_active(&mut self) -> ActiveTick {
        let Some(event) = self.active.as_mut() else {
            return ActiveTick::Empty;
        };

        event.task.tick();
        if !event.task.is_complete() {
            return ActiveTick::Running;
        }

        match self.active.take() {
            Some(event) => {
                log::trace!("Event '{}' complete", event.label);
                ActiveTick::Finished(event.on_complete)
            }
            None => ActiveTick::Empty,
        }
    }

    /// Dequeue and activate the next event, returning its start actions
    pub fn activate_next(&mut self) -> Option<Vec<SlotAction>> {
        if self.active.is_some() {
            return None;
        }
        let mut event = self.pending.pop_front()?;
        let actions = std::mem::take(&mut event.on_start);
        log::trace!("Event '{}' active", event.label);
        self.active = Some(event);
        self.activated += 1;
        Some(actions)
    }

    /// Drop the active and every pending event
    pub fn clear(&mut self) {
        self.active = None;
        self.pending.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Drive the queue like the slot does, logging start/complete markers
    fn drive(queue: &mut EventQueue, ticks: usize) -> Vec<(usize, &'static str, SlotAction)> {
        let mut log = Vec::new();
        for tick in 0..ticks {
            match queue.tick_active() {
                ActiveTick::Running => continue,
                ActiveTick::Finished(actions) => {
                    log.extend(actions.into_iter().map(|a| (tick, "complete", a)));
                }
                ActiveTick::Empty => {}
            }
            if let Some(actions) = queue.activate_next() {
                log.extend(actions.into_iter().map(|a| (tick, "start", a)));
            }
        }
        log
    }

    #[test]
    fn test_fifo_order() {
        let mut queue = EventQueue::new();
        for (i, ticks) in [3u32, 1, 2].into_iter().enumerate() {
            queue.push(
                SlotEvent::delay("step", ticks)
                    .on_start(SlotAction::SpinReel(i))
                    .on_complete(SlotAction::AnnounceHit(i)),
            );
        }

        let log = drive(&mut queue, 20);
        let markers: Vec<(&str, SlotAction)> = log.iter().map(|&(_, kind, a)| (kind, a)).collect();
        assert_eq!(
            markers,
            vec![
                ("start", SlotAction::SpinReel(0)),
                ("complete", SlotAction::AnnounceHit(0)),
                ("start", SlotAction::SpinReel(1)),
                ("complete", SlotAction::AnnounceHit(1)),
                ("start", SlotAction::SpinReel(2)),
                ("complete", SlotAction::AnnounceHit(2)),
            ]
        );

        // E1 starts at tick 0, completes 3 ticks later; E2 starts the same tick
        let ticks: Vec<usize> = log.iter().map(|&(t, _, _)| t).collect();
        assert_eq!(ticks, vec![0, 3, 3, 4, 4, 6]);
        assert!(!queue.is_locked());
    }

    #[test]
    fn test_lock_and_clear() {
        let mut queue = EventQueue::new();
        assert!(!queue.is_locked());

        queue.push(SlotEvent::delay("a", 5));
        queue.push(SlotEvent::delay("b", 5));
        assert!(queue.is_locked());
        assert_eq!(queue.pending_len(), 2);

        queue.activate_next();
        assert_eq!(queue.active_label(), Some("a"));
        assert!(queue.activate_next().is_none());

        queue.clear();
        assert!(!queue.is_locked());
        assert_eq!(queue.tick_active(), ActiveTick::Empty);
    }

    #[test]
    fn test_zero_delay_completes_on_first_service() {
        let mut queue = EventQueue::new();
        queue.push(SlotEvent::delay("instant", 0).on_complete(SlotAction::StopSpin));
        queue.activate_next();
        assert_eq!(queue.tick_active(), ActiveTick::Finished(vec![SlotAction::StopSpin]));
        assert_eq!(queue.activated_count(), 1);
    }
}
