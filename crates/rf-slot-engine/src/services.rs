//! Collaborator interfaces — animation, rendering, persistence and observers
//!
//! The engine never owns presentation. It asks an [`AnimationService`] for a
//! [`Task`] and polls it through the event queue, pushes visible symbols to a
//! [`RenderService`], stores the ledger through [`Persistence`], and reports
//! every notable moment to [`SlotObserver`]s.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use rf_stage::RoundState;
use serde::{Deserialize, Serialize};

use crate::error::SlotResult;
use crate::event::{DelayTask, Task};
use crate::hit::HitInfo;
use crate::ledger::GameInfo;
use crate::line::LineToggle;
use crate::mode::ModeKind;
use crate::symbols::SymbolId;

// ═══════════════════════════════════════════════════════════════════════════════
// ANIMATION
// ═══════════════════════════════════════════════════════════════════════════════

/// What the engine wants presented
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AnimationRequest {
    /// Hit effect for a processed hit
    Hit { hit: HitInfo },
    /// Transition between modes at round start
    ModeTransition { previous: ModeKind, current: ModeKind },
}

/// Plays presentation and hands back a pollable task
pub trait AnimationService {
    fn play(&mut self, request: &AnimationRequest) -> Box<dyn Task>;
}

/// Nothing to play; every task is already complete
#[derive(Debug, Clone, Copy, Default)]
pub struct NoAnimation;

impl AnimationService for NoAnimation {
    fn play(&mut self, _request: &AnimationRequest) -> Box<dyn Task> {
        Box::new(DelayTask::new(0))
    }
}

/// Fixed-length animations, useful for headless hosts that still pace rounds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimedAnimation {
    pub hit_ticks: u32,
    pub mode_ticks: u32,
}

impl AnimationService for TimedAnimation {
    fn play(&mut self, request: &AnimationRequest) -> Box<dyn Task> {
        let ticks = match request {
            AnimationRequest::Hit { .. } => self.hit_ticks,
            AnimationRequest::ModeTransition { .. } => self.mode_ticks,
        };
        Box::new(DelayTask::new(ticks))
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// RENDERING
// ═══════════════════════════════════════════════════════════════════════════════

/// Receives visible symbol updates, best effort
pub trait RenderService {
    fn set_visible_symbol(&mut self, reel: usize, row: usize, symbol: SymbolId);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoRender;

impl RenderService for NoRender {
    fn set_visible_symbol(&mut self, _reel: usize, _row: usize, _symbol: SymbolId) {}
}

// ═══════════════════════════════════════════════════════════════════════════════
// PERSISTENCE
// ═══════════════════════════════════════════════════════════════════════════════

/// Integer key/value store
pub trait Persistence {
    fn get_int(&self, key: &str, default: i64) -> i64;

    fn set_int(&mut self, key: &str, value: i64);

    fn flush(&mut self) -> SlotResult<()>;
}

#[derive(Debug, Default)]
struct MemoryStore {
    values: HashMap<String, i64>,
    flushes: usize,
}

/// Shared in-memory store; clones see the same values
#[derive(Debug, Clone, Default)]
pub struct MemoryPersistence {
    inner: Arc<Mutex<MemoryStore>>,
}

impl MemoryPersistence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn flush_count(&self) -> usize {
        self.inner.lock().flushes
    }

    pub fn len(&self) -> usize {
        self.inner.lock().values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().values.is_empty()
    }
}

impl Persistence for MemoryPersistence {
    fn get_int(&self, key: &str, default: i64) -> i64 {
        self.inner.lock().values.get(key).copied().unwrap_or(default)
    }

    fn set_int(&mut self, key: &str, value: i64) {
        self.inner.lock().values.insert(key.to_string(), value);
    }

    fn flush(&mut self) -> SlotResult<()> {
        self.inner.lock().flushes += 1;
        Ok(())
    }
}

/// JSON file store, read on open and written on flush
#[derive(Debug, Clone)]
pub struct JsonFilePersistence {
    path: PathBuf,
    values: BTreeMap<String, i64>,
    dirty: bool,
}

impl JsonFilePersistence {
    /// Open a store; a missing file starts empty
    pub fn open(path: impl AsRef<Path>) -> SlotResult<Self> {
        let path = path.as_ref().to_path_buf();
        let values = if path.exists() {
            let json = std::fs::read_to_string(&path)?;
            serde_json::from_str(&json)?
        } else {
            BTreeMap::new()
        };
        Ok(Self {
            path,
            values,
            dirty: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Persistence for JsonFilePersistence {
    fn get_int(&self, key: &str, default: i64) -> i64 {
        self.values.get(key).copied().unwrap_or(default)
    }

    fn set_int(&mut self, key: &str, value: i64) {
        if self.values.insert(key.to_string(), value) != Some(value) {
            self.dirty = true;
        }
    }

    fn flush(&mut self) -> SlotResult<()> {
        if !self.dirty {
            return Ok(());
        }
        let json = serde_json::to_string_pretty(&self.values)?;
        std::fs::write(&self.path, json)?;
        self.dirty = false;
        log::debug!("Persisted {} values to {}", self.values.len(), self.path.display());
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// OBSERVERS
// ═══════════════════════════════════════════════════════════════════════════════

/// Synchronous round notifications; every method defaults to a no-op
#[allow(unused_variables)]
pub trait SlotObserver {
    /// Balance changed; `hit` is set when a hit paid it
    fn on_balance_changed(&mut self, delta: i64, hit: Option<&HitInfo>) {}

    fn on_round_start(&mut self, info: &GameInfo) {}

    fn on_round_complete(&mut self, info: &GameInfo) {}

    fn on_hit_processed(&mut self, hit: &HitInfo) {}

    fn on_mode_changed(&mut self, previous: ModeKind, current: ModeKind) {}

    fn on_line_toggled(&mut self, toggle: &LineToggle) {}

    fn on_reel_start(&mut self, reel: usize) {}

    /// Reel settled with these visible symbols
    fn on_reel_stop(&mut self, reel: usize, symbols: &[SymbolId]) {}

    fn on_new_symbol(&mut self, reel: usize, strip_index: usize, symbol: SymbolId) {}

    /// Every reel stopped, before hits are processed
    fn on_round_interval(&mut self) {}

    fn on_state_changed(&mut self, from: RoundState, to: RoundState) {}
}

/// One observed notification
#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    BalanceChanged { delta: i64, from_hit: bool },
    RoundStart,
    RoundComplete { rounds_completed: u64 },
    HitProcessed { line_index: Option<usize>, payout: u64 },
    ModeChanged { previous: ModeKind, current: ModeKind },
    LineToggled(LineToggle),
    ReelStart(usize),
    ReelStop(usize),
    RoundInterval,
    StateChanged { from: RoundState, to: RoundState },
}

/// Observer that records notifications into a shared list (new symbols are skipped)
#[derive(Debug, Clone, Default)]
pub struct RecordingObserver {
    log: Arc<Mutex<Vec<Notification>>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.log.lock().clone()
    }

    pub fn clear(&self) {
        self.log.lock().clear();
    }

    fn push(&self, notification: Notification) {
        self.log.lock().push(notification);
    }
}

impl SlotObserver for RecordingObserver {
    fn on_balance_changed(&mut self, delta: i64, hit: Option<&HitInfo>) {
        self.push(Notification::BalanceChanged {
            delta,
            from_hit: hit.is_some(),
        });
    }

    fn on_round_start(&mut self, _info: &GameInfo) {
        self.push(Notification::RoundStart);
    }

    fn on_round_complete(&mut self, info: &GameInfo) {
        self.push(Notification::RoundComplete {
            rounds_completed: info.rounds_completed,
        });
    }

    fn on_hit_processed(&mut self, hit: &HitInfo) {
        self.push(Notification::HitProcessed {
            line_index: hit.line_index(),
            payout: hit.payout,
        });
    }

    fn on_mode_changed(&mut self, previous: ModeKind, current: ModeKind) {
        self.push(Notification::ModeChanged { previous, current });
    }

    fn on_line_toggled(&mut self, toggle: &LineToggle) {
        self.push(Notification::LineToggled(*toggle));
    }

    fn on_reel_start(&mut self, reel: usize) {
        self.push(Notification::ReelStart(reel));
    }

    fn on_reel_stop(&mut self, reel: usize, _symbols: &[SymbolId]) {
        self.push(Notification::ReelStop(reel));
    }

    fn on_round_interval(&mut self) {
        self.push(Notification::RoundInterval);
    }

    fn on_state_changed(&mut self, from: RoundState, to: RoundState) {
        self.push(Notification::StateChanged { from, to });
    }
}

/// Collaborators handed to a slot
pub struct SlotServices {
    pub animation: Box<dyn AnimationService>,
    pub render: Box<dyn RenderService>,
    pub persistence: Option<Box<dyn Persistence>>,
    pub observers: Vec<Box<dyn SlotObserver>>,
}

impl SlotServices {
    pub fn with_animation(mut self, animation: impl AnimationService + 'static) -> Self {
        self.animation = Box::new(animation);
        self
    }

    pub fn with_render(mut self, render: impl RenderService + 'static) -> Self {
        self.render = Box::new(render);
        self
    }

    pub fn with_persistence(mut self, persistence: impl Persistence + 'static) -> Self {
        self.persistence = Some(Box::new(persistence));
        self
    }

    pub fn with_observer(mut self, observer: impl SlotObserver + 'static) -> Self {
        self.observers.push(Box::new(observer));
        self
    }

    /// Call every observer
    pub fn notify(&mut self, mut f: impl FnMut(&mut dyn SlotObserver)) {
        for observer in &mut self.observers {
            f(observer.as_mut());
        }
    }
}

impl Default for SlotServices {
    fn default() -> Self {
        Self {
            animation: Box::new(NoAnimation),
            render: Box::new(NoRender),
            persistence: None,
            observers: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_animation_is_complete() {
        let mut animation = NoAnimation;
        let task = animation.play(&AnimationRequest::ModeTransition {
            previous: ModeKind::Default,
            current: ModeKind::Bonus,
        });
        assert!(task.is_complete());
    }

    #[test]
    fn test_timed_animation() {
        let mut animation = TimedAnimation {
            hit_ticks: 2,
            mode_ticks: 0,
        };
        let mut task = animation.play(&AnimationRequest::Hit {
            hit: HitInfo::for_scatter(3),
        });
        assert!(!task.is_complete());
        task.tick();
        task.tick();
        assert!(task.is_complete());
    }

    #[test]
    fn test_memory_persistence_is_shared() {
        let store = MemoryPersistence::new();
        let mut handle = store.clone();
        handle.set_int("coins", 40);
        handle.flush().unwrap();

        assert_eq!(store.get_int("coins", 0), 40);
        assert_eq!(store.get_int("missing", -1), -1);
        assert_eq!(store.flush_count(), 1);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_json_file_persistence_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.json");

        let mut store = JsonFilePersistence::open(&path).unwrap();
        store.set_int("slot.balance", 1234);
        assert!(!path.exists());
        store.flush().unwrap();
        assert!(path.exists());

        let reopened = JsonFilePersistence::open(&path).unwrap();
        assert_eq!(reopened.get_int("slot.balance", 0), 1234);
        assert_eq!(reopened.get_int("slot.bet", 1), 1);
    }

    #[test]
    fn test_recording_observer_shares_log() {
        let recorder = RecordingObserver::new();
        let mut observer: Box<dyn SlotObserver> = Box::new(recorder.clone());
        observer.on_round_interval();
        observer.on_reel_start(2);
        observer.on_new_symbol(2, 5, 1);

        assert_eq!(
            recorder.notifications(),
            vec![Notification::RoundInterval, Notification::ReelStart(2)]
        );
    }
}
