//! Slot — the tick-driven round state machine
//!
//! `NotStarted → Idle → SpinStarting → Spinning → SpinStopping → Result →
//! NotStarted`. Each [`Slot::tick`] advances the reels and the stop routine,
//! then services the event queue; state logic only runs once the queue is
//! empty. Every notification goes to the observers and into the stage trace.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use rf_stage::{RoundState, Stage, StageEvent, StageTrace};

use crate::config::{ModeConfig, ModeSet, SlotConfig, SlotDefinition, SpinMode};
use crate::error::SlotResult;
use crate::event::{ActiveTick, EventQueue, SlotAction, SlotEvent};
use crate::generator::generate_strips;
use crate::hit::{EvalContext, HitInfo, RoundHits, SymbolGrid};
use crate::ledger::{GameInfo, round_cost};
use crate::line::{LineSet, LineToggle};
use crate::mode::{ModeKind, ModeManager};
use crate::reel::{Manipulation, Reel};
use crate::services::{AnimationRequest, SlotServices};
use crate::symbols::{PayType, SymbolId, SymbolSet};
use crate::timing::SpinTiming;

/// Progress of the one-reel-at-a-time stop routine
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct StopRoutine {
    /// Ticks left before the next reel is stopped
    wait: u32,
    /// Reel whose manipulation search must finish first
    waiting_on: Option<usize>,
}

/// A slot machine
pub struct Slot {
    name: String,
    config: SlotConfig,
    mode_configs: ModeSet,
    symbols: SymbolSet,
    lines: LineSet,
    reels: Vec<Reel>,
    modes: ModeManager,
    info: GameInfo,
    state: RoundState,
    queue: EventQueue,
    /// Hit records of the current round
    hits: RoundHits,
    /// Visible grid captured when every reel stopped
    round_grid: Option<SymbolGrid>,
    stop_routine: Option<StopRoutine>,
    /// Next reel to stop (and, in manual-start-one mode, to start)
    current_reel: usize,
    rng: ChaCha8Rng,
    services: SlotServices,
    trace: StageTrace,
    tick: u64,
    initialized: bool,
}

impl std::fmt::Debug for Slot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Slot")
            .field("name", &self.name)
            .field("state", &self.state)
            .field("mode", &self.modes.current())
            .field("tick", &self.tick)
            .field("info", &self.info)
            .field("queue", &self.queue)
            .finish()
    }
}

impl Slot {
    /// Build a slot from a validated definition.
    ///
    /// Strips come from the definition or are generated with the slot's RNG.
    pub fn new(definition: &SlotDefinition, services: SlotServices, seed: Option<u64>) -> SlotResult<Self> {
        definition.validate()?;

        let mut rng = match seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_rng(&mut rand::rng()),
        };

        let config = definition.config.clone();
        let symbols = definition.symbol_set()?;
        let lines = definition.line_set()?;
        let strips = match definition.strip_ids(&symbols)? {
            Some(strips) => strips,
            None => generate_strips(&symbols, config.reel_count, config.symbols_per_reel, &mut rng),
        };
        let swaps = definition.modes.resolve_swaps(&symbols)?;

        let layout = config.layout();
        let motion = definition.modes.default.motion();
        let reels = strips
            .iter()
            .enumerate()
            .map(|(index, strip)| {
                let mut reel = Reel::new(index, strip.clone(), layout, config.reel, &mut rng)?;
                reel.set_motion(motion);
                Ok(reel)
            })
            .collect::<SlotResult<Vec<_>>>()?;

        let hits = RoundHits::new(&lines, &symbols);
        let info = GameInfo::new(config.initial_balance, config.bet);
        let trace = StageTrace::new(format!("{}-session", definition.name), definition.name.clone())
            .with_max_events(config.trace_capacity);

        log::info!(
            "Slot '{}' built: {} reels × {} rows, {} symbols, {} lines",
            definition.name,
            reels.len(),
            config.rows,
            symbols.len(),
            lines.len()
        );

        Ok(Self {
            name: definition.name.clone(),
            config,
            mode_configs: definition.modes.clone(),
            symbols,
            lines,
            reels,
            modes: ModeManager::new(strips, swaps),
            info,
            state: RoundState::NotStarted,
            queue: EventQueue::new(),
            hits,
            round_grid: None,
            stop_routine: None,
            current_reel: 0,
            rng,
            services,
            trace,
            tick: 0,
            initialized: false,
        })
    }

    // ═══════════════════════════════════════════════════════════════════════
    // ACCESSORS
    // ═══════════════════════════════════════════════════════════════════════

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &SlotConfig {
        &self.config
    }

    pub fn state(&self) -> RoundState {
        self.state
    }

    pub fn info(&self) -> &GameInfo {
        &self.info
    }

    pub fn mode(&self) -> ModeKind {
        self.modes.current()
    }

    /// Configuration of the current mode
    pub fn mode_config(&self) -> &ModeConfig {
        self.mode_configs.get(self.modes.current())
    }

    pub fn symbols(&self) -> &SymbolSet {
        &self.symbols
    }

    pub fn lines(&self) -> &LineSet {
        &self.lines
    }

    pub fn reels(&self) -> &[Reel] {
        &self.reels
    }

    /// Hit records of the current round
    pub fn hits(&self) -> &RoundHits {
        &self.hits
    }

    /// Visible symbols right now
    pub fn grid(&self) -> SymbolGrid {
        SymbolGrid::from_reels(&self.reels)
    }

    pub fn trace(&self) -> &StageTrace {
        &self.trace
    }

    /// Hand the recorded trace over and start a fresh one
    pub fn take_trace(&mut self) -> StageTrace {
        let fresh = StageTrace::new(self.trace.trace_id.clone(), self.name.clone())
            .with_max_events(self.config.trace_capacity);
        std::mem::replace(&mut self.trace, fresh)
    }

    pub fn current_tick(&self) -> u64 {
        self.tick
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Active or pending events exist
    pub fn is_locked(&self) -> bool {
        self.queue.is_locked()
    }

    /// Idle and nothing queued
    pub fn is_idle(&self) -> bool {
        !self.is_locked() && self.state == RoundState::Idle
    }

    pub fn services_mut(&mut self) -> &mut SlotServices {
        &mut self.services
    }

    fn timing(&self) -> SpinTiming {
        self.mode_config().effective_timing(self.config.debug.fast_spin)
    }

    // ═══════════════════════════════════════════════════════════════════════
    // LIFECYCLE
    // ═══════════════════════════════════════════════════════════════════════

    /// One-time setup: restores the ledger when a persistence key is configured
    pub fn initialize(&mut self) {
        if self.initialized {
            return;
        }
        self.initialized = true;

        if let (Some(prefix), Some(persistence)) =
            (self.config.persist_key.as_deref(), self.services.persistence.as_deref())
        {
            self.info.load(persistence, prefix);
            log::info!("Restored ledger '{}': balance {}", prefix, self.info.balance);
        }
    }

    /// Initialize and, with auto start, queue the first round
    pub fn activate(&mut self) {
        self.initialize();
        if self.state == RoundState::NotStarted && self.config.auto_start_round {
            self.queue
                .push(SlotEvent::delay("start round", 0).on_start(SlotAction::StartRound));
        }
    }

    /// Advance one tick
    pub fn tick(&mut self) {
        if !self.initialized {
            return;
        }
        self.tick += 1;

        self.tick_reels();
        self.tick_stop_routine();

        match self.queue.tick_active() {
            ActiveTick::Running => return,
            ActiveTick::Finished(actions) => self.apply_actions(actions),
            ActiveTick::Empty => {}
        }
        if let Some(actions) = self.queue.activate_next() {
            self.apply_actions(actions);
            return;
        }

        self.update_state();
    }

    /// Tick until `done` holds or `max_ticks` elapse; returns whether it held
    pub fn run_until(&mut self, max_ticks: u64, mut done: impl FnMut(&Slot) -> bool) -> bool {
        for _ in 0..max_ticks {
            if done(self) {
                return true;
            }
            self.tick();
        }
        done(self)
    }

    /// Cancel the round: clear the queue, the stop routine and manipulation,
    /// halt every reel and return to `NotStarted`
    pub fn reset(&mut self) {
        self.queue.clear();
        self.stop_routine = None;
        self.current_reel = 0;
        for reel in &mut self.reels {
            reel.clear_manipulation();
            reel.halt();
        }
        self.hits = RoundHits::new(&self.lines, &self.symbols);
        self.round_grid = None;
        self.switch_state(RoundState::NotStarted);
        log::info!("Slot '{}' reset", self.name);
    }

    fn update_state(&mut self) {
        match self.state {
            RoundState::Idle => {
                if self.mode_config().force_play {
                    self.start_spin(None);
                }
            }
            RoundState::SpinStopping => {
                if !self.reels.iter().any(|r| r.is_spinning()) {
                    self.round_interval();
                }
            }
            RoundState::Result => self.process_result(),
            RoundState::NotStarted | RoundState::SpinStarting | RoundState::Spinning => {}
        }
    }

    fn apply_actions(&mut self, actions: Vec<SlotAction>) {
        for action in actions {
            match action {
                SlotAction::StartRound => {
                    self.start_round();
                }
                SlotAction::SpinReel(index) => self.spin_reel(index),
                SlotAction::EnterSpinning => {
                    if self.state == RoundState::SpinStarting {
                        self.switch_state(RoundState::Spinning);
                    }
                }
                SlotAction::StopSpin => {
                    self.stop_spin();
                }
                SlotAction::AnnounceHit(index) => self.announce_hit(index),
            }
        }
    }

    fn switch_state(&mut self, to: RoundState) {
        let from = self.state;
        if from == to {
            return;
        }
        self.state = to;
        log::debug!("State {} -> {}", from.name(), to.name());
        self.services.notify(|o| o.on_state_changed(from, to));
        self.record(Stage::StateChanged { from, to });
    }

    fn record(&mut self, stage: Stage) {
        let event = StageEvent::new(stage, self.tick).with_mode(self.modes.current().name());
        self.trace.push(event);
    }

    // ═══════════════════════════════════════════════════════════════════════
    // ROUND
    // ═══════════════════════════════════════════════════════════════════════

    /// Arm a round: reset counters, resolve the mode, reset hit records
    pub fn start_round(&mut self) -> bool {
        if self.state != RoundState::NotStarted {
            return false;
        }

        self.info.start_round();
        self.switch_state(RoundState::Idle);
        self.switch_mode();
        self.hits = RoundHits::new(&self.lines, &self.symbols);
        self.round_grid = None;

        log::info!("Round {} started in {} mode", self.info.rounds_completed + 1, self.mode().name());
        self.services.notify(|o| o.on_round_start(&self.info));
        self.record(Stage::RoundStart {
            round: self.info.rounds_completed,
        });

        if self.mode_config().force_play {
            self.play();
        }
        true
    }

    /// Resolve the mode against the credits; only in `Idle`
    pub fn switch_mode(&mut self) -> bool {
        if self.state != RoundState::Idle {
            return false;
        }
        let Some(change) = self.modes.switch(self.info.free_spins, self.info.bonuses) else {
            return false;
        };

        let strips = self.modes.strips_for(change.current);
        let motion = self.mode_configs.get(change.current).motion();
        for (reel, strip) in self.reels.iter_mut().zip(strips) {
            if let Err(err) = reel.replace_strip(strip) {
                log::warn!("Mode strip not applied: {}", err);
            }
            reel.set_motion(motion);
        }

        self.services
            .notify(|o| o.on_mode_changed(change.previous, change.current));
        self.record(Stage::ModeChanged {
            from: change.previous.name().to_string(),
            to: change.current.name().to_string(),
        });

        let task = self.services.animation.play(&AnimationRequest::ModeTransition {
            previous: change.previous,
            current: change.current,
        });
        self.queue.push(SlotEvent::new("mode transition", task));
        true
    }

    /// Player input: start in `Idle`, stop according to the spin mode in `Spinning`
    pub fn play(&mut self) -> bool {
        if self.is_locked() {
            return false;
        }
        match self.state {
            RoundState::Idle => self.start_spin(None),
            RoundState::Spinning => {
                let spin_mode = self.mode_config().spin_mode;
                match spin_mode {
                    SpinMode::AutoStop => false,
                    SpinMode::ManualStopAll => self.stop_spin(),
                    SpinMode::ManualStopOne => self.stop_reel(),
                    SpinMode::ManualStartOne => {
                        let stopped = self.stop_reel();
                        self.start_reel();
                        stopped
                    }
                }
            }
            _ => false,
        }
    }

    /// Start a spin from `Idle`.
    ///
    /// `duration` overrides the auto-stop timer; `None` uses the mode's
    /// (`auto_stop_ticks + 1` in auto-stop mode, no timer otherwise).
    pub fn start_spin(&mut self, duration: Option<u32>) -> bool {
        if self.state != RoundState::Idle {
            return false;
        }
        self.switch_state(RoundState::SpinStarting);

        let timing = self.timing();
        let spin_mode = self.mode_config().spin_mode;
        let duration = duration.unwrap_or(match spin_mode {
            SpinMode::AutoStop => timing.auto_stop_ticks + 1,
            _ => 0,
        });

        if self.config.debug.always_max_lines {
            let toggles = self.lines.switch_all_lines(true, true);
            for toggle in &toggles {
                self.announce_line(toggle);
            }
        }

        self.current_reel = 0;
        self.stop_routine = None;

        if spin_mode == SpinMode::ManualStartOne {
            self.start_reel();
        } else {
            for index in 0..self.reels.len() {
                self.queue.push(
                    SlotEvent::delay("reel start", timing.spin_start_delay_ticks)
                        .on_start(SlotAction::SpinReel(index)),
                );
            }
            self.queue.push(
                SlotEvent::delay("accelerate", timing.accelerate_ticks).on_complete(SlotAction::EnterSpinning),
            );
        }

        let cost = round_cost(self.mode_config().cost_per_line, self.info.bet, self.lines.enabled_count());
        let delta = self.info.start_spin(cost);
        self.announce_balance(delta, None);

        if duration > 0 {
            self.queue
                .push(SlotEvent::delay("auto stop", duration).on_complete(SlotAction::StopSpin));
        }

        log::debug!("Spin started ({:?}, cost {})", spin_mode, cost);
        true
    }

    /// Queue the start of the next unstarted reel (manual-start-one);
    /// only while a spin is starting or running
    pub fn start_reel(&mut self) -> bool {
        if !matches!(self.state, RoundState::SpinStarting | RoundState::Spinning) {
            return false;
        }
        if self.current_reel >= self.reels.len() {
            return false;
        }
        let timing = self.timing();
        self.queue.push(
            SlotEvent::delay("reel start", timing.spin_start_delay_ticks)
                .on_start(SlotAction::SpinReel(self.current_reel)),
        );
        self.queue.push(
            SlotEvent::delay("accelerate", timing.accelerate_ticks).on_complete(SlotAction::EnterSpinning),
        );
        true
    }

    /// Stop the next reel while `Spinning`
    pub fn stop_reel(&mut self) -> bool {
        if self.state != RoundState::Spinning {
            return false;
        }
        self.stop_next_reel()
    }

    /// Stopping the last reel enters `SpinStopping`
    fn stop_next_reel(&mut self) -> bool {
        let Some(reel) = self.reels.get_mut(self.current_reel) else {
            return false;
        };
        reel.stop();
        self.current_reel += 1;
        if self.current_reel >= self.reels.len() {
            self.switch_state(RoundState::SpinStopping);
        }
        true
    }

    /// Stop every remaining reel one by one
    pub fn stop_spin(&mut self) -> bool {
        if self.state != RoundState::Spinning {
            return false;
        }
        self.switch_state(RoundState::SpinStopping);
        self.stop_routine = Some(StopRoutine::default());
        true
    }

    fn spin_reel(&mut self, index: usize) {
        let Some(reel) = self.reels.get_mut(index) else {
            log::warn!("No reel {} to spin", index);
            return;
        };
        if reel.spin() {
            self.services.notify(|o| o.on_reel_start(index));
            self.record(Stage::ReelStart {
                reel_index: index as u8,
            });
        }
    }

    fn tick_reels(&mut self) {
        for index in 0..self.reels.len() {
            let outcome = self.reels[index].tick(&mut self.rng);
            if outcome.revealed.is_empty() && !outcome.stopped {
                continue;
            }

            for &strip_index in &outcome.revealed {
                let symbol = self.reels[index].symbol_at(strip_index);
                self.services
                    .notify(|o| o.on_new_symbol(index, strip_index, symbol));
                if self.config.trace_new_symbols {
                    self.record(Stage::NewSymbol {
                        reel_index: index as u8,
                        strip_index: strip_index as u32,
                        symbol_id: symbol,
                    });
                }
            }

            let visible = self.reels[index].visible_symbols();
            for (row, &symbol) in visible.iter().enumerate() {
                self.services.render.set_visible_symbol(index, row, symbol);
            }

            if outcome.stopped {
                log::debug!("Reel {} stopped showing {:?}", index, visible);
                self.services.notify(|o| o.on_reel_stop(index, &visible));
                self.record(Stage::ReelStop {
                    reel_index: index as u8,
                    symbols: visible,
                });
            }
        }
    }

    fn tick_stop_routine(&mut self) {
        let Some(mut routine) = self.stop_routine.take() else {
            return;
        };

        if let Some(waiting_on) = routine.waiting_on {
            if self.reels.get(waiting_on).is_some_and(|r| r.is_searching()) {
                self.stop_routine = Some(routine);
                return;
            }
            routine.waiting_on = None;
            routine.wait = self.timing().spin_stop_delay_ticks;
        }

        if routine.wait > 0 {
            routine.wait -= 1;
            self.stop_routine = Some(routine);
            return;
        }

        let index = self.current_reel;
        if self.stop_next_reel() {
            routine.waiting_on = Some(index);
            self.stop_routine = Some(routine);
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // RESULT
    // ═══════════════════════════════════════════════════════════════════════

    fn round_interval(&mut self) {
        self.stop_routine = None;
        self.round_grid = Some(SymbolGrid::from_reels(&self.reels));
        self.services.notify(|o| o.on_round_interval());
        self.record(Stage::RoundInterval);
        self.switch_state(RoundState::Result);
    }

    /// One hit per tick; round completion once exhausted
    fn process_result(&mut self) {
        let grid = match self.round_grid.take() {
            Some(grid) => grid,
            None => SymbolGrid::from_reels(&self.reels),
        };
        let ctx = EvalContext {
            symbols: &self.symbols,
            lines: &self.lines,
            grid: &grid,
            alternative_line_check: self.config.alternative_line_check,
        };
        let found = self.hits.next_hit(&ctx).is_some();
        let index = self.hits.last_processed();
        self.round_grid = Some(grid);

        match (found, index) {
            (true, Some(index)) => self.process_hit(index),
            _ => self.complete_round(),
        }
    }

    fn process_hit(&mut self, index: usize) {
        let Some(hit) = self.hits.infos().get(index).cloned() else {
            return;
        };
        self.info.add_hit();

        match hit.pay_type {
            PayType::Normal => {
                let win = hit.payout.saturating_mul(self.info.bet as u64);
                let delta = i64::try_from(win).unwrap_or(i64::MAX);
                self.info.add_balance(delta);
                self.announce_balance(delta, Some(&hit));
            }
            PayType::FreeSpin => {
                let total = self.info.add_free_spins(i64::try_from(hit.payout).unwrap_or(i64::MAX));
                self.record(Stage::FreeSpinsAwarded {
                    count: u32::try_from(hit.payout).unwrap_or(u32::MAX),
                    total,
                });
            }
            PayType::Bonus => {
                let total = self.info.add_bonuses(i64::try_from(hit.payout).unwrap_or(i64::MAX));
                self.record(Stage::BonusAwarded {
                    count: u32::try_from(hit.payout).unwrap_or(u32::MAX),
                    total,
                });
            }
            PayType::Custom => {}
        }

        log::debug!(
            "Hit {:?}: symbol {:?} × {} pays {} ({:?})",
            hit.source,
            hit.hit_symbol,
            hit.hit_chains,
            hit.payout,
            hit.pay_type
        );

        let task = self.services.animation.play(&AnimationRequest::Hit { hit });
        self.queue
            .push(SlotEvent::new("hit", task).on_start(SlotAction::AnnounceHit(index)));
    }

    fn announce_hit(&mut self, index: usize) {
        let Some(hit) = self.hits.infos().get(index).cloned() else {
            return;
        };
        self.services.notify(|o| o.on_hit_processed(&hit));
        self.record(Stage::HitProcessed {
            line_index: hit.line_index().map(|i| i as u32),
            symbol_id: hit.hit_symbol.unwrap_or_default(),
            chains: hit.hit_chains.min(u8::MAX as usize) as u8,
            payout: hit.payout,
        });
    }

    fn announce_balance(&mut self, delta: i64, hit: Option<&HitInfo>) {
        self.services.notify(|o| o.on_balance_changed(delta, hit));
        self.record(Stage::BalanceChanged {
            delta,
            balance: self.info.balance,
            from_hit: hit.is_some(),
        });
    }

    fn complete_round(&mut self) {
        self.info.complete_round(self.modes.current());
        self.clear_manipulation();
        self.switch_state(RoundState::NotStarted);

        log::info!(
            "Round {} complete: {} hits, balance {:+}",
            self.info.rounds_completed,
            self.info.round_hits,
            self.info.round_balance
        );
        self.services.notify(|o| o.on_round_complete(&self.info));
        self.record(Stage::RoundComplete {
            round: self.info.rounds_completed,
            balance_delta: self.info.round_balance,
            hits: self.info.round_hits,
        });

        self.persist();

        if self.config.auto_start_round {
            self.start_round();
        }
    }

    /// Save the ledger when a persistence key is configured
    pub fn persist(&mut self) {
        let Some(prefix) = self.config.persist_key.as_deref() else {
            return;
        };
        let Some(persistence) = self.services.persistence.as_deref_mut() else {
            return;
        };
        if let Err(err) = self.info.save(persistence, prefix) {
            log::warn!("Failed to persist ledger '{}': {}", prefix, err);
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // LEDGER
    // ═══════════════════════════════════════════════════════════════════════

    /// Change the bet; only before a spin
    pub fn set_bet(&mut self, bet: u32) -> bool {
        if bet == 0 || !self.accepts_configuration() {
            return false;
        }
        self.info.bet = bet;
        true
    }

    /// Add (or remove) free spins
    pub fn add_free_spins(&mut self, count: i64) -> u32 {
        let total = self.info.add_free_spins(count);
        self.record(Stage::FreeSpinsAwarded {
            count: count.max(0) as u32,
            total,
        });
        total
    }

    /// Add (or remove) bonus credits
    pub fn add_bonuses(&mut self, count: i64) -> u32 {
        let total = self.info.add_bonuses(count);
        self.record(Stage::BonusAwarded {
            count: count.max(0) as u32,
            total,
        });
        total
    }

    // ═══════════════════════════════════════════════════════════════════════
    // LINES
    // ═══════════════════════════════════════════════════════════════════════

    fn accepts_configuration(&self) -> bool {
        self.state.accepts_configuration() && !self.is_locked()
    }

    pub fn switch_line(&mut self, index: usize, enable: bool) -> Option<LineToggle> {
        let allowed = self.accepts_configuration();
        let toggle = self.lines.switch_line(index, enable, allowed)?;
        self.announce_line(&toggle);
        Some(toggle)
    }

    pub fn enable_next_line(&mut self) -> Option<LineToggle> {
        let allowed = self.accepts_configuration();
        let toggle = self.lines.enable_next_line(allowed)?;
        self.announce_line(&toggle);
        Some(toggle)
    }

    pub fn disable_current_line(&mut self) -> Option<LineToggle> {
        let allowed = self.accepts_configuration();
        let toggle = self.lines.disable_current_line(allowed)?;
        self.announce_line(&toggle);
        Some(toggle)
    }

    pub fn switch_all_lines(&mut self, enable: bool) -> Vec<LineToggle> {
        let allowed = self.accepts_configuration();
        let toggles = self.lines.switch_all_lines(enable, allowed);
        for toggle in &toggles {
            self.announce_line(toggle);
        }
        toggles
    }

    fn announce_line(&mut self, toggle: &LineToggle) {
        self.services.notify(|o| o.on_line_toggled(toggle));
        self.record(Stage::LineToggled {
            line_index: toggle.index as u32,
            enabled: toggle.enabled,
            active_lines: toggle.active_lines as u32,
        });
    }

    // ═══════════════════════════════════════════════════════════════════════
    // MANIPULATION
    // ═══════════════════════════════════════════════════════════════════════

    /// Land the named symbol on `row_offset` on every reel
    pub fn set_manipulation_by_name(&mut self, row_offset: usize, name: &str) -> SlotResult<()> {
        let symbol = self.symbols.id_of(name)?;
        for reel in &mut self.reels {
            reel.set_manipulation(Manipulation::symbol(symbol, row_offset));
        }
        Ok(())
    }

    /// Per-reel target symbols; reels beyond the list are left alone
    pub fn set_manipulation_symbols(&mut self, row_offset: usize, symbols: &[SymbolId]) {
        for (reel, &symbol) in self.reels.iter_mut().zip(symbols) {
            reel.set_manipulation(Manipulation::symbol(symbol, row_offset));
        }
    }

    /// Per-reel target strip indices; reels beyond the list are left alone
    pub fn set_manipulation_indices(&mut self, row_offset: usize, indices: &[usize]) {
        for (reel, &index) in self.reels.iter_mut().zip(indices) {
            reel.set_manipulation(Manipulation::strip_index(index, row_offset));
        }
    }

    pub fn clear_manipulation(&mut self) {
        for reel in &mut self.reels {
            reel.clear_manipulation();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{LineConfig, SymbolConfig};
    use crate::services::{Notification, RecordingObserver, TimedAnimation};
    use crate::symbols::MatchType;
    use crate::reel::ReelPhase;
    use crate::timing::TimingProfile;

    fn definition(spin_mode: SpinMode) -> SlotDefinition {
        let mut def = SlotDefinition::new(
            "test",
            vec![
                SymbolConfig {
                    min_count_per_reel: 1,
                    ..SymbolConfig::new("A", "0,0,50,200,1000")
                },
                SymbolConfig {
                    min_count_per_reel: 1,
                    ..SymbolConfig::new("B", "0,0,10,40,100")
                },
                SymbolConfig {
                    match_type: MatchType::Scatter,
                    pay_type: PayType::FreeSpin,
                    min_count_per_reel: 1,
                    ..SymbolConfig::new("SCATTER", "0,0,3")
                },
            ],
            vec![LineConfig::new(0, "0"), LineConfig::new(1, "0"), LineConfig::new(2, "0")],
        );
        def.config.initial_balance = 500;
        def.modes = ModeSet::uniform(
            ModeConfig::named("m")
                .with_spin_mode(spin_mode)
                .with_cost_per_line(1)
                .with_timing(SpinTiming::instant()),
        );
        def
    }

    fn slot(def: &SlotDefinition) -> (Slot, RecordingObserver) {
        let recorder = RecordingObserver::new();
        let services = SlotServices::default().with_observer(recorder.clone());
        let mut slot = Slot::new(def, services, Some(7)).unwrap();
        slot.activate();
        assert!(slot.run_until(10, |s| s.is_idle()));
        (slot, recorder)
    }

    #[test]
    fn test_activate_starts_round() {
        let (slot, recorder) = slot(&definition(SpinMode::AutoStop));
        assert_eq!(slot.state(), RoundState::Idle);
        assert!(recorder.notifications().contains(&Notification::RoundStart));
        assert!(slot.trace().has_stage("round_start"));
    }

    #[test]
    fn test_auto_stop_round_completes() {
        let (mut slot, recorder) = slot(&definition(SpinMode::AutoStop));
        assert!(slot.play());
        assert_eq!(slot.state(), RoundState::SpinStarting);
        assert_eq!(slot.info().balance, 497);
        assert!(!slot.play());

        assert!(slot.run_until(500, |s| s.info().rounds_completed == 1));
        assert_eq!(slot.state(), RoundState::Idle);

        let stops = recorder
            .notifications()
            .iter()
            .filter(|n| matches!(n, Notification::ReelStop(_)))
            .count();
        assert_eq!(stops, 5);

        let states: Vec<RoundState> = recorder
            .notifications()
            .iter()
            .filter_map(|n| match n {
                Notification::StateChanged { to, .. } => Some(*to),
                _ => None,
            })
            .collect();
        assert_eq!(
            states,
            vec![
                RoundState::Idle,
                RoundState::SpinStarting,
                RoundState::Spinning,
                RoundState::SpinStopping,
                RoundState::Result,
                RoundState::NotStarted,
                RoundState::Idle,
            ]
        );
        assert!(slot.trace().validate().is_valid());
    }

    #[test]
    fn test_manual_stop_one() {
        let (mut slot, _) = slot(&definition(SpinMode::ManualStopOne));
        slot.play();
        assert!(slot.run_until(50, |s| s.state() == RoundState::Spinning));
        // Spinning waits for input
        for _ in 0..20 {
            slot.tick();
        }
        assert_eq!(slot.state(), RoundState::Spinning);

        for stopped in 1..=5 {
            assert!(slot.play());
            slot.tick();
            let idle = slot.reels().iter().filter(|r| !r.is_spinning()).count();
            assert_eq!(idle, stopped);
        }
        assert!(slot.run_until(50, |s| s.info().rounds_completed == 1));
    }

    #[test]
    fn test_manual_start_one_stops_oldest_and_starts_next() {
        let (mut slot, _) = slot(&definition(SpinMode::ManualStartOne));
        slot.play();
        assert!(slot.run_until(50, |s| s.state() == RoundState::Spinning && !s.is_locked()));
        assert!(slot.reels()[0].is_spinning());
        assert!(!slot.reels()[1].is_spinning());

        assert!(slot.play());
        assert!(slot.run_until(50, |s| !s.is_locked()));
        assert!(!slot.reels()[0].is_spinning());
        assert!(slot.reels()[1].is_spinning());
        assert!(!slot.reels()[2].is_spinning());

        for _ in 0..4 {
            assert!(slot.run_until(50, |s| !s.is_locked()));
            slot.play();
        }
        assert!(slot.run_until(50, |s| s.info().rounds_completed == 1));
    }

    #[test]
    fn test_manipulation_forces_line_hit() {
        let (mut slot, recorder) = slot(&definition(SpinMode::AutoStop));
        slot.set_manipulation_by_name(1, "A").unwrap();
        assert!(slot.set_manipulation_by_name(1, "MISSING").is_err());

        slot.play();
        assert!(slot.run_until(500, |s| s.info().rounds_completed == 1));
        assert!(slot.reels().iter().all(|r| r.manipulation().is_none()));

        let hits: Vec<Notification> = recorder
            .notifications()
            .into_iter()
            .filter(|n| matches!(n, Notification::HitProcessed { .. }))
            .collect();
        assert!(hits.contains(&Notification::HitProcessed {
            line_index: Some(1),
            payout: 1000
        }));
        assert!(slot.info().balance >= 500 - 3 + 1000);
    }

    #[test]
    fn test_hits_are_processed_one_per_event() {
        let mut def = definition(SpinMode::AutoStop);
        def.config.auto_start_round = false;
        let services = SlotServices::default().with_animation(TimedAnimation {
            hit_ticks: 5,
            mode_ticks: 0,
        });
        let mut slot = Slot::new(&def, services, Some(1)).unwrap();
        slot.initialize();
        assert!(slot.start_round());
        slot.set_manipulation_by_name(0, "A").unwrap();
        slot.play();

        assert!(slot.run_until(500, |s| s.state() == RoundState::Result && s.is_locked()));
        assert_eq!(slot.queue.active_label(), None);
        slot.tick();
        assert_eq!(slot.queue.active_label(), Some("hit"));
        // State logic is suspended while the hit animation runs
        let hits_before = slot.hits().hits().count();
        for _ in 0..4 {
            slot.tick();
            assert_eq!(slot.hits().hits().count(), hits_before);
        }
        assert!(slot.run_until(100, |s| s.state() == RoundState::NotStarted));
        assert_eq!(slot.info().rounds_completed, 1);
    }

    #[test]
    fn test_free_spin_scatter_switches_mode() {
        let mut def = definition(SpinMode::AutoStop);
        // no scatters during free spins, so exactly the awarded spins are played
        def.modes.free_spin = def
            .modes
            .free_spin
            .clone()
            .with_cost_per_line(0)
            .with_force_play(true)
            .with_swap("SCATTER", "B");
        let (mut slot, recorder) = slot(&def);

        slot.set_manipulation_by_name(1, "SCATTER").unwrap();
        slot.play();
        assert!(slot.run_until(500, |s| s.info().rounds_completed == 1));
        assert_eq!(slot.info().free_spins, 3);
        assert_eq!(slot.mode(), ModeKind::FreeSpin);
        assert!(recorder.notifications().contains(&Notification::ModeChanged {
            previous: ModeKind::Default,
            current: ModeKind::FreeSpin,
        }));

        // force play burns the free spins without input
        assert!(slot.run_until(5000, |s| s.mode() == ModeKind::Default));
        assert_eq!(slot.info().rounds_completed, 4);
        assert_eq!(slot.info().free_spins, 0);
    }

    #[test]
    fn test_line_switching_is_gated() {
        let (mut slot, recorder) = slot(&definition(SpinMode::ManualStopAll));
        let toggle = slot.switch_line(2, false).unwrap();
        assert!(!toggle.enabled);
        assert!(recorder.notifications().contains(&Notification::LineToggled(toggle)));
        assert!(slot.switch_line(0, false).is_none());

        slot.play();
        assert!(slot.run_until(50, |s| s.state() == RoundState::Spinning));
        assert!(slot.switch_line(2, true).is_none());
        assert!(!slot.set_bet(3));
    }

    #[test]
    fn test_reset_cancels_round() {
        let (mut slot, _) = slot(&definition(SpinMode::ManualStopAll));
        slot.set_manipulation_by_name(0, "B").unwrap();
        slot.play();
        slot.tick();
        slot.reset();

        assert_eq!(slot.state(), RoundState::NotStarted);
        assert!(!slot.is_locked());
        assert!(slot.reels().iter().all(|r| !r.is_spinning() && r.manipulation().is_none()));
        assert!(slot.start_round());
    }

    #[test]
    fn test_persists_ledger_on_round_complete() {
        use crate::services::{MemoryPersistence, Persistence};

        let mut def = definition(SpinMode::AutoStop);
        def.config.persist_key = Some("test".into());
        let store = MemoryPersistence::new();
        let mut seeded = store.clone();
        seeded.set_int("test.balance", 50);

        let services = SlotServices::default().with_persistence(store.clone());
        let mut slot = Slot::new(&def, services, Some(3)).unwrap();
        slot.activate();
        assert_eq!(slot.info().balance, 50);

        assert!(slot.run_until(10, |s| s.is_idle()));
        slot.play();
        assert!(slot.run_until(500, |s| s.info().rounds_completed == 1));
        assert_eq!(store.get_int("test.rounds_completed", 0), 1);
        assert_eq!(store.get_int("test.balance", 0), slot.info().balance);
        assert_eq!(store.flush_count(), 1);
    }

    #[test]
    fn test_staggered_reels_stop_in_order_on_target() {
        let mut def = definition(SpinMode::AutoStop);
        let timing = SpinTiming {
            profile: TimingProfile::Custom,
            spin_start_delay_ticks: 2,
            spin_stop_delay_ticks: 3,
            accelerate_ticks: 3,
            reel_stop_ticks: 2,
            auto_stop_ticks: 10,
            rows_per_tick: 1,
        };
        def.modes = ModeSet::uniform(ModeConfig::named("m").with_cost_per_line(1).with_timing(timing));
        let (mut slot, _) = slot(&def);

        slot.set_manipulation_by_name(1, "A").unwrap();
        assert!(slot.play());
        for _ in 0..2_000 {
            if slot.state() == RoundState::Result {
                break;
            }
            slot.tick();
            // No reel is told to stop while an earlier one still searches
            if let Some(searching) = slot.reels().iter().position(|r| r.is_searching()) {
                assert!(
                    slot.reels()[searching + 1..]
                        .iter()
                        .all(|r| r.phase() == ReelPhase::Spinning),
                    "tick {}",
                    slot.current_tick()
                );
            }
        }
        assert_eq!(slot.state(), RoundState::Result);

        let starts: Vec<u64> = slot.trace().events_by_type("reel_start").iter().map(|e| e.tick).collect();
        assert_eq!(starts.len(), 5);
        assert!(starts.windows(2).all(|w| w[1] - w[0] == 2), "{:?}", starts);

        let stops = slot.trace().reel_stops();
        let order: Vec<Option<u8>> = stops.iter().map(|e| e.stage.reel_index()).collect();
        assert_eq!(order, (0..5u8).map(Some).collect::<Vec<_>>());
        for pair in stops.windows(2) {
            assert!(pair[1].tick >= pair[0].tick + 3, "{} -> {}", pair[0].tick, pair[1].tick);
        }
        for event in &stops {
            match &event.stage {
                Stage::ReelStop { symbols, .. } => assert_eq!(symbols[1], 0),
                other => panic!("unexpected {:?}", other),
            }
        }
    }

    #[test]
    fn test_reel_controls_need_a_running_spin() {
        let (mut slot, _) = slot(&definition(SpinMode::ManualStopAll));
        for _ in 0..5 {
            assert!(!slot.stop_reel());
        }
        assert!(!slot.start_reel());
        assert_eq!(slot.state(), RoundState::Idle);
        assert!(slot.reels().iter().all(|r| !r.is_spinning()));
        assert_eq!(slot.info().rounds_completed, 0);

        slot.play();
        assert!(slot.run_until(50, |s| s.state() == RoundState::Spinning));
        assert!(slot.stop_reel());
    }

    #[test]
    fn test_huge_pays_saturate_the_balance() {
        let mut def = SlotDefinition::new(
            "huge",
            vec![SymbolConfig::new("A", "0,0,0,0,18446744073709551615")],
            vec![LineConfig::new(0, "0")],
        )
        .with_modes(ModeSet::uniform(ModeConfig::named("m").with_timing(SpinTiming::instant())))
        .with_strips(vec![vec!["A".to_string(); 6]; 5]);
        def.config.bet = 2;
        let (mut slot, _) = slot(&def);

        slot.play();
        assert!(slot.run_until(500, |s| s.info().rounds_completed == 1));
        assert_eq!(slot.info().balance, i64::MAX);
        let paid = slot.trace().find_event(|e| {
            matches!(
                e.stage,
                Stage::BalanceChanged {
                    delta: i64::MAX,
                    from_hit: true,
                    ..
                }
            )
        });
        assert!(paid.is_some());
    }

    #[test]
    fn test_trace_keeps_newest_events() {
        let mut def = definition(SpinMode::AutoStop);
        def.config.trace_capacity = Some(12);
        let (mut slot, _) = slot(&def);

        for round in 1..=3 {
            assert!(slot.run_until(50, |s| s.is_idle()));
            slot.play();
            assert!(slot.run_until(500, |s| s.info().rounds_completed == round));
        }
        assert_eq!(slot.trace().len(), 12);
        assert!(slot.trace().is_truncated());

        let taken = slot.take_trace();
        assert_eq!(taken.len(), 12);
        assert_eq!(slot.trace().max_events, Some(12));
        assert_eq!(slot.trace().dropped_events, 0);
    }

    #[test]
    fn test_zero_trace_capacity_records_nothing() {
        let mut def = definition(SpinMode::AutoStop);
        def.config.trace_capacity = Some(0);
        let (mut slot, recorder) = slot(&def);

        slot.play();
        assert!(slot.run_until(500, |s| s.info().rounds_completed == 1));
        assert!(slot.trace().is_empty());
        assert!(recorder.notifications().contains(&Notification::RoundComplete { rounds_completed: 1 }));
    }
}
