//! Reel — a fixed strip of symbols, a cursor and a window of holders
//!
//! Holders are ordered top to bottom over the full window
//! (`hidden_top + rows + hidden_bottom`). Each reveal rotates the bottom
//! holder to the top and points it at the next strip index, so content moves
//! downward as the reel spins.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{SlotError, SlotResult};
use crate::symbols::{SymbolId, SymbolSet};

/// Row window shared by every reel of a slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowLayout {
    /// Visible rows
    pub rows: usize,
    /// Rows above the visible band
    pub hidden_top: usize,
    /// Rows below the visible band
    pub hidden_bottom: usize,
}

impl RowLayout {
    pub fn new(rows: usize, hidden_top: usize, hidden_bottom: usize) -> Self {
        Self {
            rows,
            hidden_top,
            hidden_bottom,
        }
    }

    /// Layout without hidden rows (simulator grids)
    pub fn visible_only(rows: usize) -> Self {
        Self::new(rows, 0, 0)
    }

    /// Total holders per reel
    pub fn total(&self) -> usize {
        self.hidden_top + self.rows + self.hidden_bottom
    }

    /// True when an absolute holder row falls inside the visible band
    pub fn is_visible(&self, row: isize) -> bool {
        row >= self.hidden_top as isize && row < (self.hidden_top + self.rows) as isize
    }
}

impl Default for RowLayout {
    fn default() -> Self {
        Self::new(3, 2, 1)
    }
}

/// Strip behaviour options
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReelOptions {
    /// Reveal strip indices in descending order
    pub invert_direction: bool,
    /// Strip index shown on the bottom holder at startup, negative = random
    pub initial_position: i32,
    /// Jump to a random strip index once acceleration completes
    pub randomize_on_spin: bool,
}

/// Per-spin movement parameters, taken from the current mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReelMotion {
    pub accelerate_ticks: u32,
    pub rows_per_tick: u32,
    pub stop_ticks: u32,
    /// Extra reveals after a stop request
    pub stop_distance: u32,
}

impl Default for ReelMotion {
    fn default() -> Self {
        Self {
            accelerate_ticks: 30,
            rows_per_tick: 2,
            stop_ticks: 30,
            stop_distance: 1,
        }
    }
}

/// What a manipulated reel should land on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopTarget {
    Symbol(SymbolId),
    StripIndex(usize),
}

/// "Stop so that `target` lands on visible row `row_offset`"
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manipulation {
    pub target: StopTarget,
    pub row_offset: usize,
}

impl Manipulation {
    pub fn symbol(symbol: SymbolId, row_offset: usize) -> Self {
        Self {
            target: StopTarget::Symbol(symbol),
            row_offset,
        }
    }

    pub fn strip_index(index: usize, row_offset: usize) -> Self {
        Self {
            target: StopTarget::StripIndex(index),
            row_offset,
        }
    }
}

/// Reel movement phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReelPhase {
    Idle,
    Accelerating { elapsed: u32 },
    Spinning,
    /// Stop requested, waiting for the manipulated target to reach its pre-stop holder
    Searching { distance: usize },
    /// Performing the final `distance` reveals
    Settling {
        distance: usize,
        done: usize,
        elapsed: u32,
    },
}

/// Outcome of one reel tick
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReelTick {
    /// Strip indices revealed this tick, in order
    pub revealed: Vec<usize>,
    /// Acceleration finished this tick
    pub reached_speed: bool,
    /// Reel settled this tick
    pub stopped: bool,
}

/// A visible symbol occurrence; multi-row symbols span several rows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Placement {
    /// Top visible row owning the placement
    pub row: usize,
    pub symbol: SymbolId,
    pub span: usize,
}

/// A single reel
#[derive(Debug, Clone)]
pub struct Reel {
    index: usize,
    strip: Vec<SymbolId>,
    /// Last revealed strip index
    cursor: usize,
    /// Strip index shown by each holder, top to bottom
    holders: Vec<usize>,
    layout: RowLayout,
    options: ReelOptions,
    motion: ReelMotion,
    phase: ReelPhase,
    manipulation: Option<Manipulation>,
}

impl Reel {
    /// Create a reel and fill its holders from the initial position
    pub fn new<R: Rng + ?Sized>(
        index: usize,
        strip: Vec<SymbolId>,
        layout: RowLayout,
        options: ReelOptions,
        rng: &mut R,
    ) -> SlotResult<Self> {
        let required = layout.total().max(1);
        if strip.len() < required {
            return Err(SlotError::StripTooShort {
                reel: index,
                len: strip.len(),
                required,
            });
        }

        let len = strip.len();
        let position = if options.initial_position < 0 {
            rng.random_range(0..len)
        } else {
            options.initial_position as usize % len
        };
        let cursor = if options.invert_direction {
            (position + 1) % len
        } else {
            (position + len - 1) % len
        };

        let mut reel = Self {
            index,
            strip,
            cursor,
            holders: vec![0; layout.total()],
            layout,
            options,
            motion: ReelMotion::default(),
            phase: ReelPhase::Idle,
            manipulation: None,
        };
        reel.fill_holders();
        Ok(reel)
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn strip(&self) -> &[SymbolId] {
        &self.strip
    }

    pub fn len(&self) -> usize {
        self.strip.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strip.is_empty()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn layout(&self) -> RowLayout {
        self.layout
    }

    pub fn phase(&self) -> ReelPhase {
        self.phase
    }

    pub fn is_spinning(&self) -> bool {
        self.phase != ReelPhase::Idle
    }

    /// Stopping, but still waiting for the manipulated target
    pub fn is_searching(&self) -> bool {
        matches!(self.phase, ReelPhase::Searching { .. })
    }

    pub fn set_motion(&mut self, motion: ReelMotion) {
        self.motion = motion;
    }

    pub fn manipulation(&self) -> Option<Manipulation> {
        self.manipulation
    }

    /// Set the stop target; rows beyond the visible band are clamped
    pub fn set_manipulation(&mut self, manipulation: Manipulation) {
        let row_offset = manipulation.row_offset.min(self.layout.rows.saturating_sub(1));
        self.manipulation = Some(Manipulation {
            row_offset,
            ..manipulation
        });
    }

    pub fn clear_manipulation(&mut self) {
        self.manipulation = None;
    }

    /// Symbol at a strip index (wraps)
    pub fn symbol_at(&self, strip_index: usize) -> SymbolId {
        self.strip[strip_index % self.strip.len()]
    }

    /// Strip index shown on a holder row (full window, 0 = top hidden row)
    pub fn holder_index(&self, row: usize) -> Option<usize> {
        self.holders.get(row).copied()
    }

    /// Symbol shown on a holder row (full window)
    pub fn holder_symbol(&self, row: usize) -> Option<SymbolId> {
        self.holder_index(row).map(|i| self.strip[i])
    }

    /// Strip index on a visible row
    pub fn visible_symbol_index_at(&self, visible_row: usize) -> Option<usize> {
        if visible_row >= self.layout.rows {
            return None;
        }
        self.holder_index(self.layout.hidden_top + visible_row)
    }

    /// Strip index on the first visible row
    pub fn top_symbol_index(&self) -> usize {
        self.holders[self.layout.hidden_top]
    }

    /// Visible symbols, top to bottom
    pub fn visible_symbols(&self) -> Vec<SymbolId> {
        let start = self.layout.hidden_top;
        self.holders[start..start + self.layout.rows]
            .iter()
            .map(|&i| self.strip[i])
            .collect()
    }

    /// Replace one strip entry (index wraps)
    pub fn swap_symbol_at(&mut self, strip_index: usize, symbol: SymbolId) {
        let len = self.strip.len();
        self.strip[strip_index % len] = symbol;
    }

    /// Replace the strip contents, keeping length, cursor and holders
    pub fn replace_strip(&mut self, strip: Vec<SymbolId>) -> SlotResult<()> {
        if strip.len() != self.strip.len() {
            return Err(SlotError::InvalidConfig(format!(
                "reel {} strip length {} cannot change to {}",
                self.index,
                self.strip.len(),
                strip.len()
            )));
        }
        self.strip = strip;
        Ok(())
    }

    /// Reveal the next strip symbol on the top holder, returning its strip index
    pub fn reveal_next(&mut self) -> usize {
        let len = self.strip.len();
        let next = if self.options.invert_direction {
            (self.cursor + len - 1) % len
        } else {
            (self.cursor + 1) % len
        };
        self.cursor = next;
        self.holders.rotate_right(1);
        self.holders[0] = next;
        next
    }

    /// Refill every holder from the cursor
    fn fill_holders(&mut self) -> Vec<usize> {
        (0..self.holders.len()).map(|_| self.reveal_next()).collect()
    }

    /// Start spinning. Returns false if the reel is already moving.
    pub fn spin(&mut self) -> bool {
        if self.is_spinning() {
            return false;
        }
        self.phase = ReelPhase::Accelerating { elapsed: 0 };
        true
    }

    /// Request a stop. Returns false if the reel is not at speed or accelerating.
    pub fn stop(&mut self) -> bool {
        if !matches!(self.phase, ReelPhase::Accelerating { .. } | ReelPhase::Spinning) {
            return false;
        }

        match self.reachable_manipulation() {
            Some(_) => {
                let distance = (self.motion.stop_distance as usize + 1).min(self.layout.hidden_top);
                self.phase = if self.target_in_place(distance) {
                    Self::settling(distance)
                } else {
                    ReelPhase::Searching { distance }
                };
            }
            None => {
                let distance = (self.motion.stop_distance as usize + 1).min(self.layout.rows);
                self.phase = Self::settling(distance);
            }
        }
        true
    }

    /// Stop immediately without further reveals
    pub fn halt(&mut self) {
        self.phase = ReelPhase::Idle;
    }

    fn settling(distance: usize) -> ReelPhase {
        ReelPhase::Settling {
            distance,
            done: 0,
            elapsed: 0,
        }
    }

    /// Manipulation whose target exists on this strip
    fn reachable_manipulation(&self) -> Option<Manipulation> {
        let manipulation = self.manipulation?;
        match manipulation.target {
            StopTarget::Symbol(symbol) if !self.strip.contains(&symbol) => {
                log::warn!(
                    "Reel {}: manipulated symbol {} is not on the strip, stopping normally",
                    self.index,
                    symbol
                );
                None
            }
            _ => Some(manipulation),
        }
    }

    /// True when the holder `distance` reveals above the target row shows the target
    fn target_in_place(&self, distance: usize) -> bool {
        let Some(manipulation) = self.manipulation else {
            return true;
        };
        let row = (self.layout.hidden_top - distance + manipulation.row_offset)
            .min(self.holders.len() - 1);
        let strip_index = self.holders[row];
        match manipulation.target {
            StopTarget::Symbol(symbol) => self.strip[strip_index] == symbol,
            StopTarget::StripIndex(index) => strip_index == index % self.strip.len(),
        }
    }

    /// Advance one tick
    pub fn tick<R: Rng + ?Sized>(&mut self, rng: &mut R) -> ReelTick {
        let mut out = ReelTick::default();

        match self.phase {
            ReelPhase::Idle => {}
            ReelPhase::Accelerating { elapsed } => {
                let elapsed = elapsed + 1;
                out.revealed.push(self.reveal_next());
                if elapsed >= self.motion.accelerate_ticks {
                    self.phase = ReelPhase::Spinning;
                    out.reached_speed = true;
                    if self.options.randomize_on_spin {
                        self.cursor = rng.random_range(0..self.strip.len());
                        out.revealed.extend(self.fill_holders());
                    }
                } else {
                    self.phase = ReelPhase::Accelerating { elapsed };
                }
            }
            ReelPhase::Spinning => {
                for _ in 0..self.motion.rows_per_tick.max(1) {
                    out.revealed.push(self.reveal_next());
                }
            }
            ReelPhase::Searching { distance } => {
                for _ in 0..self.motion.rows_per_tick.max(1) {
                    out.revealed.push(self.reveal_next());
                    if self.target_in_place(distance) {
                        self.phase = Self::settling(distance);
                        break;
                    }
                }
            }
            ReelPhase::Settling {
                distance,
                mut done,
                elapsed,
            } => {
                let elapsed = elapsed + 1;
                let ticks = self.motion.stop_ticks;
                let finished = ticks == 0 || elapsed >= ticks;
                let target = if finished {
                    distance
                } else {
                    distance * elapsed as usize / ticks as usize
                };
                while done < target {
                    out.revealed.push(self.reveal_next());
                    done += 1;
                }

                if finished {
                    self.phase = ReelPhase::Idle;
                    out.stopped = true;
                    log::debug!("Reel {} stopped at strip index {}", self.index, self.cursor);
                } else {
                    self.phase = ReelPhase::Settling {
                        distance,
                        done,
                        elapsed,
                    };
                }
            }
        }

        out
    }

    /// Run-length view of the visible rows
    pub fn placements(&self, symbols: &SymbolSet) -> Vec<Placement> {
        let visible = self.visible_symbols();
        let mut out = Vec::with_capacity(visible.len());
        let mut row = 0;
        while row < visible.len() {
            let symbol = visible[row];
            let max_span = symbols
                .get(symbol)
                .map(|s| s.row_size as usize)
                .unwrap_or(1)
                .max(1);
            let mut span = 1;
            while span < max_span && row + span < visible.len() && visible[row + span] == symbol {
                span += 1;
            }
            out.push(Placement { row, symbol, span });
            row += span;
        }
        out
    }
}

/// Lay multi-row symbols out as contiguous runs.
///
/// A run may not start at index 0 or reach the strip end, and the slot after
/// a run never holds another multi-row symbol. Offending entries are replaced
/// by a random single-row symbol.
pub fn validate_multi_row<R: Rng + ?Sized>(strip: &mut [SymbolId], symbols: &SymbolSet, rng: &mut R) {
    let len = strip.len();
    let mut i = 0;
    while i < len {
        let span = symbols.get(strip[i]).map(|s| s.row_size as usize).unwrap_or(1);
        if span <= 1 {
            i += 1;
            continue;
        }

        if i == 0 || i + span >= len {
            if let Some(replacement) = symbols.random_symbol(rng, true) {
                strip[i] = replacement;
            }
            i += 1;
            continue;
        }

        let symbol = strip[i];
        for slot in &mut strip[i + 1..i + span] {
            *slot = symbol;
        }

        let after = i + span;
        if symbols.get(strip[after]).is_some_and(|s| s.is_mrs()) {
            if let Some(replacement) = symbols.random_symbol(rng, true) {
                strip[after] = replacement;
            }
        }
        i = after + 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbols::Symbol;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn rng() -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(11)
    }

    fn counting_strip(len: u32) -> Vec<SymbolId> {
        (0..len).collect()
    }

    fn instant_motion() -> ReelMotion {
        ReelMotion {
            accelerate_ticks: 0,
            rows_per_tick: 1,
            stop_ticks: 0,
            stop_distance: 1,
        }
    }

    fn run_until_stopped(reel: &mut Reel, rng: &mut ChaCha8Rng) -> usize {
        for tick in 0..1000 {
            if reel.tick(rng).stopped {
                return tick;
            }
        }
        panic!("reel never stopped");
    }

    #[test]
    fn test_strip_too_short() {
        let result = Reel::new(2, vec![0; 5], RowLayout::new(3, 2, 1), ReelOptions::default(), &mut rng());
        assert!(matches!(
            result,
            Err(SlotError::StripTooShort { reel: 2, len: 5, required: 6 })
        ));
    }

    #[test]
    fn test_initial_fill() {
        let reel = Reel::new(0, counting_strip(10), RowLayout::new(3, 1, 1), ReelOptions::default(), &mut rng()).unwrap();

        // Bottom holder shows the initial position, newest reveal on top
        assert_eq!(reel.holder_index(4), Some(0));
        assert_eq!(reel.holder_index(0), Some(4));
        assert_eq!(reel.cursor(), 4);
        assert_eq!(reel.visible_symbols(), vec![3, 2, 1]);
        assert_eq!(reel.top_symbol_index(), 3);
        assert_eq!(reel.visible_symbol_index_at(2), Some(1));
        assert_eq!(reel.visible_symbol_index_at(3), None);
    }

    #[test]
    fn test_initial_position_and_wrap() {
        let options = ReelOptions {
            initial_position: 8,
            ..Default::default()
        };
        let mut reel = Reel::new(0, counting_strip(10), RowLayout::new(3, 1, 1), options, &mut rng()).unwrap();
        assert_eq!(reel.holder_index(4), Some(8));
        assert_eq!(reel.cursor(), 2);
        assert_eq!(reel.reveal_next(), 3);
        assert_eq!(reel.holder_index(0), Some(3));
        assert_eq!(reel.holder_index(4), Some(9));
    }

    #[test]
    fn test_inverted_direction() {
        let options = ReelOptions {
            invert_direction: true,
            ..Default::default()
        };
        let mut reel = Reel::new(0, counting_strip(10), RowLayout::new(3, 1, 1), options, &mut rng()).unwrap();
        assert_eq!(reel.holder_index(4), Some(0));
        assert_eq!(reel.visible_symbols(), vec![7, 8, 9]);
        assert_eq!(reel.reveal_next(), 5);
    }

    #[test]
    fn test_spin_and_stop_without_manipulation() {
        let mut rng = rng();
        let mut reel = Reel::new(0, counting_strip(10), RowLayout::new(3, 1, 1), ReelOptions::default(), &mut rng).unwrap();
        reel.set_motion(instant_motion());

        assert!(!reel.stop());
        assert!(reel.spin());
        assert!(!reel.spin());

        let tick = reel.tick(&mut rng);
        assert!(tick.reached_speed);
        assert_eq!(tick.revealed, vec![5]);

        assert!(reel.stop());
        let tick = reel.tick(&mut rng);
        assert!(tick.stopped);
        // stop distance 1 settles with two further reveals
        assert_eq!(tick.revealed, vec![6, 7]);
        assert!(!reel.is_spinning());
    }

    #[test]
    fn test_settle_spread_over_stop_ticks() {
        let mut rng = rng();
        let mut reel = Reel::new(0, counting_strip(10), RowLayout::new(3, 1, 1), ReelOptions::default(), &mut rng).unwrap();
        reel.set_motion(ReelMotion {
            stop_ticks: 4,
            stop_distance: 3,
            ..instant_motion()
        });
        reel.spin();
        reel.tick(&mut rng);
        reel.stop();

        let mut revealed = 0;
        let mut ticks = 0;
        loop {
            let tick = reel.tick(&mut rng);
            revealed += tick.revealed.len();
            ticks += 1;
            if tick.stopped {
                break;
            }
        }
        assert_eq!(ticks, 4);
        assert_eq!(revealed, 3); // min(3 + 1, rows)
    }

    #[test]
    fn test_manipulated_symbol_lands_on_row() {
        let mut rng = rng();
        let strip: Vec<SymbolId> = vec![0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11];
        for row_offset in 0..3 {
            let mut reel = Reel::new(0, strip.clone(), RowLayout::new(3, 2, 1), ReelOptions::default(), &mut rng).unwrap();
            reel.set_motion(instant_motion());
            reel.set_manipulation(Manipulation::symbol(9, row_offset));
            reel.spin();
            reel.tick(&mut rng);
            reel.stop();
            run_until_stopped(&mut reel, &mut rng);
            assert_eq!(reel.visible_symbols()[row_offset], 9);
        }
    }

    #[test]
    fn test_manipulated_strip_index_searches() {
        let mut rng = rng();
        let mut reel = Reel::new(0, counting_strip(20), RowLayout::new(3, 2, 1), ReelOptions::default(), &mut rng).unwrap();
        reel.set_motion(instant_motion());
        reel.set_manipulation(Manipulation::strip_index(3, 1));
        reel.spin();
        reel.tick(&mut rng);
        reel.stop();
        assert!(reel.is_searching());
        run_until_stopped(&mut reel, &mut rng);
        assert_eq!(reel.visible_symbol_index_at(1), Some(3));
    }

    #[test]
    fn test_unreachable_manipulation_stops_normally() {
        let mut rng = rng();
        let mut reel = Reel::new(0, counting_strip(10), RowLayout::new(3, 2, 1), ReelOptions::default(), &mut rng).unwrap();
        reel.set_motion(instant_motion());
        reel.set_manipulation(Manipulation::symbol(42, 0));
        reel.spin();
        reel.tick(&mut rng);
        reel.stop();
        assert!(!reel.is_searching());
        assert!(reel.tick(&mut rng).stopped);
    }

    #[test]
    fn test_swap_and_replace_strip() {
        let mut reel = Reel::new(0, counting_strip(10), RowLayout::new(3, 1, 1), ReelOptions::default(), &mut rng()).unwrap();
        reel.swap_symbol_at(13, 99);
        assert_eq!(reel.symbol_at(3), 99);
        assert_eq!(reel.visible_symbols(), vec![99, 2, 1]);

        assert!(reel.replace_strip(vec![7; 10]).is_ok());
        assert_eq!(reel.visible_symbols(), vec![7, 7, 7]);
        assert!(reel.replace_strip(vec![7; 4]).is_err());
    }

    fn mrs_set() -> SymbolSet {
        SymbolSet::new(vec![
            Symbol::new(0, "A", vec![0, 0, 5]),
            Symbol::new(0, "B", vec![0, 0, 5]),
            Symbol::new(0, "TALL", vec![0, 0, 50]).with_row_size(3),
        ])
        .unwrap()
    }

    #[test]
    fn test_validate_multi_row_runs() {
        let symbols = mrs_set();
        let mut strip = vec![2, 0, 2, 0, 0, 1, 2, 1, 1, 2];
        validate_multi_row(&mut strip, &symbols, &mut rng());

        // index 0 and the tail can't host a run
        assert_ne!(strip[0], 2);
        assert_ne!(strip[9], 2);
        // runs are contiguous and followed by a single-row symbol
        assert_eq!(&strip[2..5], &[2, 2, 2]);
        assert_ne!(strip[5], 2);
        assert_eq!(&strip[6..9], &[2, 2, 2]);
    }

    #[test]
    fn test_placements_group_runs() {
        let symbols = mrs_set();
        let strip = vec![0, 2, 2, 2, 1, 0, 1, 0];
        let options = ReelOptions {
            initial_position: 0,
            ..Default::default()
        };
        // Visible rows show strip indices 3, 2, 1, 0 top to bottom
        let reel = Reel::new(0, strip, RowLayout::new(4, 0, 0), options, &mut rng()).unwrap();
        assert_eq!(reel.visible_symbols(), vec![2, 2, 2, 0]);
        assert_eq!(
            reel.placements(&symbols),
            vec![
                Placement { row: 0, symbol: 2, span: 3 },
                Placement { row: 3, symbol: 0, span: 1 },
            ]
        );
    }
}
